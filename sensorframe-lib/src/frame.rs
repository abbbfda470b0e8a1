use std::fmt;
use std::ops::{Deref, DerefMut, Range};

use crate::bitbuffer::BitRow;
use crate::integrity::dewhiten;

/// Fixed size scratch buffer a decoder extracts a frame into.
///
/// A frame is owned by a single decode attempt and mutated in place, e.g., de-whitened
/// or partially inverted, before field decoding.
#[derive(Clone, PartialEq, Eq)]
pub struct WorkingFrame<const N: usize> {
    buf: [u8; N],
}

impl<const N: usize> WorkingFrame<N> {
    /// Number of bits the frame can hold.
    pub const CAPACITY_BITS: usize = N * 8;

    #[must_use]
    pub fn new() -> Self {
        WorkingFrame { buf: [0u8; N] }
    }

    /// Extracts `bit_count` bits of `row` starting at `start`. Bytes not covered by the
    /// extraction are zero.
    ///
    /// # Panics
    /// If `bit_count` exceeds [Self::CAPACITY_BITS] or the range overruns the row.
    #[must_use]
    pub fn extract(row: &BitRow, start: usize, bit_count: usize) -> Self {
        assert!(
            bit_count <= Self::CAPACITY_BITS,
            "{bit_count} bits exceeds frame capacity of {}",
            Self::CAPACITY_BITS
        );
        let mut frame = Self::new();
        row.extract_bytes(start, &mut frame.buf, bit_count);
        frame
    }

    /// XOR every byte with `mask`.
    pub fn dewhiten(&mut self, mask: u8) {
        dewhiten(&mut self.buf, mask);
    }

    /// Complement the bytes in `range`.
    ///
    /// # Panics
    /// If `range` is out of bounds.
    pub fn invert(&mut self, range: Range<usize>) {
        dewhiten(&mut self.buf[range], 0xff);
    }

    /// Lowercase hex of the frame contents, for diagnostics.
    #[must_use]
    pub fn hex(&self) -> String {
        use fmt::Write;
        self.buf.iter().fold(String::with_capacity(N * 2), |mut s, b| {
            let _ = write!(s, "{b:02x}");
            s
        })
    }
}

impl<const N: usize> Default for WorkingFrame<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Deref for WorkingFrame<N> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.buf
    }
}

impl<const N: usize> DerefMut for WorkingFrame<N> {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }
}

impl<const N: usize> AsRef<[u8]> for WorkingFrame<N> {
    fn as_ref(&self) -> &[u8] {
        &self.buf
    }
}

impl<const N: usize> fmt::Debug for WorkingFrame<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WorkingFrame<{N}>({})", self.hex())
    }
}
