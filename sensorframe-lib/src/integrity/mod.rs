//! Integrity checks applied to an extracted frame.
//!
//! Every check only computes and compares. Whether a failed check rejects the frame
//! is up to the decoder using it.
use std::fmt;

mod checksum;
mod lfsr;
mod parity;

pub use checksum::*;
pub use lfsr::*;
pub use parity::*;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Integrity {
    Ok,
    /// The computed value does not match the expected value.
    Mismatch { expected: u16, computed: u16 },
    /// Inversion parity failed; `index` is the first failing byte.
    ParityMismatch { index: usize },
    /// The frame is too short for the configured byte range.
    Truncated { actual: usize, minimum: usize },
}

impl Integrity {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, Integrity::Ok)
    }
}

impl fmt::Display for Integrity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Integrity::Ok => f.write_str("ok"),
            Integrity::Mismatch { expected, computed } => {
                write!(f, "expected {expected:04x}, computed {computed:04x}")
            }
            Integrity::ParityMismatch { index } => write!(f, "parity mismatch at byte {index}"),
            Integrity::Truncated { actual, minimum } => {
                write!(f, "frame truncated, {actual} of {minimum} bytes")
            }
        }
    }
}

pub trait IntegrityAlgorithm: Send + Sync {
    fn verify(&self, frame: &[u8]) -> Integrity;
}

/// XOR every byte with `mask`. Applying the same mask again restores the input.
pub fn dewhiten(dat: &mut [u8], mask: u8) {
    for b in dat.iter_mut() {
        *b ^= mask;
    }
}

fn check_len(frame: &[u8], minimum: usize) -> Option<Integrity> {
    if frame.len() < minimum {
        Some(Integrity::Truncated {
            actual: frame.len(),
            minimum,
        })
    } else {
        None
    }
}
