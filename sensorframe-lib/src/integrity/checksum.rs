use std::ops::Range;

use super::{check_len, Integrity, IntegrityAlgorithm};

/// Sum of all bytes. Carries accumulate in the upper bits.
#[must_use]
pub fn add_bytes(dat: &[u8]) -> u32 {
    dat.iter().map(|&b| u32::from(b)).sum()
}

/// 8-bit one's complement sum: every carry out of the low byte is added back in.
#[must_use]
pub fn add_bytes_end_around(dat: &[u8]) -> u8 {
    let mut sum: u16 = 0;
    for &b in dat {
        sum += u16::from(b);
        if sum > 0xff {
            sum = (sum & 0xff) + 1;
        }
    }
    // folded above, always fits
    sum as u8
}

/// Number of set bits in `dat`.
#[must_use]
pub fn bit_count(dat: &[u8]) -> u32 {
    dat.iter().map(|b| b.count_ones()).sum()
}

/// How carries out of the low byte are treated by [AddChecksum].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Carry {
    /// Carries are kept in the accumulator and only the low byte is compared.
    #[default]
    Keep,
    /// Carries are folded back into the low byte.
    EndAround,
}

/// Additive checksum over `range` that must equal `target`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddChecksum {
    pub range: Range<usize>,
    pub target: u8,
    pub carry: Carry,
}

impl AddChecksum {
    #[must_use]
    pub fn sum(&self, frame: &[u8]) -> u8 {
        let dat = &frame[self.range.clone()];
        match self.carry {
            Carry::Keep => (add_bytes(dat) & 0xff) as u8,
            Carry::EndAround => add_bytes_end_around(dat),
        }
    }
}

impl IntegrityAlgorithm for AddChecksum {
    fn verify(&self, frame: &[u8]) -> Integrity {
        if let Some(zult) = check_len(frame, self.range.end) {
            return zult;
        }
        let computed = self.sum(frame);
        if computed == self.target {
            Integrity::Ok
        } else {
            Integrity::Mismatch {
                expected: self.target.into(),
                computed: computed.into(),
            }
        }
    }
}

/// The byte at `at` holds the number of set bits in `range`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitCount {
    pub at: usize,
    pub range: Range<usize>,
}

impl IntegrityAlgorithm for BitCount {
    fn verify(&self, frame: &[u8]) -> Integrity {
        if let Some(zult) = check_len(frame, self.range.end.max(self.at + 1)) {
            return zult;
        }
        let computed = bit_count(&frame[self.range.clone()]);
        let expected = u32::from(frame[self.at]);
        if computed == expected {
            Integrity::Ok
        } else {
            Integrity::Mismatch {
                expected: u16::from(frame[self.at]),
                // at most 8 bits per byte of a row
                computed: computed as u16,
            }
        }
    }
}
