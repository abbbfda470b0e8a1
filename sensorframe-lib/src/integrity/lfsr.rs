use std::ops::Range;

use super::{check_len, Integrity, IntegrityAlgorithm};

/// 16-bit LFSR keyed digest.
///
/// For every message bit, MSB first, a set bit XORs the current key into the digest.
/// The key then rolls one bit right, XORed with `gen` when the bit rolled out was set.
#[must_use]
pub fn lfsr_digest16(message: &[u8], gen: u16, key: u16) -> u16 {
    let mut sum = 0u16;
    let mut key = key;
    for &data in message {
        for i in (0..8).rev() {
            if (data >> i) & 1 == 1 {
                sum ^= key;
            }
            key = if key & 1 == 1 { (key >> 1) ^ gen } else { key >> 1 };
        }
    }
    sum
}

/// LFSR digest over `range`, compared to the big-endian value in the first two frame
/// bytes after XOR with `final_xor`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LfsrDigest16 {
    pub generator: u16,
    pub key: u16,
    pub range: Range<usize>,
    pub final_xor: u16,
}

impl LfsrDigest16 {
    #[must_use]
    pub fn digest(&self, frame: &[u8]) -> u16 {
        lfsr_digest16(&frame[self.range.clone()], self.generator, self.key) ^ self.final_xor
    }
}

impl IntegrityAlgorithm for LfsrDigest16 {
    fn verify(&self, frame: &[u8]) -> Integrity {
        if let Some(zult) = check_len(frame, self.range.end.max(2)) {
            return zult;
        }
        let expected = u16::from_be_bytes([frame[0], frame[1]]);
        let computed = self.digest(frame);
        if expected == computed {
            Integrity::Ok
        } else {
            Integrity::Mismatch { expected, computed }
        }
    }
}
