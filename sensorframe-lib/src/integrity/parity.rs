use super::{check_len, Integrity, IntegrityAlgorithm};

/// The first `half` bytes must be the bitwise complement of the following `half` bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InversionParity {
    pub half: usize,
}

impl InversionParity {
    /// Index of the first byte whose complement does not match, if any.
    #[must_use]
    pub fn first_mismatch(&self, frame: &[u8]) -> Option<usize> {
        let (a, b) = frame[..self.half * 2].split_at(self.half);
        a.iter().zip(b).position(|(x, y)| x ^ y != 0xff)
    }
}

impl IntegrityAlgorithm for InversionParity {
    fn verify(&self, frame: &[u8]) -> Integrity {
        if let Some(zult) = check_len(frame, self.half * 2) {
            return zult;
        }
        match self.first_mismatch(frame) {
            Some(index) => Integrity::ParityMismatch { index },
            None => Integrity::Ok,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn frame(half: usize) -> Vec<u8> {
        let mut rng = rand::thread_rng();
        let first: Vec<u8> = (0..half).map(|_| rng.gen()).collect();
        let mut frame = first.clone();
        frame.extend(first.iter().map(|b| !b));
        frame
    }

    #[test]
    fn complement_halves_pass() {
        let alg = InversionParity { half: 13 };
        assert_eq!(alg.verify(&frame(13)), Integrity::Ok);
    }

    #[test]
    fn any_single_bit_flip_reports_its_byte() {
        let alg = InversionParity { half: 13 };
        let orig = frame(13);
        for bit in 0..26 * 8 {
            let mut dat = orig.clone();
            dat[bit / 8] ^= 0x80 >> (bit % 8);
            let expected = (bit / 8) % 13;
            assert_eq!(
                alg.verify(&dat),
                Integrity::ParityMismatch { index: expected },
                "flipped bit {bit}"
            );
        }
    }

    #[test]
    fn short_frame_is_truncated() {
        let alg = InversionParity { half: 13 };
        assert_eq!(
            alg.verify(&[0u8; 20]),
            Integrity::Truncated {
                actual: 20,
                minimum: 26
            }
        );
    }
}
