//! Declarative nibble-based field layouts.
//!
//! Sensor frames mostly encode readings as packed decimal digits spread over nibbles,
//! sometimes out of byte order. A [NibbleField] lists the digits most significant first
//! and is evaluated against an extracted frame.

/// One half of a frame byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Nibble {
    /// High 4 bits of byte N.
    Hi(usize),
    /// Low 4 bits of byte N.
    Lo(usize),
}

impl Nibble {
    /// # Panics
    /// If the byte index is out of bounds for `frame`.
    #[must_use]
    pub fn get(self, frame: &[u8]) -> u8 {
        match self {
            Nibble::Hi(idx) => frame[idx] >> 4,
            Nibble::Lo(idx) => frame[idx] & 0x0f,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Encoding {
    /// Each nibble is one decimal digit.
    Bcd,
    /// Nibbles are hex digits of a binary value.
    Binary,
}

/// A numeric field built from nibbles, most significant first.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NibbleField {
    pub digits: &'static [Nibble],
    pub encoding: Encoding,
    /// Raw value is divided by this to get the reading.
    pub divisor: u32,
}

impl NibbleField {
    #[must_use]
    pub fn raw(&self, frame: &[u8]) -> u32 {
        let base = match self.encoding {
            Encoding::Bcd => 10,
            Encoding::Binary => 16,
        };
        self.digits
            .iter()
            .fold(0, |acc, nib| acc * base + u32::from(nib.get(frame)))
    }

    #[must_use]
    pub fn value(&self, frame: &[u8]) -> f64 {
        f64::from(self.raw(frame)) / f64::from(self.divisor)
    }

    /// True when every BCD digit is 0-9. Binary fields are always valid.
    #[must_use]
    pub fn is_valid(&self, frame: &[u8]) -> bool {
        match self.encoding {
            Encoding::Bcd => self.digits.iter().all(|nib| nib.get(frame) <= 9),
            Encoding::Binary => true,
        }
    }
}

/// Temperature in 0.1 C steps where raw values above 600 are offset negatives, i.e.,
/// 999 is -0.1 C.
#[must_use]
pub fn offset_temperature(raw: u32) -> f64 {
    let raw = f64::from(raw);
    if raw > 600.0 {
        (raw - 1000.0) / 10.0
    } else {
        raw / 10.0
    }
}
