use std::fmt::{self, Display, Write};
use std::ops::Index;
use std::str::FromStr;

use crate::prelude::*;

/// Maximum number of bits in a single row.
pub const MAX_ROW_BITS: usize = 1024;

/// Maximum number of rows in a single capture.
pub const MAX_ROWS: usize = 50;

/// One demodulated transmission as a sequence of bits.
///
/// Bits are stored MSB first, so bit 0 is the high bit of the first byte. Bits past
/// [BitRow::bits] in the final byte are always zero.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BitRow {
    bytes: Vec<u8>,
    bits: usize,
}

impl BitRow {
    /// Creates a row of `bits` bits from `bytes`.
    ///
    /// Extra trailing bytes are dropped and unused bits of the final byte are cleared.
    ///
    /// # Errors
    /// [Error::RowTooLong] if `bits` exceeds [MAX_ROW_BITS], or [Error::NotEnoughData] if
    /// `bytes` cannot hold `bits` bits.
    pub fn new(bytes: impl Into<Vec<u8>>, bits: usize) -> Result<Self> {
        if bits > MAX_ROW_BITS {
            return Err(Error::RowTooLong {
                bits,
                maximum: MAX_ROW_BITS,
            });
        }
        let mut bytes = bytes.into();
        let len = bits.div_ceil(8);
        if bytes.len() < len {
            return Err(Error::NotEnoughData {
                actual: bytes.len(),
                minimum: len,
            });
        }
        bytes.truncate(len);
        if bits % 8 != 0 {
            bytes[len - 1] &= 0xff << (8 - bits % 8);
        }
        Ok(BitRow { bytes, bits })
    }

    /// Number of valid bits in this row.
    #[must_use]
    pub fn bits(&self) -> usize {
        self.bits
    }

    /// The backing bytes, with unused trailing bits zeroed.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Value of the bit at `idx`.
    ///
    /// # Panics
    /// If `idx` is not less than [BitRow::bits].
    #[must_use]
    pub fn bit(&self, idx: usize) -> bool {
        assert!(idx < self.bits, "bit {idx} out of range for {} bits", self.bits);
        bit_at(&self.bytes, idx)
    }

    /// Finds the first offset at or after `start` where the first `pattern_bits` bits of
    /// `pattern` occur.
    ///
    /// Returns [BitRow::bits] when the pattern is not found, so callers must treat any
    /// offset `>= bits()` as a miss. An empty pattern never matches.
    ///
    /// # Panics
    /// If `pattern` holds fewer than `pattern_bits` bits.
    #[must_use]
    pub fn search(&self, start: usize, pattern: &[u8], pattern_bits: usize) -> usize {
        assert!(
            pattern_bits <= pattern.len() * 8,
            "pattern of {} bytes cannot hold {pattern_bits} bits",
            pattern.len()
        );
        if pattern_bits == 0 || pattern_bits > self.bits {
            return self.bits;
        }
        (start..=self.bits - pattern_bits)
            .find(|&pos| {
                (0..pattern_bits).all(|i| bit_at(&self.bytes, pos + i) == bit_at(pattern, i))
            })
            .unwrap_or(self.bits)
    }

    /// Copies `bit_count` bits starting at bit `start` into `dst`, byte aligned.
    ///
    /// Bit `start` becomes the high bit of `dst[0]`. When `bit_count` is not a multiple of
    /// 8 the unused low bits of the final byte are zeroed. Bytes of `dst` past the copied
    /// range are left untouched.
    ///
    /// # Panics
    /// If `start + bit_count` exceeds [BitRow::bits] or `dst` is too short. Decoders check
    /// the remaining length before extracting.
    pub fn extract_bytes(&self, start: usize, dst: &mut [u8], bit_count: usize) {
        assert!(
            start + bit_count <= self.bits,
            "extracting {bit_count} bits at {start} overruns row of {} bits",
            self.bits
        );
        let len = bit_count.div_ceil(8);
        assert!(dst.len() >= len, "destination too short for {bit_count} bits");

        let first = start / 8;
        let shift = start % 8;
        for (i, out) in dst[..len].iter_mut().enumerate() {
            let hi = self.bytes[first + i];
            *out = if shift == 0 {
                hi
            } else {
                let lo = self.bytes.get(first + i + 1).copied().unwrap_or(0);
                (hi << shift) | (lo >> (8 - shift))
            };
        }
        if bit_count % 8 != 0 {
            dst[len - 1] &= 0xff << (8 - bit_count % 8);
        }
    }
}

fn bit_at(dat: &[u8], idx: usize) -> bool {
    (dat[idx / 8] >> (7 - idx % 8)) & 1 == 1
}

/// Parses the `{bits}hex` notation, e.g., `{12}abc`.
impl FromStr for BitRow {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let Some((bits, digits)) = s.strip_prefix('{').and_then(|s| s.split_once('}')) else {
            return Err(Error::InvalidRow(format!("missing {{bits}} prefix: {s:?}")));
        };
        let bits: usize = bits
            .trim()
            .parse()
            .map_err(|_| Error::InvalidRow(format!("invalid bit count: {bits:?}")))?;

        let mut bytes = Vec::with_capacity(digits.len().div_ceil(2));
        for (i, c) in digits.trim().chars().enumerate() {
            let Some(nib) = c.to_digit(16) else {
                return Err(Error::InvalidRow(format!("invalid hex digit {c:?}")));
            };
            // to_digit(16) is always < 16
            let nib = nib as u8;
            if i % 2 == 0 {
                bytes.push(nib << 4);
            } else if let Some(last) = bytes.last_mut() {
                *last |= nib;
            }
        }
        BitRow::new(bytes, bits)
    }
}

impl Display for BitRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.bits)?;
        for b in &self.bytes {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

/// All rows demodulated from a single capture window.
///
/// Rows are usually repeats of the same message, possibly with different alignment.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct BitRowSet {
    rows: Vec<BitRow>,
}

impl BitRowSet {
    /// # Errors
    /// [Error::TooManyRows] if there are more than [MAX_ROWS] rows.
    pub fn new(rows: Vec<BitRow>) -> Result<Self> {
        if rows.len() > MAX_ROWS {
            return Err(Error::TooManyRows {
                rows: rows.len(),
                maximum: MAX_ROWS,
            });
        }
        Ok(BitRowSet { rows })
    }

    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn rows(&self) -> &[BitRow] {
        &self.rows
    }

    #[must_use]
    pub fn row(&self, idx: usize) -> Option<&BitRow> {
        self.rows.get(idx)
    }

    /// Bit length of row `idx`, or 0 if there is no such row.
    #[must_use]
    pub fn bits_per_row(&self, idx: usize) -> usize {
        self.rows.get(idx).map_or(0, BitRow::bits)
    }
}

impl From<BitRow> for BitRowSet {
    fn from(row: BitRow) -> Self {
        BitRowSet { rows: vec![row] }
    }
}

impl Index<usize> for BitRowSet {
    type Output = BitRow;

    fn index(&self, idx: usize) -> &BitRow {
        &self.rows[idx]
    }
}

/// Parses rows in `{bits}hex` notation separated by whitespace or `/`.
impl FromStr for BitRowSet {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let rows = s
            .split(|c: char| c.is_whitespace() || c == '/')
            .filter(|s| !s.is_empty())
            .map(BitRow::from_str)
            .collect::<Result<Vec<_>>>()?;
        BitRowSet::new(rows)
    }
}

impl Display for BitRowSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, row) in self.rows.iter().enumerate() {
            if i > 0 {
                f.write_char(' ')?;
            }
            write!(f, "{row}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn row(s: &str) -> BitRow {
        s.parse().unwrap()
    }

    #[test]
    fn new_masks_trailing_bits() {
        let row = BitRow::new(vec![0xff, 0xff, 0xff], 12).unwrap();
        assert_eq!(row.bytes(), &[0xff, 0xf0]);
        assert_eq!(row.bits(), 12);
    }

    #[test]
    fn new_rejects_long_rows() {
        let zult = BitRow::new(vec![0u8; 200], MAX_ROW_BITS + 1);
        assert!(matches!(zult, Err(Error::RowTooLong { .. })), "got {zult:?}");
    }

    #[test]
    fn new_rejects_short_data() {
        let zult = BitRow::new(vec![0u8; 2], 17);
        assert!(
            matches!(zult, Err(Error::NotEnoughData { actual: 2, minimum: 3 })),
            "got {zult:?}"
        );
    }

    #[test]
    fn rowset_rejects_too_many_rows() {
        let rows = vec![BitRow::new(vec![0u8], 8).unwrap(); MAX_ROWS + 1];
        assert!(matches!(
            BitRowSet::new(rows),
            Err(Error::TooManyRows { rows: 51, .. })
        ));
    }

    #[test]
    fn parse_and_display() {
        let row = row("{12}abc");
        assert_eq!(row.bits(), 12);
        assert_eq!(row.bytes(), &[0xab, 0xc0]);
        assert_eq!(row.to_string(), "{12}abc0");
        assert_eq!(row.to_string().parse::<BitRow>().unwrap(), row);
    }

    #[test_case("12}ab" ; "missing brace")]
    #[test_case("{x}ab" ; "bad count")]
    #[test_case("{8}zz" ; "bad digit")]
    #[test_case("{16}ab" ; "too few digits")]
    fn parse_invalid(s: &str) {
        assert!(s.parse::<BitRow>().is_err());
    }

    #[test]
    fn parse_rowset() {
        let rows: BitRowSet = "{8}ff {4}a/{16}1234".parse().unwrap();
        assert_eq!(rows.num_rows(), 3);
        assert_eq!(rows.bits_per_row(1), 4);
        assert_eq!(rows.bits_per_row(9), 0);
        assert_eq!(rows[2].bytes(), &[0x12, 0x34]);
        assert_eq!(rows.to_string(), "{8}ff {4}a0 {16}1234");
    }

    #[test]
    fn bit_access() {
        let row = row("{10}a5c0");
        let bits: Vec<bool> = (0..row.bits()).map(|i| row.bit(i)).collect();
        assert_eq!(
            bits,
            vec![true, false, true, false, false, true, false, true, true, true]
        );
    }

    #[test_case(&[0x2d, 0xd4], 16, 12 ; "byte spanning")]
    #[test_case(&[0xa0], 3, 0 ; "sub byte")]
    #[test_case(&[0x8b, 0x75, 0x00], 18, 10 ; "shifted")]
    fn search_found(pattern: &[u8], bits: usize, expected: usize) {
        // 1010 1010 1010 | 0010 1101 1101 0100
        let row = row("{28}aaa2dd4");
        assert_eq!(row.search(0, pattern, bits), expected);
    }

    #[test]
    fn search_respects_start() {
        let row = row("{28}aaa2dd4");
        assert_eq!(row.search(1, &[0xa0], 3), 2);
        assert_eq!(row.search(13, &[0x2d, 0xd4], 16), row.bits());
    }

    #[test]
    fn search_not_found_returns_row_length() {
        let row = row("{28}aaa2dd4");
        assert_eq!(row.search(0, &[0xff], 8), 28);
        assert_eq!(row.search(0, &[0xaa], 0), 28);
        assert_eq!(row.search(0, &[0xaa; 8], 64), 28);
        assert_eq!(row.search(40, &[0xa0], 3), 28);
    }

    #[test]
    fn search_does_not_match_padding() {
        // Trailing zero bits past the row end must not complete a match.
        let row = row("{4}f");
        assert_eq!(row.search(0, &[0xf0], 8), 4);
    }

    #[test]
    fn extract_aligned() {
        let row = row("{32}deadbeef");
        let mut dst = [0u8; 4];
        row.extract_bytes(8, &mut dst, 16);
        assert_eq!(dst, [0xad, 0xbe, 0, 0]);
    }

    #[test]
    fn extract_unaligned_with_partial_byte() {
        let row = row("{32}deadbeef");
        let mut dst = [0u8; 2];
        // bits 4..16 are e ad
        row.extract_bytes(4, &mut dst, 12);
        assert_eq!(dst, [0xea, 0xd0]);
    }

    #[test]
    fn extract_to_end_of_row() {
        let row = row("{20}abcde");
        let mut dst = [0u8; 2];
        row.extract_bytes(7, &mut dst, 13);
        assert_eq!(dst, [0xe6, 0xf0]);
    }

    #[test]
    fn extract_ignores_bits_outside_range() {
        let a = row("{24}00ff00");
        let b = row("{24}ffffff");
        let (mut da, mut db) = ([0u8; 1], [0u8; 1]);
        a.extract_bytes(8, &mut da, 5);
        b.extract_bytes(8, &mut db, 5);
        assert_eq!(da, db);
        assert_eq!(da, [0xf8]);
    }

    #[test]
    #[should_panic(expected = "overruns")]
    fn extract_out_of_bounds_panics() {
        let row = row("{16}ffff");
        let mut dst = [0u8; 4];
        row.extract_bytes(9, &mut dst, 8);
    }
}
