//! Bresser Weather Center 5-in-1.
//!
//! The 5-in-1, 6-in-1 and 7-in-1 stations share timing and preamble, so the registered
//! decoder tries the 7-in-1 and 6-in-1 first and only then the 5-in-1 layout.
//!
//! Preamble `aa aa aa 2d d4`, followed by a 26 byte frame. The first 13 bytes are the
//! bitwise complement of the last 13:
//!
//! ```text
//! CC CC CC CC CC CC CC CC CC CC CC CC CC uu II GG DG WW W TT T HH RR R Bt
//!                                           G-MSB ^     ^ W-MSB  (strange but consistent)
//! ```
//!
//! - C = inverted copy of bytes 13-25
//! - u = number of set bits in bytes 14-25
//! - I = station id
//! - G = wind gust in 1/10 m/s, binary
//! - D = wind direction, 0-15 in 22.5 degree steps
//! - W = wind speed in 1/10 m/s, BCD, low digits first
//! - T = temperature in 1/10 C, BCD, low digits first
//! - H = humidity in percent, BCD
//! - R = rain in 1/10 mm, BCD, low digits first
//! - B = battery, 0 is OK, 8 is low
//! - t = temperature sign, non-zero is negative
use tracing::{debug, trace};

use super::bresser_6in1::{self, Bresser6in1};
use super::bresser_7in1::{self, Bresser7in1};
use crate::bitbuffer::BitRowSet;
use crate::decoder::{
    DecodeContext, DecodeFailure, DecodeResult, Decoded, DigestPolicy, Piggyback, Verbosity,
};
use crate::fields::{Encoding, Nibble, Nibble::*, NibbleField};
use crate::frame::WorkingFrame;
use crate::integrity::{BitCount, IntegrityAlgorithm, InversionParity};
use crate::record::{Record, Value};

pub const NAME: &str = "Bresser-5in1";

/// Fields of the 5-in-1 record plus those of the piggybacked variants.
pub const FIELDS: &[&str] = &[
    "model",
    "id",
    "channel",
    "battery",
    "battery_ok",
    "temperature_C",
    "humidity",
    "wind_max_m_s",
    "wind_avg_m_s",
    "wind_dir_deg",
    "rain_mm",
    "light_klx",
    "unknown",
    "uv",
    "flags",
    "mic",
];

const PREAMBLE: [u8; 5] = [0xaa, 0xaa, 0xaa, 0x2d, 0xd4];
const PREAMBLE_BITS: usize = PREAMBLE.len() * 8;
const FRAME_LEN: usize = 26;
const MIN_ROW_BITS: usize = 248;
const MAX_ROW_BITS: usize = 440;

const PARITY: InversionParity = InversionParity {
    half: FRAME_LEN / 2,
};

const BIT_COUNT: BitCount = BitCount {
    at: 13,
    range: 14..FRAME_LEN,
};

const TEMPERATURE: NibbleField = bcd(&[Lo(21), Hi(20), Lo(20)]);
const HUMIDITY: NibbleField = bcd(&[Hi(22), Lo(22)]);
const WIND_GUST: NibbleField = NibbleField {
    digits: &[Lo(17), Hi(16), Lo(16)],
    encoding: Encoding::Binary,
    divisor: 10,
};
const WIND_AVG: NibbleField = bcd(&[Lo(19), Hi(18), Lo(18)]);
const RAIN: NibbleField = bcd(&[Lo(24), Hi(23), Lo(23)]);

const fn bcd(digits: &'static [Nibble]) -> NibbleField {
    NibbleField {
        digits,
        encoding: Encoding::Bcd,
        divisor: 10,
    }
}

/// The registered 5-in-1 decoder, with the default digest policies of its variants.
#[must_use]
pub fn decoder() -> Piggyback {
    with_policy(Bresser7in1::default().digest)
}

/// The registered 5-in-1 decoder with the given 7-in-1 digest policy.
///
/// The 7-in-1 digest does not match every real 7-in-1 capture. With
/// [DigestPolicy::Advisory] those are still reported as 7-in-1, at the cost of also
/// claiming 5-in-1 captures whose byte 21 happens to be non-zero.
#[must_use]
pub fn with_policy(policy: DigestPolicy) -> Piggyback {
    Piggyback::new(NAME, decode)
        .candidate(bresser_7in1::NAME, Bresser7in1::new(policy))
        .candidate(bresser_6in1::NAME, Bresser6in1::default())
}

/// Decodes the 5-in-1 frame layout only.
///
/// # Errors
/// A [DecodeFailure] if the rows do not hold a valid 5-in-1 frame.
pub fn decode(ctx: &DecodeContext, rows: &BitRowSet) -> DecodeResult {
    let bits = rows.bits_per_row(0);
    if rows.num_rows() != 1 || !(MIN_ROW_BITS..=MAX_ROW_BITS).contains(&bits) {
        if ctx.enabled(Verbosity::Debug) {
            debug!(rows = rows.num_rows(), bits, "{NAME}: bits per row out of range");
        }
        return Err(DecodeFailure::AbortEarly);
    }
    let row = &rows[0];

    let start = row.search(0, &PREAMBLE, PREAMBLE_BITS);
    if start >= row.bits() {
        if ctx.enabled(Verbosity::Debug) {
            debug!("{NAME}: preamble not found");
        }
        return Err(DecodeFailure::AbortLength);
    }
    let start = start + PREAMBLE_BITS;
    let len = row.bits().saturating_sub(start);
    if len.div_ceil(8) < FRAME_LEN {
        if ctx.enabled(Verbosity::Debug) {
            debug!(bits = len, "{NAME}: message too short");
        }
        return Err(DecodeFailure::AbortLength);
    }

    let msg = WorkingFrame::<FRAME_LEN>::extract(
        row,
        start,
        len.min(WorkingFrame::<FRAME_LEN>::CAPACITY_BITS),
    );
    if ctx.enabled(Verbosity::Trace) {
        trace!(frame = msg.hex(), "{NAME}: extracted");
    }

    let parity = PARITY.verify(&msg);
    if !parity.is_ok() {
        if ctx.enabled(Verbosity::Debug) {
            debug!("{NAME}: parity wrong: {parity}");
        }
        return Err(DecodeFailure::FailMic);
    }
    let bit_count = BIT_COUNT.verify(&msg);
    if !bit_count.is_ok() {
        if ctx.enabled(Verbosity::Debug) {
            debug!("{NAME}: bit count wrong: {bit_count}");
        }
        return Err(DecodeFailure::FailMic);
    }

    let id = msg[14];

    let mut temperature = TEMPERATURE.value(&msg);
    if msg[25] & 0x0f != 0 {
        temperature = -temperature;
    }
    let humidity = HUMIDITY.raw(&msg);
    let wind_dir = f64::from(Hi(17).get(&msg)) * 22.5;
    let battery_ok = msg[25] & 0x80 == 0;
    let battery = if battery_ok {
        Value::labeled(1.0, "OK")
    } else {
        Value::labeled(0.0, "LOW")
    };

    let record = Record::builder()
        .field("model", "", NAME)
        .field("id", "", id)
        .field("battery", "Battery", battery)
        .field(
            "temperature_C",
            "Temperature",
            Value::double(temperature, "%.1f C"),
        )
        .field("humidity", "Humidity", humidity)
        .field(
            "wind_max_m_s",
            "Wind Gust",
            Value::double(WIND_GUST.value(&msg), "%.1f m/s"),
        )
        .field(
            "wind_avg_m_s",
            "Wind Speed",
            Value::double(WIND_AVG.value(&msg), "%.1f m/s"),
        )
        .field("wind_dir_deg", "Direction", Value::double(wind_dir, "%.1f"))
        .field(
            "rain_mm",
            "Rain",
            Value::double(RAIN.value(&msg), "%.1f mm"),
        )
        .field("mic", "Integrity", "CHECKSUM")
        .build();

    Ok(Decoded::new(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::Decode;

    fn capture(frame: &str) -> BitRowSet {
        format!("{{264}}aaaaaaaaaa2dd4{frame}").parse().unwrap()
    }

    const FRAME: &str = "ee937ff7bffbef9efeaebfffff116c8008400410610151400000";

    #[test]
    fn decode_frame() {
        let decoded = decode(&DecodeContext::default(), &capture(FRAME)).unwrap();
        let text = decoded.records[0].to_string();
        assert_eq!(
            text,
            "model: Bresser-5in1, id: 108, battery: OK, temperature_C: 16.1 C, humidity: 51, \
             wind_max_m_s: 0.8 m/s, wind_avg_m_s: 0.4 m/s, wind_dir_deg: 90.0, \
             rain_mm: 4.0 mm, mic: CHECKSUM"
        );
    }

    #[test]
    fn negative_temperature_and_low_battery() {
        let rows = capture("eda1ffff1fffef8fffd6dfff77125e0000e00010700029200088");
        let decoded = decode(&DecodeContext::default(), &rows).unwrap();
        let record = &decoded.records[0];
        assert_eq!(
            record.get("temperature_C").map(Value::formatted).as_deref(),
            Some("-7.0 C")
        );
        assert_eq!(record.get("battery").and_then(Value::as_str), Some("LOW"));
    }

    #[test]
    fn parity_failure() {
        // flip one bit in byte 2 of the inverted half
        let corrupted = FRAME.replacen("ee937f", "ee937e", 1);
        assert_eq!(
            decode(&DecodeContext::default(), &capture(&corrupted)),
            Err(DecodeFailure::FailMic)
        );
    }

    #[test]
    fn bit_count_failure() {
        // byte 13 changed from 0x11 to 0x10 with byte 0 still its complement
        let corrupted = format!("ef{}", &FRAME[2..]).replacen("ffff116c", "ffff106c", 1);
        let rows = capture(&corrupted);
        assert!(PARITY.verify(&rows[0].bytes()[7..]).is_ok());
        assert_eq!(
            decode(&DecodeContext::default(), &rows),
            Err(DecodeFailure::FailMic)
        );
    }

    #[test]
    fn truncated_frame_fails_checks() {
        let short = [0u8; FRAME_LEN - 1];
        assert!(!PARITY.verify(&short).is_ok());
        assert!(!BIT_COUNT.verify(&short[..13]).is_ok());
    }

    #[test]
    fn shape_checks() {
        let short: BitRowSet = "{232}aaaaaaaaaa2dd4ee937ff7bffbef9efeaebfffff116c80084004106101"
            .parse()
            .unwrap();
        assert_eq!(
            decode(&DecodeContext::default(), &short),
            Err(DecodeFailure::AbortEarly)
        );

        let no_preamble = capture(FRAME).to_string().replacen("2dd4", "2dd5", 1);
        assert_eq!(
            decode(&DecodeContext::default(), &no_preamble.parse().unwrap()),
            Err(DecodeFailure::AbortLength)
        );

        // preamble too late to leave 26 bytes
        let late: BitRowSet = format!("{{264}}{}aaaaaa2dd4{}", "00".repeat(4), &FRAME[..48])
            .parse()
            .unwrap();
        assert_eq!(
            decode(&DecodeContext::default(), &late),
            Err(DecodeFailure::AbortLength)
        );
    }

    #[test]
    fn composite_reports_each_variant_once() {
        let composite = with_policy(DigestPolicy::Enforce);
        let decoded = composite
            .decode(&DecodeContext::default(), &capture(FRAME))
            .unwrap();
        assert_eq!(decoded.count(), 1);
        assert_eq!(
            decoded.records[0].get("model").and_then(Value::as_str),
            Some(NAME)
        );
    }
}
