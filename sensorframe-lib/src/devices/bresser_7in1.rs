//! Bresser Weather Center 7-in-1 outdoor sensor.
//!
//! Preamble `aa aa aa 2d d4`, followed by a 25 byte frame whitened with `0xaa`:
//!
//! ```text
//! DIGEST:8h8h ID:8h8h WDIR:8h4h 4h 8h WGUST:8h.4h WAVG:8h.4h RAIN:8h8h8h RAIN?:8h
//! TEMP:8h.4hC 4h HUM:8h% LIGHT:8h8h,KL ?:8h8h4h TRAILER:8h8h8h4h
//! ```
//!
//! The first two bytes are an LFSR-16 digest (generator `0x8810`, key `0xba95`) of
//! bytes 2-24 XORed with `0x6df1`.
use tracing::{debug, info, trace};

use crate::bitbuffer::BitRowSet;
use crate::decoder::{
    Confidence, Decode, DecodeContext, DecodeFailure, DecodeResult, Decoded, DigestPolicy,
    Verbosity,
};
use crate::fields::{offset_temperature, Encoding, Nibble::*, NibbleField};
use crate::frame::WorkingFrame;
use crate::integrity::{IntegrityAlgorithm, LfsrDigest16};
use crate::record::{Record, Value};

pub const NAME: &str = "Bresser-7in1";

pub const FIELDS: &[&str] = &[
    "model",
    "id",
    "temperature_C",
    "humidity",
    "wind_max_m_s",
    "wind_avg_m_s",
    "wind_dir_deg",
    "rain_mm",
    "light_klx",
    "mic",
];

const PREAMBLE: [u8; 5] = [0xaa, 0xaa, 0xaa, 0x2d, 0xd4];
const PREAMBLE_BITS: usize = PREAMBLE.len() * 8;
const FRAME_LEN: usize = 25;
/// Frames shorter than this many bytes after the preamble are rejected.
const MIN_FRAME_LEN: usize = 21;
const MIN_ROW_BITS: usize = 160;
const WHITENING: u8 = 0xaa;

const DIGEST: LfsrDigest16 = LfsrDigest16 {
    generator: 0x8810,
    key: 0xba95,
    range: 2..FRAME_LEN,
    final_xor: 0x6df1,
};

const WIND_DIR: NibbleField = bcd(&[Hi(4), Lo(4), Hi(5)], 1);
const WIND_GUST: NibbleField = bcd(&[Hi(7), Lo(7), Hi(8)], 10);
const WIND_AVG: NibbleField = bcd(&[Lo(8), Hi(9), Lo(9)], 10);
const RAIN: NibbleField = bcd(&[Hi(10), Lo(10), Hi(11), Lo(11), Hi(12), Lo(12)], 10);
const TEMPERATURE: NibbleField = bcd(&[Hi(14), Lo(14), Hi(15)], 1);
const HUMIDITY: NibbleField = bcd(&[Hi(16), Lo(16)], 1);
const LIGHT: NibbleField = bcd(&[Hi(17), Lo(17), Hi(18), Lo(18)], 10);

const fn bcd(digits: &'static [crate::fields::Nibble], divisor: u32) -> NibbleField {
    NibbleField {
        digits,
        encoding: Encoding::Bcd,
        divisor,
    }
}

/// Decoder for the 7-in-1 outdoor sensor.
///
/// Real captures do not always pass the digest, so by default a mismatch is logged and
/// the record is returned with [Confidence::Degraded].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bresser7in1 {
    pub digest: DigestPolicy,
}

impl Default for Bresser7in1 {
    fn default() -> Self {
        Bresser7in1 {
            digest: DigestPolicy::Advisory,
        }
    }
}

impl Bresser7in1 {
    #[must_use]
    pub fn new(digest: DigestPolicy) -> Self {
        Bresser7in1 { digest }
    }
}

impl Decode for Bresser7in1 {
    fn decode(&self, ctx: &DecodeContext, rows: &BitRowSet) -> DecodeResult {
        if rows.num_rows() != 1 || rows.bits_per_row(0) < MIN_ROW_BITS {
            if ctx.enabled(Verbosity::Debug) {
                debug!(
                    rows = rows.num_rows(),
                    bits = rows.bits_per_row(0),
                    "{NAME}: too few bits"
                );
            }
            return Err(DecodeFailure::AbortLength);
        }
        let row = &rows[0];

        let start = row.search(0, &PREAMBLE, PREAMBLE_BITS) + PREAMBLE_BITS;
        if start >= row.bits() {
            if ctx.enabled(Verbosity::Debug) {
                debug!("{NAME}: preamble not found");
            }
            return Err(DecodeFailure::AbortEarly);
        }
        let remaining = row.bits() - start;
        if start + MIN_FRAME_LEN * 8 >= row.bits() {
            if ctx.enabled(Verbosity::Debug) {
                debug!(bits = remaining, "{NAME}: message too short");
            }
            return Err(DecodeFailure::AbortLength);
        }

        let mut msg = WorkingFrame::<FRAME_LEN>::extract(
            row,
            start,
            remaining.min(WorkingFrame::<FRAME_LEN>::CAPACITY_BITS),
        );

        if msg[21] == 0x00 {
            if ctx.enabled(Verbosity::Debug) {
                debug!("{NAME}: zero trailer");
            }
            return Err(DecodeFailure::FailSanity);
        }

        msg.dewhiten(WHITENING);
        if ctx.enabled(Verbosity::Trace) {
            trace!(frame = msg.hex(), "{NAME}: de-whitened");
        }

        let mut confidence = Confidence::Full;
        let digest = DIGEST.verify(&msg);
        if !digest.is_ok() {
            match self.digest {
                DigestPolicy::Enforce => {
                    if ctx.enabled(Verbosity::Debug) {
                        debug!("{NAME}: digest check failed: {digest}");
                    }
                    return Err(DecodeFailure::FailMic);
                }
                DigestPolicy::Advisory => {
                    if ctx.enabled(Verbosity::Verbose) {
                        info!("{NAME}: digest check failed: {digest}");
                    }
                    confidence = Confidence::Degraded;
                }
            }
        }

        let id = u16::from_be_bytes([msg[2], msg[3]]);
        let record = Record::builder()
            .field("model", "", NAME)
            .field("id", "", id)
            .field(
                "temperature_C",
                "Temperature",
                Value::double(offset_temperature(TEMPERATURE.raw(&msg)), "%.1f C"),
            )
            .field("humidity", "Humidity", HUMIDITY.raw(&msg))
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
            .field("wind_dir_deg", "Direction", WIND_DIR.raw(&msg))
            .field("rain_mm", "Rain", Value::double(RAIN.value(&msg), "%.1f mm"))
            .field(
                "light_klx",
                "Light",
                Value::double(LIGHT.value(&msg), "%.1f klx"),
            )
            .field("mic", "Integrity", "CRC")
            .build();

        Ok(Decoded::new(record).with_confidence(confidence))
    }
}
