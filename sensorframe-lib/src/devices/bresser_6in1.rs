//! Bresser Weather Center 6-in-1, also the 7-in-1 indoor sensor.
//!
//! Preamble `aa aa 2d d4`, followed by an 18 byte frame:
//!
//! ```text
//! DIGEST:8h8h ID:8h8h8h8h FLAGS:4h BATT:1b CH:3d WSPEED:~8h~4h ~4h~8h WDIR:12h ?4h
//! TEMP:8h.4h ?4h HUM:8h UV?~12h ?4h CHKSUM:8h
//! ```
//!
//! Bytes 0-1 are an LFSR-16 digest (generator `0x8810`, key `0x5412`) of bytes 2-16 and
//! bytes 2-17 add up to `0xff`. A station alternates between sending temperature and
//! rain, so temperature, humidity and rain share bytes 12-14.
use tracing::{debug, info, trace};

use crate::bitbuffer::BitRowSet;
use crate::decoder::{
    Confidence, Decode, DecodeContext, DecodeFailure, DecodeResult, Decoded, DigestPolicy,
    Verbosity,
};
use crate::fields::{offset_temperature, Encoding, Nibble, Nibble::*, NibbleField};
use crate::frame::WorkingFrame;
use crate::integrity::{AddChecksum, Carry, IntegrityAlgorithm, LfsrDigest16};
use crate::record::{Record, Value};

pub const NAME: &str = "Bresser-6in1";

pub const FIELDS: &[&str] = &[
    "model",
    "id",
    "channel",
    "battery_ok",
    "temperature_C",
    "humidity",
    "wind_max_m_s",
    "wind_avg_m_s",
    "wind_dir_deg",
    "rain_mm",
    "unknown",
    "uv",
    "flags",
    "mic",
];

const PREAMBLE: [u8; 4] = [0xaa, 0xaa, 0x2d, 0xd4];
const PREAMBLE_BITS: usize = PREAMBLE.len() * 8;
const FRAME_LEN: usize = 18;
const MIN_ROW_BITS: usize = 160;
const MAX_ROW_BITS: usize = 440;

const DIGEST: LfsrDigest16 = LfsrDigest16 {
    generator: 0x8810,
    key: 0x5412,
    range: 2..17,
    final_xor: 0,
};

const CHECKSUM: AddChecksum = AddChecksum {
    range: 2..FRAME_LEN,
    target: 0xff,
    carry: Carry::Keep,
};

const TEMPERATURE: NibbleField = bcd(&[Hi(12), Lo(12), Hi(13)], 1);
const HUMIDITY: NibbleField = bcd(&[Hi(14), Lo(14)], 1);
const UV: NibbleField = bcd(&[Hi(15), Lo(15), Hi(16)], 10);
const UNKNOWN: NibbleField = bcd(&[Hi(15), Lo(15)], 1);
// wind and rain digits are read after inverting their bytes
const WIND_GUST: NibbleField = bcd(&[Hi(7), Lo(7), Hi(8)], 10);
const WIND_AVG: NibbleField = bcd(&[Hi(9), Lo(9), Lo(8)], 10);
const WIND_DIR: NibbleField = bcd(&[Hi(10), Lo(10), Hi(11)], 1);
const RAIN: NibbleField = bcd(&[Hi(13), Lo(13), Hi(14), Lo(14)], 10);

const fn bcd(digits: &'static [Nibble], divisor: u32) -> NibbleField {
    NibbleField {
        digits,
        encoding: Encoding::Bcd,
        divisor,
    }
}

/// Decoder for the 6-in-1 sensor. Digest mismatches are rejected by default.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bresser6in1 {
    pub digest: DigestPolicy,
}

impl Default for Bresser6in1 {
    fn default() -> Self {
        Bresser6in1 {
            digest: DigestPolicy::Enforce,
        }
    }
}

impl Bresser6in1 {
    #[must_use]
    pub fn new(digest: DigestPolicy) -> Self {
        Bresser6in1 { digest }
    }
}

impl Decode for Bresser6in1 {
    fn decode(&self, ctx: &DecodeContext, rows: &BitRowSet) -> DecodeResult {
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
        let remaining = row.bits().saturating_sub(start);
        if remaining < WorkingFrame::<FRAME_LEN>::CAPACITY_BITS {
            if ctx.enabled(Verbosity::Debug) {
                debug!(bits = remaining, "{NAME}: message too short");
            }
            return Err(DecodeFailure::AbortLength);
        }

        let mut msg = WorkingFrame::<FRAME_LEN>::extract(
            row,
            start,
            WorkingFrame::<FRAME_LEN>::CAPACITY_BITS,
        );
        if ctx.enabled(Verbosity::Trace) {
            trace!(frame = msg.hex(), "{NAME}: extracted");
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
        let checksum = CHECKSUM.verify(&msg);
        if !checksum.is_ok() {
            if ctx.enabled(Verbosity::Debug) {
                debug!("{NAME}: checksum failed: {checksum}");
            }
            return Err(DecodeFailure::FailMic);
        }

        let id = u32::from_be_bytes([msg[2], msg[3], msg[4], msg[5]]);
        let flags = msg[6] >> 4;
        let battery_low = (msg[6] >> 3) & 1 == 1;
        let channel = msg[6] & 0x07;

        let temp_ok = msg[12] != 0xff;
        let temperature = offset_temperature(TEMPERATURE.raw(&msg));
        let humidity_ok = msg[14] != 0xff;
        let humidity = HUMIDITY.raw(&msg);
        let uv_ok = (msg[16] & 0xf0) != 0xf0;
        let uv = UV.value(&msg);
        let unknown = UNKNOWN.raw(&msg);

        msg.invert(7..10);
        let wind_ok = msg[7..10].iter().all(|&b| b <= 0x99);
        let wind_gust = WIND_GUST.value(&msg);
        let wind_avg = WIND_AVG.value(&msg);
        let wind_dir = WIND_DIR.raw(&msg);

        // only sent in place of temperature
        msg.invert(13..15);
        let rain = RAIN.value(&msg);

        let record = Record::builder()
            .field("model", "", NAME)
            .field("id", "", id)
            .field("channel", "", channel)
            .field("battery_ok", "Battery", !battery_low)
            .field_if(
                temp_ok,
                "temperature_C",
                "Temperature",
                Value::double(temperature, "%.1f C"),
            )
            .field_if(humidity_ok, "humidity", "Humidity", humidity)
            .field_if(
                wind_ok,
                "wind_max_m_s",
                "Wind Gust",
                Value::double(wind_gust, "%.1f m/s"),
            )
            .field_if(
                wind_ok,
                "wind_avg_m_s",
                "Wind Speed",
                Value::double(wind_avg, "%.1f m/s"),
            )
            .field_if(wind_ok, "wind_dir_deg", "Direction", wind_dir)
            .field_if(!temp_ok, "rain_mm", "Rain", Value::double(rain, "%.1f mm"))
            .field_if(!uv_ok, "unknown", "Unknown", unknown)
            .field_if(uv_ok, "uv", "UV", Value::double(uv, "%.1f"))
            .field("flags", "Flags", flags)
            .field("mic", "Integrity", "CRC")
            .build();

        Ok(Decoded::new(record).with_confidence(confidence))
    }
}
