#![doc = include_str!("../README.md")]

mod error;
mod prelude;

pub mod bitbuffer;
pub mod decoder;
pub mod devices;
pub mod fields;
pub mod frame;
pub mod integrity;
pub mod pipeline;
pub mod record;
pub mod registry;

pub use bitbuffer::{BitRow, BitRowSet};
pub use decoder::{
    Confidence, Decode, DecodeContext, DecodeFailure, DecodeResult, Decoded, DigestPolicy,
    Piggyback, Verbosity,
};
pub use error::{Error, Result};
pub use frame::WorkingFrame;
pub use pipeline::{DecodedCapture, DecodedCaptureIter, Dispatcher, StopHandle};
pub use record::{Field, Record, RecordBuilder, Value};
pub use registry::{DecoderDescriptor, Detection, Modulation, Registry, RegistryBuilder, Timing};
