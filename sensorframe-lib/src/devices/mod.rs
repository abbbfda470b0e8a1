//! Built-in protocol decoders.
use std::sync::Arc;

use crate::decoder::DigestPolicy;
use crate::registry::{DecoderDescriptor, Modulation, Timing};

pub mod bresser_5in1;
pub mod bresser_6in1;
pub mod bresser_7in1;

pub use bresser_6in1::Bresser6in1;
pub use bresser_7in1::Bresser7in1;

const BRESSER_TIMING: Timing = Timing {
    short_width: 124.0,
    long_width: 124.0,
    reset_limit: 25000.0,
    gap_limit: None,
};

/// Descriptors for every built-in decoder, in dispatch order.
///
/// The 6-in-1 and 7-in-1 are disabled by default since the 5-in-1 decoder already
/// tries them.
#[must_use]
pub fn descriptors() -> Vec<DecoderDescriptor> {
    descriptors_with_policy(Bresser7in1::default().digest)
}

/// Like [descriptors], with the 7-in-1 digest policy used both by the 7-in-1 decoder
/// and by the 5-in-1 decoder's 7-in-1 candidate.
#[must_use]
pub fn descriptors_with_policy(seven_in_one: DigestPolicy) -> Vec<DecoderDescriptor> {
    vec![
        DecoderDescriptor::builder()
            .name(bresser_5in1::NAME)
            .description("Bresser Weather Center 5-in-1")
            .modulation(Modulation::FskPulsePcm)
            .timing(BRESSER_TIMING)
            .decoder(Arc::new(bresser_5in1::with_policy(seven_in_one)))
            .fields(bresser_5in1::FIELDS)
            .build(),
        DecoderDescriptor::builder()
            .name(bresser_6in1::NAME)
            .description("Bresser Weather Center 6-in-1")
            .modulation(Modulation::FskPulsePcm)
            .timing(BRESSER_TIMING)
            .decoder(Arc::new(Bresser6in1::default()))
            .enabled(false)
            .fields(bresser_6in1::FIELDS)
            .build(),
        DecoderDescriptor::builder()
            .name(bresser_7in1::NAME)
            .description("Bresser Weather Center 7-in-1")
            .modulation(Modulation::FskPulsePcm)
            .timing(BRESSER_TIMING)
            .decoder(Arc::new(Bresser7in1::new(seven_in_one)))
            .enabled(false)
            .fields(bresser_7in1::FIELDS)
            .build(),
    ]
}
