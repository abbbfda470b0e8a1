use std::sync::Arc;

use tracing::debug;

use crate::bitbuffer::BitRowSet;
use crate::record::Record;

/// Reasons a decoder did not produce a record.
///
/// These are routine outcomes for a capture that belongs to some other protocol, not
/// errors.
#[derive(thiserror::Error, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DecodeFailure {
    /// Capture shape does not fit the protocol at all.
    #[error("unrecognized capture")]
    AbortEarly,
    /// Capture is too short or the sync pattern was not found.
    #[error("capture too short")]
    AbortLength,
    /// Integrity check failed on an otherwise plausible frame.
    #[error("message integrity check failed")]
    FailMic,
    /// The frame is a known invalid pattern.
    #[error("frame failed sanity check")]
    FailSanity,
}

impl DecodeFailure {
    /// Conventional numeric status code.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            DecodeFailure::AbortEarly => -1,
            DecodeFailure::AbortLength => -2,
            DecodeFailure::FailMic => -3,
            DecodeFailure::FailSanity => -4,
        }
    }
}

/// Diagnostic detail a decoder emits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Verbosity {
    #[default]
    Quiet,
    /// Accepted-but-suspect frames.
    Verbose,
    /// Reasons for rejecting a capture.
    Debug,
    /// Frame dumps.
    Trace,
}

/// Per call decode settings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DecodeContext {
    pub verbosity: Verbosity,
}

impl DecodeContext {
    #[must_use]
    pub fn new(verbosity: Verbosity) -> Self {
        DecodeContext { verbosity }
    }

    /// True if diagnostics at `level` should be emitted.
    #[must_use]
    pub fn enabled(&self, level: Verbosity) -> bool {
        level != Verbosity::Quiet && self.verbosity >= level
    }
}

/// How much a decoded record can be trusted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Confidence {
    /// All integrity checks passed.
    #[default]
    Full,
    /// Accepted despite a failed advisory check.
    Degraded,
}

/// Records produced by one successful decode.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Decoded {
    pub records: Vec<Record>,
    pub confidence: Confidence,
}

impl Decoded {
    #[must_use]
    pub fn new(record: Record) -> Self {
        Decoded {
            records: vec![record],
            confidence: Confidence::Full,
        }
    }

    #[must_use]
    pub fn with_confidence(mut self, confidence: Confidence) -> Self {
        self.confidence = confidence;
        self
    }

    /// Number of messages decoded.
    #[must_use]
    pub fn count(&self) -> usize {
        self.records.len()
    }
}

pub type DecodeResult = std::result::Result<Decoded, DecodeFailure>;

/// A protocol decoder.
///
/// Implementations only read the rows and must not block. Plain functions with the
/// matching signature are decoders.
pub trait Decode: Send + Sync {
    /// # Errors
    /// A [DecodeFailure] when the rows do not hold a valid message for this protocol.
    fn decode(&self, ctx: &DecodeContext, rows: &BitRowSet) -> DecodeResult;
}

impl<F> Decode for F
where
    F: Fn(&DecodeContext, &BitRowSet) -> DecodeResult + Send + Sync,
{
    fn decode(&self, ctx: &DecodeContext, rows: &BitRowSet) -> DecodeResult {
        self(ctx, rows)
    }
}

/// What a decoder does with a frame whose digest does not match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DigestPolicy {
    /// Reject with [DecodeFailure::FailMic].
    Enforce,
    /// Accept with [Confidence::Degraded].
    Advisory,
}

/// Tries candidate decoders in priority order and falls back to its own decoder.
///
/// The first candidate producing at least one record wins, so a transmission is never
/// reported by more than one variant of a protocol family.
#[derive(Clone)]
pub struct Piggyback {
    name: &'static str,
    candidates: Vec<(&'static str, Arc<dyn Decode>)>,
    own: Arc<dyn Decode>,
}

impl Piggyback {
    pub fn new(name: &'static str, own: impl Decode + 'static) -> Self {
        Piggyback {
            name,
            candidates: Vec::new(),
            own: Arc::new(own),
        }
    }

    /// Adds a candidate tried after those already added.
    #[must_use]
    pub fn candidate(mut self, name: &'static str, decoder: impl Decode + 'static) -> Self {
        self.candidates.push((name, Arc::new(decoder)));
        self
    }

    pub fn candidate_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.candidates.iter().map(|(name, _)| *name)
    }
}

impl Decode for Piggyback {
    fn decode(&self, ctx: &DecodeContext, rows: &BitRowSet) -> DecodeResult {
        for (name, decoder) in &self.candidates {
            match decoder.decode(ctx, rows) {
                Ok(decoded) if decoded.count() > 0 => return Ok(decoded),
                Ok(_) => {}
                Err(failure) => {
                    if ctx.enabled(Verbosity::Debug) {
                        debug!(
                            composite = self.name,
                            candidate = *name,
                            %failure,
                            "candidate rejected"
                        );
                    }
                }
            }
        }
        self.own.decode(ctx, rows)
    }
}

impl std::fmt::Debug for Piggyback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Piggyback")
            .field("name", &self.name)
            .field("candidates", &self.candidate_names().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
