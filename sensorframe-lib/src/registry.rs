use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, OnceLock};

use tracing::trace;
use typed_builder::TypedBuilder;

use crate::bitbuffer::BitRowSet;
use crate::decoder::{Decode, DecodeContext, Decoded};
use crate::devices;
use crate::prelude::*;

/// Pulse modulation the demodulator uses to slice a capture into rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum Modulation {
    OokPulsePcm,
    OokPulsePpm,
    OokPulsePwm,
    OokPulseManchesterZerobit,
    FskPulsePcm,
    FskPulsePwm,
    FskPulseManchesterZerobit,
}

impl fmt::Display for Modulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Modulation::OokPulsePcm => "OOK_PULSE_PCM",
            Modulation::OokPulsePpm => "OOK_PULSE_PPM",
            Modulation::OokPulsePwm => "OOK_PULSE_PWM",
            Modulation::OokPulseManchesterZerobit => "OOK_PULSE_MANCHESTER_ZEROBIT",
            Modulation::FskPulsePcm => "FSK_PULSE_PCM",
            Modulation::FskPulsePwm => "FSK_PULSE_PWM",
            Modulation::FskPulseManchesterZerobit => "FSK_PULSE_MANCHESTER_ZEROBIT",
        };
        f.pad(name)
    }
}

/// Pulse timing in microseconds.
///
/// Only consumed by the demodulator; decoders never look at it.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Timing {
    pub short_width: f32,
    pub long_width: f32,
    /// Gap that ends a capture.
    pub reset_limit: f32,
    /// Gap that ends a row.
    pub gap_limit: Option<f32>,
}

/// Static description of one protocol decoder.
#[derive(Clone, TypedBuilder)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DecoderDescriptor {
    /// Stable name used to enable or disable the decoder.
    pub name: &'static str,
    pub description: &'static str,
    pub modulation: Modulation,
    pub timing: Timing,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub decoder: Arc<dyn Decode>,
    #[builder(default = true)]
    pub enabled: bool,
    /// Every field name a record from this decoder may contain.
    pub fields: &'static [&'static str],
}

impl fmt::Debug for DecoderDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecoderDescriptor")
            .field("name", &self.name)
            .field("modulation", &self.modulation)
            .field("timing", &self.timing)
            .field("enabled", &self.enabled)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

/// A successful decode by a named decoder.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Detection {
    pub decoder: &'static str,
    pub decoded: Decoded,
}

/// Immutable table of decoders.
///
/// The default registry holds all built-in decoders with their default enabled state.
/// Use [Registry::builder] to change which are enabled or to add your own.
#[derive(Clone, Debug)]
pub struct Registry {
    descriptors: Vec<DecoderDescriptor>,
}

impl Registry {
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder {
            descriptors: devices::descriptors(),
            toggles: Vec::new(),
        }
    }

    /// Process wide default registry.
    pub fn global() -> &'static Registry {
        static REGISTRY: OnceLock<Registry> = OnceLock::new();
        REGISTRY.get_or_init(Registry::default)
    }

    #[must_use]
    pub fn descriptors(&self) -> &[DecoderDescriptor] {
        &self.descriptors
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&DecoderDescriptor> {
        self.descriptors.iter().find(|d| d.name == name)
    }

    pub fn enabled(&self) -> impl Iterator<Item = &DecoderDescriptor> {
        self.descriptors.iter().filter(|d| d.enabled)
    }

    /// Runs every enabled decoder against `rows`, in registry order.
    #[must_use]
    pub fn decode(&self, ctx: &DecodeContext, rows: &BitRowSet) -> Vec<Detection> {
        self.enabled()
            .filter_map(|desc| detect(desc, ctx, rows))
            .collect()
    }
}

pub(crate) fn detect(
    desc: &DecoderDescriptor,
    ctx: &DecodeContext,
    rows: &BitRowSet,
) -> Option<Detection> {
    match desc.decoder.decode(ctx, rows) {
        Ok(decoded) if decoded.count() > 0 => Some(Detection {
            decoder: desc.name,
            decoded,
        }),
        Ok(_) => None,
        Err(failure) => {
            trace!(decoder = desc.name, code = failure.code(), "{failure}");
            None
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Registry {
            descriptors: devices::descriptors(),
        }
    }
}

enum Toggle {
    One(String, bool),
    All(bool),
}

/// Configures a [Registry].
///
/// Toggles are applied in call order when the registry is built.
pub struct RegistryBuilder {
    descriptors: Vec<DecoderDescriptor>,
    toggles: Vec<Toggle>,
}

impl RegistryBuilder {
    /// A builder without any of the built-in decoders.
    #[must_use]
    pub fn empty() -> Self {
        RegistryBuilder {
            descriptors: Vec::new(),
            toggles: Vec::new(),
        }
    }

    #[must_use]
    pub fn register(mut self, descriptor: DecoderDescriptor) -> Self {
        self.descriptors.push(descriptor);
        self
    }

    #[must_use]
    pub fn enable(mut self, name: impl Into<String>) -> Self {
        self.toggles.push(Toggle::One(name.into(), true));
        self
    }

    #[must_use]
    pub fn disable(mut self, name: impl Into<String>) -> Self {
        self.toggles.push(Toggle::One(name.into(), false));
        self
    }

    /// Disables every decoder, overriding earlier toggles. Follow with [Self::enable] to
    /// select specific decoders.
    #[must_use]
    pub fn disable_all(mut self) -> Self {
        self.toggles.push(Toggle::All(false));
        self
    }

    /// # Errors
    /// [Error::DuplicateDecoder] if two descriptors share a name, or
    /// [Error::UnknownDecoder] if a toggled name is not registered.
    pub fn build(self) -> Result<Registry> {
        let mut descriptors = self.descriptors;

        let mut seen = HashSet::new();
        for desc in &descriptors {
            if !seen.insert(desc.name) {
                return Err(Error::DuplicateDecoder(desc.name.to_string()));
            }
        }

        for toggle in self.toggles {
            match toggle {
                Toggle::One(name, enabled) => {
                    let Some(desc) = descriptors.iter_mut().find(|d| d.name == name) else {
                        return Err(Error::UnknownDecoder(name));
                    };
                    desc.enabled = enabled;
                }
                Toggle::All(enabled) => {
                    for desc in &mut descriptors {
                        desc.enabled = enabled;
                    }
                }
            }
        }

        Ok(Registry { descriptors })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::{DecodeFailure, DecodeResult};
    use crate::record::Record;

    fn accept(_: &DecodeContext, _: &BitRowSet) -> DecodeResult {
        Ok(Decoded::new(Record::builder().field("model", "", "Test").build()))
    }

    fn reject(_: &DecodeContext, _: &BitRowSet) -> DecodeResult {
        Err(DecodeFailure::AbortEarly)
    }

    fn descriptor(name: &'static str, decoder: Arc<dyn Decode>) -> DecoderDescriptor {
        DecoderDescriptor::builder()
            .name(name)
            .description("test")
            .modulation(Modulation::OokPulsePwm)
            .timing(Timing {
                short_width: 500.0,
                long_width: 1000.0,
                reset_limit: 4000.0,
                gap_limit: None,
            })
            .decoder(decoder)
            .fields(&["model"])
            .build()
    }

    #[test]
    fn builtin_names_are_unique() {
        let registry = Registry::builder().build().unwrap();
        assert_eq!(registry.descriptors().len(), Registry::default().descriptors().len());
    }

    #[test]
    fn global_is_default() {
        let names: Vec<_> = Registry::global().enabled().map(|d| d.name).collect();
        let expected: Vec<_> = Registry::default().enabled().map(|d| d.name).collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn toggles() {
        let registry = RegistryBuilder::empty()
            .register(descriptor("a", Arc::new(accept)))
            .register(descriptor("b", Arc::new(accept)))
            .disable("a")
            .build()
            .unwrap();
        let enabled: Vec<_> = registry.enabled().map(|d| d.name).collect();
        assert_eq!(enabled, vec!["b"]);
        assert!(registry.get("a").is_some());

        let registry = RegistryBuilder::empty()
            .register(descriptor("a", Arc::new(accept)))
            .register(descriptor("b", Arc::new(accept)))
            .disable_all()
            .enable("a")
            .build()
            .unwrap();
        let enabled: Vec<_> = registry.enabled().map(|d| d.name).collect();
        assert_eq!(enabled, vec!["a"]);
    }

    #[test]
    fn disable_all_overrides_earlier_enable() {
        let registry = RegistryBuilder::empty()
            .register(descriptor("a", Arc::new(accept)))
            .register(descriptor("b", Arc::new(accept)))
            .enable("a")
            .disable_all()
            .build()
            .unwrap();
        assert_eq!(registry.enabled().count(), 0);

        let registry = Registry::builder()
            .enable(crate::devices::bresser_6in1::NAME)
            .disable_all()
            .build()
            .unwrap();
        assert_eq!(registry.enabled().count(), 0);
    }

    #[test]
    fn modulation_display_pads() {
        assert_eq!(format!("{:<16}|", Modulation::FskPulsePcm), "FSK_PULSE_PCM   |");
    }

    #[test]
    fn unknown_toggle_is_error() {
        let zult = RegistryBuilder::empty().enable("nope").build();
        assert!(matches!(zult, Err(Error::UnknownDecoder(name)) if name == "nope"));
    }

    #[test]
    fn duplicate_is_error() {
        let zult = RegistryBuilder::empty()
            .register(descriptor("a", Arc::new(accept)))
            .register(descriptor("a", Arc::new(reject)))
            .build();
        assert!(matches!(zult, Err(Error::DuplicateDecoder(name)) if name == "a"));
    }

    #[test]
    fn decode_collects_successes_in_order() {
        let registry = RegistryBuilder::empty()
            .register(descriptor("first", Arc::new(accept)))
            .register(descriptor("failing", Arc::new(reject)))
            .register(descriptor("second", Arc::new(accept)))
            .build()
            .unwrap();
        let detections = registry.decode(&DecodeContext::default(), &BitRowSet::default());
        let names: Vec<_> = detections.iter().map(|d| d.decoder).collect();
        assert_eq!(names, vec!["first", "second"]);
    }
}
