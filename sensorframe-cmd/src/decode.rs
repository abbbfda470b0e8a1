use std::fs::File;
use std::io::{stdin, stdout, BufRead, BufReader, Read, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use sensorframe::devices::descriptors_with_policy;
use sensorframe::{
    BitRowSet, Confidence, DecodeContext, DecodedCapture, DigestPolicy, Dispatcher, Registry,
    RegistryBuilder, Verbosity,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::Format;

/// Which decoders to run.
#[derive(Debug, Default)]
pub struct Selection {
    pub enable: Vec<String>,
    pub disable: Vec<String>,
    pub only: Vec<String>,
    pub strict_digest: bool,
}

impl Selection {
    fn registry(&self) -> Result<Registry> {
        let policy = if self.strict_digest {
            DigestPolicy::Enforce
        } else {
            DigestPolicy::Advisory
        };
        let mut builder = descriptors_with_policy(policy)
            .into_iter()
            .fold(RegistryBuilder::empty(), RegistryBuilder::register);

        if !self.only.is_empty() {
            builder = builder.disable_all();
            for name in &self.only {
                builder = builder.enable(name);
            }
        }
        for name in &self.enable {
            builder = builder.enable(name);
        }
        for name in &self.disable {
            builder = builder.disable(name);
        }
        builder.build().context("configuring decoders")
    }
}

fn read_captures<R: BufRead>(reader: R) -> Result<Vec<BitRowSet>> {
    let mut captures = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line.context("reading input")?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match line.parse::<BitRowSet>() {
            Ok(rows) => captures.push(rows),
            Err(err) => warn!("line {}: {err}", lineno + 1),
        }
    }
    Ok(captures)
}

#[derive(Serialize)]
struct Output<'a> {
    capture: usize,
    #[serde(flatten)]
    detection: &'a sensorframe::Detection,
}

fn write_capture<W: Write>(out: &mut W, decoded: &DecodedCapture, format: &Format) -> Result<()> {
    for detection in &decoded.detections {
        match format {
            Format::Json => {
                let output = Output {
                    capture: decoded.index,
                    detection,
                };
                serde_json::to_writer(&mut *out, &output).context("serializing to json")?;
                writeln!(out)?;
            }
            Format::Text => {
                let degraded = match detection.decoded.confidence {
                    Confidence::Full => "",
                    Confidence::Degraded => " (degraded)",
                };
                for record in &detection.decoded.records {
                    writeln!(
                        out,
                        "[{}] {}{degraded}: {record}",
                        decoded.index, detection.decoder
                    )?;
                }
            }
        }
    }
    Ok(())
}

pub fn decode(
    input: Option<&Path>,
    selection: &Selection,
    verbosity: Verbosity,
    threads: usize,
    format: &Format,
) -> Result<()> {
    let registry = Arc::new(selection.registry()?);
    debug!(
        "enabled decoders: {:?}",
        registry.enabled().map(|d| d.name).collect::<Vec<_>>()
    );

    let reader: Box<dyn Read> = match input {
        Some(path) if path != Path::new("-") => Box::new(
            File::open(path).with_context(|| format!("opening input {path:?}"))?,
        ),
        _ => Box::new(stdin()),
    };
    let captures = read_captures(BufReader::new(reader))?;
    let total = captures.len();

    let decoded = Dispatcher::builder()
        .num_threads(threads)
        .context(DecodeContext::new(verbosity))
        .build()
        .decode(registry, captures.into_iter())
        .context("starting decoder")?;

    let mut out = stdout().lock();
    let mut recognized = 0;
    for capture in decoded {
        if !capture.detections.is_empty() {
            recognized += 1;
        }
        write_capture(&mut out, &capture, format).context("writing output")?;
    }
    info!("decoded {recognized} of {total} captures");
    Ok(())
}
