use std::io::{stdout, Write};

use anyhow::{Context, Result};
use sensorframe::Registry;

use crate::Format;

pub fn list(format: &Format) -> Result<()> {
    let registry = Registry::global();
    let mut out = stdout().lock();
    match format {
        Format::Json => {
            serde_json::to_writer_pretty(&mut out, registry.descriptors())
                .context("serializing to json")?;
            writeln!(out)?;
        }
        Format::Text => {
            writeln!(out, "{:<16} {:<8} {:<14} Description", "Name", "Enabled", "Modulation")?;
            for desc in registry.descriptors() {
                writeln!(
                    out,
                    "{:<16} {:<8} {:<14} {}",
                    desc.name,
                    if desc.enabled { "yes" } else { "no" },
                    desc.modulation,
                    desc.description
                )?;
            }
        }
    }
    Ok(())
}
