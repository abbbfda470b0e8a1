use std::path::PathBuf;

use sensorframe::BitRowSet;

pub fn fixture_path(name: &str) -> PathBuf {
    let mut path =
        PathBuf::from(std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set"));
    path.push("tests/fixtures");
    path.push(name);
    path
}

/// Captures in a fixture, one per line. Blank lines and `#` comments are skipped.
pub fn load_captures(name: &str) -> Vec<BitRowSet> {
    let text = std::fs::read_to_string(fixture_path(name)).unwrap();
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(|l| l.parse().unwrap())
        .collect()
}
