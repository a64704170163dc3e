use crate::domain::{E2mc2Error, E2mc2Result};
use std::fs;
use std::path::Path;
use tracing::debug;

pub fn format_fixed_f64(value: f64, precision: usize) -> String {
    format!("{value:.precision$}", precision = precision)
}

/// Returns the bytes of `content`, refusing anything outside 7-bit ASCII.
pub fn ascii_bytes<'a>(content: &'a str, artifact_name: &str) -> E2mc2Result<&'a [u8]> {
    if let Some((offset, character)) = content.char_indices().find(|(_, c)| !c.is_ascii()) {
        return Err(E2mc2Error::input_validation(
            "INPUT.NON_ASCII",
            format!(
                "'{}' contains non-ASCII character {:?} at byte offset {}",
                artifact_name, character, offset
            ),
        ));
    }
    Ok(content.as_bytes())
}

pub fn write_text_artifact(path: &Path, content: &str) -> E2mc2Result<()> {
    debug!("writing {} bytes to '{}'", content.len(), path.display());
    fs::write(path, content).map_err(|source| {
        E2mc2Error::io_system(
            "IO.WRITE_ARTIFACT",
            format!("failed to write '{}': {}", path.display(), source),
        )
    })
}

pub fn write_json_artifact<T: serde::Serialize>(path: &Path, value: &T) -> E2mc2Result<()> {
    let content = serde_json::to_string_pretty(value).map_err(|source| {
        E2mc2Error::io_system(
            "IO.SERIALIZE_JSON",
            format!("failed to serialize '{}': {}", path.display(), source),
        )
    })?;
    write_text_artifact(path, &content)
}
