use crate::domain::{E2mc2Error, E2mc2Result};
use crate::serialization::format_fixed_f64;

pub(crate) const CLUSTER_SEPARATOR: &str = "\n\n";

/// Splits `clusters.out` text into blocks on blank lines. Block text is kept byte for byte.
pub fn split_clusters(source: &str) -> Vec<String> {
    let trimmed = source.trim_matches('\n');
    if trimmed.is_empty() {
        return Vec::new();
    }

    trimmed
        .split(CLUSTER_SEPARATOR)
        .map(|block| block.to_string())
        .collect()
}

/// Inverse of [`split_clusters`]: blocks joined by a blank line plus one trailing newline.
pub fn join_clusters(blocks: &[String]) -> String {
    if blocks.is_empty() {
        return String::new();
    }
    let mut joined = blocks.join(CLUSTER_SEPARATOR);
    joined.push('\n');
    joined
}

pub fn parse_eci(source: &str, artifact_name: &str) -> E2mc2Result<Vec<f64>> {
    let mut lines: Vec<&str> = source.split('\n').collect();
    if lines.last().is_some_and(|line| line.trim().is_empty()) {
        lines.pop();
    }

    lines
        .into_iter()
        .enumerate()
        .map(|(index, line)| {
            let text = line.trim();
            match text.parse::<f64>() {
                Ok(value) if value.is_finite() => Ok(value),
                _ => Err(E2mc2Error::parse(
                    "PARSE.ECI_VALUE",
                    format!(
                        "invalid ECI value '{}' at line {} of '{}'",
                        text,
                        index + 1,
                        artifact_name
                    ),
                )),
            }
        })
        .collect()
}

pub fn format_eci(values: &[f64], precision: usize) -> String {
    let mut content = String::with_capacity(values.len() * (precision + 4));
    for value in values {
        content.push_str(&format_fixed_f64(*value, precision));
        content.push('\n');
    }
    content
}
