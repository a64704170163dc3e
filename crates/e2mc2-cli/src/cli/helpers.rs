use super::CliError;
use anyhow::Context;
use e2mc2_core::expansion::{ClusterExpansion, ExpansionSource};
use e2mc2_core::run::{ParamValue, RunParameters, RunResult};
use e2mc2_core::serialization::format_fixed_f64;
use serde::Serialize;
use std::path::Path;

/// Parameter record from defaults (unless `no_defaults`), a JSON record file and
/// `KEY=VALUE` overrides, applied in that order.
pub(super) fn resolve_parameters(
    no_defaults: bool,
    params_file: Option<&Path>,
    overrides: &[String],
) -> Result<RunParameters, CliError> {
    let mut parameters = if no_defaults {
        RunParameters::from_values(std::iter::empty::<(String, ParamValue)>())
    } else {
        RunParameters::default()
    };

    if let Some(path) = params_file {
        let record = RunParameters::load(path)?;
        parameters.update(
            record
                .iter()
                .map(|(name, value)| (name.to_string(), value.clone())),
        );
    }

    for assignment in overrides {
        let (name, value) = parse_assignment(assignment)?;
        parameters.set(name, value);
    }

    Ok(parameters)
}

pub(super) fn parse_assignment(assignment: &str) -> Result<(String, ParamValue), CliError> {
    let (name, value) = assignment.split_once('=').ok_or_else(|| {
        CliError::Usage(format!(
            "parameter '{}' must be written as KEY=VALUE",
            assignment
        ))
    })?;
    let name = name.trim().trim_start_matches('-');
    if name.is_empty() {
        return Err(CliError::Usage(format!(
            "parameter '{}' has an empty name",
            assignment
        )));
    }
    Ok((name.to_string(), ParamValue::parse_literal(value)))
}

pub(super) fn render_expansion_summary(
    source: &ExpansionSource,
    expansion: &ClusterExpansion,
) -> String {
    let mut lines = vec![
        format!("Source: {} '{}'", source.kind(), source.path().display()),
        format!("Clusters: {}", expansion.cluster_count()),
        format!("Lattice lines: {}", expansion.lattice().lines().count()),
        format!(
            "Ground state lines: {}",
            expansion.ground_state().lines().count()
        ),
        "ECI:".to_string(),
    ];

    let terms = expansion.eci().iter().zip(expansion.clusters());
    lines.extend(terms.enumerate().map(|(index, (value, block))| {
        format!(
            "  C{:<4} {:>12}  (multiplicity {})",
            index + 1,
            format_fixed_f64(*value, 6),
            block.lines().next().unwrap_or_default()
        )
    }));

    render_lines(&lines)
}

pub(super) fn render_result_summary(result: &RunResult) -> String {
    let mut lines = vec![
        format!("Run directory: {}", result.run_dir.display()),
        format!("Rows: {}", result.table.row_count()),
        format!("Columns: {}", result.table.columns().join(" ")),
    ];

    if let Some(temperatures) = result.table.column("T") {
        if let (Some(first), Some(last)) = (temperatures.first(), temperatures.last()) {
            lines.push(format!("Temperature range: {} .. {}", first, last));
        }
    }

    lines.push(match &result.snapshots {
        Some(snapshots) => format!("Snapshots: {}", snapshots.len()),
        None => "Snapshots: not configured".to_string(),
    });

    render_lines(&lines)
}

fn render_lines(lines: &[String]) -> String {
    let mut rendered = lines.join("\n");
    rendered.push('\n');
    rendered
}

pub(super) fn to_pretty_json<T: Serialize>(value: &T) -> Result<String, CliError> {
    serde_json::to_string_pretty(value)
        .context("failed to render JSON output")
        .map_err(CliError::from)
}
