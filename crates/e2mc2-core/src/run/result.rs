use super::params::RunParameters;
use super::PARAMS_FILE;
use crate::domain::{E2mc2Error, E2mc2Result};
use crate::expansion::ClusterExpansion;
use globset::{Glob, GlobMatcher};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Leading columns of the solver output table, before one column per ECI.
pub const FIXED_COLUMNS: [&str; 17] = [
    "T", "mu", "E", "x", "phi", "E2", "x2", "E_lte", "x_lte", "phi_lte", "E_mf", "x_mf",
    "phi_mf", "E_hte", "x_hte", "phi_hte", "lro",
];

const SNAPSHOT_PREFIX_CHARS: usize = 4;
const SNAPSHOT_SUFFIX: &str = ".out";

pub fn column_names(eci_count: usize) -> Vec<String> {
    FIXED_COLUMNS
        .iter()
        .map(|name| name.to_string())
        .chain((1..=eci_count).map(|index| format!("C{}", index)))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunTable {
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl RunTable {
    /// Parses a header-less whitespace-delimited table with `17 + eci_count` columns.
    pub fn parse(source: &str, eci_count: usize, artifact_name: &str) -> E2mc2Result<Self> {
        let columns = column_names(eci_count);
        let mut rows = Vec::new();

        for (index, line) in source.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let row = line
                .split_whitespace()
                .map(|token| {
                    token.parse::<f64>().map_err(|_| {
                        E2mc2Error::parse(
                            "PARSE.TABLE_VALUE",
                            format!(
                                "invalid number '{}' at line {} of '{}'",
                                token,
                                index + 1,
                                artifact_name
                            ),
                        )
                    })
                })
                .collect::<E2mc2Result<Vec<f64>>>()?;

            if row.len() != columns.len() {
                return Err(E2mc2Error::parse(
                    "PARSE.TABLE_COLUMNS",
                    format!(
                        "line {} of '{}' has {} columns, expected {} ({} fixed + {} ECI)",
                        index + 1,
                        artifact_name,
                        row.len(),
                        columns.len(),
                        FIXED_COLUMNS.len(),
                        eci_count
                    ),
                ));
            }
            rows.push(row);
        }

        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let index = self.columns.iter().position(|column| column == name)?;
        Some(self.rows.iter().map(|row| row[index]).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunResult {
    pub run_dir: PathBuf,
    pub parameters: RunParameters,
    pub table: RunTable,
    pub snapshots: Option<Vec<PathBuf>>,
}

impl RunResult {
    /// Loads a run directory, reading the expansion written into it for the ECI count.
    pub fn load(run_dir: &Path) -> E2mc2Result<Self> {
        ensure_run_dir(run_dir)?;
        let expansion = ClusterExpansion::from_dir(run_dir)?;
        Self::load_with_expansion(run_dir, &expansion)
    }

    pub fn load_with_expansion(run_dir: &Path, expansion: &ClusterExpansion) -> E2mc2Result<Self> {
        ensure_run_dir(run_dir)?;

        let params_path = run_dir.join(PARAMS_FILE);
        let parameters = if params_path.is_file() {
            RunParameters::load(&params_path)?
        } else {
            debug!(
                "no parameter record in '{}', using defaults",
                run_dir.display()
            );
            RunParameters::default()
        };

        let table_name = parameters.table_file();
        let table_path = run_dir.join(&table_name);
        if !table_path.is_file() {
            return Err(E2mc2Error::missing_output(
                "OUTPUT.MISSING_TABLE",
                format!("run output table '{}' does not exist", table_path.display()),
            ));
        }
        let source = fs::read_to_string(&table_path).map_err(|source| {
            E2mc2Error::io_system(
                "IO.TABLE_READ",
                format!("failed to read '{}': {}", table_path.display(), source),
            )
        })?;
        let table = RunTable::parse(&source, expansion.cluster_count(), &table_name)?;

        let snapshots = parameters
            .snapshot_base()
            .map(|base| find_snapshots(run_dir, &base))
            .transpose()?;

        info!(
            "loaded {} rows and {} snapshots from '{}'",
            table.row_count(),
            snapshots.as_ref().map_or(0, Vec::len),
            run_dir.display()
        );

        Ok(Self {
            run_dir: run_dir.to_path_buf(),
            parameters,
            table,
            snapshots,
        })
    }
}

fn ensure_run_dir(run_dir: &Path) -> E2mc2Result<()> {
    if run_dir.is_dir() {
        return Ok(());
    }
    Err(E2mc2Error::missing_output(
        "OUTPUT.MISSING_RUN_DIRECTORY",
        format!("run directory '{}' does not exist", run_dir.display()),
    ))
}

/// Snapshot files in `dir` sharing the first four characters of `base`, ordered by the
/// first run of digits in each name.
pub fn find_snapshots(dir: &Path, base: &str) -> E2mc2Result<Vec<PathBuf>> {
    let matcher = snapshot_matcher(base)?;
    let entries = fs::read_dir(dir).map_err(|source| {
        E2mc2Error::missing_output(
            "OUTPUT.READ_RUN_DIRECTORY",
            format!("failed to list '{}': {}", dir.display(), source),
        )
    })?;

    let mut numbered = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| {
            E2mc2Error::io_system(
                "IO.READ_RUN_DIRECTORY",
                format!("failed to list '{}': {}", dir.display(), source),
            )
        })?;
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        if !entry.path().is_file() || !matcher.is_match(name) {
            continue;
        }
        let counter = snapshot_counter(name)?;
        numbered.push((counter, name.to_string(), entry.path()));
    }

    numbered.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
    Ok(numbered.into_iter().map(|(_, _, path)| path).collect())
}

fn snapshot_matcher(base: &str) -> E2mc2Result<GlobMatcher> {
    let prefix: String = base.chars().take(SNAPSHOT_PREFIX_CHARS).collect();
    let escaped = globset::escape(&prefix);
    Glob::new(&format!("{}*{}", escaped, SNAPSHOT_SUFFIX))
        .map(|glob| glob.compile_matcher())
        .map_err(|source| {
            E2mc2Error::input_validation(
                "INPUT.SNAPSHOT_PATTERN",
                format!("invalid snapshot base name '{}': {}", base, source),
            )
        })
}

/// First run of ASCII digits in `name`.
pub fn snapshot_counter(name: &str) -> E2mc2Result<u64> {
    let digits: String = name
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();

    digits.parse::<u64>().map_err(|_| {
        E2mc2Error::parse(
            "PARSE.SNAPSHOT_COUNTER",
            format!("snapshot file '{}' has no numeric counter", name),
        )
    })
}
