//! Solver run directories: preparation, invocation and result loading.

pub mod params;
pub mod result;

pub use params::{OptionKind, ParamValue, RunParameters, SOLVER_OPTIONS, SolverOption};
pub use result::{FIXED_COLUMNS, RunResult, RunTable, column_names, find_snapshots};

use crate::domain::{DEFAULT_ECI_PRECISION, E2mc2Error, E2mc2Result};
use crate::expansion::ClusterExpansion;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, warn};

pub const PARAMS_FILE: &str = "emc2_params.json";
pub const DEFAULT_SOLVER: &str = "emc2";

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub solver: PathBuf,
    pub eci_precision: usize,
    pub allow_existing_run_dir: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            solver: PathBuf::from(DEFAULT_SOLVER),
            eci_precision: DEFAULT_ECI_PRECISION,
            allow_existing_run_dir: false,
        }
    }
}

/// Captured output of one solver invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolverOutput {
    pub args: Vec<String>,
    pub stdout: String,
    pub stderr: String,
}

/// Creates `run_dir` and writes the expansion files plus the parameter record into it.
pub fn prepare_run_directory(
    config: &RunnerConfig,
    run_dir: &Path,
    expansion: &ClusterExpansion,
    parameters: &RunParameters,
) -> E2mc2Result<()> {
    if run_dir.exists() && !config.allow_existing_run_dir {
        return Err(E2mc2Error::io_system(
            "IO.RUN_DIRECTORY_EXISTS",
            format!("run directory '{}' already exists", run_dir.display()),
        ));
    }

    fs::create_dir_all(run_dir).map_err(|source| {
        E2mc2Error::io_system(
            "IO.RUN_DIRECTORY",
            format!(
                "failed to create run directory '{}': {}",
                run_dir.display(),
                source
            ),
        )
    })?;

    expansion.write_dir_with_precision(run_dir, config.eci_precision)?;
    parameters.save(&run_dir.join(PARAMS_FILE))?;
    debug!("prepared run directory '{}'", run_dir.display());
    Ok(())
}

/// Runs the solver with `run_dir` as its working directory and waits for it to exit.
pub fn execute_solver(
    config: &RunnerConfig,
    run_dir: &Path,
    parameters: &RunParameters,
) -> E2mc2Result<SolverOutput> {
    let args = parameters.command_args()?;
    let working_dir = std::env::current_dir().map_err(|source| {
        E2mc2Error::io_system(
            "IO.CURRENT_DIR",
            format!("failed to resolve the current directory: {}", source),
        )
    })?;
    let solver = resolve_solver_path(&config.solver, &working_dir);
    info!(
        "running '{}' {} in '{}'",
        solver.display(),
        args.join(" "),
        run_dir.display()
    );

    let output = Command::new(&solver)
        .args(&args)
        .current_dir(run_dir)
        .output()
        .map_err(|source| {
            E2mc2Error::io_system(
                "IO.SOLVER_EXEC",
                format!(
                    "failed to execute solver '{}': {}",
                    solver.display(),
                    source
                ),
            )
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    for line in stdout.lines() {
        debug!(target: "e2mc2::solver", "{}", line);
    }
    for line in stderr.lines() {
        warn!(target: "e2mc2::solver", "{}", line);
    }

    if !output.status.success() {
        return Err(E2mc2Error::computation(
            "RUN.SOLVER_EXIT",
            format!(
                "solver '{}' exited with {} in '{}'",
                solver.display(),
                output.status,
                run_dir.display()
            ),
        ));
    }

    Ok(SolverOutput {
        args,
        stdout,
        stderr,
    })
}

/// Anchors a relative solver path such as `bin/emc2` at `working_dir`, since the child runs
/// inside the run directory. Bare command names are left for `PATH` lookup.
pub fn resolve_solver_path(solver: &Path, working_dir: &Path) -> PathBuf {
    if solver.is_relative() && solver.components().count() > 1 {
        working_dir.join(solver)
    } else {
        solver.to_path_buf()
    }
}

/// Prepares `run_dir`, runs the solver there and loads its outputs.
pub fn run(
    config: &RunnerConfig,
    run_dir: &Path,
    expansion: &ClusterExpansion,
    parameters: &RunParameters,
) -> E2mc2Result<RunResult> {
    prepare_run_directory(config, run_dir, expansion, parameters)?;
    execute_solver(config, run_dir, parameters)?;
    RunResult::load_with_expansion(run_dir, expansion)
}
