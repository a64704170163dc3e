use super::CliError;
use super::helpers::{
    render_expansion_summary, render_result_summary, resolve_parameters, to_pretty_json,
};
use clap::{Args, ValueEnum};
use e2mc2_core::domain::DEFAULT_ECI_PRECISION;
use e2mc2_core::expansion::{ClusterExpansion, ExpansionSource};
use e2mc2_core::run::{
    self, DEFAULT_SOLVER, RunParameters, RunResult, RunnerConfig, SOLVER_OPTIONS, find_snapshots,
};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(super) enum OutputForm {
    Dir,
    Tar,
    Json,
}

impl OutputForm {
    fn infer(path: &Path) -> Self {
        match path.extension().and_then(|extension| extension.to_str()) {
            Some("tar") => Self::Tar,
            Some("json") => Self::Json,
            _ => Self::Dir,
        }
    }
}

#[derive(Debug, Args)]
pub(super) struct ConvertArgs {
    /// Expansion to read: a directory, a tar archive or a JSON document
    #[arg(value_name = "input")]
    input: PathBuf,

    /// Destination path
    #[arg(value_name = "output")]
    output: PathBuf,

    /// Output layout; inferred from the destination extension when omitted
    #[arg(long, value_enum)]
    to: Option<OutputForm>,

    /// Decimal places for eci.out
    #[arg(long, default_value_t = DEFAULT_ECI_PRECISION)]
    precision: usize,
}

#[derive(Debug, Args)]
pub(super) struct InspectArgs {
    #[arg(value_name = "input")]
    input: PathBuf,

    /// Print the expansion document instead of a summary
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
pub(super) struct ParamArgs {
    /// Override one solver option, e.g. --param T1=1500 or --param cm=true
    #[arg(long = "param", value_name = "KEY=VALUE")]
    params: Vec<String>,

    /// JSON record of solver options applied before --param values
    #[arg(long, value_name = "path")]
    params_file: Option<PathBuf>,

    /// Start from an empty record instead of the default option set
    #[arg(long)]
    no_defaults: bool,
}

impl ParamArgs {
    fn resolve(&self) -> Result<RunParameters, CliError> {
        resolve_parameters(self.no_defaults, self.params_file.as_deref(), &self.params)
    }
}

#[derive(Debug, Args)]
pub(super) struct ParamsArgs {
    #[command(flatten)]
    params: ParamArgs,

    /// Also list every known solver option
    #[arg(long)]
    list: bool,

    /// Print the record as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
pub(super) struct RunArgs {
    /// Expansion to run: a directory, a tar archive or a JSON document
    #[arg(value_name = "expansion")]
    expansion: PathBuf,

    /// Run directory to create
    #[arg(value_name = "run-dir")]
    run_dir: PathBuf,

    /// Solver executable
    #[arg(long, env = "E2MC2_SOLVER", default_value = DEFAULT_SOLVER)]
    solver: PathBuf,

    /// Decimal places for eci.out
    #[arg(long, default_value_t = DEFAULT_ECI_PRECISION)]
    precision: usize,

    /// Write into an existing run directory
    #[arg(long)]
    reuse_dir: bool,

    #[command(flatten)]
    params: ParamArgs,

    /// Print the loaded result as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
pub(super) struct ResultsArgs {
    #[arg(value_name = "run-dir")]
    run_dir: PathBuf,

    /// Print the loaded result as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
pub(super) struct SnapshotsArgs {
    #[arg(value_name = "run-dir")]
    run_dir: PathBuf,

    /// Snapshot base name; defaults to the run's opss option
    #[arg(long)]
    base: Option<String>,
}

pub(super) fn run_convert_command(args: ConvertArgs) -> Result<i32, CliError> {
    let source = ExpansionSource::classify(&args.input)?;
    let expansion = ClusterExpansion::load_source(&source)?;
    let form = args.to.unwrap_or_else(|| OutputForm::infer(&args.output));

    match form {
        OutputForm::Dir => expansion.write_dir_with_precision(&args.output, args.precision)?,
        OutputForm::Tar => expansion.write_tar_with_precision(&args.output, args.precision)?,
        OutputForm::Json => expansion.write_json(&args.output)?,
    }

    info!(
        "converted {} '{}' to {:?} '{}'",
        source.kind(),
        source.path().display(),
        form,
        args.output.display()
    );
    Ok(0)
}

pub(super) fn run_inspect_command(args: InspectArgs) -> Result<i32, CliError> {
    let source = ExpansionSource::classify(&args.input)?;
    let expansion = ClusterExpansion::load_source(&source)?;

    if args.json {
        println!("{}", expansion.to_json_string()?);
    } else {
        print!("{}", render_expansion_summary(&source, &expansion));
    }
    Ok(0)
}

pub(super) fn run_params_command(args: ParamsArgs) -> Result<i32, CliError> {
    let parameters = args.params.resolve()?;

    if args.json {
        println!("{}", to_pretty_json(&parameters)?);
    } else {
        for (name, value) in parameters.iter() {
            println!("{:<10} {}", name, value);
        }
    }

    if args.list {
        println!();
        for option in &SOLVER_OPTIONS {
            println!("-{:<9} {}", option.name, option.help);
        }
    }

    println!("{}", parameters.command_args()?.join(" "));
    Ok(0)
}

pub(super) fn run_solver_command(args: RunArgs) -> Result<i32, CliError> {
    let expansion = ClusterExpansion::load(&args.expansion)?;
    let parameters = args.params.resolve()?;
    let config = RunnerConfig {
        solver: args.solver,
        eci_precision: args.precision,
        allow_existing_run_dir: args.reuse_dir,
    };

    let result = run::run(&config, &args.run_dir, &expansion, &parameters)?;
    print_result(&result, args.json)
}

pub(super) fn run_results_command(args: ResultsArgs) -> Result<i32, CliError> {
    let result = RunResult::load(&args.run_dir)?;
    print_result(&result, args.json)
}

pub(super) fn run_snapshots_command(args: SnapshotsArgs) -> Result<i32, CliError> {
    let base = match args.base {
        Some(base) => Some(base),
        None => {
            let params_path = args.run_dir.join(run::PARAMS_FILE);
            if params_path.is_file() {
                RunParameters::load(&params_path)?.snapshot_base()
            } else {
                None
            }
        }
    };

    let Some(base) = base else {
        return Err(CliError::Usage(format!(
            "no snapshot base configured for '{}'; pass --base",
            args.run_dir.display()
        )));
    };

    for path in find_snapshots(&args.run_dir, &base)? {
        println!("{}", path.display());
    }
    Ok(0)
}

fn print_result(result: &RunResult, json: bool) -> Result<i32, CliError> {
    if json {
        println!("{}", to_pretty_json(result)?);
    } else {
        print!("{}", render_result_summary(result));
    }
    Ok(0)
}
