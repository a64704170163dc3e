mod commands;
mod helpers;
mod logging;

use clap::Parser;
use e2mc2_core::domain::E2mc2Error;
use std::path::PathBuf;
use tracing::debug;

pub fn run_from_env() -> i32 {
    let args: Vec<String> = std::env::args().skip(1).collect();

    match run(args) {
        Ok(code) => code,
        Err(error) => {
            let core_error = error.as_core_error();
            eprintln!("{}", core_error.diagnostic_line());
            eprintln!("{}", core_error.fatal_exit_line());
            core_error.exit_code()
        }
    }
}

pub fn run<I, S>(args: I) -> Result<i32, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let full_args = std::iter::once("e2mc2".to_string())
        .chain(args.into_iter().map(Into::into))
        .collect::<Vec<_>>();
    parse_and_dispatch(full_args)
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => {
            logging::setup_logging(cli.verbose, cli.quiet, cli.log_file.as_deref())?;
            debug!("dispatching {:?}", &args[1..]);
            dispatch_parsed(cli.command)
        }
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

#[derive(Parser)]
#[command(
    name = "e2mc2",
    version,
    about = "Cluster-expansion input and output management for the ATAT emc2 solver"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Silence all log output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Also write logs to this file
    #[arg(long, global = true, value_name = "path")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Convert a cluster expansion between directory, tar and JSON layouts
    Convert(commands::ConvertArgs),
    /// Summarise a cluster expansion
    Inspect(commands::InspectArgs),
    /// Show the resolved solver parameters and command line
    Params(commands::ParamsArgs),
    /// Prepare a run directory, run the solver and summarise its outputs
    Run(commands::RunArgs),
    /// Load the outputs of a finished run directory
    Results(commands::ResultsArgs),
    /// List periodic snapshot files of a run directory in counter order
    Snapshots(commands::SnapshotsArgs),
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Convert(args) => commands::run_convert_command(args),
        CliCommand::Inspect(args) => commands::run_inspect_command(args),
        CliCommand::Params(args) => commands::run_params_command(args),
        CliCommand::Run(args) => commands::run_solver_command(args),
        CliCommand::Results(args) => commands::run_results_command(args),
        CliCommand::Snapshots(args) => commands::run_snapshots_command(args),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error(transparent)]
    Core(#[from] E2mc2Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CliError {
    fn as_core_error(&self) -> E2mc2Error {
        match self {
            Self::Usage(message) => E2mc2Error::input_validation("INPUT.CLI_USAGE", message.clone()),
            Self::Core(error) => error.clone(),
            Self::Internal(error) => E2mc2Error::io_system("IO.CLI", format!("{error:#}")),
        }
    }
}
