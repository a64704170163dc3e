//! Input and output management for the ATAT `emc2` Monte Carlo solver.
//!
//! - [`expansion`] holds a cluster expansion and converts it between the
//!   directory, tar archive and JSON document layouts.
//! - [`run`] builds the solver command line from a parameter record, runs the
//!   solver in a run directory and parses its output table and snapshots.

pub mod domain;
pub mod expansion;
pub mod run;
pub mod serialization;

pub use domain::{E2mc2Error, E2mc2ErrorCategory, E2mc2Result};
pub use expansion::{ClusterExpansion, ExpansionSource};
pub use run::{RunParameters, RunResult, RunnerConfig};
