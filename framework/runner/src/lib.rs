mod cli;
mod config;
mod engine_binary;
mod error;
mod executor;
mod init;
mod invocation;
mod label;
mod monitor;
mod output;
mod progress;
mod run;
mod stop;

pub mod prelude {
    pub use crate::cli::SwarmCli;
    pub use crate::config::{RunConfig, RunConfigBuilder};
    pub use crate::engine_binary::{engine_version, resolve_engine};
    pub use crate::error::{OrchestratorError, OrchestratorResult};
    pub use crate::executor::{ExecuteOptions, RunResult};
    pub use crate::init::init;
    pub use crate::invocation::{build_invocation, ArtifactSet, CommandSpec, METRICS_DIR_ENV};
    pub use crate::label::RunLabel;
    pub use crate::monitor::MonitorTarget;
    pub use crate::output::prepare_output_directory;
    pub use crate::run::{execute, run, Orchestrator};
}
