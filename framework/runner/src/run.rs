use std::path::Path;

use crate::config::RunConfig;
use crate::error::OrchestratorResult;
use crate::executor::{execute_spec, ExecuteOptions, RunResult};
use crate::invocation::{build_invocation, CommandSpec};
use crate::monitor::MonitorTarget;
use crate::output::prepare_output_directory;

/// Turns a [`RunConfig`] into a completed load-test run.
///
/// A run goes `Preparing -> Invoking -> Completed` with no retries. Any error is returned before
/// the engine is started, apart from a failure to wait on the engine process.
#[derive(Debug, Clone, Default)]
pub struct Orchestrator {
    options: ExecuteOptions,
}

impl Orchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show a progress bar while the engine is running.
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.options.progress = progress;
        self
    }

    /// Sample resource usage of the target server process while the engine is running.
    pub fn with_monitor(mut self, target: Option<MonitorTarget>) -> Self {
        self.options.monitor = target;
        self
    }

    pub fn prepare_output_directory(&self, path: &Path) -> OrchestratorResult<()> {
        prepare_output_directory(path)
    }

    pub fn build_invocation(&self, config: &RunConfig) -> CommandSpec {
        build_invocation(config)
    }

    /// Run the engine and wait for it to exit.
    pub fn execute(&self, spec: &CommandSpec) -> OrchestratorResult<RunResult> {
        execute_spec(spec, &self.options)
    }

    /// Prepare the output directory, build the invocation and execute it.
    pub fn run(&self, config: &RunConfig) -> OrchestratorResult<RunResult> {
        log::info!(
            "Preparing run '{}' in '{}'",
            config.run_label(),
            config.output_directory().display()
        );
        self.prepare_output_directory(config.output_directory())?;

        let spec = self.build_invocation(config);
        log::info!(
            "Invoking '{}' against {} with {} users for {}s",
            spec.program(),
            config.target_host(),
            config.user_count(),
            spec.planned_runtime().as_secs_f64()
        );
        let result = self.execute(&spec)?;

        log::info!(
            "Completed run '{}' in {:.1}s with exit code {}",
            config.run_label(),
            result.elapsed.as_secs_f64(),
            result.exit_code
        );

        Ok(result)
    }
}

/// Run the engine described by `spec` and wait for it to exit, without progress or monitoring.
pub fn execute(spec: &CommandSpec) -> OrchestratorResult<RunResult> {
    Orchestrator::default().execute(spec)
}

/// Run a load test as described by `config`, without progress or monitoring.
///
/// This is the entry point for callers that just want a [`RunResult`].
pub fn run(config: &RunConfig) -> OrchestratorResult<RunResult> {
    Orchestrator::default().run(config)
}
