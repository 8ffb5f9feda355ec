use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::config::{
    RunConfig, RunConfigBuilder, DEFAULT_ENGINE, DEFAULT_OUTPUT_DIRECTORY, DEFAULT_SPAWN_RATE,
    DEFAULT_TARGET_HOST, DEFAULT_USER_COUNT,
};
use crate::error::OrchestratorResult;
use crate::label::RunLabel;
use crate::monitor::MonitorTarget;

/// Run a headless load test against a web server and keep the results of every run.
#[derive(Parser, Debug, Clone)]
#[command(name = "swarm", version, long_about = None)]
pub struct SwarmCli {
    /// Base URL of the system under test
    #[arg(long, default_value = DEFAULT_TARGET_HOST)]
    pub host: String,

    /// Number of concurrent simulated users
    #[arg(short, long, default_value_t = DEFAULT_USER_COUNT)]
    pub users: u32,

    /// Number of users started per second
    #[arg(short = 'r', long, default_value_t = DEFAULT_SPAWN_RATE)]
    pub spawn_rate: f64,

    /// How long to run for, for example `30s`, `5m` or `1h 30m`
    #[arg(short = 't', long, default_value = "30s", value_parser = humantime::parse_duration)]
    pub run_time: Duration,

    /// Directory the result files are written to, created if it does not exist
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIRECTORY)]
    pub output_dir: PathBuf,

    /// Prefix for this run's result files. Defaults to the current time as `YYYYMMDD_HHMMSS`
    #[arg(long)]
    pub run_label: Option<String>,

    /// Append a random suffix to the generated run label.
    ///
    /// Use this when several runs may start within the same second and write to the same output directory.
    #[arg(long, default_value = "false", conflicts_with = "run_label")]
    pub disambiguate: bool,

    /// Name or path of the load-generation engine executable
    #[arg(long, default_value = DEFAULT_ENGINE)]
    pub engine: String,

    /// Scenario file passed to the engine
    #[arg(short = 'f', long)]
    pub locustfile: Option<PathBuf>,

    /// Do not ask the engine for an HTML report
    #[arg(long, default_value = "false")]
    pub no_html_report: bool,

    /// Sample memory and CPU usage of the process with this PID while the test runs
    #[arg(long, conflicts_with = "target_match")]
    pub target_pid: Option<u32>,

    /// Sample memory and CPU usage of the first process whose command line contains all of these
    /// fragments, for example `--target-match manage.py --target-match runserver`
    #[arg(long)]
    pub target_match: Vec<String>,

    /// File the run summary is appended to. Defaults to `run_summary.jsonl` in the output directory
    #[arg(long)]
    pub run_summary: Option<PathBuf>,

    /// Do not write a run summary
    #[arg(long, default_value = "false", conflicts_with = "run_summary")]
    pub no_run_summary: bool,

    /// Do not show a progress bar on the CLI.
    ///
    /// This is recommended for CI/CD environments where the progress bar isn't being looked at by anyone and is just adding noise to the logs.
    #[arg(long, default_value = "false")]
    pub no_progress: bool,
}

impl SwarmCli {
    /// Map the flags onto a [`RunConfigBuilder`] without validating them.
    pub fn config_builder(&self) -> OrchestratorResult<RunConfigBuilder> {
        let mut builder = RunConfig::builder()
            .with_target_host(self.host.clone())
            .with_user_count(self.users)
            .with_spawn_rate(self.spawn_rate)
            .with_duration(self.run_time)
            .with_output_directory(self.output_dir.clone())
            .with_engine(self.engine.clone())
            .with_html_report(!self.no_html_report);

        if let Some(locustfile) = &self.locustfile {
            builder = builder.with_locustfile(locustfile.clone());
        }

        if let Some(label) = &self.run_label {
            builder = builder.with_run_label(RunLabel::new(label.clone())?);
        } else if self.disambiguate {
            builder = builder.with_run_label(RunLabel::now_disambiguated());
        }

        Ok(builder)
    }

    /// Validated [`RunConfig`] for these flags.
    pub fn run_config(&self) -> OrchestratorResult<RunConfig> {
        self.config_builder()?.build()
    }

    pub fn monitor_target(&self) -> Option<MonitorTarget> {
        if let Some(pid) = self.target_pid {
            Some(MonitorTarget::Pid(pid))
        } else if !self.target_match.is_empty() {
            Some(MonitorTarget::CommandLine(self.target_match.clone()))
        } else {
            None
        }
    }

    /// Where to append the run summary, if one should be written.
    pub fn run_summary_path(&self) -> Option<PathBuf> {
        if self.no_run_summary {
            return None;
        }

        Some(
            self.run_summary
                .clone()
                .unwrap_or_else(|| self.output_dir.join("run_summary.jsonl")),
        )
    }
}
