//! The [`RunConfig`] describing one load-test run, and the [`RunConfigBuilder`] used to create it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use url::Url;

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::label::RunLabel;

pub const DEFAULT_TARGET_HOST: &str = "http://127.0.0.1:8000";
pub const DEFAULT_USER_COUNT: u32 = 5;
pub const DEFAULT_SPAWN_RATE: f64 = 1.0;
pub const DEFAULT_DURATION: Duration = Duration::from_secs(30);
pub const DEFAULT_OUTPUT_DIRECTORY: &str = "results";
pub const DEFAULT_ENGINE: &str = "locust";

/// Immutable description of a single load-test run.
///
/// Must be created with a [`RunConfigBuilder`], which validates the values, so a [`RunConfig`]
/// always holds a parseable host and positive load parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    target_host: String,
    user_count: u32,
    spawn_rate: f64,
    duration: Duration,
    output_directory: PathBuf,
    run_label: RunLabel,
    engine: String,
    locustfile: Option<PathBuf>,
    html_report: bool,
}

impl RunConfig {
    /// Start from the defaults, suitable for a quick smoke run against a local development server.
    pub fn builder() -> RunConfigBuilder {
        RunConfigBuilder::default()
    }

    /// Base URL of the system under test, exactly as it was configured.
    pub fn target_host(&self) -> &str {
        &self.target_host
    }

    pub fn user_count(&self) -> u32 {
        self.user_count
    }

    pub fn spawn_rate(&self) -> f64 {
        self.spawn_rate
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    pub fn run_label(&self) -> &RunLabel {
        &self.run_label
    }

    /// Name or path of the load-generation engine executable.
    pub fn engine(&self) -> &str {
        &self.engine
    }

    pub fn locustfile(&self) -> Option<&Path> {
        self.locustfile.as_deref()
    }

    /// Whether the engine is asked for an HTML report alongside the CSV files.
    pub fn html_report(&self) -> bool {
        self.html_report
    }

    /// Artifact path prefix shared by every file of this run, `<output_directory>/<run_label>`.
    pub fn artifact_prefix(&self) -> PathBuf {
        self.output_directory.join(self.run_label.as_str())
    }
}

/// Builds a [`RunConfig`], applying defaults for anything not set.
#[derive(Debug, Clone)]
pub struct RunConfigBuilder {
    target_host: String,
    user_count: u32,
    spawn_rate: f64,
    duration: Duration,
    output_directory: PathBuf,
    run_label: Option<RunLabel>,
    engine: String,
    locustfile: Option<PathBuf>,
    html_report: bool,
}

impl Default for RunConfigBuilder {
    fn default() -> Self {
        RunConfigBuilder {
            target_host: DEFAULT_TARGET_HOST.to_string(),
            user_count: DEFAULT_USER_COUNT,
            spawn_rate: DEFAULT_SPAWN_RATE,
            duration: DEFAULT_DURATION,
            output_directory: PathBuf::from(DEFAULT_OUTPUT_DIRECTORY),
            run_label: None,
            engine: DEFAULT_ENGINE.to_string(),
            locustfile: None,
            html_report: true,
        }
    }
}

impl RunConfigBuilder {
    pub fn with_target_host(mut self, host: impl Into<String>) -> Self {
        self.target_host = host.into();
        self
    }

    pub fn with_user_count(mut self, user_count: u32) -> Self {
        self.user_count = user_count;
        self
    }

    pub fn with_spawn_rate(mut self, spawn_rate: f64) -> Self {
        self.spawn_rate = spawn_rate;
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_output_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_directory = path.into();
        self
    }

    /// Use a fixed label instead of generating one from the clock when [`Self::build`] is called.
    pub fn with_run_label(mut self, label: RunLabel) -> Self {
        self.run_label = Some(label);
        self
    }

    pub fn with_engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = engine.into();
        self
    }

    pub fn with_locustfile(mut self, path: impl Into<PathBuf>) -> Self {
        self.locustfile = Some(path.into());
        self
    }

    pub fn with_html_report(mut self, html_report: bool) -> Self {
        self.html_report = html_report;
        self
    }

    /// Validate the values and build a [`RunConfig`].
    ///
    /// The run label is generated here, once, if one was not provided.
    ///
    /// A spawn rate above the user count is passed through unchanged, the engine decides what to
    /// do with it.
    pub fn build(self) -> OrchestratorResult<RunConfig> {
        let target_host = self.target_host.trim().to_string();
        if target_host.is_empty() {
            return Err(OrchestratorError::invalid("host", "must not be empty"));
        }
        let url = Url::parse(&target_host).map_err(|e| {
            OrchestratorError::invalid("host", format!("'{target_host}' is not a valid URL: {e}"))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(OrchestratorError::invalid(
                "host",
                format!("'{target_host}' must use http or https"),
            ));
        }

        if self.user_count == 0 {
            return Err(OrchestratorError::invalid("users", "must be at least 1"));
        }

        if !self.spawn_rate.is_finite() || self.spawn_rate <= 0.0 {
            return Err(OrchestratorError::invalid(
                "spawn_rate",
                format!("{} is not a positive number", self.spawn_rate),
            ));
        }
        if self.spawn_rate > f64::from(self.user_count) {
            log::warn!(
                "Spawn rate {} is higher than the user count {}, all users will start within the first second",
                self.spawn_rate,
                self.user_count
            );
        }

        if self.duration.is_zero() {
            return Err(OrchestratorError::invalid("run_time", "must be greater than zero"));
        }

        if self.output_directory.as_os_str().is_empty() {
            return Err(OrchestratorError::invalid(
                "output_directory",
                "must not be empty",
            ));
        }

        if self.engine.trim().is_empty() {
            return Err(OrchestratorError::invalid("engine", "must not be empty"));
        }

        Ok(RunConfig {
            target_host,
            user_count: self.user_count,
            spawn_rate: self.spawn_rate,
            duration: self.duration,
            output_directory: self.output_directory,
            run_label: self.run_label.unwrap_or_else(RunLabel::now),
            engine: self.engine,
            locustfile: self.locustfile,
            html_report: self.html_report,
        })
    }
}
