use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::RunConfig;

/// Environment variable telling engine-side plugins where to write their own metrics.
pub const METRICS_DIR_ENV: &str = "LOCUST_METRICS_DIR";

const STATS_SUFFIX: &str = "_stats.csv";
const FAILURES_SUFFIX: &str = "_failures.csv";
const EXCEPTIONS_SUFFIX: &str = "_exceptions.csv";
const REPORT_SUFFIX: &str = "_report.html";

/// The files a run is expected to produce.
///
/// The engine writes these, the orchestrator only knows their names by convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSet {
    /// `<output_directory>/<run_label>`, also passed to the engine as its CSV prefix.
    pub prefix: PathBuf,
    pub stats: PathBuf,
    pub failures: PathBuf,
    pub exceptions: PathBuf,
    pub report: Option<PathBuf>,
}

impl ArtifactSet {
    /// Derive the artifact names from a `<directory>/<label>` prefix.
    pub fn from_prefix(prefix: &Path, html_report: bool) -> Self {
        ArtifactSet {
            prefix: prefix.to_path_buf(),
            stats: with_suffix(prefix, STATS_SUFFIX),
            failures: with_suffix(prefix, FAILURES_SUFFIX),
            exceptions: with_suffix(prefix, EXCEPTIONS_SUFFIX),
            report: html_report.then(|| with_suffix(prefix, REPORT_SUFFIX)),
        }
    }

    /// Stats, failures, exceptions and then the report, if one was requested.
    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths = vec![
            self.stats.clone(),
            self.failures.clone(),
            self.exceptions.clone(),
        ];
        paths.extend(self.report.clone());
        paths
    }
}

/// A structured command line for the load-generation engine.
///
/// Arguments are discrete tokens handed straight to the OS, nothing is interpreted by a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: String,
    args: Vec<OsString>,
    env: Vec<(String, OsString)>,
    artifacts: ArtifactSet,
    planned_runtime: std::time::Duration,
}

impl CommandSpec {
    /// Name or path of the engine executable, not yet resolved against `PATH`.
    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// Extra environment variables set for the engine process.
    pub fn env(&self) -> &[(String, OsString)] {
        &self.env
    }

    pub fn artifacts(&self) -> &ArtifactSet {
        &self.artifacts
    }

    /// How long the engine was asked to run for.
    pub fn planned_runtime(&self) -> std::time::Duration {
        self.planned_runtime
    }

    /// Arguments as UTF-8 strings, replacing anything that is not valid UTF-8.
    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Map a [`RunConfig`] to the engine's command line.
///
/// This has no side effects, equal configs always give equal [`CommandSpec`]s.
pub fn build_invocation(config: &RunConfig) -> CommandSpec {
    let prefix = config.artifact_prefix();
    let artifacts = ArtifactSet::from_prefix(&prefix, config.html_report());

    let mut args = Vec::with_capacity(8);
    if let Some(locustfile) = config.locustfile() {
        args.push(option("--locustfile", locustfile.as_os_str()));
    }
    args.push(OsString::from("--headless"));
    args.push(OsString::from(format!("--host={}", config.target_host())));
    args.push(OsString::from(format!("--users={}", config.user_count())));
    args.push(OsString::from(format!("--spawn-rate={}", config.spawn_rate())));
    args.push(OsString::from(format!(
        "--run-time={}s",
        whole_seconds(config.duration())
    )));
    args.push(option("--csv", prefix.as_os_str()));
    if let Some(report) = &artifacts.report {
        args.push(option("--html", report.as_os_str()));
    }

    CommandSpec {
        program: config.engine().to_string(),
        args,
        env: vec![(
            METRICS_DIR_ENV.to_string(),
            config.output_directory().as_os_str().to_os_string(),
        )],
        artifacts,
        planned_runtime: config.duration(),
    }
}

/// The engine only accepts whole seconds, so partial seconds round up.
fn whole_seconds(duration: std::time::Duration) -> u64 {
    if duration.subsec_nanos() > 0 {
        duration.as_secs().saturating_add(1)
    } else {
        duration.as_secs()
    }
}

fn option(name: &str, value: &OsStr) -> OsString {
    let mut arg = OsString::from(name);
    arg.push("=");
    arg.push(value);
    arg
}

fn with_suffix(prefix: &Path, suffix: &str) -> PathBuf {
    let mut path = prefix.as_os_str().to_os_string();
    path.push(suffix);
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::label::RunLabel;

    fn sample_config(label: &str) -> RunConfig {
        RunConfig::builder()
            .with_target_host("http://127.0.0.1:8000")
            .with_user_count(5)
            .with_spawn_rate(1.0)
            .with_duration(Duration::from_secs(30))
            .with_output_directory("results")
            .with_run_label(RunLabel::new(label).unwrap())
            .build()
            .expect("valid config")
    }

    #[test]
    fn maps_config_to_engine_arguments() {
        let spec = build_invocation(&sample_config("20240101_120000"));

        assert_eq!(spec.program(), "locust");
        assert_eq!(
            spec.args_lossy(),
            vec![
                "--headless",
                "--host=http://127.0.0.1:8000",
                "--users=5",
                "--spawn-rate=1",
                "--run-time=30s",
                "--csv=results/20240101_120000",
                "--html=results/20240101_120000_report.html",
            ]
        );
    }

    #[test]
    fn same_config_gives_identical_invocation() {
        let config = sample_config("20240101_120000");
        assert_eq!(build_invocation(&config), build_invocation(&config));
        assert_eq!(
            build_invocation(&config),
            build_invocation(&config.clone())
        );
    }

    #[test]
    fn artifacts_follow_label() {
        let spec = build_invocation(&sample_config("20240101_120000"));
        assert_eq!(
            spec.artifacts().paths(),
            vec![
                PathBuf::from("results/20240101_120000_stats.csv"),
                PathBuf::from("results/20240101_120000_failures.csv"),
                PathBuf::from("results/20240101_120000_exceptions.csv"),
                PathBuf::from("results/20240101_120000_report.html"),
            ]
        );
    }

    #[test]
    fn distinct_labels_never_share_artifacts() {
        let first: HashSet<PathBuf> = build_invocation(&sample_config("20240101_120000"))
            .artifacts()
            .paths()
            .into_iter()
            .collect();
        let second: HashSet<PathBuf> = build_invocation(&sample_config("20240101_120001"))
            .artifacts()
            .paths()
            .into_iter()
            .collect();

        assert!(first.is_disjoint(&second));
    }

    #[test]
    fn omit_html_report_when_disabled() {
        let config = RunConfig::builder()
            .with_run_label(RunLabel::new("run").unwrap())
            .with_html_report(false)
            .build()
            .unwrap();
        let spec = build_invocation(&config);

        assert!(spec.artifacts().report.is_none());
        assert_eq!(spec.artifacts().paths().len(), 3);
        assert!(!spec.args_lossy().iter().any(|a| a.starts_with("--html")));
    }

    #[test]
    fn locustfile_goes_first() {
        let config = RunConfig::builder()
            .with_locustfile("scenarios/posts.py")
            .build()
            .unwrap();
        let spec = build_invocation(&config);
        assert_eq!(spec.args_lossy()[0], "--locustfile=scenarios/posts.py");
        assert_eq!(spec.args_lossy()[1], "--headless");
    }

    #[test]
    fn fractional_spawn_rate_and_duration() {
        let config = RunConfig::builder()
            .with_spawn_rate(0.5)
            .with_duration(Duration::from_millis(90_500))
            .build()
            .unwrap();
        let args = build_invocation(&config).args_lossy();
        assert!(args.contains(&"--spawn-rate=0.5".to_string()));
        assert!(args.contains(&"--run-time=91s".to_string()));
    }

    #[test]
    fn longest_duration_does_not_overflow() {
        let config = RunConfig::builder()
            .with_duration(Duration::MAX)
            .build()
            .unwrap();
        let args = build_invocation(&config).args_lossy();
        assert!(args.contains(&format!("--run-time={}s", u64::MAX)));
    }

    #[test]
    fn metrics_dir_passed_to_engine() {
        let spec = build_invocation(&sample_config("20240101_120000"));
        assert_eq!(
            spec.env(),
            &[(METRICS_DIR_ENV.to_string(), OsString::from("results"))]
        );
    }

    #[test]
    fn display_is_readable_command_line() {
        let spec = build_invocation(&sample_config("20240101_120000"));
        assert!(spec
            .to_string()
            .starts_with("locust --headless --host=http://127.0.0.1:8000"));
    }
}
