use std::io;
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use crate::engine_binary::resolve_engine;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::invocation::CommandSpec;
use crate::monitor::{resources_path, start_monitor, MonitorTarget};
use crate::progress::start_progress;
use crate::stop::StopHandle;

/// Outcome of an engine run that was started.
///
/// A failed load test, for example because the target host was down, is reported here with
/// `succeeded == false` rather than as an [`OrchestratorError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    /// Exit code of the engine. On unix a process killed by a signal reports `128 + signal`.
    pub exit_code: i32,
    /// Files the run is expected to have written, in the order stats, failures, exceptions,
    /// report and resource samples. The last two only when they were requested.
    pub artifact_paths: Vec<PathBuf>,
    /// `true` iff `exit_code == 0`.
    pub succeeded: bool,
    /// Wall-clock time from spawning the engine until it exited.
    pub elapsed: Duration,
}

/// Things the executor does around the engine process, none of which change its outcome.
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Draw a progress bar over the planned runtime.
    pub progress: bool,
    /// Sample memory and CPU usage of this process while the engine runs.
    pub monitor: Option<MonitorTarget>,
}

/// Spawn the engine described by `spec` and block until it exits.
pub(crate) fn execute_spec(
    spec: &CommandSpec,
    options: &ExecuteOptions,
) -> OrchestratorResult<RunResult> {
    let engine_path = resolve_engine(spec.program())?;
    log::debug!("Resolved engine '{}' to '{}'", spec.program(), engine_path.display());

    log::info!("Running load test: {spec}");
    let started = Instant::now();
    let mut child = Command::new(&engine_path)
        .args(spec.args())
        .envs(spec.env().iter().map(|(key, value)| (key, value)))
        .stdin(Stdio::null())
        .spawn()
        .map_err(|e| launch_error(spec.program(), e))?;
    log::debug!("Engine running with PID: {pid}", pid = child.id());

    let stop_handle = StopHandle::default();
    let mut helpers = Vec::with_capacity(2);
    if options.progress {
        helpers.extend(start_progress(
            spec.planned_runtime(),
            stop_handle.new_listener(),
        ));
    }

    let mut resources = None;
    if let Some(target) = &options.monitor {
        match target.resolve() {
            Some(pid) => {
                let out_path = resources_path(&spec.artifacts().prefix);
                log::info!(
                    "Sampling resource usage of process {pid} to '{}'",
                    out_path.display()
                );
                if let Some(handle) = start_monitor(pid, out_path.clone(), stop_handle.new_listener())
                {
                    helpers.push(handle);
                    resources = Some(out_path);
                }
            }
            None => log::warn!("No running process matches {target:?}, not sampling resource usage"),
        }
    }

    let status = child.wait();
    let elapsed = started.elapsed();

    stop_handle.stop();
    for helper in helpers {
        if helper.join().is_err() {
            log::warn!("A helper thread panicked while the engine was running");
        }
    }

    let status = status.map_err(|source| OrchestratorError::Launch {
        engine: spec.program().to_string(),
        source,
    })?;
    let exit_code = exit_code(status);
    log::debug!("Engine finished with status: {status}");

    let mut artifact_paths = spec.artifacts().paths();
    artifact_paths.extend(resources);

    Ok(RunResult {
        exit_code,
        artifact_paths,
        succeeded: exit_code == 0,
        elapsed,
    })
}

fn launch_error(engine: &str, source: io::Error) -> OrchestratorError {
    if source.kind() == io::ErrorKind::NotFound {
        OrchestratorError::EngineNotFound {
            engine: engine.to_string(),
            reason: source.to_string(),
        }
    } else {
        OrchestratorError::Launch {
            engine: engine.to_string(),
            source,
        }
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt as _;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_not_found_is_engine_not_found() {
        let error = launch_error("locust", io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(error, OrchestratorError::EngineNotFound { .. }));
    }

    #[test]
    fn other_spawn_failures_are_launch_errors() {
        let error = launch_error("locust", io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(error, OrchestratorError::Launch { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn exit_codes_are_passed_through() {
        use std::os::unix::process::ExitStatusExt as _;

        assert_eq!(exit_code(ExitStatus::from_raw(0)), 0);
        assert_eq!(exit_code(ExitStatus::from_raw(1 << 8)), 1);
        assert_eq!(exit_code(ExitStatus::from_raw(42 << 8)), 42);
    }

    #[cfg(unix)]
    #[test]
    fn signal_maps_to_shell_convention() {
        use std::os::unix::process::ExitStatusExt as _;

        // SIGKILL
        assert_eq!(exit_code(ExitStatus::from_raw(9)), 137);
    }
}
