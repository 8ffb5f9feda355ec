//! Samples the memory and CPU usage of the system under test while the engine is running.
//!
//! The samples go to `<output_directory>/<run_label>_resources.csv`, one row per
//! [`SAMPLE_INTERVAL`]. Nothing in here can fail a run, problems are logged as warnings.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};

use crate::stop::StopListener;

pub const RESOURCES_SUFFIX: &str = "_resources.csv";

const SAMPLE_INTERVAL: Duration = Duration::from_secs(1);
const BYTES_PER_MB: f64 = 1024.0 * 1024.0;
const HEADER: [&str; 5] = [
    "Timestamp",
    "Elapsed_Time_Seconds",
    "Memory_Usage_MB",
    "Memory_Percent",
    "CPU_Percent",
];

/// Identifies the process serving the target host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorTarget {
    /// A known process id.
    Pid(u32),
    /// The first process whose command line contains every one of these fragments, for example
    /// `["manage.py", "runserver"]`.
    CommandLine(Vec<String>),
}

impl MonitorTarget {
    /// Find the process id for this target, if the process is running.
    pub fn resolve(&self) -> Option<u32> {
        let mut sys = System::new();
        match self {
            MonitorTarget::Pid(pid) => {
                let pid = Pid::from_u32(*pid);
                sys.refresh_processes_specifics(
                    ProcessesToUpdate::Some(&[pid]),
                    true,
                    ProcessRefreshKind::nothing(),
                );
                sys.process(pid).map(|_| pid.as_u32())
            }
            MonitorTarget::CommandLine(fragments) => {
                sys.refresh_processes_specifics(
                    ProcessesToUpdate::All,
                    true,
                    ProcessRefreshKind::nothing().with_cmd(UpdateKind::Always),
                );
                let this_process = std::process::id();
                sys.processes()
                    .iter()
                    .filter(|(pid, _)| pid.as_u32() != this_process)
                    .filter(|(_, process)| command_line_matches(process.cmd(), fragments))
                    .map(|(pid, _)| pid.as_u32())
                    .min()
            }
        }
    }
}

fn command_line_matches(cmd: &[OsString], fragments: &[String]) -> bool {
    if fragments.is_empty() || cmd.is_empty() {
        return false;
    }
    let joined = cmd
        .iter()
        .map(|part| part.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ");
    fragments.iter().all(|fragment| joined.contains(fragment.as_str()))
}

/// Path of the resource samples for a run with the given artifact prefix.
pub fn resources_path(prefix: &Path) -> PathBuf {
    let mut path = prefix.as_os_str().to_os_string();
    path.push(RESOURCES_SUFFIX);
    PathBuf::from(path)
}

/// Start sampling `pid` into `out_path` until the stop signal is received.
pub(crate) fn start_monitor(
    pid: u32,
    out_path: PathBuf,
    stop_listener: StopListener,
) -> Option<JoinHandle<()>> {
    let mut writer = match csv::Writer::from_path(&out_path) {
        Ok(writer) => writer,
        Err(e) => {
            log::warn!(
                "Failed to create resource samples file '{}': {e}",
                out_path.display()
            );
            return None;
        }
    };

    let spawned = std::thread::Builder::new()
        .name("monitor".to_string())
        .spawn(move || {
            if let Err(e) = writer.write_record(HEADER) {
                log::warn!("Failed to write resource samples header: {e}");
                return;
            }

            let pid = Pid::from_u32(pid);
            let mut sys = System::new();
            sys.refresh_memory();
            let total_memory = sys.total_memory();
            let start_time = Instant::now();

            // CPU usage is measured between two refreshes, so take a baseline first
            refresh(&mut sys, pid);

            loop {
                if stop_listener.wait_for_stop(SAMPLE_INTERVAL) {
                    break;
                }

                refresh(&mut sys, pid);
                let Some(process) = sys.process(pid) else {
                    log::warn!("Monitored process {pid} is no longer running");
                    break;
                };

                let memory = process.memory();
                let memory_percent = if total_memory == 0 {
                    0.0
                } else {
                    memory as f64 / total_memory as f64 * 100.0
                };
                let record = [
                    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
                    format!("{:.2}", start_time.elapsed().as_secs_f64()),
                    format!("{:.2}", memory as f64 / BYTES_PER_MB),
                    format!("{memory_percent:.2}"),
                    format!("{:.2}", process.cpu_usage()),
                ];
                if let Err(e) = writer.write_record(&record) {
                    log::warn!("Failed to write resource sample: {e}");
                    break;
                }
                // Keep the file usable if the run is killed
                if let Err(e) = writer.flush() {
                    log::warn!("Failed to flush resource samples: {e}");
                    break;
                }
            }

            log::trace!("Monitor thread shutting down");
            if let Err(e) = writer.flush() {
                log::warn!("Failed to flush resource samples: {e}");
            }
        });

    match spawned {
        Ok(handle) => Some(handle),
        Err(e) => {
            log::warn!("Failed to start monitor thread: {e}");
            None
        }
    }
}

fn refresh(sys: &mut System, pid: Pid) {
    sys.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[pid]),
        true,
        ProcessRefreshKind::nothing().with_cpu().with_memory(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stop::StopHandle;

    #[test]
    fn match_all_fragments() {
        let cmd = vec![
            OsString::from("python"),
            OsString::from("manage.py"),
            OsString::from("runserver"),
            OsString::from("0.0.0.0:8000"),
        ];
        assert!(command_line_matches(
            &cmd,
            &["manage.py".to_string(), "runserver".to_string()]
        ));
        assert!(!command_line_matches(
            &cmd,
            &["manage.py".to_string(), "migrate".to_string()]
        ));
    }

    #[test]
    fn empty_fragments_match_nothing() {
        let cmd = vec![OsString::from("python")];
        assert!(!command_line_matches(&cmd, &[]));
    }

    #[test]
    fn resolve_own_pid() {
        let pid = std::process::id();
        assert_eq!(MonitorTarget::Pid(pid).resolve(), Some(pid));
    }

    #[test]
    fn unknown_pid_does_not_resolve() {
        assert_eq!(MonitorTarget::Pid(u32::MAX - 1).resolve(), None);
    }

    #[test]
    fn unmatched_command_line_does_not_resolve() {
        let target = MonitorTarget::CommandLine(vec![
            "no-such-process-fragment-7f3a9c".to_string(),
        ]);
        assert_eq!(target.resolve(), None);
    }

    #[test]
    fn resources_path_uses_prefix() {
        assert_eq!(
            resources_path(Path::new("results/20240101_120000")),
            PathBuf::from("results/20240101_120000_resources.csv")
        );
    }

    #[test]
    fn monitor_writes_header_and_samples() {
        let temp = tempfile::tempdir().expect("failed to create temp dir");
        let out_path = temp.path().join("run_resources.csv");
        let stop = StopHandle::default();

        let monitor = start_monitor(std::process::id(), out_path.clone(), stop.new_listener())
            .expect("failed to start monitor");
        std::thread::sleep(Duration::from_millis(2_500));
        stop.stop();
        monitor.join().expect("monitor thread panicked");

        let mut reader = csv::Reader::from_path(&out_path).expect("failed to open samples");
        let headers = reader.headers().expect("missing header").clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), HEADER.to_vec());

        let rows = reader
            .records()
            .collect::<Result<Vec<_>, _>>()
            .expect("invalid sample row");
        assert!(!rows.is_empty(), "expected at least one sample");
        let memory_mb: f64 = rows[0][2].parse().expect("memory is a number");
        assert!(memory_mb > 0.0);
    }
}
