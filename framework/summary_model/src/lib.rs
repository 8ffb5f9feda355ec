use itertools::Itertools;
use serde::{Deserialize, Serialize};
use sha3::Digest;
use std::collections::HashMap;
use std::io::{BufRead, Read, Write};
use std::path::{Path, PathBuf};

/// Summary of an executed load-test run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    /// The run label
    ///
    /// Prefix of every artifact the run wrote.
    pub run_label: String,
    /// Base URL of the system under test
    pub target_host: String,
    /// The number of simulated users configured
    pub user_count: u32,
    /// The number of users started per second
    pub spawn_rate: f64,
    /// The duration that the run was configured with, in seconds
    pub run_duration_s: u64,
    /// The time the run started
    ///
    /// This is a Unix timestamp in seconds.
    pub started_at: i64,
    /// Exit code of the load-generation engine
    pub exit_code: i32,
    /// Whether the engine reported success
    pub succeeded: bool,
    /// Files the run is expected to have written
    pub artifacts: Vec<PathBuf>,
    /// Name or path of the load-generation engine
    pub engine: String,
    /// Output of `<engine> --version`, if it could be read
    pub engine_version: Option<String>,
    /// Environment variables set for the engine
    ///
    /// Only the variables the runner sets itself, not the inherited environment.
    pub env: HashMap<String, String>,
    /// The version of Swarm that ran the engine
    pub swarm_version: String,
}

impl RunSummary {
    /// Create a new run summary
    ///
    /// The outcome fields start out as a failed run with exit code `-1` until
    /// [RunSummary::set_outcome] is called.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        run_label: String,
        target_host: String,
        user_count: u32,
        spawn_rate: f64,
        run_duration_s: u64,
        started_at: i64,
        engine: String,
        swarm_version: String,
    ) -> Self {
        Self {
            run_label,
            target_host,
            user_count,
            spawn_rate,
            run_duration_s,
            started_at,
            exit_code: -1,
            succeeded: false,
            artifacts: Vec::with_capacity(0),
            engine,
            engine_version: None,
            env: HashMap::with_capacity(0),
            swarm_version,
        }
    }

    /// Record how the engine exited and what it wrote
    pub fn set_outcome(&mut self, exit_code: i32, artifacts: Vec<PathBuf>) {
        self.exit_code = exit_code;
        self.succeeded = exit_code == 0;
        self.artifacts = artifacts;
    }

    pub fn set_engine_version(&mut self, engine_version: Option<String>) {
        self.engine_version = engine_version;
    }

    /// Add an environment variable
    pub fn add_env(&mut self, key: String, value: String) {
        self.env.insert(key, value);
    }

    /// Compute a fingerprint for this run summary
    ///
    /// The fingerprint is intended to identify runs that used the same configuration so that their
    /// results can be compared. It uses the
    ///     - Target host
    ///     - User count and spawn rate
    ///     - Run duration
    ///     - Environment variables
    ///     - Engine and engine version
    ///     - Swarm version
    ///
    /// The run label, start time and outcome are not included. The fingerprint is computed using
    /// [sha3::Sha3_256].
    pub fn fingerprint(&self) -> String {
        let mut hasher = sha3::Sha3_256::new();
        Digest::update(&mut hasher, self.target_host.as_bytes());
        Digest::update(&mut hasher, self.user_count.to_le_bytes());
        Digest::update(&mut hasher, self.spawn_rate.to_le_bytes());
        Digest::update(&mut hasher, self.run_duration_s.to_le_bytes());
        self.env
            .iter()
            .sorted_by_key(|(k, _)| k.to_owned())
            .for_each(|(k, v)| {
                Digest::update(&mut hasher, k.as_bytes());
                Digest::update(&mut hasher, v.as_bytes());
            });
        Digest::update(&mut hasher, self.engine.as_bytes());
        if let Some(engine_version) = &self.engine_version {
            Digest::update(&mut hasher, engine_version.as_bytes());
        }
        Digest::update(&mut hasher, self.swarm_version.as_bytes());

        format!("{:x}", hasher.finalize())
    }
}

/// Append the run summary to a file
///
/// The summary will be serialized to JSON and output as a single line followed by a newline. The
/// recommended file extension is `.jsonl`.
///
/// The line is written with a single call so that runs sharing a summary file do not interleave.
pub fn append_run_summary(run_summary: &RunSummary, path: &Path) -> anyhow::Result<()> {
    let mut line = Vec::new();
    store_run_summary(run_summary, &mut line)?;
    line.push(b'\n');

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)?;
    file.write_all(&line)?;
    Ok(())
}

/// Serialize the run summary to a writer
pub fn store_run_summary<W: Write>(run_summary: &RunSummary, writer: &mut W) -> anyhow::Result<()> {
    serde_json::to_writer(writer, run_summary)?;
    Ok(())
}

/// Load a run summary from a reader
pub fn load_run_summary<R: Read>(reader: R) -> anyhow::Result<RunSummary> {
    let reader = std::io::BufReader::new(reader);
    let run_summary: RunSummary = serde_json::from_reader(reader)?;
    Ok(run_summary)
}

/// Load run summaries from a file
///
/// The file should contain one JSON object per line. This is the format produced by
/// [append_run_summary].
pub fn load_summary_runs(path: &Path) -> anyhow::Result<Vec<RunSummary>> {
    let file = std::fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);
    let mut runs = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let run: RunSummary = serde_json::from_str(&line)?;
        runs.push(run);
    }
    Ok(runs)
}
