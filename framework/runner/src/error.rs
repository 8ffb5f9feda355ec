use std::path::PathBuf;

/// Errors that stop a run before the load-generation engine produces a result.
///
/// A run where the engine starts and then exits with a non-zero code is not an error, see
/// [`crate::executor::RunResult::succeeded`].
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// The run configuration was rejected before anything touched the filesystem.
    #[error("Invalid value for '{field}': {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    /// The output directory could not be created or is not a directory.
    #[error("Output directory '{}' is unusable: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The load-generation engine executable could not be resolved.
    #[error("Load-generation engine '{engine}' not found: {reason}")]
    EngineNotFound { engine: String, reason: String },

    /// The engine was found but spawning or waiting on it failed.
    #[error("Failed to run load-generation engine '{engine}': {source}")]
    Launch {
        engine: String,
        #[source]
        source: std::io::Error,
    },
}

impl OrchestratorError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        OrchestratorError::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }

    /// Process exit code the `swarm` binary uses for this error.
    ///
    /// Codes follow `sysexits.h` where one applies and the shell's `127` for a missing command, so
    /// they stay distinct from the engine's own failure code.
    pub fn exit_code(&self) -> i32 {
        match self {
            OrchestratorError::InvalidConfig { .. } => 64,
            OrchestratorError::Filesystem { .. } => 74,
            OrchestratorError::EngineNotFound { .. } => 127,
            OrchestratorError::Launch { .. } => 70,
        }
    }
}

/// Result type returned by the orchestrator operations.
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
