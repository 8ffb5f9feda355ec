use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::{OrchestratorError, OrchestratorResult};

/// Get the path to the load-generation engine.
///
/// `engine` is either a bare program name, which is looked up in the user's `PATH`, or a path to
/// the executable, which must exist.
pub fn resolve_engine(engine: &str) -> OrchestratorResult<PathBuf> {
    if engine.is_empty() {
        return Err(OrchestratorError::EngineNotFound {
            engine: engine.to_string(),
            reason: "engine name is empty".to_string(),
        });
    }

    let path = Path::new(engine);
    if path.components().count() == 1 {
        log::debug!("'{engine}' is not a path so looking in user's 'PATH'");
    }

    which::which(path).map_err(|e| OrchestratorError::EngineNotFound {
        engine: engine.to_string(),
        reason: format!("{e}. Please install it or pass the path to the executable"),
    })
}

/// Get the version reported by `<engine> --version`.
///
/// This is only informational, so any failure is logged and `None` is returned.
pub fn engine_version(engine_path: &Path) -> Option<String> {
    let output = match Command::new(engine_path)
        .arg("--version")
        .stdin(Stdio::null())
        .output()
    {
        Ok(output) => output,
        Err(e) => {
            log::warn!(
                "Failed to execute '{} --version': {e}",
                engine_path.display()
            );
            return None;
        }
    };
    if !output.status.success() {
        log::warn!(
            "'{} --version' failed with exit code: {}",
            engine_path.display(),
            output.status
        );
        return None;
    }

    // Some engines print their version to stderr
    let text = if output.stdout.iter().all(u8::is_ascii_whitespace) {
        output.stderr
    } else {
        output.stdout
    };

    match String::from_utf8(text) {
        Ok(version) if !version.trim().is_empty() => Some(version.trim().to_string()),
        Ok(_) => None,
        Err(e) => {
            log::warn!("Engine version output is not UTF-8: {e}");
            None
        }
    }
}
