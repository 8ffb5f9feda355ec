use std::fs;
use std::io;
use std::path::Path;

use crate::error::{OrchestratorError, OrchestratorResult};

/// Make sure `path` exists as a directory, creating any missing parents.
///
/// Does nothing if the directory already exists and can be written to. Fails with
/// [`OrchestratorError::Filesystem`] if the path exists but is not a writable directory, or the
/// directory cannot be created.
pub fn prepare_output_directory(path: &Path) -> OrchestratorResult<()> {
    let filesystem_error = |source: io::Error| OrchestratorError::Filesystem {
        path: path.to_path_buf(),
        source,
    };

    match fs::metadata(path) {
        Ok(metadata) if metadata.is_dir() => {
            log::debug!("Output directory '{}' already exists", path.display());
            return check_writable(path).map_err(filesystem_error);
        }
        Ok(_) => {
            return Err(filesystem_error(io::Error::new(
                io::ErrorKind::AlreadyExists,
                "path exists and is not a directory",
            )));
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(filesystem_error(e)),
    }

    log::info!("Creating output directory '{}'", path.display());
    fs::create_dir_all(path).map_err(filesystem_error)
}

/// Create and remove a marker file, so permissions are checked the way the engine will see them.
fn check_writable(path: &Path) -> io::Result<()> {
    let marker = path.join(format!(".swarm_write_check_{}", std::process::id()));
    fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&marker)
        .map_err(|e| io::Error::new(e.kind(), format!("'{}' is not writable: {e}", path.display())))?;
    fs::remove_file(&marker)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_missing_directory_with_parents() {
        let temp = tempfile::tempdir().expect("failed to create temp dir");
        let path = temp.path().join("nested").join("results");

        prepare_output_directory(&path).expect("failed to prepare output directory");

        assert!(path.is_dir());
    }

    #[test]
    fn prepare_is_idempotent() {
        let temp = tempfile::tempdir().expect("failed to create temp dir");
        let path = temp.path().join("results");

        prepare_output_directory(&path).expect("first prepare failed");
        prepare_output_directory(&path).expect("second prepare failed");

        assert!(path.is_dir());
    }

    #[test]
    fn existing_file_is_a_filesystem_error() {
        let temp = tempfile::tempdir().expect("failed to create temp dir");
        let path = temp.path().join("results");
        fs::write(&path, "not a directory").expect("failed to write file");

        let result = prepare_output_directory(&path);

        assert!(matches!(result, Err(OrchestratorError::Filesystem { .. })));
        assert!(path.is_file());
    }

    #[test]
    fn existing_directory_is_left_clean() {
        let temp = tempfile::tempdir().expect("failed to create temp dir");

        prepare_output_directory(temp.path()).expect("failed to prepare output directory");

        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn read_only_directory_follows_actual_write_access() {
        use std::os::unix::fs::PermissionsExt as _;

        let temp = tempfile::tempdir().expect("failed to create temp dir");
        let path = temp.path().join("results");
        fs::create_dir(&path).expect("failed to create dir");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o555)).unwrap();

        // Root can write to a 0o555 directory, anyone else cannot
        let can_write = fs::write(path.join("check.txt"), "").is_ok();
        let _ = fs::remove_file(path.join("check.txt"));

        let result = prepare_output_directory(&path);
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();

        if can_write {
            assert!(result.is_ok(), "writable directory was rejected: {result:?}");
        } else {
            assert!(matches!(result, Err(OrchestratorError::Filesystem { .. })));
        }
        assert_eq!(fs::read_dir(&path).unwrap().count(), 0);
    }

    #[test]
    fn file_in_parent_path_is_a_filesystem_error() {
        let temp = tempfile::tempdir().expect("failed to create temp dir");
        let blocker = temp.path().join("blocker");
        fs::write(&blocker, "").expect("failed to write file");

        let result = prepare_output_directory(&blocker.join("results"));

        assert!(matches!(result, Err(OrchestratorError::Filesystem { .. })));
    }
}
