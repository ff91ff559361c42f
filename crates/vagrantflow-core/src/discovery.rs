//! Configuration file discovery

use crate::error::{Result, VagrantError};
use std::path::{Path, PathBuf};

/// Per-project directory holding state (and optionally the configuration)
pub const PROJECT_DIR: &str = ".vagrantflow";

const CANDIDATES: [&str; 2] = ["vagrantflow.kdl", ".vagrantflow.kdl"];

/// Locate the configuration file.
///
/// Search order:
/// 1. `explicit` (`--config` / `VFLOW_CONFIG`); a missing file is an error
/// 2. `vagrantflow.kdl`, `.vagrantflow.kdl` in `start`
/// 3. the same names inside `start/.vagrantflow/`
pub fn find_config_file(start: &Path, explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Ok(path);
        }
        return Err(VagrantError::ConfigNotFound(path));
    }

    let dirs = [start.to_path_buf(), start.join(PROJECT_DIR)];
    for dir in &dirs {
        for filename in &CANDIDATES {
            let path = dir.join(filename);
            if path.exists() {
                return Ok(path);
            }
        }
    }

    Err(VagrantError::ConfigNotFound(start.to_path_buf()))
}

/// Root of the project a configuration file belongs to.
///
/// A file inside `.vagrantflow/` belongs to the directory above it.
pub fn project_root(config_file: &Path) -> PathBuf {
    let dir = config_file.parent().unwrap_or_else(|| Path::new("."));
    match dir.file_name() {
        Some(name) if name == PROJECT_DIR => dir.parent().unwrap_or(dir).to_path_buf(),
        _ if dir.as_os_str().is_empty() => PathBuf::from("."),
        _ => dir.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_find_in_current_dir() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("vagrantflow.kdl"), "").unwrap();

        let found = find_config_file(dir.path(), None).unwrap();
        assert_eq!(found, dir.path().join("vagrantflow.kdl"));
        assert_eq!(project_root(&found), dir.path());
    }

    #[test]
    fn test_find_in_project_dir() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join(".vagrantflow")).unwrap();
        fs::write(dir.path().join(".vagrantflow/vagrantflow.kdl"), "").unwrap();

        let found = find_config_file(dir.path(), None).unwrap();
        assert_eq!(found, dir.path().join(".vagrantflow/vagrantflow.kdl"));
        assert_eq!(project_root(&found), dir.path());
    }

    #[test]
    fn test_explicit_path_wins() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("vagrantflow.kdl"), "").unwrap();
        let explicit = dir.path().join("other.kdl");
        fs::write(&explicit, "").unwrap();

        let found = find_config_file(dir.path(), Some(explicit.clone())).unwrap();
        assert_eq!(found, explicit);
    }

    #[test]
    fn test_missing_explicit_path_does_not_fall_back() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("vagrantflow.kdl"), "").unwrap();
        let explicit = dir.path().join("prod.kdl");

        let err = find_config_file(dir.path(), Some(explicit.clone())).unwrap_err();
        assert!(matches!(err, VagrantError::ConfigNotFound(ref path) if *path == explicit));
    }

    #[test]
    fn test_not_found() {
        let dir = tempdir().unwrap();
        let err = find_config_file(dir.path(), None).unwrap_err();
        assert!(matches!(err, VagrantError::ConfigNotFound(_)));
    }
}
