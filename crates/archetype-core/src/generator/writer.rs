//! Writing generated files without clobbering existing ones

use crate::error::{ArchetypeError, IoContext, Result};
use crate::fileset::is_contained;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// What happened to one output file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The file was created
    Written,
    /// The file already existed and was kept, as merge mode allows
    SkippedExisting,
    /// The file already existed; the caller's policy has not decided yet
    Conflict,
}

/// How a call site treats a [`WriteOutcome::Conflict`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExistingFilePolicy {
    /// Fresh generation: an existing file is fatal
    Fail,
    /// Merge mode: keep the existing file and carry on
    Warn,
}

impl ExistingFilePolicy {
    pub fn resolve(self, outcome: WriteOutcome, path: &Path) -> Result<WriteOutcome> {
        match (outcome, self) {
            (WriteOutcome::Conflict, Self::Fail) => {
                Err(ArchetypeError::OutputFileExists(path.to_path_buf()))
            }
            (WriteOutcome::Conflict, Self::Warn) => {
                tracing::warn!(path = %path.display(), "file already exists, skipping");
                Ok(WriteOutcome::SkippedExisting)
            }
            (outcome, _) => Ok(outcome),
        }
    }
}

/// `relative` joined onto `root`, refusing paths that would leave it
pub fn contained_path(root: &Path, relative: &str) -> Result<PathBuf> {
    if !is_contained(relative) {
        return Err(ArchetypeError::failure(format!(
            "Output path '{}' escapes {}",
            relative,
            root.display()
        )));
    }
    Ok(root.join(relative))
}

/// Create `path` with `contents` unless it already exists
pub fn write_new_file(path: &Path, contents: &[u8]) -> Result<WriteOutcome> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).at("Failed to create directory", parent)?;
    }
    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(mut file) => {
            file.write_all(contents).at("Failed to write", path)?;
            Ok(WriteOutcome::Written)
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(WriteOutcome::Conflict),
        Err(e) => Err(ArchetypeError::wrap(
            format!("Failed to create {}", path.display()),
            e,
        )),
    }
}

/// Files touched by one generation run
#[derive(Debug, Default)]
pub struct WriteLog {
    pub written: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
}

impl WriteLog {
    pub fn write(
        &mut self,
        path: &Path,
        contents: &[u8],
        policy: ExistingFilePolicy,
    ) -> Result<WriteOutcome> {
        let outcome = policy.resolve(write_new_file(path, contents)?, path)?;
        match outcome {
            WriteOutcome::Written => {
                tracing::debug!(path = %path.display(), "wrote file");
                self.written.push(path.to_path_buf());
            }
            WriteOutcome::SkippedExisting => self.skipped.push(path.to_path_buf()),
            WriteOutcome::Conflict => {}
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a/b/c.txt");
        assert_eq!(write_new_file(&path, b"x").unwrap(), WriteOutcome::Written);
        assert_eq!(fs::read(&path).unwrap(), b"x");
    }

    #[test]
    fn test_existing_file_is_conflict_and_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("c.txt");
        fs::write(&path, "original").unwrap();
        assert_eq!(write_new_file(&path, b"new").unwrap(), WriteOutcome::Conflict);
        assert_eq!(fs::read_to_string(&path).unwrap(), "original");
    }

    #[test]
    fn test_policy_decides_conflicts() {
        let path = Path::new("x/pom.xml");
        assert!(matches!(
            ExistingFilePolicy::Fail.resolve(WriteOutcome::Conflict, path),
            Err(ArchetypeError::OutputFileExists(_))
        ));
        assert_eq!(
            ExistingFilePolicy::Warn
                .resolve(WriteOutcome::Conflict, path)
                .unwrap(),
            WriteOutcome::SkippedExisting
        );
        assert_eq!(
            ExistingFilePolicy::Fail
                .resolve(WriteOutcome::Written, path)
                .unwrap(),
            WriteOutcome::Written
        );
    }

    #[test]
    fn test_contained_path_rejects_escapes() {
        let root = Path::new("/work/proj");
        assert_eq!(
            contained_path(root, "src/App.java").unwrap(),
            root.join("src/App.java")
        );
        assert_eq!(contained_path(root, "").unwrap(), root.to_path_buf());
        for escape in ["../x", "src/../../x", "/etc/passwd"] {
            assert!(
                matches!(
                    contained_path(root, escape),
                    Err(ArchetypeError::GenerationFailure { .. })
                ),
                "{}",
                escape
            );
        }
    }

    #[test]
    fn test_log_records_skips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("c.txt");
        let mut log = WriteLog::default();
        log.write(&path, b"1", ExistingFilePolicy::Warn).unwrap();
        log.write(&path, b"2", ExistingFilePolicy::Warn).unwrap();
        assert_eq!(log.written, vec![path.clone()]);
        assert_eq!(log.skipped, vec![path.clone()]);
        assert_eq!(fs::read(&path).unwrap(), b"1");
    }
}
