//! Persistent console history
//!
//! Rendered fragments are buffered in insertion order and appended verbatim
//! to the log file once the flush capacity is reached or on explicit flush.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ConfigError, IoFailure, Result};

/// Default number of fragments buffered before an automatic flush
pub const DEFAULT_FLUSH_CAPACITY: usize = 1;

struct LogFile {
    path: PathBuf,
    file: File,
}

/// Append-only history buffer backed by an optional log file
pub struct History {
    pending: Vec<String>,
    log: Option<LogFile>,
    flush_capacity: usize,
}

impl History {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            log: None,
            flush_capacity: DEFAULT_FLUSH_CAPACITY,
        }
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.log.as_ref().map(|l| l.path.as_path())
    }

    pub fn flush_capacity(&self) -> usize {
        self.flush_capacity
    }

    /// Fragments waiting for the next flush
    pub fn pending(&self) -> &[String] {
        &self.pending
    }

    /// Direct history to `path`, appending.
    ///
    /// Re-attaching the current path is a no-op; attaching a different one
    /// flushes and closes the previous file first.
    pub fn set_log_file(&mut self, path: &Path, flush_capacity: Option<usize>) -> Result<()> {
        if let Some(capacity) = flush_capacity {
            if capacity < 1 {
                return Err(ConfigError::InvalidValue {
                    field: "log.flush_capacity".to_string(),
                    message: "must be at least 1".to_string(),
                }
                .into());
            }
        }

        if self.log_path() == Some(path) {
            return Ok(());
        }
        if self.log.is_some() {
            self.flush()?;
            self.log = None;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| IoFailure::LogFileOpen {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(path = %path.display(), "attached console log file");
        self.log = Some(LogFile {
            path: path.to_path_buf(),
            file,
        });
        if let Some(capacity) = flush_capacity {
            self.flush_capacity = capacity;
        }
        Ok(())
    }

    /// Append a rendered fragment; flushes when the capacity is reached.
    ///
    /// Fragments are only retained while a log file is attached.
    pub fn push(&mut self, fragment: String) -> Result<()> {
        if self.log.is_none() {
            return Ok(());
        }
        self.pending.push(fragment);
        if self.pending.len() >= self.flush_capacity {
            self.flush()?;
        }
        Ok(())
    }

    /// Write pending fragments to the log file in order and clear the buffer
    pub fn flush(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        if let Some(log) = self.log.as_mut() {
            let content = self.pending.concat();
            log.file
                .write_all(content.as_bytes())
                .and_then(|_| log.file.flush())
                .map_err(|source| IoFailure::LogFileWrite {
                    path: log.path.clone(),
                    source,
                })?;
        }
        self.pending.clear();
        Ok(())
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_without_log_file_nothing_is_retained() {
        let mut history = History::new();
        history.push("a\n".to_string()).unwrap();
        assert!(history.pending().is_empty());
    }

    #[test]
    fn test_flushes_at_capacity_in_order() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("run.log");
        let mut history = History::new();
        history.set_log_file(&path, Some(3)).unwrap();

        history.push("one\n".to_string()).unwrap();
        history.push("two\n".to_string()).unwrap();
        assert_eq!(history.pending().len(), 2);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");

        history.push("three\n".to_string()).unwrap();
        assert!(history.pending().is_empty());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "one\ntwo\nthree\n");
    }

    #[test]
    fn test_flush_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("run.log");
        let mut history = History::new();
        history.set_log_file(&path, Some(10)).unwrap();

        history.flush().unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");

        history.push("x\n".to_string()).unwrap();
        history.flush().unwrap();
        history.flush().unwrap();
        history.flush().unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "x\n");
    }

    #[test]
    fn test_same_path_is_noop_and_keeps_pending() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("run.log");
        let mut history = History::new();
        history.set_log_file(&path, Some(10)).unwrap();
        history.push("x\n".to_string()).unwrap();

        history.set_log_file(&path, None).unwrap();
        assert_eq!(history.pending(), ["x\n".to_string()]);
    }

    #[test]
    fn test_switching_path_flushes_previous() {
        let temp = TempDir::new().unwrap();
        let first = temp.path().join("first.log");
        let second = temp.path().join("second.log");
        let mut history = History::new();
        history.set_log_file(&first, Some(10)).unwrap();
        history.push("early\n".to_string()).unwrap();

        history.set_log_file(&second, None).unwrap();
        history.push("late\n".to_string()).unwrap();
        history.flush().unwrap();

        assert_eq!(std::fs::read_to_string(&first).unwrap(), "early\n");
        assert_eq!(std::fs::read_to_string(&second).unwrap(), "late\n");
        assert_eq!(history.log_path(), Some(second.as_path()));
    }

    #[test]
    fn test_appends_to_existing_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("run.log");
        std::fs::write(&path, "previous run\n").unwrap();

        let mut history = History::new();
        history.set_log_file(&path, None).unwrap();
        history.push("next\n".to_string()).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "previous run\nnext\n"
        );
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let temp = TempDir::new().unwrap();
        let mut history = History::new();
        let err = history
            .set_log_file(&temp.path().join("run.log"), Some(0))
            .unwrap_err();
        assert!(err.to_string().contains("flush_capacity"));
    }

    #[test]
    fn test_open_failure_is_io_failure() {
        let temp = TempDir::new().unwrap();
        let mut history = History::new();
        let err = history
            .set_log_file(&temp.path().join("missing/dir/run.log"), None)
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Io(IoFailure::LogFileOpen { .. })
        ));
    }
}
