//! Error types for mk

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using the mk [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for mk operations
#[derive(Debug, Error)]
pub enum Error {
    /// External process exited with a non-zero status
    #[error("Executing '{subject}' failed with exit code {code}")]
    CommandFailed {
        /// Title of the command, or its command line when untitled
        subject: String,
        /// Full shell command line
        command: String,
        /// Exit code reported for the process
        code: i32,
    },

    /// Output extraction found no match
    #[error("{message}")]
    ExtractionFailed { message: String },

    /// Extraction pattern did not compile
    #[error("Invalid extraction pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// The external process could not be started at all
    #[error("Unable to start '{program}': {reason}")]
    SpawnFailed { program: String, reason: String },

    /// Log file and other I/O failures
    #[error(transparent)]
    Io(#[from] IoFailure),

    /// Configuration-related errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Failure inside a nested script invocation
    #[error("Unable to run subscript [{}]: {source}", path.display())]
    Subscript {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

/// I/O failures on the persistent log and process pipes
#[derive(Debug, Error)]
pub enum IoFailure {
    /// Log file could not be opened for appending
    #[error("Unable to open log file {}: {source}", path.display())]
    LogFileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Buffered history could not be written to the log file
    #[error("Unable to write log file {}: {source}", path.display())]
    LogFileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Any other I/O error (process pipes, stdin delivery)
    #[error("IO error: {0}")]
    Other(#[from] std::io::Error),
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found at {0}")]
    NotFound(PathBuf),

    /// Invalid configuration value
    #[error("Invalid configuration: {field} - {message}")]
    InvalidValue { field: String, message: String },

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// IO error
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a new "other" error with a message
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Self::Other(msg.into())
    }

    /// Exit code carried by the error, if it came from an external process
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::CommandFailed { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(IoFailure::Other(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_failed_message() {
        let err = Error::CommandFailed {
            subject: "Build".to_string(),
            command: "flutter build ios".to_string(),
            code: 7,
        };
        assert_eq!(err.to_string(), "Executing 'Build' failed with exit code 7");
        assert_eq!(err.exit_code(), Some(7));
    }

    #[test]
    fn test_io_error_converts_to_other_failure() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe").into();
        assert!(matches!(err, Error::Io(IoFailure::Other(_))));
        assert_eq!(err.exit_code(), None);
    }
}
