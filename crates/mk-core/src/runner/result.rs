//! Process result and output extraction

use std::fmt;

use regex::Regex;

use crate::error::{Error, Result};

use super::command::CommandSpec;

/// Combined output and exit code of a finished process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecResult {
    /// Interleaved stdout and stderr, trailing whitespace removed
    pub output: String,
    pub code: i32,
    pub source: CommandSpec,
}

impl ExecResult {
    pub fn new(output: String, code: i32, source: CommandSpec) -> Self {
        Self {
            output,
            code,
            source,
        }
    }

    pub fn success(&self) -> bool {
        self.code == 0
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.output.lines()
    }

    /// Capture group `group` of the first match of `pattern` in the output
    pub fn search(&self, pattern: &str, group: usize) -> Result<String> {
        self.search_with(pattern, group, None, None)
    }

    /// Like [`search`](Self::search), naming the value in the failure message.
    ///
    /// `message` replaces the generated failure text entirely.
    pub fn search_with(
        &self,
        pattern: &str,
        group: usize,
        tag: Option<&str>,
        message: Option<&str>,
    ) -> Result<String> {
        let regex = Regex::new(pattern).map_err(|source| Error::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;

        regex
            .captures(&self.output)
            .and_then(|caps| caps.get(group))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| Error::ExtractionFailed {
                message: match message {
                    Some(message) => message.to_string(),
                    None => self.extraction_message(tag),
                },
            })
    }

    fn extraction_message(&self, tag: Option<&str>) -> String {
        match tag {
            Some(tag) => format!("{self}: unable to extract the <{tag}> from the output"),
            None => format!("{self}: unable to extract a value from the output"),
        }
    }
}

impl fmt::Display for ExecResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExecResult(\"{}\")", self.source.subject())
    }
}
