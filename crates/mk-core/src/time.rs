//! Elapsed-time counters and duration rendering

use std::fmt;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};

/// Timestamp format used for log file names
pub const LOG_FILE_NAME_FORMAT: &str = "%Y.%m.%d_%H.%M";

/// Duration rendered as `H:MM:SS.mmm`, hours with thousands separators
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Elapsed(Duration);

impl Elapsed {
    pub fn new(duration: Duration) -> Self {
        Self(duration)
    }

    /// Time elapsed since `start`
    pub fn since(start: Instant) -> Self {
        Self(start.elapsed())
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }

    /// Whole-second rendering without milliseconds
    pub fn seconds(&self) -> String {
        let total = self.0.as_secs();
        let s = total % 60;
        let m = (total / 60) % 60;
        let h = total / 3600;
        format!("{}:{:02}:{:02}", group_thousands(h), m, s)
    }
}

impl fmt::Display for Elapsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:03}", self.seconds(), self.0.subsec_millis())
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Monotonic counter started at construction
#[derive(Debug, Clone, Copy)]
pub struct TimeCounter {
    start: Instant,
}

impl TimeCounter {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// The instant this counter measures from
    pub fn started_at(&self) -> Instant {
        self.start
    }

    pub fn elapsed(&self) -> Elapsed {
        Elapsed::since(self.start)
    }
}

impl Default for TimeCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TimeCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.elapsed())
    }
}

/// Local wall-clock timestamp
#[derive(Debug, Clone, Copy)]
pub struct LocalTimestamp(DateTime<Local>);

impl LocalTimestamp {
    pub fn now() -> Self {
        Self(Local::now())
    }

    pub fn format(&self, fmt: &str) -> String {
        self.0.format(fmt).to_string()
    }

    /// Timestamp suitable for embedding in a log file name
    pub fn log_file_stamp(&self) -> String {
        self.format(LOG_FILE_NAME_FORMAT)
    }
}

impl From<DateTime<Local>> for LocalTimestamp {
    fn from(value: DateTime<Local>) -> Self {
        Self(value)
    }
}

impl fmt::Display for LocalTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d %H:%M:%S %z"))
    }
}
