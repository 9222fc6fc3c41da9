//! Console sink
//!
//! The single channel through which all human-visible and logged text passes.
//! Every write is appended to the persistent history; writes flagged for
//! display are also rendered on the display surface, styled from the
//! [`StyleTable`]. A transient [`Status`] spinner can overlay the display
//! while long operations block.

mod history;
mod status;
mod style;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};
use std::time::Instant;

use console::{measure_text_width, Term};
use tracing::warn;

use crate::error::Result;

pub use history::{History, DEFAULT_FLUSH_CAPACITY};
pub use status::Status;
pub use style::{ConsoleStyle, StyleTable};

const DEFAULT_RULE_WIDTH: usize = 100;

/// Shared in-memory display, unstyled
#[derive(Debug, Clone, Default)]
pub struct MemoryBuffer(Arc<Mutex<String>>);

impl MemoryBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }

    fn push_line(&self, line: &str) {
        let mut buf = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        buf.push_str(line);
        buf.push('\n');
    }
}

/// Where displayed text goes
pub enum Surface {
    /// Interactive terminal on stdout
    Terminal(Term),
    /// In-memory buffer
    Memory(MemoryBuffer),
    /// Nothing is displayed; history only
    Hidden,
}

impl Surface {
    fn is_interactive(&self) -> bool {
        matches!(self, Self::Terminal(term) if term.is_term())
    }

    fn width(&self) -> usize {
        match self {
            Self::Terminal(term) if term.is_term() => term.size().1 as usize,
            _ => DEFAULT_RULE_WIDTH,
        }
    }
}

/// Console state: display surface, style table, history and status
pub struct ConsoleSink {
    surface: Surface,
    styles: StyleTable,
    prev_line_empty: bool,
    history: History,
    status: Option<Status>,
    run_started: Instant,
}

impl ConsoleSink {
    pub fn new(surface: Surface) -> Self {
        Self {
            surface,
            styles: StyleTable::default(),
            prev_line_empty: true,
            history: History::new(),
            status: None,
            run_started: Instant::now(),
        }
    }

    pub fn styles_mut(&mut self) -> &mut StyleTable {
        &mut self.styles
    }

    /// Whether the most recent write ended with a blank line
    pub fn prev_line_empty(&self) -> bool {
        self.prev_line_empty
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn status(&self) -> Option<&Status> {
        self.status.as_ref()
    }

    /// Append `text` to history and optionally display it. Never fails.
    pub fn write(&mut self, text: &str, style: Option<ConsoleStyle>, to_display: bool) {
        self.prev_line_empty = text.is_empty() || text.ends_with('\n');

        if to_display {
            let rendered = match style.and_then(|s| self.resolve_style(s)) {
                Some(style) if matches!(self.surface, Surface::Terminal(_)) => {
                    style.apply_to(text).to_string()
                }
                _ => text.to_string(),
            };
            self.emit_line(&rendered);
        }

        if let Err(e) = self.history.push(format!("{text}\n")) {
            self.warn(&format!("unable to write console history: {e}"));
        }
    }

    pub fn write_empty_line(&mut self, if_needed_only: bool) {
        if !if_needed_only || !self.prev_line_empty {
            self.write("", None, true);
        }
    }

    pub fn write_section_header(&mut self, text: &str) {
        self.write_empty_line(true);
        self.write(text, Some(ConsoleStyle::SectionHeader), true);
    }

    /// Horizontal rule with a centered title
    pub fn write_rule(&mut self, title: &str) {
        let width = self.surface.width();
        let label = format!(" {title} ");
        let fill = width.saturating_sub(measure_text_width(&label));
        let left = fill / 2;
        let line = format!("{}{}{}", "─".repeat(left), label, "─".repeat(fill - left));
        self.write(&line, None, true);
    }

    /// One sample line per style table entry
    pub fn dump_styles(&mut self) {
        let entries: Vec<ConsoleStyle> = self.styles.entries().collect();
        for style in entries {
            self.write(style.as_str(), Some(style), true);
        }
    }

    pub fn start_status(&mut self, title: &str) {
        self.stop_status();
        let animated = self.surface.is_interactive();
        self.status = Some(Status::start(title, self.run_started, animated));
    }

    pub fn stop_status(&mut self) {
        if let Some(status) = self.status.take() {
            status.stop();
        }
    }

    pub fn set_log_file(&mut self, path: &Path, flush_capacity: Option<usize>) -> Result<()> {
        self.history.set_log_file(path, flush_capacity)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.history.flush()
    }

    /// Stop any status indicator and flush; called at script termination
    pub fn finalize(&mut self) -> Result<()> {
        self.stop_status();
        self.flush()
    }

    fn resolve_style(&self, style: ConsoleStyle) -> Option<console::Style> {
        match self.styles.get(style) {
            Some(s) => Some(s.clone()),
            None => {
                self.warn(&format!("unable to resolve the console style '{style}'"));
                None
            }
        }
    }

    /// One-line warning on the display only
    fn warn(&self, message: &str) {
        warn!("{message}");
        let line = format!("mk console: warning: {message}");
        let line = match self.surface {
            Surface::Terminal(_) => console::style(line).yellow().to_string(),
            _ => line,
        };
        self.emit_line(&line);
    }

    fn emit_line(&self, line: &str) {
        match &self.surface {
            Surface::Terminal(term) => {
                let result = match &self.status {
                    Some(status) => status.suspend(|| term.write_line(line)),
                    None => term.write_line(line),
                };
                if let Err(e) = result {
                    warn!(error = %e, "console display write failed");
                }
            }
            Surface::Memory(buffer) => buffer.push_line(line),
            Surface::Hidden => {}
        }
    }
}

/// Clonable handle to the process-wide console sink
#[derive(Clone)]
pub struct Console {
    inner: Arc<Mutex<ConsoleSink>>,
}

impl Console {
    pub fn new(sink: ConsoleSink) -> Self {
        Self {
            inner: Arc::new(Mutex::new(sink)),
        }
    }

    /// Console displaying on stdout
    pub fn terminal() -> Self {
        Self::new(ConsoleSink::new(Surface::Terminal(Term::stdout())))
    }

    /// Console displaying into a shared in-memory buffer
    pub fn memory() -> (Self, MemoryBuffer) {
        let buffer = MemoryBuffer::new();
        let console = Self::new(ConsoleSink::new(Surface::Memory(buffer.clone())));
        (console, buffer)
    }

    /// Console that only records history
    pub fn hidden() -> Self {
        Self::new(ConsoleSink::new(Surface::Hidden))
    }

    /// Exclusive access to the sink
    pub fn sink(&self) -> MutexGuard<'_, ConsoleSink> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Access without blocking; `None` when another caller holds the sink
    pub fn try_sink(&self) -> Option<MutexGuard<'_, ConsoleSink>> {
        match self.inner.try_lock() {
            Ok(guard) => Some(guard),
            Err(TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => None,
        }
    }

    pub fn write(&self, text: &str) {
        self.sink().write(text, None, true);
    }

    pub fn write_styled(&self, text: &str, style: ConsoleStyle) {
        self.sink().write(text, Some(style), true);
    }

    pub fn write_with(&self, text: &str, style: Option<ConsoleStyle>, to_display: bool) {
        self.sink().write(text, style, to_display);
    }

    pub fn write_empty_line(&self) {
        self.sink().write_empty_line(true);
    }

    pub fn write_blank_line(&self) {
        self.sink().write_empty_line(false);
    }

    pub fn write_section_header(&self, text: &str) {
        self.sink().write_section_header(text);
    }

    pub fn write_rule(&self, title: &str) {
        self.sink().write_rule(title);
    }

    pub fn dump_styles(&self) {
        self.sink().dump_styles();
    }

    pub fn start_status(&self, title: &str) {
        self.sink().start_status(title);
    }

    pub fn stop_status(&self) {
        self.sink().stop_status();
    }

    pub fn set_log_file(&self, path: &Path, flush_capacity: Option<usize>) -> Result<()> {
        self.sink().set_log_file(path, flush_capacity)
    }

    pub fn log_path(&self) -> Option<PathBuf> {
        self.sink().history().log_path().map(Path::to_path_buf)
    }

    pub fn pending_history(&self) -> Vec<String> {
        self.sink().history().pending().to_vec()
    }

    pub fn flush(&self) -> Result<()> {
        self.sink().flush()
    }

    pub fn finalize(&self) -> Result<()> {
        self.sink().finalize()
    }
}
