//! Transient status indicator

use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressState, ProgressStyle};

use crate::time::Elapsed;

const TICK_INTERVAL: Duration = Duration::from_millis(100);
const STATUS_TEMPLATE: &str = "{spinner} {msg} {op_elapsed} (total {run_elapsed})";

/// A single-line spinner showing the operation and whole-run elapsed time.
///
/// Never part of the persistent history.
pub struct Status {
    title: String,
    started: Instant,
    bar: Option<ProgressBar>,
}

impl Status {
    /// Start a status; `animated` draws a spinner on the terminal
    pub fn start(title: impl Into<String>, run_started: Instant, animated: bool) -> Self {
        let title = title.into();
        let started = Instant::now();
        let bar = animated.then(|| {
            let bar = ProgressBar::new_spinner();
            bar.set_style(spinner_style(started, run_started));
            bar.set_message(title.clone());
            bar.enable_steady_tick(TICK_INTERVAL);
            bar
        });
        Self {
            title,
            started,
            bar,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn elapsed(&self) -> Elapsed {
        Elapsed::since(self.started)
    }

    /// Run `f` with the spinner hidden so regular output is not interleaved
    pub fn suspend<R>(&self, f: impl FnOnce() -> R) -> R {
        match &self.bar {
            Some(bar) => bar.suspend(f),
            None => f(),
        }
    }

    pub fn stop(self) {
        if let Some(bar) = self.bar {
            bar.finish_and_clear();
        }
    }
}

fn spinner_style(started: Instant, run_started: Instant) -> ProgressStyle {
    match ProgressStyle::with_template(STATUS_TEMPLATE) {
        Ok(style) => style
            .with_key(
                "op_elapsed",
                move |_: &ProgressState, w: &mut dyn std::fmt::Write| {
                    let _ = write!(w, "{}", Elapsed::since(started).seconds());
                },
            )
            .with_key(
                "run_elapsed",
                move |_: &ProgressState, w: &mut dyn std::fmt::Write| {
                    let _ = write!(w, "{}", Elapsed::since(run_started).seconds());
                },
            ),
        Err(_) => ProgressStyle::default_spinner(),
    }
}
