//! Script lifecycle controller
//!
//! A [`Script`] owns the execution stack and the "already exited" latch for
//! one automation script. Whatever ends the script (normal return, an error
//! reaching the top, `die`, `success`, a termination signal or a panic) goes
//! through the same termination protocol, which runs at most once per frame:
//!
//! 1. flush the console history
//! 2. print the styled banner `[ROOT >> CHILD] <message>. Execution time <t>`
//! 3. finalize the console (stop the status indicator, final flush)
//! 4. send the desktop notification
//!
//! ```ignore
//! fn main() {
//!     Script::builder(std::env::args_os().next().unwrap_or_default())
//!         .build()
//!         .unwrap_or_else(|e| { eprintln!("{e}"); std::process::exit(1) })
//!         .run(|script| {
//!             Runner::new("flutter").with_arg("doctor").run(script.console(), &RunOptions::default())?;
//!             Ok(())
//!         })
//! }
//! ```

mod exit;
mod signals;
mod stack;

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::MkConfig;
use crate::console::Console;
use crate::error::{Error, IoFailure, Result};
use crate::notification::{DesktopNotifier, Notification, Notifier};
use crate::runner::{ExecResult, IntoArg, RunOptions, Runner};
use crate::time::{Elapsed, LocalTimestamp};

pub use exit::{ExitAction, ExitActions, ExitReason};
pub use signals::{PreviousDisposition, SignalCallback, SignalChain, TerminationSignal};
pub use stack::{ExecutionStack, Frame};

/// Block termination signals on the calling thread.
///
/// Call first thing in `main` when threads are spawned before the
/// [`Script`] is built; they inherit the blocked mask.
#[cfg(unix)]
pub fn block_termination_signals() -> Result<()> {
    signals::block()
}

#[cfg(not(unix))]
pub fn block_termination_signals() -> Result<()> {
    Ok(())
}

struct LifecycleState {
    stack: ExecutionStack,
    exited: bool,
}

struct ScriptInner {
    console: Console,
    state: Mutex<LifecycleState>,
    notifier: Box<dyn Notifier>,
    actions: ExitActions,
    chain: SignalChain,
}

/// Values captured under the state lock for one protocol run
struct ExitSnapshot {
    display_path: String,
    notification_name: String,
    elapsed: Elapsed,
}

/// Clonable handle to the lifecycle of one running script
#[derive(Clone)]
pub struct Script {
    inner: Arc<ScriptInner>,
}

impl Script {
    pub fn builder(root: impl Into<PathBuf>) -> ScriptBuilder {
        ScriptBuilder::new(root)
    }

    pub fn console(&self) -> &Console {
        &self.inner.console
    }

    fn state(&self) -> MutexGuard<'_, LifecycleState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn try_state(&self) -> Option<MutexGuard<'_, LifecycleState>> {
        match self.inner.state.try_lock() {
            Ok(guard) => Some(guard),
            Err(TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => None,
        }
    }

    /// Path of the innermost frame
    pub fn path(&self) -> PathBuf {
        self.state().stack.current().path().to_path_buf()
    }

    /// Directory of the innermost frame
    pub fn directory(&self) -> PathBuf {
        self.state().stack.current().directory().to_path_buf()
    }

    /// `[ROOT >> CHILD]`
    pub fn display_path(&self) -> String {
        self.state().stack.display_path()
    }

    pub fn depth(&self) -> usize {
        self.state().stack.depth()
    }

    pub fn is_nested(&self) -> bool {
        self.state().stack.is_nested()
    }

    /// Whether the termination protocol already ran for the current frame
    pub fn has_exited(&self) -> bool {
        self.state().exited
    }

    /// Elapsed time of the innermost frame
    pub fn elapsed(&self) -> Elapsed {
        self.state().stack.current().counter().elapsed()
    }

    pub fn frame_started_at(&self) -> Instant {
        self.state().stack.current().counter().started_at()
    }

    /// Run the termination protocol for `reason`.
    ///
    /// Returns `false` when the protocol already ran for this frame.
    pub fn terminate(&self, reason: ExitReason, details: Option<&str>) -> bool {
        self.protocol(reason, details, true, true)
    }

    fn protocol(&self, reason: ExitReason, details: Option<&str>, notify: bool, blocking: bool) -> bool {
        let snapshot = {
            let state = if blocking {
                Some(self.state())
            } else {
                self.try_state()
            };
            let Some(mut state) = state else {
                return false;
            };
            if state.exited {
                return false;
            }
            state.exited = true;
            ExitSnapshot {
                display_path: state.stack.display_path(),
                notification_name: state.stack.notification_name(),
                elapsed: state.stack.current().counter().elapsed(),
            }
        };
        info!(reason = %reason, script = %snapshot.display_path, "script terminating");

        let action = self.inner.actions.for_reason(reason);
        let sink = if blocking {
            Some(self.inner.console.sink())
        } else {
            self.inner.console.try_sink()
        };
        match sink {
            Some(mut sink) => {
                if let Err(e) = sink.flush() {
                    warn!(error = %e, "console flush failed during termination");
                }
                if let Some(style) = action.style {
                    let mut line = format!(
                        "{} {}. Execution time {}",
                        snapshot.display_path,
                        reason.message(),
                        snapshot.elapsed
                    );
                    if let Some(details) = details {
                        line.push_str(&format!(", Details: {details}"));
                    }
                    sink.write_empty_line(true);
                    sink.write(&line, Some(style), true);
                    sink.write_empty_line(true);
                }
                if let Err(e) = sink.finalize() {
                    warn!(error = %e, "console finalize failed during termination");
                }
            }
            None => warn!("console busy, termination banner skipped"),
        }

        if notify {
            if let Some(config) = &action.notification {
                let notification = Notification::new(
                    format!("{} {}", snapshot.notification_name, reason.message()),
                    format!("Execution time {}", snapshot.elapsed),
                    details.map(str::to_string),
                    config,
                );
                if let Err(e) = self.inner.notifier.notify(&notification) {
                    warn!(error = %e, "termination notification failed");
                }
            }
        }
        true
    }

    /// Report a fatal failure and exit with code 1
    pub fn die(&self, message: impl Display) -> ! {
        self.terminate(ExitReason::Died, Some(&message.to_string()));
        std::process::exit(1)
    }

    /// Report completion.
    ///
    /// At the root frame this notifies and exits with code 0. In a nested
    /// frame only the banner is written and control returns to the caller.
    pub fn success(&self, message: Option<&str>) {
        if self.is_nested() {
            self.protocol(ExitReason::Completed, message, false, true);
            return;
        }
        self.terminate(ExitReason::Completed, message);
        std::process::exit(0)
    }

    /// Settle the outcome of a script body; returns the process exit code
    pub fn complete(&self, outcome: anyhow::Result<()>) -> i32 {
        match outcome {
            Ok(()) => {
                self.terminate(ExitReason::Finished, None);
                0
            }
            Err(e) => {
                self.terminate(ExitReason::Died, Some(&format!("{e:#}")));
                1
            }
        }
    }

    /// Run the root script body and exit with its outcome
    pub fn run<F>(self, body: F) -> !
    where
        F: FnOnce(&Script) -> anyhow::Result<()>,
    {
        let outcome = body(&self);
        let code = self.complete(outcome);
        std::process::exit(code)
    }

    /// Termination protocol for `signal`, then forward it to the previous disposition
    pub fn handle_signal(&self, signal: TerminationSignal) {
        self.terminate(signal.exit_reason(), None);
        self.inner.chain.forward(signal);
    }

    /// Termination protocol for a panic; never blocks on a held lock
    pub fn handle_panic(&self, details: &str) -> bool {
        self.protocol(ExitReason::UncaughtPanic, Some(details), true, false)
    }

    /// Push a frame for `path` and reset the latch; returns the resolved path
    pub fn enter(&self, path: impl AsRef<Path>) -> PathBuf {
        let mut state = self.state();
        let resolved = state.stack.push(path).path().to_path_buf();
        state.exited = false;
        debug!(path = %resolved.display(), depth = state.stack.depth(), "entered frame");
        resolved
    }

    /// Pop the innermost frame and reset the latch.
    ///
    /// The root frame is never popped; returns `false` in that case.
    pub fn leave(&self) -> bool {
        let mut state = self.state();
        state.exited = false;
        match state.stack.pop() {
            Some(frame) => {
                debug!(path = %frame.path().display(), "left frame");
                true
            }
            None => {
                warn!("refusing to pop the root frame");
                false
            }
        }
    }

    /// Run `body` as a nested script invocation at `path`.
    ///
    /// The frame is popped even when `body` fails or panics.
    pub fn nested<T, F>(&self, path: impl AsRef<Path>, body: F) -> Result<T>
    where
        F: FnOnce(&Script) -> anyhow::Result<T>,
    {
        let path = path.as_ref();
        let resolved = self.state().stack.resolve(path);
        self.write_frame_rule(&format!("Entering {}...", resolved.display()));

        let outcome = {
            let _frame = FrameGuard::enter(self, path);
            body(self)
        };

        self.write_frame_rule(&format!("Exiting {}...", resolved.display()));
        outcome.map_err(|source| Error::Subscript {
            path: resolved,
            source,
        })
    }

    /// Run an external script file as a nested invocation
    pub fn run_subscript<I, A>(&self, path: impl AsRef<Path>, args: I) -> Result<ExecResult>
    where
        I: IntoIterator<Item = A>,
        A: IntoArg,
    {
        let path = path.as_ref();
        let resolved = self.state().stack.resolve(path);
        if !resolved.is_file() {
            return Err(Error::Subscript {
                source: anyhow::anyhow!("{} does not exist", resolved.display()),
                path: resolved,
            });
        }
        // a bare file name would otherwise be looked up on PATH
        let program = if resolved.is_absolute() {
            resolved
        } else {
            Path::new(".").join(resolved)
        };
        let runner = Runner::new(program).with_args(args);
        self.nested(path, |script| {
            Ok(runner.run(script.console(), &RunOptions::default())?)
        })
    }

    fn write_frame_rule(&self, title: &str) {
        let console = self.console();
        console.write_empty_line();
        console.write_rule(title);
        console.write_empty_line();
    }
}

/// Pops its frame on drop
struct FrameGuard<'a> {
    script: &'a Script,
}

impl<'a> FrameGuard<'a> {
    fn enter(script: &'a Script, path: &Path) -> Self {
        script.enter(path);
        Self { script }
    }
}

impl Drop for FrameGuard<'_> {
    fn drop(&mut self) {
        self.script.leave();
    }
}

fn panic_details(info: &std::panic::PanicHookInfo<'_>) -> String {
    let payload = info.payload();
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "Box<dyn Any>".to_string());
    match info.location() {
        Some(location) => format!("{message} ({location})"),
        None => message,
    }
}

fn install_panic_hook(script: Script) {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        script.handle_panic(&panic_details(info));
        previous(info);
    }));
}

/// Builds a [`Script`] and installs its process-wide interceptors
pub struct ScriptBuilder {
    root: PathBuf,
    console: Option<Console>,
    notifier: Option<Box<dyn Notifier>>,
    actions: ExitActions,
    chain: SignalChain,
    log_file: Option<PathBuf>,
    flush_capacity: Option<usize>,
    handle_signals: bool,
    intercept_panics: bool,
}

impl ScriptBuilder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            console: None,
            notifier: None,
            actions: ExitActions::default(),
            chain: SignalChain::new(),
            log_file: None,
            flush_capacity: None,
            handle_signals: true,
            intercept_panics: true,
        }
    }

    pub fn console(mut self, console: Console) -> Self {
        self.console = Some(console);
        self
    }

    pub fn notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Some(Box::new(notifier));
        self
    }

    pub fn actions(mut self, actions: ExitActions) -> Self {
        self.actions = actions;
        self
    }

    /// Disposition a signal is forwarded to after the termination protocol
    pub fn previous_disposition(
        mut self,
        signal: TerminationSignal,
        disposition: PreviousDisposition,
    ) -> Self {
        self.chain = self.chain.with_previous(signal, disposition);
        self
    }

    pub fn log_file(mut self, path: impl Into<PathBuf>, flush_capacity: Option<usize>) -> Self {
        self.log_file = Some(path.into());
        self.flush_capacity = flush_capacity;
        self
    }

    pub fn handle_signals(mut self, enabled: bool) -> Self {
        self.handle_signals = enabled;
        self
    }

    pub fn intercept_panics(mut self, enabled: bool) -> Self {
        self.intercept_panics = enabled;
        self
    }

    /// Exit actions, log file and colors from configuration
    pub fn config(mut self, config: &MkConfig) -> Self {
        config.console.color.apply();
        self.actions = config.notifications.exit_actions();
        let name = Frame::new(&self.root).name();
        if let Some(path) = config.log.log_file_for(&name, &LocalTimestamp::now()) {
            self = self.log_file(path, Some(config.log.flush_capacity));
        }
        self
    }

    pub fn build(self) -> Result<Script> {
        let console = self.console.unwrap_or_else(Console::terminal);
        if let Some(path) = &self.log_file {
            ensure_parent_dir(path)?;
            console.set_log_file(path, self.flush_capacity)?;
        }

        let script = Script {
            inner: Arc::new(ScriptInner {
                console,
                state: Mutex::new(LifecycleState {
                    stack: ExecutionStack::new(&self.root),
                    exited: false,
                }),
                notifier: self
                    .notifier
                    .unwrap_or_else(|| Box::new(DesktopNotifier::new())),
                actions: self.actions,
                chain: self.chain,
            }),
        };

        if self.handle_signals {
            let handle = script.clone();
            signals::install(move |signal| {
                handle.handle_signal(signal);
                std::process::exit(1);
            })?;
        }
        if self.intercept_panics {
            install_panic_hook(script.clone());
        }

        info!(script = %script.display_path(), "script started");
        Ok(script)
    }
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent).map_err(|source| IoFailure::LogFileOpen {
                path: path.to_path_buf(),
                source,
            })?;
            Ok(())
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::MemoryBuffer;
    use crate::notification::{MemoryNotifier, NotificationSound};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn test_script(root: &str) -> (Script, MemoryBuffer, MemoryNotifier) {
        let (console, buffer) = Console::memory();
        let notifier = MemoryNotifier::new();
        let script = Script::builder(root)
            .console(console)
            .notifier(notifier.clone())
            .handle_signals(false)
            .intercept_panics(false)
            .build()
            .unwrap();
        (script, buffer, notifier)
    }

    fn banner_lines(buffer: &MemoryBuffer) -> Vec<String> {
        buffer
            .lines()
            .into_iter()
            .filter(|l| l.contains("Execution time"))
            .collect()
    }

    #[test]
    fn test_die_banner_and_notification() {
        let (script, buffer, notifier) = test_script("/work/release.sh");
        assert!(script.terminate(ExitReason::Died, Some("archive missing")));

        let banners = banner_lines(&buffer);
        assert_eq!(banners.len(), 1);
        assert!(banners[0].starts_with("[RELEASE] died. Execution time 0:00:"));
        assert!(banners[0].ends_with(", Details: archive missing"));

        let calls = notifier.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].title, "RELEASE died");
        assert_eq!(calls[0].subtitle.as_deref(), Some("archive missing"));
        assert!(calls[0].message.starts_with("Execution time "));
        assert_eq!(calls[0].sound, Some(NotificationSound::Error));
    }

    #[test]
    fn test_finished_is_silent() {
        let (script, buffer, notifier) = test_script("/work/release.sh");
        assert_eq!(script.complete(Ok(())), 0);
        assert!(banner_lines(&buffer).is_empty());
        assert!(notifier.calls().is_empty());
        assert!(script.has_exited());
    }

    #[test]
    fn test_error_outcome_dies_with_chain() {
        let (script, buffer, notifier) = test_script("/work/release.sh");
        let err = anyhow::anyhow!("exit 7").context("building ios");
        assert_eq!(script.complete(Err(err)), 1);

        let banners = banner_lines(&buffer);
        assert_eq!(banners.len(), 1);
        assert!(banners[0].ends_with("Details: building ios: exit 7"));
        assert_eq!(notifier.calls().len(), 1);
    }

    #[test]
    fn test_competing_triggers_fire_once() {
        let forwarded = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&forwarded);
        let (console, buffer) = Console::memory();
        let notifier = MemoryNotifier::new();
        let script = Script::builder("/work/release.sh")
            .console(console)
            .notifier(notifier.clone())
            .previous_disposition(
                TerminationSignal::Terminate,
                PreviousDisposition::Handler(Arc::new(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                })),
            )
            .handle_signals(false)
            .intercept_panics(false)
            .build()
            .unwrap();

        let signal_side = script.clone();
        let panic_side = script.clone();
        let t1 = std::thread::spawn(move || signal_side.handle_signal(TerminationSignal::Terminate));
        let t2 = std::thread::spawn(move || panic_side.handle_panic("boom"));
        t1.join().unwrap();
        t2.join().unwrap();
        script.terminate(ExitReason::Died, Some("late"));

        assert_eq!(banner_lines(&buffer).len(), 1);
        assert_eq!(notifier.calls().len(), 1);
        assert_eq!(forwarded.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panic_protocol_skips_when_state_is_held() {
        let (script, buffer, notifier) = test_script("/work/release.sh");
        let guard = script.state();
        assert!(!script.handle_panic("boom"));
        drop(guard);

        assert!(script.handle_panic("boom"));
        let banners = banner_lines(&buffer);
        assert_eq!(banners.len(), 1);
        assert!(banners[0].contains("is interrupted by uncaught exception"));
        assert_eq!(notifier.calls().len(), 1);
    }

    #[test]
    fn test_interrupt_message() {
        let (script, buffer, _notifier) = test_script("/work/release.sh");
        script.terminate(TerminationSignal::Interrupt.exit_reason(), None);
        let banners = banner_lines(&buffer);
        assert!(banners[0].starts_with("[RELEASE] is interrupted by user. Execution time"));
        assert!(!banners[0].contains("Details"));
    }

    #[test]
    fn test_nested_restores_parent_frame() {
        let (script, buffer, _notifier) = test_script("/work/release.sh");
        let name = script.display_path();
        let started = script.frame_started_at();

        let inner_name = script
            .nested("steps/archive.sh", |s| {
                assert_eq!(s.depth(), 2);
                assert_eq!(s.path(), PathBuf::from("/work/steps/archive.sh"));
                Ok(s.display_path())
            })
            .unwrap();

        assert_eq!(inner_name, "[RELEASE >> ARCHIVE]");
        assert_eq!(script.display_path(), name);
        assert_eq!(script.frame_started_at(), started);
        assert_eq!(script.depth(), 1);

        let text = buffer.contents();
        assert!(text.contains(" Entering /work/steps/archive.sh... "));
        assert!(text.contains(" Exiting /work/steps/archive.sh... "));
    }

    #[test]
    fn test_nested_frame_reports_its_own_termination() {
        let (script, buffer, notifier) = test_script("/work/release.sh");
        script
            .nested("child.sh", |s| {
                s.success(Some("child done"));
                assert!(s.has_exited());
                Ok(())
            })
            .unwrap();

        // latch is reset for the parent
        assert!(!script.has_exited());
        let banners = banner_lines(&buffer);
        assert_eq!(banners.len(), 1);
        assert!(banners[0].starts_with("[RELEASE >> CHILD] completed."));
        assert!(notifier.calls().is_empty());

        script.terminate(ExitReason::Died, None);
        assert_eq!(banner_lines(&buffer).len(), 2);
    }

    #[test]
    fn test_nested_failure_pops_and_wraps() {
        let (script, _buffer, _notifier) = test_script("/work/release.sh");
        let err = script
            .nested::<(), _>("child.sh", |_| anyhow::bail!("broken"))
            .unwrap_err();
        assert!(matches!(err, Error::Subscript { .. }));
        assert!(err.to_string().contains("Unable to run subscript [/work/child.sh]: broken"));
        assert_eq!(script.depth(), 1);
    }

    #[test]
    fn test_nested_panic_pops_frame() {
        let (script, _buffer, _notifier) = test_script("/work/release.sh");
        let inner = script.clone();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = inner.nested::<(), _>("child.sh", |_| panic!("boom"));
        }));
        assert!(result.is_err());
        assert_eq!(script.depth(), 1);
    }

    #[test]
    fn test_leave_refuses_root() {
        let (script, _buffer, _notifier) = test_script("/work/release.sh");
        assert!(!script.leave());
        script.enter("a.sh");
        assert!(script.is_nested());
        assert!(script.leave());
        assert!(!script.is_nested());
    }

    #[cfg(unix)]
    #[test]
    fn test_run_subscript() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let root = temp.path().join("release.sh");
        let child = temp.path().join("step.sh");
        std::fs::write(&child, "#!/bin/sh\necho \"step $1\"\n").unwrap();
        std::fs::set_permissions(&child, std::fs::Permissions::from_mode(0o755)).unwrap();

        let (console, buffer) = Console::memory();
        let script = Script::builder(&root)
            .console(console)
            .notifier(MemoryNotifier::new())
            .handle_signals(false)
            .intercept_panics(false)
            .build()
            .unwrap();

        let result = script.run_subscript("step.sh", ["one"]).unwrap();
        assert_eq!(result.output, "step one");
        assert!(buffer.contents().contains("Entering "));
        assert_eq!(script.depth(), 1);

        let err = script.run_subscript("missing.sh", Vec::<String>::new()).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_builder_attaches_log_file() {
        let temp = TempDir::new().unwrap();
        let log = temp.path().join("logs/run.log");
        let (console, _buffer) = Console::memory();
        let script = Script::builder("/work/release.sh")
            .console(console)
            .notifier(MemoryNotifier::new())
            .log_file(&log, Some(100))
            .handle_signals(false)
            .intercept_panics(false)
            .build()
            .unwrap();

        script.console().write("hello");
        script.terminate(ExitReason::Died, Some("x"));
        let content = std::fs::read_to_string(&log).unwrap();
        assert!(content.starts_with("hello\n"));
        assert!(content.contains("[RELEASE] died."));
    }

    #[test]
    fn test_config_without_notifications() {
        let mut config = MkConfig::default();
        config.notifications.enabled = false;
        let (console, buffer) = Console::memory();
        let notifier = MemoryNotifier::new();
        let script = Script::builder("/work/release.sh")
            .config(&config)
            .console(console)
            .notifier(notifier.clone())
            .handle_signals(false)
            .intercept_panics(false)
            .build()
            .unwrap();

        script.terminate(ExitReason::Died, None);
        assert_eq!(banner_lines(&buffer).len(), 1);
        assert!(notifier.calls().is_empty());
    }
}
