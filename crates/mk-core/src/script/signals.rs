//! Termination signal interception and chaining
//!
//! Termination signals are blocked on the thread building the [`Script`]
//! and received synchronously by a dedicated waiter thread, so the handler
//! runs as ordinary code rather than in async-signal context. After the
//! termination protocol the signal is forwarded to whatever disposition was
//! registered before mk took it over.
//!
//! [`Script`]: super::Script

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::exit::ExitReason;

/// Signals that terminate a script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminationSignal {
    /// SIGINT
    Interrupt,
    /// SIGTERM
    Terminate,
}

impl TerminationSignal {
    pub const ALL: [TerminationSignal; 2] = [Self::Interrupt, Self::Terminate];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Interrupt => "SIGINT",
            Self::Terminate => "SIGTERM",
        }
    }

    pub fn exit_reason(&self) -> ExitReason {
        match self {
            Self::Interrupt => ExitReason::InterruptedByUser,
            Self::Terminate => ExitReason::Terminated,
        }
    }

    #[cfg(unix)]
    fn to_nix(self) -> nix::sys::signal::Signal {
        use nix::sys::signal::Signal;
        match self {
            Self::Interrupt => Signal::SIGINT,
            Self::Terminate => Signal::SIGTERM,
        }
    }

    #[cfg(unix)]
    fn from_nix(signal: nix::sys::signal::Signal) -> Option<Self> {
        use nix::sys::signal::Signal;
        match signal {
            Signal::SIGINT => Some(Self::Interrupt),
            Signal::SIGTERM => Some(Self::Terminate),
            _ => None,
        }
    }
}

impl fmt::Display for TerminationSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Callback registered for a signal before mk
pub type SignalCallback = Arc<dyn Fn(TerminationSignal) + Send + Sync>;

/// What a signal did before mk intercepted it
#[derive(Clone, Default)]
pub enum PreviousDisposition {
    /// Re-raised with the default action, normally terminating the process
    #[default]
    Default,
    Ignore,
    Handler(SignalCallback),
}

impl fmt::Debug for PreviousDisposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("Default"),
            Self::Ignore => f.write_str("Ignore"),
            Self::Handler(_) => f.write_str("Handler(..)"),
        }
    }
}

/// Previous dispositions, consulted after the termination protocol ran
#[derive(Debug, Clone, Default)]
pub struct SignalChain {
    previous: HashMap<TerminationSignal, PreviousDisposition>,
}

impl SignalChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_previous(mut self, signal: TerminationSignal, disposition: PreviousDisposition) -> Self {
        self.previous.insert(signal, disposition);
        self
    }

    pub fn previous(&self, signal: TerminationSignal) -> PreviousDisposition {
        self.previous.get(&signal).cloned().unwrap_or_default()
    }

    /// Hand `signal` to its previous disposition
    pub fn forward(&self, signal: TerminationSignal) {
        match self.previous(signal) {
            PreviousDisposition::Handler(callback) => callback(signal),
            PreviousDisposition::Ignore => {}
            PreviousDisposition::Default => reraise_default(signal),
        }
    }
}

/// Deliver `signal` to the calling thread with its default action
#[cfg(unix)]
fn reraise_default(signal: TerminationSignal) {
    use nix::sys::signal::{raise, SigSet};
    use tracing::warn;

    let mut set = SigSet::empty();
    set.add(signal.to_nix());
    if let Err(e) = set.thread_unblock() {
        warn!(signal = %signal, error = %e, "unable to unblock signal for re-raise");
        return;
    }
    if let Err(e) = raise(signal.to_nix()) {
        warn!(signal = %signal, error = %e, "unable to re-raise signal");
    }
}

#[cfg(not(unix))]
fn reraise_default(_signal: TerminationSignal) {}

#[cfg(unix)]
fn termination_set() -> nix::sys::signal::SigSet {
    let mut set = nix::sys::signal::SigSet::empty();
    for signal in TerminationSignal::ALL {
        set.add(signal.to_nix());
    }
    set
}

/// Block termination signals on the calling thread
#[cfg(unix)]
pub(crate) fn block() -> crate::Result<()> {
    termination_set()
        .thread_block()
        .map_err(|e| crate::Error::other(format!("unable to block termination signals: {e}")))
}

/// Block termination signals on the calling thread and hand each one to
/// `handler` on a dedicated waiter thread.
///
/// Must run before any other thread is spawned so every thread inherits the
/// blocked mask. Child processes get a clean mask from `std::process`.
#[cfg(unix)]
pub(crate) fn install(handler: impl Fn(TerminationSignal) + Send + 'static) -> crate::Result<()> {
    use tracing::{debug, warn};

    block()?;
    let set = termination_set();

    std::thread::Builder::new()
        .name("mk-signals".to_string())
        .spawn(move || loop {
            match set.wait() {
                Ok(signal) => {
                    if let Some(signal) = TerminationSignal::from_nix(signal) {
                        debug!(signal = %signal, "termination signal received");
                        handler(signal);
                    }
                }
                Err(e) => {
                    warn!(error = %e, "signal wait failed, signal interception stopped");
                    break;
                }
            }
        })?;
    Ok(())
}

#[cfg(not(unix))]
pub(crate) fn install(_handler: impl Fn(TerminationSignal) + Send + 'static) -> crate::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_reasons() {
        assert_eq!(
            TerminationSignal::Interrupt.exit_reason(),
            ExitReason::InterruptedByUser
        );
        assert_eq!(
            TerminationSignal::Terminate.exit_reason(),
            ExitReason::Terminated
        );
        assert_eq!(TerminationSignal::Terminate.to_string(), "SIGTERM");
    }

    #[test]
    fn test_forward_calls_previous_handler() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&seen);
        let chain = SignalChain::new().with_previous(
            TerminationSignal::Terminate,
            PreviousDisposition::Handler(Arc::new(move |s| recorder.lock().unwrap().push(s))),
        );

        chain.forward(TerminationSignal::Terminate);
        assert_eq!(*seen.lock().unwrap(), vec![TerminationSignal::Terminate]);
    }

    #[test]
    fn test_ignore_does_nothing() {
        let chain = SignalChain::new()
            .with_previous(TerminationSignal::Interrupt, PreviousDisposition::Ignore);
        chain.forward(TerminationSignal::Interrupt);
    }

    #[test]
    fn test_unregistered_is_default() {
        let chain = SignalChain::new();
        assert!(matches!(
            chain.previous(TerminationSignal::Interrupt),
            PreviousDisposition::Default
        ));
    }
}
