//! mk - Run external build tools with logged, notified output

mod cli;
mod exit_codes;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use cli::{output, Cli};

fn main() {
    let cli = Cli::parse();

    // Termination signals are received by the script's waiter thread, so
    // they must be blocked before the log appender spawns its worker.
    if cli.intercepts_signals() {
        if let Err(e) = mk_core::script::block_termination_signals() {
            output::warning(&format!("signals will not be intercepted: {e}"));
        }
    }

    let guard = init_tracing();
    let code = match cli.execute() {
        Ok(code) => code,
        Err(e) => {
            output::error(&format!("{e:#}"));
            exit_codes::for_error(&e)
        }
    };

    drop(guard);
    std::process::exit(code)
}

/// Set up tracing with two layers:
/// - Console: controlled by RUST_LOG (default: warn)
/// - File: always debug-level JSON to ~/.mk/logs/
fn init_tracing() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    if let Some(log_dir) = log_directory() {
        let file_appender = tracing_appender::rolling::daily(&log_dir, "mk.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_filter(console_filter),
            )
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(non_blocking)
                    .with_target(true)
                    .with_filter(EnvFilter::new("debug")),
            )
            .init();

        return Some(guard);
    }

    // Fallback: console only
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .init();

    None
}

/// Returns the diagnostics directory, creating it if needed.
fn log_directory() -> Option<std::path::PathBuf> {
    let log_dir = dirs::home_dir()?.join(".mk").join("logs");
    std::fs::create_dir_all(&log_dir).ok()?;
    Some(log_dir)
}
