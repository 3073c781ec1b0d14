//! Subscriber setup: console, daily rolling file, run-event channel.

use langshift_execution::{RunEvent, RunEventLayer};
use std::path::Path;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;
use tracing_subscriber::{EnvFilter, Layer, fmt};

const LOG_FILE_PREFIX: &str = "langshift.log";

/// Keeps the file writer flushing until dropped.
pub struct Logging {
    _file_guard: Option<WorkerGuard>,
    run_events: Option<UnboundedReceiver<RunEvent>>,
}

impl Logging {
    /// Receiver of `langshift::run` events; `None` after the first call.
    pub fn take_run_events(&mut self) -> Option<UnboundedReceiver<RunEvent>> {
        self.run_events.take()
    }
}

fn filter(verbose: bool) -> EnvFilter {
    if verbose {
        return EnvFilter::new("info,langshift=debug");
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs the global subscriber.
///
/// Console output goes to stderr so commands can print JSON on stdout. When
/// `logs_dir` is given, JSON lines are also written to a daily rolling file there.
pub fn init(verbose: bool, logs_dir: Option<&Path>) -> Logging {
    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(filter(verbose));

    let file_writer = logs_dir.and_then(|dir| match std::fs::create_dir_all(dir) {
        Ok(()) => Some(tracing_appender::non_blocking(
            tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX),
        )),
        Err(e) => {
            eprintln!("warning: file logging disabled, cannot create {}: {e}", dir.display());
            None
        }
    });
    let (file_layer, file_guard) = match file_writer {
        Some((writer, guard)) => (
            Some(
                fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_filter(filter(true)),
            ),
            Some(guard),
        ),
        None => (None, None),
    };

    let (run_layer, run_events) = RunEventLayer::channel();

    if let Err(e) = tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .with(run_layer)
        .try_init()
    {
        eprintln!("warning: logging already initialized: {e}");
    }

    Logging {
        _file_guard: file_guard,
        run_events: Some(run_events),
    }
}
