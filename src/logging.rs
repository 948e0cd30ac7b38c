use log::{debug, error, info, log_enabled, warn, Level};
use std::sync::{Arc, Mutex};

/// Initializes the logger with the `env_logger` crate.
///
/// The level is taken from `RUST_LOG`; without it only warnings and errors
/// are shown. Calling this more than once is harmless.
pub fn init_logger() {
    init_logger_with_default("warn");
}

/// Initializes `env_logger`, falling back to `default_filter` when
/// `RUST_LOG` is not set.
pub fn init_logger_with_default(default_filter: &str) {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .try_init();
}

/// Logs an error message.
pub fn log_error(message: &str) {
    if log_enabled!(Level::Error) {
        error!("{message}");
    }
}

/// Logs a warning message.
pub fn log_warn(message: &str) {
    if log_enabled!(Level::Warn) {
        warn!("{message}");
    }
}

/// Logs an informational message.
pub fn log_info(message: &str) {
    if log_enabled!(Level::Info) {
        info!("{message}");
    }
}

/// Logs a debug message.
pub fn log_debug(message: &str) {
    if log_enabled!(Level::Debug) {
        debug!("{message}");
    }
}

/// A human-readable protocol trace line.
///
/// `highlighted` marks protocol milestones (requests recognised, replies
/// sent); plain events are diagnostics such as the per-line hex dump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEvent {
    pub message: String,
    pub highlighted: bool,
}

impl TraceEvent {
    pub fn plain(message: impl Into<String>) -> Self {
        TraceEvent {
            message: message.into(),
            highlighted: false,
        }
    }

    pub fn highlighted(message: impl Into<String>) -> Self {
        TraceEvent {
            message: message.into(),
            highlighted: true,
        }
    }
}

/// Receiver for protocol trace events. Fire-and-forget.
pub trait TraceSink: Send {
    fn record(&mut self, message: &str, highlighted: bool);

    fn record_event(&mut self, event: &TraceEvent) {
        self.record(&event.message, event.highlighted);
    }
}

/// Forwards trace events to the `log` facade.
///
/// Highlighted events are logged at `info`, plain ones at `debug`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl TraceSink for LogSink {
    fn record(&mut self, message: &str, highlighted: bool) {
        if highlighted {
            log_info(message);
        } else {
            log_debug(message);
        }
    }
}

/// Collects trace events in memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub events: Vec<TraceEvent>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages of all highlighted events, in order.
    pub fn highlighted(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter(|e| e.highlighted)
            .map(|e| e.message.as_str())
            .collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.events.iter().any(|e| e.message.contains(needle))
    }
}

impl TraceSink for MemorySink {
    fn record(&mut self, message: &str, highlighted: bool) {
        self.events.push(TraceEvent {
            message: message.to_string(),
            highlighted,
        });
    }
}

/// Lets a caller keep reading a sink that a running session owns.
impl<T: TraceSink> TraceSink for Arc<Mutex<T>> {
    fn record(&mut self, message: &str, highlighted: bool) {
        self.lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .record(message, highlighted);
    }
}
