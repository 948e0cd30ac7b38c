//! # Meter Simulator
//!
//! This module provides the MeterSimulator struct, which drives one protocol
//! session over one open transport. It reads inbound chunks, hands them to the
//! [`Interpreter`], and carries out the returned actions in order.
//!
//! The settle delay between the ACK and the baud change runs as a timer
//! inside the read loop, so bytes arriving during the settle window are still
//! processed. Closing the session cancels a pending switch.

use crate::constants::{
    BAUD_SWITCH_SETTLE_DELAY, DEFAULT_READ_CHUNK_SIZE, INITIAL_BAUD_RATE, SWITCHED_BAUD_RATE,
};
use crate::error::MeterSimError;
use crate::iec62056::interpreter::{
    Action, BufferPolicy, Interpreter, InterpreterConfig, InterpreterStats, ProtocolState,
};
use crate::iec62056::serial::MeterPort;
use crate::logging::{log_warn, TraceSink};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::Instant;

/// Runtime settings of a simulator session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Baud rate the port starts at; informational for the session trace
    pub initial_baud_rate: u32,
    /// Baud rate after the ACK
    pub switch_baud_rate: u32,
    /// Delay between the ACK and the baud change, in milliseconds
    pub settle_delay_ms: u64,
    pub buffer_policy: BufferPolicy,
    /// Maximum bytes taken from the port per read
    pub read_chunk_size: usize,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        SimulatorConfig {
            initial_baud_rate: INITIAL_BAUD_RATE,
            switch_baud_rate: SWITCHED_BAUD_RATE,
            settle_delay_ms: BAUD_SWITCH_SETTLE_DELAY.as_millis() as u64,
            buffer_policy: BufferPolicy::Retain,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
        }
    }
}

impl SimulatorConfig {
    /// Loads a JSON config; missing fields take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, MeterSimError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| MeterSimError::ConfigError(format!("{}: {e}", path.display())))?;
        let config: SimulatorConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), MeterSimError> {
        if self.switch_baud_rate == 0 {
            return Err(MeterSimError::ConfigError(
                "switch_baud_rate must be non-zero".into(),
            ));
        }
        if self.read_chunk_size == 0 {
            return Err(MeterSimError::ConfigError(
                "read_chunk_size must be non-zero".into(),
            ));
        }
        Ok(())
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn interpreter_config(&self) -> InterpreterConfig {
        InterpreterConfig {
            switch_baud_rate: self.switch_baud_rate,
            settle_delay: self.settle_delay(),
            buffer_policy: self.buffer_policy,
        }
    }
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The shutdown future resolved
    Closed,
    /// The transport reported end of stream
    Eof,
}

/// Outcome of a finished session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub end: SessionEnd,
    pub state: ProtocolState,
    pub stats: InterpreterStats,
    /// Port speed when the session ended, if the port could report it
    pub final_baud_rate: Option<u32>,
    pub baud_switch_failed: bool,
    pub baud_switch_cancelled: bool,
}

#[derive(Debug, Clone, Copy)]
struct PendingSwitch {
    baud_rate: u32,
    deadline: Instant,
}

/// Drives one protocol session over `port`.
pub struct MeterSimulator<P: MeterPort, S: TraceSink> {
    port: P,
    interpreter: Interpreter,
    sink: S,
    config: SimulatorConfig,
    pending_switch: Option<PendingSwitch>,
    baud_switch_failed: bool,
}

impl<P: MeterPort, S: TraceSink> MeterSimulator<P, S> {
    /// Starts a fresh session on an already-open port.
    pub fn new(port: P, config: SimulatorConfig, sink: S) -> Self {
        let interpreter = Interpreter::with_config(config.interpreter_config());
        MeterSimulator {
            port,
            interpreter,
            sink,
            config,
            pending_switch: None,
            baud_switch_failed: false,
        }
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    /// True while the post-ACK settle timer is running.
    pub fn baud_switch_pending(&self) -> bool {
        self.pending_switch.is_some()
    }

    /// Serves the port until `shutdown` resolves or the port reaches EOF.
    pub async fn run<F>(mut self, shutdown: F) -> Result<SessionSummary, MeterSimError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut buf = vec![0u8; self.config.read_chunk_size];

        self.sink.record(
            &format!(
                "Connection established ({}bps)",
                self.config.initial_baud_rate
            ),
            true,
        );

        let end = loop {
            let switch_deadline = self.pending_switch.map(|p| p.deadline);

            tokio::select! {
                biased;

                _ = &mut shutdown => break SessionEnd::Closed,

                _ = tokio::time::sleep_until(switch_deadline.unwrap_or_else(Instant::now)),
                    if switch_deadline.is_some() =>
                {
                    self.complete_baud_switch().await;
                }

                read = self.port.read(&mut buf) => {
                    let n = read.map_err(|e| MeterSimError::SerialPortError(e.to_string()))?;
                    if n == 0 {
                        break SessionEnd::Eof;
                    }
                    self.handle_chunk(&buf[..n]).await?;
                }
            }
        };

        Ok(self.close(end))
    }

    /// Feeds one inbound chunk through the interpreter and executes the
    /// resulting actions.
    pub async fn handle_chunk(&mut self, chunk: &[u8]) -> Result<(), MeterSimError> {
        let actions = self.interpreter.process(chunk);
        for action in actions {
            self.execute(action).await?;
        }
        Ok(())
    }

    async fn execute(&mut self, action: Action) -> Result<(), MeterSimError> {
        match action {
            Action::Trace(event) => self.sink.record_event(&event),
            Action::Write(bytes) => self
                .port
                .write_all(&bytes)
                .await
                .map_err(|e| MeterSimError::SerialPortError(e.to_string()))?,
            Action::Flush => self
                .port
                .flush()
                .await
                .map_err(|e| MeterSimError::SerialPortError(e.to_string()))?,
            Action::ScheduleBaudSwitch { baud_rate, settle } => {
                self.pending_switch = Some(PendingSwitch {
                    baud_rate,
                    deadline: Instant::now() + settle,
                });
            }
        }
        Ok(())
    }

    /// Applies the scheduled baud change and lets the interpreter answer
    /// readouts from then on. A failure is traced and the session stays at
    /// the current speed; the switch is not retried.
    pub async fn complete_baud_switch(&mut self) {
        let Some(pending) = self.pending_switch.take() else {
            return;
        };

        match self.port.reconfigure_baud_rate(pending.baud_rate).await {
            Ok(()) => self.sink.record(
                &format!("<- Baud rate set to {}", pending.baud_rate),
                true,
            ),
            Err(e) => {
                let err = MeterSimError::BaudReconfigureFailure {
                    baud_rate: pending.baud_rate,
                    reason: e.to_string(),
                };
                log_warn(&err.to_string());
                self.baud_switch_failed = true;
                self.sink
                    .record(&format!("Baud rate could not be changed: {err}"), false);
            }
        }
        self.interpreter.finish_baud_switch();
    }

    fn close(mut self, end: SessionEnd) -> SessionSummary {
        let baud_switch_cancelled = self.pending_switch.take().is_some();
        if baud_switch_cancelled {
            self.sink.record("Pending baud rate switch cancelled", false);
        }
        self.sink.record("Connection closed", false);

        SessionSummary {
            end,
            state: self.interpreter.state(),
            stats: self.interpreter.stats(),
            final_baud_rate: self.port.current_baud_rate().ok(),
            baud_switch_failed: self.baud_switch_failed,
            baud_switch_cancelled,
        }
    }
}
