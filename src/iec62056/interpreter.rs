//! # Protocol Interpreter
//!
//! This module holds the device-side state machine of the simulated meter.
//! It consumes raw inbound chunks and returns the ordered list of actions the
//! transport driver has to carry out: trace events, writes, flushes and a
//! deferred baud switch. The interpreter itself never touches the transport
//! and never sleeps, so the settle delay after the ACK is modelled as
//! [`Action::ScheduleBaudSwitch`] and executed by the driver's timer.
//!
//! ## Session flow
//!
//! ```text
//!  AwaitingHandshake --(ACK 050 line)--> SwitchPending --(settle elapsed)--> Switched9600
//!        |  ^                                 |  ^                              |  ^
//!        +--+ "/?!" line                      +--+ "/?!" line                   +--+ "/?!" line, OBIS request
//! ```
//!
//! The identification request is answered in every state. The ACK is
//! one-shot. The OBIS request is answered only once the driver has reported
//! the end of the settle delay through [`Interpreter::finish_baud_switch`].

use crate::constants::{
    BAUD_SWITCH_HEX_PREFIX, BAUD_SWITCH_SETTLE_DELAY, BAUD_SWITCH_TRIGGER,
    IDENTIFICATION_TRIGGER, RAW_BUFFER_HIGH_WATER, RAW_BUFFER_RETAIN, SWITCHED_BAUD_RATE,
};
use crate::iec62056::line::{Line, LineFramer};
use crate::iec62056::response::Response;
use crate::iec62056::scanner::{contains_obis_frame, FrameScanner};
use crate::logging::TraceEvent;
use crate::util::hex::{format_hex_spaced, printable_ascii};
use bytes::{Buf, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Baud phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolState {
    AwaitingHandshake,
    /// ACK sent, settle delay still running
    SwitchPending,
    Switched9600,
}

/// What happens to the raw buffer between processing passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferPolicy {
    /// Keep bytes across passes; above the high-water mark keep only the tail.
    #[default]
    Retain,
    /// Clear the buffer and the scanner cursor at the end of every pass, so a
    /// request split over two reads is never answered.
    ClearEachPass,
}

/// Work for the transport driver, in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Trace(TraceEvent),
    Write(Bytes),
    Flush,
    /// Change the port speed once `settle` has elapsed.
    ScheduleBaudSwitch { baud_rate: u32, settle: Duration },
}

/// Tunables of the interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterpreterConfig {
    pub switch_baud_rate: u32,
    pub settle_delay: Duration,
    pub buffer_policy: BufferPolicy,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        InterpreterConfig {
            switch_baud_rate: SWITCHED_BAUD_RATE,
            settle_delay: BAUD_SWITCH_SETTLE_DELAY,
            buffer_policy: BufferPolicy::default(),
        }
    }
}

/// Counters for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterpreterStats {
    pub bytes_received: u64,
    pub lines_received: u64,
    pub identifications_sent: u64,
    pub acks_sent: u64,
    pub obis_responses_sent: u64,
    pub unrecognized_lines: u64,
    pub bytes_dropped: u64,
    pub buffer_trims: u64,
}

/// Per-connection state. Created when the port opens, dropped when it closes.
#[derive(Debug, Clone)]
pub struct Session {
    /// Set once, when the ACK is emitted; never reset.
    pub ack_sent: bool,
    /// Set once the settle delay has elapsed, whether or not the port
    /// accepted the new speed; never reset.
    pub bauded9600: bool,
    /// Kept for the retention policy and diagnostics; detection runs on the scanner.
    pub raw_buffer: BytesMut,
    pub framer: LineFramer,
    pub scanner: FrameScanner,
}

impl Default for Session {
    fn default() -> Self {
        Session {
            ack_sent: false,
            bauded9600: false,
            raw_buffer: BytesMut::with_capacity(RAW_BUFFER_HIGH_WATER),
            framer: LineFramer::new(),
            scanner: FrameScanner::obis_request(),
        }
    }
}

/// The meter-side protocol state machine.
#[derive(Debug, Clone, Default)]
pub struct Interpreter {
    session: Session,
    config: InterpreterConfig,
    stats: InterpreterStats,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: InterpreterConfig) -> Self {
        Interpreter {
            session: Session::default(),
            config,
            stats: InterpreterStats::default(),
        }
    }

    pub fn state(&self) -> ProtocolState {
        match (self.session.ack_sent, self.session.bauded9600) {
            (_, true) => ProtocolState::Switched9600,
            (true, false) => ProtocolState::SwitchPending,
            (false, false) => ProtocolState::AwaitingHandshake,
        }
    }

    /// Marks the end of the settle delay that follows the ACK.
    ///
    /// Called by the driver after it has tried the baud change, regardless of
    /// the outcome. Does nothing unless an ACK has been sent.
    pub fn finish_baud_switch(&mut self) {
        if self.session.ack_sent {
            self.session.bauded9600 = true;
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn stats(&self) -> InterpreterStats {
        self.stats
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    /// Processes one inbound chunk and returns the actions it triggers.
    ///
    /// Once the OBIS request has been answered, the rest of the chunk is
    /// dropped.
    pub fn process(&mut self, chunk: &[u8]) -> Vec<Action> {
        let mut actions = Vec::new();

        for (idx, &byte) in chunk.iter().enumerate() {
            self.stats.bytes_received += 1;
            self.session.raw_buffer.extend_from_slice(&[byte]);
            let frame_complete = self.session.scanner.push(byte);

            if let Some(line) = self.session.framer.push(byte) {
                self.handle_line(&line, &mut actions);
            }

            if frame_complete && !self.session.bauded9600 && self.session.ack_sent {
                actions.push(Action::Trace(TraceEvent::plain(
                    "OBIS request ignored, baud switch still settling",
                )));
            }

            if frame_complete && self.session.bauded9600 {
                self.answer_obis_request(&mut actions);

                let dropped = chunk.len() - idx - 1;
                if dropped > 0 {
                    self.stats.bytes_dropped += dropped as u64;
                    actions.push(Action::Trace(TraceEvent::plain(format!(
                        "{dropped} byte(s) after the OBIS request dropped"
                    ))));
                }
                return actions;
            }

            self.trim_raw_buffer();
        }

        if self.config.buffer_policy == BufferPolicy::ClearEachPass {
            self.session.raw_buffer.clear();
            self.session.scanner.reset();
        }

        actions
    }

    fn handle_line(&mut self, line: &Line, actions: &mut Vec<Action>) {
        self.stats.lines_received += 1;
        actions.push(Action::Trace(TraceEvent::plain(format!("RX (HEX): {}", line.hex))));
        actions.push(Action::Trace(TraceEvent::plain(format!(
            "RX (ASCII): {}",
            line.ascii
        ))));

        let mut recognized = false;

        if line.ascii.contains(IDENTIFICATION_TRIGGER) {
            recognized = true;
            actions.push(Action::Trace(TraceEvent::highlighted(
                "-> Identification request received",
            )));
            self.emit(Response::Identification, actions);
            self.stats.identifications_sent += 1;
        }

        if !self.session.ack_sent
            && line.ascii.contains(BAUD_SWITCH_TRIGGER)
            && line.hex.starts_with(BAUD_SWITCH_HEX_PREFIX)
        {
            recognized = true;
            actions.push(Action::Trace(TraceEvent::highlighted(format!(
                "-> ACK 050 received, switching to {} baud",
                self.config.switch_baud_rate
            ))));
            self.emit(Response::Acknowledge, actions);
            actions.push(Action::Flush);
            actions.push(Action::ScheduleBaudSwitch {
                baud_rate: self.config.switch_baud_rate,
                settle: self.config.settle_delay,
            });
            self.session.ack_sent = true;
            self.stats.acks_sent += 1;
        }

        if !recognized {
            self.stats.unrecognized_lines += 1;
            actions.push(Action::Trace(TraceEvent::plain("Unrecognized line ignored")));
        }
    }

    fn answer_obis_request(&mut self, actions: &mut Vec<Action>) {
        debug_assert!(contains_obis_frame(&self.session.raw_buffer));
        actions.push(Action::Trace(TraceEvent::highlighted(
            "-> OBIS 1.8.0 request received",
        )));
        self.emit(Response::ObisReading, actions);
        self.stats.obis_responses_sent += 1;

        self.session.raw_buffer.clear();
        self.session.scanner.reset();
        self.session.framer.reset();
    }

    fn emit(&self, response: Response, actions: &mut Vec<Action>) {
        let bytes = response.to_bytes();
        actions.push(Action::Trace(TraceEvent::plain(format!(
            "TX (HEX): {}",
            format_hex_spaced(&bytes)
        ))));
        actions.push(Action::Trace(TraceEvent::plain(format!(
            "TX (ASCII): {}",
            printable_ascii(&bytes)
        ))));
        actions.push(Action::Write(bytes));
        actions.push(Action::Trace(TraceEvent::highlighted(response.sent_message())));
    }

    fn trim_raw_buffer(&mut self) {
        let len = self.session.raw_buffer.len();
        if len > RAW_BUFFER_HIGH_WATER {
            self.session.raw_buffer.advance(len - RAW_BUFFER_RETAIN);
            self.stats.buffer_trims += 1;
        }
    }
}

/// Concatenates every `Write` action, for callers that only care about the
/// bytes put on the wire.
pub fn written_bytes(actions: &[Action]) -> Vec<u8> {
    actions
        .iter()
        .filter_map(|a| match a {
            Action::Write(bytes) => Some(&bytes[..]),
            _ => None,
        })
        .flatten()
        .copied()
        .collect()
}
