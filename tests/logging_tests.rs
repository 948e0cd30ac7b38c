//! Unit tests for the logging functionality in the `iec62056-sim` crate.

use iec62056_sim::logging::{
    init_logger, init_logger_with_default, log_debug, log_error, log_info, log_warn,
};
use iec62056_sim::{LogSink, MemorySink, TraceEvent, TraceSink};

/// Tests that the logging helpers do not panic after init.
#[test]
fn test_logging() {
    init_logger();
    log_error("This is an error message");
    log_warn("This is a warning message");
    log_info("This is an info message");
    log_debug("This is a debug message");
}

/// Tests that initializing twice is harmless.
#[test]
fn test_init_logger_twice() {
    init_logger_with_default("debug");
    init_logger();
}

/// Tests that trace events reach a sink unchanged.
#[test]
fn test_trace_sinks() {
    let event = TraceEvent::highlighted("<- ACK sent");

    let mut memory = MemorySink::new();
    memory.record_event(&event);
    memory.record_event(&TraceEvent::plain("RX (HEX): 06"));
    assert_eq!(memory.events[0], event);
    assert_eq!(memory.highlighted(), vec!["<- ACK sent"]);

    let mut log_sink = LogSink;
    log_sink.record_event(&event);
}
