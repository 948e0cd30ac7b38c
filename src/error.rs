//! # Simulator Error Handling
//!
//! This module defines the MeterSimError enum, which represents the different error
//! types that can occur in the iec62056-sim crate.
//!
//! Unrecognized input is not an error: lines that match none of the handshake
//! patterns are traced and otherwise ignored by the interpreter.

use thiserror::Error;

/// Represents the different error types that can occur in the simulator.
#[derive(Debug, Error)]
pub enum MeterSimError {
    /// Indicates the serial port could not be opened or used.
    #[error("Serial port error: {0}")]
    SerialPortError(String),

    /// Indicates the port refused the post-ACK baud change.
    #[error("Failed to set baud rate {baud_rate}: {reason}")]
    BaudReconfigureFailure { baud_rate: u32, reason: String },

    /// Indicates a block check character mismatch.
    #[error("Invalid BCC: expected 0x{expected:02X}, calculated 0x{calculated:02X}")]
    InvalidBcc { expected: u8, calculated: u8 },

    /// Indicates an invalid or unreadable simulator configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<tokio_serial::Error> for MeterSimError {
    fn from(err: tokio_serial::Error) -> Self {
        MeterSimError::SerialPortError(err.to_string())
    }
}

impl From<serde_json::Error> for MeterSimError {
    fn from(err: serde_json::Error) -> Self {
        MeterSimError::ConfigError(err.to_string())
    }
}
