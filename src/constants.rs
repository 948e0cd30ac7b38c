//! IEC 62056-21 Protocol Constants
//!
//! This module defines the control bytes, literal telegrams and timing values
//! used by the simulated meter. None of them are configurable at runtime; they
//! describe the one meter profile the simulator answers as.

use std::time::Duration;

/// Start of header
pub const SOH: u8 = 0x01;

/// Start of text
pub const STX: u8 = 0x02;

/// End of text
pub const ETX: u8 = 0x03;

/// Acknowledge
pub const ACK: u8 = 0x06;

/// Carriage return
pub const CR: u8 = 0x0D;

/// Line feed, terminates a line unit
pub const LF: u8 = 0x0A;

// ----------------------------------------------------------------------------
// Handshake triggers
// ----------------------------------------------------------------------------

/// Substring of a line's ASCII projection that requests identification
pub const IDENTIFICATION_TRIGGER: &str = "/?!";

/// Substring of a line's ASCII projection that proposes the baud switch
pub const BAUD_SWITCH_TRIGGER: &str = "050";

/// Required prefix of the line's HEX projection for the baud switch
pub const BAUD_SWITCH_HEX_PREFIX: &str = "06";

// ----------------------------------------------------------------------------
// Telegrams
// ----------------------------------------------------------------------------

/// Identification message sent in reply to `/?!`
pub const IDENTIFICATION_RESPONSE: &[u8] = b"/SAT6EM72000656621\r\n";

/// OBIS 1.8.0 read request: `SOH 'R' '2' STX "1.8.0()" ETX`
pub const OBIS_REQUEST_FRAME: &[u8] = &[
    SOH, b'R', b'2', STX, b'1', b'.', b'8', b'.', b'0', b'(', b')', ETX,
];

/// Data set carried between STX and ETX in the OBIS response
pub const OBIS_RESPONSE_DATA: &[u8] = b"1.8.0(000123.456*kWh)";

// ----------------------------------------------------------------------------
// Serial line parameters
// ----------------------------------------------------------------------------

/// Baud rate the port is opened with
pub const INITIAL_BAUD_RATE: u32 = 300;

/// Baud rate after the mode C switch
pub const SWITCHED_BAUD_RATE: u32 = 9600;

/// Device-side settle time between the ACK and the baud change
pub const BAUD_SWITCH_SETTLE_DELAY: Duration = Duration::from_millis(200);

// ----------------------------------------------------------------------------
// Raw buffer hygiene
// ----------------------------------------------------------------------------

/// Raw buffer size above which it is trimmed
pub const RAW_BUFFER_HIGH_WATER: usize = 1024;

/// Number of trailing bytes kept when the raw buffer is trimmed
pub const RAW_BUFFER_RETAIN: usize = 512;

/// Default read size for one inbound chunk
pub const DEFAULT_READ_CHUNK_SIZE: usize = 256;
