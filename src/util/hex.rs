//! # Hex and ASCII Projections
//!
//! Helpers that render raw serial bytes the way the simulator traces them:
//! uppercase, space-separated hex pairs and a printable-ASCII view where
//! every non-printable byte becomes `.`.
//!
//! ## Usage
//!
//! ```rust
//! use iec62056_sim::util::hex::{format_hex_spaced, printable_ascii};
//!
//! let data = [0x06, b'0', b'5', b'0', 0x0D, 0x0A];
//! assert_eq!(format_hex_spaced(&data), "06 30 35 30 0D 0A");
//! assert_eq!(printable_ascii(&data), ".050..");
//! ```

/// Placeholder used for bytes outside 0x20..=0x7E
pub const NON_PRINTABLE: u8 = b'.';

/// Uppercase two-digit hex for one byte.
pub fn hex_pair(byte: u8) -> String {
    hex::encode_upper([byte])
}

/// Formats data as "06 30 35 30" with spaces between bytes.
pub fn format_hex_spaced(data: &[u8]) -> String {
    data.iter().map(|b| hex_pair(*b)).collect::<Vec<_>>().join(" ")
}

/// True for bytes shown verbatim in the ASCII projection.
pub fn is_printable(byte: u8) -> bool {
    (0x20..=0x7E).contains(&byte)
}

/// Maps a byte to itself when printable, else to `.`.
pub fn printable_byte(byte: u8) -> u8 {
    if is_printable(byte) {
        byte
    } else {
        NON_PRINTABLE
    }
}

/// ASCII projection of a byte span.
pub fn printable_ascii(data: &[u8]) -> String {
    data.iter().map(|b| printable_byte(*b) as char).collect()
}
