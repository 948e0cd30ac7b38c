//! # Utility Modules
//!
//! Small helpers shared by the protocol core, currently the hex and
//! printable-ASCII renderings used in traces.

pub mod hex;

pub use hex::{format_hex_spaced, hex_pair, printable_ascii, printable_byte};
