//! # Block Check Character
//!
//! The BCC used by IEC 62056-21 readout telegrams is the XOR of every byte of
//! the block. For a response the block starts at STX and ends at ETX, both
//! included.

use crate::error::MeterSimError;

/// XOR-reduces `data` to a single byte. Empty input yields zero.
pub fn bcc(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, b| acc ^ b)
}

/// Checks a block followed by its BCC byte.
pub fn verify_bcc(block: &[u8], expected: u8) -> Result<(), MeterSimError> {
    let calculated = bcc(block);
    if calculated != expected {
        return Err(MeterSimError::InvalidBcc {
            expected,
            calculated,
        });
    }
    Ok(())
}
