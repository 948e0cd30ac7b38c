//! Unit tests for the `MeterSimError` enum and its associated `Display` trait implementation.

use iec62056_sim::MeterSimError;

/// Tests that the `SerialPortError` variant is correctly formatted.
#[test]
fn test_serial_port_error() {
    let err = MeterSimError::SerialPortError("Test error".to_string());
    assert_eq!(err.to_string(), "Serial port error: Test error");
}

/// Tests that the `BaudReconfigureFailure` variant is correctly formatted.
#[test]
fn test_baud_reconfigure_failure() {
    let err = MeterSimError::BaudReconfigureFailure {
        baud_rate: 9600,
        reason: "not supported".to_string(),
    };
    assert_eq!(err.to_string(), "Failed to set baud rate 9600: not supported");
}

/// Tests that the `InvalidBcc` variant is correctly formatted.
#[test]
fn test_invalid_bcc_error() {
    let err = MeterSimError::InvalidBcc {
        expected: 0x5E,
        calculated: 0x0A,
    };
    assert_eq!(err.to_string(), "Invalid BCC: expected 0x5E, calculated 0x0A");
}

/// Tests that JSON errors become configuration errors.
#[test]
fn test_json_error_conversion() {
    let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let err: MeterSimError = json_err.into();
    assert!(matches!(err, MeterSimError::ConfigError(_)));
}
