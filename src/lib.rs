//! # iec62056-sim - A Software Stand-in for an IEC 62056-21 Meter
//!
//! The iec62056-sim crate answers, over a serial port, the way a utility meter
//! answers an optical-probe readout. It lets client software that reads real
//! meters be exercised without the meter.
//!
//! ## Features
//!
//! - Identification reply to `/?!` sign-on requests
//! - Mode C acknowledgement (`ACK 0 5 0`) followed by a switch to 9600 baud
//!   after a device-side settle delay
//! - OBIS 1.8.0 readout with XOR block check character
//! - Per-line hex/ASCII protocol trace through the `log` facade
//! - In-memory mock port for tests
//!
//! ## Usage
//!
//! ```rust,no_run
//! use iec62056_sim::{serve, shutdown_on, SimulatorConfig};
//!
//! # async fn run() -> Result<(), iec62056_sim::MeterSimError> {
//! let summary = serve(
//!     "/dev/ttyUSB0",
//!     SimulatorConfig::default(),
//!     shutdown_on(tokio::signal::ctrl_c()),
//! )
//! .await?;
//! println!("served {} OBIS requests", summary.stats.obis_responses_sent);
//! # Ok(())
//! # }
//! ```

pub mod constants;
pub mod error;
pub mod iec62056;
pub mod logging;
pub mod simulator;
pub mod util;

pub use crate::error::MeterSimError;
pub use crate::logging::{init_logger, log_error, log_info, LogSink, MemorySink, TraceEvent, TraceSink};

// Protocol core
pub use iec62056::{
    bcc, contains_obis_frame, Action, BufferPolicy, FrameScanner, Interpreter, Line, LineFramer,
    MeterPort, ProtocolState, Response, SerialConfig,
};
pub use iec62056::serial_mock::MockSerialPort;

// Session driver
pub use simulator::{MeterSimulator, SessionEnd, SessionSummary, SimulatorConfig};

use std::future::Future;
use std::io;

/// Opens a serial port with the meter's line settings (7E1, no flow control).
///
/// # Arguments
/// * `port` - Serial port path (e.g., "/dev/ttyUSB0" on Linux, "COM3" on Windows)
/// * `baud_rate` - Opening speed, normally 300
///
/// # Returns
/// * `Ok(SerialStream)` - Open port, ready for [`MeterSimulator`]
/// * `Err(MeterSimError)` - The port could not be opened
pub fn connect(port: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream, MeterSimError> {
    let config = SerialConfig {
        baudrate: baud_rate,
        ..SerialConfig::default()
    };
    iec62056::serial::open_port(port, &config)
}

/// Lists serial ports; with `probe`, only the ones that can be opened.
pub fn list_ports(probe: bool) -> Result<Vec<String>, MeterSimError> {
    iec62056::serial::list_ports(probe)
}

/// Opens `port` and serves one simulator session on it until `shutdown`
/// resolves or the port closes. Traces go to the `log` facade.
pub async fn serve<F>(
    port: &str,
    config: SimulatorConfig,
    shutdown: F,
) -> Result<SessionSummary, MeterSimError>
where
    F: Future<Output = ()>,
{
    config.validate()?;
    let stream = connect(port, config.initial_baud_rate)?;
    MeterSimulator::new(stream, config, LogSink).run(shutdown).await
}

/// Resolves once `signal` fires.
///
/// If the signal cannot be installed the error is logged and the returned
/// future never resolves, so the session keeps running until the port closes.
pub async fn shutdown_on<F>(signal: F)
where
    F: Future<Output = io::Result<()>>,
{
    if let Err(e) = signal.await {
        log_error(&format!("Shutdown signal unavailable: {e}"));
        std::future::pending::<()>().await;
    }
}
