//! # Serial Transport
//!
//! This module opens the serial line the simulated meter answers on and
//! defines [`MeterPort`], the seam between the simulator driver and the
//! transport, so the driver runs unchanged against a real port or the
//! in-memory mock.

use crate::constants::INITIAL_BAUD_RATE;
use crate::error::MeterSimError;
use log::debug;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_serial::SerialPortBuilderExt;

/// Transport used by the simulator: a byte stream whose speed can be changed
/// while open.
#[async_trait::async_trait]
pub trait MeterPort: AsyncRead + AsyncWrite + Unpin + Send {
    /// Switches the line speed without closing the port.
    async fn reconfigure_baud_rate(&mut self, baud_rate: u32) -> io::Result<()>;

    /// Current line speed.
    fn current_baud_rate(&self) -> io::Result<u32>;
}

#[async_trait::async_trait]
impl MeterPort for tokio_serial::SerialStream {
    async fn reconfigure_baud_rate(&mut self, baud_rate: u32) -> io::Result<()> {
        tokio_serial::SerialPort::set_baud_rate(self, baud_rate).map_err(io::Error::from)
    }

    fn current_baud_rate(&self) -> io::Result<u32> {
        tokio_serial::SerialPort::baud_rate(self).map_err(io::Error::from)
    }
}

/// Configuration for the serial line when the session opens.
///
/// Framing is fixed at 7 data bits, even parity, one stop bit, no flow
/// control; only the opening speed and the I/O timeout vary.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    pub baudrate: u32,
    pub timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        SerialConfig {
            baudrate: INITIAL_BAUD_RATE,
            timeout: Duration::from_secs(5),
        }
    }
}

/// Opens `port_name` as a 7E1 line without flow control.
pub fn open_port(
    port_name: &str,
    config: &SerialConfig,
) -> Result<tokio_serial::SerialStream, MeterSimError> {
    debug!("Opening {port_name} at {} baud, 7E1", config.baudrate);
    tokio_serial::new(port_name, config.baudrate)
        .data_bits(tokio_serial::DataBits::Seven)
        .parity(tokio_serial::Parity::Even)
        .stop_bits(tokio_serial::StopBits::One)
        .flow_control(tokio_serial::FlowControl::None)
        .timeout(config.timeout)
        .open_native_async()
        .map_err(|e| MeterSimError::SerialPortError(format!("{port_name}: {e}")))
}

/// Lists the serial ports present on the system.
///
/// With `probe`, every port is opened and closed again and only the ones that
/// could be opened are returned.
pub fn list_ports(probe: bool) -> Result<Vec<String>, MeterSimError> {
    let ports = tokio_serial::available_ports()?;

    let names = ports
        .into_iter()
        .map(|info| info.port_name)
        .filter(|name| !probe || probe_port(name))
        .collect();
    Ok(names)
}

fn probe_port(port_name: &str) -> bool {
    match tokio_serial::new(port_name, INITIAL_BAUD_RATE).open() {
        Ok(_) => true,
        Err(e) => {
            debug!("Skipping {port_name}: {e}");
            false
        }
    }
}
