//! # Device Communication Module
//!
//! Connection plumbing between the monitor and the Arduino sensor board.
//!
//! ## Seams
//!
//! - [`Transport`] - an open duplex byte link. Reads are bounded by a short
//!   hardware timeout and an empty read is a normal outcome, never an error.
//! - [`Connector`] - opens a [`Transport`] for a port name and baud rate.
//!   The session controller owns one and calls it on every user connect.
//!
//! [`SerialConnector`] is the production implementation (feature `serial`).
//! Tests drive the controller through scripted in-memory transports instead.
//!
//! ## Configuration
//!
//! ```toml
//! [device]
//! port = "/dev/ttyACM0"
//! baud_rate = 9600
//! read_timeout_ms = 50
//! ```

pub mod framer;

use crate::error::MonitorError;
use log::{debug, info};
use std::io;
use std::time::Duration;

#[cfg(feature = "serial")]
use serialport::SerialPort;
#[cfg(feature = "serial")]
use std::io::{Read, Write};

/// Baud rates offered for the sensor board.
pub const SUPPORTED_BAUD_RATES: [u32; 6] = [9600, 19200, 38400, 57600, 115200, 250000];

/// An open byte link to the device.
pub trait Transport: Send {
    /// Read whatever arrived, up to `buf.len()` bytes. `Ok(0)` means nothing
    /// arrived within the read timeout.
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write and flush `data`.
    fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Release the underlying handle. Calling it twice is harmless.
    fn close(&mut self);
}

/// Opens transports on demand.
pub trait Connector {
    fn open(&mut self, port: &str, baud_rate: u32) -> Result<Box<dyn Transport>, MonitorError>;
}

/// Serial port discovered on the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    pub name: String,
    pub description: String,
}

/// Opens real serial ports through the `serialport` crate.
#[derive(Debug, Clone)]
pub struct SerialConnector {
    read_timeout: Duration,
    settle: Duration,
}

impl SerialConnector {
    pub fn new(read_timeout: Duration, settle: Duration) -> Self {
        Self {
            read_timeout,
            settle,
        }
    }
}

impl Connector for SerialConnector {
    #[cfg(feature = "serial")]
    fn open(&mut self, port: &str, baud_rate: u32) -> Result<Box<dyn Transport>, MonitorError> {
        info!("Opening sensor port {} at {} baud", port, baud_rate);
        let mut builder = serialport::new(port, baud_rate).timeout(self.read_timeout);
        #[cfg(unix)]
        {
            builder = builder
                .data_bits(serialport::DataBits::Eight)
                .stop_bits(serialport::StopBits::One)
                .parity(serialport::Parity::None);
        }
        let mut handle = builder.open().map_err(|e| MonitorError::Connection {
            port: port.to_string(),
            reason: e.to_string(),
        })?;
        // Most Arduino boards reset on DTR; the handshake line follows the reset.
        let _ = handle.write_data_terminal_ready(true);
        if !self.settle.is_zero() {
            std::thread::sleep(self.settle);
        }
        debug!("Serial port {} ready", port);
        Ok(Box::new(SerialTransport {
            port: Some(handle),
            name: port.to_string(),
        }))
    }

    #[cfg(not(feature = "serial"))]
    fn open(&mut self, port: &str, baud_rate: u32) -> Result<Box<dyn Transport>, MonitorError> {
        let _ = (self.read_timeout, self.settle);
        log::warn!(
            "Serial support not compiled in; cannot open {} at {} baud",
            port,
            baud_rate
        );
        Err(MonitorError::Connection {
            port: port.to_string(),
            reason: "serial support not compiled in".to_string(),
        })
    }
}

#[cfg(feature = "serial")]
struct SerialTransport {
    port: Option<Box<dyn SerialPort>>,
    name: String,
}

#[cfg(feature = "serial")]
impl Transport for SerialTransport {
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let Some(port) = self.port.as_mut() else {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "port closed"));
        };
        match port.read(buf) {
            Ok(n) => Ok(n),
            Err(ref e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {
                debug!("Serial read interrupted (EINTR)");
                Ok(0)
            }
            Err(e) => Err(e),
        }
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        let Some(port) = self.port.as_mut() else {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "port closed"));
        };
        port.write_all(data)?;
        port.flush()
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            info!("Closed serial port {}", self.name);
        }
    }
}

/// Enumerate serial ports visible to the host.
#[cfg(feature = "serial")]
pub fn list_ports() -> anyhow::Result<Vec<PortInfo>> {
    let ports = serialport::available_ports()
        .map_err(|e| anyhow::anyhow!("Failed to enumerate serial ports: {}", e))?;
    Ok(ports
        .into_iter()
        .map(|p| {
            let description = match p.port_type {
                serialport::SerialPortType::UsbPort(usb) => usb
                    .product
                    .or(usb.manufacturer)
                    .unwrap_or_else(|| format!("USB {:04x}:{:04x}", usb.vid, usb.pid)),
                serialport::SerialPortType::BluetoothPort => "Bluetooth".to_string(),
                serialport::SerialPortType::PciPort => "PCI".to_string(),
                serialport::SerialPortType::Unknown => "Unknown".to_string(),
            };
            PortInfo {
                name: p.port_name,
                description,
            }
        })
        .collect())
}

#[cfg(not(feature = "serial"))]
pub fn list_ports() -> anyhow::Result<Vec<PortInfo>> {
    Ok(Vec::new())
}

pub fn is_supported_baud(baud_rate: u32) -> bool {
    SUPPORTED_BAUD_RATES.contains(&baud_rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baud_rate_set_matches_board_options() {
        assert!(is_supported_baud(9600));
        assert!(is_supported_baud(250000));
        assert!(!is_supported_baud(14400));
    }
}
