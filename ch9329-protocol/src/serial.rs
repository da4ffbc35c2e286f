//! Serial-port transport for a CH9329 on a UART adapter

use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use serialport::{SerialPort, SerialPortType};
use tracing::{debug, info, trace};

use crate::error::TransportError;
use crate::packet::Packet;
use crate::protocol::timing;
use crate::response::{FrameDecoder, ResponseFrame};
use crate::transport::Transport;

/// WCH vendor ID, shared by the CH340/CH341 UART bridges usually wired to
/// a CH9329
pub const WCH_VENDOR_ID: u16 = 0x1A86;

/// A serial port found on the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortEntry {
    pub name: String,
    pub vid: Option<u16>,
    pub pid: Option<u16>,
    pub product: Option<String>,
}

impl PortEntry {
    /// USB-serial bridge from WCH, the usual CH9329 companion
    pub fn is_wch(&self) -> bool {
        self.vid == Some(WCH_VENDOR_ID)
    }
}

/// List serial ports present on the host
pub fn available_ports() -> Result<Vec<PortEntry>, TransportError> {
    let ports = serialport::available_ports()?;
    Ok(ports
        .into_iter()
        .map(|p| match p.port_type {
            SerialPortType::UsbPort(usb) => PortEntry {
                name: p.port_name,
                vid: Some(usb.vid),
                pid: Some(usb.pid),
                product: usb.product,
            },
            _ => PortEntry {
                name: p.port_name,
                vid: None,
                pid: None,
                product: None,
            },
        })
        .collect())
}

/// CH9329 reached through a serial port
///
/// The port sits behind a mutex; each packet is written with a single
/// `write_all` while the lock is held.
pub struct SerialTransport {
    port: Mutex<Box<dyn SerialPort>>,
    decoder: Mutex<FrameDecoder>,
    description: String,
}

impl SerialTransport {
    /// Open `path` at `baud_rate` (factory default 9600)
    pub fn open(path: &str, baud_rate: u32) -> Result<Self, TransportError> {
        let port = serialport::new(path, baud_rate)
            .timeout(Duration::from_millis(timing::RESPONSE_TIMEOUT_MS))
            .open()?;
        info!("CH9329 serial port opened: {path} @ {baud_rate} baud");
        Ok(Self {
            port: Mutex::new(port),
            decoder: Mutex::new(FrameDecoder::new()),
            description: format!("{path} @ {baud_rate}"),
        })
    }

    /// Drop any unread input, e.g. stale acknowledgements
    pub fn clear_input(&self) -> Result<(), TransportError> {
        self.port.lock().clear(serialport::ClearBuffer::Input)?;
        *self.decoder.lock() = FrameDecoder::new();
        Ok(())
    }
}

impl Transport for SerialTransport {
    fn write_packet(&self, packet: &Packet) -> Result<(), TransportError> {
        trace!("serial write {}", packet);
        let mut port = self.port.lock();
        port.write_all(packet.as_bytes())?;
        port.flush()?;
        Ok(())
    }

    fn read_response(&self, timeout: Duration) -> Result<Option<ResponseFrame>, TransportError> {
        let deadline = Instant::now() + timeout;
        let mut decoder = self.decoder.lock();
        let mut buf = [0u8; 64];
        loop {
            if let Some(frame) = decoder.next_frame() {
                return Ok(Some(frame.into()));
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }

            let mut port = self.port.lock();
            port.set_timeout(remaining)?;
            match port.read(&mut buf) {
                Ok(0) => return Err(TransportError::Disconnected),
                Ok(n) => {
                    debug!("serial read {n} bytes");
                    decoder.push(&buf[..n]);
                }
                Err(e) if e.kind() == ErrorKind::TimedOut => return Ok(None),
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn description(&self) -> &str {
        &self.description
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_entry_is_wch() {
        let entry = PortEntry {
            name: "/dev/ttyUSB0".into(),
            vid: Some(0x1A86),
            pid: Some(0x7523),
            product: Some("USB Serial".into()),
        };
        assert!(entry.is_wch());

        let other = PortEntry {
            name: "/dev/ttyS0".into(),
            vid: None,
            pid: None,
            product: None,
        };
        assert!(!other.is_wch());
    }

    #[test]
    fn test_open_missing_port_fails() {
        let result = SerialTransport::open("/dev/does-not-exist-ch9329", 9600);
        assert!(result.is_err());
    }
}
