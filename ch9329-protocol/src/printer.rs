//! PrinterTransport middleware for monitoring transport traffic
//!
//! Wraps any [`Transport`] and prints every packet written and every reply
//! read, decoded, either as colored text or as one JSON object per line.
//!
//! # Example
//!
//! ```ignore
//! use ch9329_protocol::{SerialTransport, PrinterTransport, PrinterConfig, PacketFilter};
//!
//! let transport = SerialTransport::open("/dev/ttyUSB0", 9600)?;
//! let config = PrinterConfig::default().with_filter(PacketFilter::Keyboard);
//! let monitored = PrinterTransport::wrap(Arc::new(transport), config);
//! ```

use std::io::{self, Write};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crossterm::style::Stylize;
use parking_lot::Mutex;
use serde::Serialize;

use crate::command::{try_parse_command, ParsedCommand};
use crate::error::TransportError;
use crate::packet::Packet;
use crate::protocol::reply;
use crate::response::ResponseFrame;
use crate::transport::Transport;
use crate::types::CommandType;

/// Output format for the printer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Packet filter for selective display
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PacketFilter {
    #[default]
    All,
    Keyboard,
    Mouse,
    Cmd(u8),
}

impl FromStr for PacketFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" | "" => Ok(Self::All),
            "keyboard" | "kb" | "key" => Ok(Self::Keyboard),
            "mouse" | "ms" => Ok(Self::Mouse),
            s if s.starts_with("cmd=") || s.starts_with("0x") => {
                let hex_str = s.strip_prefix("cmd=").unwrap_or(s);
                let hex_str = hex_str.strip_prefix("0x").unwrap_or(hex_str);
                u8::from_str_radix(hex_str, 16)
                    .map(Self::Cmd)
                    .map_err(|e| format!("Invalid command byte: {}", e))
            }
            _ => Err(format!("Unknown filter: {}", s)),
        }
    }
}

impl PacketFilter {
    /// Whether traffic for `command` passes this filter. Replies match the
    /// request they answer.
    pub fn matches(&self, command: Option<CommandType>, raw: u8) -> bool {
        match self {
            Self::All => true,
            Self::Keyboard => matches!(
                command,
                Some(CommandType::SendKeyboardGeneral | CommandType::SendKeyboardMedia)
            ),
            Self::Mouse => matches!(
                command,
                Some(CommandType::SendMouseAbsolute | CommandType::SendMouseRelative)
            ),
            Self::Cmd(c) => {
                *c == raw || command.map(|cmd| cmd.code()) == Some(*c & !reply::ERROR_FLAG)
            }
        }
    }
}

/// Configuration for the PrinterTransport
#[derive(Debug, Clone, Default)]
pub struct PrinterConfig {
    /// Show raw hex dump alongside decoded output
    pub show_hex: bool,
    /// Filter for selective display
    pub filter: PacketFilter,
    /// Output format
    pub format: OutputFormat,
}

impl PrinterConfig {
    pub fn with_hex(mut self, show: bool) -> Self {
        self.show_hex = show;
        self
    }

    pub fn with_filter(mut self, filter: PacketFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }
}

/// Direction of a printed packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Tx,
    Rx,
}

/// A packet as shown by the printer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedPacket {
    pub dir: Direction,
    pub code: u8,
    pub name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decoded: Option<ParsedCommand>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub hex: String,
}

impl DecodedPacket {
    pub fn from_request(packet: &Packet) -> Self {
        Self {
            dir: Direction::Tx,
            code: packet.command().code(),
            name: packet.command().name(),
            decoded: try_parse_command(packet.as_bytes()).ok(),
            status: None,
            hex: packet.to_hex(),
        }
    }

    pub fn from_reply(frame: &ResponseFrame) -> Self {
        Self {
            dir: Direction::Rx,
            code: frame.raw_command,
            name: frame.request.map(CommandType::name).unwrap_or("UNKNOWN"),
            decoded: None,
            status: Some(frame.status().to_string()),
            hex: frame
                .payload
                .iter()
                .map(|b| format!("{b:02X}"))
                .collect::<Vec<_>>()
                .join(" "),
        }
    }

    /// One-line colored rendering
    pub fn to_text(&self, show_hex: bool) -> String {
        let mut line = match self.dir {
            Direction::Tx => format!(
                "{} {}  0x{:02x} {}",
                ">>>".cyan(),
                "CMD".cyan().bold(),
                self.code,
                self.name.yellow()
            ),
            Direction::Rx => format!(
                "{} {}  0x{:02x} {}",
                "<<<".green(),
                "RSP".green().bold(),
                self.code,
                self.name.yellow()
            ),
        };
        if let Some(decoded) = &self.decoded {
            line.push_str(&format!("  {decoded:?}"));
        }
        if let Some(status) = &self.status {
            line.push_str(&format!("  {status}"));
        }
        if show_hex {
            line.push_str(&format!("\n    {}  {}", "HEX".dim(), self.hex));
        }
        line
    }
}

/// Transport middleware that prints all commands and replies
pub struct PrinterTransport {
    inner: Arc<dyn Transport>,
    config: PrinterConfig,
    sink: Mutex<Box<dyn Write + Send>>,
}

impl PrinterTransport {
    /// Wrap a transport, printing to stderr
    pub fn wrap(transport: Arc<dyn Transport>, config: PrinterConfig) -> Arc<dyn Transport> {
        Arc::new(Self::with_sink(transport, config, Box::new(io::stderr())))
    }

    /// Wrap a transport, printing to an arbitrary writer
    pub fn with_sink(
        transport: Arc<dyn Transport>,
        config: PrinterConfig,
        sink: Box<dyn Write + Send>,
    ) -> Self {
        Self {
            inner: transport,
            config,
            sink: Mutex::new(sink),
        }
    }

    fn emit(&self, packet: &DecodedPacket) {
        let line = match self.config.format {
            OutputFormat::Text => packet.to_text(self.config.show_hex),
            OutputFormat::Json => match serde_json::to_string(packet) {
                Ok(json) => json,
                Err(e) => {
                    tracing::warn!("failed to serialize packet: {e}");
                    return;
                }
            },
        };
        // Monitoring output is best effort
        let _ = writeln!(self.sink.lock(), "{line}");
    }

    fn print_command(&self, packet: &Packet) {
        let command = packet.command();
        if self.config.filter.matches(Some(command), command.code()) {
            self.emit(&DecodedPacket::from_request(packet));
        }
    }

    fn print_response(&self, frame: &ResponseFrame) {
        if self.config.filter.matches(frame.request, frame.raw_command) {
            self.emit(&DecodedPacket::from_reply(frame));
        }
    }
}

impl Transport for PrinterTransport {
    fn write_packet(&self, packet: &Packet) -> Result<(), TransportError> {
        self.print_command(packet);
        self.inner.write_packet(packet)
    }

    fn read_response(&self, timeout: Duration) -> Result<Option<ResponseFrame>, TransportError> {
        let reply = self.inner.read_response(timeout)?;
        if let Some(ref frame) = reply {
            self.print_response(frame);
        }
        Ok(reply)
    }

    fn description(&self) -> &str {
        self.inner.description()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{encode_keyboard_general, encode_mouse_relative};
    use crate::transport::MemoryTransport;

    /// Writer that shares its buffer with the test
    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).into_owned()
        }
    }

    #[test]
    fn test_packet_filter_parse() {
        assert_eq!(PacketFilter::from_str("all").unwrap(), PacketFilter::All);
        assert_eq!(
            PacketFilter::from_str("keyboard").unwrap(),
            PacketFilter::Keyboard
        );
        assert_eq!(PacketFilter::from_str("Mouse").unwrap(), PacketFilter::Mouse);
        assert_eq!(
            PacketFilter::from_str("cmd=0x05").unwrap(),
            PacketFilter::Cmd(0x05)
        );
        assert_eq!(
            PacketFilter::from_str("0x87").unwrap(),
            PacketFilter::Cmd(0x87)
        );
        assert!(PacketFilter::from_str("bogus").is_err());
    }

    #[test]
    fn test_filter_matches_replies() {
        let filter = PacketFilter::Cmd(0x01);
        assert!(filter.matches(Some(CommandType::GetInfo), 0x81));
        assert!(!filter.matches(Some(CommandType::SendKeyboardGeneral), 0x82));
        assert!(PacketFilter::Keyboard.matches(Some(CommandType::SendKeyboardMedia), 0x03));
        assert!(!PacketFilter::Keyboard.matches(Some(CommandType::SendMouseRelative), 0x05));
    }

    #[test]
    fn test_json_output_and_filter() {
        let buf = SharedBuf::default();
        let inner = Arc::new(MemoryTransport::new());
        let printer = PrinterTransport::with_sink(
            inner.clone(),
            PrinterConfig::default()
                .with_format(OutputFormat::Json)
                .with_filter(PacketFilter::Keyboard),
            Box::new(buf.clone()),
        );

        printer
            .write_packet(&encode_keyboard_general(0, &[0x04]).unwrap())
            .unwrap();
        printer
            .write_packet(&encode_mouse_relative(0, 1, 1, 0).unwrap())
            .unwrap();

        // Filtering only affects display; both packets reach the inner transport
        assert_eq!(inner.written().len(), 2);

        let out = buf.contents();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 1);
        let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(value["dir"], "tx");
        assert_eq!(value["name"], "SEND_KB_GENERAL_DATA");
        assert_eq!(value["decoded"]["command"], "keyboard_general");
        assert_eq!(value["decoded"]["keys"][0], 4);
    }

    #[test]
    fn test_text_output_with_hex() {
        let buf = SharedBuf::default();
        let printer = PrinterTransport::with_sink(
            Arc::new(MemoryTransport::acknowledging()),
            PrinterConfig::default().with_hex(true),
            Box::new(buf.clone()),
        );
        let packet = encode_keyboard_general(0, &[]).unwrap();
        printer.write_packet(&packet).unwrap();
        printer
            .read_response(Duration::from_millis(1))
            .unwrap()
            .unwrap();

        let out = buf.contents();
        assert!(out.contains("SEND_KB_GENERAL_DATA"));
        assert!(out.contains(&packet.to_hex()));
        assert!(out.contains("success"));
    }
}
