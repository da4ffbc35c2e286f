//! Protocol and transport error types

use thiserror::Error;

use crate::response::Status;

/// Errors raised while building a packet
///
/// All of these are contract violations by the caller; nothing here is
/// silently corrected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Payload too large: {len} bytes (max 255)")]
    PayloadTooLarge { len: usize },

    #[error("Payload byte {index} out of range: {value} (expected 0..=255)")]
    PayloadByteOutOfRange { index: usize, value: i64 },

    #[error("Too many keys in keyboard report: {count} (max 6)")]
    TooManyKeys { count: usize },

    #[error("USB string descriptor too long: {len} bytes (max 23)")]
    UsbStringTooLong { len: usize },

    #[error("Relative motion needs {steps} reports (max {max})")]
    MotionTooLarge { steps: usize, max: usize },
}

/// Errors raised while decoding a frame (device reply or echoed command)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Frame too short: need {expected} bytes, got {got}")]
    TooShort { expected: usize, got: usize },

    #[error("Bad frame header: {0:02X?}")]
    BadHeader([u8; 2]),

    #[error("Length field says {declared} payload bytes, frame carries {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("Checksum mismatch: frame has 0x{actual:02X}, computed 0x{expected:02X}")]
    ChecksumMismatch { expected: u8, actual: u8 },

    #[error("Unknown command byte 0x{0:02X}")]
    UnknownCommand(u8),

    #[error("Invalid payload for {command}: {len} bytes")]
    InvalidPayload { command: &'static str, len: usize },
}

/// Errors that can occur during transport operations
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Serial port not found: {0}")]
    PortNotFound(String),

    #[error("Serial error: {0}")]
    Serial(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Timed out waiting for device reply")]
    Timeout,

    #[error("Transport disconnected")]
    Disconnected,

    #[error("Device reported error: {0}")]
    Device(Status),

    #[error("Malformed reply: {0}")]
    Parse(#[from] ParseError),
}

impl From<serialport::Error> for TransportError {
    fn from(e: serialport::Error) -> Self {
        match e.kind() {
            serialport::ErrorKind::NoDevice => TransportError::PortNotFound(e.description),
            serialport::ErrorKind::Io(kind) => {
                TransportError::Io(std::io::Error::new(kind, e.description))
            }
            _ => TransportError::Serial(e.description),
        }
    }
}
