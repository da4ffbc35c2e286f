//! Device reply parsing
//!
//! The chip answers most commands with a frame of the same shape as the
//! request. The command byte is `request | 0x80` on success and
//! `request | 0xC0` on failure; failures carry a one-byte [`Status`].
//! Input commands are normally sent fire-and-forget, so nothing here is on
//! the write path.

use std::fmt;

use serde::Serialize;
use tracing::{trace, warn};

use crate::error::ParseError;
use crate::protocol::{self, reply, HEADER, MIN_FRAME_LEN, PREAMBLE_LEN};
use crate::types::CommandType;

/// A validated frame: header, length and checksum all check out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub address: u8,
    /// Raw command byte, including any reply flag bits
    pub command: u8,
    pub payload: Vec<u8>,
}

impl Frame {
    /// Parse one frame from the start of `bytes`. Trailing bytes are ignored.
    pub fn parse(bytes: &[u8]) -> Result<Self, ParseError> {
        if bytes.len() < MIN_FRAME_LEN {
            return Err(ParseError::TooShort {
                expected: MIN_FRAME_LEN,
                got: bytes.len(),
            });
        }
        if bytes[..2] != HEADER {
            return Err(ParseError::BadHeader([bytes[0], bytes[1]]));
        }

        let len = bytes[4] as usize;
        let available = bytes.len() - MIN_FRAME_LEN;
        if available < len {
            return Err(ParseError::LengthMismatch {
                declared: len,
                actual: available,
            });
        }

        let expected = protocol::checksum(&bytes[..PREAMBLE_LEN + len]);
        let actual = bytes[PREAMBLE_LEN + len];
        if expected != actual {
            return Err(ParseError::ChecksumMismatch { expected, actual });
        }

        Ok(Self {
            address: bytes[2],
            command: bytes[3],
            payload: bytes[PREAMBLE_LEN..PREAMBLE_LEN + len].to_vec(),
        })
    }

    /// Total bytes this frame occupies on the wire
    pub fn frame_len(&self) -> usize {
        MIN_FRAME_LEN + self.payload.len()
    }
}

/// Status byte carried by error replies (and by some success replies)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum Status {
    Success = 0x00,
    /// Serial receive timeout inside the chip
    Timeout = 0xE1,
    BadHeader = 0xE2,
    BadCommand = 0xE3,
    BadChecksum = 0xE4,
    BadParameter = 0xE5,
    OperationFailed = 0xE6,
}

impl Status {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0x00 => Some(Self::Success),
            0xE1 => Some(Self::Timeout),
            0xE2 => Some(Self::BadHeader),
            0xE3 => Some(Self::BadCommand),
            0xE4 => Some(Self::BadChecksum),
            0xE5 => Some(Self::BadParameter),
            0xE6 => Some(Self::OperationFailed),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Success => "success",
            Status::Timeout => "serial receive timeout",
            Status::BadHeader => "invalid frame header",
            Status::BadCommand => "invalid command code",
            Status::BadChecksum => "checksum mismatch",
            Status::BadParameter => "parameter error",
            Status::OperationFailed => "operation failed",
        };
        f.write_str(s)
    }
}

/// A device reply, decoded from a [`Frame`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFrame {
    pub address: u8,
    /// The request this reply answers, with reply bits stripped
    pub request: Option<CommandType>,
    /// Raw command byte as received
    pub raw_command: u8,
    pub is_error: bool,
    pub payload: Vec<u8>,
}

impl ResponseFrame {
    pub fn parse(bytes: &[u8]) -> Result<Self, ParseError> {
        Frame::parse(bytes).map(Self::from)
    }

    /// Status carried by the reply. Error replies without a known status
    /// byte map to [`Status::OperationFailed`].
    pub fn status(&self) -> Status {
        match self.payload.first() {
            Some(&b) if self.is_error => Status::from_u8(b).unwrap_or(Status::OperationFailed),
            None if self.is_error => Status::OperationFailed,
            Some(&b) if self.payload.len() == 1 => Status::from_u8(b).unwrap_or(Status::Success),
            _ => Status::Success,
        }
    }

    pub fn is_success(&self) -> bool {
        !self.is_error && self.status() == Status::Success
    }

    /// Whether this reply answers `command`
    pub fn answers(&self, command: CommandType) -> bool {
        self.request == Some(command)
    }
}

impl From<Frame> for ResponseFrame {
    fn from(frame: Frame) -> Self {
        let is_error = frame.command & reply::ERROR_FLAG == reply::ERROR_FLAG;
        let base = if is_error {
            frame.command & !reply::ERROR_FLAG
        } else {
            frame.command & !reply::SUCCESS_FLAG
        };
        // READ_MY_HID_DATA is 0x87 on the wire, so its success reply is the
        // code itself and its error reply (0xC7) masks down to 0x07
        let request = CommandType::from_code(base | reply::SUCCESS_FLAG)
            .filter(|c| *c == CommandType::ReadCustomHid)
            .or_else(|| CommandType::from_code(base));
        Self {
            address: frame.address,
            request,
            raw_command: frame.command,
            is_error,
            payload: frame.payload,
        }
    }
}

/// Incremental frame decoder for a byte stream
///
/// Serial reads return arbitrary chunks. Push them in as they arrive and
/// collect whole frames; garbage and corrupt frames are skipped by
/// resynchronising on the next header.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append received bytes
    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Bytes held waiting for the rest of a frame
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Pop the next complete frame, if one is buffered
    pub fn next_frame(&mut self) -> Option<Frame> {
        loop {
            let start = self.buf.windows(2).position(|w| w == HEADER);
            match start {
                None => {
                    // Keep a trailing 0x57 that may begin the next header
                    let keep = usize::from(self.buf.last() == Some(&HEADER[0]));
                    let drop = self.buf.len() - keep;
                    if drop > 0 {
                        trace!("dropping {drop} bytes without header");
                        self.buf.drain(..drop);
                    }
                    return None;
                }
                Some(0) => {}
                Some(skip) => {
                    trace!("skipping {skip} bytes before header");
                    self.buf.drain(..skip);
                }
            }

            if self.buf.len() < MIN_FRAME_LEN {
                return None;
            }
            let len = self.buf[4] as usize;
            if self.buf.len() < MIN_FRAME_LEN + len {
                return None;
            }

            match Frame::parse(&self.buf) {
                Ok(frame) => {
                    self.buf.drain(..frame.frame_len());
                    return Some(frame);
                }
                Err(e) => {
                    warn!("discarding corrupt frame: {e}");
                    // Skip this header and look for the next one
                    self.buf.drain(..2);
                }
            }
        }
    }
}

/// Chip information from a GET_INFO reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChipInfo {
    /// Version string, e.g. "V1.1"
    pub version: String,
    pub version_raw: u8,
    /// Whether the USB side is enumerated by the target machine
    pub usb_connected: bool,
    pub num_lock: bool,
    pub caps_lock: bool,
    pub scroll_lock: bool,
}

impl ChipInfo {
    /// Reply payload is 8 bytes: version, usb state, led bits, 5 reserved
    pub const PAYLOAD_LEN: usize = 8;

    pub fn from_payload(data: &[u8]) -> Result<Self, ParseError> {
        if data.len() < Self::PAYLOAD_LEN {
            return Err(ParseError::InvalidPayload {
                command: CommandType::GetInfo.name(),
                len: data.len(),
            });
        }
        let version_raw = data[0];
        let leds = data[2];
        Ok(Self {
            version: format!("V{}.{}", (version_raw >> 4) & 0x0F, version_raw & 0x0F),
            version_raw,
            usb_connected: data[1] == 0x01,
            num_lock: leds & 0x01 != 0,
            caps_lock: leds & 0x02 != 0,
            scroll_lock: leds & 0x04 != 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::Packet;

    fn reply(cmd: u8, payload: &[u8]) -> Vec<u8> {
        let mut v = vec![0x57, 0xAB, 0x00, cmd, payload.len() as u8];
        v.extend_from_slice(payload);
        v.push(protocol::checksum(&v));
        v
    }

    #[test]
    fn test_parse_success_reply() {
        let bytes = reply(0x82, &[0x00]);
        let resp = ResponseFrame::parse(&bytes).unwrap();
        assert_eq!(resp.request, Some(CommandType::SendKeyboardGeneral));
        assert!(!resp.is_error);
        assert!(resp.is_success());
    }

    #[test]
    fn test_parse_error_reply() {
        let bytes = reply(0xC2, &[0xE5]);
        let resp = ResponseFrame::parse(&bytes).unwrap();
        assert_eq!(resp.request, Some(CommandType::SendKeyboardGeneral));
        assert!(resp.is_error);
        assert_eq!(resp.status(), Status::BadParameter);
        assert!(!resp.is_success());
    }

    #[test]
    fn test_read_custom_hid_keeps_command() {
        let bytes = reply(0x87, &[1, 2, 3]);
        let resp = ResponseFrame::parse(&bytes).unwrap();
        assert_eq!(resp.request, Some(CommandType::ReadCustomHid));
        assert!(resp.answers(CommandType::ReadCustomHid));
    }

    #[test]
    fn test_read_custom_hid_error_reply() {
        let bytes = reply(0xC7, &[0xE5]);
        let resp = ResponseFrame::parse(&bytes).unwrap();
        assert_eq!(resp.request, Some(CommandType::ReadCustomHid));
        assert!(resp.is_error);
        assert_eq!(resp.status(), Status::BadParameter);
    }

    #[test]
    fn test_parse_rejects_bad_checksum() {
        let mut bytes = reply(0x81, &[0x30, 0x01, 0x02, 0, 0, 0, 0, 0]);
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        assert!(matches!(
            Frame::parse(&bytes),
            Err(ParseError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_truncated() {
        let bytes = reply(0x81, &[0x30, 0x01, 0x02]);
        assert!(matches!(
            Frame::parse(&bytes[..bytes.len() - 2]),
            Err(ParseError::LengthMismatch { declared: 3, .. })
        ));
        assert!(matches!(
            Frame::parse(&[0x57, 0xAB]),
            Err(ParseError::TooShort { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_bad_header() {
        assert_eq!(
            Frame::parse(&[0x00, 0xAB, 0x00, 0x01, 0x00, 0x00]),
            Err(ParseError::BadHeader([0x00, 0xAB]))
        );
    }

    #[test]
    fn test_chip_info() {
        let bytes = reply(0x81, &[0x30, 0x01, 0x02, 0, 0, 0, 0, 0]);
        let resp = ResponseFrame::parse(&bytes).unwrap();
        assert!(resp.answers(CommandType::GetInfo));
        let info = ChipInfo::from_payload(&resp.payload).unwrap();
        assert_eq!(info.version, "V3.0");
        assert!(info.usb_connected);
        assert!(info.caps_lock);
        assert!(!info.num_lock);
        assert!(!info.scroll_lock);
    }

    #[test]
    fn test_chip_info_short_payload() {
        assert!(ChipInfo::from_payload(&[0x30, 0x01]).is_err());
    }

    #[test]
    fn test_decoder_split_chunks() {
        let bytes = reply(0x81, &[0x30, 0x01, 0x00, 0, 0, 0, 0, 0]);
        let mut decoder = FrameDecoder::new();
        decoder.push(&bytes[..3]);
        assert!(decoder.next_frame().is_none());
        decoder.push(&bytes[3..]);
        let frame = decoder.next_frame().unwrap();
        assert_eq!(frame.command, 0x81);
        assert_eq!(decoder.pending(), 0);
    }

    #[test]
    fn test_decoder_skips_garbage_and_corrupt_frames() {
        let good = reply(0x82, &[0x00]);
        let mut corrupt = reply(0x83, &[0x00]);
        let last = corrupt.len() - 1;
        corrupt[last] = corrupt[last].wrapping_add(1);

        let mut decoder = FrameDecoder::new();
        decoder.push(&[0x12, 0x34, 0x57]);
        decoder.push(&corrupt);
        decoder.push(&good);
        decoder.push(&good);

        assert_eq!(decoder.next_frame().unwrap().command, 0x82);
        assert_eq!(decoder.next_frame().unwrap().command, 0x82);
        assert!(decoder.next_frame().is_none());
    }

    #[test]
    fn test_decoder_accepts_own_packets() {
        let packet = Packet::build(CommandType::GetInfo, &[]).unwrap();
        let mut decoder = FrameDecoder::new();
        decoder.push(packet.as_bytes());
        let frame = decoder.next_frame().unwrap();
        assert_eq!(frame.command, 0x01);
        assert!(frame.payload.is_empty());
    }
}
