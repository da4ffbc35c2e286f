//! Framed, checksummed CH9329 packets

use std::fmt;

use crate::error::{ParseError, ProtocolError};
use crate::protocol::{self, DEFAULT_ADDRESS, HEADER, MAX_PAYLOAD_LEN, PREAMBLE_LEN};
use crate::types::CommandType;

/// A complete frame ready for the serial link
///
/// `[0x57, 0xAB, addr, cmd, len, payload.., sum]`. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Packet {
    command: CommandType,
    bytes: Vec<u8>,
}

impl Packet {
    /// Frame `payload` for `command` at the default address.
    pub fn build(command: CommandType, payload: &[u8]) -> Result<Self, ProtocolError> {
        Self::build_with_address(DEFAULT_ADDRESS, command, payload)
    }

    /// Frame `payload` for `command` at an explicit device address.
    pub fn build_with_address(
        address: u8,
        command: CommandType,
        payload: &[u8],
    ) -> Result<Self, ProtocolError> {
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(ProtocolError::PayloadTooLarge { len: payload.len() });
        }

        let mut bytes = Vec::with_capacity(PREAMBLE_LEN + payload.len() + 1);
        bytes.extend_from_slice(&HEADER);
        bytes.push(address);
        bytes.push(command.code());
        bytes.push(payload.len() as u8);
        bytes.extend_from_slice(payload);
        bytes.push(protocol::checksum(&bytes));

        Ok(Self { command, bytes })
    }

    /// Frame a loosely typed payload, rejecting any value outside 0..=255.
    ///
    /// Values are never wrapped or clamped.
    pub fn build_from_values(command: CommandType, values: &[i64]) -> Result<Self, ProtocolError> {
        if values.len() > MAX_PAYLOAD_LEN {
            return Err(ProtocolError::PayloadTooLarge { len: values.len() });
        }
        let payload = values
            .iter()
            .enumerate()
            .map(|(index, &value)| {
                u8::try_from(value).map_err(|_| ProtocolError::PayloadByteOutOfRange { index, value })
            })
            .collect::<Result<Vec<u8>, _>>()?;
        Self::build(command, &payload)
    }

    /// Parse and validate a frame produced by [`Packet::build`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ParseError> {
        let frame = crate::response::Frame::parse(bytes)?;
        let command =
            CommandType::from_code(frame.command).ok_or(ParseError::UnknownCommand(frame.command))?;
        Ok(Self {
            command,
            bytes: bytes[..frame.frame_len()].to_vec(),
        })
    }

    pub fn command(&self) -> CommandType {
        self.command
    }

    pub fn address(&self) -> u8 {
        self.bytes[2]
    }

    /// Value of the LEN field
    pub fn payload_len(&self) -> usize {
        self.bytes[4] as usize
    }

    pub fn payload(&self) -> &[u8] {
        &self.bytes[PREAMBLE_LEN..self.bytes.len() - 1]
    }

    pub fn checksum(&self) -> u8 {
        self.bytes[self.bytes.len() - 1]
    }

    /// Whole frame as written to the wire
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false: a packet carries at least its preamble and checksum.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Hex dump with spaces, e.g. `57 AB 00 02 ...`
    pub fn to_hex(&self) -> String {
        self.bytes
            .iter()
            .map(|b| format!("{b:02X}"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl AsRef<[u8]> for Packet {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.command, self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_payload_layout() {
        let packet = Packet::build(CommandType::GetInfo, &[]).unwrap();
        assert_eq!(packet.as_bytes(), &[0x57, 0xAB, 0x00, 0x01, 0x00, 0x03]);
        assert_eq!(packet.payload(), &[] as &[u8]);
        assert_eq!(packet.checksum(), 0x03);
    }

    #[test]
    fn test_reset_packet() {
        let packet = Packet::build(CommandType::ResetChip, &[]).unwrap();
        assert_eq!(packet.as_bytes(), &[0x57, 0xAB, 0x00, 0x0F, 0x00, 0x11]);
    }

    #[test]
    fn test_checksum_wraps() {
        let payload = [0xFF; 4];
        let packet = Packet::build(CommandType::SendCustomHid, &payload).unwrap();
        let expected = (0x57u32 + 0xAB + 0x06 + 0x04 + 4 * 0xFF) % 256;
        assert_eq!(packet.checksum() as u32, expected);
    }

    #[test]
    fn test_payload_too_large() {
        let payload = vec![0u8; 256];
        assert_eq!(
            Packet::build(CommandType::SendCustomHid, &payload),
            Err(ProtocolError::PayloadTooLarge { len: 256 })
        );
        assert!(Packet::build(CommandType::SendCustomHid, &payload[..255]).is_ok());
    }

    #[test]
    fn test_build_from_values_rejects_out_of_range() {
        assert_eq!(
            Packet::build_from_values(CommandType::SendCustomHid, &[1, 2, 256]),
            Err(ProtocolError::PayloadByteOutOfRange {
                index: 2,
                value: 256
            })
        );
        assert_eq!(
            Packet::build_from_values(CommandType::SendCustomHid, &[-1]),
            Err(ProtocolError::PayloadByteOutOfRange {
                index: 0,
                value: -1
            })
        );
        let ok = Packet::build_from_values(CommandType::SendCustomHid, &[0, 255]).unwrap();
        assert_eq!(ok.payload(), &[0, 255]);
    }

    #[test]
    fn test_explicit_address() {
        let packet = Packet::build_with_address(0x01, CommandType::GetInfo, &[]).unwrap();
        assert_eq!(packet.address(), 0x01);
        assert_eq!(packet.checksum(), 0x04);
    }

    #[test]
    fn test_from_bytes_round_trip() {
        let packet = Packet::build(CommandType::SendKeyboardMedia, &[0x02, 0xE9]).unwrap();
        let parsed = Packet::from_bytes(packet.as_bytes()).unwrap();
        assert_eq!(parsed, packet);
    }

    #[test]
    fn test_to_hex() {
        let packet = Packet::build(CommandType::GetInfo, &[]).unwrap();
        assert_eq!(packet.to_hex(), "57 AB 00 01 00 03");
    }
}
