//! Type-safe CH9329 command builders and packet decoding
//!
//! Each command family gets its own payload type implementing
//! [`Ch9329Command`]. The `encode_*` functions are thin conveniences over
//! those types. Every builder is a pure function of its arguments: no
//! counters, timestamps or hidden state end up in the payload.

use serde::Serialize;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::bytes::{clamp_signed_byte, clamp_signed_byte_checked, split_low_high};
use crate::error::{ParseError, ProtocolError};
use crate::packet::Packet;
use crate::protocol::{KEY_SLOTS, MAX_RELATIVE_STEPS, MAX_USB_STRING_LEN};
use crate::response::Frame;
use crate::types::{Clamped, CommandType, UsbStringKind};

// =============================================================================
// Core Trait
// =============================================================================

/// A command that can be serialized to a CH9329 frame
pub trait Ch9329Command: Sized {
    /// Command code for this payload type
    const COMMAND: CommandType;

    /// Serialize the payload (everything between LEN and SUM)
    fn payload(&self) -> Vec<u8>;

    /// Build the complete frame
    fn build(&self) -> Result<Packet, ProtocolError> {
        Packet::build(Self::COMMAND, &self.payload())
    }
}

// =============================================================================
// Keyboard
// =============================================================================

/// SEND_KB_GENERAL_DATA (0x02): 8-byte boot keyboard report.
///
/// `[modifiers, 0x00, key0..key5]`. Unused key slots are zero. The chip is
/// level-triggered: whatever this report says is what the target sees held
/// until the next report, so every press needs a matching release report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, IntoBytes, FromBytes, KnownLayout, Immutable,
)]
#[repr(C)]
pub struct KeyboardReport {
    modifiers: u8,
    _reserved: u8,
    keys: [u8; KEY_SLOTS],
}

impl KeyboardReport {
    /// Report with nothing held
    pub const RELEASE: Self = Self {
        modifiers: 0,
        _reserved: 0,
        keys: [0; KEY_SLOTS],
    };

    /// Build a report from a modifier mask and up to six usage codes.
    pub fn new(modifiers: u8, keys: &[u8]) -> Result<Self, ProtocolError> {
        if keys.len() > KEY_SLOTS {
            return Err(ProtocolError::TooManyKeys { count: keys.len() });
        }
        let mut slots = [0u8; KEY_SLOTS];
        slots[..keys.len()].copy_from_slice(keys);
        Ok(Self {
            modifiers,
            _reserved: 0,
            keys: slots,
        })
    }

    /// Build a report from a full slot array
    pub fn from_slots(modifiers: u8, keys: [u8; KEY_SLOTS]) -> Self {
        Self {
            modifiers,
            _reserved: 0,
            keys,
        }
    }

    pub fn modifiers(&self) -> u8 {
        self.modifiers
    }

    /// All six slots, zero-padded
    pub fn keys(&self) -> &[u8; KEY_SLOTS] {
        &self.keys
    }

    /// Non-zero usage codes in slot order
    pub fn pressed(&self) -> impl Iterator<Item = u8> + '_ {
        self.keys.iter().copied().filter(|&k| k != 0)
    }

    pub fn is_release(&self) -> bool {
        *self == Self::RELEASE
    }
}

impl Ch9329Command for KeyboardReport {
    const COMMAND: CommandType = CommandType::SendKeyboardGeneral;

    fn payload(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

/// SEND_KB_MEDIA_DATA (0x03): one consumer-control usage byte.
///
/// A zero code releases the media key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MediaKey {
    pub code: u8,
}

impl MediaKey {
    pub fn new(code: u8) -> Self {
        Self { code }
    }

    pub fn release() -> Self {
        Self { code: 0 }
    }
}

impl Ch9329Command for MediaKey {
    const COMMAND: CommandType = CommandType::SendKeyboardMedia;

    fn payload(&self) -> Vec<u8> {
        vec![self.code]
    }
}

// =============================================================================
// Mouse
// =============================================================================

/// SEND_MS_ABS_DATA (0x04): `[buttons, x_lo, x_hi, y_lo, y_hi, wheel]`.
///
/// `x`/`y` are already in device space (0..=4095 for the stock descriptor);
/// see [`crate::protocol::absolute`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MouseAbsolute {
    pub buttons: u8,
    pub x: u16,
    pub y: u16,
    pub wheel: i8,
}

impl MouseAbsolute {
    pub fn new(buttons: u8, x: u16, y: u16) -> Self {
        Self {
            buttons,
            x,
            y,
            wheel: 0,
        }
    }

    pub fn wheel(mut self, wheel: i8) -> Self {
        self.wheel = wheel;
        self
    }
}

impl Ch9329Command for MouseAbsolute {
    const COMMAND: CommandType = CommandType::SendMouseAbsolute;

    fn payload(&self) -> Vec<u8> {
        let (x_lo, x_hi) = split_low_high(self.x);
        let (y_lo, y_hi) = split_low_high(self.y);
        vec![self.buttons, x_lo, x_hi, y_lo, y_hi, self.wheel as u8]
    }
}

/// SEND_MS_REL_DATA (0x05): `[buttons, dx, dy, wheel]`, each delta a
/// signed byte in [-127, 127].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MouseRelative {
    buttons: u8,
    dx: i8,
    dy: i8,
    wheel: i8,
}

impl MouseRelative {
    /// Build from in-range deltas. -128 saturates to -127.
    pub fn new(buttons: u8, dx: i8, dy: i8, wheel: i8) -> Self {
        Self::clamped(buttons, dx.into(), dy.into(), wheel.into()).0
    }

    /// Clamp arbitrary deltas into range, reporting which axes saturated.
    pub fn clamped(buttons: u8, dx: i32, dy: i32, wheel: i32) -> (Self, Clamped) {
        let (dx, cx) = clamp_signed_byte_checked(dx);
        let (dy, cy) = clamp_signed_byte_checked(dy);
        let (wheel, cw) = clamp_signed_byte_checked(wheel);
        (
            Self {
                buttons,
                dx,
                dy,
                wheel,
            },
            Clamped {
                x: cx,
                y: cy,
                wheel: cw,
            },
        )
    }

    /// Break a large motion into in-range reports whose deltas sum to the
    /// requested motion. Always yields at least one report.
    ///
    /// Motion needing more than [`MAX_RELATIVE_STEPS`] reports is refused
    /// up front; the steps themselves are produced lazily.
    pub fn split(
        buttons: u8,
        dx: i32,
        dy: i32,
        wheel: i32,
    ) -> Result<RelativeSteps, ProtocolError> {
        let steps = [dx, dy, wheel]
            .into_iter()
            .map(|v| i64::from(v).unsigned_abs().div_ceil(127))
            .max()
            .unwrap_or(0)
            .max(1);
        let steps = usize::try_from(steps).unwrap_or(usize::MAX);
        if steps > MAX_RELATIVE_STEPS {
            return Err(ProtocolError::MotionTooLarge {
                steps,
                max: MAX_RELATIVE_STEPS,
            });
        }
        Ok(RelativeSteps {
            buttons,
            remaining: (dx, dy, wheel),
            left: steps,
        })
    }

    pub fn buttons(&self) -> u8 {
        self.buttons
    }

    pub fn dx(&self) -> i8 {
        self.dx
    }

    pub fn dy(&self) -> i8 {
        self.dy
    }

    pub fn wheel(&self) -> i8 {
        self.wheel
    }
}

/// Reports produced by [`MouseRelative::split`]
#[derive(Debug, Clone)]
pub struct RelativeSteps {
    buttons: u8,
    remaining: (i32, i32, i32),
    left: usize,
}

impl Iterator for RelativeSteps {
    type Item = MouseRelative;

    fn next(&mut self) -> Option<MouseRelative> {
        if self.left == 0 {
            return None;
        }
        let (rx, ry, rw) = self.remaining;
        let step = MouseRelative {
            buttons: self.buttons,
            dx: clamp_signed_byte(rx),
            dy: clamp_signed_byte(ry),
            wheel: clamp_signed_byte(rw),
        };
        self.remaining = (
            rx - i32::from(step.dx),
            ry - i32::from(step.dy),
            rw - i32::from(step.wheel),
        );
        self.left -= 1;
        Some(step)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.left, Some(self.left))
    }
}

impl ExactSizeIterator for RelativeSteps {}

impl Ch9329Command for MouseRelative {
    const COMMAND: CommandType = CommandType::SendMouseRelative;

    fn payload(&self) -> Vec<u8> {
        vec![
            self.buttons,
            self.dx as u8,
            self.dy as u8,
            self.wheel as u8,
        ]
    }
}

// =============================================================================
// Custom HID
// =============================================================================

/// SEND_MY_HID_DATA (0x06): raw passthrough to the custom HID interface.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CustomHid {
    pub data: Vec<u8>,
}

impl Ch9329Command for CustomHid {
    const COMMAND: CommandType = CommandType::SendCustomHid;

    fn payload(&self) -> Vec<u8> {
        self.data.clone()
    }
}

/// READ_MY_HID_DATA (0x87): empty request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReadCustomHid;

impl Ch9329Command for ReadCustomHid {
    const COMMAND: CommandType = CommandType::ReadCustomHid;

    fn payload(&self) -> Vec<u8> {
        Vec::new()
    }
}

// =============================================================================
// Configuration and chip control
// =============================================================================

/// GET_INFO (0x01)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GetInfo;

impl Ch9329Command for GetInfo {
    const COMMAND: CommandType = CommandType::GetInfo;

    fn payload(&self) -> Vec<u8> {
        Vec::new()
    }
}

/// GET_PARA_CFG (0x08)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GetParamConfig;

impl Ch9329Command for GetParamConfig {
    const COMMAND: CommandType = CommandType::GetParamConfig;

    fn payload(&self) -> Vec<u8> {
        Vec::new()
    }
}

/// SET_PARA_CFG (0x09): caller-supplied configuration block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SetParamConfig {
    pub data: Vec<u8>,
}

impl Ch9329Command for SetParamConfig {
    const COMMAND: CommandType = CommandType::SetParamConfig;

    fn payload(&self) -> Vec<u8> {
        self.data.clone()
    }
}

/// GET_USB_STRING (0x0A): `[kind]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetUsbString {
    pub kind: UsbStringKind,
}

impl Ch9329Command for GetUsbString {
    const COMMAND: CommandType = CommandType::GetUsbString;

    fn payload(&self) -> Vec<u8> {
        vec![self.kind as u8]
    }
}

/// SET_USB_STRING (0x0B): `[kind, len, bytes..]`, at most 23 bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetUsbString {
    kind: UsbStringKind,
    value: Vec<u8>,
}

impl SetUsbString {
    pub fn new(kind: UsbStringKind, value: &[u8]) -> Result<Self, ProtocolError> {
        if value.len() > MAX_USB_STRING_LEN {
            return Err(ProtocolError::UsbStringTooLong { len: value.len() });
        }
        Ok(Self {
            kind,
            value: value.to_vec(),
        })
    }
}

impl Ch9329Command for SetUsbString {
    const COMMAND: CommandType = CommandType::SetUsbString;

    fn payload(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(2 + self.value.len());
        data.push(self.kind as u8);
        data.push(self.value.len() as u8);
        data.extend_from_slice(&self.value);
        data
    }
}

/// SET_DEFAULT_CFG (0x0C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RestoreDefaultConfig;

impl Ch9329Command for RestoreDefaultConfig {
    const COMMAND: CommandType = CommandType::RestoreDefaultConfig;

    fn payload(&self) -> Vec<u8> {
        Vec::new()
    }
}

/// RESET (0x0F)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResetChip;

impl Ch9329Command for ResetChip {
    const COMMAND: CommandType = CommandType::ResetChip;

    fn payload(&self) -> Vec<u8> {
        Vec::new()
    }
}

// =============================================================================
// Encoder functions
// =============================================================================

pub fn encode_get_info() -> Result<Packet, ProtocolError> {
    GetInfo.build()
}

/// General keyboard report: modifier mask plus up to six usage codes.
///
/// `encode_keyboard_general(0, &[])` is the release-all report.
pub fn encode_keyboard_general(modifiers: u8, keys: &[u8]) -> Result<Packet, ProtocolError> {
    KeyboardReport::new(modifiers, keys)?.build()
}

pub fn encode_keyboard_release() -> Result<Packet, ProtocolError> {
    KeyboardReport::RELEASE.build()
}

pub fn encode_keyboard_media(code: u8) -> Result<Packet, ProtocolError> {
    MediaKey::new(code).build()
}

pub fn encode_mouse_absolute(buttons: u8, x: u16, y: u16, wheel: i8) -> Result<Packet, ProtocolError> {
    MouseAbsolute::new(buttons, x, y).wheel(wheel).build()
}

/// Relative report with silent saturation to [-127, 127] per axis.
///
/// Motion beyond the range is lost; use [`encode_mouse_relative_reporting`]
/// or [`MouseRelative::split`] when that matters.
pub fn encode_mouse_relative(buttons: u8, dx: i32, dy: i32, wheel: i32) -> Result<Packet, ProtocolError> {
    MouseRelative::clamped(buttons, dx, dy, wheel).0.build()
}

/// Relative report plus which axes were saturated.
pub fn encode_mouse_relative_reporting(
    buttons: u8,
    dx: i32,
    dy: i32,
    wheel: i32,
) -> Result<(Packet, Clamped), ProtocolError> {
    let (report, clamped) = MouseRelative::clamped(buttons, dx, dy, wheel);
    Ok((report.build()?, clamped))
}

pub fn encode_custom_hid(data: &[u8]) -> Result<Packet, ProtocolError> {
    CustomHid {
        data: data.to_vec(),
    }
    .build()
}

pub fn encode_read_custom_hid() -> Result<Packet, ProtocolError> {
    ReadCustomHid.build()
}

pub fn encode_get_param_config() -> Result<Packet, ProtocolError> {
    GetParamConfig.build()
}

pub fn encode_set_param_config(data: &[u8]) -> Result<Packet, ProtocolError> {
    SetParamConfig {
        data: data.to_vec(),
    }
    .build()
}

pub fn encode_get_usb_string(kind: UsbStringKind) -> Result<Packet, ProtocolError> {
    GetUsbString { kind }.build()
}

pub fn encode_set_usb_string(kind: UsbStringKind, value: &[u8]) -> Result<Packet, ProtocolError> {
    SetUsbString::new(kind, value)?.build()
}

pub fn encode_restore_default_config() -> Result<Packet, ProtocolError> {
    RestoreDefaultConfig.build()
}

pub fn encode_reset_chip() -> Result<Packet, ProtocolError> {
    ResetChip.build()
}

// =============================================================================
// Packet decoding (printer, tests, capture analysis)
// =============================================================================

/// A request frame decoded back into its typed meaning
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ParsedCommand {
    GetInfo,
    KeyboardGeneral { modifiers: u8, keys: Vec<u8> },
    KeyboardMedia { data: Vec<u8> },
    MouseAbsolute { buttons: u8, x: u16, y: u16, wheel: i8 },
    MouseRelative { buttons: u8, dx: i8, dy: i8, wheel: i8 },
    CustomHid { data: Vec<u8> },
    ReadCustomHid { data: Vec<u8> },
    GetParamConfig,
    SetParamConfig { data: Vec<u8> },
    GetUsbString { kind: u8 },
    SetUsbString { kind: u8, value: String },
    RestoreDefaultConfig,
    ResetChip,
}

impl ParsedCommand {
    /// Whether this command belongs to the keyboard family
    pub fn is_keyboard(&self) -> bool {
        matches!(self, Self::KeyboardGeneral { .. } | Self::KeyboardMedia { .. })
    }

    /// Whether this command belongs to the mouse family
    pub fn is_mouse(&self) -> bool {
        matches!(self, Self::MouseAbsolute { .. } | Self::MouseRelative { .. })
    }
}

fn expect_len(command: CommandType, data: &[u8], len: usize) -> Result<(), ParseError> {
    if data.len() == len {
        Ok(())
    } else {
        Err(ParseError::InvalidPayload {
            command: command.name(),
            len: data.len(),
        })
    }
}

/// Decode a framed request packet into a [`ParsedCommand`].
pub fn try_parse_command(bytes: &[u8]) -> Result<ParsedCommand, ParseError> {
    let frame = Frame::parse(bytes)?;
    let command =
        CommandType::from_code(frame.command).ok_or(ParseError::UnknownCommand(frame.command))?;
    let data = frame.payload;

    let parsed = match command {
        CommandType::GetInfo => ParsedCommand::GetInfo,
        CommandType::SendKeyboardGeneral => {
            let report = KeyboardReport::read_from_bytes(&data).map_err(|_| {
                ParseError::InvalidPayload {
                    command: command.name(),
                    len: data.len(),
                }
            })?;
            ParsedCommand::KeyboardGeneral {
                modifiers: report.modifiers(),
                keys: report.pressed().collect(),
            }
        }
        CommandType::SendKeyboardMedia => ParsedCommand::KeyboardMedia { data },
        CommandType::SendMouseAbsolute => {
            expect_len(command, &data, 6)?;
            ParsedCommand::MouseAbsolute {
                buttons: data[0],
                x: u16::from_le_bytes([data[1], data[2]]),
                y: u16::from_le_bytes([data[3], data[4]]),
                wheel: data[5] as i8,
            }
        }
        CommandType::SendMouseRelative => {
            expect_len(command, &data, 4)?;
            ParsedCommand::MouseRelative {
                buttons: data[0],
                dx: data[1] as i8,
                dy: data[2] as i8,
                wheel: data[3] as i8,
            }
        }
        CommandType::SendCustomHid => ParsedCommand::CustomHid { data },
        CommandType::ReadCustomHid => ParsedCommand::ReadCustomHid { data },
        CommandType::GetParamConfig => ParsedCommand::GetParamConfig,
        CommandType::SetParamConfig => ParsedCommand::SetParamConfig { data },
        CommandType::GetUsbString => {
            expect_len(command, &data, 1)?;
            ParsedCommand::GetUsbString { kind: data[0] }
        }
        CommandType::SetUsbString => {
            if data.len() < 2 || data.len() != 2 + data[1] as usize {
                return Err(ParseError::InvalidPayload {
                    command: command.name(),
                    len: data.len(),
                });
            }
            ParsedCommand::SetUsbString {
                kind: data[0],
                value: String::from_utf8_lossy(&data[2..]).into_owned(),
            }
        }
        CommandType::RestoreDefaultConfig => ParsedCommand::RestoreDefaultConfig,
        CommandType::ResetChip => ParsedCommand::ResetChip,
    };
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{buttons, mods};

    fn sum(bytes: &[u8]) -> u8 {
        bytes.iter().fold(0u8, |a, &b| a.wrapping_add(b))
    }

    #[test]
    fn test_keyboard_press_a_literal() {
        let packet = encode_keyboard_general(0, &[0x04]).unwrap();
        let head = [
            0x57, 0xAB, 0x00, 0x02, 0x08, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00,
        ];
        let mut expected = head.to_vec();
        expected.push(sum(&head));
        assert_eq!(packet.as_bytes(), expected.as_slice());
        assert_eq!(packet.payload_len(), 8);
    }

    #[test]
    fn test_keyboard_release_is_all_zero() {
        let packet = encode_keyboard_general(0, &[]).unwrap();
        assert_eq!(packet.payload(), &[0u8; 8]);
        assert_eq!(packet, encode_keyboard_release().unwrap());
    }

    #[test]
    fn test_keyboard_six_slots_and_modifiers() {
        let keys = [0x04, 0x05, 0x06, 0x07, 0x08, 0x09];
        let packet = encode_keyboard_general(mods::LCTRL | mods::RSHIFT, &keys).unwrap();
        assert_eq!(
            packet.payload(),
            &[0x21, 0x00, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09]
        );
    }

    #[test]
    fn test_keyboard_rejects_seven_keys() {
        assert_eq!(
            encode_keyboard_general(0, &[1, 2, 3, 4, 5, 6, 7]),
            Err(ProtocolError::TooManyKeys { count: 7 })
        );
    }

    #[test]
    fn test_media_key() {
        let packet = encode_keyboard_media(0xE9).unwrap();
        assert_eq!(packet.command(), CommandType::SendKeyboardMedia);
        assert_eq!(packet.payload(), &[0xE9]);
        assert_eq!(MediaKey::release().payload(), vec![0]);
    }

    #[test]
    fn test_mouse_absolute_layout() {
        let packet = encode_mouse_absolute(buttons::LEFT, 0x0123, 4095, -1).unwrap();
        assert_eq!(packet.payload(), &[0x01, 0x23, 0x01, 0xFF, 0x0F, 0xFF]);
    }

    #[test]
    fn test_mouse_relative_clamps_not_errors() {
        let packet = encode_mouse_relative(0, 300, -5, 0).unwrap();
        assert_eq!(packet.command(), CommandType::SendMouseRelative);
        assert_eq!(packet.payload(), &[0x00, 127, (-5i8) as u8, 0x00]);
    }

    #[test]
    fn test_mouse_relative_reporting() {
        let (packet, clamped) = encode_mouse_relative_reporting(0, 300, -5, -400).unwrap();
        assert_eq!(packet.payload()[1], 127);
        assert_eq!(packet.payload()[3], (-127i8) as u8);
        assert_eq!(
            clamped,
            Clamped {
                x: true,
                y: false,
                wheel: true
            }
        );

        let (_, clamped) = encode_mouse_relative_reporting(0, 10, 10, 0).unwrap();
        assert!(!clamped.any());
    }

    #[test]
    fn test_mouse_relative_new_avoids_minus_128() {
        let report = MouseRelative::new(0, -128, 5, 0);
        assert_eq!(report.dx(), -127);
    }

    #[test]
    fn test_mouse_relative_split() {
        let steps: Vec<_> = MouseRelative::split(buttons::LEFT, 300, -5, 0)
            .unwrap()
            .collect();
        assert_eq!(steps.len(), 3);
        let total_x: i32 = steps.iter().map(|s| i32::from(s.dx())).sum();
        let total_y: i32 = steps.iter().map(|s| i32::from(s.dy())).sum();
        assert_eq!((total_x, total_y), (300, -5));
        assert!(steps.iter().all(|s| s.buttons() == buttons::LEFT));

        let still = MouseRelative::split(0, 0, 0, 0).unwrap();
        assert_eq!(still.len(), 1);
    }

    #[test]
    fn test_mouse_relative_split_cap() {
        // 64 full steps is the most one motion may take
        let edge = MouseRelative::split(0, 127 * 64, -127 * 64, 0).unwrap();
        assert_eq!(edge.len(), MAX_RELATIVE_STEPS);
        assert!(edge.clone().all(|s| s.dx() == 127 && s.dy() == -127));

        assert_eq!(
            MouseRelative::split(0, 127 * 64 + 1, 0, 0).unwrap_err(),
            ProtocolError::MotionTooLarge {
                steps: 65,
                max: MAX_RELATIVE_STEPS
            }
        );
        assert!(matches!(
            MouseRelative::split(0, i32::MAX, 0, 0),
            Err(ProtocolError::MotionTooLarge { .. })
        ));
        assert!(matches!(
            MouseRelative::split(0, 0, 0, i32::MIN),
            Err(ProtocolError::MotionTooLarge { .. })
        ));
    }

    #[test]
    fn test_usb_string() {
        let packet = encode_set_usb_string(UsbStringKind::Product, b"KVM").unwrap();
        assert_eq!(packet.payload(), &[0x01, 3, b'K', b'V', b'M']);
        assert_eq!(
            encode_set_usb_string(UsbStringKind::Serial, &[b'x'; 24]),
            Err(ProtocolError::UsbStringTooLong { len: 24 })
        );
        let get = encode_get_usb_string(UsbStringKind::Manufacturer).unwrap();
        assert_eq!(get.payload(), &[0x00]);
    }

    #[test]
    fn test_fixed_payload_commands() {
        for (packet, cmd) in [
            (encode_get_info(), CommandType::GetInfo),
            (encode_read_custom_hid(), CommandType::ReadCustomHid),
            (encode_get_param_config(), CommandType::GetParamConfig),
            (encode_restore_default_config(), CommandType::RestoreDefaultConfig),
            (encode_reset_chip(), CommandType::ResetChip),
        ] {
            let packet = packet.unwrap();
            assert_eq!(packet.command(), cmd);
            assert_eq!(packet.payload_len(), 0);
            assert_eq!(packet.len(), 6);
        }
    }

    #[test]
    fn test_custom_hid_too_large() {
        assert_eq!(
            encode_custom_hid(&[0u8; 300]),
            Err(ProtocolError::PayloadTooLarge { len: 300 })
        );
        assert_eq!(
            encode_set_param_config(&[1, 2, 3]).unwrap().payload(),
            &[1, 2, 3]
        );
    }

    #[test]
    fn test_encoders_are_idempotent() {
        assert_eq!(
            encode_keyboard_general(mods::LSHIFT, &[0x04]),
            encode_keyboard_general(mods::LSHIFT, &[0x04])
        );
        assert_eq!(
            encode_mouse_relative(1, 500, 500, 3),
            encode_mouse_relative(1, 500, 500, 3)
        );
        assert_eq!(
            encode_mouse_absolute(0, 100, 200, 0),
            encode_mouse_absolute(0, 100, 200, 0)
        );
    }

    #[test]
    fn test_try_parse_keyboard() {
        let packet = encode_keyboard_general(mods::LSHIFT, &[0x04, 0x05]).unwrap();
        assert_eq!(
            try_parse_command(packet.as_bytes()).unwrap(),
            ParsedCommand::KeyboardGeneral {
                modifiers: mods::LSHIFT,
                keys: vec![0x04, 0x05]
            }
        );
    }

    #[test]
    fn test_try_parse_mouse() {
        let abs = encode_mouse_absolute(buttons::RIGHT, 2048, 1024, 0).unwrap();
        assert_eq!(
            try_parse_command(abs.as_bytes()).unwrap(),
            ParsedCommand::MouseAbsolute {
                buttons: buttons::RIGHT,
                x: 2048,
                y: 1024,
                wheel: 0
            }
        );
        let rel = encode_mouse_relative(0, -20, 30, -1).unwrap();
        assert_eq!(
            try_parse_command(rel.as_bytes()).unwrap(),
            ParsedCommand::MouseRelative {
                buttons: 0,
                dx: -20,
                dy: 30,
                wheel: -1
            }
        );
    }

    #[test]
    fn test_try_parse_rejects_wrong_length() {
        let bad = Packet::build(CommandType::SendMouseRelative, &[0, 1]).unwrap();
        assert!(matches!(
            try_parse_command(bad.as_bytes()),
            Err(ParseError::InvalidPayload { len: 2, .. })
        ));
        let bad = Packet::build(CommandType::SendKeyboardGeneral, &[0; 7]).unwrap();
        assert!(try_parse_command(bad.as_bytes()).is_err());
    }

    #[test]
    fn test_try_parse_usb_string() {
        let packet = encode_set_usb_string(UsbStringKind::Manufacturer, b"WCH").unwrap();
        assert_eq!(
            try_parse_command(packet.as_bytes()).unwrap(),
            ParsedCommand::SetUsbString {
                kind: 0,
                value: "WCH".into()
            }
        );
    }
}
