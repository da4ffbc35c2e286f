//! Common types for the CH9329 command protocol

use std::fmt;

use serde::Serialize;

/// CH9329 command codes
///
/// Every variant carries a fixed one-byte wire code. Codes are never shared
/// between two variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum CommandType {
    /// Chip version, USB enumeration state and keyboard LEDs
    GetInfo = 0x01,
    /// Standard 8-byte keyboard report
    SendKeyboardGeneral = 0x02,
    /// Consumer-control (multimedia) keys
    SendKeyboardMedia = 0x03,
    /// Absolute pointer report
    SendMouseAbsolute = 0x04,
    /// Relative pointer report
    SendMouseRelative = 0x05,
    /// Custom HID passthrough
    SendCustomHid = 0x06,
    /// Custom HID data read back from the host side
    ReadCustomHid = 0x87,
    GetParamConfig = 0x08,
    SetParamConfig = 0x09,
    GetUsbString = 0x0A,
    SetUsbString = 0x0B,
    /// Restore factory default configuration
    RestoreDefaultConfig = 0x0C,
    /// Software reset
    ResetChip = 0x0F,
}

impl CommandType {
    /// All command types in wire-code order.
    pub const ALL: [CommandType; 13] = [
        CommandType::GetInfo,
        CommandType::SendKeyboardGeneral,
        CommandType::SendKeyboardMedia,
        CommandType::SendMouseAbsolute,
        CommandType::SendMouseRelative,
        CommandType::SendCustomHid,
        CommandType::GetParamConfig,
        CommandType::SetParamConfig,
        CommandType::GetUsbString,
        CommandType::SetUsbString,
        CommandType::RestoreDefaultConfig,
        CommandType::ResetChip,
        CommandType::ReadCustomHid,
    ];

    /// Wire code placed at offset 3 of a packet
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Look up a command by its wire code
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.code() == code)
    }

    /// Get human-readable name for the command
    pub fn name(self) -> &'static str {
        match self {
            CommandType::GetInfo => "GET_INFO",
            CommandType::SendKeyboardGeneral => "SEND_KB_GENERAL_DATA",
            CommandType::SendKeyboardMedia => "SEND_KB_MEDIA_DATA",
            CommandType::SendMouseAbsolute => "SEND_MS_ABS_DATA",
            CommandType::SendMouseRelative => "SEND_MS_REL_DATA",
            CommandType::SendCustomHid => "SEND_MY_HID_DATA",
            CommandType::ReadCustomHid => "READ_MY_HID_DATA",
            CommandType::GetParamConfig => "GET_PARA_CFG",
            CommandType::SetParamConfig => "SET_PARA_CFG",
            CommandType::GetUsbString => "GET_USB_STRING",
            CommandType::SetUsbString => "SET_USB_STRING",
            CommandType::RestoreDefaultConfig => "SET_DEFAULT_CFG",
            CommandType::ResetChip => "RESET",
        }
    }

    /// Whether this command injects HID input on the USB side
    pub fn is_input(self) -> bool {
        matches!(
            self,
            CommandType::SendKeyboardGeneral
                | CommandType::SendKeyboardMedia
                | CommandType::SendMouseAbsolute
                | CommandType::SendMouseRelative
        )
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which USB string descriptor a GET/SET_USB_STRING command addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum UsbStringKind {
    Manufacturer = 0x00,
    Product = 0x01,
    Serial = 0x02,
}

impl UsbStringKind {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0x00 => Some(Self::Manufacturer),
            0x01 => Some(Self::Product),
            0x02 => Some(Self::Serial),
            _ => None,
        }
    }
}

/// Which relative-motion axes were saturated while encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Clamped {
    pub x: bool,
    pub y: bool,
    pub wheel: bool,
}

impl Clamped {
    /// True if any axis lost motion to clamping
    pub fn any(&self) -> bool {
        self.x || self.y || self.wheel
    }
}
