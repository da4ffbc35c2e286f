//! Protocol layer for the WCH CH9329 UART-to-USB-HID bridge
//!
//! The CH9329 enumerates as a USB keyboard and mouse on the target machine
//! and takes its input reports as framed packets over a UART. This crate
//! provides:
//!
//! - The frame format and checksum ([`Packet`])
//! - Typed command builders and `encode_*` helpers ([`command`])
//! - Reply parsing and a stream decoder ([`response`])
//! - Transports: serial port, in-memory, and a printing middleware

pub mod bytes;
pub mod command;
pub mod error;
pub mod packet;
pub mod printer;
pub mod protocol;
pub mod response;
pub mod serial;
pub mod transport;
pub mod types;

pub use bytes::{clamp_signed_byte, clamp_signed_byte_checked, split_low_high};
pub use command::{
    encode_custom_hid,
    encode_get_info,
    encode_get_param_config,
    encode_get_usb_string,
    encode_keyboard_general,
    encode_keyboard_media,
    encode_keyboard_release,
    encode_mouse_absolute,
    encode_mouse_relative,
    encode_mouse_relative_reporting,
    encode_read_custom_hid,
    encode_reset_chip,
    encode_restore_default_config,
    encode_set_param_config,
    encode_set_usb_string,
    // Packet parsing
    try_parse_command,
    Ch9329Command,
    CustomHid,
    GetInfo,
    GetParamConfig,
    GetUsbString,
    KeyboardReport,
    MediaKey,
    MouseAbsolute,
    MouseRelative,
    ParsedCommand,
    ReadCustomHid,
    RelativeSteps,
    ResetChip,
    RestoreDefaultConfig,
    SetParamConfig,
    SetUsbString,
};
pub use error::{ParseError, ProtocolError, TransportError};
pub use packet::Packet;
pub use printer::{DecodedPacket, OutputFormat, PacketFilter, PrinterConfig, PrinterTransport};
pub use response::{ChipInfo, FrameDecoder, ResponseFrame, Status};
pub use serial::{available_ports, PortEntry, SerialTransport};
pub use transport::{MemoryTransport, Transport};
pub use types::{Clamped, CommandType, UsbStringKind};
