//! Protocol constants for the CH9329 serial command interface
//!
//! Frame layout:
//!
//! ```text
//! ┌───────┬──────┬─────┬─────┬──────────────┬──────────┐
//! │ 57 AB │ ADDR │ CMD │ LEN │   LEN bytes  │   SUM    │
//! └───────┴──────┴─────┴─────┴──────────────┴──────────┘
//! ```
//!
//! `SUM` is the sum of every preceding byte, header included, modulo 256.

/// Fixed frame header
pub const HEADER: [u8; 2] = [0x57, 0xAB];

/// Default device address. The chip answers on 0x00 regardless of its
/// configured address.
pub const DEFAULT_ADDRESS: u8 = 0x00;

/// Bytes before the payload: header(2) + addr(1) + cmd(1) + len(1)
pub const PREAMBLE_LEN: usize = 5;

/// Smallest legal frame: preamble + checksum, empty payload
pub const MIN_FRAME_LEN: usize = PREAMBLE_LEN + 1;

/// Payload length must fit in the one-byte LEN field
pub const MAX_PAYLOAD_LEN: usize = 255;

/// Number of key slots in a general keyboard report
pub const KEY_SLOTS: usize = 6;

/// Longest string the chip stores per USB string descriptor
pub const MAX_USB_STRING_LEN: usize = 23;

/// Most reports one split relative motion may expand into (±8128 per axis)
pub const MAX_RELATIVE_STEPS: usize = 64;

/// Reply command bits: success = cmd | 0x80, error = cmd | 0xC0
pub mod reply {
    pub const SUCCESS_FLAG: u8 = 0x80;
    pub const ERROR_FLAG: u8 = 0xC0;
}

/// Absolute pointer coordinate space
pub mod absolute {
    /// Addressable positions per axis
    pub const RESOLUTION: u32 = 4096;
    /// Largest coordinate value
    pub const MAX: u16 = 4095;
}

/// Mouse button bits
pub mod buttons {
    pub const LEFT: u8 = 0x01;
    pub const RIGHT: u8 = 0x02;
    pub const MIDDLE: u8 = 0x04;
}

/// Keyboard modifier bits (byte 0 of the general report)
pub mod mods {
    pub const LCTRL: u8 = 0x01;
    pub const LSHIFT: u8 = 0x02;
    pub const LALT: u8 = 0x04;
    pub const LGUI: u8 = 0x08;
    pub const RCTRL: u8 = 0x10;
    pub const RSHIFT: u8 = 0x20;
    pub const RALT: u8 = 0x40;
    pub const RGUI: u8 = 0x80;
}

/// Serial timing defaults
pub mod timing {
    /// Factory default UART baud rate
    pub const DEFAULT_BAUD_RATE: u32 = 9600;
    /// How long to wait for a reply frame
    pub const RESPONSE_TIMEOUT_MS: u64 = 500;
    /// Time the chip needs to come back after RESET
    pub const RESET_WAIT_MS: u64 = 2000;
}

/// Compute the trailing checksum over everything that precedes it.
pub fn checksum(frame_without_sum: &[u8]) -> u8 {
    crate::bytes::wrapping_sum(frame_without_sum)
}
