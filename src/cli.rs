// CLI definitions using clap

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mini-kvm")]
#[command(author, version, about = "Keyboard and mouse injection through a CH9329 bridge")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Serial port of the CH9329 (auto-detected when omitted)
    #[arg(short, long, global = true, value_name = "PATH")]
    pub port: Option<String>,

    /// UART baud rate
    #[arg(short, long, global = true)]
    pub baud: Option<u32>,

    /// Config file (default: ~/.config/mini-kvm/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Don't open a port; print the packets that would be sent
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Enable transport monitoring (prints all commands/responses)
    #[arg(long, global = true)]
    pub monitor: bool,

    /// Show raw hex dump alongside decoded output
    #[arg(long, global = true)]
    pub hex: bool,

    /// Machine-readable output (JSON lines)
    #[arg(long, global = true)]
    pub json: bool,

    /// Filter monitor output (all, keyboard, mouse, cmd=0xNN)
    #[arg(long, global = true)]
    pub filter: Option<String>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    // === Device Commands ===
    /// List serial ports (CH9329 adapters are marked)
    #[command(visible_aliases = ["list", "ls"])]
    Ports {
        /// Include ports that don't look like a WCH adapter
        #[arg(short, long)]
        all: bool,
    },

    /// Query chip version, USB state and lock LEDs
    #[command(visible_aliases = ["version", "ver"])]
    Info,

    /// Release every key and mouse button on the target
    #[command(visible_alias = "r")]
    Release,

    /// Software-reset the chip
    Reset,

    /// Restore the chip's factory configuration (baud rate, address, USB strings)
    FactoryReset {
        /// Skip the confirmation requirement
        #[arg(long)]
        yes: bool,
    },

    /// Read or set a USB string descriptor
    #[command(visible_alias = "usb")]
    UsbString {
        /// Which descriptor
        #[arg(value_enum)]
        kind: StringKindArg,
        /// New value (ASCII, up to 23 bytes); omit to read
        value: Option<String>,
    },

    // === Keyboard Commands ===
    /// Type text character by character
    #[command(visible_alias = "t")]
    Type {
        /// Text to type
        text: String,
        /// Delay between characters in ms (overrides config)
        #[arg(short, long)]
        delay: Option<u64>,
    },

    /// Press a key or chord (e.g. Enter, Ctrl+Alt+Delete, Shift+F10)
    #[command(visible_aliases = ["k", "chord"])]
    Key {
        /// Key or chord
        chord: String,
        /// Hold time in ms before releasing
        #[arg(long, default_value_t = 0)]
        hold: u64,
    },

    /// Press a media key (mute, volup, voldown, play, next, prev, stop or a code)
    #[command(visible_alias = "m")]
    Media {
        /// Media key name or usage code
        code: String,
    },

    // === Mouse Commands ===
    /// Move the pointer relative to its position
    #[command(visible_alias = "mv")]
    Move {
        #[arg(allow_hyphen_values = true)]
        dx: i32,
        #[arg(allow_hyphen_values = true)]
        dy: i32,
        /// Clamp to one report instead of splitting large moves
        #[arg(long)]
        no_split: bool,
    },

    /// Move the pointer to a pixel position on the target screen
    #[command(visible_aliases = ["abs", "goto"])]
    MoveAbs {
        x: i64,
        y: i64,
    },

    /// Click a mouse button
    #[command(visible_alias = "c")]
    Click {
        /// left, right or middle
        #[arg(default_value = "left")]
        button: String,
        /// Number of clicks
        #[arg(short = 'n', long, default_value_t = 1)]
        count: u32,
    },

    /// Scroll the wheel (positive is up)
    #[command(visible_alias = "wheel")]
    Scroll {
        #[arg(allow_hyphen_values = true)]
        delta: i32,
    },

    // === Streaming ===
    /// Read input intents line by line from stdin
    Relay,

    // === Offline ===
    /// Print the packet for a command without touching a device
    #[command(subcommand, visible_alias = "enc")]
    Encode(EncodeCommands),
}

/// USB string descriptor selector
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum StringKindArg {
    Manufacturer,
    Product,
    Serial,
}

#[derive(Subcommand)]
pub enum EncodeCommands {
    /// GET_INFO
    Info,
    /// Keyboard report for a key or chord
    Key { chord: String },
    /// All-keys-released keyboard report
    Release,
    /// Media key report
    Media { code: String },
    /// Absolute mouse report (coordinates 0-4095)
    Abs {
        x: u16,
        y: u16,
        #[arg(long, default_value_t = 0)]
        buttons: u8,
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        wheel: i8,
    },
    /// Relative mouse report (values clamp to +-127)
    Rel {
        #[arg(allow_hyphen_values = true)]
        dx: i32,
        #[arg(allow_hyphen_values = true)]
        dy: i32,
        #[arg(long, default_value_t = 0)]
        buttons: u8,
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        wheel: i32,
    },
    /// Custom HID data (hex bytes)
    CustomHid { data: Vec<String> },
    /// Read custom HID data
    ReadCustomHid,
    /// Read the parameter configuration
    GetConfig,
    /// Write the parameter configuration (hex bytes)
    SetConfig { data: Vec<String> },
    /// Read a USB string descriptor
    GetUsbString {
        #[arg(value_enum)]
        kind: StringKindArg,
    },
    /// Write a USB string descriptor
    SetUsbString {
        #[arg(value_enum)]
        kind: StringKindArg,
        value: String,
    },
    /// Restore factory configuration
    RestoreDefaults,
    /// Software reset
    Reset,
}

impl From<StringKindArg> for ch9329_protocol::UsbStringKind {
    fn from(kind: StringKindArg) -> Self {
        match kind {
            StringKindArg::Manufacturer => Self::Manufacturer,
            StringKindArg::Product => Self::Product,
            StringKindArg::Serial => Self::Serial,
        }
    }
}
