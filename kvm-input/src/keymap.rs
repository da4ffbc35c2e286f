//! Key identifier to HID usage code table
//!
//! Identifiers are either a single printable character (`"a"`, `"A"`, `"!"`,
//! `"\n"`) or a named key as reported by browser-style keyboard events
//! (`"Enter"`, `"ArrowUp"`, `"F5"`, `"Control"`). Characters that need Shift
//! share the usage code of their unshifted key and carry `shift = true`.
//!
//! The table is built once and never mutated.

use std::collections::HashMap;
use std::sync::OnceLock;

use ch9329_protocol::protocol::mods;

use crate::error::InputError;

/// One table entry: HID usage code and whether Shift must be held
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEntry {
    pub usage: u8,
    pub shift: bool,
}

impl KeyEntry {
    const fn plain(usage: u8) -> Self {
        Self {
            usage,
            shift: false,
        }
    }

    const fn shifted(usage: u8) -> Self {
        Self { usage, shift: true }
    }

    /// Whether the usage code is a modifier (0xE0..=0xE7)
    pub fn is_modifier(&self) -> bool {
        is_modifier(self.usage)
    }
}

/// Named keys, unshifted punctuation and whitespace aliases. The first
/// name listed for a usage code is its display name.
const NAMED: &[(&str, u8)] = &[
    ("Enter", 0x28),
    ("\n", 0x28),
    ("Escape", 0x29),
    ("Backspace", 0x2A),
    ("\u{8}", 0x2A),
    ("Tab", 0x2B),
    ("\t", 0x2B),
    ("Space", 0x2C),
    (" ", 0x2C),
    ("-", 0x2D),
    ("=", 0x2E),
    ("[", 0x2F),
    ("]", 0x30),
    ("\\", 0x31),
    (";", 0x33),
    ("'", 0x34),
    ("`", 0x35),
    (",", 0x36),
    (".", 0x37),
    ("/", 0x38),
    ("CapsLock", 0x39),
    ("PrintScreen", 0x46),
    ("ScrollLock", 0x47),
    ("Pause", 0x48),
    ("Insert", 0x49),
    ("Home", 0x4A),
    ("PageUp", 0x4B),
    ("Delete", 0x4C),
    ("End", 0x4D),
    ("PageDown", 0x4E),
    ("ArrowRight", 0x4F),
    ("ArrowLeft", 0x50),
    ("ArrowDown", 0x51),
    ("ArrowUp", 0x52),
    ("NumLock", 0x53),
    ("ContextMenu", 0x65),
    ("Control", 0xE0),
    ("Shift", 0xE1),
    ("Alt", 0xE2),
    ("Meta", 0xE3),
];

/// Shifted symbols and the usage code of the key that produces them
const SHIFTED: &[(&str, u8)] = &[
    ("!", 0x1E),
    ("@", 0x1F),
    ("#", 0x20),
    ("$", 0x21),
    ("%", 0x22),
    ("^", 0x23),
    ("&", 0x24),
    ("*", 0x25),
    ("(", 0x26),
    (")", 0x27),
    ("_", 0x2D),
    ("+", 0x2E),
    ("{", 0x2F),
    ("}", 0x30),
    ("|", 0x31),
    (":", 0x33),
    ("\"", 0x34),
    ("~", 0x35),
    ("<", 0x36),
    (">", 0x37),
    ("?", 0x38),
];

const FUNCTION_KEYS: [&str; 12] = [
    "F1", "F2", "F3", "F4", "F5", "F6", "F7", "F8", "F9", "F10", "F11", "F12",
];

struct KeyTable {
    by_name: HashMap<String, KeyEntry>,
    names: HashMap<u8, &'static str>,
}

static TABLE: OnceLock<KeyTable> = OnceLock::new();

fn table() -> &'static KeyTable {
    TABLE.get_or_init(build_table)
}

fn build_table() -> KeyTable {
    let mut by_name = HashMap::new();
    let mut names: HashMap<u8, &'static str> = HashMap::new();

    // Letters: lowercase plain, uppercase shifted
    for (i, c) in ('a'..='z').enumerate() {
        let usage = 0x04 + i as u8;
        by_name.insert(c.to_string(), KeyEntry::plain(usage));
        by_name.insert(c.to_ascii_uppercase().to_string(), KeyEntry::shifted(usage));
    }

    // Digits 1-9 then 0
    for (i, c) in ('1'..='9').chain(std::iter::once('0')).enumerate() {
        by_name.insert(c.to_string(), KeyEntry::plain(0x1E + i as u8));
    }

    for (i, name) in FUNCTION_KEYS.iter().enumerate() {
        let usage = 0x3A + i as u8;
        by_name.insert((*name).to_string(), KeyEntry::plain(usage));
        names.insert(usage, *name);
    }

    for &(name, usage) in NAMED {
        by_name.insert(name.to_string(), KeyEntry::plain(usage));
        names.entry(usage).or_insert(name);
    }

    for &(name, usage) in SHIFTED {
        by_name.insert(name.to_string(), KeyEntry::shifted(usage));
    }

    KeyTable { by_name, names }
}

/// Look up a key identifier.
///
/// Letters are case-sensitive. Unknown identifiers are an error; nothing is
/// guessed.
pub fn lookup(key: &str) -> Result<KeyEntry, InputError> {
    table()
        .by_name
        .get(key)
        .copied()
        .ok_or_else(|| InputError::UnmappedKey(key.to_string()))
}

/// Look up a named key ignoring ASCII case (`"pageup"` finds `"PageUp"`).
///
/// Only multi-character names are matched; single characters stay
/// case-sensitive.
pub fn lookup_ignore_case(name: &str) -> Result<KeyEntry, InputError> {
    NAMED
        .iter()
        .copied()
        .chain(FUNCTION_KEYS.iter().enumerate().map(|(i, n)| (*n, 0x3A + i as u8)))
        .find(|(n, _)| n.len() > 1 && n.eq_ignore_ascii_case(name))
        .map(|(_, usage)| KeyEntry::plain(usage))
        .ok_or_else(|| InputError::UnmappedKey(name.to_string()))
}

/// Look up a single character
pub fn lookup_char(c: char) -> Result<KeyEntry, InputError> {
    let mut buf = [0u8; 4];
    lookup(c.encode_utf8(&mut buf))
}

/// Display name for a usage code, e.g. `0x28` -> `"Enter"`, `0x04` -> `"A"`
pub fn usage_name(usage: u8) -> Option<&'static str> {
    const LETTERS: [&str; 26] = [
        "A", "B", "C", "D", "E", "F", "G", "H", "I", "J", "K", "L", "M", "N", "O", "P", "Q", "R",
        "S", "T", "U", "V", "W", "X", "Y", "Z",
    ];
    const DIGITS: [&str; 10] = ["1", "2", "3", "4", "5", "6", "7", "8", "9", "0"];
    match usage {
        0x04..=0x1D => Some(LETTERS[(usage - 0x04) as usize]),
        0x1E..=0x27 => Some(DIGITS[(usage - 0x1E) as usize]),
        0xE4 => Some("RControl"),
        0xE5 => Some("RShift"),
        0xE6 => Some("RAlt"),
        0xE7 => Some("RMeta"),
        _ => table().names.get(&usage).copied(),
    }
}

/// Whether a usage code is a modifier key (0xE0..=0xE7)
pub fn is_modifier(usage: u8) -> bool {
    (0xE0..=0xE7).contains(&usage)
}

/// Convert a modifier usage code to its modifier-mask bit.
pub fn modifier_bit(usage: u8) -> Option<u8> {
    match usage {
        0xE0 => Some(mods::LCTRL),
        0xE1 => Some(mods::LSHIFT),
        0xE2 => Some(mods::LALT),
        0xE3 => Some(mods::LGUI),
        0xE4 => Some(mods::RCTRL),
        0xE5 => Some(mods::RSHIFT),
        0xE6 => Some(mods::RALT),
        0xE7 => Some(mods::RGUI),
        _ => None,
    }
}

/// Consumer-control usages reachable through the one-byte media report
pub mod media {
    pub const NEXT_TRACK: u8 = 0xB5;
    pub const PREV_TRACK: u8 = 0xB6;
    pub const STOP: u8 = 0xB7;
    pub const PLAY_PAUSE: u8 = 0xCD;
    pub const MUTE: u8 = 0xE2;
    pub const VOLUME_UP: u8 = 0xE9;
    pub const VOLUME_DOWN: u8 = 0xEA;

    /// Parse a media key name (case-insensitive) or a hex/decimal code.
    pub fn parse(s: &str) -> Option<u8> {
        let lower = s.trim().to_ascii_lowercase();
        let code = match lower.as_str() {
            "next" | "nexttrack" => NEXT_TRACK,
            "prev" | "previous" | "prevtrack" => PREV_TRACK,
            "stop" => STOP,
            "play" | "pause" | "playpause" => PLAY_PAUSE,
            "mute" => MUTE,
            "volup" | "volumeup" | "vol+" => VOLUME_UP,
            "voldown" | "volumedown" | "vol-" => VOLUME_DOWN,
            other => {
                return match other.strip_prefix("0x") {
                    Some(hex) => u8::from_str_radix(hex, 16).ok(),
                    None => other.parse().ok(),
                }
            }
        };
        Some(code)
    }
}
