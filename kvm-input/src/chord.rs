//! Key chord parsing: `"Ctrl+Alt+Delete"`, `"Shift+F10"`, `"RCtrl+C"`.
//!
//! A chord is any number of modifier names followed by up to six keys, all
//! joined with `+`. Letters are case-insensitive inside a chord (`Ctrl+c`
//! and `Ctrl+C` are the same chord); symbols that need Shift (`Ctrl+!`) add
//! Left Shift to the modifier mask.

use std::fmt;
use std::str::FromStr;

use ch9329_protocol::protocol::{mods, KEY_SLOTS};
use ch9329_protocol::KeyboardReport;

use crate::error::InputError;
use crate::keymap;

/// Modifier mask plus the keys pressed together with it
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Chord {
    pub modifiers: u8,
    pub keys: Vec<u8>,
}

impl Chord {
    /// The report that holds this chord down
    pub fn report(&self) -> KeyboardReport {
        let mut slots = [0u8; KEY_SLOTS];
        for (slot, key) in slots.iter_mut().zip(&self.keys) {
            *slot = *key;
        }
        KeyboardReport::from_slots(self.modifiers, slots)
    }
}

/// Parse a modifier name into its mask bit (case-insensitive).
pub fn parse_modifier(name: &str) -> Option<u8> {
    match name.to_ascii_lowercase().as_str() {
        "ctrl" | "control" | "lctrl" | "lcontrol" => Some(mods::LCTRL),
        "shift" | "lshift" => Some(mods::LSHIFT),
        "alt" | "lalt" | "option" => Some(mods::LALT),
        "meta" | "gui" | "win" | "super" | "cmd" | "lmeta" | "lgui" | "lwin" => Some(mods::LGUI),
        "rctrl" | "rcontrol" => Some(mods::RCTRL),
        "rshift" => Some(mods::RSHIFT),
        "ralt" | "altgr" | "roption" => Some(mods::RALT),
        "rmeta" | "rgui" | "rwin" | "rsuper" | "rcmd" => Some(mods::RGUI),
        _ => None,
    }
}

/// Resolve a non-modifier key token inside a chord.
fn resolve_key(token: &str) -> Result<keymap::KeyEntry, InputError> {
    let mut chars = token.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if c.is_ascii_alphabetic() {
            return keymap::lookup_char(c.to_ascii_lowercase());
        }
    }

    let canonical = match token.to_ascii_lowercase().as_str() {
        "esc" => "Escape",
        "del" => "Delete",
        "ins" => "Insert",
        "return" => "Enter",
        "bksp" => "Backspace",
        "up" => "ArrowUp",
        "down" => "ArrowDown",
        "left" => "ArrowLeft",
        "right" => "ArrowRight",
        "pgup" => "PageUp",
        "pgdn" | "pgdown" => "PageDown",
        "menu" | "apps" => "ContextMenu",
        "prtsc" | "printscr" => "PrintScreen",
        _ => token,
    };
    keymap::lookup(canonical).or_else(|_| keymap::lookup_ignore_case(canonical))
}

/// Split a chord string on `+`, keeping a literal trailing `+` key.
fn tokens(s: &str) -> Vec<&str> {
    if s == "+" {
        return vec!["+"];
    }
    if let Some(head) = s.strip_suffix("++") {
        let mut parts: Vec<&str> = head.split('+').collect();
        parts.push("+");
        return parts;
    }
    s.split('+').collect()
}

impl FromStr for Chord {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(InputError::InvalidChord("empty chord".into()));
        }

        let mut chord = Chord::default();
        for token in tokens(s) {
            let token = token.trim();
            if token.is_empty() {
                return Err(InputError::InvalidChord(format!("empty key in {s:?}")));
            }
            if let Some(bit) = parse_modifier(token) {
                chord.modifiers |= bit;
                continue;
            }

            let entry = resolve_key(token)
                .map_err(|_| InputError::InvalidChord(format!("unknown key {token:?} in {s:?}")))?;
            if let Some(bit) = keymap::modifier_bit(entry.usage) {
                chord.modifiers |= bit;
                continue;
            }
            if entry.shift {
                chord.modifiers |= mods::LSHIFT;
            }
            if !chord.keys.contains(&entry.usage) {
                chord.keys.push(entry.usage);
            }
        }

        if chord.keys.len() > KEY_SLOTS {
            return Err(InputError::InvalidChord(format!(
                "{} keys in {s:?}, at most {KEY_SLOTS}",
                chord.keys.len()
            )));
        }
        Ok(chord)
    }
}

fn fmt_mods(mod_bits: u8) -> Vec<&'static str> {
    [
        (mods::LCTRL, "Ctrl"),
        (mods::LSHIFT, "Shift"),
        (mods::LALT, "Alt"),
        (mods::LGUI, "Meta"),
        (mods::RCTRL, "RCtrl"),
        (mods::RSHIFT, "RShift"),
        (mods::RALT, "RAlt"),
        (mods::RGUI, "RMeta"),
    ]
    .into_iter()
    .filter(|(bit, _)| mod_bits & bit != 0)
    .map(|(_, name)| name)
    .collect()
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = fmt_mods(self.modifiers)
            .into_iter()
            .map(str::to_string)
            .collect();
        for key in &self.keys {
            parts.push(match keymap::usage_name(*key) {
                Some(name) => name.to_string(),
                None => format!("0x{key:02X}"),
            });
        }
        write!(f, "{}", parts.join("+"))
    }
}
