//! Pressed-key bookkeeping for the level-triggered keyboard report

use ch9329_protocol::protocol::{mods, KEY_SLOTS};
use ch9329_protocol::KeyboardReport;
use tracing::debug;

use crate::error::InputError;
use crate::keymap::{self, KeyEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HeldKey {
    usage: u8,
    /// Pressed as a shifted character ("A", "!")
    implied_shift: bool,
    /// Held by an explicit key press
    explicit: bool,
    /// Chords and typed characters currently holding this key
    shared: u8,
}

impl HeldKey {
    fn is_held(&self) -> bool {
        self.explicit || self.shared > 0
    }
}

/// Keys and modifiers currently held on the remote side
///
/// Non-modifier keys are kept in press order, at most six. A key pressed as
/// a shifted character contributes Left Shift to the report only while it
/// is held; explicitly pressed modifier keys are tracked separately, so
/// releasing "A" never drops a Shift the user is holding.
///
/// Explicit presses ([`press`](Self::press)) are idempotent. Chords and
/// typed characters go through [`hold`](Self::hold) and
/// [`press_modifiers`](Self::press_modifiers) instead, which are counted:
/// a key or modifier bit stays down until every contributor has let go.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyboardState {
    held: Vec<HeldKey>,
    /// Modifier bits from explicit presses
    modifiers: u8,
    /// Per-bit count of chords holding each modifier
    shared_modifiers: [u8; 8],
}

impl KeyboardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an explicit press. Returns whether the report changed.
    pub fn press(&mut self, entry: KeyEntry) -> Result<bool, InputError> {
        let before = self.report();
        if let Some(bit) = keymap::modifier_bit(entry.usage) {
            self.modifiers |= bit;
            return Ok(self.report() != before);
        }

        if let Some(key) = self.held.iter_mut().find(|k| k.usage == entry.usage) {
            key.explicit = true;
            key.implied_shift = entry.shift;
            return Ok(self.report() != before);
        }

        self.push(entry, true)?;
        Ok(true)
    }

    /// Record an explicit release of `usage`. Returns whether the report
    /// changed. A key still held by a chord or typed character stays down.
    pub fn release(&mut self, usage: u8) -> bool {
        let before = self.report();
        if let Some(bit) = keymap::modifier_bit(usage) {
            self.modifiers &= !bit;
            return self.report() != before;
        }

        if let Some(key) = self.held.iter_mut().find(|k| k.usage == usage) {
            key.explicit = false;
        }
        self.prune();
        self.report() != before
    }

    /// Add one chord or typed-character hold on `entry`. Returns whether
    /// the report changed.
    pub fn hold(&mut self, entry: KeyEntry) -> Result<bool, InputError> {
        if let Some(bit) = keymap::modifier_bit(entry.usage) {
            return Ok(self.press_modifiers(bit));
        }

        if let Some(key) = self.held.iter_mut().find(|k| k.usage == entry.usage) {
            key.shared = key.shared.saturating_add(1);
            return Ok(false);
        }

        self.push(entry, false)?;
        Ok(true)
    }

    /// Drop one hold taken by [`hold`](Self::hold). Returns whether the
    /// report changed.
    pub fn unhold(&mut self, usage: u8) -> bool {
        if let Some(bit) = keymap::modifier_bit(usage) {
            return self.release_modifiers(bit);
        }

        let before = self.report();
        if let Some(key) = self.held.iter_mut().find(|k| k.usage == usage) {
            key.shared = key.shared.saturating_sub(1);
        }
        self.prune();
        self.report() != before
    }

    /// Add one hold on each modifier bit (chords)
    pub fn press_modifiers(&mut self, bits: u8) -> bool {
        let before = self.report();
        for (i, count) in self.shared_modifiers.iter_mut().enumerate() {
            if bits & (1 << i) != 0 {
                *count = count.saturating_add(1);
            }
        }
        self.report() != before
    }

    /// Drop one hold on each modifier bit. A bit stays set while an
    /// explicit press or another chord still holds it.
    pub fn release_modifiers(&mut self, bits: u8) -> bool {
        let before = self.report();
        for (i, count) in self.shared_modifiers.iter_mut().enumerate() {
            if bits & (1 << i) != 0 {
                *count = count.saturating_sub(1);
            }
        }
        self.report() != before
    }

    fn push(&mut self, entry: KeyEntry, explicit: bool) -> Result<(), InputError> {
        if self.held.len() >= KEY_SLOTS {
            let key = keymap::usage_name(entry.usage)
                .map(str::to_string)
                .unwrap_or_else(|| format!("0x{:02X}", entry.usage));
            return Err(InputError::RolloverFull { key });
        }

        debug!("key down 0x{:02X} shift={}", entry.usage, entry.shift);
        self.held.push(HeldKey {
            usage: entry.usage,
            implied_shift: entry.shift,
            explicit,
            shared: u8::from(!explicit),
        });
        Ok(())
    }

    fn prune(&mut self) {
        self.held.retain(|k| {
            if !k.is_held() {
                debug!("key up 0x{:02X}", k.usage);
            }
            k.is_held()
        });
    }

    /// Forget everything
    pub fn clear(&mut self) {
        self.held.clear();
        self.modifiers = 0;
        self.shared_modifiers = [0; 8];
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty() && self.modifiers() == 0
    }

    pub fn is_pressed(&self, usage: u8) -> bool {
        match keymap::modifier_bit(usage) {
            Some(bit) => self.modifiers() & bit != 0,
            None => self.held.iter().any(|k| k.usage == usage),
        }
    }

    /// Held non-modifier usage codes in press order
    pub fn pressed(&self) -> impl Iterator<Item = u8> + '_ {
        self.held.iter().map(|k| k.usage)
    }

    /// Modifier mask as sent: explicit and chord modifiers plus implied Shift
    pub fn modifiers(&self) -> u8 {
        let implied = if self.held.iter().any(|k| k.implied_shift) {
            mods::LSHIFT
        } else {
            0
        };
        let shared = self
            .shared_modifiers
            .iter()
            .enumerate()
            .filter(|&(_, &count)| count > 0)
            .fold(0u8, |acc, (i, _)| acc | (1 << i));
        self.modifiers | shared | implied
    }

    /// The general keyboard report for the current state
    pub fn report(&self) -> KeyboardReport {
        let mut slots = [0u8; KEY_SLOTS];
        for (slot, key) in slots.iter_mut().zip(&self.held) {
            *slot = key.usage;
        }
        KeyboardReport::from_slots(self.modifiers(), slots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keymap::lookup;

    #[test]
    fn test_press_and_release_letter() {
        let mut state = KeyboardState::new();
        assert!(state.press(lookup("a").unwrap()).unwrap());
        assert_eq!(state.report().keys(), &[0x04, 0, 0, 0, 0, 0]);
        assert_eq!(state.report().modifiers(), 0);

        assert!(state.release(0x04));
        assert!(state.report().is_release());
        assert!(state.is_empty());
    }

    #[test]
    fn test_repeat_press_is_unchanged() {
        let mut state = KeyboardState::new();
        assert!(state.press(lookup("a").unwrap()).unwrap());
        assert!(!state.press(lookup("a").unwrap()).unwrap());
        assert!(!state.release(0x05));
    }

    #[test]
    fn test_implied_shift_only_while_held() {
        let mut state = KeyboardState::new();
        state.press(lookup("A").unwrap()).unwrap();
        state.press(lookup("b").unwrap()).unwrap();
        assert_eq!(state.modifiers(), mods::LSHIFT);

        state.release(0x04);
        assert_eq!(state.modifiers(), 0);
        assert_eq!(state.report().keys(), &[0x05, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_explicit_shift_survives_release() {
        let mut state = KeyboardState::new();
        state.press(lookup("Shift").unwrap()).unwrap();
        state.press(lookup("A").unwrap()).unwrap();
        state.release(0x04);
        assert_eq!(state.modifiers(), mods::LSHIFT);
        assert!(state.is_pressed(0xE1));

        state.release(0xE1);
        assert!(state.is_empty());
    }

    #[test]
    fn test_modifier_keys_never_take_slots() {
        let mut state = KeyboardState::new();
        for name in ["Control", "Alt", "Meta", "Shift"] {
            state.press(lookup(name).unwrap()).unwrap();
        }
        assert_eq!(state.pressed().count(), 0);
        assert_eq!(
            state.modifiers(),
            mods::LCTRL | mods::LALT | mods::LGUI | mods::LSHIFT
        );
    }

    #[test]
    fn test_rollover_full() {
        let mut state = KeyboardState::new();
        for key in ["a", "b", "c", "d", "e", "f"] {
            state.press(lookup(key).unwrap()).unwrap();
        }
        let err = state.press(lookup("g").unwrap()).unwrap_err();
        assert!(matches!(err, InputError::RolloverFull { key } if key == "G"));
        // State is untouched by the rejected press
        assert_eq!(state.report().keys(), &[0x04, 0x05, 0x06, 0x07, 0x08, 0x09]);

        // Modifiers still fit
        assert!(state.press(lookup("Control").unwrap()).unwrap());
    }

    #[test]
    fn test_press_order_preserved() {
        let mut state = KeyboardState::new();
        for key in ["c", "a", "b"] {
            state.press(lookup(key).unwrap()).unwrap();
        }
        state.release(0x04);
        assert_eq!(state.pressed().collect::<Vec<_>>(), vec![0x06, 0x05]);
    }

    #[test]
    fn test_chord_modifier_bits() {
        let mut state = KeyboardState::new();
        assert!(state.press_modifiers(mods::LCTRL | mods::LALT));
        assert!(!state.press_modifiers(mods::LCTRL));
        assert!(state.release_modifiers(mods::LALT));
        assert_eq!(state.modifiers(), mods::LCTRL);

        // Two holds on Ctrl, so one release keeps it down
        assert!(!state.release_modifiers(mods::LCTRL));
        assert_eq!(state.modifiers(), mods::LCTRL);
        assert!(state.release_modifiers(mods::LCTRL));

        state.press_modifiers(mods::LGUI);
        state.clear();
        assert!(state.is_empty());
    }

    #[test]
    fn test_chord_release_keeps_explicit_modifier() {
        let mut state = KeyboardState::new();
        state.press(lookup("Control").unwrap()).unwrap();
        assert!(!state.press_modifiers(mods::LCTRL));
        assert!(!state.release_modifiers(mods::LCTRL));
        assert_eq!(state.modifiers(), mods::LCTRL);

        // Releasing a bit nobody shares is a no-op
        assert!(!state.release_modifiers(mods::LALT));
        assert!(state.release(0xE0));
        assert!(state.is_empty());
    }

    #[test]
    fn test_hold_shares_explicit_key() {
        let mut state = KeyboardState::new();
        state.press(lookup("a").unwrap()).unwrap();
        assert!(!state.hold(lookup("a").unwrap()).unwrap());
        assert!(!state.unhold(0x04));
        assert!(state.is_pressed(0x04));

        // Explicit release while a hold remains keeps the key down
        state.hold(lookup("a").unwrap()).unwrap();
        assert!(!state.release(0x04));
        assert!(state.is_pressed(0x04));
        assert!(state.unhold(0x04));
        assert!(state.is_empty());
    }

    #[test]
    fn test_hold_counts_nested() {
        let mut state = KeyboardState::new();
        assert!(state.hold(lookup("x").unwrap()).unwrap());
        assert!(!state.hold(lookup("x").unwrap()).unwrap());
        assert!(!state.unhold(0x1B));
        assert!(state.unhold(0x1B));
        assert!(!state.unhold(0x1B));
        assert!(state.is_empty());
    }

    #[test]
    fn test_hold_respects_rollover() {
        let mut state = KeyboardState::new();
        for key in ["a", "b", "c", "d", "e", "f"] {
            state.press(lookup(key).unwrap()).unwrap();
        }
        assert!(matches!(
            state.hold(lookup("x").unwrap()),
            Err(InputError::RolloverFull { .. })
        ));
        assert_eq!(state.pressed().count(), 6);
    }
}
