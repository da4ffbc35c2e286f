//! Input intents in, CH9329 packets out
//!
//! [`InputDispatcher`] owns the remote-side keyboard and mouse state and
//! turns each intent into packets on a shared [`Transport`]. State updates
//! and the writes they cause happen under one lock, so concurrent callers
//! see packets on the wire in the same order as the state changes.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use ch9329_protocol::protocol::buttons;
use ch9329_protocol::{
    Ch9329Command, Clamped, KeyboardReport, MediaKey, MouseAbsolute, MouseRelative, Packet,
    Transport,
};
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::chord::Chord;
use crate::error::InputError;
use crate::geometry::ScreenGeometry;
use crate::keymap::{self, KeyEntry};
use crate::state::KeyboardState;

/// Mouse button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    /// Bit in the report's button mask
    pub fn bit(self) -> u8 {
        match self {
            Self::Left => buttons::LEFT,
            Self::Right => buttons::RIGHT,
            Self::Middle => buttons::MIDDLE,
        }
    }
}

impl FromStr for MouseButton {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "left" | "l" | "1" => Ok(Self::Left),
            "right" | "r" | "2" => Ok(Self::Right),
            "middle" | "m" | "3" => Ok(Self::Middle),
            _ => Err(format!("Unknown mouse button: {s}")),
        }
    }
}

impl fmt::Display for MouseButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Middle => "middle",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Default)]
struct DispatchState {
    keyboard: KeyboardState,
    buttons: u8,
    /// Last absolute position sent, reused for button reports
    last_abs: Option<(u16, u16)>,
}

/// Translates input intents into packets, tracking what is held
pub struct InputDispatcher {
    transport: Arc<dyn Transport>,
    geometry: ScreenGeometry,
    type_delay: Duration,
    state: Mutex<DispatchState>,
}

impl InputDispatcher {
    pub fn new(transport: Arc<dyn Transport>, geometry: ScreenGeometry) -> Self {
        Self {
            transport,
            geometry,
            type_delay: Duration::ZERO,
            state: Mutex::new(DispatchState::default()),
        }
    }

    /// Pause between characters in [`type_text`](Self::type_text)
    pub fn with_type_delay(mut self, delay: Duration) -> Self {
        self.type_delay = delay;
        self
    }

    pub fn geometry(&self) -> ScreenGeometry {
        self.geometry
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Snapshot of the keyboard state
    pub fn keyboard_state(&self) -> KeyboardState {
        self.state.lock().keyboard.clone()
    }

    /// Currently held mouse buttons
    pub fn buttons(&self) -> u8 {
        self.state.lock().buttons
    }

    /// Nothing held on the keyboard or mouse
    pub fn is_idle(&self) -> bool {
        let state = self.state.lock();
        state.keyboard.is_empty() && state.buttons == 0
    }

    fn send(&self, packet: &Packet) -> Result<(), InputError> {
        trace!("send {}", packet);
        self.transport.write_packet(packet)?;
        Ok(())
    }

    fn send_keyboard(&self, report: &KeyboardReport) -> Result<(), InputError> {
        self.send(&report.build()?)
    }

    fn lookup(key: &str) -> Result<KeyEntry, InputError> {
        keymap::lookup(key).inspect_err(|_| warn!("dropping unmapped key {key:?}"))
    }

    // =========================================================================
    // Keyboard
    // =========================================================================

    /// Press `key` and keep it held
    pub fn key_down(&self, key: &str) -> Result<(), InputError> {
        let entry = Self::lookup(key)?;
        let mut state = self.state.lock();
        if state.keyboard.press(entry)? {
            self.send_keyboard(&state.keyboard.report())?;
        }
        Ok(())
    }

    /// Release `key`. Releasing a key that is not held sends nothing.
    pub fn key_up(&self, key: &str) -> Result<(), InputError> {
        let entry = Self::lookup(key)?;
        let mut state = self.state.lock();
        if state.keyboard.release(entry.usage) {
            self.send_keyboard(&state.keyboard.report())?;
        }
        Ok(())
    }

    /// Press and release `key`
    pub fn tap(&self, key: &str) -> Result<(), InputError> {
        self.key_down(key)?;
        self.key_up(key)
    }

    /// Hold every key of `chord` in one report.
    ///
    /// Keys and modifiers already held stay held after the matching
    /// [`chord_up`](Self::chord_up). If any key does not fit, nothing from
    /// the chord is kept.
    pub fn chord_down(&self, chord: &Chord) -> Result<(), InputError> {
        let mut state = self.state.lock();
        let mut next = state.keyboard.clone();
        next.press_modifiers(chord.modifiers);
        for &usage in &chord.keys {
            next.hold(KeyEntry {
                usage,
                shift: false,
            })?;
        }
        if next.report() != state.keyboard.report() {
            debug!("chord down {chord}");
            self.send_keyboard(&next.report())?;
        }
        state.keyboard = next;
        Ok(())
    }

    /// Let go of what `chord_down(chord)` pressed, in one report
    pub fn chord_up(&self, chord: &Chord) -> Result<(), InputError> {
        let mut state = self.state.lock();
        let mut changed = false;
        for &usage in &chord.keys {
            changed |= state.keyboard.unhold(usage);
        }
        changed |= state.keyboard.release_modifiers(chord.modifiers);
        if changed {
            debug!("chord up {chord}");
            self.send_keyboard(&state.keyboard.report())?;
        }
        Ok(())
    }

    /// Press and release a chord such as `Ctrl+Alt+Delete`
    pub fn press_chord(&self, chord: &Chord) -> Result<(), InputError> {
        self.chord_down(chord)?;
        self.chord_up(chord)
    }

    /// Type `text` one character at a time.
    ///
    /// Characters missing from the key table are skipped and returned; the
    /// rest are still typed.
    pub fn type_text(&self, text: &str) -> Result<Vec<char>, InputError> {
        let mut skipped = Vec::new();
        for (i, c) in text.chars().enumerate() {
            let entry = match keymap::lookup_char(c) {
                Ok(entry) => entry,
                Err(_) => {
                    warn!("skipping unmapped character {c:?}");
                    skipped.push(c);
                    continue;
                }
            };
            if i > 0 && !self.type_delay.is_zero() {
                thread::sleep(self.type_delay);
            }

            let mut state = self.state.lock();
            if state.keyboard.hold(entry)? {
                self.send_keyboard(&state.keyboard.report())?;
            }
            if state.keyboard.unhold(entry.usage) {
                self.send_keyboard(&state.keyboard.report())?;
            }
        }
        Ok(skipped)
    }

    /// Press and release a consumer-control key (volume, playback)
    pub fn media_key(&self, code: u8) -> Result<(), InputError> {
        let _state = self.state.lock();
        self.send(&MediaKey::new(code).build()?)?;
        self.send(&MediaKey::release().build()?)
    }

    // =========================================================================
    // Mouse
    // =========================================================================

    /// One relative report; motion beyond ±127 is clamped and reported.
    pub fn mouse_move_relative(&self, dx: i32, dy: i32) -> Result<Clamped, InputError> {
        let state = self.state.lock();
        let (report, clamped) = MouseRelative::clamped(state.buttons, dx, dy, 0);
        if clamped.any() {
            debug!("relative motion ({dx}, {dy}) clamped");
        }
        self.send(&report.build()?)?;
        Ok(clamped)
    }

    /// As many relative reports as needed to move exactly `(dx, dy)`.
    /// Returns the number of packets sent.
    ///
    /// Motion too large to split is refused before anything is sent.
    pub fn mouse_move_relative_split(&self, dx: i32, dy: i32) -> Result<usize, InputError> {
        let state = self.state.lock();
        let steps = MouseRelative::split(state.buttons, dx, dy, 0)?;
        let count = steps.len();
        for step in steps {
            self.send(&step.build()?)?;
        }
        Ok(count)
    }

    /// Move to a pixel position inside the captured video area
    pub fn mouse_move_absolute(&self, px: i64, py: i64) -> Result<(u16, u16), InputError> {
        let (x, y) = self.geometry.to_absolute(px, py);
        let mut state = self.state.lock();
        state.last_abs = Some((x, y));
        self.send(&MouseAbsolute::new(state.buttons, x, y).build()?)?;
        Ok((x, y))
    }

    /// Report the current button mask without moving the pointer
    fn send_buttons(&self, state: &DispatchState) -> Result<(), InputError> {
        let packet = match state.last_abs {
            Some((x, y)) => MouseAbsolute::new(state.buttons, x, y).build()?,
            None => MouseRelative::new(state.buttons, 0, 0, 0).build()?,
        };
        self.send(&packet)
    }

    pub fn mouse_button_down(&self, button: MouseButton) -> Result<(), InputError> {
        let mut state = self.state.lock();
        if state.buttons & button.bit() == 0 {
            state.buttons |= button.bit();
            debug!("mouse {button} down");
            self.send_buttons(&state)?;
        }
        Ok(())
    }

    pub fn mouse_button_up(&self, button: MouseButton) -> Result<(), InputError> {
        let mut state = self.state.lock();
        if state.buttons & button.bit() != 0 {
            state.buttons &= !button.bit();
            debug!("mouse {button} up");
            self.send_buttons(&state)?;
        }
        Ok(())
    }

    pub fn click(&self, button: MouseButton) -> Result<(), InputError> {
        self.mouse_button_down(button)?;
        self.mouse_button_up(button)
    }

    /// Scroll the wheel; large deltas are spread over several reports,
    /// within the same bound as split motion.
    pub fn scroll(&self, delta: i32) -> Result<(), InputError> {
        let state = self.state.lock();
        for step in MouseRelative::split(state.buttons, 0, 0, delta)? {
            self.send(&step.build()?)?;
        }
        Ok(())
    }

    // =========================================================================
    // Recovery
    // =========================================================================

    /// Release everything on the remote side.
    ///
    /// Always sends the all-zero keyboard report, even when nothing is
    /// tracked as held, and a zero-button mouse report if any button is
    /// down. Call on focus loss, disconnect and shutdown.
    pub fn release_all(&self) -> Result<(), InputError> {
        let mut state = self.state.lock();
        state.keyboard.clear();
        self.send_keyboard(&KeyboardReport::RELEASE)?;
        if state.buttons != 0 {
            state.buttons = 0;
            self.send_buttons(&state)?;
        }
        debug!("released all input");
        Ok(())
    }
}
