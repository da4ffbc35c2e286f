//! Input layer for CH9329-based KVM consoles
//!
//! Maps human key identifiers to HID usage codes, parses key chords, tracks
//! what is held on the remote machine and turns input intents into packets
//! on any [`ch9329_protocol::Transport`].

pub mod chord;
pub mod dispatcher;
pub mod error;
pub mod geometry;
pub mod keymap;
pub mod state;

pub use chord::Chord;
pub use dispatcher::{InputDispatcher, MouseButton};
pub use error::InputError;
pub use geometry::ScreenGeometry;
pub use keymap::{lookup, lookup_char, modifier_bit, usage_name, KeyEntry};
pub use state::KeyboardState;
