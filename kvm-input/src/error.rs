//! Input layer error types

use ch9329_protocol::{ProtocolError, TransportError};
use thiserror::Error;

/// Errors from translating input intents into packets
#[derive(Error, Debug)]
pub enum InputError {
    /// Key identifier not present in the key table
    #[error("Unmapped key: {0:?}")]
    UnmappedKey(String),

    /// Six non-modifier keys are already held
    #[error("Rollover full: cannot press {key:?} while six keys are held")]
    RolloverFull { key: String },

    /// Chord string could not be parsed
    #[error("Invalid chord: {0}")]
    InvalidChord(String),

    /// Packet construction failed
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Transport layer error
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}
