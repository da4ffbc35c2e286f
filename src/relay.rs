//! Line protocol for streaming input intents into the dispatcher
//!
//! One intent per line, a verb followed by arguments:
//!
//! ```text
//! down Shift
//! tap ArrowLeft
//! up Shift
//! chord Ctrl+Alt+Delete
//! type Hello, world!
//! move -40 12
//! abs 960 540
//! button left down
//! scroll -3
//! media mute
//! release
//! ```
//!
//! Blank lines and lines starting with `#` are ignored. A front end (a
//! browser bridge, a capture tool, a script) writes these lines to the
//! `relay` subcommand's stdin.

use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};

use ch9329_protocol::ProtocolError;
use kvm_input::keymap::media;
use kvm_input::{Chord, InputDispatcher, InputError, MouseButton};
use thiserror::Error;
use tracing::{debug, warn};

/// A line that could not be understood
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RelayError {
    #[error("unknown verb: {0}")]
    UnknownVerb(String),

    #[error("{verb}: missing {what}")]
    MissingArgument { verb: &'static str, what: &'static str },

    #[error("{verb}: invalid {what} {value:?}")]
    InvalidArgument {
        verb: &'static str,
        what: &'static str,
        value: String,
    },

    #[error("{verb}: unexpected trailing input {rest:?}")]
    TrailingInput { verb: &'static str, rest: String },
}

/// One parsed relay line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayCommand {
    Down(String),
    Up(String),
    Tap(String),
    Chord(Chord),
    Type(String),
    Move { dx: i32, dy: i32 },
    Abs { x: i64, y: i64 },
    Button { button: MouseButton, pressed: bool },
    Scroll(i32),
    Media(u8),
    Release,
}

/// Parse one line. Blank lines and comments give `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<RelayCommand>, RelayError> {
    let line = line.trim_end_matches(['\r', '\n']);
    let trimmed = line.trim_start();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let (verb, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest),
        None => (trimmed, ""),
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "down" => RelayCommand::Down(single(Args::new("down", rest), "key")?),
        "up" => RelayCommand::Up(single(Args::new("up", rest), "key")?),
        "tap" => RelayCommand::Tap(single(Args::new("tap", rest), "key")?),
        "chord" => {
            let text = single(Args::new("chord", rest), "chord")?;
            let chord = text.parse::<Chord>().map_err(|_| RelayError::InvalidArgument {
                verb: "chord",
                what: "chord",
                value: text,
            })?;
            RelayCommand::Chord(chord)
        }
        "type" => {
            if rest.is_empty() {
                return Err(RelayError::MissingArgument {
                    verb: "type",
                    what: "text",
                });
            }
            RelayCommand::Type(rest.to_string())
        }
        "move" => {
            let mut args = Args::new("move", rest);
            let dx = args.number("dx")?;
            let dy = args.number("dy")?;
            args.finish()?;
            RelayCommand::Move { dx, dy }
        }
        "abs" => {
            let mut args = Args::new("abs", rest);
            let x = args.number("x")?;
            let y = args.number("y")?;
            args.finish()?;
            RelayCommand::Abs { x, y }
        }
        "button" => {
            let mut args = Args::new("button", rest);
            let name = args.next("button")?;
            let button = name
                .parse::<MouseButton>()
                .map_err(|_| args.invalid("button", name))?;
            let action = args.next("action")?;
            let pressed = match action.to_ascii_lowercase().as_str() {
                "down" | "press" => true,
                "up" | "release" => false,
                _ => return Err(args.invalid("action", action)),
            };
            args.finish()?;
            RelayCommand::Button { button, pressed }
        }
        "scroll" => {
            let mut args = Args::new("scroll", rest);
            let delta = args.number("delta")?;
            args.finish()?;
            RelayCommand::Scroll(delta)
        }
        "media" => {
            let mut args = Args::new("media", rest);
            let name = args.next("code")?;
            let code = media::parse(name).ok_or_else(|| args.invalid("code", name))?;
            args.finish()?;
            RelayCommand::Media(code)
        }
        "release" => {
            Args::new("release", rest).finish()?;
            RelayCommand::Release
        }
        _ => return Err(RelayError::UnknownVerb(verb.to_string())),
    };
    Ok(Some(command))
}

fn single(mut args: Args<'_>, what: &'static str) -> Result<String, RelayError> {
    let value = args.next(what)?.to_string();
    args.finish()?;
    Ok(value)
}

/// Whitespace-separated argument cursor for one verb
struct Args<'a> {
    verb: &'static str,
    parts: std::str::SplitWhitespace<'a>,
}

impl<'a> Args<'a> {
    fn new(verb: &'static str, rest: &'a str) -> Self {
        Self {
            verb,
            parts: rest.split_whitespace(),
        }
    }

    fn next(&mut self, what: &'static str) -> Result<&'a str, RelayError> {
        self.parts.next().ok_or(RelayError::MissingArgument {
            verb: self.verb,
            what,
        })
    }

    fn number<T: std::str::FromStr>(&mut self, what: &'static str) -> Result<T, RelayError> {
        let raw = self.next(what)?;
        raw.parse().map_err(|_| self.invalid(what, raw))
    }

    fn invalid(&self, what: &'static str, value: &str) -> RelayError {
        RelayError::InvalidArgument {
            verb: self.verb,
            what,
            value: value.to_string(),
        }
    }

    fn finish(mut self) -> Result<(), RelayError> {
        let rest: Vec<&str> = self.parts.by_ref().collect();
        if rest.is_empty() {
            Ok(())
        } else {
            Err(RelayError::TrailingInput {
                verb: self.verb,
                rest: rest.join(" "),
            })
        }
    }
}

/// Carry out one command on the dispatcher
pub fn apply(
    dispatcher: &InputDispatcher,
    command: &RelayCommand,
    split_relative: bool,
) -> Result<(), InputError> {
    match command {
        RelayCommand::Down(key) => dispatcher.key_down(key),
        RelayCommand::Up(key) => dispatcher.key_up(key),
        RelayCommand::Tap(key) => dispatcher.tap(key),
        RelayCommand::Chord(chord) => dispatcher.press_chord(chord),
        RelayCommand::Type(text) => {
            let skipped = dispatcher.type_text(text)?;
            if !skipped.is_empty() {
                warn!("skipped {} unmapped characters", skipped.len());
            }
            Ok(())
        }
        RelayCommand::Move { dx, dy } => {
            if split_relative {
                dispatcher.mouse_move_relative_split(*dx, *dy).map(|_| ())
            } else {
                let clamped = dispatcher.mouse_move_relative(*dx, *dy)?;
                if clamped.any() {
                    warn!("relative move ({dx}, {dy}) was clamped");
                }
                Ok(())
            }
        }
        RelayCommand::Abs { x, y } => dispatcher.mouse_move_absolute(*x, *y).map(|_| ()),
        RelayCommand::Button { button, pressed } => {
            if *pressed {
                dispatcher.mouse_button_down(*button)
            } else {
                dispatcher.mouse_button_up(*button)
            }
        }
        RelayCommand::Scroll(delta) => dispatcher.scroll(*delta),
        RelayCommand::Media(code) => dispatcher.media_key(*code),
        RelayCommand::Release => dispatcher.release_all(),
    }
}

/// Counters reported when a relay session ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    /// Lines that produced a command
    pub applied: usize,
    /// Lines that failed to parse or were refused by the input layer
    pub rejected: usize,
}

/// Read commands from `reader` until EOF or until `running` is cleared.
///
/// Bad lines and refused input (an unmapped key, a full rollover buffer,
/// motion too large to split) are logged and skipped. A transport failure
/// ends the session. Every exit path releases all keys and buttons first.
pub fn run<R: BufRead>(
    dispatcher: &InputDispatcher,
    reader: R,
    running: &AtomicBool,
    split_relative: bool,
) -> Result<RelayStats, InputError> {
    let mut stats = RelayStats::default();
    let result = pump(dispatcher, reader, running, split_relative, &mut stats);
    let released = dispatcher.release_all();
    result?;
    released?;
    Ok(stats)
}

fn pump<R: BufRead>(
    dispatcher: &InputDispatcher,
    reader: R,
    running: &AtomicBool,
    split_relative: bool,
    stats: &mut RelayStats,
) -> Result<(), InputError> {
    for (index, line) in reader.lines().enumerate() {
        if !running.load(Ordering::SeqCst) {
            debug!("relay interrupted");
            break;
        }
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("relay input closed: {e}");
                break;
            }
        };
        let command = match parse_line(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                warn!("line {}: {e}", index + 1);
                stats.rejected += 1;
                continue;
            }
        };
        match apply(dispatcher, &command, split_relative) {
            Ok(()) => stats.applied += 1,
            Err(InputError::Protocol(ProtocolError::MotionTooLarge { steps, max })) => {
                warn!("line {}: motion needs {steps} reports, max {max}", index + 1);
                stats.rejected += 1;
            }
            Err(e @ (InputError::Protocol(_) | InputError::Transport(_))) => return Err(e),
            Err(e) => {
                warn!("line {}: {e}", index + 1);
                stats.rejected += 1;
            }
        }
    }
    Ok(())
}
