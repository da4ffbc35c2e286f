//! Keyboard commands - type, key, media

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::anyhow;
use kvm_input::keymap::media;
use kvm_input::Chord;

use super::{release_on_interrupt, CommandResult, Context};

/// Type a string
pub fn type_text(ctx: &Context, text: &str, delay_ms: Option<u64>) -> CommandResult {
    let mut dispatcher = ctx.dispatcher()?;
    if let Some(ms) = delay_ms {
        dispatcher = dispatcher.with_type_delay(Duration::from_millis(ms));
    }
    let skipped = dispatcher.type_text(text)?;
    if !skipped.is_empty() {
        let list: String = skipped.iter().collect();
        eprintln!("Skipped {} unmapped characters: {list:?}", skipped.len());
    }
    Ok(())
}

/// Press a key or chord, hold, release.
///
/// Ctrl-C during the hold releases everything before exiting.
pub fn key(ctx: &Context, keys: &str, hold_ms: u64) -> CommandResult {
    let chord: Chord = keys.parse()?;
    let dispatcher = Arc::new(ctx.dispatcher()?);
    if hold_ms == 0 {
        dispatcher.press_chord(&chord)?;
        return Ok(());
    }
    let _running = release_on_interrupt(&dispatcher);
    dispatcher.chord_down(&chord)?;
    thread::sleep(Duration::from_millis(hold_ms));
    dispatcher.chord_up(&chord)?;
    Ok(())
}

/// Tap a media key
pub fn media_key(ctx: &Context, name: &str) -> CommandResult {
    let code = media::parse(name).ok_or_else(|| anyhow!("unknown media key: {name}"))?;
    ctx.dispatcher()?.media_key(code)?;
    Ok(())
}
