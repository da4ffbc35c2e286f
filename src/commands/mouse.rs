//! Mouse commands - move, move-abs, click, scroll

use std::thread;
use std::time::Duration;

use anyhow::anyhow;
use kvm_input::MouseButton;

use super::{CommandResult, Context};

const CLICK_GAP: Duration = Duration::from_millis(50);

/// Relative move; large moves are split unless disabled
pub fn move_relative(ctx: &Context, dx: i32, dy: i32, no_split: bool) -> CommandResult {
    let dispatcher = ctx.dispatcher()?;
    if ctx.config.input.split_relative && !no_split {
        dispatcher.mouse_move_relative_split(dx, dy)?;
    } else {
        let clamped = dispatcher.mouse_move_relative(dx, dy)?;
        if clamped.any() {
            eprintln!("Motion ({dx}, {dy}) exceeded one report and was clamped to +-127");
        }
    }
    Ok(())
}

/// Absolute move to a pixel position
pub fn move_absolute(ctx: &Context, x: i64, y: i64) -> CommandResult {
    let dispatcher = ctx.dispatcher()?;
    let (ax, ay) = dispatcher.mouse_move_absolute(x, y)?;
    tracing::info!("({x}, {y}) -> absolute ({ax}, {ay})");
    Ok(())
}

/// Click a button `count` times
pub fn click(ctx: &Context, button: &str, count: u32) -> CommandResult {
    let button: MouseButton = button.parse().map_err(|e: String| anyhow!(e))?;
    let dispatcher = ctx.dispatcher()?;
    for i in 0..count {
        if i > 0 {
            thread::sleep(CLICK_GAP);
        }
        dispatcher.click(button)?;
    }
    Ok(())
}

/// Scroll the wheel
pub fn scroll(ctx: &Context, delta: i32) -> CommandResult {
    ctx.dispatcher()?.scroll(delta)?;
    Ok(())
}
