//! Relay command - stream input intents from stdin

use std::io;
use std::sync::Arc;

use tracing::info;

use super::{release_on_interrupt, CommandResult, Context};

/// Run the line protocol on stdin until EOF or Ctrl-C
pub fn run(ctx: &Context) -> CommandResult {
    let dispatcher = Arc::new(ctx.dispatcher()?);
    info!("relaying stdin to {}", dispatcher.transport().description());

    // stdin reads block, so the handler releases everything itself before exiting
    let running = release_on_interrupt(&dispatcher);

    let stdin = io::stdin();
    let stats = mini_kvm::relay::run(
        &dispatcher,
        stdin.lock(),
        &running,
        ctx.config.input.split_relative,
    )?;
    info!(
        "relay finished: {} applied, {} rejected",
        stats.applied, stats.rejected
    );
    Ok(())
}
