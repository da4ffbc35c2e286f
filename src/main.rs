//! mini-kvm CLI
//!
//! Injects keyboard and mouse input into a remote machine through a CH9329
//! serial-to-USB-HID bridge.

use clap::Parser;
use mini_kvm::Config;
use tracing::debug;
use tracing_subscriber::EnvFilter;

// CLI definitions
mod cli;
use cli::{Cli, Commands};

// Command handlers
mod commands;
use commands::Context;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    debug!("loading config from {:?}", config_path);
    let config = Config::load(&config_path)?.with_overrides(cli.port.clone(), cli.baud);

    let printer = commands::create_printer_config(
        cli.monitor,
        cli.dry_run,
        cli.hex,
        cli.json,
        cli.filter.as_deref(),
    )?;
    let ctx = Context {
        config,
        dry_run: cli.dry_run,
        json: cli.json,
        printer,
    };

    match cli.command {
        // === Device Commands ===
        Commands::Ports { all } => commands::device::ports(&ctx, all),
        Commands::Info => commands::device::info(&ctx),
        Commands::Release => commands::device::release(&ctx),
        Commands::Reset => commands::device::reset(&ctx),
        Commands::FactoryReset { yes } => commands::device::factory_reset(&ctx, yes),
        Commands::UsbString { kind, value } => {
            commands::device::usb_string(&ctx, kind.into(), value.as_deref())
        }

        // === Keyboard Commands ===
        Commands::Type { text, delay } => commands::keyboard::type_text(&ctx, &text, delay),
        Commands::Key { chord, hold } => commands::keyboard::key(&ctx, &chord, hold),
        Commands::Media { code } => commands::keyboard::media_key(&ctx, &code),

        // === Mouse Commands ===
        Commands::Move { dx, dy, no_split } => {
            commands::mouse::move_relative(&ctx, dx, dy, no_split)
        }
        Commands::MoveAbs { x, y } => commands::mouse::move_absolute(&ctx, x, y),
        Commands::Click { button, count } => commands::mouse::click(&ctx, &button, count),
        Commands::Scroll { delta } => commands::mouse::scroll(&ctx, delta),

        // === Streaming ===
        Commands::Relay => commands::relay::run(&ctx),

        // === Offline ===
        Commands::Encode(command) => commands::encode::run(&ctx, &command),
    }
}
