//! Command handlers for the CLI application.
//!
//! This module organizes command handlers by category:
//! - `device`: Port listing and chip management (ports, info, reset, usb-string)
//! - `keyboard`: Key, chord, text and media injection
//! - `mouse`: Pointer motion, buttons and wheel
//! - `encode`: Offline packet encoding
//! - `relay`: Line-protocol streaming from stdin

pub mod device;
pub mod encode;
pub mod keyboard;
pub mod mouse;
pub mod relay;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Context as _};
use ch9329_protocol::{
    available_ports, MemoryTransport, OutputFormat, PacketFilter, PrinterConfig, PrinterTransport,
    SerialTransport, Transport,
};
use kvm_input::InputDispatcher;
use mini_kvm::Config;
use tracing::{info, warn};

/// Result type for command handlers
pub type CommandResult = anyhow::Result<()>;

/// Everything a handler needs from the global flags and config file
pub struct Context {
    pub config: Config,
    pub dry_run: bool,
    pub json: bool,
    pub printer: Option<PrinterConfig>,
}

impl Context {
    /// Open the configured link, wrapped for monitoring when requested.
    ///
    /// With `--dry-run` nothing is opened; packets go to an in-memory
    /// transport that acknowledges like the chip and keeps no log.
    pub fn transport(&self) -> anyhow::Result<Arc<dyn Transport>> {
        let transport: Arc<dyn Transport> = if self.dry_run {
            Arc::new(MemoryTransport::discarding())
        } else {
            let path = self.resolve_port()?;
            let baud = self.config.serial.baud_rate;
            let serial = SerialTransport::open(&path, baud)
                .with_context(|| format!("opening {path} at {baud} baud"))?;
            Arc::new(serial)
        };

        Ok(match &self.printer {
            Some(config) => PrinterTransport::wrap(transport, config.clone()),
            None => transport,
        })
    }

    /// Open the transport and put an input dispatcher on it
    pub fn dispatcher(&self) -> anyhow::Result<InputDispatcher> {
        Ok(InputDispatcher::new(self.transport()?, self.config.geometry())
            .with_type_delay(self.config.type_delay()))
    }

    /// Configured port, or the first WCH adapter on the host
    fn resolve_port(&self) -> anyhow::Result<String> {
        if let Some(port) = &self.config.serial.port {
            return Ok(port.clone());
        }
        let ports = available_ports().context("listing serial ports")?;
        let found = ports
            .into_iter()
            .find(|p| p.is_wch())
            .ok_or_else(|| anyhow!("no serial port given and no CH9329 adapter found (use --port)"))?;
        info!("auto-selected {}", found.name);
        Ok(found.name)
    }
}

/// Create printer config from CLI flags
///
/// A dry run always prints, since the packets are its only output.
pub fn create_printer_config(
    monitor: bool,
    dry_run: bool,
    hex: bool,
    json: bool,
    filter: Option<&str>,
) -> anyhow::Result<Option<PrinterConfig>> {
    if !monitor && !dry_run {
        return Ok(None);
    }

    let filter = match filter {
        Some(f) => f.parse::<PacketFilter>().map_err(|e| anyhow!(e))?,
        None => PacketFilter::All,
    };
    let format = if json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    Ok(Some(
        PrinterConfig::default()
            .with_hex(hex || dry_run)
            .with_filter(filter)
            .with_format(format),
    ))
}

/// Set up a Ctrl-C handler that sets the given flag to false when triggered.
/// Returns the Arc<AtomicBool> for use in the main loop.
pub fn setup_interrupt_handler<F>(on_interrupt: F) -> Arc<AtomicBool>
where
    F: Fn() + Send + 'static,
{
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);

    ctrlc::set_handler(move || {
        running_clone.store(false, Ordering::SeqCst);
        on_interrupt();
    })
    .ok();

    running
}

/// Release everything on the remote and exit when Ctrl-C arrives.
///
/// For commands that block while input is held; the handler runs on its
/// own thread, so it works even while the main thread sleeps or reads.
pub fn release_on_interrupt(dispatcher: &Arc<InputDispatcher>) -> Arc<AtomicBool> {
    let dispatcher = Arc::clone(dispatcher);
    setup_interrupt_handler(move || {
        release_held_input(&dispatcher);
        std::process::exit(130);
    })
}

fn release_held_input(dispatcher: &InputDispatcher) {
    if let Err(e) = dispatcher.release_all() {
        warn!("release on interrupt failed: {e}");
    }
}

/// Parse whitespace- or comma-separated hex bytes ("01 ff", "0x01,0xFF")
pub fn parse_hex_bytes(parts: &[String]) -> anyhow::Result<Vec<u8>> {
    parts
        .iter()
        .flat_map(|p| p.split([',', ' ']))
        .filter(|s| !s.is_empty())
        .map(|s| {
            let digits = s.trim_start_matches("0x").trim_start_matches("0X");
            u8::from_str_radix(digits, 16).with_context(|| format!("invalid hex byte {s:?}"))
        })
        .collect()
}
