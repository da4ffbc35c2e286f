//! Device commands - ports, info, release, reset, factory-reset, usb-string

use std::thread;
use std::time::Duration;

use anyhow::{bail, Context as _};
use ch9329_protocol::protocol::timing;
use ch9329_protocol::{
    available_ports, encode_get_info, encode_get_usb_string, encode_reset_chip,
    encode_restore_default_config, encode_set_usb_string, ChipInfo, UsbStringKind,
};
use crossterm::style::Stylize;
use tracing::info;

use super::{CommandResult, Context};

/// List serial ports
pub fn ports(ctx: &Context, all: bool) -> CommandResult {
    let ports = available_ports().context("listing serial ports")?;
    let shown: Vec<_> = ports.into_iter().filter(|p| all || p.is_wch()).collect();

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&shown)?);
        return Ok(());
    }

    if shown.is_empty() {
        if all {
            println!("No serial ports found.");
        } else {
            println!("No CH9329 adapters found (use --all to list every port).");
        }
        return Ok(());
    }

    for port in &shown {
        let ids = match (port.vid, port.pid) {
            (Some(vid), Some(pid)) => format!("{vid:04x}:{pid:04x}"),
            _ => "-".to_string(),
        };
        let product = port.product.as_deref().unwrap_or("");
        let marker = if port.is_wch() {
            "*".green().bold().to_string()
        } else {
            " ".to_string()
        };
        println!("{marker} {:<20} {ids:<10} {product}", port.name);
    }
    Ok(())
}

/// Query chip information
pub fn info(ctx: &Context) -> CommandResult {
    let transport = ctx.transport()?;
    let packet = encode_get_info()?;
    if ctx.dry_run {
        transport.write_packet(&packet)?;
        return Ok(());
    }

    let reply = transport
        .query(&packet, ctx.config.read_timeout())
        .context("GET_INFO")?;
    let chip = ChipInfo::from_payload(&reply.payload)?;

    if ctx.json {
        println!("{}", serde_json::to_string(&chip)?);
        return Ok(());
    }

    let on_off = |on: bool| if on { "on" } else { "off" };
    println!("Device:      {}", transport.description());
    println!("Version:     {} (0x{:02X})", chip.version, chip.version_raw);
    println!(
        "USB:         {}",
        if chip.usb_connected {
            "connected".green().to_string()
        } else {
            "not enumerated".yellow().to_string()
        }
    );
    println!("Num Lock:    {}", on_off(chip.num_lock));
    println!("Caps Lock:   {}", on_off(chip.caps_lock));
    println!("Scroll Lock: {}", on_off(chip.scroll_lock));
    Ok(())
}

/// Release all keys and buttons
pub fn release(ctx: &Context) -> CommandResult {
    let dispatcher = ctx.dispatcher()?;
    dispatcher.release_all()?;
    Ok(())
}

/// Software reset; waits for the chip to come back
pub fn reset(ctx: &Context) -> CommandResult {
    let transport = ctx.transport()?;
    transport.write_packet(&encode_reset_chip()?)?;
    if !ctx.dry_run {
        info!("waiting {} ms for the chip to restart", timing::RESET_WAIT_MS);
        thread::sleep(Duration::from_millis(timing::RESET_WAIT_MS));
        println!("Chip reset.");
    }
    Ok(())
}

/// Restore factory defaults
pub fn factory_reset(ctx: &Context, yes: bool) -> CommandResult {
    if !yes && !ctx.dry_run {
        bail!(
            "factory reset restores 9600 baud, address 0 and the default USB strings; \
             pass --yes to proceed"
        );
    }
    let transport = ctx.transport()?;
    let packet = encode_restore_default_config()?;
    if ctx.dry_run {
        transport.write_packet(&packet)?;
        return Ok(());
    }
    transport
        .query(&packet, ctx.config.read_timeout())
        .context("SET_DEFAULT_CFG")?;
    println!("Factory configuration restored. Reset the chip for it to take effect.");
    Ok(())
}

/// Read or write a USB string descriptor
pub fn usb_string(ctx: &Context, kind: UsbStringKind, value: Option<&str>) -> CommandResult {
    let transport = ctx.transport()?;

    if let Some(value) = value {
        if !value.is_ascii() {
            bail!("USB strings must be ASCII");
        }
        let packet = encode_set_usb_string(kind, value.as_bytes())?;
        if ctx.dry_run {
            transport.write_packet(&packet)?;
        } else {
            transport
                .query(&packet, ctx.config.read_timeout())
                .context("SET_USB_STRING")?;
            println!("{kind:?} string set to {value:?}");
        }
        return Ok(());
    }

    let packet = encode_get_usb_string(kind)?;
    if ctx.dry_run {
        transport.write_packet(&packet)?;
        return Ok(());
    }
    let reply = transport
        .query(&packet, ctx.config.read_timeout())
        .context("GET_USB_STRING")?;
    let text = decode_usb_string(&reply.payload);
    if ctx.json {
        println!("{}", serde_json::json!({ "kind": kind, "value": text }));
    } else {
        println!("{kind:?}: {text}");
    }
    Ok(())
}

/// Reply payload is `[kind, len, bytes...]`
fn decode_usb_string(payload: &[u8]) -> String {
    let len = payload.get(1).copied().unwrap_or(0) as usize;
    let bytes = payload.get(2..).unwrap_or(&[]);
    String::from_utf8_lossy(&bytes[..len.min(bytes.len())]).into_owned()
}
