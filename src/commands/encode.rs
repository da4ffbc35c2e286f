//! Offline encoding - print packets without a device

use anyhow::anyhow;
use ch9329_protocol::{
    encode_custom_hid, encode_get_info, encode_get_param_config, encode_get_usb_string,
    encode_keyboard_media, encode_keyboard_release, encode_mouse_absolute,
    encode_mouse_relative_reporting, encode_read_custom_hid, encode_reset_chip,
    encode_restore_default_config, encode_set_param_config, encode_set_usb_string,
    try_parse_command, Ch9329Command, Packet,
};
use kvm_input::keymap::media;
use kvm_input::Chord;

use super::{parse_hex_bytes, CommandResult, Context};
use crate::cli::EncodeCommands;

/// Build the packet an `encode` subcommand describes
pub fn build(command: &EncodeCommands) -> anyhow::Result<Packet> {
    let packet = match command {
        EncodeCommands::Info => encode_get_info()?,
        EncodeCommands::Key { chord } => chord.parse::<Chord>()?.report().build()?,
        EncodeCommands::Release => encode_keyboard_release()?,
        EncodeCommands::Media { code } => {
            let code = media::parse(code).ok_or_else(|| anyhow!("unknown media key: {code}"))?;
            encode_keyboard_media(code)?
        }
        EncodeCommands::Abs {
            x,
            y,
            buttons,
            wheel,
        } => encode_mouse_absolute(*buttons, *x, *y, *wheel)?,
        EncodeCommands::Rel {
            dx,
            dy,
            buttons,
            wheel,
        } => {
            let (packet, clamped) = encode_mouse_relative_reporting(*buttons, *dx, *dy, *wheel)?;
            if clamped.any() {
                eprintln!("note: values clamped to +-127 ({clamped:?})");
            }
            packet
        }
        EncodeCommands::CustomHid { data } => encode_custom_hid(&parse_hex_bytes(data)?)?,
        EncodeCommands::ReadCustomHid => encode_read_custom_hid()?,
        EncodeCommands::GetConfig => encode_get_param_config()?,
        EncodeCommands::SetConfig { data } => encode_set_param_config(&parse_hex_bytes(data)?)?,
        EncodeCommands::GetUsbString { kind } => encode_get_usb_string((*kind).into())?,
        EncodeCommands::SetUsbString { kind, value } => {
            encode_set_usb_string((*kind).into(), value.as_bytes())?
        }
        EncodeCommands::RestoreDefaults => encode_restore_default_config()?,
        EncodeCommands::Reset => encode_reset_chip()?,
    };
    Ok(packet)
}

/// Print the encoded packet
pub fn run(ctx: &Context, command: &EncodeCommands) -> CommandResult {
    let packet = build(command)?;
    if ctx.json {
        let decoded = try_parse_command(packet.as_bytes())?;
        println!(
            "{}",
            serde_json::json!({ "hex": packet.to_hex(), "decoded": decoded })
        );
    } else {
        println!("{}", packet.to_hex());
    }
    Ok(())
}
