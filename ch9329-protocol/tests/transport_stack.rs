//! Integration tests for the transport stack: typed commands written through
//! the printer middleware into the in-memory backend, and replies read back.

use std::sync::Arc;
use std::time::Duration;

use ch9329_protocol::protocol::{buttons, mods};
use ch9329_protocol::{
    encode_get_info, try_parse_command, Ch9329Command, ChipInfo, CommandType, KeyboardReport,
    MemoryTransport, MouseRelative, OutputFormat, PacketFilter, ParsedCommand, PrinterConfig,
    PrinterTransport, Status, Transport, TransportError,
};

fn frame(cmd: u8, payload: &[u8]) -> Vec<u8> {
    let mut bytes = vec![0x57, 0xAB, 0x00, cmd, payload.len() as u8];
    bytes.extend_from_slice(payload);
    let sum = bytes.iter().fold(0u8, |a, &b| a.wrapping_add(b));
    bytes.push(sum);
    bytes
}

// ── Writing through middleware ──

#[test]
fn printer_forwards_every_packet_unchanged() {
    let memory = Arc::new(MemoryTransport::new());
    let transport = PrinterTransport::wrap(
        memory.clone(),
        PrinterConfig::default()
            .with_format(OutputFormat::Json)
            .with_filter(PacketFilter::Cmd(0x7F)),
    );

    let press = KeyboardReport::new(mods::LCTRL, &[0x06]).unwrap().build().unwrap();
    let release = KeyboardReport::RELEASE.build().unwrap();
    transport.write_packet(&press).unwrap();
    transport.write_packet(&release).unwrap();

    assert_eq!(memory.written(), vec![press.clone(), release]);
    assert_eq!(transport.description(), "memory");
    assert_eq!(
        try_parse_command(press.as_bytes()).unwrap(),
        ParsedCommand::KeyboardGeneral {
            modifiers: mods::LCTRL,
            keys: vec![0x06]
        }
    );
}

#[test]
fn split_motion_sums_to_request() {
    let memory = MemoryTransport::new();
    for step in MouseRelative::split(buttons::LEFT, -400, 260, 0).unwrap() {
        memory.write_packet(&step.build().unwrap()).unwrap();
    }

    let (mut x, mut y) = (0i32, 0i32);
    for packet in memory.written_of(CommandType::SendMouseRelative) {
        match try_parse_command(packet.as_bytes()).unwrap() {
            ParsedCommand::MouseRelative {
                buttons: b, dx, dy, ..
            } => {
                assert_eq!(b, buttons::LEFT);
                x += i32::from(dx);
                y += i32::from(dy);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
    assert_eq!((x, y), (-400, 260));
    assert_eq!(memory.written().len(), 4);
}

// ── Reading replies ──

#[test]
fn get_info_query_decodes_chip_info() {
    let memory = Arc::new(MemoryTransport::new());
    memory
        .push_reply_bytes(&frame(0x81, &[0x31, 0x01, 0x02, 0, 0, 0, 0, 0]))
        .unwrap();
    let transport: Arc<dyn Transport> = memory.clone();

    let reply = transport
        .query(&encode_get_info().unwrap(), Duration::from_millis(20))
        .unwrap();
    let info = ChipInfo::from_payload(&reply.payload).unwrap();

    assert_eq!(info.version, "V3.1");
    assert!(info.usb_connected);
    assert!(info.caps_lock);
    assert!(!info.num_lock);
    assert!(!info.scroll_lock);
}

#[test]
fn device_error_reply_surfaces_status() {
    let memory = MemoryTransport::new();
    memory.push_reply_bytes(&frame(0xC4, &[0xE4])).unwrap();

    let packet = ch9329_protocol::encode_mouse_absolute(0, 10, 10, 0).unwrap();
    match memory.query(&packet, Duration::from_millis(20)) {
        Err(TransportError::Device(status)) => assert_eq!(status, Status::BadChecksum),
        other => panic!("unexpected {other:?}"),
    }
}
