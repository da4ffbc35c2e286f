//! Property tests for the input layer.
//!
//! Arbitrary press/release sequences must never leave more than six keys in
//! a report, the last report on the wire must always match the tracked
//! state, and `release_all` must always end in an all-zero report.

use std::sync::Arc;

use ch9329_protocol::{
    try_parse_command, CommandType, MemoryTransport, ParsedCommand, Transport,
};
use kvm_input::{InputDispatcher, InputError, ScreenGeometry};
use proptest::prelude::*;

const KEYS: [&str; 10] = ["a", "b", "c", "d", "e", "f", "g", "h", "Shift", "Control"];

fn last_keyboard(memory: &MemoryTransport) -> Option<ParsedCommand> {
    memory
        .written_of(CommandType::SendKeyboardGeneral)
        .last()
        .map(|p| try_parse_command(p.as_bytes()).unwrap())
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(256))]

    #[test]
    fn prop_wire_matches_tracked_state(
        ops in proptest::collection::vec((0usize..KEYS.len(), any::<bool>()), 1..60),
    ) {
        let memory = Arc::new(MemoryTransport::new());
        let d = InputDispatcher::new(
            memory.clone() as Arc<dyn Transport>,
            ScreenGeometry::default(),
        );

        for (index, down) in ops {
            let key = KEYS[index];
            let result = if down { d.key_down(key) } else { d.key_up(key) };
            match result {
                Ok(()) => {}
                Err(InputError::RolloverFull { .. }) => {}
                Err(e) => return Err(TestCaseError::fail(format!("{key}: {e}"))),
            }

            let state = d.keyboard_state();
            prop_assert!(state.pressed().count() <= 6);
            if let Some(ParsedCommand::KeyboardGeneral { modifiers, keys }) = last_keyboard(&memory) {
                let report = state.report();
                prop_assert_eq!(modifiers, report.modifiers());
                prop_assert_eq!(keys, report.pressed().collect::<Vec<_>>());
            }
        }

        d.release_all().unwrap();
        prop_assert!(d.is_idle());
        prop_assert_eq!(
            last_keyboard(&memory),
            Some(ParsedCommand::KeyboardGeneral { modifiers: 0, keys: vec![] })
        );
    }

    #[test]
    fn prop_chord_restores_prior_state(
        held in proptest::collection::vec(0usize..KEYS.len(), 0..5),
        chord in proptest::sample::select(vec![
            "Ctrl+c", "Ctrl+Shift+a", "Alt+Tab", "Shift+b", "Ctrl+Alt+Delete",
        ]),
    ) {
        let memory = Arc::new(MemoryTransport::new());
        let d = InputDispatcher::new(
            memory.clone() as Arc<dyn Transport>,
            ScreenGeometry::default(),
        );
        for index in held {
            d.key_down(KEYS[index]).unwrap();
        }
        let before = d.keyboard_state();

        d.press_chord(&chord.parse().unwrap()).unwrap();
        prop_assert_eq!(d.keyboard_state().report(), before.report());
        if let Some(ParsedCommand::KeyboardGeneral { modifiers, keys }) = last_keyboard(&memory) {
            prop_assert_eq!(modifiers, before.modifiers());
            prop_assert_eq!(keys, before.pressed().collect::<Vec<_>>());
        }
    }

    #[test]
    fn prop_absolute_stays_in_range(
        width in 1u32..8000,
        height in 1u32..8000,
        x in -20_000i64..20_000,
        y in -20_000i64..20_000,
    ) {
        let (ax, ay) = ScreenGeometry::new(width, height).to_absolute(x, y);
        prop_assert!(ax <= 4095);
        prop_assert!(ay <= 4095);
    }

    #[test]
    fn prop_split_motion_is_exact(dx in -3000i32..3000, dy in -3000i32..3000) {
        let memory = Arc::new(MemoryTransport::new());
        let d = InputDispatcher::new(
            memory.clone() as Arc<dyn Transport>,
            ScreenGeometry::default(),
        );
        let sent = d.mouse_move_relative_split(dx, dy).unwrap();
        prop_assert_eq!(sent, memory.written().len());

        let (mut sx, mut sy) = (0i32, 0i32);
        for packet in memory.written() {
            if let ParsedCommand::MouseRelative { dx, dy, .. } = try_parse_command(packet.as_bytes()).unwrap() {
                sx += i32::from(dx);
                sy += i32::from(dy);
            }
        }
        prop_assert_eq!((sx, sy), (dx, dy));
    }
}
