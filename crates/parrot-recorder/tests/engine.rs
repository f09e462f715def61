//! End-to-end: a recorded macro survives persistence and drives the
//! injector the way it was captured.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use parrot_core::{InputInjector, MouseButton};
use parrot_recorder::{
    deserialize_macro, serialize_macro, Event, KeyAction, KeyEvent, Macro, MacroStore,
    MouseAction, MouseEvent, PlaybackOptions, PlaybackOutcome, Player, PlayerConfig,
};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Op {
    Move(i32, i32),
    Click(MouseButton),
    KeyDown(String),
    KeyUp(String),
    Scroll(i32),
}

#[derive(Default)]
struct CountingInjector {
    ops: Mutex<Vec<Op>>,
}

impl InputInjector for CountingInjector {
    fn move_cursor_abs(&self, x: i32, y: i32) {
        self.ops.lock().push(Op::Move(x, y));
    }

    fn button_down(&self, _button: MouseButton) {}

    fn button_up(&self, _button: MouseButton) {}

    fn click(&self, button: MouseButton, _hold: Duration) {
        self.ops.lock().push(Op::Click(button));
    }

    fn scroll(&self, steps: i32) {
        self.ops.lock().push(Op::Scroll(steps));
    }

    fn cursor_pos(&self) -> Option<(i32, i32)> {
        Some((0, 0))
    }

    fn key_down(&self, key: &str) {
        self.ops.lock().push(Op::KeyDown(key.to_string()));
    }

    fn key_up(&self, key: &str) {
        self.ops.lock().push(Op::KeyUp(key.to_string()));
    }

    fn post_click_without_moving(&self, _x: i32, _y: i32, _button: MouseButton) -> bool {
        false
    }
}

fn recorded_macro() -> Macro {
    Macro::new(
        "login sequence",
        vec![
            Event::Mouse(MouseEvent {
                action: MouseAction::Click,
                x: 400,
                y: 300,
                button: Some(MouseButton::Left),
                dx: None,
                dy: None,
                time_delta_ms: 0,
            }),
            Event::Key(KeyEvent {
                action: KeyAction::Press,
                key: "a".into(),
                time_delta_ms: 12,
            }),
            Event::Key(KeyEvent {
                action: KeyAction::Release,
                key: "a".into(),
                time_delta_ms: 30,
            }),
            Event::Mouse(MouseEvent {
                action: MouseAction::Scroll,
                x: 400,
                y: 300,
                button: None,
                dx: Some(0),
                dy: Some(-2),
                time_delta_ms: 8,
            }),
        ],
    )
}

#[test]
fn macro_survives_bytes_store_and_replay() {
    let original = recorded_macro();

    // Byte-level contract used by external persistence.
    let bytes = serialize_macro(&original).unwrap();
    let restored = deserialize_macro(&bytes).unwrap();
    assert_eq!(restored, original);

    // File-backed store round trip.
    let dir = tempfile::tempdir().unwrap();
    let store = MacroStore::new(dir.path().join("macros.json"));
    store.add(restored).unwrap();
    let loaded = store.load().unwrap().pop().unwrap();
    assert_eq!(loaded, original);

    // Replay drives the injector in capture order.
    let injector = Arc::new(CountingInjector::default());
    let player = Player::with_config(
        injector.clone(),
        PlayerConfig {
            min_sleep_ms: 1,
            event_gap_ms: 1,
            click_hold_ms: 1,
            move_settle_ms: 1,
        },
    );
    let outcome = player.play(
        &loaded.events,
        loaded.with_pauses,
        loaded.repetitions,
        PlaybackOptions::default(),
    );
    assert_eq!(outcome, PlaybackOutcome::Completed);

    let ops = injector.ops.lock().clone();
    assert_eq!(
        ops[..5],
        vec![
            Op::Move(400, 300),
            Op::Click(MouseButton::Left),
            Op::KeyDown("a".into()),
            Op::KeyUp("a".into()),
            Op::Scroll(-2),
        ]
    );
    // Whatever follows is the cleanup sweep: releases only.
    assert!(ops[5..].iter().all(|op| matches!(op, Op::KeyUp(_))));
}
