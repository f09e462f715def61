//! The recorded event model: a closed sum over key and mouse actions, plus
//! the `Macro` aggregate the storage layer round-trips.
//!
//! `time_delta_ms` is elapsed time since the previous event at capture time
//! (0 for the first event of a sequence), so sequences replay independently
//! of their original wall-clock capture time.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use parrot_core::MouseButton;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyAction {
    Press,
    Release,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseAction {
    Move,
    Click,
    Press,
    Release,
    Scroll,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    pub action: KeyAction,
    /// Canonical key identifier (see `parrot_core::keys`).
    pub key: String,
    pub time_delta_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MouseEvent {
    pub action: MouseAction,
    /// Absolute screen coordinates.
    pub x: i32,
    pub y: i32,
    /// Present for click/press/release.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button: Option<MouseButton>,
    /// Present for scroll.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dx: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dy: Option<i32>,
    pub time_delta_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Event {
    Key(KeyEvent),
    Mouse(MouseEvent),
}

impl Event {
    pub fn time_delta_ms(&self) -> u64 {
        match self {
            Event::Key(e) => e.time_delta_ms,
            Event::Mouse(e) => e.time_delta_ms,
        }
    }
}

/// A recorded macro. `events` is immutable after creation; edits only touch
/// the playback settings and metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Macro {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default = "default_true")]
    pub with_pauses: bool,
    #[serde(default = "default_repetitions")]
    pub repetitions: u32,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub preserve_cursor: bool,
}

fn default_true() -> bool {
    true
}

fn default_repetitions() -> u32 {
    1
}

impl Macro {
    pub fn new(title: impl Into<String>, events: Vec<Event>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            events,
            with_pauses: true,
            repetitions: 1,
            favorite: false,
            preserve_cursor: false,
        }
    }
}
