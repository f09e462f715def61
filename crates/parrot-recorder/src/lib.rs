//! parrot-recorder - desktop macro capture and replay
//!
//! Records global keyboard/mouse activity as a timestamped event sequence
//! and replays it through the injection layer in `parrot-core`, with
//! click/drag classification on capture and modifier-balance bookkeeping,
//! cancellation and guaranteed device cleanup on replay.
//!
//! Capture runs on OS-delivered callbacks (a dedicated listener thread);
//! playback blocks the thread that calls [`Player::play`], which callers
//! run on a worker so their own thread stays free. One recorder session or
//! playback at a time per instance; the caller serializes.

mod capture;
pub mod error;
pub mod events;
pub mod player;
pub mod recorder;
pub mod storage;

pub use error::{Error, Result};
pub use events::{Event, KeyAction, KeyEvent, Macro, MouseAction, MouseButton, MouseEvent};
pub use player::{PlaybackOptions, PlaybackOutcome, Player, PlayerConfig};
pub use recorder::{RawInput, Recorder, RecorderConfig};
pub use storage::{deserialize_macro, next_title, serialize_macro, MacroStore};

pub mod prelude {
    pub use crate::events::*;
    pub use crate::player::{PlaybackOptions, PlaybackOutcome, Player, PlayerConfig};
    pub use crate::recorder::{Recorder, RecorderConfig};
    pub use crate::storage::MacroStore;
}
