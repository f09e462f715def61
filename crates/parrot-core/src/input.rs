//! Injection primitives, the backend chain, and the injector trait.

use std::fmt;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

/// Hold floor for synthesized clicks; many applications ignore shorter ones.
pub const MIN_CLICK_HOLD: Duration = Duration::from_millis(10);

/// Pause between retries of a backend that reported zero events accepted.
const RETRY_PAUSE: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    /// Lenient parse of the button spellings seen in recorded data
    /// ("left", "2", "wheel", ...). Unknown input maps to `Left`.
    pub fn parse(raw: &str) -> MouseButton {
        let s = raw.trim().to_lowercase();
        match s.as_str() {
            "1" | "l" => return MouseButton::Left,
            "2" | "r" => return MouseButton::Right,
            "3" | "m" => return MouseButton::Middle,
            _ => {}
        }
        if s.contains("right") {
            MouseButton::Right
        } else if s.contains("middle") || s.contains("wheel") {
            MouseButton::Middle
        } else {
            MouseButton::Left
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MouseButton::Left => "left",
            MouseButton::Right => "right",
            MouseButton::Middle => "middle",
        }
    }
}

impl fmt::Display for MouseButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One intended hardware action, already resolved to dispatchable form.
///
/// `CursorMove` carries both the raw screen coordinates and the 0..65535
/// virtual-desktop normalization so every backend finds the representation
/// it needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputPrimitive {
    CursorMove { x: i32, y: i32, nx: i32, ny: i32 },
    ButtonDown(MouseButton),
    ButtonUp(MouseButton),
    Wheel { delta: i32 },
    KeyDown(u16),
    KeyUp(u16),
}

/// One concrete OS mechanism for synthesizing input.
///
/// `inject` returns whether the OS accepted the primitive. A backend that
/// does not support a primitive kind declines it by returning `false`
/// immediately; the chain falls through to the next backend.
pub trait InjectionBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Bounded attempts before the chain moves on. The OS occasionally
    /// reports zero events accepted transiently, so the primary backend
    /// uses more than one.
    fn attempts(&self) -> usize {
        1
    }

    fn inject(&self, primitive: &InputPrimitive) -> bool;
}

/// Ordered list of injection backends, tried in priority order.
///
/// This is the single fallback policy for every primitive: per-backend
/// bounded retry, first success wins, exhaustion is logged and swallowed.
pub struct InjectionChain {
    backends: Vec<Box<dyn InjectionBackend>>,
}

impl InjectionChain {
    pub fn new(backends: Vec<Box<dyn InjectionBackend>>) -> Self {
        Self { backends }
    }

    /// Dispatch through the chain. Returns whether any backend accepted;
    /// callers treat `false` as a missed action, not an error.
    pub fn dispatch(&self, primitive: &InputPrimitive) -> bool {
        for backend in &self.backends {
            let attempts = backend.attempts().max(1);
            for attempt in 1..=attempts {
                if backend.inject(primitive) {
                    trace!(backend = backend.name(), ?primitive, "input accepted");
                    return true;
                }
                if attempt < attempts {
                    thread::sleep(RETRY_PAUSE);
                }
            }
            debug!(
                backend = backend.name(),
                ?primitive,
                "backend exhausted, falling back"
            );
        }
        warn!(?primitive, "no injection backend accepted the primitive");
        false
    }
}

/// OS input injection as seen by the player.
///
/// Every operation is fire-and-forget: backend failures are retried,
/// degraded and logged inside the implementation, never surfaced. The one
/// exception is `post_click_without_moving`, whose `bool` tells the caller
/// whether the stealth path found a target window (so it can fall back to
/// physical injection).
pub trait InputInjector: Send + Sync {
    /// Move the cursor to absolute screen coordinates, clamped to the
    /// virtual desktop. A failed move is a no-op.
    fn move_cursor_abs(&self, x: i32, y: i32);

    fn button_down(&self, button: MouseButton);

    fn button_up(&self, button: MouseButton);

    /// Press, hold for `max(hold, MIN_CLICK_HOLD)`, release.
    fn click(&self, button: MouseButton, hold: Duration);

    /// Scroll by whole wheel notches; positive scrolls up.
    fn scroll(&self, steps: i32);

    /// Current absolute cursor position, if the OS will say.
    fn cursor_pos(&self) -> Option<(i32, i32)>;

    /// Press a key by canonical name. Unmappable names are dropped.
    fn key_down(&self, key: &str);

    fn key_up(&self, key: &str);

    /// Deliver a click to the window under `(x, y)` via a window-message
    /// post, without relocating the system cursor. Returns whether a target
    /// window was found and the messages were posted.
    fn post_click_without_moving(&self, x: i32, y: i32, button: MouseButton) -> bool;
}
