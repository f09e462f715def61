//! Replay engine.
//!
//! Drives an [`InputInjector`] through a recorded event sequence with the
//! recorded pacing, per-modifier press balances, cooperative cancellation,
//! and device cleanup that runs exactly once on every exit path. A stuck
//! key or button blocks the user's own input, so cleanup is a drop guard
//! rather than ordinary control flow.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, info};

use parrot_core::keys::{is_modifier, MODIFIER_SWEEP};
use parrot_core::{InputInjector, MouseButton};

use crate::events::{Event, KeyAction, KeyEvent, MouseAction, MouseEvent};

#[derive(Debug, Clone, Copy, Default)]
pub struct PlaybackOptions {
    /// Restore the cursor afterwards and avoid moving it during playback
    /// wherever a stealth path exists.
    pub preserve_cursor: bool,
}

/// Terminal state of one `play` call. Cancellation is a normal outcome,
/// not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    Completed,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct PlayerConfig {
    /// Sleep floor when honoring recorded deltas. Never zero: the OS input
    /// queue needs time to drain between injected primitives.
    pub min_sleep_ms: u64,
    /// Fixed inter-event gap when pauses are ignored, large enough that
    /// rapid repeated key presses are not coalesced by the target.
    pub event_gap_ms: u64,
    /// Button hold for synthesized clicks.
    pub click_hold_ms: u64,
    /// Settle after a cursor move that precedes a button action.
    pub move_settle_ms: u64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            min_sleep_ms: 5,
            event_gap_ms: 15,
            click_hold_ms: 15,
            move_settle_ms: 20,
        }
    }
}

/// Replays event sequences. Clones share the stop flag, so one handle can
/// live on the UI side while another runs on the playback worker.
#[derive(Clone)]
pub struct Player {
    injector: Arc<dyn InputInjector>,
    config: PlayerConfig,
    stop: Arc<AtomicBool>,
}

impl Player {
    pub fn new(injector: Arc<dyn InputInjector>) -> Self {
        Self::with_config(injector, PlayerConfig::default())
    }

    pub fn with_config(injector: Arc<dyn InputInjector>, config: PlayerConfig) -> Self {
        Self {
            injector,
            config,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation of an in-flight `play`. Takes effect at the
    /// next event boundary; returns immediately.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Replay `events` `repetitions` times (clamped to at least one).
    ///
    /// Blocks the calling thread until completion or cancellation; invoke
    /// it from a caller-managed worker thread. Whatever happens - normal
    /// completion, cancellation, panic - every key and button this call
    /// pressed is released again, and with `preserve_cursor` the cursor
    /// returns to where it started.
    pub fn play(
        &self,
        events: &[Event],
        with_pauses: bool,
        repetitions: u32,
        options: PlaybackOptions,
    ) -> PlaybackOutcome {
        self.stop.store(false, Ordering::SeqCst);
        let repetitions = repetitions.max(1);
        info!(
            events = events.len(),
            repetitions,
            with_pauses,
            preserve_cursor = options.preserve_cursor,
            "playback started"
        );

        let mut session =
            ReplaySession::new(self.injector.as_ref(), &self.config, options.preserve_cursor);

        for repetition in 1..=repetitions {
            debug!(repetition, "playback repetition");
            for event in events {
                if self.stop.load(Ordering::SeqCst) {
                    info!("playback cancelled");
                    return PlaybackOutcome::Cancelled;
                }
                let pause = if with_pauses {
                    event.time_delta_ms().max(self.config.min_sleep_ms)
                } else {
                    self.config.event_gap_ms
                };
                thread::sleep(Duration::from_millis(pause));
                session.dispatch(event);
            }
        }

        info!("playback completed");
        PlaybackOutcome::Completed
    }
}

/// Transient state of one `play` call. Owned by the playback thread only;
/// its `Drop` is the guaranteed-cleanup path.
struct ReplaySession<'a> {
    injector: &'a dyn InputInjector,
    config: &'a PlayerConfig,
    preserve_cursor: bool,
    original_pos: Option<(i32, i32)>,
    pressed_keys: HashSet<String>,
    modifier_balance: HashMap<String, u32>,
    pressed_buttons: HashSet<MouseButton>,
}

impl<'a> ReplaySession<'a> {
    fn new(injector: &'a dyn InputInjector, config: &'a PlayerConfig, preserve_cursor: bool) -> Self {
        let original_pos = if preserve_cursor {
            injector.cursor_pos()
        } else {
            None
        };
        Self {
            injector,
            config,
            preserve_cursor,
            original_pos,
            pressed_keys: HashSet::new(),
            modifier_balance: HashMap::new(),
            pressed_buttons: HashSet::new(),
        }
    }

    fn dispatch(&mut self, event: &Event) {
        match event {
            Event::Key(e) => self.key(e),
            Event::Mouse(e) => self.mouse(e),
        }
    }

    fn key(&mut self, event: &KeyEvent) {
        let key = event.key.as_str();
        match event.action {
            KeyAction::Press => {
                self.injector.key_down(key);
                self.pressed_keys.insert(key.to_string());
                if is_modifier(key) {
                    *self.modifier_balance.entry(key.to_string()).or_insert(0) += 1;
                }
            }
            KeyAction::Release => {
                self.injector.key_up(key);
                self.pressed_keys.remove(key);
                if is_modifier(key) {
                    let balance = self.modifier_balance.entry(key.to_string()).or_insert(0);
                    *balance = balance.saturating_sub(1);
                    if *balance == 0 {
                        // The OS occasionally drops a release notification,
                        // and a stuck modifier corrupts all subsequent input
                        // system-wide; modifiers get one redundant release
                        // when their balance reaches zero.
                        self.injector.key_up(key);
                        self.modifier_balance.remove(key);
                    }
                }
            }
        }
    }

    fn mouse(&mut self, event: &MouseEvent) {
        let button = event.button.unwrap_or(MouseButton::Left);
        match event.action {
            MouseAction::Move => self.move_cursor(event.x, event.y),
            MouseAction::Click => {
                if self.preserve_cursor
                    && self
                        .injector
                        .post_click_without_moving(event.x, event.y, button)
                {
                    return;
                }
                // No stealth target: move only when allowed, but still
                // deliver the physical click.
                self.move_cursor(event.x, event.y);
                self.injector
                    .click(button, Duration::from_millis(self.config.click_hold_ms));
            }
            MouseAction::Press => {
                self.move_cursor(event.x, event.y);
                self.injector.button_down(button);
                self.pressed_buttons.insert(button);
            }
            MouseAction::Release => {
                self.move_cursor(event.x, event.y);
                self.injector.button_up(button);
                self.pressed_buttons.remove(&button);
            }
            MouseAction::Scroll => {
                self.injector.scroll(event.dy.unwrap_or(0));
            }
        }
    }

    fn move_cursor(&self, x: i32, y: i32) {
        if self.preserve_cursor {
            return;
        }
        self.injector.move_cursor_abs(x, y);
        thread::sleep(Duration::from_millis(self.config.move_settle_ms));
    }
}

impl Drop for ReplaySession<'_> {
    fn drop(&mut self) {
        for key in self.pressed_keys.drain() {
            self.injector.key_up(&key);
        }
        // Sweep all modifiers regardless of bookkeeping.
        for name in MODIFIER_SWEEP {
            self.injector.key_up(name);
        }
        for button in self.pressed_buttons.drain() {
            self.injector.button_up(button);
        }
        if let Some((x, y)) = self.original_pos {
            self.injector.move_cursor_abs(x, y);
        }
    }
}
