//! Capture state machine.
//!
//! Normalizes raw keyboard/mouse notifications into the event model,
//! throttles high-frequency motion, classifies button down/up pairs into
//! click vs drag, and finalizes anything left open when recording stops.
//! Raw down/up pairs are ambiguous between "clicked" and "dragged"; replay
//! needs a single synthetic click in one case and an explicit
//! press-move-release in the other, and this is the only point with enough
//! information to decide.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::{debug, info};

use parrot_core::keys::normalize_key_name;
use parrot_core::MouseButton;

use crate::capture;
use crate::events::{Event, KeyAction, KeyEvent, MouseAction, MouseEvent};

pub type StopRequestCallback = Box<dyn Fn() + Send + Sync>;

/// Capture thresholds. All of these were tuned empirically and drifted
/// across revisions of the tool; treat the defaults as a starting point,
/// not gospel.
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Manhattan distance a move must cover to be recorded.
    pub move_threshold_px: i32,
    /// Minimum time between recorded moves.
    pub move_throttle_ms: u64,
    /// Moves arriving faster than this are sensor noise.
    pub move_noise_floor_ms: u64,
    /// Down-to-up Chebyshev distance beyond which a press is a drag.
    pub drag_distance_px: i32,
    /// Down-to-up duration beyond which a press is a drag.
    pub drag_duration_ms: u64,
    /// A second click of one button within this window is a duplicate.
    pub click_debounce_ms: u64,
    /// Synthetic delta between the two clicks of an expanded double-click.
    pub double_click_gap_ms: u64,
    /// Delta floor applied to rapid press/release runs of a single key so
    /// replay does not coalesce repeats.
    pub repeat_key_floor_ms: u64,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            move_threshold_px: 2,
            move_throttle_ms: 8,
            move_noise_floor_ms: 3,
            drag_distance_px: 6,
            drag_duration_ms: 120,
            click_debounce_ms: 25,
            double_click_gap_ms: 80,
            repeat_key_floor_ms: 15,
        }
    }
}

/// One normalized raw notification from the capture layer.
#[derive(Debug, Clone)]
pub enum RawInput {
    KeyDown { key: String },
    KeyUp { key: String },
    ButtonDown { button: MouseButton, x: i32, y: i32 },
    ButtonUp { button: MouseButton, x: i32, y: i32 },
    /// Platforms that report double-clicks distinctly feed them here; the
    /// recorder expands them into two clicks with a fixed synthetic gap
    /// rather than trusting the target application's double-click timing.
    DoubleClick { button: MouseButton, x: i32, y: i32 },
    CursorMove { x: i32, y: i32 },
    Wheel { x: i32, y: i32, delta: i32 },
}

#[derive(Debug, Clone, Copy)]
struct PendingPress {
    x: i32,
    y: i32,
    pressed_at: u64,
}

/// All transient session state, owned by the recorder and touched only
/// under one lock: keyboard and mouse callbacks arrive on different OS
/// threads.
#[derive(Default)]
struct SessionState {
    events: Vec<Event>,
    last_event_at: Option<u64>,
    last_move: Option<(i32, i32)>,
    last_move_at: u64,
    pending: HashMap<MouseButton, PendingPress>,
    last_click_at: HashMap<MouseButton, u64>,
}

impl SessionState {
    /// Delta since the previous appended event; advances the session clock.
    /// The first event of a session gets 0.
    fn delta(&mut self, now: u64) -> u64 {
        let delta = match self.last_event_at {
            None => 0,
            Some(prev) => now.saturating_sub(prev),
        };
        self.last_event_at = Some(now);
        delta
    }
}

pub(crate) struct Inner {
    config: RecorderConfig,
    recording: AtomicBool,
    epoch: Instant,
    state: Mutex<SessionState>,
    on_stop_requested: Mutex<Option<StopRequestCallback>>,
}

/// Global input recorder. `Idle -> Recording -> Idle`; `start` while
/// recording and `stop` while idle are both silent no-ops.
#[derive(Clone)]
pub struct Recorder {
    inner: Arc<Inner>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::with_config(RecorderConfig::default())
    }

    pub fn with_config(config: RecorderConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                recording: AtomicBool::new(false),
                epoch: Instant::now(),
                state: Mutex::new(SessionState::default()),
                on_stop_requested: Mutex::new(None),
            }),
        }
    }

    pub fn is_recording(&self) -> bool {
        self.inner.recording.load(Ordering::Relaxed)
    }

    /// Register the callback a global-hotkey layer fires through
    /// [`Recorder::request_stop`]; the recorder itself owns no hotkey logic.
    pub fn set_on_stop_requested(&self, callback: impl Fn() + Send + Sync + 'static) {
        *self.inner.on_stop_requested.lock() = Some(Box::new(callback));
    }

    pub fn request_stop(&self) {
        if let Some(callback) = self.inner.on_stop_requested.lock().as_ref() {
            callback();
        }
    }

    /// Begin capturing. No-op when already recording.
    pub fn start(&self) {
        if self.inner.recording.load(Ordering::SeqCst) {
            return;
        }
        *self.inner.state.lock() = SessionState::default();
        self.inner.recording.store(true, Ordering::SeqCst);
        capture::activate(self.inner.clone());
        info!("recording started");
    }

    /// Feed one raw notification into the session.
    ///
    /// The built-in capture bridge calls this path for every global
    /// notification; frontends with richer hooks (e.g. distinct
    /// double-click messages) can feed their own. Ignored while idle.
    pub fn feed_raw(&self, raw: RawInput) {
        self.inner.handle(raw);
    }

    /// Stop capturing and hand the session's events to the caller.
    /// Returns an empty sequence when not recording.
    pub fn stop(&self) -> Vec<Event> {
        if !self.inner.recording.swap(false, Ordering::SeqCst) {
            return Vec::new();
        }
        capture::deactivate();

        let now = self.inner.now_ms();
        let mut state = self.inner.state.lock();

        // A button with no observed "up" would leave the macro ending in a
        // phantom press; synthesize the release at the last known position.
        let dangling: Vec<(MouseButton, PendingPress)> = state.pending.drain().collect();
        for (button, press) in dangling {
            let (x, y) = state.last_move.unwrap_or((press.x, press.y));
            let delta = state.delta(now);
            state.events.push(Event::Mouse(MouseEvent {
                action: MouseAction::Release,
                x,
                y,
                button: Some(button),
                dx: None,
                dy: None,
                time_delta_ms: delta,
            }));
            debug!(button = %button, "synthesized release for dangling press");
        }

        let events = enforce_repeat_key_floor(
            std::mem::take(&mut state.events),
            self.inner.config.repeat_key_floor_ms,
        );
        info!(count = events.len(), "recording stopped");
        events
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}

impl Inner {
    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    /// Entry point for the capture bridge.
    pub(crate) fn handle(&self, raw: RawInput) {
        self.handle_at(raw, self.now_ms());
    }

    fn handle_at(&self, raw: RawInput, now: u64) {
        if !self.recording.load(Ordering::Relaxed) {
            return;
        }
        match raw {
            RawInput::KeyDown { key } => self.on_key(key, KeyAction::Press, now),
            RawInput::KeyUp { key } => self.on_key(key, KeyAction::Release, now),
            RawInput::ButtonDown { button, x, y } => self.on_button_down(button, x, y, now),
            RawInput::ButtonUp { button, x, y } => self.on_button_up(button, x, y, now),
            RawInput::DoubleClick { button, x, y } => self.on_double_click(button, x, y, now),
            RawInput::CursorMove { x, y } => self.on_move(x, y, now),
            RawInput::Wheel { x, y, delta } => self.on_wheel(x, y, delta, now),
        }
    }

    fn on_key(&self, key: String, action: KeyAction, now: u64) {
        let key = normalize_key_name(&key);
        if key.is_empty() {
            // Malformed notification; drop it and keep recording.
            debug!("dropping key notification with empty name");
            return;
        }
        let mut state = self.state.lock();
        let delta = state.delta(now);
        state.events.push(Event::Key(KeyEvent {
            action,
            key,
            time_delta_ms: delta,
        }));
    }

    fn on_move(&self, x: i32, y: i32, now: u64) {
        let mut state = self.state.lock();
        if let Some((lx, ly)) = state.last_move {
            let distance = (x - lx).abs() + (y - ly).abs();
            let since = now.saturating_sub(state.last_move_at);
            if distance <= self.config.move_threshold_px && since < self.config.move_throttle_ms {
                return;
            }
            if since < self.config.move_noise_floor_ms {
                return;
            }
        }
        state.last_move = Some((x, y));
        state.last_move_at = now;
        let delta = state.delta(now);
        state.events.push(Event::Mouse(MouseEvent {
            action: MouseAction::Move,
            x,
            y,
            button: None,
            dx: None,
            dy: None,
            time_delta_ms: delta,
        }));
    }

    /// Emission is deferred to the matching "up" so the pair can be
    /// classified as click or drag with full information.
    fn on_button_down(&self, button: MouseButton, x: i32, y: i32, now: u64) {
        let mut state = self.state.lock();
        state.pending.insert(button, PendingPress { x, y, pressed_at: now });
    }

    fn on_button_up(&self, button: MouseButton, x: i32, y: i32, now: u64) {
        let mut state = self.state.lock();
        let Some(press) = state.pending.remove(&button) else {
            // Up without a recorded down (e.g. recording started mid-press).
            return;
        };

        let distance = (x - press.x).abs().max((y - press.y).abs());
        let duration = now.saturating_sub(press.pressed_at);
        let is_drag =
            distance > self.config.drag_distance_px || duration > self.config.drag_duration_ms;

        if !is_drag {
            let duplicate = state
                .last_click_at
                .get(&button)
                .is_some_and(|last| now.saturating_sub(*last) <= self.config.click_debounce_ms);
            if !duplicate {
                let delta = state.delta(now);
                state.events.push(Event::Mouse(MouseEvent {
                    action: MouseAction::Click,
                    x,
                    y,
                    button: Some(button),
                    dx: None,
                    dy: None,
                    time_delta_ms: delta,
                }));
                state.last_click_at.insert(button, now);
            } else {
                debug!(button = %button, "duplicate click suppressed");
            }
        } else {
            // Press is stamped at the remembered down time, then the clock
            // advances so the release delta spans the actual drag.
            let press_delta = state
                .last_event_at
                .map_or(0, |prev| press.pressed_at.saturating_sub(prev));
            state.last_event_at = Some(press.pressed_at);
            state.events.push(Event::Mouse(MouseEvent {
                action: MouseAction::Press,
                x: press.x,
                y: press.y,
                button: Some(button),
                dx: None,
                dy: None,
                time_delta_ms: press_delta,
            }));
            let release_delta = state.delta(now);
            state.events.push(Event::Mouse(MouseEvent {
                action: MouseAction::Release,
                x,
                y,
                button: Some(button),
                dx: None,
                dy: None,
                time_delta_ms: release_delta,
            }));
        }
    }

    fn on_double_click(&self, button: MouseButton, x: i32, y: i32, now: u64) {
        let mut state = self.state.lock();
        let delta = state.delta(now);
        for time_delta_ms in [delta, self.config.double_click_gap_ms] {
            state.events.push(Event::Mouse(MouseEvent {
                action: MouseAction::Click,
                x,
                y,
                button: Some(button),
                dx: None,
                dy: None,
                time_delta_ms,
            }));
        }
        state.last_click_at.insert(button, now);
    }

    fn on_wheel(&self, x: i32, y: i32, delta_steps: i32, now: u64) {
        if delta_steps == 0 {
            return;
        }
        let mut state = self.state.lock();
        let delta = state.delta(now);
        state.events.push(Event::Mouse(MouseEvent {
            action: MouseAction::Scroll,
            x,
            y,
            button: None,
            dx: Some(0),
            dy: Some(delta_steps),
            time_delta_ms: delta,
        }));
    }
}

/// Within a run (>2 events) of one key alternating press/release, lift
/// deltas below the floor so the target application does not coalesce the
/// repeats on replay.
fn enforce_repeat_key_floor(events: Vec<Event>, floor_ms: u64) -> Vec<Event> {
    let mut out: Vec<Event> = Vec::with_capacity(events.len());
    let mut i = 0;

    while i < events.len() {
        let run_key = match &events[i] {
            Event::Key(k) => k.key.clone(),
            _ => {
                out.push(events[i].clone());
                i += 1;
                continue;
            }
        };

        let mut j = i + 1;
        while j < events.len() {
            match &events[j] {
                Event::Key(k) if k.key == run_key => j += 1,
                _ => break,
            }
        }

        if j - i > 2 {
            let mut prev_action: Option<KeyAction> = None;
            for event in &events[i..j] {
                let Event::Key(k) = event else { continue };
                let mut k = k.clone();
                if let Some(prev) = prev_action {
                    if k.time_delta_ms < floor_ms && k.action != prev {
                        k.time_delta_ms = floor_ms;
                    }
                }
                prev_action = Some(k.action);
                out.push(Event::Key(k));
            }
        } else {
            out.extend(events[i..j].iter().cloned());
        }
        i = j;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording_recorder() -> Recorder {
        let recorder = Recorder::new();
        // Flip the flag directly: tests drive the state machine by hand
        // instead of installing the global capture hook.
        recorder.inner.recording.store(true, Ordering::SeqCst);
        recorder
    }

    fn feed(recorder: &Recorder, raw: RawInput, now: u64) {
        recorder.inner.handle_at(raw, now);
    }

    #[test]
    fn quick_still_press_classifies_as_single_click() {
        let r = recording_recorder();
        feed(&r, RawInput::ButtonDown { button: MouseButton::Left, x: 100, y: 100 }, 1_000);
        feed(&r, RawInput::ButtonUp { button: MouseButton::Left, x: 100, y: 100 }, 1_030);

        let events = r.stop();
        assert_eq!(events.len(), 1);
        match &events[0] {
            Event::Mouse(e) => {
                assert_eq!(e.action, MouseAction::Click);
                assert_eq!((e.x, e.y), (100, 100));
                assert_eq!(e.button, Some(MouseButton::Left));
            }
            other => panic!("expected mouse event, got {other:?}"),
        }
    }

    #[test]
    fn displaced_release_classifies_as_press_then_release() {
        let r = recording_recorder();
        feed(&r, RawInput::ButtonDown { button: MouseButton::Left, x: 100, y: 100 }, 1_000);
        feed(&r, RawInput::ButtonUp { button: MouseButton::Left, x: 250, y: 300 }, 1_030);

        let events = r.stop();
        assert_eq!(events.len(), 2);
        match (&events[0], &events[1]) {
            (Event::Mouse(press), Event::Mouse(release)) => {
                assert_eq!(press.action, MouseAction::Press);
                assert_eq!((press.x, press.y), (100, 100));
                assert_eq!(release.action, MouseAction::Release);
                assert_eq!((release.x, release.y), (250, 300));
                assert_eq!(release.time_delta_ms, 30);
            }
            other => panic!("expected press/release pair, got {other:?}"),
        }
    }

    #[test]
    fn slow_still_press_is_a_drag_by_duration() {
        let r = recording_recorder();
        feed(&r, RawInput::ButtonDown { button: MouseButton::Left, x: 50, y: 50 }, 0);
        feed(&r, RawInput::ButtonUp { button: MouseButton::Left, x: 50, y: 50 }, 500);

        let events = r.stop();
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], Event::Mouse(e) if e.action == MouseAction::Press));
        assert!(matches!(&events[1], Event::Mouse(e) if e.action == MouseAction::Release));
    }

    #[test]
    fn rapid_second_click_is_debounced() {
        let r = recording_recorder();
        feed(&r, RawInput::ButtonDown { button: MouseButton::Left, x: 10, y: 10 }, 100);
        feed(&r, RawInput::ButtonUp { button: MouseButton::Left, x: 10, y: 10 }, 110);
        // within the 25 ms debounce window
        feed(&r, RawInput::ButtonDown { button: MouseButton::Left, x: 10, y: 10 }, 115);
        feed(&r, RawInput::ButtonUp { button: MouseButton::Left, x: 10, y: 10 }, 125);

        let events = r.stop();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn double_click_expands_to_two_clicks_with_synthetic_gap() {
        let r = recording_recorder();
        feed(&r, RawInput::DoubleClick { button: MouseButton::Left, x: 30, y: 40 }, 200);

        let events = r.stop();
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], Event::Mouse(e) if e.action == MouseAction::Click));
        match &events[1] {
            Event::Mouse(e) => {
                assert_eq!(e.action, MouseAction::Click);
                assert_eq!(e.time_delta_ms, 80);
            }
            other => panic!("expected click, got {other:?}"),
        }
    }

    #[test]
    fn moves_are_throttled_by_distance_and_time() {
        let r = recording_recorder();
        feed(&r, RawInput::CursorMove { x: 0, y: 0 }, 0);
        // big jump but within the 3 ms noise floor, dropped
        feed(&r, RawInput::CursorMove { x: 50, y: 50 }, 2);
        // 1 px after 6 ms: under both distance and throttle thresholds, dropped
        feed(&r, RawInput::CursorMove { x: 1, y: 0 }, 6);
        // big jump after enough time, recorded
        feed(&r, RawInput::CursorMove { x: 50, y: 50 }, 20);
        // tiny jitter after a long pause, recorded (time threshold passed)
        feed(&r, RawInput::CursorMove { x: 51, y: 50 }, 60);

        let events = r.stop();
        assert_eq!(events.len(), 3);
        assert!(events
            .iter()
            .all(|e| matches!(e, Event::Mouse(m) if m.action == MouseAction::Move)));
    }

    #[test]
    fn first_event_has_zero_delta_and_quiet_gaps_are_preserved() {
        let r = recording_recorder();
        feed(&r, RawInput::KeyDown { key: "a".into() }, 5_000);
        feed(&r, RawInput::KeyUp { key: "a".into() }, 5_040);
        feed(&r, RawInput::KeyDown { key: "b".into() }, 9_040);

        let events = r.stop();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].time_delta_ms(), 0);
        assert_eq!(events[1].time_delta_ms(), 40);
        assert_eq!(events[2].time_delta_ms(), 4_000);
    }

    #[test]
    fn key_names_are_canonicalized_on_capture() {
        let r = recording_recorder();
        feed(&r, RawInput::KeyDown { key: "MAIUSC".into() }, 0);
        feed(&r, RawInput::KeyUp { key: "lctrl".into() }, 10);

        let events = r.stop();
        match (&events[0], &events[1]) {
            (Event::Key(a), Event::Key(b)) => {
                assert_eq!(a.key, "shift");
                assert_eq!(b.key, "left ctrl");
            }
            other => panic!("expected key events, got {other:?}"),
        }
    }

    #[test]
    fn stop_finalizes_dangling_press_with_release() {
        let r = recording_recorder();
        feed(&r, RawInput::ButtonDown { button: MouseButton::Right, x: 70, y: 80 }, 0);

        let events = r.stop();
        assert_eq!(events.len(), 1);
        match &events[0] {
            Event::Mouse(e) => {
                assert_eq!(e.action, MouseAction::Release);
                assert_eq!((e.x, e.y), (70, 80));
                assert_eq!(e.button, Some(MouseButton::Right));
            }
            other => panic!("expected release, got {other:?}"),
        }
    }

    #[test]
    fn stop_twice_returns_events_then_empty() {
        let r = recording_recorder();
        feed(&r, RawInput::KeyDown { key: "a".into() }, 0);

        assert_eq!(r.stop().len(), 1);
        assert!(r.stop().is_empty());
        assert!(!r.is_recording());
    }

    #[test]
    fn events_while_idle_are_ignored() {
        let r = Recorder::new();
        feed(&r, RawInput::KeyDown { key: "a".into() }, 0);
        assert!(r.stop().is_empty());
    }

    #[test]
    fn scroll_is_recorded_directly() {
        let r = recording_recorder();
        feed(&r, RawInput::Wheel { x: 5, y: 6, delta: -3 }, 0);

        let events = r.stop();
        match &events[0] {
            Event::Mouse(e) => {
                assert_eq!(e.action, MouseAction::Scroll);
                assert_eq!(e.dy, Some(-3));
            }
            other => panic!("expected scroll, got {other:?}"),
        }
    }

    #[test]
    fn repeat_key_floor_lifts_rapid_alternations() {
        let events = vec![
            Event::Key(KeyEvent { action: KeyAction::Press, key: "a".into(), time_delta_ms: 0 }),
            Event::Key(KeyEvent { action: KeyAction::Release, key: "a".into(), time_delta_ms: 3 }),
            Event::Key(KeyEvent { action: KeyAction::Press, key: "a".into(), time_delta_ms: 2 }),
            Event::Key(KeyEvent { action: KeyAction::Release, key: "a".into(), time_delta_ms: 40 }),
        ];
        let out = enforce_repeat_key_floor(events, 15);
        let deltas: Vec<u64> = out.iter().map(|e| e.time_delta_ms()).collect();
        assert_eq!(deltas, vec![0, 15, 15, 40]);
    }

    #[test]
    fn repeat_key_floor_leaves_short_runs_and_other_keys_alone() {
        let events = vec![
            Event::Key(KeyEvent { action: KeyAction::Press, key: "a".into(), time_delta_ms: 0 }),
            Event::Key(KeyEvent { action: KeyAction::Release, key: "a".into(), time_delta_ms: 2 }),
            Event::Key(KeyEvent { action: KeyAction::Press, key: "b".into(), time_delta_ms: 1 }),
        ];
        let out = enforce_repeat_key_floor(events.clone(), 15);
        assert_eq!(out, events);
    }

    #[test]
    fn feed_raw_routes_through_the_session_clock() {
        let r = recording_recorder();
        // Down and up land within a handful of microseconds of real time:
        // zero displacement, near-zero duration, so this must classify as
        // a click.
        r.feed_raw(RawInput::ButtonDown { button: MouseButton::Left, x: 5, y: 5 });
        r.feed_raw(RawInput::ButtonUp { button: MouseButton::Left, x: 5, y: 5 });

        let events = r.stop();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], Event::Mouse(e) if e.action == MouseAction::Click));
    }

    #[test]
    fn external_stop_request_fires_registered_callback() {
        use std::sync::atomic::AtomicUsize;

        let r = Recorder::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let fired2 = fired.clone();
        r.set_on_stop_requested(move || {
            fired2.fetch_add(1, Ordering::SeqCst);
        });
        r.request_stop();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
