//! Global input subscription.
//!
//! On Windows the bridge rides rdev's low-level hooks. rdev's listener
//! cannot be unhooked once installed, so one listener thread is started on
//! first use and routes notifications to whichever recorder session is
//! currently active; with no active session the stream is ignored. Button
//! and wheel notifications carry no coordinates, so the bridge tracks the
//! last observed cursor position and attaches it.
//!
//! Elsewhere there is no global capture; sessions only see what arrives
//! through [`crate::recorder::Recorder::feed_raw`].

#[cfg(target_os = "windows")]
pub(crate) use rdev_bridge::{activate, deactivate};

#[cfg(not(target_os = "windows"))]
pub(crate) use noop::{activate, deactivate};

#[cfg(target_os = "windows")]
mod rdev_bridge {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;

    use parking_lot::Mutex;
    use tracing::{debug, error};

    use parrot_core::MouseButton;

    use crate::recorder::{Inner, RawInput};

    static SINK: Mutex<Option<Arc<Inner>>> = Mutex::new(None);
    static LISTENER_STARTED: AtomicBool = AtomicBool::new(false);
    static LAST_POS: Mutex<(i32, i32)> = Mutex::new((0, 0));

    pub(crate) fn activate(inner: Arc<Inner>) {
        *SINK.lock() = Some(inner);
        ensure_listener();
    }

    pub(crate) fn deactivate() {
        *SINK.lock() = None;
    }

    fn ensure_listener() {
        if LISTENER_STARTED.swap(true, Ordering::SeqCst) {
            return;
        }
        let spawned = thread::Builder::new()
            .name("parrot-capture".into())
            .spawn(|| {
                if let Err(err) = rdev::listen(on_event) {
                    error!(?err, "global input listener failed");
                    LISTENER_STARTED.store(false, Ordering::SeqCst);
                }
            });
        if let Err(err) = spawned {
            error!(%err, "could not spawn capture thread");
            LISTENER_STARTED.store(false, Ordering::SeqCst);
        }
    }

    fn on_event(event: rdev::Event) {
        // Position is tracked even while idle so the first button event of
        // a session lands on real coordinates.
        if let rdev::EventType::MouseMove { x, y } = event.event_type {
            *LAST_POS.lock() = (x as i32, y as i32);
        }

        let Some(sink) = SINK.lock().clone() else {
            return;
        };

        let raw = match event.event_type {
            rdev::EventType::KeyPress(key) => RawInput::KeyDown { key: key_name(key) },
            rdev::EventType::KeyRelease(key) => RawInput::KeyUp { key: key_name(key) },
            rdev::EventType::ButtonPress(button) => {
                let Some(button) = map_button(button) else { return };
                let (x, y) = *LAST_POS.lock();
                RawInput::ButtonDown { button, x, y }
            }
            rdev::EventType::ButtonRelease(button) => {
                let Some(button) = map_button(button) else { return };
                let (x, y) = *LAST_POS.lock();
                RawInput::ButtonUp { button, x, y }
            }
            rdev::EventType::MouseMove { x, y } => RawInput::CursorMove {
                x: x as i32,
                y: y as i32,
            },
            rdev::EventType::Wheel { delta_y, .. } => {
                if delta_y == 0 {
                    return;
                }
                let (x, y) = *LAST_POS.lock();
                RawInput::Wheel {
                    x,
                    y,
                    delta: delta_y as i32,
                }
            }
        };

        sink.handle(raw);
    }

    fn map_button(button: rdev::Button) -> Option<MouseButton> {
        match button {
            rdev::Button::Left => Some(MouseButton::Left),
            rdev::Button::Right => Some(MouseButton::Right),
            rdev::Button::Middle => Some(MouseButton::Middle),
            rdev::Button::Unknown(code) => {
                debug!(code, "unmapped mouse button, dropping");
                None
            }
        }
    }

    /// rdev key -> canonical key name. The recorder normalizes again, so
    /// the fallback spelling only has to be stable, not pretty.
    fn key_name(key: rdev::Key) -> String {
        use rdev::Key::*;

        let name = match key {
            ShiftLeft => "left shift",
            ShiftRight => "right shift",
            ControlLeft => "left ctrl",
            ControlRight => "right ctrl",
            Alt => "alt",
            AltGr => "alt gr",
            MetaLeft => "left windows",
            MetaRight => "right windows",
            Return | KpReturn => "enter",
            Escape => "esc",
            Backspace => "backspace",
            Tab => "tab",
            Space => "space",
            CapsLock => "caps lock",
            NumLock => "num lock",
            ScrollLock => "scroll lock",
            PrintScreen => "print screen",
            Pause => "pause",
            Insert => "insert",
            Delete => "delete",
            Home => "home",
            End => "end",
            PageUp => "page up",
            PageDown => "page down",
            UpArrow => "up",
            DownArrow => "down",
            LeftArrow => "left",
            RightArrow => "right",
            F1 => "f1",
            F2 => "f2",
            F3 => "f3",
            F4 => "f4",
            F5 => "f5",
            F6 => "f6",
            F7 => "f7",
            F8 => "f8",
            F9 => "f9",
            F10 => "f10",
            F11 => "f11",
            F12 => "f12",
            KeyA => "a",
            KeyB => "b",
            KeyC => "c",
            KeyD => "d",
            KeyE => "e",
            KeyF => "f",
            KeyG => "g",
            KeyH => "h",
            KeyI => "i",
            KeyJ => "j",
            KeyK => "k",
            KeyL => "l",
            KeyM => "m",
            KeyN => "n",
            KeyO => "o",
            KeyP => "p",
            KeyQ => "q",
            KeyR => "r",
            KeyS => "s",
            KeyT => "t",
            KeyU => "u",
            KeyV => "v",
            KeyW => "w",
            KeyX => "x",
            KeyY => "y",
            KeyZ => "z",
            Num0 => "0",
            Num1 => "1",
            Num2 => "2",
            Num3 => "3",
            Num4 => "4",
            Num5 => "5",
            Num6 => "6",
            Num7 => "7",
            Num8 => "8",
            Num9 => "9",
            Kp0 => "num 0",
            Kp1 => "num 1",
            Kp2 => "num 2",
            Kp3 => "num 3",
            Kp4 => "num 4",
            Kp5 => "num 5",
            Kp6 => "num 6",
            Kp7 => "num 7",
            Kp8 => "num 8",
            Kp9 => "num 9",
            KpMinus => "num -",
            KpPlus => "num +",
            KpMultiply => "num *",
            KpDivide => "num /",
            KpDelete => "num del",
            Minus => "-",
            Equal => "=",
            LeftBracket => "[",
            RightBracket => "]",
            SemiColon => ";",
            Quote => "'",
            BackSlash => "\\",
            BackQuote => "`",
            Comma => ",",
            Dot => ".",
            Slash => "/",
            other => return format!("{other:?}").to_lowercase(),
        };
        name.to_string()
    }

}

#[cfg(not(target_os = "windows"))]
mod noop {
    use std::sync::Arc;

    use tracing::warn;

    use crate::recorder::Inner;

    pub(crate) fn activate(_inner: Arc<Inner>) {
        warn!("global input capture is not available on this platform");
    }

    pub(crate) fn deactivate() {}
}
