//! SendInput-based injection with layered fallbacks.

use std::thread;
use std::time::Duration;

use tracing::debug;
use windows::Win32::Foundation::POINT;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    keybd_event, mouse_event, SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, INPUT_MOUSE,
    KEYBDINPUT, KEYBD_EVENT_FLAGS, KEYEVENTF_KEYUP, MOUSEEVENTF_ABSOLUTE, MOUSEEVENTF_LEFTDOWN,
    MOUSEEVENTF_LEFTUP, MOUSEEVENTF_MIDDLEDOWN, MOUSEEVENTF_MIDDLEUP, MOUSEEVENTF_MOVE,
    MOUSEEVENTF_RIGHTDOWN, MOUSEEVENTF_RIGHTUP, MOUSEEVENTF_VIRTUALDESK, MOUSEEVENTF_WHEEL,
    MOUSEINPUT, MOUSE_EVENT_FLAGS, VIRTUAL_KEY,
};
use windows::Win32::UI::WindowsAndMessaging::{
    GetCursorPos, GetSystemMetrics, SetCursorPos, SM_CXVIRTUALSCREEN, SM_CYVIRTUALSCREEN,
    SM_XVIRTUALSCREEN, SM_YVIRTUALSCREEN,
};

use crate::input::{
    InjectionBackend, InjectionChain, InputInjector, InputPrimitive, MouseButton, MIN_CLICK_HOLD,
};
use crate::keys;

use super::stealth;

/// One wheel notch.
const WHEEL_DELTA: i32 = 120;

/// Pause after each dispatched primitive so the OS input queue keeps up.
const SETTLE: Duration = Duration::from_millis(5);

fn button_flags(button: MouseButton) -> (MOUSE_EVENT_FLAGS, MOUSE_EVENT_FLAGS) {
    match button {
        MouseButton::Left => (MOUSEEVENTF_LEFTDOWN, MOUSEEVENTF_LEFTUP),
        MouseButton::Right => (MOUSEEVENTF_RIGHTDOWN, MOUSEEVENTF_RIGHTUP),
        MouseButton::Middle => (MOUSEEVENTF_MIDDLEDOWN, MOUSEEVENTF_MIDDLEUP),
    }
}

fn make_mouse_input(flags: MOUSE_EVENT_FLAGS, dx: i32, dy: i32, data: i32) -> INPUT {
    INPUT {
        r#type: INPUT_MOUSE,
        Anonymous: INPUT_0 {
            mi: MOUSEINPUT {
                dx,
                dy,
                mouseData: data as u32,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    }
}

fn make_key_input(code: u16, key_up: bool) -> INPUT {
    let flags = if key_up {
        KEYEVENTF_KEYUP
    } else {
        KEYBD_EVENT_FLAGS(0)
    };

    INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: VIRTUAL_KEY(code),
                wScan: 0,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    }
}

/// Physical coordinates -> normalized 0..65535 virtual-desktop coordinates,
/// clamped to the virtual screen first.
fn normalize_virtual_desktop(x: i32, y: i32) -> (i32, i32) {
    let (vx, vy, vw, vh) = unsafe {
        (
            GetSystemMetrics(SM_XVIRTUALSCREEN),
            GetSystemMetrics(SM_YVIRTUALSCREEN),
            GetSystemMetrics(SM_CXVIRTUALSCREEN).max(1),
            GetSystemMetrics(SM_CYVIRTUALSCREEN).max(1),
        )
    };

    let x = x.clamp(vx, vx + vw - 1);
    let y = y.clamp(vy, vy + vh - 1);

    let nx = ((x - vx) as i64 * 65535 / (vw - 1).max(1) as i64) as i32;
    let ny = ((y - vy) as i64 * 65535 / (vh - 1).max(1) as i64) as i32;
    (nx, ny)
}

/// Primary backend: the synthetic-input queue.
struct SendInputBackend;

impl InjectionBackend for SendInputBackend {
    fn name(&self) -> &'static str {
        "sendinput"
    }

    fn attempts(&self) -> usize {
        3
    }

    fn inject(&self, primitive: &InputPrimitive) -> bool {
        let input = match *primitive {
            InputPrimitive::CursorMove { nx, ny, .. } => make_mouse_input(
                MOUSEEVENTF_MOVE | MOUSEEVENTF_ABSOLUTE | MOUSEEVENTF_VIRTUALDESK,
                nx,
                ny,
                0,
            ),
            InputPrimitive::ButtonDown(button) => make_mouse_input(button_flags(button).0, 0, 0, 0),
            InputPrimitive::ButtonUp(button) => make_mouse_input(button_flags(button).1, 0, 0, 0),
            InputPrimitive::Wheel { delta } => make_mouse_input(MOUSEEVENTF_WHEEL, 0, 0, delta),
            InputPrimitive::KeyDown(code) => make_key_input(code, false),
            InputPrimitive::KeyUp(code) => make_key_input(code, true),
        };

        let sent = unsafe { SendInput(&[input], std::mem::size_of::<INPUT>() as i32) };
        sent == 1
    }
}

/// Direct cursor set; only handles moves, declines everything else.
struct CursorPosBackend;

impl InjectionBackend for CursorPosBackend {
    fn name(&self) -> &'static str {
        "setcursorpos"
    }

    fn inject(&self, primitive: &InputPrimitive) -> bool {
        match *primitive {
            InputPrimitive::CursorMove { x, y, .. } => unsafe { SetCursorPos(x, y).is_ok() },
            _ => false,
        }
    }
}

/// Legacy broadcast calls, last resort. They report nothing back, so a
/// dispatch counts as accepted.
struct LegacyEventBackend;

impl InjectionBackend for LegacyEventBackend {
    fn name(&self) -> &'static str {
        "legacy-event"
    }

    fn inject(&self, primitive: &InputPrimitive) -> bool {
        unsafe {
            match *primitive {
                InputPrimitive::CursorMove { nx, ny, .. } => mouse_event(
                    MOUSEEVENTF_MOVE | MOUSEEVENTF_ABSOLUTE | MOUSEEVENTF_VIRTUALDESK,
                    nx,
                    ny,
                    0,
                    0,
                ),
                InputPrimitive::ButtonDown(button) => {
                    mouse_event(button_flags(button).0, 0, 0, 0, 0)
                }
                InputPrimitive::ButtonUp(button) => mouse_event(button_flags(button).1, 0, 0, 0, 0),
                InputPrimitive::Wheel { delta } => mouse_event(MOUSEEVENTF_WHEEL, 0, 0, delta, 0),
                InputPrimitive::KeyDown(code) => {
                    keybd_event(code as u8, 0, KEYBD_EVENT_FLAGS(0), 0)
                }
                InputPrimitive::KeyUp(code) => keybd_event(code as u8, 0, KEYEVENTF_KEYUP, 0),
            }
        }
        true
    }
}

/// The Windows injector: one backend chain for every primitive.
pub struct WindowsInjector {
    chain: InjectionChain,
}

impl WindowsInjector {
    pub fn new() -> Self {
        Self {
            chain: InjectionChain::new(vec![
                Box::new(SendInputBackend),
                Box::new(CursorPosBackend),
                Box::new(LegacyEventBackend),
            ]),
        }
    }
}

impl Default for WindowsInjector {
    fn default() -> Self {
        Self::new()
    }
}

impl InputInjector for WindowsInjector {
    fn move_cursor_abs(&self, x: i32, y: i32) {
        let (nx, ny) = normalize_virtual_desktop(x, y);
        self.chain
            .dispatch(&InputPrimitive::CursorMove { x, y, nx, ny });
        thread::sleep(SETTLE);
    }

    fn button_down(&self, button: MouseButton) {
        self.chain.dispatch(&InputPrimitive::ButtonDown(button));
        thread::sleep(SETTLE);
    }

    fn button_up(&self, button: MouseButton) {
        self.chain.dispatch(&InputPrimitive::ButtonUp(button));
        thread::sleep(SETTLE);
    }

    fn click(&self, button: MouseButton, hold: Duration) {
        self.chain.dispatch(&InputPrimitive::ButtonDown(button));
        thread::sleep(hold.max(MIN_CLICK_HOLD));
        self.chain.dispatch(&InputPrimitive::ButtonUp(button));
        thread::sleep(SETTLE);
    }

    fn scroll(&self, steps: i32) {
        if steps == 0 {
            return;
        }
        self.chain.dispatch(&InputPrimitive::Wheel {
            delta: steps * WHEEL_DELTA,
        });
        thread::sleep(SETTLE);
    }

    fn cursor_pos(&self) -> Option<(i32, i32)> {
        let mut pt = POINT::default();
        unsafe { GetCursorPos(&mut pt).ok()? };
        Some((pt.x, pt.y))
    }

    fn key_down(&self, key: &str) {
        match keys::virtual_key(key) {
            Some(code) => {
                self.chain.dispatch(&InputPrimitive::KeyDown(code));
                thread::sleep(SETTLE);
            }
            None => debug!(key, "no virtual-key mapping, dropping key press"),
        }
    }

    fn key_up(&self, key: &str) {
        match keys::virtual_key(key) {
            Some(code) => {
                self.chain.dispatch(&InputPrimitive::KeyUp(code));
                thread::sleep(SETTLE);
            }
            None => debug!(key, "no virtual-key mapping, dropping key release"),
        }
    }

    fn post_click_without_moving(&self, x: i32, y: i32, button: MouseButton) -> bool {
        stealth::post_click_at_screen(x, y, button)
    }
}
