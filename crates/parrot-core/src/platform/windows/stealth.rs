//! Click delivery via window messages, leaving the system cursor alone.

use tracing::trace;
use windows::Win32::Foundation::{LPARAM, POINT, WPARAM};
use windows::Win32::Graphics::Gdi::ScreenToClient;
use windows::Win32::UI::WindowsAndMessaging::{
    PostMessageW, WindowFromPoint, WM_LBUTTONDOWN, WM_LBUTTONUP, WM_MBUTTONDOWN, WM_MBUTTONUP,
    WM_MOUSEMOVE, WM_RBUTTONDOWN, WM_RBUTTONUP,
};

use crate::input::MouseButton;

const MK_LBUTTON: usize = 0x0001;
const MK_RBUTTON: usize = 0x0002;
const MK_MBUTTON: usize = 0x0010;

fn button_messages(button: MouseButton) -> (u32, u32, usize) {
    match button {
        MouseButton::Left => (WM_LBUTTONDOWN, WM_LBUTTONUP, MK_LBUTTON),
        MouseButton::Right => (WM_RBUTTONDOWN, WM_RBUTTONUP, MK_RBUTTON),
        MouseButton::Middle => (WM_MBUTTONDOWN, WM_MBUTTONUP, MK_MBUTTON),
    }
}

fn make_lparam(x: i32, y: i32) -> LPARAM {
    LPARAM((((y & 0xFFFF) << 16) | (x & 0xFFFF)) as isize)
}

/// Post a click to the window under screen point `(x, y)`, translated to
/// that window's client coordinates, without relocating the system cursor.
/// Returns whether a target window was found and the messages were posted.
pub fn post_click_at_screen(x: i32, y: i32, button: MouseButton) -> bool {
    let pt = POINT { x, y };
    let hwnd = unsafe { WindowFromPoint(pt) };
    if hwnd.0.is_null() {
        return false;
    }

    let mut client = pt;
    if !unsafe { ScreenToClient(hwnd, &mut client) }.as_bool() {
        return false;
    }

    let (down_msg, up_msg, wbtn) = button_messages(button);
    let lparam = make_lparam(client.x, client.y);

    let posted = unsafe {
        PostMessageW(Some(hwnd), WM_MOUSEMOVE, WPARAM(0), lparam).is_ok()
            && PostMessageW(Some(hwnd), down_msg, WPARAM(wbtn), lparam).is_ok()
            && PostMessageW(Some(hwnd), up_msg, WPARAM(0), lparam).is_ok()
    };

    if posted {
        trace!(x, y, button = %button, "stealth click posted");
    }
    posted
}
