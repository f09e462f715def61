//! Windows input injection
//!
//! SendInput first, SetCursorPos and the legacy event calls as fallbacks,
//! window-message posting for cursor-preserving clicks.

mod input;
mod stealth;

pub use input::WindowsInjector;
pub use stealth::post_click_at_screen;
