//! parrot-core - OS-facing input injection for macro replay
//!
//! Translates intended primitive actions (move cursor, press button, press
//! key, scroll) into OS input through an ordered chain of injection
//! backends. Injection is best-effort against a live OS: backends are
//! retried a bounded number of times and failures are logged, never raised.
//!
//! ## Platform Support
//!
//! - **Windows**: SendInput, with SetCursorPos and legacy
//!   mouse_event/keybd_event fallbacks, plus a PostMessage stealth-click
//!   path that leaves the system cursor in place.

pub mod input;
pub mod keys;
pub mod platform;

pub use input::{
    InjectionBackend, InjectionChain, InputInjector, InputPrimitive, MouseButton, MIN_CLICK_HOLD,
};

#[cfg(target_os = "windows")]
pub use platform::windows::WindowsInjector;
