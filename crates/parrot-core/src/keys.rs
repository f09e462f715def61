//! Canonical key names and their Windows virtual-key mapping.
//!
//! Raw hook layers spell modifiers a dozen ways ("left shift", "lshift",
//! "maiusc" on Italian layouts). Everything recorded or replayed goes
//! through one canonical form: a small fixed set of modifier names plus
//! lower-cased literal identifiers for ordinary keys.

/// Modifiers swept with a redundant release after playback; a stuck
/// modifier silently corrupts all subsequent input system-wide.
pub const MODIFIER_SWEEP: &[&str] = &[
    "shift",
    "left shift",
    "right shift",
    "ctrl",
    "left ctrl",
    "right ctrl",
    "alt",
    "left alt",
    "right alt",
    "alt gr",
    "windows",
    "left windows",
    "right windows",
];

pub fn is_modifier(name: &str) -> bool {
    MODIFIER_SWEEP.contains(&name)
}

/// Collapse vendor and layout spellings to the canonical set; anything
/// unrecognized passes through trimmed and lower-cased.
pub fn normalize_key_name(raw: &str) -> String {
    let key = raw.trim().to_lowercase();

    if matches!(
        key.as_str(),
        "maiusc" | "shift" | "left shift" | "right shift" | "lshift" | "rshift"
    ) {
        if key.contains("left") || key == "lshift" {
            return "left shift".to_string();
        }
        if key.contains("right") || key == "rshift" {
            return "right shift".to_string();
        }
        return "shift".to_string();
    }

    if matches!(
        key.as_str(),
        "ctrl" | "control" | "left ctrl" | "right ctrl" | "lctrl" | "rctrl"
            | "left control" | "right control"
    ) {
        if key.contains("left") || key == "lctrl" {
            return "left ctrl".to_string();
        }
        if key.contains("right") || key == "rctrl" {
            return "right ctrl".to_string();
        }
        return "ctrl".to_string();
    }

    if key.contains("alt") {
        if key.contains("gr") {
            return "alt gr".to_string();
        }
        if key.contains("left") || key == "lalt" {
            return "left alt".to_string();
        }
        if key.contains("right") || key == "ralt" {
            return "right alt".to_string();
        }
        return key;
    }

    if ["win", "windows", "cmd", "command"].iter().any(|w| key.contains(w)) {
        if key.contains("left") || key == "lwin" {
            return "left windows".to_string();
        }
        if key.contains("right") || key == "rwin" {
            return "right windows".to_string();
        }
        return "windows".to_string();
    }

    key
}

/// Common virtual key codes.
pub mod vk {
    pub const BACKSPACE: u16 = 0x08;
    pub const TAB: u16 = 0x09;
    pub const RETURN: u16 = 0x0D;
    pub const SHIFT: u16 = 0x10;
    pub const CONTROL: u16 = 0x11;
    pub const ALT: u16 = 0x12;
    pub const PAUSE: u16 = 0x13;
    pub const CAPS_LOCK: u16 = 0x14;
    pub const ESCAPE: u16 = 0x1B;
    pub const SPACE: u16 = 0x20;
    pub const PAGE_UP: u16 = 0x21;
    pub const PAGE_DOWN: u16 = 0x22;
    pub const END: u16 = 0x23;
    pub const HOME: u16 = 0x24;
    pub const LEFT: u16 = 0x25;
    pub const UP: u16 = 0x26;
    pub const RIGHT: u16 = 0x27;
    pub const DOWN: u16 = 0x28;
    pub const PRINT_SCREEN: u16 = 0x2C;
    pub const INSERT: u16 = 0x2D;
    pub const DELETE: u16 = 0x2E;
    pub const LWIN: u16 = 0x5B;
    pub const RWIN: u16 = 0x5C;
    pub const APPS: u16 = 0x5D;
    pub const NUMPAD0: u16 = 0x60;
    pub const MULTIPLY: u16 = 0x6A;
    pub const ADD: u16 = 0x6B;
    pub const SUBTRACT: u16 = 0x6D;
    pub const DECIMAL: u16 = 0x6E;
    pub const DIVIDE: u16 = 0x6F;
    pub const F1: u16 = 0x70;
    pub const NUM_LOCK: u16 = 0x90;
    pub const SCROLL_LOCK: u16 = 0x91;
    pub const LSHIFT: u16 = 0xA0;
    pub const RSHIFT: u16 = 0xA1;
    pub const LCONTROL: u16 = 0xA2;
    pub const RCONTROL: u16 = 0xA3;
    pub const LALT: u16 = 0xA4;
    pub const RALT: u16 = 0xA5;
}

/// Map a canonical key name to its Windows virtual-key code.
pub fn virtual_key(name: &str) -> Option<u16> {
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return single_char_vk(c);
    }

    // F-keys: "f1".."f24"
    if let Some(rest) = name.strip_prefix('f') {
        if let Ok(n) = rest.parse::<u16>() {
            if (1..=24).contains(&n) {
                return Some(vk::F1 + n - 1);
            }
        }
    }

    // Numpad: "num 0".."num 9" and operator keys
    if let Some(rest) = name.strip_prefix("num ") {
        let code = match rest {
            "*" => vk::MULTIPLY,
            "+" => vk::ADD,
            "-" => vk::SUBTRACT,
            "." | "del" => vk::DECIMAL,
            "/" => vk::DIVIDE,
            _ => {
                let digit = rest.parse::<u16>().ok().filter(|d| *d <= 9)?;
                vk::NUMPAD0 + digit
            }
        };
        return Some(code);
    }

    let code = match name {
        "space" => vk::SPACE,
        "enter" | "return" => vk::RETURN,
        "tab" => vk::TAB,
        "backspace" => vk::BACKSPACE,
        "esc" | "escape" => vk::ESCAPE,
        "shift" => vk::SHIFT,
        "left shift" => vk::LSHIFT,
        "right shift" => vk::RSHIFT,
        "ctrl" => vk::CONTROL,
        "left ctrl" => vk::LCONTROL,
        "right ctrl" => vk::RCONTROL,
        "alt" => vk::ALT,
        "left alt" => vk::LALT,
        "right alt" | "alt gr" => vk::RALT,
        "windows" | "left windows" => vk::LWIN,
        "right windows" => vk::RWIN,
        "menu" | "apps" => vk::APPS,
        "caps lock" => vk::CAPS_LOCK,
        "num lock" => vk::NUM_LOCK,
        "scroll lock" => vk::SCROLL_LOCK,
        "print screen" => vk::PRINT_SCREEN,
        "pause" => vk::PAUSE,
        "insert" => vk::INSERT,
        "delete" | "del" => vk::DELETE,
        "home" => vk::HOME,
        "end" => vk::END,
        "page up" => vk::PAGE_UP,
        "page down" => vk::PAGE_DOWN,
        "up" => vk::UP,
        "down" => vk::DOWN,
        "left" => vk::LEFT,
        "right" => vk::RIGHT,
        _ => return None,
    };
    Some(code)
}

fn single_char_vk(c: char) -> Option<u16> {
    match c {
        'a'..='z' => Some(0x41 + (c as u16 - 'a' as u16)),
        '0'..='9' => Some(0x30 + (c as u16 - '0' as u16)),
        ';' => Some(0xBA),
        '=' => Some(0xBB),
        ',' => Some(0xBC),
        '-' => Some(0xBD),
        '.' => Some(0xBE),
        '/' => Some(0xBF),
        '`' => Some(0xC0),
        '[' => Some(0xDB),
        '\\' => Some(0xDC),
        ']' => Some(0xDD),
        '\'' => Some(0xDE),
        _ => None,
    }
}
