//! Key codes, modifier flags and the platform-neutral key event.
//!
//! Key codes are macOS virtual key codes (Carbon `kVK_*`) and modifier bits
//! mirror `CGEventFlags`, so the tap can hand raw values straight through.

use std::fmt;
use std::ops::BitOr;

/// Tag written into the event-source user-data field of every synthetic
/// event the agent posts. Events carrying it are never reclassified.
pub const INJECTED_EVENT_TAG: i64 = 0x11EE_22DD;

/// macOS virtual key codes used by the pipeline.
pub mod key_code {
    pub const BACKSPACE: u16 = 0x33;
    pub const FORWARD_DELETE: u16 = 0x75;
    pub const ESCAPE: u16 = 0x35;
    pub const SPACE: u16 = 0x31;

    pub const LEFT_ARROW: u16 = 0x7B;
    pub const RIGHT_ARROW: u16 = 0x7C;
    pub const DOWN_ARROW: u16 = 0x7D;
    pub const UP_ARROW: u16 = 0x7E;
    pub const HOME: u16 = 0x73;
    pub const END: u16 = 0x77;
    pub const PAGE_UP: u16 = 0x74;
    pub const PAGE_DOWN: u16 = 0x79;

    /// Arrow, home/end and page navigation keys.
    pub const NAVIGATION: [u16; 8] = [
        LEFT_ARROW,
        RIGHT_ARROW,
        DOWN_ARROW,
        UP_ARROW,
        HOME,
        END,
        PAGE_UP,
        PAGE_DOWN,
    ];
}

/// Resolve a shortcut key name (`a`..`z` or `space`) to its key code.
///
/// Matching is case-insensitive. Unknown names resolve to `None`, which
/// means the shortcut can never fire.
pub fn key_code_for_name(name: &str) -> Option<u16> {
    let code = match name.trim().to_lowercase().as_str() {
        "a" => 0x00,
        "s" => 0x01,
        "d" => 0x02,
        "f" => 0x03,
        "h" => 0x04,
        "g" => 0x05,
        "z" => 0x06,
        "x" => 0x07,
        "c" => 0x08,
        "v" => 0x09,
        "b" => 0x0B,
        "q" => 0x0C,
        "w" => 0x0D,
        "e" => 0x0E,
        "r" => 0x0F,
        "y" => 0x10,
        "t" => 0x11,
        "o" => 0x1F,
        "u" => 0x20,
        "i" => 0x22,
        "p" => 0x23,
        "l" => 0x25,
        "j" => 0x26,
        "k" => 0x28,
        "n" => 0x2D,
        "m" => 0x2E,
        "space" => key_code::SPACE,
        _ => return None,
    };
    Some(code)
}

/// Modifier flag set with `CGEventFlags` bit layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers(u64);

impl Modifiers {
    pub const CAPS_LOCK: Self = Self(0x0001_0000);
    pub const SHIFT: Self = Self(0x0002_0000);
    pub const CONTROL: Self = Self(0x0004_0000);
    pub const OPTION: Self = Self(0x0008_0000);
    pub const COMMAND: Self = Self(0x0010_0000);
    pub const NUMERIC_PAD: Self = Self(0x0020_0000);
    pub const HELP: Self = Self(0x0040_0000);
    pub const SECONDARY_FN: Self = Self(0x0080_0000);

    /// The four modifiers a toggle shortcut may use.
    pub const SHORTCUT_MASK: Self =
        Self(Self::SHIFT.0 | Self::CONTROL.0 | Self::OPTION.0 | Self::COMMAND.0);

    /// Modifiers that turn a keystroke into an action rather than text.
    pub const ACTION_MASK: Self = Self(Self::CONTROL.0 | Self::OPTION.0 | Self::COMMAND.0);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// Only the shortcut-relevant bits; caps lock, numeric pad and device
    /// bits are dropped.
    pub const fn shortcut_bits(self) -> Self {
        self.intersection(Self::SHORTCUT_MASK)
    }

    pub const fn has_action_modifier(self) -> bool {
        self.intersects(Self::ACTION_MASK)
    }
}

impl BitOr for Modifiers {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Display for Modifiers {
    /// Renders in the menu-bar order used by macOS: `^⌥⌘⇧`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.contains(Self::CONTROL) {
            f.write_str("^")?;
        }
        if self.contains(Self::OPTION) {
            f.write_str("\u{2325}")?;
        }
        if self.contains(Self::COMMAND) {
            f.write_str("\u{2318}")?;
        }
        if self.contains(Self::SHIFT) {
            f.write_str("\u{21E7}")?;
        }
        Ok(())
    }
}

/// A key-down event as seen by the interceptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    /// Virtual key code
    pub key_code: u16,
    /// Raw modifier flags
    pub flags: Modifiers,
    /// Event-source user data; carries [`INJECTED_EVENT_TAG`] for our own events
    pub user_data: i64,
    /// Text the key produces under the current layout, if any
    pub text: Option<String>,
}

impl KeyEvent {
    /// A physical key press producing `text`.
    pub fn new(key_code: u16, flags: Modifiers, text: Option<&str>) -> Self {
        Self {
            key_code,
            flags,
            user_data: 0,
            text: text.map(str::to_owned),
        }
    }

    /// A printable key without modifiers.
    pub fn char(key_code: u16, text: &str) -> Self {
        Self::new(key_code, Modifiers::empty(), Some(text))
    }

    /// Same event with the given user-data tag.
    pub fn with_user_data(mut self, user_data: i64) -> Self {
        self.user_data = user_data;
        self
    }

    pub fn is_injected(&self) -> bool {
        self.user_data == INJECTED_EVENT_TAG
    }

    pub fn is_backspace(&self) -> bool {
        self.key_code == key_code::BACKSPACE
    }

    /// Forward delete, escape, or any navigation key.
    pub fn is_continuity_break(&self) -> bool {
        self.key_code == key_code::FORWARD_DELETE
            || self.key_code == key_code::ESCAPE
            || key_code::NAVIGATION.contains(&self.key_code)
    }
}
