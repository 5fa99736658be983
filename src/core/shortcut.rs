//! Enable/disable hotkey matching.

use crate::core::keys::{key_code_for_name, Modifiers};
use std::fmt;

/// Pure shortcut comparison.
///
/// A shortcut with no modifiers never matches, so a bare key can't hijack
/// normal typing. Modifiers compare as an exact set over shift, control,
/// option and command; every other flag bit is ignored.
pub fn shortcut_matches(
    key_code: u16,
    flags: Modifiers,
    configured_key_code: Option<u16>,
    configured_modifiers: Modifiers,
) -> bool {
    let configured = configured_modifiers.shortcut_bits();
    if configured.is_empty() {
        return false;
    }
    if configured_key_code != Some(key_code) {
        return false;
    }
    flags.shortcut_bits() == configured
}

/// Resolved toggle shortcut, cached for per-event comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shortcut {
    key_name: String,
    key_code: Option<u16>,
    modifiers: Modifiers,
}

impl Shortcut {
    pub fn new(key_name: &str, modifiers: Modifiers) -> Self {
        Self {
            key_name: key_name.trim().to_lowercase(),
            key_code: key_code_for_name(key_name),
            modifiers: modifiers.shortcut_bits(),
        }
    }

    pub fn key_code(&self) -> Option<u16> {
        self.key_code
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Whether the shortcut can fire at all.
    pub fn is_valid(&self) -> bool {
        self.key_code.is_some() && !self.modifiers.is_empty()
    }

    pub fn matches(&self, key_code: u16, flags: Modifiers) -> bool {
        shortcut_matches(key_code, flags, self.key_code, self.modifiers)
    }
}

impl Default for Shortcut {
    /// Control+Space.
    fn default() -> Self {
        Self::new("space", Modifiers::CONTROL)
    }
}

impl fmt::Display for Shortcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.modifiers)?;
        if self.key_name == "space" {
            f.write_str("Space")
        } else {
            f.write_str(&self.key_name.to_uppercase())
        }
    }
}
