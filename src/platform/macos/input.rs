//! Synthetic keyboard input via CGEvent.

use crate::core::injector::{InputSink, SyntheticEvent, SyntheticPayload};
use core_graphics::event::{CGEvent, CGEventTapLocation, EventField};
use core_graphics::event_source::{CGEventSource, CGEventSourceStateID};

/// `CGEventKeyboardSetUnicodeString` ignores anything past this many units.
const MAX_UNICODE_CHUNK: usize = 20;

/// Posts tagged key events to the HID event stream.
///
/// A fresh event source is created per event since `CGEventSource` cannot
/// leave the thread it was made on.
pub struct CGEventSink {
    /// Units of the text chunk still waiting for its key-up
    pending_text_up: Option<Vec<u16>>,
}

impl CGEventSink {
    pub fn new() -> Self {
        Self {
            pending_text_up: None,
        }
    }

    fn post_key(&self, key_code: u16, key_down: bool, tag: i64) {
        let Some(event) = new_event(key_code, key_down) else {
            return;
        };
        event.set_integer_value_field(EventField::EVENT_SOURCE_USER_DATA, tag);
        event.post(CGEventTapLocation::HID);
    }

    fn post_text(&self, units: &[u16], key_down: bool, tag: i64) {
        let Some(event) = new_event(0, key_down) else {
            return;
        };
        event.set_integer_value_field(EventField::EVENT_SOURCE_USER_DATA, tag);
        event.set_string_from_utf16_unchecked(units);
        event.post(CGEventTapLocation::HID);
    }
}

impl Default for CGEventSink {
    fn default() -> Self {
        Self::new()
    }
}

fn new_event(key_code: u16, key_down: bool) -> Option<CGEvent> {
    let source = match CGEventSource::new(CGEventSourceStateID::CombinedSessionState) {
        Ok(source) => source,
        Err(_) => {
            tracing::warn!("Failed to create CGEventSource");
            return None;
        }
    };
    match CGEvent::new_keyboard_event(source, key_code, key_down) {
        Ok(event) => Some(event),
        Err(_) => {
            tracing::warn!("Failed to create keyboard event");
            None
        }
    }
}

impl InputSink for CGEventSink {
    fn post(&mut self, event: SyntheticEvent) {
        match event.payload {
            SyntheticPayload::Key(key_code) => self.post_key(key_code, event.key_down, event.tag),
            SyntheticPayload::Text(text) if event.key_down => {
                // Long text goes out as several pairs; the last chunk's
                // key-up is sent with the caller's key-up.
                let units: Vec<u16> = text.encode_utf16().collect();
                let chunks = split_units(&units);
                let Some((last, leading)) = chunks.split_last() else {
                    return;
                };
                for chunk in leading {
                    self.post_text(chunk, true, event.tag);
                    self.post_text(chunk, false, event.tag);
                }
                self.post_text(last, true, event.tag);
                self.pending_text_up = Some(last.to_vec());
            }
            SyntheticPayload::Text(text) => {
                let units = self
                    .pending_text_up
                    .take()
                    .unwrap_or_else(|| text.encode_utf16().take(MAX_UNICODE_CHUNK).collect());
                self.post_text(&units, false, event.tag);
            }
        }
    }
}

/// Split UTF-16 text into chunks of at most [`MAX_UNICODE_CHUNK`] units
/// without separating surrogate pairs.
fn split_units(units: &[u16]) -> Vec<&[u16]> {
    let mut chunks = Vec::new();
    let mut rest = units;
    while !rest.is_empty() {
        let mut end = rest.len().min(MAX_UNICODE_CHUNK);
        if end < rest.len() && is_high_surrogate(rest[end - 1]) {
            end -= 1;
        }
        let (chunk, tail) = rest.split_at(end);
        chunks.push(chunk);
        rest = tail;
    }
    chunks
}

fn is_high_surrogate(unit: u16) -> bool {
    (0xD800..0xDC00).contains(&unit)
}
