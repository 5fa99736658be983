//! Synthetic input replay.
//!
//! An edit is replayed as discrete backspaces followed by one text event.
//! Every event is stamped with [`INJECTED_EVENT_TAG`] so the tap recognises
//! it on the way back in.

use crate::core::engine::EditAction;
use crate::core::keys::{key_code, INJECTED_EVENT_TAG};

/// What a synthetic key event carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntheticPayload {
    /// A virtual key code
    Key(u16),
    /// An explicit Unicode string instead of a real key
    Text(String),
}

/// One synthetic key-down or key-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticEvent {
    pub payload: SyntheticPayload,
    pub key_down: bool,
    pub tag: i64,
}

impl SyntheticEvent {
    pub fn is_backspace(&self) -> bool {
        self.payload == SyntheticPayload::Key(key_code::BACKSPACE)
    }
}

/// One-way channel into the OS input system.
pub trait InputSink: Send {
    fn post(&mut self, event: SyntheticEvent);
}

/// Sink that drops everything, for platforms without synthetic input.
pub struct NullInputSink;

impl InputSink for NullInputSink {
    fn post(&mut self, event: SyntheticEvent) {
        tracing::trace!(key_down = event.key_down, "Dropping synthetic event");
    }
}

pub struct Injector {
    sink: Box<dyn InputSink>,
}

impl Injector {
    pub fn new(sink: Box<dyn InputSink>) -> Self {
        Self { sink }
    }

    /// Replay an edit: `extra_delete + delete_count` backspaces, then the text.
    ///
    /// An empty replacement sends no text event.
    pub fn apply(&mut self, action: &EditAction, extra_delete: usize) {
        for _ in 0..extra_delete + action.delete_count {
            self.send_pair(SyntheticPayload::Key(key_code::BACKSPACE));
        }
        if !action.text.is_empty() {
            self.send_pair(SyntheticPayload::Text(action.text.clone()));
        }
    }

    fn send_pair(&mut self, payload: SyntheticPayload) {
        self.sink.post(SyntheticEvent {
            payload: payload.clone(),
            key_down: true,
            tag: INJECTED_EVENT_TAG,
        });
        self.sink.post(SyntheticEvent {
            payload,
            key_down: false,
            tag: INJECTED_EVENT_TAG,
        });
    }
}
