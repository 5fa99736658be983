//! Platform-independent keystroke pipeline.
//!
//! This module contains:
//! - Key codes, modifier flags and the key event type
//! - Shortcut matching and the per-app bypass policy
//! - The engine adapter and the ghost-suggestion guard
//! - Synthetic input replay and the interceptor that ties them together

pub mod bypass;
pub mod engine;
#[cfg(feature = "vitype-engine")]
pub mod ffi_engine;
pub mod ghost;
pub mod injector;
pub mod interceptor;
pub mod keys;
pub mod main_thread;
pub mod shortcut;

// Re-export commonly used types
pub use bypass::{normalize_bundle_id, parse_bundle_id_list, should_bypass};
pub use engine::{
    builtin_engine, EditAction, EngineOptions, InputMethod, KeyTransformer, OutputEncoding,
    TransformEngine,
};
pub use ghost::{FocusInspector, GhostGuard, NoFocusInspector, SelectionContext};
pub use injector::{InputSink, Injector, NullInputSink, SyntheticEvent, SyntheticPayload};
pub use interceptor::{ControlEvent, Decision, Interceptor, NoopToggleListener, ToggleListener};
pub use keys::{key_code, KeyEvent, Modifiers, INJECTED_EVENT_TAG};
pub use main_thread::{main_thread_channel, MainThreadHandle, MainThreadQueue};
pub use shortcut::{shortcut_matches, Shortcut};
