//! macOS backend: CGEvent tap, CGEvent injection, AX and NSWorkspace.

pub mod accessibility;
pub mod input;
pub mod sound;
pub mod tap;
pub mod workspace;

pub use accessibility::{is_trusted, AxFocusInspector};
pub use input::CGEventSink;
pub use sound::SoundPlayer;
pub use tap::{check_permission, KeyTap};
pub use workspace::{frontmost_bundle_id, pump_run_loop, self_bundle_id, AppActivationObserver};

use crate::core::main_thread::MainThreadHandle;

/// Focus inspector for the ghost-suggestion guard.
pub fn focus_inspector(main_thread: MainThreadHandle) -> AxFocusInspector {
    AxFocusInspector::new(main_thread)
}

/// Sink for synthetic key events.
pub fn input_sink() -> CGEventSink {
    CGEventSink::new()
}
