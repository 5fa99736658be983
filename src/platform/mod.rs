//! Platform backends for keyboard interception and synthetic input.
//!
//! The macOS backend taps the session event stream; other targets get a
//! noop backend with the same surface so the crate builds everywhere.

use thiserror::Error;

#[cfg(target_os = "macos")]
pub mod macos;

#[cfg(not(target_os = "macos"))]
pub mod noop;

#[cfg(target_os = "macos")]
pub use macos::{
    check_permission, focus_inspector, frontmost_bundle_id, input_sink, is_trusted,
    pump_run_loop, self_bundle_id, AppActivationObserver, KeyTap, SoundPlayer,
};

#[cfg(not(target_os = "macos"))]
pub use noop::{
    check_permission, focus_inspector, frontmost_bundle_id, input_sink, is_trusted,
    pump_run_loop, self_bundle_id, AppActivationObserver, KeyTap, SoundPlayer,
};

/// Errors that can occur while setting up the keyboard tap.
#[derive(Debug, Error)]
pub enum TapError {
    #[error("Failed to create CGEvent tap (Input Monitoring or Accessibility permission missing)")]
    CreationFailed,
    #[error("Failed to create run loop source")]
    RunLoopSourceFailed,
    #[error("Failed to spawn tap thread: {0}")]
    ThreadSpawnFailed(String),
}
