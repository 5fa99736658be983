//! Non-macOS (noop) backend.
//!
//! This exists so the crate (and binary) can compile on non-Apple targets
//! without pulling in CoreGraphics/CoreFoundation dependencies. No keys are
//! intercepted and nothing is injected.

use crate::core::ghost::NoFocusInspector;
use crate::core::injector::NullInputSink;
use crate::core::interceptor::{ControlEvent, Interceptor};
use crate::core::main_thread::MainThreadHandle;
use crate::platform::TapError;
use crossbeam_channel::Receiver;
use std::time::Duration;

/// A tap that never receives events.
///
/// Queued control events are applied on stop.
pub struct KeyTap {
    interceptor: Interceptor,
    controls: Receiver<ControlEvent>,
    running: bool,
}

impl KeyTap {
    pub fn start(
        interceptor: Interceptor,
        controls: Receiver<ControlEvent>,
    ) -> Result<Self, TapError> {
        tracing::warn!("Keyboard interception is only supported on macOS");
        Ok(Self {
            interceptor,
            controls,
            running: true,
        })
    }

    fn pump(&mut self) {
        while let Ok(event) = self.controls.try_recv() {
            self.interceptor.apply_control(event);
        }
    }

    pub fn stop(&mut self) {
        self.pump();
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_active(&self) -> bool {
        false
    }
}

/// On non-macOS platforms there is no keyboard tap to grant.
pub fn check_permission() -> bool {
    false
}

pub fn is_trusted() -> bool {
    false
}

pub fn focus_inspector(_main_thread: MainThreadHandle) -> NoFocusInspector {
    NoFocusInspector
}

pub fn input_sink() -> NullInputSink {
    NullInputSink
}

pub fn frontmost_bundle_id() -> Option<String> {
    None
}

pub fn self_bundle_id() -> Option<String> {
    None
}

pub fn pump_run_loop(timeout: Duration) {
    std::thread::sleep(timeout);
}

/// No workspace notifications on this platform.
pub struct AppActivationObserver;

impl AppActivationObserver {
    pub fn install(_on_activate: impl Fn(Option<String>) + 'static) -> Self {
        Self
    }
}

/// Sound cues are not played on this platform.
#[derive(Default)]
pub struct SoundPlayer;

impl SoundPlayer {
    pub fn new() -> Self {
        Self
    }

    pub fn play_toggle(&mut self, enabled: bool) {
        tracing::debug!(enabled, "Toggle sound skipped");
    }

    pub fn stop(&mut self) {}
}
