//! Per-keystroke classification.
//!
//! The interceptor sees every key-down in arrival order on the tap thread
//! and answers forward or suppress. Side channels (app switches, settings
//! changes) arrive as [`ControlEvent`]s which the tap applies between key
//! events, so all session state is touched from one thread only.

use crate::config::Settings;
use crate::core::bypass::should_bypass;
use crate::core::engine::KeyTransformer;
use crate::core::ghost::GhostGuard;
use crate::core::injector::Injector;
use crate::core::keys::KeyEvent;
use crate::stats::{create_shared_stats, SharedStats};

/// What to do with the original event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Deliver unchanged
    Forward,
    /// Swallow
    Suppress,
}

/// Ordered notifications from outside the tap thread.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    /// The frontmost application changed
    AppActivated(Option<String>),
    /// The preference store changed; carries a freshly derived snapshot
    SettingsChanged(Settings),
}

/// Told about hotkey toggles, so the new state can be persisted and
/// announced off the tap thread.
pub trait ToggleListener: Send {
    fn on_toggle(&mut self, enabled: bool, play_sound: bool);
}

pub struct NoopToggleListener;

impl ToggleListener for NoopToggleListener {
    fn on_toggle(&mut self, _enabled: bool, _play_sound: bool) {}
}

pub struct Interceptor {
    settings: Settings,
    frontmost_app: Option<String>,
    self_app_id: Option<String>,
    transformer: KeyTransformer,
    ghost_guard: GhostGuard,
    injector: Injector,
    toggle_listener: Box<dyn ToggleListener>,
    stats: SharedStats,
}

impl Interceptor {
    pub fn new(
        settings: Settings,
        transformer: KeyTransformer,
        ghost_guard: GhostGuard,
        injector: Injector,
    ) -> Self {
        let mut transformer = transformer;
        transformer.apply_options(settings.engine);
        Self {
            settings,
            frontmost_app: None,
            self_app_id: None,
            transformer,
            ghost_guard,
            injector,
            toggle_listener: Box::new(NoopToggleListener),
            stats: create_shared_stats(),
        }
    }

    /// Identifier of the agent's own app, always bypassed.
    pub fn with_self_app_id(mut self, id: Option<String>) -> Self {
        self.self_app_id = id;
        self
    }

    pub fn with_frontmost_app(mut self, id: Option<String>) -> Self {
        self.frontmost_app = id;
        self
    }

    pub fn with_toggle_listener(mut self, listener: Box<dyn ToggleListener>) -> Self {
        self.toggle_listener = listener;
        self
    }

    pub fn with_stats(mut self, stats: SharedStats) -> Self {
        self.stats = stats;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn frontmost_app(&self) -> Option<&str> {
        self.frontmost_app.as_deref()
    }

    pub fn is_bypassing(&self) -> bool {
        should_bypass(
            self.settings.enabled,
            self.settings.app_exclusion_enabled,
            &self.settings.excluded_apps,
            self.frontmost_app.as_deref(),
            self.self_app_id.as_deref(),
        )
    }

    /// Classify one key-down event.
    pub fn handle(&mut self, event: &KeyEvent) -> Decision {
        self.stats.record_key();

        // Our own synthetic output must never re-enter the pipeline.
        if event.is_injected() {
            self.stats.record_injected_skip();
            return Decision::Forward;
        }

        if self.settings.shortcut.matches(event.key_code, event.flags) {
            self.toggle();
            return Decision::Suppress;
        }

        if self.is_bypassing() {
            self.transformer.reset();
            self.stats.record_bypassed();
            return Decision::Forward;
        }

        if event.flags.has_action_modifier() || event.is_continuity_break() {
            self.transformer.reset();
            return Decision::Forward;
        }

        if event.is_backspace() {
            self.transformer.delete_last_character();
            return Decision::Forward;
        }

        let Some(text) = event.text.as_deref().filter(|t| !t.is_empty()) else {
            return Decision::Forward;
        };

        self.transformer.apply_options(self.settings.engine);

        let Some(action) = self.transformer.process(text) else {
            return Decision::Forward;
        };

        let extra_delete = self.ghost_guard.should_add_extra_delete(
            self.settings.ghost_guard_enabled,
            self.settings.ghost_guard_timeout,
        );
        tracing::debug!(
            delete_count = action.delete_count,
            extra_delete,
            "Applying edit"
        );
        self.injector.apply(&action, usize::from(extra_delete));
        self.stats.record_edit(extra_delete);
        Decision::Suppress
    }

    /// Apply a side-channel notification.
    pub fn apply_control(&mut self, event: ControlEvent) {
        match event {
            ControlEvent::AppActivated(app) => {
                tracing::debug!(app = app.as_deref().unwrap_or("<unknown>"), "App activated");
                self.frontmost_app = app;
                self.transformer.reset();
            }
            ControlEvent::SettingsChanged(settings) => {
                let was_bypassing = self.is_bypassing();
                self.settings = settings;
                self.transformer.apply_options(self.settings.engine);
                if was_bypassing != self.is_bypassing() {
                    self.transformer.reset();
                }
            }
        }
    }

    fn toggle(&mut self) {
        let enabled = !self.settings.enabled;
        self.settings = Settings {
            enabled,
            ..self.settings.clone()
        };
        self.transformer.reset();
        self.stats.record_toggle();
        tracing::info!(enabled, "Toggled via shortcut");
        self.toggle_listener
            .on_toggle(enabled, self.settings.play_sound_on_toggle);
    }
}
