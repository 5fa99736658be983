//! The running agent: main loop, tap thread and the channels between them.
//!
//! The main thread owns the preference store and polls it, observes app
//! activation, answers accessibility requests from the tap thread, and
//! persists hotkey toggles. The tap thread owns the interceptor.

use crate::config::{keys, ConfigError, PreferenceStore, Settings, SELF_BUNDLE_ID};
use crate::core::engine::{builtin_engine, KeyTransformer};
use crate::core::ghost::GhostGuard;
use crate::core::injector::Injector;
use crate::core::interceptor::{ControlEvent, Interceptor, ToggleListener};
use crate::core::main_thread::main_thread_channel;
use crate::platform::{self, AppActivationObserver, KeyTap, SoundPlayer, TapError};
use crate::stats::SharedStats;
use crossbeam_channel::{select, unbounded, Sender};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Main-loop tick; bounds how long a main-thread request can wait.
const TICK: Duration = Duration::from_millis(20);

/// Run-loop pump per tick.
const RUN_LOOP_PUMP: Duration = Duration::from_millis(5);

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Tap error: {0}")]
    Tap(#[from] TapError),
}

/// Requests from the tap thread to the main loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentRequest {
    /// The hotkey flipped the enable flag
    Toggled { enabled: bool, play_sound: bool },
}

/// Forwards hotkey toggles to the main loop.
pub struct ChannelToggleListener {
    sender: Sender<AgentRequest>,
}

impl ChannelToggleListener {
    pub fn new(sender: Sender<AgentRequest>) -> Self {
        Self { sender }
    }
}

impl ToggleListener for ChannelToggleListener {
    fn on_toggle(&mut self, enabled: bool, play_sound: bool) {
        if self
            .sender
            .send(AgentRequest::Toggled {
                enabled,
                play_sound,
            })
            .is_err()
        {
            tracing::debug!("Main loop gone, toggle not persisted");
        }
    }
}

/// Polls the preference file and reports content changes.
pub struct PreferenceWatcher {
    path: PathBuf,
    current: PreferenceStore,
}

impl PreferenceWatcher {
    /// Load the store at `path`. A malformed file starts from defaults.
    pub fn new(path: PathBuf) -> Self {
        let current = match PreferenceStore::load_from(&path) {
            Ok(store) => store,
            Err(e) => {
                tracing::warn!("Could not load preferences, using defaults: {e}");
                PreferenceStore::new()
            }
        };
        Self { path, current }
    }

    pub fn store(&self) -> &PreferenceStore {
        &self.current
    }

    pub fn settings(&self) -> Settings {
        Settings::from_store(&self.current)
    }

    /// Re-read the file. Returns a fresh snapshot when the contents changed.
    ///
    /// A file that fails to parse keeps the last good contents.
    pub fn poll(&mut self) -> Option<Settings> {
        match PreferenceStore::load_from(&self.path) {
            Ok(store) if store != self.current => {
                self.current = store;
                tracing::info!("Preferences changed");
                Some(self.settings())
            }
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("Ignoring unreadable preferences: {e}");
                None
            }
        }
    }

    /// Persist a hotkey toggle and return the snapshot to broadcast.
    ///
    /// The tap may have applied an older snapshot after flipping its flag,
    /// so the caller re-sends this one to bring it back in line with disk.
    pub fn record_toggle(&mut self, enabled: bool) -> Settings {
        self.persist(keys::ENABLED, enabled);
        self.settings()
    }

    /// Write a single key through to disk.
    pub fn persist(&mut self, key: &str, value: impl Into<serde_json::Value>) {
        self.current.set(key, value);
        if let Err(e) = self.current.save_to(&self.path) {
            tracing::warn!("Could not save preferences: {e}");
        }
    }
}

/// Options for [`run`].
#[derive(Debug, Clone)]
pub struct AgentOptions {
    pub preferences_path: PathBuf,
    pub config_poll_interval: Duration,
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self {
            preferences_path: PreferenceStore::config_path(),
            config_poll_interval: Duration::from_secs(1),
        }
    }
}

/// Run the agent on the calling thread until `running` goes false.
///
/// The calling thread becomes the main thread for accessibility requests.
pub fn run(
    options: AgentOptions,
    stats: SharedStats,
    running: Arc<AtomicBool>,
) -> Result<(), AgentError> {
    let (main_thread, main_queue) = main_thread_channel();
    let (control_tx, control_rx) = unbounded();
    let (request_tx, request_rx) = unbounded();

    let mut watcher = PreferenceWatcher::new(options.preferences_path.clone());
    let settings = watcher.settings();
    tracing::info!(
        enabled = settings.enabled,
        shortcut = %settings.shortcut,
        excluded = settings.excluded_apps.len(),
        "Loaded preferences"
    );

    let transformer = KeyTransformer::with_options(builtin_engine(), settings.engine);
    if !transformer.is_available() {
        tracing::warn!("Transformation engine unavailable, keys pass through unchanged");
    }

    let self_app_id = platform::self_bundle_id().unwrap_or_else(|| SELF_BUNDLE_ID.to_string());
    let frontmost = platform::frontmost_bundle_id();

    let interceptor = Interceptor::new(
        settings,
        transformer,
        GhostGuard::new(Box::new(platform::focus_inspector(main_thread))),
        Injector::new(Box::new(platform::input_sink())),
    )
    .with_self_app_id(Some(self_app_id))
    .with_frontmost_app(frontmost)
    .with_toggle_listener(Box::new(ChannelToggleListener::new(request_tx)))
    .with_stats(stats);

    let mut tap = KeyTap::start(interceptor, control_rx)?;
    let activation = AppActivationObserver::install(forward_activations(control_tx.clone()));
    let mut sound = SoundPlayer::new();

    let mut last_config_check = Instant::now();

    while running.load(Ordering::SeqCst) {
        select! {
            recv(main_queue.receiver()) -> job => {
                if let Ok(job) = job {
                    job();
                }
            }
            recv(request_rx) -> request => {
                if let Ok(AgentRequest::Toggled { enabled, play_sound }) = request {
                    let settings = watcher.record_toggle(enabled);
                    let _ = control_tx.send(ControlEvent::SettingsChanged(settings));
                    if play_sound {
                        sound.play_toggle(enabled);
                    }
                }
            }
            default(TICK) => {}
        }
        main_queue.run_pending();
        platform::pump_run_loop(RUN_LOOP_PUMP);

        // Periodically reload preferences so the CLI can control a running agent.
        if last_config_check.elapsed() >= options.config_poll_interval {
            if let Some(settings) = watcher.poll() {
                let _ = control_tx.send(ControlEvent::SettingsChanged(settings));
            }
            last_config_check = Instant::now();
        }
    }

    drop(activation);
    // Unblock a tap thread that may be waiting on us before joining it.
    drop(main_queue);
    tap.stop();
    sound.stop();
    Ok(())
}

/// Sends every activation to the tap, repeats included.
fn forward_activations(controls: Sender<ControlEvent>) -> impl Fn(Option<String>) + 'static {
    move |app| {
        if controls.send(ControlEvent::AppActivated(app)).is_err() {
            tracing::debug!("Tap gone, activation dropped");
        }
    }
}
