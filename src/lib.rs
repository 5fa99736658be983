//! ViType Agent - system-wide Vietnamese input for macOS.
//!
//! The agent taps every physical key-down, feeds printable characters to a
//! text-transformation engine and, when the engine asks for an edit,
//! replaces the just-typed characters with synthetic backspaces and text.
//!
//! # Guarantees
//!
//! - **No feedback loops**: every synthetic event carries
//!   [`INJECTED_EVENT_TAG`] and is passed through untouched
//! - **No key content at rest**: only decision counts are logged or stored
//! - **Fail open**: without permission or engine, keys pass through
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          ViType Agent                            │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐   ┌──────────────┐   ┌─────────────┐              │
//! │  │  KeyTap   │──▶│ Interceptor  │──▶│ Transformer │              │
//! │  │ (CGEvent) │   │ shortcut,    │   │  (engine)   │              │
//! │  └───────────┘   │ bypass, keys │   └──────┬──────┘              │
//! │        ▲         └──────────────┘          ▼                     │
//! │        │                            ┌─────────────┐              │
//! │        │  tagged events             │ GhostGuard  │◀── AX (main) │
//! │        │                            └──────┬──────┘              │
//! │        │                                   ▼                     │
//! │        └────────────────────────────  ┌──────────┐               │
//! │                                       │ Injector │               │
//! │                                       └──────────┘               │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use vitype_agent::core::{Decision, GhostGuard, Injector, Interceptor, KeyEvent};
//! use vitype_agent::core::{KeyTransformer, NoFocusInspector, NullInputSink};
//! use vitype_agent::Settings;
//!
//! let mut interceptor = Interceptor::new(
//!     Settings::default(),
//!     KeyTransformer::unavailable(),
//!     GhostGuard::new(Box::new(NoFocusInspector)),
//!     Injector::new(Box::new(NullInputSink)),
//! );
//!
//! // Without an engine every key is forwarded.
//! assert_eq!(interceptor.handle(&KeyEvent::char(0x00, "a")), Decision::Forward);
//! ```

pub mod agent;
pub mod config;
pub mod core;
pub mod logging;
pub mod platform;
pub mod stats;

// Re-export key types at crate root for convenience
pub use agent::{AgentError, AgentOptions, PreferenceWatcher};
pub use config::{ConfigError, PreferenceStore, Settings};
pub use core::{
    ControlEvent, Decision, EditAction, Interceptor, KeyEvent, KeyTransformer, Modifiers,
    Shortcut, TransformEngine, INJECTED_EVENT_TAG,
};
pub use platform::TapError;
pub use stats::{SessionStats, SharedStats, StatsSnapshot};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Whether this build links the transformation engine.
pub const ENGINE_LINKED: bool = cfg!(feature = "vitype-engine");
