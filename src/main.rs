//! ViType Agent CLI
//!
//! System-wide Vietnamese input for macOS.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use vitype_agent::{
    agent::{self, AgentOptions},
    config::{data_dir, keys, parse_preference_value, registered_default, PreferenceStore},
    core::bypass::{format_bundle_id_list, normalize_bundle_id, parse_bundle_id_list},
    logging::init_logging,
    platform::{check_permission, is_trusted},
    stats::{create_shared_stats_with_persistence, read_persisted},
    Settings, ENGINE_LINKED, VERSION,
};

#[derive(Parser)]
#[command(name = "vitype")]
#[command(author = "ViType")]
#[command(version = VERSION)]
#[command(about = "System-wide Vietnamese input for macOS", long_about = None)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the agent in the foreground
    Run,

    /// Turn transformation on
    Enable,

    /// Turn transformation off
    Disable,

    /// Flip transformation on or off
    Toggle,

    /// Show permissions, preferences and statistics
    Status,

    /// Manage apps where transformation is skipped
    Exclude {
        #[command(subcommand)]
        action: ExcludeAction,
    },

    /// Set a preference (value parsed as JSON, else taken as a string)
    Set { key: String, value: String },

    /// Show configuration
    Config,
}

#[derive(Subcommand)]
enum ExcludeAction {
    /// Add a bundle identifier, e.g. com.apple.Terminal
    Add { bundle_id: String },
    /// Remove a bundle identifier
    Remove { bundle_id: String },
    /// List excluded bundle identifiers
    List,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run => cmd_run(),
        Commands::Enable => cmd_set_enabled(Some(true)),
        Commands::Disable => cmd_set_enabled(Some(false)),
        Commands::Toggle => cmd_set_enabled(None),
        Commands::Status => cmd_status(),
        Commands::Exclude { action } => cmd_exclude(action),
        Commands::Set { key, value } => cmd_set(&key, &value),
        Commands::Config => cmd_config(),
    }
}

fn cmd_run() -> Result<()> {
    println!("ViType Agent v{VERSION}");
    println!();

    // Missing permission is not fatal; the tap keeps retrying.
    if !check_permission() {
        eprintln!("Warning: Input Monitoring permission not granted.");
        eprintln!();
        eprintln!("To grant permission:");
        eprintln!("1. Open System Settings > Privacy & Security");
        eprintln!("2. Add this application under 'Input Monitoring' and 'Accessibility'");
        eprintln!("3. Keys pass through unchanged until then");
        eprintln!();
    }
    if !ENGINE_LINKED {
        eprintln!("Warning: built without the vitype-engine feature; keys pass through unchanged.");
        eprintln!();
    }

    let settings = Settings::from_store(&load_store()?);
    println!(
        "  Transformation: {}",
        if settings.enabled { "on" } else { "off" }
    );
    println!("  Toggle shortcut: {}", settings.shortcut);
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let stats = create_shared_stats_with_persistence(data_dir().join("stats.json"));

    // Set up Ctrl+C handler
    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(running.clone())?;

    agent::run(AgentOptions::default(), stats.clone(), running)?;

    if let Err(e) = stats.save() {
        eprintln!("Warning: Could not save stats: {e}");
    }

    println!();
    println!("{}", stats.summary());
    Ok(())
}

fn cmd_set_enabled(enabled: Option<bool>) -> Result<()> {
    let mut store = load_store()?;
    let enabled = enabled.unwrap_or_else(|| !store.bool(keys::ENABLED));
    store.set(keys::ENABLED, enabled);
    store.save().context("saving preferences")?;
    println!(
        "Transformation {}.",
        if enabled { "enabled" } else { "disabled" }
    );
    Ok(())
}

fn cmd_status() -> Result<()> {
    let store = load_store()?;
    let settings = Settings::from_store(&store);

    println!("ViType Agent Status");
    println!("===================");
    println!();

    println!(
        "Input Monitoring Permission: {}",
        if check_permission() {
            "Granted ✓"
        } else {
            "Not Granted ✗"
        }
    );
    println!(
        "Accessibility Permission: {}",
        if is_trusted() {
            "Granted ✓"
        } else {
            "Not Granted ✗"
        }
    );
    println!(
        "Engine: {}",
        if ENGINE_LINKED {
            "linked"
        } else {
            "not linked (keys pass through)"
        }
    );
    println!();

    println!("Preferences:");
    println!("  Transformation: {}", on_off(settings.enabled));
    println!("  Toggle shortcut: {}", settings.shortcut);
    println!("  Input method: {:?}", settings.engine.input_method);
    println!("  Output encoding: {:?}", settings.engine.output_encoding);
    println!("  Auto-fix tone: {}", on_off(settings.engine.auto_fix_tone));
    println!(
        "  Ghost suggestion guard: {} ({}ms)",
        on_off(settings.ghost_guard_enabled),
        settings.ghost_guard_timeout.as_millis()
    );
    println!(
        "  App exclusion: {} ({} apps)",
        on_off(settings.app_exclusion_enabled),
        settings.excluded_apps.len()
    );
    println!();

    let stats_path = data_dir().join("stats.json");
    match read_persisted(&stats_path) {
        Ok(stats) => {
            println!("Cumulative Statistics:");
            println!("  Keys seen: {}", stats.keys_seen);
            println!("  Edits applied: {}", stats.edits_applied);
            println!("  Ghost suggestion wipes: {}", stats.ghost_wipes);
            println!("  Keys passed through in bypass: {}", stats.bypassed);
            println!("  Toggles: {}", stats.toggles);
            println!(
                "  Last updated: {}",
                stats.last_updated.format("%Y-%m-%d %H:%M:%S UTC")
            );
        }
        Err(_) => println!("No previous session data found."),
    }
    Ok(())
}

fn cmd_exclude(action: ExcludeAction) -> Result<()> {
    let mut store = load_store()?;
    let mut excluded = parse_bundle_id_list(&store.string(keys::EXCLUDED_BUNDLE_IDS));

    match action {
        ExcludeAction::List => {
            if excluded.is_empty() {
                println!("No excluded apps.");
            }
            for id in &excluded {
                println!("{id}");
            }
            return Ok(());
        }
        ExcludeAction::Add { bundle_id } => {
            let id = normalize_bundle_id(&bundle_id);
            if id.is_empty() {
                bail!("bundle identifier is empty");
            }
            if excluded.insert(id.clone()) {
                println!("Excluded {id}.");
            } else {
                println!("{id} is already excluded.");
            }
        }
        ExcludeAction::Remove { bundle_id } => {
            let id = normalize_bundle_id(&bundle_id);
            if excluded.remove(&id) {
                println!("Removed {id}.");
            } else {
                println!("{id} was not excluded.");
            }
        }
    }

    store.set(keys::EXCLUDED_BUNDLE_IDS, format_bundle_id_list(&excluded));
    store.save().context("saving preferences")?;
    Ok(())
}

fn cmd_set(key: &str, value: &str) -> Result<()> {
    if registered_default(key).is_none() {
        bail!(
            "unknown preference '{key}'; known keys: {}",
            keys::ALL.join(", ")
        );
    }
    let mut store = load_store()?;
    let value = parse_preference_value(value);
    println!("{key} = {value}");
    store.set(key, value);
    store.save().context("saving preferences")?;
    Ok(())
}

fn cmd_config() -> Result<()> {
    let store = load_store()?;

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", PreferenceStore::config_path());
    println!();
    for key in keys::ALL {
        let (value, source) = match store.get(key) {
            Some(value) => (value.clone(), ""),
            None => (registered_default(key).unwrap_or_default(), " (default)"),
        };
        println!("  {key}: {value}{source}");
    }
    Ok(())
}

fn load_store() -> Result<PreferenceStore> {
    PreferenceStore::load().context("loading preferences")
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) -> Result<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .context("setting Ctrl+C handler")
}
