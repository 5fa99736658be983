//! Session statistics.
//!
//! Counts what the pipeline decided, never what was typed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Decision counters for the current session.
#[derive(Debug)]
pub struct SessionStats {
    /// Key-down events seen by the tap, including injected ones
    keys_seen: AtomicU64,
    /// Injected events recognised and passed through
    injected_skipped: AtomicU64,
    /// Keys forwarded because bypass was active
    bypassed: AtomicU64,
    /// Edits replayed through synthetic input
    edits_applied: AtomicU64,
    /// Extra deletions sent for ghost suggestions
    ghost_wipes: AtomicU64,
    /// Hotkey toggles
    toggles: AtomicU64,
    /// Session start time
    session_start: DateTime<Utc>,
    /// Path for persisting stats
    persist_path: Option<PathBuf>,
}

impl SessionStats {
    pub fn new() -> Self {
        Self {
            keys_seen: AtomicU64::new(0),
            injected_skipped: AtomicU64::new(0),
            bypassed: AtomicU64::new(0),
            edits_applied: AtomicU64::new(0),
            ghost_wipes: AtomicU64::new(0),
            toggles: AtomicU64::new(0),
            session_start: Utc::now(),
            persist_path: None,
        }
    }

    /// Stats that accumulate on top of what was saved at `path`.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut stats = Self::new();
        stats.persist_path = Some(path);

        if let Err(e) = stats.load() {
            tracing::info!("Could not load previous stats: {e}");
        }

        stats
    }

    pub fn record_key(&self) {
        self.keys_seen.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_injected_skip(&self) {
        self.injected_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_bypassed(&self) {
        self.bypassed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_edit(&self, ghost_wipe: bool) {
        self.edits_applied.fetch_add(1, Ordering::Relaxed);
        if ghost_wipe {
            self.ghost_wipes.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_toggle(&self) {
        self.toggles.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            keys_seen: self.keys_seen.load(Ordering::Relaxed),
            injected_skipped: self.injected_skipped.load(Ordering::Relaxed),
            bypassed: self.bypassed.load(Ordering::Relaxed),
            edits_applied: self.edits_applied.load(Ordering::Relaxed),
            ghost_wipes: self.ghost_wipes.load(Ordering::Relaxed),
            toggles: self.toggles.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    pub fn summary(&self) -> String {
        let s = self.snapshot();
        format!(
            "Session Statistics:\n\
             - Keys seen: {}\n\
             - Injected events skipped: {}\n\
             - Keys passed through in bypass: {}\n\
             - Edits applied: {}\n\
             - Ghost suggestion wipes: {}\n\
             - Toggles: {}\n\
             - Session duration: {} seconds",
            s.keys_seen,
            s.injected_skipped,
            s.bypassed,
            s.edits_applied,
            s.ghost_wipes,
            s.toggles,
            s.session_duration_secs
        )
    }

    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let s = self.snapshot();
            let persisted = PersistedStats {
                keys_seen: s.keys_seen,
                injected_skipped: s.injected_skipped,
                bypassed: s.bypassed,
                edits_applied: s.edits_applied,
                ghost_wipes: s.ghost_wipes,
                toggles: s.toggles,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;
            std::fs::write(path, json)?;
        }
        Ok(())
    }

    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let persisted = read_persisted(path)?;
                self.keys_seen.store(persisted.keys_seen, Ordering::Relaxed);
                self.injected_skipped
                    .store(persisted.injected_skipped, Ordering::Relaxed);
                self.bypassed.store(persisted.bypassed, Ordering::Relaxed);
                self.edits_applied
                    .store(persisted.edits_applied, Ordering::Relaxed);
                self.ghost_wipes.store(persisted.ghost_wipes, Ordering::Relaxed);
                self.toggles.store(persisted.toggles, Ordering::Relaxed);
            }
        }
        Ok(())
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub keys_seen: u64,
    pub injected_skipped: u64,
    pub bypassed: u64,
    pub edits_applied: u64,
    pub ghost_wipes: u64,
    pub toggles: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

/// On-disk form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedStats {
    pub keys_seen: u64,
    pub injected_skipped: u64,
    pub bypassed: u64,
    pub edits_applied: u64,
    pub ghost_wipes: u64,
    pub toggles: u64,
    pub last_updated: DateTime<Utc>,
}

/// Read saved stats, e.g. for `vitype status`.
pub fn read_persisted(path: &std::path::Path) -> Result<PersistedStats, std::io::Error> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(std::io::Error::other)
}

pub type SharedStats = Arc<SessionStats>;

pub fn create_shared_stats() -> SharedStats {
    Arc::new(SessionStats::new())
}

pub fn create_shared_stats_with_persistence(path: PathBuf) -> SharedStats {
    Arc::new(SessionStats::with_persistence(path))
}
