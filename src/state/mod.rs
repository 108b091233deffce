//! Persistent state for the managed service
//!
//! Everything lives as JSON under the runtime directory: `state.json`
//! (heartbeat/activity), `incidents.json` (append-only failure records),
//! `patterns.json` (deduplicated failure tags consumed by the boot check),
//! plus a plain-text `error.log`.
//!
//! Readers are tolerant: a missing or corrupt file yields the default value
//! and a line in the error log, never a hard failure. The daemon must keep
//! running through bad state files.

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const STATE_FILE: &str = "state.json";
pub const INCIDENTS_FILE: &str = "incidents.json";
pub const PATTERNS_FILE: &str = "patterns.json";
pub const BOOT_REPORT_FILE: &str = "boot_report.json";
pub const ERROR_LOG_FILE: &str = "error.log";

/// Heartbeat/activity snapshot written by the serve loop
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceState {
    /// Liveness signal, written every heartbeat period
    #[serde(default)]
    pub last_heartbeat: f64,

    /// Last time a request was handled; drives the idle watcher
    #[serde(default)]
    pub last_activity: f64,
}

impl ServiceState {
    /// Age of the heartbeat relative to `now`, in seconds
    pub fn heartbeat_age(&self, now: f64) -> f64 {
        now - self.last_heartbeat
    }

    /// Age of the last handled request relative to `now`, in seconds
    pub fn idle_for(&self, now: f64) -> f64 {
        now - self.last_activity
    }
}

/// One recorded failure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    /// Seconds since the Unix epoch
    pub timestamp: f64,
    /// Where the failure came from ("command", "model_chain", ...)
    pub source: String,
    /// Failure text (command + stderr, or the chain error)
    pub detail: String,
    /// Learned pattern tag, when the text matched one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<PatternTag>,
}

/// Failure pattern vocabulary shared with the boot check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatternTag {
    #[serde(rename = "OOM")]
    Oom,
    #[serde(rename = "DISK")]
    Disk,
    #[serde(rename = "SERVICE")]
    Service,
    #[serde(rename = "NETWORK")]
    Network,
}

impl PatternTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternTag::Oom => "OOM",
            PatternTag::Disk => "DISK",
            PatternTag::Service => "SERVICE",
            PatternTag::Network => "NETWORK",
        }
    }
}

impl std::fmt::Display for PatternTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classify failure text into a pattern tag by keyword.
///
/// Order matters: memory and disk symptoms are more specific than the
/// generic service/network vocabulary.
pub fn classify_pattern(text: &str) -> Option<PatternTag> {
    let t = text.to_lowercase();

    if t.contains("out of memory") || t.contains("oom") || t.contains("cannot allocate memory") {
        return Some(PatternTag::Oom);
    }
    if t.contains("no space left") || t.contains("disk full") || t.contains("enospc") {
        return Some(PatternTag::Disk);
    }
    if t.contains("connection refused")
        || t.contains("network is unreachable")
        || t.contains("timed out")
        || t.contains("name resolution")
        || t.contains("dns")
    {
        return Some(PatternTag::Network);
    }
    if t.contains("failed to start") || t.contains("inactive (dead)") || t.contains("systemctl") {
        return Some(PatternTag::Service);
    }

    None
}

/// Store rooted at the runtime directory
#[derive(Debug, Clone)]
pub struct StateStore {
    runtime_dir: PathBuf,
}

impl StateStore {
    pub fn new(runtime_dir: impl Into<PathBuf>) -> Self {
        Self {
            runtime_dir: runtime_dir.into(),
        }
    }

    pub fn runtime_dir(&self) -> &Path {
        &self.runtime_dir
    }

    pub fn state_path(&self) -> PathBuf {
        self.runtime_dir.join(STATE_FILE)
    }

    pub fn incidents_path(&self) -> PathBuf {
        self.runtime_dir.join(INCIDENTS_FILE)
    }

    pub fn patterns_path(&self) -> PathBuf {
        self.runtime_dir.join(PATTERNS_FILE)
    }

    pub fn boot_report_path(&self) -> PathBuf {
        self.runtime_dir.join(BOOT_REPORT_FILE)
    }

    pub fn error_log_path(&self) -> PathBuf {
        self.runtime_dir.join(ERROR_LOG_FILE)
    }

    /// Append a line to the error log. Best effort: logging must never fail
    /// the caller.
    pub fn log_error(&self, msg: &str) {
        let _ = std::fs::create_dir_all(&self.runtime_dir);
        if let Ok(mut f) = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.error_log_path())
        {
            let _ = writeln!(f, "[{}] {}", Utc::now().to_rfc3339(), msg);
        }
    }

    /// Read a JSON file, returning the default on any failure (logged).
    pub fn safe_read<T: DeserializeOwned + Default>(&self, path: &Path) -> T {
        if !path.exists() {
            return T::default();
        }
        match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(value) => value,
                Err(e) => {
                    self.log_error(&format!("READ_FAIL {}: {}", path.display(), e));
                    T::default()
                }
            },
            Err(e) => {
                self.log_error(&format!("READ_FAIL {}: {}", path.display(), e));
                T::default()
            }
        }
    }

    /// Write a JSON file, logging on failure instead of propagating.
    pub fn safe_write<T: Serialize>(&self, path: &Path, value: &T) {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        match serde_json::to_string_pretty(value) {
            Ok(json) => {
                if let Err(e) = std::fs::write(path, json) {
                    self.log_error(&format!("WRITE_FAIL {}: {}", path.display(), e));
                }
            }
            Err(e) => self.log_error(&format!("WRITE_FAIL {}: {}", path.display(), e)),
        }
    }

    /// Load the heartbeat state; missing or corrupt files yield zeroes.
    pub fn load_state(&self) -> ServiceState {
        self.safe_read(&self.state_path())
    }

    /// Load the heartbeat state only if the file exists and parses with a
    /// heartbeat present. The health check needs to tell "no state at all"
    /// apart from "stale state".
    pub fn load_state_strict(&self) -> Option<ServiceState> {
        let path = self.state_path();
        let content = std::fs::read_to_string(&path).ok()?;
        let state: ServiceState = serde_json::from_str(&content).ok()?;
        if state.last_heartbeat == 0.0 {
            return None;
        }
        Some(state)
    }

    /// Write a fresh heartbeat, preserving activity.
    pub fn touch_heartbeat(&self, now: f64) {
        let mut state = self.load_state();
        state.last_heartbeat = now;
        if state.last_activity == 0.0 {
            state.last_activity = now;
        }
        self.safe_write(&self.state_path(), &state);
    }

    /// Record request activity (and a heartbeat alongside).
    pub fn touch_activity(&self, now: f64) {
        let mut state = self.load_state();
        state.last_heartbeat = now;
        state.last_activity = now;
        self.safe_write(&self.state_path(), &state);
    }

    /// Load all recorded incidents (empty on missing/corrupt file).
    pub fn load_incidents(&self) -> Vec<Incident> {
        self.safe_read(&self.incidents_path())
    }

    /// Load the learned pattern tags.
    pub fn load_patterns(&self) -> Vec<PatternTag> {
        self.safe_read(&self.patterns_path())
    }

    /// Append an incident and fold its pattern tag into `patterns.json`.
    pub fn record_incident(&self, source: &str, detail: &str, now: f64) -> Incident {
        let incident = Incident {
            timestamp: now,
            source: source.to_string(),
            detail: detail.to_string(),
            pattern: classify_pattern(detail),
        };

        let mut incidents = self.load_incidents();
        incidents.push(incident.clone());
        self.safe_write(&self.incidents_path(), &incidents);

        if let Some(tag) = incident.pattern {
            let mut patterns = self.load_patterns();
            if !patterns.contains(&tag) {
                patterns.push(tag);
                self.safe_write(&self.patterns_path(), &patterns);
            }
        }

        incident
    }

    /// Seed missing state files so a fresh install has a complete runtime dir.
    pub fn seed(&self, now: f64) {
        if !self.state_path().exists() {
            self.safe_write(
                &self.state_path(),
                &ServiceState {
                    last_heartbeat: now,
                    last_activity: now,
                },
            );
        }
        if !self.incidents_path().exists() {
            self.safe_write(&self.incidents_path(), &Vec::<Incident>::new());
        }
        if !self.patterns_path().exists() {
            self.safe_write(&self.patterns_path(), &Vec::<PatternTag>::new());
        }
    }
}
