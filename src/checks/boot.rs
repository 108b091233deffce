//! Boot check
//!
//! After a reboot the daemon inspects the host for the failure patterns it
//! has learned across previous runs: each tag in `patterns.json` selects a
//! probe, and the collected snapshots land in `boot_report.json`. A host
//! that never failed gets an empty (and cheap) boot check.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::state::{PatternTag, StateStore};
use crate::utils::{self, run_shell_with_timeout, DEFAULT_COMMAND_TIMEOUT};

/// Snapshot written to `boot_report.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BootReport {
    pub timestamp: f64,
    pub runtime_dir: String,
    pub checks: BTreeMap<String, serde_json::Value>,
}

fn shell_snapshot(command: &str) -> serde_json::Value {
    match run_shell_with_timeout(command, DEFAULT_COMMAND_TIMEOUT).stdout_string() {
        Some(stdout) => serde_json::Value::String(stdout),
        None => serde_json::Value::Null,
    }
}

/// Run the probes selected by the learned patterns.
pub fn run_checks(patterns: &[PatternTag], runtime_dir: &str) -> BootReport {
    let mut checks = BTreeMap::new();

    for tag in patterns {
        let value = match tag {
            PatternTag::Oom => serde_json::json!({
                "swap": shell_snapshot("swapon --show"),
                "recent": shell_snapshot("dmesg | grep -i 'out of memory' | tail -5"),
            }),
            PatternTag::Disk => shell_snapshot("df -h /"),
            PatternTag::Service => shell_snapshot("systemctl --failed"),
            PatternTag::Network => shell_snapshot("ip route"),
        };
        checks.insert(tag.as_str().to_string(), value);
    }

    BootReport {
        timestamp: utils::now_epoch(),
        runtime_dir: runtime_dir.to_string(),
        checks,
    }
}

/// Full boot check: load patterns, probe, persist the report.
pub fn run_and_store(store: &StateStore) -> BootReport {
    let patterns = store.load_patterns();
    let report = run_checks(&patterns, &store.runtime_dir().display().to_string());
    store.safe_write(&store.boot_report_path(), &report);
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_no_patterns_means_empty_report() {
        let report = run_checks(&[], "/var/lib/mcp");
        assert!(report.checks.is_empty());
        assert!(report.timestamp > 0.0);
    }

    #[test]
    fn test_disk_pattern_produces_disk_check() {
        let report = run_checks(&[PatternTag::Disk], "/var/lib/mcp");
        assert!(report.checks.contains_key("DISK"));
        assert_eq!(report.checks.len(), 1);
    }

    #[test]
    fn test_run_and_store_writes_report() {
        let dir = tempdir().unwrap();
        let store = StateStore::new(dir.path());
        store.record_incident("command", "No space left on device", 1.0);

        let report = run_and_store(&store);
        assert!(report.checks.contains_key("DISK"));
        assert!(store.boot_report_path().exists());

        let reloaded: BootReport = store.safe_read(&store.boot_report_path());
        assert_eq!(reloaded.checks.len(), report.checks.len());
    }
}
