//! systemd integration
//!
//! Renders the service unit and wraps the `systemctl` verbs the lifecycle
//! commands need. The service manager stays an opaque collaborator: mcpd
//! only ever shells out to it.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::utils::{run_command_with_timeout, CommandResult, DEFAULT_COMMAND_TIMEOUT};

/// Declarative description of the managed unit
#[derive(Debug, Clone)]
pub struct UnitSpec {
    pub unit_name: String,
    pub description: String,
    pub exec_start: String,
    pub working_dir: PathBuf,
    pub env_file: PathBuf,
    /// Scheduling niceness for the service process
    pub nice: i32,
    /// CPU ceiling, e.g. "50%"
    pub cpu_quota: String,
    /// Negative values shelter the service from the OOM killer
    pub oom_score_adjust: i32,
}

impl UnitSpec {
    /// Build the spec for the daemon at `exec_path` under the given config.
    pub fn for_daemon(
        unit_name: &str,
        exec_path: &Path,
        working_dir: &Path,
        env_file: &Path,
    ) -> Self {
        Self {
            unit_name: unit_name.to_string(),
            description: "mcpd LLM ops agent".to_string(),
            exec_start: format!("{} serve", exec_path.display()),
            working_dir: working_dir.to_path_buf(),
            env_file: env_file.to_path_buf(),
            nice: 10,
            cpu_quota: "50%".to_string(),
            oom_score_adjust: -100,
        }
    }

    /// Render the unit file text.
    pub fn render(&self) -> String {
        format!(
            "[Unit]\n\
             Description={description}\n\
             After=network-online.target\n\
             Wants=network-online.target\n\
             \n\
             [Service]\n\
             Type=simple\n\
             ExecStart={exec_start}\n\
             WorkingDirectory={working_dir}\n\
             EnvironmentFile={env_file}\n\
             Restart=always\n\
             RestartSec=5\n\
             Nice={nice}\n\
             CPUQuota={cpu_quota}\n\
             OOMScoreAdjust={oom}\n\
             \n\
             [Install]\n\
             WantedBy=multi-user.target\n",
            description = self.description,
            exec_start = self.exec_start,
            working_dir = self.working_dir.display(),
            env_file = self.env_file.display(),
            nice = self.nice,
            cpu_quota = self.cpu_quota,
            oom = self.oom_score_adjust,
        )
    }

    /// Write the unit file to `path`.
    pub fn write(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.render())
            .with_context(|| format!("Failed to write unit file: {}", path.display()))?;
        Ok(())
    }
}

/// Whether systemctl is on PATH at all
pub fn systemd_available() -> bool {
    which::which("systemctl").is_ok()
}

fn systemctl(args: &[&str]) -> CommandResult {
    run_command_with_timeout("systemctl", args, DEFAULT_COMMAND_TIMEOUT)
}

fn systemctl_checked(args: &[&str]) -> Result<()> {
    match systemctl(args) {
        CommandResult::Success(_) => Ok(()),
        CommandResult::Failed(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("systemctl {} failed: {}", args.join(" "), stderr.trim())
        }
        CommandResult::TimedOut => anyhow::bail!("systemctl {} timed out", args.join(" ")),
        CommandResult::SpawnError(e) => anyhow::bail!("{}", e),
    }
}

/// Whether the unit is known to systemd (loaded from any unit path)
pub fn unit_registered(unit: &str) -> bool {
    systemctl(&["cat", unit]).is_success()
}

/// Whether the unit is currently active
pub fn is_active(unit: &str) -> bool {
    systemctl(&["is-active", "--quiet", unit]).is_success()
}

/// Whether the unit is enabled at boot
pub fn is_enabled(unit: &str) -> bool {
    systemctl(&["is-enabled", "--quiet", unit]).is_success()
}

pub fn daemon_reload() -> Result<()> {
    systemctl_checked(&["daemon-reload"])
}

pub fn enable(unit: &str) -> Result<()> {
    systemctl_checked(&["enable", unit])
}

pub fn start(unit: &str) -> Result<()> {
    systemctl_checked(&["start", unit])
}

pub fn restart(unit: &str) -> Result<()> {
    systemctl_checked(&["restart", unit])
}

pub fn stop(unit: &str) -> Result<()> {
    systemctl_checked(&["stop", unit])
}

/// Stop the unit, tolerating "not loaded"/"not running".
/// Returns whether a stop actually happened.
pub fn stop_ignore_missing(unit: &str) -> bool {
    systemctl(&["stop", unit]).is_success()
}

/// Disable the unit, tolerating "not enabled"/"not found".
/// Returns whether a disable actually happened.
pub fn disable_ignore_missing(unit: &str) -> bool {
    systemctl(&["disable", unit]).is_success()
}

/// Remove a file, tolerating absence. Returns whether a file was removed.
pub fn remove_file_ignore_missing(path: &Path) -> Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_spec() -> UnitSpec {
        UnitSpec::for_daemon(
            "mcp",
            Path::new("/usr/local/bin/mcpd"),
            Path::new("/var/lib/mcp"),
            Path::new("/etc/mcp.env"),
        )
    }

    #[test]
    fn test_render_contains_restart_policy() {
        let rendered = sample_spec().render();
        assert!(rendered.contains("Restart=always"));
        assert!(rendered.contains("RestartSec=5"));
    }

    #[test]
    fn test_render_contains_resource_ceilings() {
        let rendered = sample_spec().render();
        assert!(rendered.contains("Nice=10"));
        assert!(rendered.contains("CPUQuota=50%"));
        assert!(rendered.contains("OOMScoreAdjust=-100"));
    }

    #[test]
    fn test_render_references_secrets_and_workdir() {
        let rendered = sample_spec().render();
        assert!(rendered.contains("EnvironmentFile=/etc/mcp.env"));
        assert!(rendered.contains("WorkingDirectory=/var/lib/mcp"));
        assert!(rendered.contains("ExecStart=/usr/local/bin/mcpd serve"));
        assert!(rendered.contains("WantedBy=multi-user.target"));
    }

    #[test]
    fn test_remove_file_ignore_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("unit.service");

        assert!(!remove_file_ignore_missing(&path).unwrap());

        std::fs::write(&path, "x").unwrap();
        assert!(remove_file_ignore_missing(&path).unwrap());
        assert!(!path.exists());
    }
}
