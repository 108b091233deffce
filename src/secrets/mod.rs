//! Secrets file handling
//!
//! The secrets file is a restricted-permission `KEY=value` file consumed as
//! process environment at service start (`EnvironmentFile=` in the unit).

use anyhow::{Context, Result};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

/// Owner read/write only
const SECRETS_MODE: u32 = 0o600;

/// Write the secrets file with a single key/value pair, mode 0600.
pub fn write_secrets(path: &Path, var: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("refusing to write empty secret for {}", var);
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    fs::write(path, format!("{}={}\n", var, value.trim()))
        .with_context(|| format!("Failed to write secrets file: {}", path.display()))?;

    fs::set_permissions(path, fs::Permissions::from_mode(SECRETS_MODE))
        .with_context(|| format!("Failed to restrict {}", path.display()))?;

    Ok(())
}

/// Parse a secrets file into key/value pairs.
///
/// Comment lines and lines without `=` are skipped; the first `=` splits.
pub fn parse_secrets(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            line.split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
        })
        .collect()
}

/// Read one variable from a secrets file, if present and non-empty.
pub fn read_var(path: &Path, var: &str) -> Option<String> {
    let content = fs::read_to_string(path).ok()?;
    parse_secrets(&content)
        .into_iter()
        .find(|(k, _)| k == var)
        .map(|(_, v)| v)
        .filter(|v| !v.trim().is_empty())
}

/// Inject secrets into the process environment.
///
/// Variables already present in the environment win; the file only fills
/// gaps. A missing file is not an error.
pub fn load_into_env(path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read secrets file: {}", path.display()))?;

    for (key, value) in parse_secrets(&content) {
        if std::env::var_os(&key).is_none() {
            std::env::set_var(&key, &value);
        }
    }

    Ok(())
}

/// Ensure the credential is available, loading the secrets file when the
/// environment does not already carry it.
pub fn ensure_credential(path: &Path, var: &str) -> Result<String> {
    if let Ok(value) = std::env::var(var) {
        if !value.trim().is_empty() {
            return Ok(value);
        }
    }

    load_into_env(path)?;

    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => anyhow::bail!(
            "{} is not set; run `mcpd install` or export it before retrying",
            var
        ),
    }
}
