//! Request context handling
//!
//! Detects when a request wants project file context attached, loads the
//! eligible files from the runtime directory under size caps, and masks
//! credential-looking content before anything reaches a model.

use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

/// Keywords that switch a request into report-only mode
pub const REPORT_KEYWORDS: &[&str] = &["report mode", "report_only", "--report", "[report]"];

/// Keywords that cause file context to be attached.
/// The Korean entries match the operator vocabulary the service grew up with.
pub const CONTEXT_TRIGGERS: &[&str] = &[
    "이 폴더",
    "현재 폴더",
    "파일 참고",
    "코드 참고",
    "스크립트 참고",
    "project",
    "context",
];

/// File extensions eligible for context attachment
const ALLOWED_EXT: &[&str] = &["py", "sh", "conf", "yml", "yaml", "json", "toml"];

/// Marker appended when a file is cut at the per-file cap
const TRUNCATED_MARKER: &str = "\n...[TRUNCATED]";

fn sensitive_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)(api[_-]?key|password|secret|token|auth|authorization)")
            .expect("sensitive pattern is valid")
    })
}

/// Whether the raw request asks for report-only handling
pub fn is_report_mode(input: &str) -> bool {
    let t = input.to_lowercase();
    REPORT_KEYWORDS.iter().any(|k| t.contains(k))
}

/// Whether the raw request asks for file context
pub fn should_attach_context(input: &str) -> bool {
    let t = input.to_lowercase();
    CONTEXT_TRIGGERS
        .iter()
        .any(|k| t.contains(&k.to_lowercase()))
}

/// Replace credential-looking tokens with a mask
pub fn mask_sensitive(text: &str) -> String {
    sensitive_pattern().replace_all(text, "[MASKED]").to_string()
}

/// Load eligible files from `dir` as name → masked content.
///
/// Files over `max_per_file` bytes are truncated with a marker; loading
/// stops before `max_total` is exceeded. Unreadable files are skipped.
/// Ordering is deterministic (BTreeMap keyed by file name).
pub fn load_file_context(
    dir: &Path,
    max_per_file: usize,
    max_total: usize,
) -> BTreeMap<String, String> {
    let mut ctx = BTreeMap::new();
    let mut total = 0usize;

    let mut entries: Vec<_> = match std::fs::read_dir(dir) {
        Ok(rd) => rd.filter_map(|e| e.ok()).collect(),
        Err(_) => return ctx,
    };
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let eligible = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| ALLOWED_EXT.contains(&e.to_lowercase().as_str()))
            .unwrap_or(false);
        if !eligible {
            continue;
        }

        let Ok(mut data) = std::fs::read_to_string(&path) else {
            continue;
        };
        if data.len() > max_per_file {
            let mut cut = max_per_file;
            while cut > 0 && !data.is_char_boundary(cut) {
                cut -= 1;
            }
            data.truncate(cut);
            data.push_str(TRUNCATED_MARKER);
        }
        let data = mask_sensitive(&data);

        if total + data.len() > max_total {
            break;
        }
        total += data.len();

        let name = entry.file_name().to_string_lossy().to_string();
        ctx.insert(name, data);
    }

    ctx
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_report_mode_detection() {
        assert!(is_report_mode("please run in REPORT MODE"));
        assert!(is_report_mode("check disks [report]"));
        assert!(!is_report_mode("check disks"));
    }

    #[test]
    fn test_context_trigger_detection() {
        assert!(should_attach_context("summarize this PROJECT"));
        assert!(should_attach_context("이 폴더 내용을 확인해줘"));
        assert!(!should_attach_context("check cpu usage"));
    }

    #[test]
    fn test_mask_sensitive_keywords() {
        let masked = mask_sensitive("OLLAMA_API_KEY=abc password: hunter2");
        assert!(!masked.contains("API_KEY"));
        assert!(!masked.contains("password"));
        assert!(masked.contains("[MASKED]"));
    }

    #[test]
    fn test_load_context_filters_and_truncates() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("run.sh"), "echo hi").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        std::fs::write(dir.path().join("big.json"), "x".repeat(100)).unwrap();

        let ctx = load_file_context(dir.path(), 40, 10_000);
        assert!(ctx.contains_key("run.sh"));
        assert!(!ctx.contains_key("notes.txt"));
        assert!(ctx["big.json"].ends_with(TRUNCATED_MARKER));
        assert!(ctx["big.json"].starts_with("xxxx"));
    }

    #[test]
    fn test_load_context_respects_total_cap() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.sh"), "a".repeat(50)).unwrap();
        std::fs::write(dir.path().join("b.sh"), "b".repeat(50)).unwrap();

        let ctx = load_file_context(dir.path(), 1000, 60);
        assert_eq!(ctx.len(), 1);
        assert!(ctx.contains_key("a.sh"));
    }

    #[test]
    fn test_load_context_missing_dir_is_empty() {
        let ctx = load_file_context(Path::new("/definitely/not/here"), 10, 10);
        assert!(ctx.is_empty());
    }
}
