//! Intent classification
//!
//! The classifier model sorts each operator request into a nature, rewrites
//! it into a clean English task description for the downstream models, and
//! reports its confidence. Low-confidence results are demoted to unknown by
//! the caller; classifier failures degrade to unknown instead of erroring.

use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};

use super::LlmClient;
use crate::state::StateStore;

/// What kind of work the operator is asking for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RequestNature {
    ServerOperation,
    CodeGeneration,
    Explanatory,
    #[default]
    Unknown,
}

impl RequestNature {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestNature::ServerOperation => "server_operation",
            RequestNature::CodeGeneration => "code_generation",
            RequestNature::Explanatory => "explanatory",
            RequestNature::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for RequestNature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classifier verdict for one request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    #[serde(default)]
    pub nature: RequestNature,
    #[serde(default)]
    pub rewritten_request: String,
    #[serde(default)]
    pub confidence: f64,
}

impl Classification {
    /// Degraded verdict used when the classifier cannot be trusted
    pub fn unknown(input: &str) -> Self {
        Self {
            nature: RequestNature::Unknown,
            rewritten_request: input.to_string(),
            confidence: 0.0,
        }
    }
}

const CLASSIFIER_SYSTEM_PROMPT: &str = r#"You are an intent classifier and request normalizer for a Linux/DevOps automation system.

Your job consists of TWO tasks ONLY:

(1) CLASSIFY THE USER REQUEST into exactly one category:

- "server_operation"
  Linux / DevOps / server / OS level operations: processes, CPU, memory,
  disk, network, logs, services, file and folder manipulation, security
  checks, system state collection, command execution requests.
  Even if the user asks to "summarize" or "analyze", it is still
  server_operation when the content is clearly about system operations.

- "code_generation"
  Writing, debugging, modifying, reviewing, or analyzing program code
  (Python / Bash / Go / JS / Rust / etc).

- "explanatory"
  Conceptual explanation or learning content only. Applies only when the
  user asks what something means or requests knowledge, with no execution
  or system operation implied.

- "unknown"
  Ambiguous, unsafe, incomplete, or unrelated requests.

(2) NORMALIZE THE REQUEST
Rewrite the request into a clear, concise English task description so other
models can act on it. Preserve meaning, remove noise, do not change intent,
do not add assumptions, do not invent details.

MANDATORY OUTPUT FORMAT
You MUST return ONLY valid JSON:
{
 "nature": "server_operation | code_generation | explanatory | unknown",
 "rewritten_request": "string",
 "confidence": number from 0.0 to 1.0
}

RULES:
1. Output JSON only, no markdown, no extra text
2. Never execute or suggest commands
3. Never answer the request yourself
4. Never generate code
5. If uncertain, set nature = "unknown" and confidence <= 0.5

SERVER OPERATION PRIORITY RULE:
Requests about system processes, CPU, memory, filesystem, network, logs,
services, monitoring, or Linux command execution are "server_operation"
even when phrased as a summary or analysis request, in any language
(e.g. "현재 실행 중인 프로세스 요약해줘", "디스크 사용량 확인해줘")."#;

/// Process-lifetime classification cache keyed by request digest
#[derive(Default)]
pub struct Classifier {
    cache: HashMap<String, Classification>,
}

/// Cache key: request digest plus whether context was attached.
/// Hashing keeps arbitrarily long requests out of the map keys.
fn cache_key(input: &str, has_context: bool) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{}:{}", hex::encode(hasher.finalize()), has_context)
}

impl Classifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify a request, consulting the cache first.
    ///
    /// Any classifier failure (transport, bad JSON) degrades to the unknown
    /// verdict after a line in the error log.
    pub fn classify(
        &mut self,
        client: &LlmClient,
        model: &str,
        input: &str,
        file_ctx: &BTreeMap<String, String>,
        spinner: Option<&ProgressBar>,
        store: Option<&StateStore>,
    ) -> Classification {
        let key = cache_key(input, !file_ctx.is_empty());
        if let Some(cached) = self.cache.get(&key) {
            return cached.clone();
        }

        if let Some(pb) = spinner {
            pb.set_message(format!("classifying request ({})", model));
        }

        let payload = serde_json::json!({
            "user_request": input,
            "project_context": file_ctx,
        });

        let result = match client.chat_json(model, CLASSIFIER_SYSTEM_PROMPT, &payload) {
            Ok(value) => {
                let mut cls: Classification =
                    serde_json::from_value(value).unwrap_or_else(|_| Classification::unknown(input));
                if cls.rewritten_request.trim().is_empty() {
                    cls.rewritten_request = input.to_string();
                }
                cls
            }
            Err(e) => {
                if let Some(store) = store {
                    store.log_error(&format!("CLASSIFY_FAIL: {:#}", e));
                }
                Classification::unknown(input)
            }
        };

        self.cache.insert(key, result.clone());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nature_serde_snake_case() {
        let json = serde_json::to_string(&RequestNature::ServerOperation).unwrap();
        assert_eq!(json, r#""server_operation""#);

        let parsed: RequestNature = serde_json::from_str(r#""code_generation""#).unwrap();
        assert_eq!(parsed, RequestNature::CodeGeneration);
    }

    #[test]
    fn test_classification_tolerates_partial_json() {
        // Models sometimes drop fields; missing ones take defaults
        let cls: Classification = serde_json::from_value(serde_json::json!({
            "nature": "explanatory"
        }))
        .unwrap();
        assert_eq!(cls.nature, RequestNature::Explanatory);
        assert_eq!(cls.confidence, 0.0);
    }

    #[test]
    fn test_classification_unknown_fallback() {
        let cls = Classification::unknown("check the disks");
        assert_eq!(cls.nature, RequestNature::Unknown);
        assert_eq!(cls.rewritten_request, "check the disks");
        assert_eq!(cls.confidence, 0.0);
    }

    #[test]
    fn test_cache_key_distinguishes_context() {
        let with = cache_key("list processes", true);
        let without = cache_key("list processes", false);
        assert_ne!(with, without);
        // Same input and flag must collapse to the same key
        assert_eq!(with, cache_key("list processes", true));
    }
}
