//! Cloud model client
//!
//! Thin blocking client for an Ollama-compatible chat endpoint, plus the
//! chain-fallback invocation used by every model-backed operation: try each
//! model in order, log failures, surface the last error when the chain is
//! exhausted.

pub mod classify;
pub mod plan;

use anyhow::{Context, Result};
use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::McpConfig;
use crate::secrets;
use crate::state::StateStore;

/// Model calls can be slow; this sits above the planned-command timeout
const CHAT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    format: &'static str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Bearer-authenticated client for the configured cloud host
pub struct LlmClient {
    http: reqwest::blocking::Client,
    host: String,
    api_key: String,
}

impl LlmClient {
    pub fn new(host: &str, api_key: &str) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(CHAT_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            host: host.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Build a client from config, loading the credential from the secrets
    /// file when the environment does not already carry it.
    pub fn from_config(config: &McpConfig) -> Result<Self> {
        let api_key =
            secrets::ensure_credential(&config.service.secrets_path, &config.cloud.api_key_var)?;
        Self::new(&config.cloud.host, &api_key)
    }

    /// One JSON-format chat call. The model is instructed to emit JSON and
    /// the response content is parsed as such; unparseable content is an
    /// error so the caller can fall through to the next model.
    pub fn chat_json(
        &self,
        model: &str,
        system_prompt: &str,
        user_payload: &serde_json::Value,
    ) -> Result<serde_json::Value> {
        let request = ChatRequest {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: serde_json::to_string(user_payload)?,
                },
            ],
            format: "json",
            stream: false,
        };

        let url = format!("{}/api/chat", self.host);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .with_context(|| format!("Request to {} failed", model))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("{} returned HTTP {}", model, status.as_u16());
        }

        let chat: ChatResponse = response
            .json()
            .with_context(|| format!("Malformed chat response from {}", model))?;

        serde_json::from_str(&chat.message.content)
            .with_context(|| format!("{} did not return valid JSON content", model))
    }

    /// Try each model in the chain until one answers.
    ///
    /// Failures are appended to the error log and shown on the spinner;
    /// only an exhausted chain is an error.
    pub fn chat_with_fallback(
        &self,
        models: &[String],
        system_prompt: &str,
        user_payload: &serde_json::Value,
        spinner: Option<&ProgressBar>,
        store: Option<&StateStore>,
    ) -> Result<serde_json::Value> {
        let mut last_error: Option<anyhow::Error> = None;

        for model in models {
            if let Some(pb) = spinner {
                pb.set_message(format!("requesting {}", model));
            }

            match self.chat_json(model, system_prompt, user_payload) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if let Some(store) = store {
                        store.log_error(&format!("MODEL_FAIL {}: {:#}", model, e));
                    }
                    if let Some(pb) = spinner {
                        pb.set_message(format!("{} failed, trying next", model));
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| anyhow::anyhow!("model chain is empty"))
            .context("all models in the chain failed"))
    }
}
