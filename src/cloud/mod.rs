//! Cloud endpoint verification
//!
//! One-shot authenticated probe against the cloud endpoint. The outcome
//! vocabulary is fixed: success, invalid-credential, rate-limited,
//! server-error, network-unreachable, name-resolution-failure, or a generic
//! failure with message. Credential problems and connectivity problems must
//! never be conflated, so classification happens here and nowhere else.

use std::time::Duration;
use thiserror::Error;

/// Probe timeout; generous enough for a cold TLS handshake
const PROBE_TIMEOUT: Duration = Duration::from_secs(15);

/// Non-success probe outcomes
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerifyError {
    #[error("credential was rejected by the endpoint")]
    InvalidCredential,

    #[error("endpoint is rate limiting this credential")]
    RateLimited,

    #[error("endpoint returned a server error (HTTP {0})")]
    ServerError(u16),

    #[error("network unreachable")]
    NetworkUnreachable,

    #[error("name resolution failure")]
    NameResolutionFailure,

    #[error("{0}")]
    Failure(String),
}

impl VerifyError {
    /// Stable operator-facing label
    pub fn label(&self) -> &'static str {
        match self {
            VerifyError::InvalidCredential => "invalid-credential",
            VerifyError::RateLimited => "rate-limited",
            VerifyError::ServerError(_) => "server-error",
            VerifyError::NetworkUnreachable => "network-unreachable",
            VerifyError::NameResolutionFailure => "name-resolution-failure",
            VerifyError::Failure(_) => "failure",
        }
    }

    /// What the operator should do about it
    pub fn remediation(&self) -> &'static str {
        match self {
            VerifyError::InvalidCredential => {
                "Check the API key in the secrets file and re-run `mcpd install`"
            }
            VerifyError::RateLimited => "Wait and retry; reduce request volume if it persists",
            VerifyError::ServerError(_) => "The endpoint is having trouble; retry later",
            VerifyError::NetworkUnreachable => "Check outbound network connectivity and firewalls",
            VerifyError::NameResolutionFailure => "Check DNS configuration (/etc/resolv.conf)",
            VerifyError::Failure(_) => "Inspect the message; restart the service if it persists",
        }
    }
}

/// Label used when the probe succeeds
pub const SUCCESS_LABEL: &str = "success";

/// Classify an HTTP response status. 2xx means the credential works.
pub fn classify_status(status: reqwest::StatusCode) -> Option<VerifyError> {
    if status.is_success() {
        return None;
    }
    match status.as_u16() {
        401 | 403 => Some(VerifyError::InvalidCredential),
        429 => Some(VerifyError::RateLimited),
        s if status.is_server_error() => Some(VerifyError::ServerError(s)),
        s => Some(VerifyError::Failure(format!("unexpected HTTP status {}", s))),
    }
}

/// Classify a transport-level failure.
///
/// DNS failures surface inside the connect error chain, so the chain is
/// sniffed before the broader connect/timeout classification.
pub fn classify_transport(e: &reqwest::Error) -> VerifyError {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(e);
    while let Some(err) = source {
        let text = err.to_string().to_lowercase();
        if text.contains("dns")
            || text.contains("name resolution")
            || text.contains("failed to lookup")
        {
            return VerifyError::NameResolutionFailure;
        }
        source = err.source();
    }

    if e.is_connect() || e.is_timeout() {
        return VerifyError::NetworkUnreachable;
    }

    VerifyError::Failure(e.to_string())
}

/// Probe the endpoint with the bearer credential.
///
/// A model-list request is the cheapest call that exercises DNS, TCP, TLS,
/// and authentication without consuming model quota.
pub fn verify_cloud(host: &str, api_key: &str) -> Result<(), VerifyError> {
    let client = reqwest::blocking::Client::builder()
        .timeout(PROBE_TIMEOUT)
        .build()
        .map_err(|e| VerifyError::Failure(e.to_string()))?;

    let url = format!("{}/api/tags", host.trim_end_matches('/'));
    let response = client
        .get(&url)
        .bearer_auth(api_key)
        .header("Accept", "application/json")
        .send()
        .map_err(|e| classify_transport(&e))?;

    match classify_status(response.status()) {
        None => Ok(()),
        Some(err) => Err(err),
    }
}
