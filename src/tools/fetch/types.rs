use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Response as seen by the orchestrator, before classification.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// A request that never produced a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportFailure {
    /// The proxy engaged for this attempt could not be reached or refused to relay.
    Proxy(String),
    /// Anything else: DNS, TLS, timeouts, resets.
    Network(String),
}

impl TransportFailure {
    pub fn is_proxy(&self) -> bool {
        matches!(self, Self::Proxy(_))
    }

    pub fn cause(&self) -> &str {
        match self {
            Self::Proxy(c) | Self::Network(c) => c,
        }
    }
}

impl fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Proxy(c) => write!(f, "proxy error: {c}"),
            Self::Network(c) => write!(f, "network error: {c}"),
        }
    }
}

/// Classified result of a single attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Success(Value),
    RateLimited,
    Forbidden,
    Transport(TransportFailure),
    /// 200 whose body is not JSON.
    Parse(String),
    OtherHttp(u16),
}

impl AttemptOutcome {
    /// Whether the path that carried the attempt should be quarantined.
    ///
    /// Only failures the path itself plausibly caused count: a 403 (the
    /// egress address is flagged) or a proxy that could not relay. Rate
    /// limits, bad bodies and server errors are the target's posture.
    pub fn penalizes_path(&self) -> bool {
        matches!(
            self,
            Self::Forbidden | Self::Transport(TransportFailure::Proxy(_))
        )
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::Success(_) => OutcomeKind::Success,
            Self::RateLimited => OutcomeKind::RateLimited,
            Self::Forbidden => OutcomeKind::Forbidden,
            Self::Transport(TransportFailure::Proxy(_)) => OutcomeKind::ProxyTransportError,
            Self::Transport(TransportFailure::Network(_)) => OutcomeKind::TransportError,
            Self::Parse(_) => OutcomeKind::ParseError,
            Self::OtherHttp(_) => OutcomeKind::OtherHttpError,
        }
    }
}

/// Payload-free label of an [`AttemptOutcome`], used in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Success,
    RateLimited,
    Forbidden,
    ProxyTransportError,
    TransportError,
    ParseError,
    OtherHttpError,
}

/// What the caller of [`Fetcher::fetch`](super::Fetcher::fetch) gets back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "payload", rename_all = "snake_case")]
pub enum FetchResult {
    Success(Value),
    ExhaustedFailure,
}

impl FetchResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn payload(&self) -> Option<&Value> {
        match self {
            Self::Success(v) => Some(v),
            Self::ExhaustedFailure => None,
        }
    }

    /// Consume the result and return just the payload.
    pub fn into_payload(self) -> Option<Value> {
        match self {
            Self::Success(v) => Some(v),
            Self::ExhaustedFailure => None,
        }
    }
}

/// Telemetry for one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// 1-based attempt number
    pub attempt: usize,
    pub egress: String,
    pub outcome: OutcomeKind,
    pub duration_ms: u64,
}

/// Result of a fetch including telemetry metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchReport {
    pub url: String,
    pub started_at: DateTime<Utc>,
    /// Total duration in milliseconds, pauses included
    pub duration_ms: u64,
    pub attempts: Vec<AttemptRecord>,
    pub result: FetchResult,
}

impl FetchReport {
    /// Consume the report and return just the result.
    pub fn into_result(self) -> FetchResult {
        self.result
    }
}

/// Why the orchestrator is sleeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PauseKind {
    /// Human-like hesitation before a request.
    Human,
    /// Back-off between attempts.
    Backoff,
    /// Cool-down after a 429.
    RateLimit,
}

impl PauseKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Human => "human",
            Self::Backoff => "backoff",
            Self::RateLimit => "rate-limit",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn only_path_faults_penalize() {
        assert!(AttemptOutcome::Forbidden.penalizes_path());
        assert!(AttemptOutcome::Transport(TransportFailure::Proxy("refused".into())).penalizes_path());
        assert!(!AttemptOutcome::Transport(TransportFailure::Network("timeout".into())).penalizes_path());
        assert!(!AttemptOutcome::RateLimited.penalizes_path());
        assert!(!AttemptOutcome::Parse("<html>".into()).penalizes_path());
        assert!(!AttemptOutcome::OtherHttp(500).penalizes_path());
        assert!(!AttemptOutcome::Success(json!({})).penalizes_path());
    }

    #[test]
    fn fetch_result_serializes_tagged() {
        let ok = serde_json::to_value(FetchResult::Success(json!({"events": []}))).unwrap();
        assert_eq!(ok, json!({"status": "success", "payload": {"events": []}}));
        let failed = serde_json::to_value(FetchResult::ExhaustedFailure).unwrap();
        assert_eq!(failed, json!({"status": "exhausted_failure"}));
    }
}
