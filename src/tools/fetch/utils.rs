use super::types::{AttemptOutcome, PauseKind, RawResponse};
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;

const BODY_PREVIEW_CHARS: usize = 200;

/// Blocking delays go through here so tests can count them instead of waiting.
pub trait Sleeper: Send + Sync {
    fn pause(&self, kind: PauseKind, duration: Duration);
}

/// Sleeps on the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn pause(&self, _kind: PauseKind, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// Classify an HTTP response.
///
/// Only a 200 carrying JSON is a success. 403 and 429 get their own classes
/// since the orchestrator reacts to them; every other status is just counted.
pub(crate) fn classify_response(response: &RawResponse) -> AttemptOutcome {
    match response.status {
        StatusCode::OK => match serde_json::from_str::<Value>(&response.body) {
            Ok(payload) => AttemptOutcome::Success(payload),
            Err(e) => AttemptOutcome::Parse(format!(
                "non-JSON body ({e}): {}",
                preview(&response.body)
            )),
        },
        StatusCode::FORBIDDEN => AttemptOutcome::Forbidden,
        StatusCode::TOO_MANY_REQUESTS => AttemptOutcome::RateLimited,
        other => AttemptOutcome::OtherHttp(other.as_u16()),
    }
}

/// First characters of a body, for log lines.
pub(crate) fn preview(body: &str) -> String {
    let mut out: String = body.chars().take(BODY_PREVIEW_CHARS).collect();
    if body.chars().nth(BODY_PREVIEW_CHARS).is_some() {
        out.push_str("...");
    }
    out
}
