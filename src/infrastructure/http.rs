//! Response checks shared by the chat transport and the statistics provider.
//!
//! Both upstreams wrap failures in JSON: the chat API as
//! `{"error": {"message": ...}}`, the statistics API as `{"message": ...}`.
//! Errors surface the inner message so a bad key or an unknown season reads
//! cleanly in the CLI, and throttling waits are bounded.

use serde_json::Value;

use crate::infrastructure::InfraError;

/// Wait used when a 429 carries no usable `Retry-After`.
const DEFAULT_RETRY_AFTER_SECS: u64 = 1;

/// Longest throttling wait honoured before retrying.
const MAX_RETRY_AFTER_SECS: u64 = 30;

/// Longest error message kept from a response body.
const MAX_ERROR_CHARS: usize = 300;

/// Turn a non-success response into an [`InfraError`].
///
/// Returns the response unchanged on success.
pub async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, InfraError> {
    let status = resp.status();
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(InfraError::RateLimited {
            retry_after_secs: retry_after_secs(&resp),
        });
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        let message = match error_message(&body) {
            Some(message) => message,
            None => status.canonical_reason().unwrap_or("request failed").to_string(),
        };
        return Err(InfraError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(resp)
}

/// Seconds to wait from `Retry-After`, capped at [`MAX_RETRY_AFTER_SECS`].
fn retry_after_secs(resp: &reqwest::Response) -> u64 {
    resp.headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
        .min(MAX_RETRY_AFTER_SECS)
}

/// Extract a readable message from an error body.
///
/// `None` for an empty body.
fn error_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    let message = match serde_json::from_str::<Value>(body) {
        Ok(value) => value
            .pointer("/error/message")
            .or_else(|| value.get("message"))
            .or_else(|| value.get("error"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| body.to_string()),
        Err(_) => body.to_string(),
    };
    Some(truncate(&message))
}

fn truncate(message: &str) -> String {
    if message.chars().count() <= MAX_ERROR_CHARS {
        return message.to_string();
    }
    let head: String = message.chars().take(MAX_ERROR_CHARS).collect();
    format!("{head}...")
}
