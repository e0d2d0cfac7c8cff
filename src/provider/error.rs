//! Provider error types.

use thiserror::Error;

/// Format an API error for display, extracting message from JSON if present.
///
/// Handles common patterns:
/// - `"HTTP 400: {"error": {"message": "API key not valid", "status": "INVALID_ARGUMENT"}}"`
/// - `"HTTP 401: {"error": {"message": "Incorrect API key", "code": "invalid_api_key"}}"`
/// - Plain text errors are returned as-is
#[must_use]
pub fn format_api_error(error: &str) -> String {
    if let Some(json_start) = error.find('{') {
        let json_str = &error[json_start..];

        if let Ok(json) = serde_json::from_str::<serde_json::Value>(json_str)
            && let Some(msg) = extract_error_message(&json)
        {
            // Preserve HTTP status prefix if present
            let prefix = &error[..json_start].trim();
            if prefix.is_empty() {
                return msg;
            }
            return format!("{prefix} {msg}");
        }
    }

    error.to_string()
}

/// Extract user-friendly message from JSON error response.
fn extract_error_message(json: &serde_json::Value) -> Option<String> {
    // {"error": {"message": "...", "code": "..."}}  (OpenAI)
    // {"error": {"message": "...", "status": "..."}} (Google)
    // {"type": "error", "error": {"type": "...", "message": "..."}} (Anthropic)
    if let Some(error_obj) = json.get("error") {
        if let Some(msg) = error_obj.get("message").and_then(|v| v.as_str()) {
            let mut result = msg.to_string();

            if let Some(code) = error_obj.get("code").and_then(|v| v.as_str()) {
                result = format!("{result} (code: {code})");
            } else if let Some(status) = error_obj.get("status").and_then(|v| v.as_str()) {
                result = format!("{result} (status: {status})");
            } else if let Some(kind) = error_obj.get("type").and_then(|v| v.as_str()) {
                result = format!("{result} (type: {kind})");
            }

            return Some(result);
        }

        if let Some(msg) = error_obj.as_str() {
            return Some(msg.to_string());
        }
    }

    if let Some(msg) = json.get("message").and_then(|v| v.as_str()) {
        return Some(msg.to_string());
    }

    None
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to build {provider} client: {reason}")]
    Build { provider: String, reason: String },

    #[error("API error: {}", format_api_error(.0))]
    Api(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Rate limited, retry after {retry_after:?}s")]
    RateLimited { retry_after: Option<u64> },

    #[error("Empty response from {0}")]
    EmptyResponse(String),
}
