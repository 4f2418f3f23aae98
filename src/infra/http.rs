use std::time::Duration;

use reqwest::header::{ACCEPT, CACHE_CONTROL, HeaderMap, HeaderValue};
use reqwest::{Client, Response, StatusCode};

use crate::error::{ApiErrorKind, AppError, AppResult};

/// Applied to every outbound request, uploads included.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(150);

/// One explicitly constructed client shared by injection, never through
/// module-level defaults. The bearer header is attached per request by the
/// callers.
pub fn build_client() -> AppResult<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .default_headers(headers)
        .build()
        .map_err(|err| AppError::Configuration(format!("failed to build HTTP client: {err}")))
}

/// 4xx is client-correctable, everything else environmental.
pub fn classify(status: StatusCode) -> ApiErrorKind {
    if status.is_client_error() {
        ApiErrorKind::Warning
    } else {
        ApiErrorKind::Error
    }
}

/// Pulls a human-readable message out of a JSON error body, falling back to
/// the caller-supplied default.
pub fn extract_message(body: &str, default_message: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "details", "error"] {
            if let Some(text) = value.get(key).and_then(|v| v.as_str()) {
                if !text.is_empty() {
                    return text.to_string();
                }
            }
        }
    }
    default_message.to_string()
}

/// Turns a non-2xx response into the error taxonomy. A 401 becomes an
/// authentication error so the caller directs the user back to `login`.
pub async fn error_for_response(response: Response, default_message: &str) -> AppError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    tracing::error!(%status, body = %body, "request failed");

    if status == StatusCode::UNAUTHORIZED {
        return AppError::Authentication(
            "the server rejected the session, run `mesa login` again".to_string(),
        );
    }

    AppError::Api {
        kind: classify(status),
        message: extract_message(&body, default_message),
    }
}

/// Timeouts and connectivity failures: generic message to the user, detail
/// to the log.
pub fn transport_error(err: reqwest::Error, default_message: &str) -> AppError {
    tracing::error!(error = %err, "request failed");
    AppError::Api {
        kind: ApiErrorKind::Error,
        message: default_message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_xx_classifies_as_warning() {
        assert_eq!(classify(StatusCode::BAD_REQUEST), ApiErrorKind::Warning);
        assert_eq!(classify(StatusCode::UNAUTHORIZED), ApiErrorKind::Warning);
        assert_eq!(
            classify(StatusCode::UNPROCESSABLE_ENTITY),
            ApiErrorKind::Warning
        );
    }

    #[test]
    fn everything_else_classifies_as_error() {
        assert_eq!(
            classify(StatusCode::INTERNAL_SERVER_ERROR),
            ApiErrorKind::Error
        );
        assert_eq!(classify(StatusCode::BAD_GATEWAY), ApiErrorKind::Error);
    }

    #[test]
    fn message_extraction_prefers_message_then_details_then_error() {
        assert_eq!(
            extract_message(r#"{"message":"subject is too short"}"#, "fallback"),
            "subject is too short"
        );
        assert_eq!(
            extract_message(r#"{"details":"missing field","error":"Bad Request"}"#, "fallback"),
            "missing field"
        );
        assert_eq!(
            extract_message(r#"{"error":"Bad Request"}"#, "fallback"),
            "Bad Request"
        );
    }

    #[test]
    fn message_extraction_falls_back_on_unusable_bodies() {
        assert_eq!(extract_message("", "fallback"), "fallback");
        assert_eq!(extract_message("<html>oops</html>", "fallback"), "fallback");
        assert_eq!(extract_message(r#"{"message":""}"#, "fallback"), "fallback");
        assert_eq!(extract_message(r#"{"message":42}"#, "fallback"), "fallback");
    }
}
