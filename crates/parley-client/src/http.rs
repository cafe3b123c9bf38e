//! Shared HTTP plumbing: client construction, bearer auth, status mapping.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;

use crate::error::ClientError;

/// Build the `reqwest::Client` shared by every service client.
pub fn build_client(timeout: Duration) -> Result<Client, ClientError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ClientError::Transport(format!("failed to build HTTP client: {}", e)))
}

/// Join a base URL and a path with exactly one slash between them.
pub(crate) fn endpoint(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Attach `Authorization: Bearer <token>`.
pub(crate) fn with_bearer(request: RequestBuilder, token: &str) -> RequestBuilder {
    request.header(reqwest::header::AUTHORIZATION, format!("Bearer {}", token))
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

/// Pull the human-readable reason out of an `{error}` or `{message}` body.
pub(crate) fn extract_error_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    parsed
        .error
        .or(parsed.message)
        .filter(|m| !m.trim().is_empty())
}

/// Pass successful responses through; map everything else onto `ClientError`.
///
/// 401/403 become `Unauthorized`, 5xx become `Transport`, other statuses
/// become `Rejected` carrying the server's reason.
pub(crate) async fn check_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(ClientError::Unauthorized);
    }

    let body = response.text().await.unwrap_or_default();
    let message = extract_error_message(&body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_string()
    });

    if status.is_server_error() {
        Err(ClientError::Transport(format!(
            "HTTP {}: {}",
            status.as_u16(),
            message
        )))
    } else {
        Err(ClientError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}
