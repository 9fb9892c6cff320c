//! Client error types
//!
//! One enum covering the four failure classes of a call: local validation,
//! authentication, server/business errors and connectivity.

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::forms::FormError;
use crate::session::SessionError;
use crate::upload::UploadError;

/// Errors returned by API calls
#[derive(Error, Debug)]
pub enum ApiError {
    /// Rejected locally, nothing was sent
    #[error("{0}")]
    Validation(#[from] UploadError),

    /// Form field rejected locally, nothing was sent
    #[error("{0}")]
    InvalidForm(#[from] FormError),

    /// No stored session; the caller was redirected to login
    #[error("Not authenticated, please log in")]
    NotAuthenticated,

    /// Token refresh failed; the session was cleared and the caller redirected to login
    #[error("Session expired, please log in again")]
    SessionExpired,

    /// 401 on the retried attempt
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// Non-success status, message taken verbatim from the body
    #[error("{message} (status {status})")]
    Server { status: u16, message: String },

    /// Server unreachable or timed out
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Invalid response body: {0}")]
    Decode(String),

    #[error("Invalid request body: {0}")]
    Encode(String),

    #[error("Session storage error: {0}")]
    Session(#[from] SessionError),

    #[error("Request cancelled")]
    Cancelled,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    /// Map a transport error; timeouts and refused connections are connectivity problems
    pub(crate) fn transport(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            ApiError::Connection(err.to_string())
        } else {
            ApiError::Request(err)
        }
    }

    /// Build an error from a non-success response
    pub async fn from_response(response: Response) -> Self {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = extract_message(&body).unwrap_or_else(|| default_message(status));

        if status == StatusCode::UNAUTHORIZED {
            ApiError::Unauthorized { message }
        } else {
            ApiError::Server {
                status: status.as_u16(),
                message,
            }
        }
    }

    /// The caller has to log in again
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            ApiError::NotAuthenticated | ApiError::SessionExpired | ApiError::Unauthorized { .. }
        )
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Server { status, .. } => Some(*status),
            ApiError::Unauthorized { .. } => Some(401),
            _ => None,
        }
    }

    /// Text suitable for showing to an end user
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Connection(_) => {
                "Connection error: could not reach the server, check your network".to_string()
            }
            ApiError::Server { message, .. } | ApiError::Unauthorized { message } => {
                message.clone()
            }
            other => other.to_string(),
        }
    }
}

/// Pass successful responses through, turn the rest into errors
pub async fn ensure_success(response: Response) -> ApiResult<Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(ApiError::from_response(response).await)
    }
}

/// Check the status and decode a JSON body
pub async fn json_body<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    let response = ensure_success(response).await?;
    let bytes = response.bytes().await.map_err(ApiError::transport)?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
}

fn default_message(status: StatusCode) -> String {
    format!(
        "request failed with status {}",
        status.canonical_reason().unwrap_or(status.as_str())
    )
}

/// Pull a human-readable message out of an error body
///
/// Looks at `error`, then the first entry of `details`, then `detail`,
/// `message`, the first field error, and finally the raw text.
pub fn extract_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) else {
        return Some(trimmed.to_string());
    };

    let Some(object) = value.as_object() else {
        return first_string(&value).or_else(|| Some(trimmed.to_string()));
    };

    if let Some(error) = object.get("error").and_then(|v| v.as_str()) {
        return Some(error.to_string());
    }

    if let Some(details) = object.get("details").and_then(|v| v.as_object()) {
        if let Some(first) = details.values().find_map(first_string) {
            return Some(first);
        }
    }

    for key in ["detail", "message"] {
        if let Some(text) = object.get(key).and_then(|v| v.as_str()) {
            return Some(text.to_string());
        }
    }

    object
        .values()
        .find_map(first_string)
        .or_else(|| Some(trimmed.to_string()))
}

fn first_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Array(items) => items.iter().find_map(first_string),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_error_field() {
        let body = r#"{"error": "Archivo no encontrado", "details": {"file": ["ignored"]}}"#;
        assert_eq!(extract_message(body).unwrap(), "Archivo no encontrado");
    }

    #[test]
    fn test_extract_details() {
        let body = r#"{"details": {"file": ["Solo se permiten archivos CSV (.csv)"]}}"#;
        assert_eq!(
            extract_message(body).unwrap(),
            "Solo se permiten archivos CSV (.csv)"
        );
    }

    #[test]
    fn test_extract_detail_and_field_errors() {
        assert_eq!(
            extract_message(r#"{"detail": "Not found."}"#).unwrap(),
            "Not found."
        );
        assert_eq!(
            extract_message(r#"{"non_field_errors": ["Credenciales inválidas"]}"#).unwrap(),
            "Credenciales inválidas"
        );
    }

    #[test]
    fn test_extract_plain_text_and_empty() {
        assert_eq!(
            extract_message("  Internal Server Error \n").unwrap(),
            "Internal Server Error"
        );
        assert!(extract_message("   ").is_none());
        assert_eq!(extract_message(r#"{"count": 3}"#).unwrap(), r#"{"count": 3}"#);
    }

    #[test]
    fn test_user_message() {
        let err = ApiError::Server {
            status: 404,
            message: "Informe no encontrado".to_string(),
        };
        assert_eq!(err.user_message(), "Informe no encontrado");
        assert_eq!(err.to_string(), "Informe no encontrado (status 404)");
        assert_eq!(err.status(), Some(404));

        let err = ApiError::Connection("tcp connect error".to_string());
        assert!(err.user_message().starts_with("Connection error"));
        assert!(!err.requires_login());
        assert!(ApiError::SessionExpired.requires_login());
    }
}
