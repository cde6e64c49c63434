//! Unified application error model and mapping helpers.
//! Handlers return `AppResult<T>`; the error renders as a JSON body with the
//! matching HTTP status.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    UserInput { code: String, message: String },
    Unauthenticated { code: String, message: String },
    Forbidden { code: String, message: String },
    NotFound { code: String, message: String },
    Conflict { code: String, message: String },
    PayloadTooLarge { code: String, message: String },
    Io { code: String, message: String },
    Internal { code: String, message: String },
}

impl AppError {
    fn parts(&self) -> (&str, &str) {
        match self {
            AppError::UserInput { code, message }
            | AppError::Unauthenticated { code, message }
            | AppError::Forbidden { code, message }
            | AppError::NotFound { code, message }
            | AppError::Conflict { code, message }
            | AppError::PayloadTooLarge { code, message }
            | AppError::Io { code, message }
            | AppError::Internal { code, message } => (code.as_str(), message.as_str()),
        }
    }

    pub fn code_str(&self) -> &str { self.parts().0 }

    pub fn message(&self) -> &str { self.parts().1 }

    pub fn user<S: Into<String>>(code: S, msg: S) -> Self { AppError::UserInput { code: code.into(), message: msg.into() } }
    pub fn unauthenticated<S: Into<String>>(code: S, msg: S) -> Self { AppError::Unauthenticated { code: code.into(), message: msg.into() } }
    pub fn forbidden<S: Into<String>>(code: S, msg: S) -> Self { AppError::Forbidden { code: code.into(), message: msg.into() } }
    pub fn not_found<S: Into<String>>(code: S, msg: S) -> Self { AppError::NotFound { code: code.into(), message: msg.into() } }
    pub fn conflict<S: Into<String>>(code: S, msg: S) -> Self { AppError::Conflict { code: code.into(), message: msg.into() } }
    pub fn too_large<S: Into<String>>(code: S, msg: S) -> Self { AppError::PayloadTooLarge { code: code.into(), message: msg.into() } }
    pub fn io<S: Into<String>>(code: S, msg: S) -> Self { AppError::Io { code: code.into(), message: msg.into() } }
    pub fn internal<S: Into<String>>(code: S, msg: S) -> Self { AppError::Internal { code: code.into(), message: msg.into() } }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::UserInput { .. } => 400,
            AppError::Unauthenticated { .. } => 401,
            AppError::Forbidden { .. } => 403,
            AppError::NotFound { .. } => 404,
            AppError::Conflict { .. } => 409,
            AppError::PayloadTooLarge { .. } => 413,
            AppError::Io { .. } => 503,
            AppError::Internal { .. } => 500,
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        // Store code raises AppError through anyhow for business rule failures
        match err.downcast::<AppError>() {
            Ok(app) => app,
            Err(other) => {
                tracing::error!(target: "vetsense::error", "internal error: {other:#}");
                AppError::Internal { code: "internal_error".into(), message: "internal server error".into() }
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = serde_json::json!({
            "status": "error",
            "code": self.code_str(),
            "message": self.message(),
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_mapping() {
        assert_eq!(AppError::user("bad_input", "oops").http_status(), 400);
        assert_eq!(AppError::unauthenticated("auth", "no").http_status(), 401);
        assert_eq!(AppError::forbidden("forbidden", "blocked").http_status(), 403);
        assert_eq!(AppError::not_found("not_found", "missing").http_status(), 404);
        assert_eq!(AppError::conflict("conflict", "dup").http_status(), 409);
        assert_eq!(AppError::too_large("too_large", "big").http_status(), 413);
        assert_eq!(AppError::io("io", "io").http_status(), 503);
        assert_eq!(AppError::internal("internal", "panic").http_status(), 500);
    }

    #[test]
    fn anyhow_roundtrip_keeps_app_error() {
        let err: anyhow::Error = AppError::conflict("email_taken", "email already registered").into();
        let app = AppError::from(err);
        assert_eq!(app.http_status(), 409);
        assert_eq!(app.code_str(), "email_taken");
    }

    #[test]
    fn foreign_errors_become_internal_without_leaking() {
        let app = AppError::from(anyhow::anyhow!("disk path /secret/users.json unreadable"));
        assert_eq!(app.http_status(), 500);
        assert!(!app.message().contains("/secret"));
    }

    #[test]
    fn response_carries_status() {
        let resp = AppError::forbidden("forbidden", "nope").into_response();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
}
