use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use thiserror::Error;

/// Category of a failed upstream call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    /// Upstream answered with success but sent nothing usable.
    EmptyUpstreamResponse,
    InternalServerError,
    /// Inbound request used a method the route does not serve.
    MethodNotAllowed,
}

impl ApiErrorKind {
    pub fn status(self) -> StatusCode {
        match self {
            ApiErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            ApiErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ApiErrorKind::NotFound => StatusCode::NOT_FOUND,
            ApiErrorKind::EmptyUpstreamResponse => StatusCode::NO_CONTENT,
            ApiErrorKind::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
            ApiErrorKind::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        }
    }

    /// Short label sent to clients as `name`.
    pub fn label(self) -> &'static str {
        match self {
            ApiErrorKind::BadRequest => "Bad Request",
            ApiErrorKind::Unauthorized => "Unauthorized",
            ApiErrorKind::Forbidden => "Forbidden",
            ApiErrorKind::NotFound => "Not Found",
            ApiErrorKind::EmptyUpstreamResponse => "Empty upstream response",
            ApiErrorKind::InternalServerError => "Internal server error",
            ApiErrorKind::MethodNotAllowed => "Method Not Allowed",
        }
    }
}

/// A typed failure carrying the HTTP status it should surface as.
///
/// Serializes to `{"name", "message", "httpCode"}` and nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} ({}): {message}", .kind.label(), .kind.status().as_u16())]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn http_code(&self) -> u16 {
        self.kind.status().as_u16()
    }

    pub fn transport(url: &str, reason: impl std::fmt::Display) -> Self {
        Self::new(
            ApiErrorKind::InternalServerError,
            format!("Error when calling {url}. Reason: {reason}"),
        )
    }

    /// Classify a non-success upstream status.
    pub fn from_upstream_status(url: &str, status: StatusCode) -> Self {
        match status {
            StatusCode::BAD_REQUEST => {
                Self::new(ApiErrorKind::BadRequest, format!("Bad request to {url}."))
            }
            StatusCode::UNAUTHORIZED => {
                Self::new(ApiErrorKind::Unauthorized, "The GitHub token is invalid.")
            }
            StatusCode::FORBIDDEN => Self::new(
                ApiErrorKind::Forbidden,
                "The GitHub token does not have the necessary permissions.",
            ),
            StatusCode::NOT_FOUND => Self::new(
                ApiErrorKind::NotFound,
                format!("The resource at {url} was not found."),
            ),
            other => Self::new(
                ApiErrorKind::InternalServerError,
                format!("Unexpected error when calling {url}. Reason: {other}"),
            ),
        }
    }

    pub fn empty_response(url: &str) -> Self {
        Self::new(
            ApiErrorKind::EmptyUpstreamResponse,
            format!("Empty response received when calling {url}."),
        )
    }

    pub fn undecodable(url: &str, reason: impl std::fmt::Display) -> Self {
        Self::new(
            ApiErrorKind::InternalServerError,
            format!("Failed to decode response from {url}. Reason: {reason}"),
        )
    }
}

impl Serialize for ApiError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut body = serializer.serialize_struct("ApiError", 3)?;
        body.serialize_field("name", self.kind.label())?;
        body.serialize_field("message", &self.message)?;
        body.serialize_field("httpCode", &self.http_code())?;
        body.end()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.kind.status(), Json(self)).into_response()
    }
}
