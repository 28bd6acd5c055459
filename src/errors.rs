use crate::services::{file_store::FileStoreError, gateway::GatewayError};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use std::fmt;

/// A lightweight wrapper for handler errors that keeps the response body
/// local. The body is the exact JSON value sent to the client, since the
/// API's error shapes differ per endpoint (bare strings for most failures,
/// an object for a missing upload).
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub body: Value,
}

impl AppError {
    /// Create a new AppError with a specific status and a plain string body.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            body: Value::String(msg.into()),
        }
    }

    /// `400` with the `Error: <cause>` string body used for upstream and
    /// store failures.
    pub fn bad_request(cause: impl fmt::Display) -> Self {
        Self::new(StatusCode::BAD_REQUEST, format!("Error: {cause}"))
    }

    /// `400` object body for an upload request carrying no file.
    pub fn no_file_uploaded() -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: json!({ "success": false, "error": "No file uploaded" }),
        }
    }

    /// `404` for an unknown record id.
    pub fn file_not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "File not found")
    }

    /// `500` for failures below the handler contract (e.g. a multipart
    /// stream aborted by the body-size limit).
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.body {
            Value::String(msg) => write!(f, "{}", msg),
            other => write!(f, "{}", other),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<FileStoreError> for AppError {
    fn from(err: FileStoreError) -> Self {
        match err {
            FileStoreError::NotFound(_) | FileStoreError::KeyNotFound(_) => Self::file_not_found(),
            other => Self::bad_request(other),
        }
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        Self::bad_request(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::internal(err.to_string())
    }
}
