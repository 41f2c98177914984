//! Error types for the upload service.
//!
//! Every write-path failure collapses into a bare HTTP 400 when it reaches a
//! handler; the variants exist so logs and tests can tell causes apart.

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("No file uploaded under field `{0}`")]
    MissingUpload(String),

    #[error("Unexpected file field `{0}`")]
    UnexpectedField(String),

    #[error("Too many files under field `{field}` (max {max})")]
    TooManyFiles { field: String, max: usize },

    #[error("Invalid file name: {0:?}")]
    InvalidFileName(String),

    #[error("Multipart error: {0}")]
    Multipart(#[from] MultipartError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Blob not found: {0}")]
    BlobNotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Path `{0}` is required")]
    MissingField(&'static str),

    #[error("Duplicate key: email {0:?} already exists")]
    DuplicateEmail(String),

    #[error("Malformed record id: {0:?}")]
    InvalidId(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::warn!("request failed: {self}");
        StatusCode::BAD_REQUEST.into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
