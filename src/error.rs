//! Error handling (spec §7).
//!
//! `CoreError` models the six named error kinds; `AppError` is the HTTP-edge
//! shape the teacher's `error.rs` uses (`StatusCode` + message,
//! `IntoResponse` impl, helper constructors) — kept verbatim in structure,
//! generalized away from `sqlx::Error`-specific mapping since storage engines
//! are no longer assumed to be SQL.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::query::QueryError;
use crate::storage::EngineError;
use crate::tags::BadTagError;
use crate::time::TimespanParseError;

/// The six error kinds of spec §7, modeled as one enum that knows how to map
/// itself to an HTTP status (`EngineInitError` is fatal at startup and is
/// never converted to a response; it surfaces via `anyhow` in `main`).
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("bad metric id: {0}")]
    BadMetricId(String),
    #[error(transparent)]
    Timespan(#[from] TimespanParseError),
    #[error("malformed request body: {0}")]
    BodyDecode(String),
    #[error(transparent)]
    EngineIo(#[from] EngineError),
}

impl From<BadTagError> for CoreError {
    fn from(err: BadTagError) -> Self {
        CoreError::BadMetricId(err.0)
    }
}

impl From<QueryError> for CoreError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::BadMetricId(id) => CoreError::BadMetricId(id),
            QueryError::BadTag(tag) => CoreError::BadMetricId(tag.0),
            QueryError::Timespan(ts) => CoreError::Timespan(ts),
            QueryError::Engine(engine) => CoreError::EngineIo(engine),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

/// The HTTP-edge error shape (spec §7 "the core surfaces query-path errors
/// as HTTP status + `{code,message}` JSON").
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match &err {
            CoreError::BadMetricId(_) => {
                AppError::new(StatusCode::BAD_REQUEST, "bad_metric_id", err.to_string())
            }
            CoreError::Timespan(_) => {
                AppError::new(StatusCode::BAD_REQUEST, "timespan_parse_error", err.to_string())
            }
            CoreError::BodyDecode(_) => {
                AppError::new(StatusCode::BAD_REQUEST, "body_decode_error", err.to_string())
            }
            CoreError::EngineIo(_) => {
                tracing::error!(error = %err, "storage engine I/O error");
                AppError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "engine_io_error",
                    "storage engine error",
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.code,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
