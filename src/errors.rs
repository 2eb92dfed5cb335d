//! Crate-wide error type.
//!
//! A single `thiserror` enum (spec.md §7) covering the whole gallery:
//! `Conflict`, `NotFound`, `Unauthorized`, `Unavailable`, `Validation`.
//! It implements `actix_web::ResponseError` so handlers can return it
//! directly and get the mapped HTTP status. Absent-value lookups return
//! `Option`, never an error; the core never retries.

use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use thiserror::Error;

/// The one error type threaded through the gallery.
#[derive(Debug, Error)]
pub enum GalleryError {
    /// Natural-key collision on creation → 409.
    #[error("conflict: {entity} '{key}' already exists")]
    Conflict { entity: String, key: String },

    /// Lookup by key/id found nothing, or an owner mismatch surfaced as
    /// absence to avoid an enumeration side channel → 404.
    #[error("not found: {entity} '{key}'")]
    NotFound { entity: String, key: String },

    /// Missing or invalid credentials → 401.
    #[error("unauthorized")]
    Unauthorized,

    /// Store or blob I/O failure, with operation context → 503.
    #[error("store unavailable during {operation}: {detail}")]
    Unavailable { operation: String, detail: String },

    /// Malformed input, rejected before any store I/O → 400.
    #[error("validation error: {reason}")]
    Validation { reason: String },
}

impl GalleryError {
    /// Natural-key collision on creation.
    pub fn conflict(entity: &str, key: &str) -> Self {
        GalleryError::Conflict {
            entity: entity.to_string(),
            key: key.to_string(),
        }
    }

    /// Lookup found nothing (or owner mismatch surfaced as absence).
    pub fn not_found(entity: &str, key: &str) -> Self {
        GalleryError::NotFound {
            entity: entity.to_string(),
            key: key.to_string(),
        }
    }

    /// Store/blob I/O failure with the operation that triggered it.
    pub fn unavailable(operation: impl Into<String>, detail: impl std::fmt::Display) -> Self {
        GalleryError::Unavailable {
            operation: operation.into(),
            detail: detail.to_string(),
        }
    }

    /// Malformed input rejected before any store I/O.
    pub fn validation(reason: impl Into<String>) -> Self {
        GalleryError::Validation {
            reason: reason.into(),
        }
    }
}

impl actix_web::ResponseError for GalleryError {
    fn status_code(&self) -> StatusCode {
        match self {
            GalleryError::Conflict { .. } => StatusCode::CONFLICT,
            GalleryError::NotFound { .. } => StatusCode::NOT_FOUND,
            GalleryError::Unauthorized => StatusCode::UNAUTHORIZED,
            GalleryError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            GalleryError::Validation { .. } => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.to_string(),
        }))
    }
}
