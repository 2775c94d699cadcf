//! Crate-wide error kinds.
//!
//! Mirrors the error taxonomy in spec §7: callers match on kind rather than
//! string-parse messages. `transient` errors are the only ones a caller
//! should retry; everything else is either a request problem (`validation`,
//! `not_found`, `authorization`), a queued-for-later state (`conflict`), or
//! aborts the operation (`fatal`).

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum CoreError {
    /// Request payload or business-rule violation (e.g. insufficient credit,
    /// invalid status transition). Surfaced to the caller as-is.
    #[error("validation error: {0}")]
    Validation(String),

    /// Entity lookup by id failed.
    #[error("not found: {0}")]
    NotFound(String),

    /// Caller's role is insufficient for the requested operation.
    #[error("authorization error: {0}")]
    Authorization(String),

    /// Detected in the sync engine; the operation stays queued until
    /// resolved, it does not propagate to a caller.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Network/timeout/deadlock class of error. Retried with backoff only by
    /// the sync worker, the SMS gateway, and the routing-service client —
    /// nowhere else retries silently.
    #[error("transient error: {0}")]
    Transient(String),

    /// Data integrity or configuration defect. Aborts the operation and is
    /// logged; never retried.
    #[error("fatal error: {0}")]
    Fatal(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    pub fn fatal(msg: impl Into<String>) -> Self {
        Self::Fatal(msg.into())
    }

    /// Whether the sync worker / SMS gateway / routing client should retry
    /// this error with backoff. Nothing else in the crate is allowed to.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<csv::Error> for CoreError {
    fn from(e: csv::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transient(e.to_string())
    }
}
