//! Domain error model.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// Why a command or value was refused.
///
/// Only deterministic outcomes belong here: the same input against the same
/// state always fails the same way. Storage, dispatch and configuration
/// failures have their own error types in the infra crate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Input the caller can correct (empty name, zero quantity, unknown option).
    #[error("validation failed: {0}")]
    Validation(String),

    /// State that must never exist (tenant mismatch, broken balance chain).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The aggregate was never created, or has been deleted.
    #[error("not found")]
    NotFound,

    /// The aggregate already exists.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    /// True when retrying with different input can succeed.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::InvariantViolation(_))
    }
}
