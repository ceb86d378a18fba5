//! Errors raised by catalog domain rules.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// Input rejected at the domain boundary.
///
/// A lookup that finds nothing is not a `DomainError`; callers decide whether
/// absence matters to them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Unknown category, sort property or direction, or an unusable page size.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Text that does not parse as a product identifier.
    #[error("malformed product id: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}
