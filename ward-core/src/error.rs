//! Error types for the core value algebra.

use thiserror::Error;

/// Errors raised while constructing [`crate::Identifier`], [`crate::BoundedString`]
/// or [`crate::Value`] instances.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValueError {
    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("invalid string literal: {0:?}")]
    InvalidString(String),

    #[error("lists cannot contain lists")]
    NestedList,
}
