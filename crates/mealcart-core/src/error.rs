//! Error taxonomy for shopping-list operations.

use thiserror::Error;

/// Errors returned by the aggregator and the meal planner.
///
/// Storage backends report failures as [`anyhow::Error`]; those surface
/// here as [`ShoppingListError::Storage`] and are never retried
/// automatically.
#[derive(Debug, Error)]
pub enum ShoppingListError {
    /// Input rejected before any state was touched (e.g. an empty item name).
    #[error("invalid input: {0}")]
    Validation(String),

    /// The referenced entry, recipe, or slot does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A conditional write kept losing to concurrent writers.
    #[error("write conflict on '{key}' after {attempts} attempts")]
    Conflict { key: String, attempts: u32 },

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl ShoppingListError {
    /// Short machine-readable code, used by the HTTP error body.
    pub fn code(&self) -> &'static str {
        match self {
            ShoppingListError::Validation(_) => "bad_request",
            ShoppingListError::NotFound(_) => "not_found",
            ShoppingListError::Conflict { .. } => "conflict",
            ShoppingListError::Storage(_) => "internal",
        }
    }
}

pub type Result<T> = std::result::Result<T, ShoppingListError>;
