use thiserror::Error;

use subwatch_core::{SubscriptionId, ValidationError};

/// Errors produced by [`SubscriptionStore`](crate::SubscriptionStore) operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Subscription {0} not found")]
    NotFound(SubscriptionId),
    #[error("Invalid subscription: {0}")]
    Validation(#[from] ValidationError),
}
