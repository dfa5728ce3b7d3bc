//! Error types for billing-edge.

use chrono::{DateTime, Utc};

use crate::ids::IdError;

/// Result type for billing operations.
pub type Result<T> = std::result::Result<T, BillingError>;

/// Errors that can occur in billing operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BillingError {
    /// Advancing a billing period left the representable date range.
    #[error("billing period overflow advancing from {from}")]
    PeriodOverflow {
        /// The period boundary that could not be advanced.
        from: DateTime<Utc>,
    },

    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),
}
