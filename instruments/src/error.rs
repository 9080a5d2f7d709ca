//! Error types for the instrument store

use crate::instrument::RiskTier;
use thiserror::Error;

/// Main error type for store operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// An input row could not be turned into an instrument
    #[error("Malformed record at row {row}: {reason}")]
    MalformedRecord { row: usize, reason: String },

    /// Load would exceed the configured instrument capacity
    #[error("Capacity exceeded: {offered} records offered, at most {max} allowed")]
    CapacityExceeded { max: usize, offered: usize },

    /// Name lookup miss
    #[error("Instrument not found: {0}")]
    NotFound(String),

    /// Id out of range
    #[error("Invalid index {index} (catalog holds {len} instruments)")]
    InvalidIndex { index: usize, len: usize },

    /// Selection amount exceeds what is left of the budget
    #[error("Insufficient budget: requested {requested:.2}, remaining {remaining:.2}")]
    InsufficientBudget { requested: f64, remaining: f64 },

    /// Ranking or allocation attempted on an empty catalog
    #[error("Catalog is empty")]
    EmptyCatalog,

    /// Budget must be finite and positive
    #[error("Invalid budget: {0} (must be positive)")]
    InvalidBudget(f64),

    /// Selection amount must be finite and non-negative
    #[error("Invalid amount: {0} (must be non-negative)")]
    InvalidAmount(f64),

    /// Risk tier name not recognized
    #[error("Unknown risk tier: {0} (expected High, Medium or Low)")]
    UnknownRiskTier(String),

    /// Manual selection outside the session's tier while enforcement is on
    #[error("Risk tier mismatch: session is {expected}, instrument is {actual}")]
    RiskTierMismatch { expected: RiskTier, actual: RiskTier },

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// JSON parsing error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl StoreError {
    pub(crate) fn malformed(row: usize, reason: impl Into<String>) -> Self {
        StoreError::MalformedRecord {
            row,
            reason: reason.into(),
        }
    }

    /// Whether the error concerns a single selection and the caller may retry.
    ///
    /// Structural errors (bad input, capacity, configuration) abort the
    /// operation that raised them.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StoreError::InvalidIndex { .. }
                | StoreError::InsufficientBudget { .. }
                | StoreError::InvalidAmount(_)
                | StoreError::RiskTierMismatch { .. }
        )
    }
}

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        assert!(StoreError::InvalidIndex { index: 9, len: 3 }.is_recoverable());
        assert!(StoreError::InsufficientBudget {
            requested: 350.0,
            remaining: 300.0
        }
        .is_recoverable());
        assert!(!StoreError::EmptyCatalog.is_recoverable());
        assert!(!StoreError::CapacityExceeded { max: 1, offered: 2 }.is_recoverable());
        assert!(!StoreError::malformed(0, "bad price").is_recoverable());
    }

    #[test]
    fn test_error_messages() {
        let err = StoreError::InsufficientBudget {
            requested: 350.0,
            remaining: 300.0,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient budget: requested 350.00, remaining 300.00"
        );

        let err = StoreError::malformed(4, "price is not numeric");
        assert!(err.to_string().contains("row 4"));
    }
}
