//! Scheduler error type

/// Errors raised by the scheduling engine.
///
/// None of these are retryable: the engine is deterministic, so the same
/// inputs fail the same way. Retrying only makes sense at the storage
/// boundary (see `StorageError::ConcurrentModification`).
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchedulerError {
    /// Rating outside {1, 2, 3, 4}
    #[error("Invalid rating: {0} (expected 1=Again, 2=Hard, 3=Good or 4=Easy)")]
    InvalidRating(i32),
    /// Persisted state does not map to a known lifecycle state
    #[error("Unknown card state: '{0}'")]
    UnknownCardState(String),
    /// A computed or stored quantity is NaN, infinite or out of range
    #[error("Numeric domain error: {quantity} = {value}")]
    NumericDomain {
        /// Which quantity failed the check
        quantity: &'static str,
        /// The offending value
        value: f64,
    },
    /// Parameter set failed validation
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),
    /// A review log does not describe the card's most recent review
    #[error("Review log does not match card: {0}")]
    LogMismatch(String),
}

/// Scheduler result type
pub type Result<T> = std::result::Result<T, SchedulerError>;
