//! Error types for the bus module.

use thiserror::Error;

/// Errors that can occur while submitting a request.
///
/// Outcomes of the mutation itself are reported as an
/// [`AckStatus`](crate::AckStatus), not as errors.
#[derive(Debug, Error)]
pub enum BusError {
    /// The request body could not be encoded.
    #[error("encoding error: {0}")]
    Encode(String),

    /// The dispatcher has shut down.
    #[error("mutation bus closed")]
    Closed,

    /// The request was dropped without an ack.
    #[error("request {0} dropped without an ack")]
    Dropped(crate::messages::CorrelationId),
}

/// Result type for bus operations.
pub type Result<T> = std::result::Result<T, BusError>;
