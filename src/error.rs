// =============================================================================
// Engine errors
// =============================================================================
//
// Degenerate numerics (zero denominators, flat prices) are never errors: the
// indicator layer substitutes neutral values instead. Only malformed inputs
// and invalid configuration surface here.

use thiserror::Error;

/// Errors raised by the bias engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BiasError {
    /// The price series is shorter than the longest required look-back.
    #[error("Insufficient data: need at least {required} bars, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    /// A weight, threshold or period is out of its allowed range, or an
    /// ensemble was given nothing to combine.
    #[error("Invalid configuration '{field}': {reason}")]
    InvalidConfiguration { field: String, reason: String },

    /// A candle violates the series invariants (ordering, finiteness, OHLC).
    #[error("Invalid series at bar {index}: {reason}")]
    InvalidSeries { index: usize, reason: String },
}

impl BiasError {
    pub(crate) fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
