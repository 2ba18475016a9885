// =============================================================================
// Error taxonomy for the leaderscan engine
// =============================================================================
//
// Three classes of failure, handled very differently:
// - Data errors (short history, unalignable benchmark, missing fields) are
//   per-instrument and non-fatal: the instrument is skipped and logged.
// - Persistence errors on the snapshot store are treated as a cold start.
// - Configuration errors may be fatal — there is no safe default for an
//   invalid config file that the operator clearly intended to be used.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("insufficient history: {got} bars, need at least {need}")]
    InsufficientData { got: usize, need: usize },

    #[error("no overlapping dates between instrument and benchmark")]
    NoOverlap,

    #[error("malformed price series: {0}")]
    BadSeries(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("snapshot store error: {0}")]
    Persistence(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ScanError {
    /// Whether this error is a per-instrument data problem that must never
    /// abort the batch.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            Self::InsufficientData { .. } | Self::NoOverlap | Self::BadSeries(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_errors_are_classified() {
        assert!(ScanError::InsufficientData { got: 10, need: 60 }.is_data_error());
        assert!(ScanError::NoOverlap.is_data_error());
        assert!(!ScanError::Config("bad".into()).is_data_error());
        assert!(!ScanError::Persistence("bad".into()).is_data_error());
    }

    #[test]
    fn messages_are_descriptive() {
        let e = ScanError::InsufficientData { got: 12, need: 60 };
        assert_eq!(
            e.to_string(),
            "insufficient history: 12 bars, need at least 60"
        );
    }
}
