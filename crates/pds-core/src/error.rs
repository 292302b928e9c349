//! Error taxonomy for the dispatch pipeline.
//!
//! Every hard failure the pipeline can raise is a variant of [`PdsError`].
//! Variants carry enough context (line, plant, scenario key, unit, series) to
//! diagnose a bad input without re-running under a debugger. Soft conditions
//! such as an unmapped target unit are not errors; they are collected as
//! [`crate::diagnostics::Diagnostics`] warnings instead.
//!
//! # Example
//!
//! ```
//! use pds_core::{PdsError, PdsResult, ScenarioKey};
//!
//! fn check_duration(key: ScenarioKey, hours: f64) -> PdsResult<f64> {
//!     if hours > 0.0 {
//!         Ok(hours)
//!     } else {
//!         Err(PdsError::InvalidDuration { key, hours })
//!     }
//! }
//!
//! assert!(check_duration(ScenarioKey::new(1, 1, 1), 0.0).is_err());
//! ```

use thiserror::Error;

use crate::keys::ScenarioKey;

/// Unified error type for all pipeline operations.
#[derive(Error, Debug)]
pub enum PdsError {
    /// I/O errors (file access)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed input table (missing column, non-numeric field, bad category)
    #[error("Format error: {0}")]
    Format(String),

    /// A plant's raw weights sum to zero (or less), so they cannot be normalized
    #[error("Total weight for plant {plant} is {total}; cannot normalize")]
    DivideByZero { plant: String, total: f64 },

    /// No backing data exists for a series name under any supported storage form
    #[error("Series '{series}' not found under {base}")]
    SeriesNotFound { series: String, base: String },

    /// A coordinate or entity is absent from an opened series
    #[error("No value in series '{series}' for {coordinate}")]
    ValueNotFound { series: String, coordinate: String },

    /// The duration series yielded a non-positive (or non-finite) length
    #[error("Invalid duration {hours} h for scenario {key}")]
    InvalidDuration { key: ScenarioKey, hours: f64 },

    /// A target unit's class has no attribute/factor mapping
    #[error("Unknown element class '{class}' for unit '{unit}'")]
    UnknownClass { unit: String, class: String },

    /// The simulation adapter rejected an operation
    #[error("Adapter error: {0}")]
    Adapter(String),
}

/// Convenience type alias for Results using PdsError.
pub type PdsResult<T> = Result<T, PdsError>;

impl PdsError {
    /// Format error anchored to a 1-based line of the source table.
    pub fn format_at_line(line: usize, message: impl AsRef<str>) -> Self {
        PdsError::Format(format!("line {}: {}", line, message.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PdsError::UnknownClass {
            unit: "G1".into(),
            class: "ElmFoo".into(),
        };
        assert!(err.to_string().contains("ElmFoo"));
        assert!(err.to_string().contains("G1"));
    }

    #[test]
    fn test_invalid_duration_mentions_key() {
        let err = PdsError::InvalidDuration {
            key: ScenarioKey::new(3, 1, 2),
            hours: 0.0,
        };
        let text = err.to_string();
        assert!(text.contains("stage 3"));
        assert!(text.contains("interval 2"));
    }

    #[test]
    fn test_format_at_line() {
        let err = PdsError::format_at_line(7, "weight 'abc' is not a number");
        assert_eq!(
            err.to_string(),
            "Format error: line 7: weight 'abc' is not a number"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: PdsError = io_err.into();
        assert!(matches!(err, PdsError::Io(_)));
    }

    #[test]
    fn test_question_mark_operator() {
        fn inner() -> PdsResult<()> {
            Err(PdsError::Adapter("no active scenario".into()))
        }

        fn outer() -> PdsResult<()> {
            inner()?;
            Ok(())
        }

        assert!(outer().is_err());
    }
}
