//! Configuration validation.
//!
//! [`FilterConfig::validate`](crate::FilterConfig::validate) runs every check
//! and reports all problems at once, so a user fixing a config file sees the
//! whole list instead of one error per attempt.

use thiserror::Error;

/// Largest accepted block size.
pub const MAX_BLOCK_SIZE: usize = 1 << 16;

/// Highest FIFO priority accepted in a config file.
pub const MAX_PRIORITY: i32 = 99;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Value out of range.
    #[error("'{param}' value {value} out of range [{min}, {max}]")]
    OutOfRange {
        /// Name of the setting.
        param: String,
        /// The value that was out of range.
        value: f64,
        /// Minimum allowed value.
        min: f64,
        /// Maximum allowed value.
        max: f64,
    },

    /// Value that is not a usable number or string.
    #[error("invalid value for '{param}': {reason}")]
    InvalidFormat {
        /// Name of the setting.
        param: String,
        /// Description of the problem.
        reason: String,
    },

    /// The designed kernel would exceed the configured ceiling.
    #[error("kernel of {len} taps exceeds max_kernel_len {max}")]
    KernelTooLong {
        /// Taps the parameters would produce.
        len: usize,
        /// Configured ceiling.
        max: usize,
    },

    /// Multiple validation errors.
    #[error("multiple validation errors: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

impl ValidationError {
    pub(crate) fn out_of_range(
        param: &str,
        value: impl Into<f64>,
        min: impl Into<f64>,
        max: impl Into<f64>,
    ) -> Self {
        Self::OutOfRange {
            param: param.to_string(),
            value: value.into(),
            min: min.into(),
            max: max.into(),
        }
    }

    /// Collapse a list of errors: none is `Ok`, one is itself, more are `Multiple`.
    pub fn collect(mut errors: Vec<ValidationError>) -> ValidationResult<()> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(Self::Multiple(errors)),
        }
    }

    /// Number of individual problems.
    pub fn count(&self) -> usize {
        match self {
            Self::Multiple(errors) => errors.len(),
            _ => 1,
        }
    }
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Check that `value` is finite and inside `[min, max]`.
pub(crate) fn check_range(
    errors: &mut Vec<ValidationError>,
    param: &str,
    value: f32,
    min: f32,
    max: f32,
) {
    if !value.is_finite() {
        errors.push(ValidationError::InvalidFormat {
            param: param.to_string(),
            reason: format!("{value} is not a finite number"),
        });
    } else if !(min..=max).contains(&value) {
        errors.push(ValidationError::out_of_range(param, value, min, max));
    }
}
