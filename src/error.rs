//! Error taxonomy for the glazing core.
//!
//! Every failure is reported synchronously to the caller. A failed calculation
//! never leaves partial results behind, and it does not touch state cached by
//! earlier successful calls.

use thiserror::Error;

use crate::optics::wavelength::LambdaRange;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// A required optional field is absent at the point of use.
    #[error("missing {field} for {context}")]
    MissingData {
        field: &'static str,
        context: String,
    },

    /// A geometry, material or shape combination without an implemented mapping.
    #[error("unsupported {what}: {value}")]
    Unsupported { what: &'static str, value: String },

    /// Measured data does not cover the wavelengths the method requires.
    #[error(
        "method {method} requires wavelengths {required}, measured data covers {measured}"
    )]
    Coverage {
        method: String,
        required: LambdaRange,
        measured: LambdaRange,
    },

    /// A method name does not exist in the supplied standard.
    #[error("standard {standard} has no method {method}")]
    MethodNotFound { standard: String, method: String },

    /// Tristimulus methods resolve to different wavelength domains.
    #[error("color methods disagree on wavelength range: x {x}, y {y}, z {z}")]
    ColorRangeMismatch {
        x: LambdaRange,
        y: LambdaRange,
        z: LambdaRange,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("layer index {index} out of range for {count} layers")]
    LayerIndex { index: usize, count: usize },

    #[error("gap index {index} out of range for {count} gaps")]
    GapIndex { index: usize, count: usize },

    /// Failure reported by an optical or thermal solver backend.
    #[error(transparent)]
    Solver(#[from] anyhow::Error),
}

impl Error {
    pub fn missing(field: &'static str, context: impl Into<String>) -> Self {
        Self::MissingData {
            field,
            context: context.into(),
        }
    }

    pub fn unsupported(what: &'static str, value: impl ToString) -> Self {
        Self::Unsupported {
            what,
            value: value.to_string(),
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration(reason.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_offending_values() {
        let err = Error::MethodNotFound {
            standard: "NFRC 2020".to_string(),
            method: "TDW".to_string(),
        };
        assert_eq!(err.to_string(), "standard NFRC 2020 has no method TDW");

        let err = Error::missing("emissivity front", "layer 2");
        assert_eq!(err.to_string(), "missing emissivity front for layer 2");

        let err = Error::unsupported("perforation shape", "HEXAGONAL");
        assert!(err.to_string().contains("HEXAGONAL"));
    }

    #[test]
    fn test_solver_errors_are_transparent() {
        let err: Error = anyhow::anyhow!("matrix is singular").into();
        assert_eq!(err.to_string(), "matrix is singular");
    }
}
