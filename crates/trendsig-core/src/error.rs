use thiserror::Error;

/// Validation and contract errors exposed by `trendsig-core`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("invalid source '{value}', expected one of eastmoney, tushare, yahoo")]
    InvalidSource { value: String },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },
    #[error("bar high must be >= low")]
    InvalidBarRange,
    #[error("bar open/close must be within high/low range")]
    InvalidBarBounds,
    #[error("ratio '{field}' must be within [0, 1]: {value}")]
    RatioOutOfRange { field: &'static str, value: f64 },
}

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    // RatioOutOfRange carries an f64, so the enum compares via PartialEq only.
    #[test]
    fn ratio_errors_compare_by_field_and_value() {
        let a = ValidationError::RatioOutOfRange {
            field: "winner_rate",
            value: 1.5,
        };
        let b = ValidationError::RatioOutOfRange {
            field: "winner_rate",
            value: 1.5,
        };
        assert_eq!(a, b);
        assert_ne!(
            a,
            ValidationError::RatioOutOfRange {
                field: "winner_rate",
                value: 0.5,
            }
        );
    }
}
