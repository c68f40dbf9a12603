use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

const MAX_SYMBOL_LEN: usize = 15;

/// Market a symbol trades on, inferred from the code shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Market {
    /// Mainland A-share code (six digits, e.g. `600519`).
    China,
    /// US ticker (letters, e.g. `AAPL`).
    Us,
}

/// Normalized instrument code.
///
/// A-share codes stay numeric; US tickers normalize to uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptySymbol);
        }

        let normalized = trimmed.to_ascii_uppercase();
        let len = normalized.chars().count();
        if len > MAX_SYMBOL_LEN {
            return Err(ValidationError::SymbolTooLong {
                len,
                max: MAX_SYMBOL_LEN,
            });
        }

        for (index, ch) in normalized.chars().enumerate() {
            let valid = ch.is_ascii_alphanumeric() || ch == '.' || ch == '-';
            if !valid {
                return Err(ValidationError::SymbolInvalidChar { ch, index });
            }
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Market classification: any code carrying letters is treated as a US
    /// ticker, everything else as a mainland A-share code.
    pub fn market(&self) -> Market {
        if self.0.chars().any(|ch| ch.is_ascii_alphabetic()) {
            Market::Us
        } else {
            Market::China
        }
    }

    pub fn is_us(&self) -> bool {
        self.market() == Market::Us
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Symbol {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for Symbol {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Symbol> for String {
    fn from(value: Symbol) -> Self {
        value.0
    }
}
