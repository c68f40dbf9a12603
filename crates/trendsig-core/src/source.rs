use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Canonical upstream source identifiers used in fetch results and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceId {
    Eastmoney,
    Tushare,
    Yahoo,
}

impl SourceId {
    pub const ALL: [Self; 3] = [Self::Eastmoney, Self::Tushare, Self::Yahoo];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eastmoney => "eastmoney",
            Self::Tushare => "tushare",
            Self::Yahoo => "yahoo",
        }
    }
}

impl Display for SourceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceId {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "eastmoney" => Ok(Self::Eastmoney),
            "tushare" => Ok(Self::Tushare),
            "yahoo" => Ok(Self::Yahoo),
            other => Err(ValidationError::InvalidSource {
                value: other.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_sources() {
        assert_eq!(
            " Eastmoney ".parse::<SourceId>().expect("must parse"),
            SourceId::Eastmoney
        );
        assert!(matches!(
            "akshare".parse::<SourceId>(),
            Err(ValidationError::InvalidSource { .. })
        ));
    }
}
