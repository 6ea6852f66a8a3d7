//! Shared identifier wrappers for JISC Wrangler.
//!
//! Two codes identify a newspaper title: the 4-letter JISC title code found
//! in file names (e.g. `BNWL`) and the 7-digit catalog (NLP) code used by the
//! downstream system (e.g. `0000038`).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error returned when parsing an identifier fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdParseError {
    message: String,
}

impl IdParseError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for IdParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for IdParseError {}

macro_rules! define_code_id {
    ($name:ident, $label:expr, $normalize:path) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            pub fn parse(value: &str) -> Result<Self, IdParseError> {
                $normalize(value)
                    .map(Self)
                    .map_err(|reason| IdParseError::new(format!("Invalid {} '{}': {}", $label, value, reason)))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdParseError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(&value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

/// Title codes are exactly four ASCII letters; stored upper-case.
fn normalize_title_code(value: &str) -> Result<String, &'static str> {
    let trimmed = value.trim();
    if trimmed.len() != 4 {
        return Err("expected exactly 4 characters");
    }
    if !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err("expected ASCII letters only");
    }
    Ok(trimmed.to_ascii_uppercase())
}

/// Catalog codes are up to seven ASCII digits, left-padded with zeros.
fn normalize_catalog_code(value: &str) -> Result<String, &'static str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("empty code");
    }
    if trimmed.len() > 7 {
        return Err("more than 7 digits");
    }
    if !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err("expected ASCII digits only");
    }
    Ok(format!("{:0>7}", trimmed))
}

define_code_id!(TitleCode, "title code", normalize_title_code);
define_code_id!(CatalogCode, "catalog code", normalize_catalog_code);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_code_is_uppercased() {
        let code = TitleCode::parse("bnwl").unwrap();
        assert_eq!(code.as_str(), "BNWL");
        assert_eq!(code.to_string(), "BNWL");
    }

    #[test]
    fn title_code_rejects_bad_shapes() {
        assert!(TitleCode::parse("BNW").is_err());
        assert!(TitleCode::parse("BNWLX").is_err());
        assert!(TitleCode::parse("BN1L").is_err());
        let err = TitleCode::parse("").unwrap_err();
        assert!(err.to_string().contains("title code"));
    }

    #[test]
    fn catalog_code_is_padded() {
        assert_eq!(CatalogCode::parse("38").unwrap().as_str(), "0000038");
        assert_eq!(CatalogCode::parse(" 0000038 ").unwrap().as_str(), "0000038");
        assert!(CatalogCode::parse("12345678").is_err());
        assert!(CatalogCode::parse("12a").is_err());
    }

    #[test]
    fn serde_validates() {
        let code: TitleCode = serde_json::from_str("\"mopt\"").unwrap();
        assert_eq!(code.as_str(), "MOPT");
        assert!(serde_json::from_str::<TitleCode>("\"MOPT1\"").is_err());
        assert_eq!(serde_json::to_string(&code).unwrap(), "\"MOPT\"");
    }
}
