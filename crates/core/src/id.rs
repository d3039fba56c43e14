//! Strongly-typed identifiers used across the domain.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Identifier of a product tracked by the ledger.
///
/// An opaque string token (e.g. `"WROCLOVE2014"`). Surrounding whitespace is
/// trimmed on parse; empty tokens are rejected.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProductIdentifier(String);

impl ProductIdentifier {
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, DomainError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(DomainError::invalid_identifier(
                "product identifier cannot be empty",
            ));
        }
        if trimmed.chars().any(char::is_control) {
            return Err(DomainError::invalid_identifier(format!(
                "product identifier contains control characters: {trimmed:?}"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for ProductIdentifier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ProductIdentifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for ProductIdentifier {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ProductIdentifier {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl TryFrom<&str> for ProductIdentifier {
    type Error = DomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<ProductIdentifier> for String {
    fn from(value: ProductIdentifier) -> Self {
        value.0
    }
}
