use core::str::FromStr;

use serde::{Deserialize, Serialize};

use bistro_core::{DomainError, DomainResult, ValueObject};

/// Stock keeping unit: the business key recipes use to reference an ingredient.
///
/// Normalized on construction (trimmed, upper-cased) so "tom-001 " and "TOM-001"
/// are the same ingredient. Allowed characters: ASCII letters, digits, `-`, `_`, `.`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sku(String);

impl Sku {
    pub const MAX_LEN: usize = 64;

    pub fn parse(raw: impl AsRef<str>) -> DomainResult<Self> {
        let normalized = raw.as_ref().trim().to_ascii_uppercase();

        if normalized.is_empty() {
            return Err(DomainError::validation("sku cannot be empty"));
        }
        if normalized.len() > Self::MAX_LEN {
            return Err(DomainError::validation(format!(
                "sku cannot exceed {} characters",
                Self::MAX_LEN
            )));
        }
        if let Some(bad) = normalized
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        {
            return Err(DomainError::validation(format!(
                "sku contains invalid character '{bad}'"
            )));
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValueObject for Sku {}

impl core::fmt::Display for Sku {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Sku {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Sku {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Sku> for String {
    fn from(value: Sku) -> Self {
        value.0
    }
}
