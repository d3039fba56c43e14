//! Ledger configuration loading and representation.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?} (expected true/false/1/0)")]
    InvalidBool { var: &'static str, value: String },
}

/// Tunables for [`crate::ledger::InventoryLedger`].
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Accept reserve/sell/expire/refund of zero units (recorded with zero
    /// deltas). Rejected as `InvalidQuantity` when false.
    pub allow_zero_movements: bool,
}

impl LedgerConfig {
    pub const ALLOW_ZERO_MOVEMENTS_VAR: &'static str = "STOCKLEDGER_ALLOW_ZERO_MOVEMENTS";

    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Like [`Self::from_env`], but falls back to defaults on invalid values.
    pub fn from_env_or_default() -> Self {
        Self::from_env().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "invalid ledger configuration; using defaults");
            Self::default()
        })
    }

    /// Build configuration from an arbitrary variable lookup (unset = `None`).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(raw) = lookup(Self::ALLOW_ZERO_MOVEMENTS_VAR) {
            config.allow_zero_movements = parse_bool(Self::ALLOW_ZERO_MOVEMENTS_VAR, &raw)?;
        }
        Ok(config)
    }

    pub fn with_zero_movements(mut self, allow: bool) -> Self {
        self.allow_zero_movements = allow;
        self
    }
}

fn parse_bool(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            var,
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_unset() {
        let config = LedgerConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, LedgerConfig::default());
        assert!(!config.allow_zero_movements);
    }

    #[test]
    fn parses_boolean_spellings() {
        for (raw, expected) in [("true", true), ("1", true), (" TRUE ", true), ("false", false), ("0", false)] {
            let config = LedgerConfig::from_lookup(|_| Some(raw.to_string())).unwrap();
            assert_eq!(config.allow_zero_movements, expected, "raw value {raw:?}");
        }
    }

    #[test]
    fn rejects_garbage() {
        let err = LedgerConfig::from_lookup(|_| Some("yes please".to_string())).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidBool {
                var: LedgerConfig::ALLOW_ZERO_MOVEMENTS_VAR,
                value: "yes please".to_string(),
            }
        );
    }
}
