//! Environment variable helpers shared by the per-crate config structs.

use std::str::FromStr;

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: String, value: String },
    #[error("{0} environment variable is required")]
    Missing(String),
}

/// Parse `var` if set and non-empty, otherwise return `default`.
pub fn env_or<T: FromStr>(var: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(var) {
        Ok(raw) if !raw.trim().is_empty() => {
            raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                var: var.to_string(),
                value: raw,
            })
        }
        _ => Ok(default),
    }
}
