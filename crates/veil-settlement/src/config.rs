//! Settlement gateway configuration.

use url::Url;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Connection settings for the HTTP settlement service.
///
/// Custom `Debug` implementation redacts the `api_token` field.
#[derive(Clone)]
pub struct SettlementConfig {
    /// Base URL of the settlement service.
    pub base_url: Url,
    /// Optional bearer token.
    pub api_token: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for SettlementConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettlementConfig")
            .field("base_url", &self.base_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl SettlementConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            api_token: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `SETTLEMENT_URL` (optional; `Ok(None)` when unset)
    /// - `SETTLEMENT_TOKEN` (optional)
    /// - `SETTLEMENT_TIMEOUT_SECS` (default: 10)
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        let raw = match std::env::var("SETTLEMENT_URL") {
            Ok(raw) if !raw.trim().is_empty() => raw,
            _ => return Ok(None),
        };
        let base_url = Url::parse(raw.trim())
            .map_err(|e| ConfigError::InvalidUrl("SETTLEMENT_URL".to_string(), e.to_string()))?;
        let timeout_secs = match std::env::var("SETTLEMENT_TIMEOUT_SECS") {
            Ok(v) => v
                .parse()
                .map_err(|_| ConfigError::InvalidNumber("SETTLEMENT_TIMEOUT_SECS".to_string(), v))?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };
        Ok(Some(Self {
            base_url,
            api_token: std::env::var("SETTLEMENT_TOKEN").ok().filter(|t| !t.is_empty()),
            timeout_secs,
        }))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("invalid number for {0}: {1:?}")]
    InvalidNumber(String, String),
}
