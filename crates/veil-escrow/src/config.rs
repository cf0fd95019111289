//! Escrow engine configuration.

use std::time::Duration;

use veil_core::{env_or, ConfigError};

/// Tunables for [`EscrowService`](crate::EscrowService).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscrowConfig {
    /// Upper bound on one settlement gateway round trip.
    pub settlement_timeout: Duration,
    /// Platform fee in basis points of the escrow amount.
    pub platform_fee_bps: u32,
    /// Arbitration fee in basis points, charged only if a dispute is arbitrated.
    pub arbitration_fee_bps: u32,
    /// Attempts at drawing an unused escrow id before giving up.
    pub id_allocation_attempts: u32,
}

impl Default for EscrowConfig {
    fn default() -> Self {
        Self {
            settlement_timeout: Duration::from_secs(10),
            platform_fee_bps: 250,
            arbitration_fee_bps: 500,
            id_allocation_attempts: 8,
        }
    }
}

impl EscrowConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `SETTLEMENT_TIMEOUT_SECS` (default: 10)
    /// - `ESCROW_PLATFORM_FEE_BPS` (default: 250)
    /// - `ESCROW_ARBITRATION_FEE_BPS` (default: 500)
    /// - `ESCROW_ID_ATTEMPTS` (default: 8)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            settlement_timeout: Duration::from_secs(env_or(
                "SETTLEMENT_TIMEOUT_SECS",
                defaults.settlement_timeout.as_secs(),
            )?),
            platform_fee_bps: env_or("ESCROW_PLATFORM_FEE_BPS", defaults.platform_fee_bps)?,
            arbitration_fee_bps: env_or(
                "ESCROW_ARBITRATION_FEE_BPS",
                defaults.arbitration_fee_bps,
            )?,
            id_allocation_attempts: env_or("ESCROW_ID_ATTEMPTS", defaults.id_allocation_attempts)?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            (
                "ESCROW_PLATFORM_FEE_BPS",
                self.platform_fee_bps <= 10_000,
                self.platform_fee_bps.to_string(),
            ),
            (
                "ESCROW_ARBITRATION_FEE_BPS",
                self.arbitration_fee_bps <= 10_000,
                self.arbitration_fee_bps.to_string(),
            ),
            (
                "ESCROW_ID_ATTEMPTS",
                self.id_allocation_attempts > 0,
                self.id_allocation_attempts.to_string(),
            ),
            (
                "SETTLEMENT_TIMEOUT_SECS",
                !self.settlement_timeout.is_zero(),
                self.settlement_timeout.as_secs().to_string(),
            ),
        ];
        for (var, ok, value) in checks {
            if !ok {
                return Err(ConfigError::InvalidValue {
                    var: var.to_string(),
                    value,
                });
            }
        }
        Ok(())
    }
}
