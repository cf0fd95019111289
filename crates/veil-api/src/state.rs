//! # Application State
//!
//! Shared stores and the two engines, cloned into every handler.

use std::sync::Arc;

use veil_approval::{AutoApprovalPolicy, ModerationService};
use veil_core::{env_or, AuctionId, AuctionRecord, ConfigError, EscrowId, SellerProfile, UserId};
use veil_escrow::{EscrowConfig, EscrowRecord, EscrowService};
use veil_notify::{ChannelBroadcaster, Dispatcher, InAppInbox};
use veil_settlement::{MockSettlementGateway, SettlementGateway};
use veil_store::Store;

/// Server configuration.
///
/// Custom `Debug` redacts the `auth_secret`.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Shared secret for bearer tokens. `None` disables authentication.
    pub auth_secret: Option<String>,
}

impl AppConfig {
    /// Read `PORT` and `AUTH_SECRET`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let auth_secret = std::env::var("AUTH_SECRET")
            .ok()
            .filter(|s| !s.trim().is_empty());
        Ok(Self {
            port: env_or("PORT", 8080u16)?,
            auth_secret,
        })
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field(
                "auth_secret",
                &self.auth_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_secret: None,
        }
    }
}

/// Everything a handler can reach.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub auctions: Store<AuctionId, AuctionRecord>,
    pub escrows: Store<EscrowId, EscrowRecord>,
    pub profiles: Store<UserId, SellerProfile>,
    pub moderation: Arc<ModerationService>,
    pub escrow: Arc<EscrowService>,
    pub inbox: InAppInbox,
    pub events: ChannelBroadcaster,
}

impl AppState {
    /// Default configuration, mock settlement, auth disabled.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    pub fn with_config(config: AppConfig) -> Self {
        Self::assemble(
            config,
            Arc::new(MockSettlementGateway::new()),
            EscrowConfig::default(),
            AutoApprovalPolicy::default(),
        )
    }

    /// Wire stores, dispatcher and engines together.
    pub fn assemble(
        config: AppConfig,
        gateway: Arc<dyn SettlementGateway>,
        escrow_config: EscrowConfig,
        policy: AutoApprovalPolicy,
    ) -> Self {
        let auctions = Store::new();
        let escrows = Store::new();
        let profiles = Store::new();
        let inbox = InAppInbox::new();
        let events = ChannelBroadcaster::new();
        let dispatch = Dispatcher::new(Arc::new(inbox.clone()), Arc::new(events.clone()));

        let moderation = ModerationService::new(
            auctions.clone(),
            profiles.clone(),
            dispatch.clone(),
            policy,
        );
        let escrow = EscrowService::new(
            escrows.clone(),
            profiles.clone(),
            gateway,
            dispatch,
            escrow_config,
        );

        Self {
            config,
            auctions,
            escrows,
            profiles,
            moderation: Arc::new(moderation),
            escrow: Arc::new(escrow),
            inbox,
            events,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_debug_redacts_secret() {
        let config = AppConfig {
            port: 9000,
            auth_secret: Some("hunter2".into()),
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn engines_share_profile_store() {
        let state = AppState::new();
        state
            .profiles
            .insert(UserId::new("s"), SellerProfile::new_seller(UserId::new("s")));
        assert_eq!(state.profiles.len(), 1);
        assert!(state.auctions.is_empty());
        assert!(state.escrows.is_empty());
    }
}
