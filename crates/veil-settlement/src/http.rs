//! HTTP client for the settlement service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use tracing::{debug, warn};
use veil_core::EscrowId;

use crate::config::SettlementConfig;
use crate::gateway::{SettlementError, SettlementGateway, SettlementReceipt};

/// Header carrying the deduplication key.
pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// Settlement gateway backed by the HTTP settlement service.
#[derive(Debug)]
pub struct HttpSettlementGateway {
    client: reqwest::Client,
    base_url: String,
    timeout_ms: u64,
}

impl HttpSettlementGateway {
    pub fn new(config: SettlementConfig) -> Result<Self, SettlementError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = &config.api_token {
            let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
                SettlementError::NotConfigured {
                    reason: "invalid API token characters".into(),
                }
            })?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| SettlementError::NotConfigured {
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.as_str().trim_end_matches('/').to_string(),
            timeout_ms: config.timeout_secs.saturating_mul(1000),
        })
    }

    fn release_url(&self, escrow_id: &EscrowId) -> String {
        format!("{}/escrows/{}/release", self.base_url, escrow_id)
    }
}

#[async_trait]
impl SettlementGateway for HttpSettlementGateway {
    fn name(&self) -> &str {
        "http"
    }

    async fn release(&self, escrow_id: &EscrowId) -> Result<SettlementReceipt, SettlementError> {
        let url = self.release_url(escrow_id);
        debug!(%escrow_id, %url, "requesting release");

        let resp = self
            .client
            .post(&url)
            .header(IDEMPOTENCY_HEADER, escrow_id.as_str())
            .json(&serde_json::json!({ "escrowId": escrow_id }))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SettlementError::Timeout {
                        elapsed_ms: self.timeout_ms,
                    }
                } else {
                    SettlementError::Unavailable {
                        reason: e.to_string(),
                    }
                }
            })?;

        let status = resp.status();
        if status.is_server_error() {
            let body = resp.text().await.unwrap_or_default();
            warn!(%escrow_id, %status, "settlement service error");
            return Err(SettlementError::Unavailable {
                reason: format!("HTTP {status}: {body}"),
            });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SettlementError::Rejected {
                status: status.as_u16(),
                reason: body,
            });
        }

        resp.json::<SettlementReceipt>()
            .await
            .map_err(|e| SettlementError::InvalidResponse {
                reason: e.to_string(),
            })
    }
}
