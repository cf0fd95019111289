//! In-process settlement gateway for development and tests.
//!
//! Behaves like an idempotent settlement service: the first successful
//! release of an escrow id mints a receipt, and repeated releases of the same
//! id return that receipt again without a second on-chain effect.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand_core::{OsRng, RngCore};
use veil_core::EscrowId;

use crate::gateway::{SettlementError, SettlementGateway, SettlementReceipt};

const GAS_PER_RELEASE: u64 = 52_000;

#[derive(Debug, Default)]
struct MockState {
    settled: HashMap<EscrowId, SettlementReceipt>,
    calls: HashMap<EscrowId, usize>,
    total_calls: usize,
    scripted_failures: VecDeque<SettlementError>,
    scripted_receipts: VecDeque<SettlementReceipt>,
}

/// Deterministic in-process gateway. Clones share state.
#[derive(Debug, Clone)]
pub struct MockSettlementGateway {
    state: Arc<Mutex<MockState>>,
    next_block: Arc<AtomicU64>,
    latency: Option<Duration>,
}

impl MockSettlementGateway {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
            next_block: Arc::new(AtomicU64::new(1)),
            latency: None,
        }
    }

    /// Sleep this long inside every `release` call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make the next `release` call fail with `error`. Queued failures are
    /// consumed in order.
    pub fn fail_next(&self, error: SettlementError) {
        self.state.lock().scripted_failures.push_back(error);
    }

    /// Use `receipt` for the next successful release of a new escrow id.
    pub fn respond_with(&self, receipt: SettlementReceipt) {
        self.state.lock().scripted_receipts.push_back(receipt);
    }

    /// Total `release` calls, including failed ones.
    pub fn calls(&self) -> usize {
        self.state.lock().total_calls
    }

    /// `release` calls for one escrow id.
    pub fn calls_for(&self, escrow_id: &EscrowId) -> usize {
        self.state
            .lock()
            .calls
            .get(escrow_id)
            .copied()
            .unwrap_or(0)
    }

    /// Receipt recorded for an escrow id, if it was released.
    pub fn receipt_for(&self, escrow_id: &EscrowId) -> Option<SettlementReceipt> {
        self.state.lock().settled.get(escrow_id).cloned()
    }

    /// Number of distinct escrows with an on-chain release.
    pub fn settled_count(&self) -> usize {
        self.state.lock().settled.len()
    }

    fn mint_receipt(&self) -> SettlementReceipt {
        let mut hash = [0u8; 32];
        OsRng.fill_bytes(&mut hash);
        let hex: String = hash.iter().map(|b| format!("{b:02x}")).collect();
        SettlementReceipt {
            transaction_hash: format!("0x{hex}"),
            block_number: self.next_block.fetch_add(1, Ordering::SeqCst),
            gas_used: GAS_PER_RELEASE,
        }
    }
}

impl Default for MockSettlementGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SettlementGateway for MockSettlementGateway {
    fn name(&self) -> &str {
        "mock"
    }

    async fn release(&self, escrow_id: &EscrowId) -> Result<SettlementReceipt, SettlementError> {
        {
            let mut state = self.state.lock();
            state.total_calls += 1;
            *state.calls.entry(escrow_id.clone()).or_default() += 1;
        }

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state.lock();
        if let Some(err) = state.scripted_failures.pop_front() {
            return Err(err);
        }
        if let Some(existing) = state.settled.get(escrow_id) {
            return Ok(existing.clone());
        }
        let receipt = match state.scripted_receipts.pop_front() {
            Some(r) => r,
            None => self.mint_receipt(),
        };
        state.settled.insert(escrow_id.clone(), receipt.clone());
        Ok(receipt)
    }
}
