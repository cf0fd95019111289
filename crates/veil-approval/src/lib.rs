//! # veil-approval — Approval Queue Manager
//!
//! Every new listing waits in `pending` until a moderator (or the low-risk
//! sweep) moves it once to `active` or `cancelled`.
//!
//! - **Service** (`service.rs`): [`ModerationService`] with intake, single
//!   approve/reject, transactional bulk approval, and the auto-approval sweep.
//! - **Queue** (`queue.rs`): the FIFO pending page with risk counts, and the
//!   priority-ordered triage queue with wait times.
//! - **Policy** (`policy.rs`): [`AutoApprovalPolicy`] thresholds.
//! - **Stats** (`stats.rs`): decision counts over a trailing window.

pub mod policy;
pub mod queue;
pub mod service;
pub mod stats;

pub use policy::AutoApprovalPolicy;
pub use queue::{ApprovalQueue, PendingFilter, PendingItem, PendingPage, QueueItem};
pub use service::{
    AutoApproval, BulkApproval, IdSource, ModerationService, APPROVED_EVENT, AUTO_MODERATOR,
    MAX_BULK_IDS, REJECTED_EVENT,
};
pub use stats::{approval_rate, ApprovalStats, Outcomes, StatsPeriod};
