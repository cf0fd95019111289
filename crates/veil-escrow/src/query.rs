//! Party-scoped escrow listing.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use veil_core::UserId;

use crate::record::{EscrowRecord, EscrowStatus};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Which side of the trade the requester wants to see.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PartyRole {
    Buyer,
    Seller,
    #[default]
    Any,
}

/// Listing filters. The requester is never a filter: results are always
/// restricted to escrows the requester is party to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscrowFilter {
    #[serde(default)]
    pub role: PartyRole,
    #[serde(default)]
    pub status: Option<EscrowStatus>,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn first_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl Default for EscrowFilter {
    fn default() -> Self {
        Self {
            role: PartyRole::Any,
            status: None,
            page: first_page(),
            limit: default_limit(),
        }
    }
}

impl EscrowFilter {
    pub(crate) fn admits(&self, escrow: &EscrowRecord, user: &UserId) -> bool {
        let role_ok = match self.role {
            PartyRole::Buyer => escrow.buyer.user_id == *user,
            PartyRole::Seller => escrow.seller.user_id == *user,
            PartyRole::Any => escrow.is_party(user),
        };
        role_ok && self.status.map_or(true, |s| escrow.status == s)
    }

    /// Page and limit clamped to usable values.
    pub(crate) fn window(&self) -> (u32, u32) {
        (self.page.max(1), self.limit.clamp(1, MAX_PAGE_SIZE))
    }
}

/// One page of escrows, newest first.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EscrowPage {
    pub escrows: Vec<EscrowRecord>,
    pub total: usize,
    pub page: u32,
    pub limit: u32,
    pub pages: u32,
}

impl EscrowPage {
    pub(crate) fn paginate(mut matching: Vec<EscrowRecord>, page: u32, limit: u32) -> Self {
        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.escrow_id.cmp(&b.escrow_id))
        });
        let total = matching.len();
        let pages = u32::try_from(total.div_ceil(limit as usize)).unwrap_or(u32::MAX);
        let skip = (page as usize - 1).saturating_mul(limit as usize);
        let escrows = matching.into_iter().skip(skip).take(limit as usize).collect();
        Self {
            escrows,
            total,
            page,
            limit,
            pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_clamps() {
        let f = EscrowFilter {
            page: 0,
            limit: 10_000,
            ..EscrowFilter::default()
        };
        assert_eq!(f.window(), (1, MAX_PAGE_SIZE));
    }

    #[test]
    fn filter_deserializes_with_defaults() {
        let f: EscrowFilter = serde_json::from_str(r#"{"role":"seller"}"#).unwrap();
        assert_eq!(f.role, PartyRole::Seller);
        assert_eq!(f.page, 1);
        assert_eq!(f.limit, DEFAULT_PAGE_SIZE);
        assert!(f.status.is_none());
    }

    #[test]
    fn empty_page() {
        let p = EscrowPage::paginate(Vec::new(), 1, 20);
        assert_eq!(p.total, 0);
        assert_eq!(p.pages, 0);
        assert!(p.escrows.is_empty());
    }
}
