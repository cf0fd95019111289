//! Moderation outcome statistics over a trailing window.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use veil_core::{AuctionRecord, UserId};

use crate::queue::round1;

/// Trailing window for [`ApprovalStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum StatsPeriod {
    #[serde(rename = "24h")]
    Day,
    #[default]
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "30d")]
    Month,
}

impl StatsPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "24h",
            Self::Week => "7d",
            Self::Month => "30d",
        }
    }

    pub fn duration(&self) -> Duration {
        match self {
            Self::Day => Duration::hours(24),
            Self::Week => Duration::days(7),
            Self::Month => Duration::days(30),
        }
    }
}

impl std::fmt::Display for StatsPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StatsPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "24h" => Ok(Self::Day),
            "7d" => Ok(Self::Week),
            "30d" => Ok(Self::Month),
            other => Err(format!("unknown stats period: {other}")),
        }
    }
}

/// Approved and rejected counts for one group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Outcomes {
    pub approved: usize,
    pub rejected: usize,
    pub approval_rate: f64,
}

impl Outcomes {
    fn tally(&mut self, decision: Decision) {
        match decision {
            Decision::Approved => self.approved += 1,
            Decision::Rejected => self.rejected += 1,
        }
        self.approval_rate = approval_rate(self.approved, self.rejected);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DayOutcomes {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub outcomes: Outcomes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryOutcomes {
    pub category: String,
    #[serde(flatten)]
    pub outcomes: Outcomes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModeratorOutcomes {
    pub moderator: UserId,
    #[serde(flatten)]
    pub outcomes: Outcomes,
}

/// Decisions made in `[since, until]`, grouped three ways.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalStats {
    pub period: StatsPeriod,
    pub since: DateTime<Utc>,
    pub until: DateTime<Utc>,
    pub totals: Outcomes,
    pub by_day: Vec<DayOutcomes>,
    pub by_category: Vec<CategoryOutcomes>,
    pub by_moderator: Vec<ModeratorOutcomes>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    Approved,
    Rejected,
}

/// `approved / (approved + rejected) × 100`, one decimal, 0 with no decisions.
pub fn approval_rate(approved: usize, rejected: usize) -> f64 {
    let decided = approved + rejected;
    if decided == 0 {
        return 0.0;
    }
    round1(approved as f64 / decided as f64 * 100.0)
}

fn decision_of(auction: &AuctionRecord) -> Option<(Decision, &UserId, DateTime<Utc>)> {
    let m = &auction.moderation;
    if m.is_approved {
        let by = m.approved_by.as_ref()?;
        return Some((Decision::Approved, by, m.approved_at?));
    }
    match (&m.rejected_by, m.rejected_at) {
        (Some(by), Some(at)) => Some((Decision::Rejected, by, at)),
        _ => None,
    }
}

pub(crate) fn compute(
    auctions: &[AuctionRecord],
    period: StatsPeriod,
    now: DateTime<Utc>,
) -> ApprovalStats {
    let since = now - period.duration();
    let mut totals = Outcomes::default();
    let mut by_day: BTreeMap<NaiveDate, Outcomes> = BTreeMap::new();
    let mut by_category: BTreeMap<&str, Outcomes> = BTreeMap::new();
    let mut by_moderator: BTreeMap<&UserId, Outcomes> = BTreeMap::new();

    for auction in auctions {
        let Some((decision, moderator, at)) = decision_of(auction) else {
            continue;
        };
        if at < since || at > now {
            continue;
        }
        totals.tally(decision);
        by_day.entry(at.date_naive()).or_default().tally(decision);
        by_category
            .entry(auction.category.as_str())
            .or_default()
            .tally(decision);
        by_moderator.entry(moderator).or_default().tally(decision);
    }

    ApprovalStats {
        period,
        since,
        until: now,
        totals,
        by_day: by_day
            .into_iter()
            .map(|(date, outcomes)| DayOutcomes { date, outcomes })
            .collect(),
        by_category: by_category
            .into_iter()
            .map(|(category, outcomes)| CategoryOutcomes {
                category: category.to_string(),
                outcomes,
            })
            .collect(),
        by_moderator: by_moderator
            .into_iter()
            .map(|(moderator, outcomes)| ModeratorOutcomes {
                moderator: moderator.clone(),
                outcomes,
            })
            .collect(),
    }
}
