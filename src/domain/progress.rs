use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{amount::Amount, royalty::RoyaltyCalculator, snapshot::LedgerSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Creator,
    User,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Creator => write!(f, "Creator"),
            Role::User => write!(f, "User"),
        }
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "creator" => Ok(Role::Creator),
            "user" | "supporter" | "investor" => Ok(Role::User),
            other => Err(anyhow::anyhow!("unknown role '{other}'")),
        }
    }
}

/// Cached activity summary of one user, recomputed on demand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    pub user_id: String,
    pub user_role: Role,
    /// plays recorded with this user as listener
    pub total_plays: u64,
    pub total_investments: u64,
    pub total_invested: Amount,
    pub total_royalty: Amount,
    pub level: String,
    pub progress_percentage: f64,
    pub last_updated: DateTime<Utc>,
}

impl UserProgress {
    /// Recomputes the whole summary from the collections.
    ///
    /// Creators are ranked by plays on the music they own, supporters by how many
    /// investments they made (not how much).
    pub fn compute(
        snapshot: &LedgerSnapshot,
        calc: &RoyaltyCalculator,
        user_id: &str,
        role: Role,
        now: DateTime<Utc>,
    ) -> Self {
        let total_plays = snapshot.plays_by_user(user_id).count() as u64;
        let investments: Vec<_> = snapshot.investments_by_user(user_id).collect();
        let total_investments = investments.len() as u64;
        let total_invested: Amount = investments.iter().map(|i| i.amount).sum();

        // gross play revenue for creators, rounded to cents; supporters carry none
        let (counter, total_royalty) = match role {
            Role::Creator => {
                let music_plays: u64 = snapshot
                    .music_by_creator(user_id)
                    .map(|m| snapshot.play_count(&m.id))
                    .sum();
                let gross = music_plays as f64 * calc.revenue_per_play;
                (music_plays, (gross * 100.0).round() / 100.0)
            }
            Role::User => (total_investments, 0.0),
        };
        let (level, progress_percentage) = TierTable::for_role(role).classify(counter);

        Self {
            user_id: user_id.to_string(),
            user_role: role,
            total_plays,
            total_investments,
            total_invested,
            total_royalty: Amount(total_royalty),
            level: level.to_string(),
            progress_percentage,
            last_updated: now,
        }
    }
}

/// A rank reached once the counter is at least `threshold`
#[derive(Debug, Clone, Copy)]
pub struct Tier {
    pub threshold: u64,
    pub label: &'static str,
    pub percentage: f64,
}

/// Ordered tier table. Below the first tier the base label applies and the
/// percentage grows linearly from 0 up to `base_cap`.
#[derive(Debug, Clone, Copy)]
pub struct TierTable {
    pub base_label: &'static str,
    pub base_cap: f64,
    /// ascending by threshold
    pub tiers: &'static [Tier],
}

pub const CREATOR_TIERS: TierTable = TierTable {
    base_label: "Emerging Artist",
    base_cap: 50.0,
    tiers: &[
        Tier { threshold: 100, label: "Silver Artist", percentage: 50.0 },
        Tier { threshold: 500, label: "Gold Artist", percentage: 75.0 },
        Tier { threshold: 1000, label: "Platinum Artist", percentage: 100.0 },
    ],
};

pub const INVESTOR_TIERS: TierTable = TierTable {
    base_label: "Bronze Investor",
    base_cap: 40.0,
    tiers: &[
        Tier { threshold: 5, label: "Silver Investor", percentage: 40.0 },
        Tier { threshold: 10, label: "Gold Investor", percentage: 60.0 },
        Tier { threshold: 20, label: "Platinum Investor", percentage: 80.0 },
        Tier { threshold: 50, label: "Diamond Investor", percentage: 100.0 },
    ],
};

impl TierTable {
    pub fn for_role(role: Role) -> &'static TierTable {
        match role {
            Role::Creator => &CREATOR_TIERS,
            Role::User => &INVESTOR_TIERS,
        }
    }

    /// returns (label, percentage) for the counter value
    pub fn classify(&self, count: u64) -> (&'static str, f64) {
        if let Some(tier) = self.tiers.iter().rev().find(|t| count >= t.threshold) {
            return (tier.label, tier.percentage);
        }

        let first = self.tiers.first().map(|t| t.threshold).unwrap_or(0);
        if first == 0 {
            return (self.base_label, self.base_cap);
        }
        let pct = (count as f64 / first as f64 * self.base_cap).min(self.base_cap);
        (self.base_label, pct)
    }
}
