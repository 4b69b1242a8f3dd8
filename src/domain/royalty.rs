//! Royalty arithmetic.
//!
//! Every play earns `revenue_per_play`. The creator keeps `100 - p` percent of it,
//! where `p` is the royalty percentage of the first active campaign on the track.
//! The remaining `p` percent forms the investor pool, split in proportion to the
//! amount each investor put into that campaign.

use serde::{Deserialize, Serialize};

use crate::domain::{amount::Amount, snapshot::LedgerSnapshot};

pub const DEFAULT_REVENUE_PER_PLAY: f64 = 0.01;

/// What an investor's amount is divided by to get their share of the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareBasis {
    /// the campaign total as it is now; later investors dilute earlier ones
    #[default]
    Current,
    /// the campaign total recorded when the investment was made
    AtInvestment,
}

#[derive(Debug, Clone, Copy)]
pub struct RoyaltyCalculator {
    pub revenue_per_play: f64,
    pub share_basis: ShareBasis,
}

impl Default for RoyaltyCalculator {
    fn default() -> Self {
        Self {
            revenue_per_play: DEFAULT_REVENUE_PER_PLAY,
            share_basis: ShareBasis::Current,
        }
    }
}

/// Earnings of one investment, for the royalty breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoyaltyDetail {
    pub investment_id: String,
    pub music_title: String,
    pub campaign_title: String,
    pub play_count: u64,
    pub earnings: f64,
}

impl RoyaltyCalculator {
    pub fn creator_royalty(&self, snapshot: &LedgerSnapshot, music_id: &str) -> f64 {
        let revenue = snapshot.play_count(music_id) as f64 * self.revenue_per_play;

        match snapshot.first_active_campaign_for(music_id) {
            Some(campaign) => revenue * (100.0 - campaign.royalty_percentage) / 100.0,
            None => revenue,
        }
    }

    /// 0 when the investment or its campaign no longer exists
    pub fn investor_royalty(&self, snapshot: &LedgerSnapshot, investment_id: &str) -> f64 {
        let Some(investment) = snapshot.investment(investment_id) else {
            return 0.0;
        };
        let Some(campaign) = snapshot.campaign(&investment.campaign_id) else {
            return 0.0;
        };

        let play_count = snapshot.play_count(&campaign.music_token_id) as f64;
        let pool = play_count * self.revenue_per_play * campaign.royalty_percentage / 100.0;

        let basis = match self.share_basis {
            ShareBasis::Current => campaign.current_amount,
            ShareBasis::AtInvestment => investment
                .raised_at_investment
                .unwrap_or(campaign.current_amount),
        };
        let share = if basis.is_positive() {
            investment.amount.value() / basis.value()
        } else {
            0.0
        };

        pool * share
    }

    pub fn total_investor_royalty(&self, snapshot: &LedgerSnapshot, user: &str) -> f64 {
        snapshot
            .investments_by_user(user)
            .map(|inv| self.investor_royalty(snapshot, &inv.id))
            .sum()
    }

    pub fn total_creator_royalty(&self, snapshot: &LedgerSnapshot, creator: &str) -> f64 {
        snapshot
            .music_by_creator(creator)
            .map(|m| self.creator_royalty(snapshot, &m.id))
            .sum()
    }

    /// Per-investment earnings of a user, skipping investments that earned nothing yet.
    pub fn royalty_breakdown(&self, snapshot: &LedgerSnapshot, user: &str) -> Vec<RoyaltyDetail> {
        snapshot
            .investments_by_user(user)
            .filter_map(|inv| {
                let earnings = self.investor_royalty(snapshot, &inv.id);
                if earnings <= 0.0 {
                    return None;
                }

                let campaign = snapshot.campaign(&inv.campaign_id);
                let music = campaign.and_then(|c| snapshot.music(&c.music_token_id));
                let music_title = music
                    .map(|m| m.title.clone())
                    .or_else(|| campaign.map(|c| c.music_title.clone()))
                    .unwrap_or_else(|| "Unknown".to_string());

                Some(RoyaltyDetail {
                    investment_id: inv.id.clone(),
                    music_title,
                    campaign_title: campaign
                        .map(|c| c.description.clone())
                        .unwrap_or_else(|| "Campaign".to_string()),
                    play_count: campaign
                        .map(|c| snapshot.play_count(&c.music_token_id))
                        .unwrap_or(0),
                    earnings,
                })
            })
            .collect()
    }

    /// gross revenue of a track before any split
    pub fn gross_revenue(&self, snapshot: &LedgerSnapshot, music_id: &str) -> Amount {
        Amount(snapshot.play_count(music_id) as f64 * self.revenue_per_play)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        campaign::CampaignStatus,
        fixtures::{campaign, investment, music, plays},
    };

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn snapshot_with_pool() -> LedgerSnapshot {
        let mut pool = campaign("c1", "m1", 30.0);
        pool.current_amount = Amount(800.0);
        pool.backers = 2;

        LedgerSnapshot {
            music: vec![music("m1", "creator")],
            campaigns: vec![pool],
            investments: vec![
                investment("i2", "c1", "late", 600.0),
                investment("i1", "c1", "fan", 200.0),
            ],
            plays: plays("m1", 100),
        }
    }

    #[test]
    fn test_creator_royalty_with_active_campaign() {
        let snapshot = snapshot_with_pool();
        let calc = RoyaltyCalculator::default();

        assert!(approx(calc.creator_royalty(&snapshot, "m1"), 0.70));
    }

    #[test]
    fn test_creator_keeps_everything_without_active_campaign() {
        let mut snapshot = snapshot_with_pool();
        snapshot.campaigns[0].status = CampaignStatus::Successful;
        let calc = RoyaltyCalculator::default();

        assert!(approx(calc.creator_royalty(&snapshot, "m1"), 1.0));
    }

    #[test]
    fn test_creator_royalty_uses_first_active_campaign() {
        let mut snapshot = snapshot_with_pool();
        // newest first: this one wins
        snapshot.campaigns.insert(0, campaign("c2", "m1", 10.0));
        let calc = RoyaltyCalculator::default();

        assert!(approx(calc.creator_royalty(&snapshot, "m1"), 0.90));
    }

    #[test]
    fn test_investor_royalty() {
        let snapshot = snapshot_with_pool();
        let calc = RoyaltyCalculator::default();

        assert!(approx(calc.investor_royalty(&snapshot, "i1"), 0.075));
        assert!(approx(calc.investor_royalty(&snapshot, "i2"), 0.225));
    }

    #[test]
    fn test_investor_royalty_dangling_references() {
        let mut snapshot = snapshot_with_pool();
        let calc = RoyaltyCalculator::default();

        assert_eq!(calc.investor_royalty(&snapshot, "missing"), 0.0);

        snapshot.campaigns.clear();
        assert_eq!(calc.investor_royalty(&snapshot, "i1"), 0.0);
    }

    #[test]
    fn test_investor_royalty_zero_raised() {
        let mut snapshot = snapshot_with_pool();
        snapshot.campaigns[0].current_amount = Amount::ZERO;
        let calc = RoyaltyCalculator::default();

        assert_eq!(calc.investor_royalty(&snapshot, "i1"), 0.0);
    }

    #[test]
    fn test_share_basis_at_investment() {
        let mut snapshot = snapshot_with_pool();
        // i1 was the first investor: the campaign held 200 right after it
        snapshot.investments[1].raised_at_investment = Some(Amount(200.0));

        let calc = RoyaltyCalculator {
            share_basis: ShareBasis::AtInvestment,
            ..Default::default()
        };

        assert!(approx(calc.investor_royalty(&snapshot, "i1"), 0.30));
        // no snapshot recorded: falls back to the current total
        assert!(approx(calc.investor_royalty(&snapshot, "i2"), 0.225));
    }

    #[test]
    fn test_totals_per_user() {
        let mut snapshot = snapshot_with_pool();
        snapshot.music.push(music("m2", "CREATOR"));
        snapshot.plays.extend(plays("m2", 50));
        let calc = RoyaltyCalculator::default();

        assert!(approx(calc.total_investor_royalty(&snapshot, "FAN"), 0.075));
        assert!(approx(calc.total_creator_royalty(&snapshot, "creator"), 0.70 + 0.50));
        assert_eq!(calc.total_investor_royalty(&snapshot, "nobody"), 0.0);
    }

    #[test]
    fn test_royalty_breakdown() {
        let mut snapshot = snapshot_with_pool();
        snapshot.investments.push(investment("i3", "gone", "fan", 10.0));
        let calc = RoyaltyCalculator::default();

        let details = calc.royalty_breakdown(&snapshot, "fan");

        assert_eq!(details.len(), 1);
        assert_eq!(details[0].investment_id, "i1");
        assert_eq!(details[0].music_title, "Song m1");
        assert_eq!(details[0].play_count, 100);
        assert!(approx(details[0].earnings, 0.075));
    }
}
