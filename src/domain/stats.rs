use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::{amount::Amount, snapshot::LedgerSnapshot};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageStats {
    pub total_music: usize,
    pub total_campaigns: usize,
    pub active_campaigns: usize,
}

/// Dashboard counters for one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickStats {
    pub active_pools: usize,
    /// investments made by the user
    pub contributions: usize,
    pub total_plays: u64,
    /// mean funded percentage of active pools, rounded
    pub avg_funded: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioValue {
    pub total_raised: Amount,
    pub total_invested: Amount,
    pub total_value: Amount,
    /// raised / goal over the creator's campaigns, rounded
    pub growth_percentage: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub name: String,
    pub plays: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leaderboard {
    pub music: Vec<LeaderboardEntry>,
    pub artists: Vec<LeaderboardEntry>,
}

impl StorageStats {
    pub fn from_snapshot(snapshot: &LedgerSnapshot) -> Self {
        Self {
            total_music: snapshot.music.len(),
            total_campaigns: snapshot.campaigns.len(),
            active_campaigns: snapshot.active_campaigns().count(),
        }
    }
}

impl QuickStats {
    pub fn for_user(snapshot: &LedgerSnapshot, user: &str) -> Self {
        let active: Vec<_> = snapshot.active_campaigns().collect();
        let avg_funded = if active.is_empty() {
            0
        } else {
            let sum: f64 = active.iter().map(|c| c.funded_percentage()).sum();
            (sum / active.len() as f64).round() as u32
        };

        Self {
            active_pools: active.len(),
            contributions: snapshot.investments_by_user(user).count(),
            total_plays: snapshot
                .music
                .iter()
                .map(|m| snapshot.play_count(&m.id))
                .sum(),
            avg_funded,
        }
    }
}

impl PortfolioValue {
    pub fn for_creator(snapshot: &LedgerSnapshot, creator: &str) -> Self {
        let campaigns: Vec<_> = snapshot.campaigns_by_creator(creator).collect();
        let total_raised: Amount = campaigns.iter().map(|c| c.current_amount).sum();
        let total_goal: Amount = campaigns.iter().map(|c| c.goal).sum();
        let total_invested: Amount = snapshot.investments_by_user(creator).map(|i| i.amount).sum();

        let growth_percentage = if total_goal.is_positive() {
            (total_raised.value() / total_goal.value() * 100.0).round() as u32
        } else {
            0
        };

        Self {
            total_raised,
            total_invested,
            total_value: total_raised + total_invested,
            growth_percentage,
        }
    }
}

impl Leaderboard {
    /// Ranks tracks and artists by recorded plays, keeping `limit` entries of each.
    pub fn from_snapshot(snapshot: &LedgerSnapshot, limit: usize) -> Self {
        let counts = snapshot.play_counts();

        let mut music: Vec<(String, u64)> = snapshot
            .music
            .iter()
            .map(|m| (m.title.clone(), counts.get(m.id.as_str()).copied().unwrap_or(0)))
            .collect();

        let mut by_artist: HashMap<&str, u64> = HashMap::new();
        for m in &snapshot.music {
            *by_artist.entry(m.artist.as_str()).or_insert(0) +=
                counts.get(m.id.as_str()).copied().unwrap_or(0);
        }
        let mut artists: Vec<(String, u64)> = by_artist
            .into_iter()
            .map(|(name, plays)| (name.to_string(), plays))
            .collect();

        Self {
            music: rank(&mut music, limit),
            artists: rank(&mut artists, limit),
        }
    }
}

fn rank(entries: &mut [(String, u64)], limit: usize) -> Vec<LeaderboardEntry> {
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries
        .iter()
        .take(limit)
        .enumerate()
        .map(|(i, (name, plays))| LeaderboardEntry {
            rank: i + 1,
            name: name.clone(),
            plays: *plays,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        campaign::CampaignStatus,
        fixtures::{campaign, investment, music, plays},
    };

    #[test]
    fn test_storage_stats() {
        let mut done = campaign("c2", "m1", 10.0);
        done.status = CampaignStatus::Failed;
        let snapshot = LedgerSnapshot {
            music: vec![music("m1", "a")],
            campaigns: vec![campaign("c1", "m1", 10.0), done],
            ..Default::default()
        };

        let stats = StorageStats::from_snapshot(&snapshot);
        assert_eq!(stats.total_music, 1);
        assert_eq!(stats.total_campaigns, 2);
        assert_eq!(stats.active_campaigns, 1);
    }

    #[test]
    fn test_quick_stats() {
        let mut half = campaign("c1", "m1", 10.0);
        half.current_amount = Amount(500.0);
        let mut over = campaign("c2", "m2", 10.0);
        over.current_amount = Amount(5000.0);

        let snapshot = LedgerSnapshot {
            music: vec![music("m1", "a"), music("m2", "a")],
            campaigns: vec![half, over],
            investments: vec![investment("i1", "c1", "fan", 500.0)],
            plays: [plays("m1", 3), plays("m2", 4), plays("deleted", 9)].concat(),
        };

        let stats = QuickStats::for_user(&snapshot, "fan");
        assert_eq!(stats.active_pools, 2);
        assert_eq!(stats.contributions, 1);
        assert_eq!(stats.total_plays, 7);
        // (50 + 100) / 2
        assert_eq!(stats.avg_funded, 75);
    }

    #[test]
    fn test_quick_stats_without_pools() {
        let stats = QuickStats::for_user(&LedgerSnapshot::default(), "fan");
        assert_eq!(stats.avg_funded, 0);
        assert_eq!(stats.active_pools, 0);
    }

    #[test]
    fn test_portfolio_value() {
        let mut own = campaign("c1", "m1", 10.0);
        own.creator_address = "artist".into();
        own.current_amount = Amount(250.0);

        let snapshot = LedgerSnapshot {
            campaigns: vec![own],
            investments: vec![investment("i1", "other", "Artist", 100.0)],
            ..Default::default()
        };

        let value = PortfolioValue::for_creator(&snapshot, "artist");
        assert_eq!(value.total_raised, Amount(250.0));
        assert_eq!(value.total_invested, Amount(100.0));
        assert_eq!(value.total_value, Amount(350.0));
        assert_eq!(value.growth_percentage, 25);
    }

    #[test]
    fn test_leaderboard_orders_by_plays() {
        let mut a = music("m1", "x");
        a.title = "Alpha".into();
        a.artist = "NIKI".into();
        let mut b = music("m2", "x");
        b.title = "Beta".into();
        b.artist = "Hindia".into();
        let mut c = music("m3", "x");
        c.title = "Gamma".into();
        c.artist = "NIKI".into();

        let snapshot = LedgerSnapshot {
            music: vec![a, b, c],
            plays: [plays("m1", 2), plays("m2", 5), plays("m3", 4)].concat(),
            ..Default::default()
        };

        let board = Leaderboard::from_snapshot(&snapshot, 2);

        assert_eq!(board.music.len(), 2);
        assert_eq!(board.music[0].name, "Beta");
        assert_eq!(board.music[1].name, "Gamma");
        assert_eq!(board.music[1].rank, 2);

        assert_eq!(board.artists[0].name, "NIKI");
        assert_eq!(board.artists[0].plays, 6);
    }
}
