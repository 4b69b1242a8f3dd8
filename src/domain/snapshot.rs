use std::collections::HashMap;

use crate::domain::{
    campaign::Campaign, investment::Investment, music::Music, play::PlayEvent,
};

/// All collections read at one point in time. Aggregates are computed over this.
#[derive(Debug, Clone, Default)]
pub struct LedgerSnapshot {
    pub music: Vec<Music>,
    pub campaigns: Vec<Campaign>,
    pub investments: Vec<Investment>,
    pub plays: Vec<PlayEvent>,
}

/// wallet addresses and user ids compare case-insensitively
pub fn same_address(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

impl LedgerSnapshot {
    pub fn music(&self, id: &str) -> Option<&Music> {
        self.music.iter().find(|m| m.id == id)
    }

    pub fn campaign(&self, id: &str) -> Option<&Campaign> {
        self.campaigns.iter().find(|c| c.id == id)
    }

    pub fn investment(&self, id: &str) -> Option<&Investment> {
        self.investments.iter().find(|i| i.id == id)
    }

    pub fn play_count(&self, music_id: &str) -> u64 {
        self.plays.iter().filter(|p| p.music_id == music_id).count() as u64
    }

    pub fn play_counts(&self) -> HashMap<&str, u64> {
        let mut counts = HashMap::new();
        for play in &self.plays {
            *counts.entry(play.music_id.as_str()).or_insert(0) += 1;
        }
        counts
    }

    /// first active campaign in storage order (newest first) targeting the music
    pub fn first_active_campaign_for(&self, music_id: &str) -> Option<&Campaign> {
        self.campaigns
            .iter()
            .find(|c| c.is_active() && c.music_token_id == music_id)
    }

    pub fn active_campaigns(&self) -> impl Iterator<Item = &Campaign> {
        self.campaigns.iter().filter(|c| c.is_active())
    }

    pub fn music_by_creator<'a>(&'a self, creator: &'a str) -> impl Iterator<Item = &'a Music> {
        self.music
            .iter()
            .filter(move |m| same_address(&m.creator_address, creator))
    }

    pub fn campaigns_by_creator<'a>(
        &'a self,
        creator: &'a str,
    ) -> impl Iterator<Item = &'a Campaign> {
        self.campaigns
            .iter()
            .filter(move |c| same_address(&c.creator_address, creator))
    }

    pub fn investments_by_user<'a>(
        &'a self,
        user: &'a str,
    ) -> impl Iterator<Item = &'a Investment> {
        self.investments
            .iter()
            .filter(move |i| same_address(&i.investor_address, user))
    }

    pub fn plays_by_user<'a>(&'a self, user: &'a str) -> impl Iterator<Item = &'a PlayEvent> {
        self.plays.iter().filter(move |p| p.user_id == user)
    }
}
