use chrono::Utc;

use crate::{
    domain::{
        amount::Amount,
        campaign::{Campaign, CampaignPatch},
        ids::generate_id,
        investment::Investment,
        music::{Music, MusicPatch},
        play::PlayEvent,
        progress::{Role, UserProgress},
        royalty::RoyaltyCalculator,
        snapshot::{LedgerSnapshot, same_address},
        stats::StorageStats,
    },
    storage::{
        error::StorageError,
        media::{MediaFile, MediaKind, MediaRef},
    },
};

/// Typed access to the ledger collections.
///
/// Front ends depend on this trait rather than on a concrete store.
pub trait LedgerRepository {
    fn list_music(&self) -> Result<Vec<Music>, StorageError>;
    fn save_music(&mut self, music: Music) -> Result<(), StorageError>;
    /// false if no music has that id
    fn update_music(&mut self, id: &str, patch: MusicPatch) -> Result<bool, StorageError>;
    fn delete_music(&mut self, id: &str) -> Result<usize, StorageError>;

    fn list_campaigns(&self) -> Result<Vec<Campaign>, StorageError>;
    fn save_campaign(&mut self, campaign: Campaign) -> Result<(), StorageError>;
    fn update_campaign(&mut self, id: &str, patch: CampaignPatch) -> Result<bool, StorageError>;
    fn delete_campaign(&mut self, id: &str) -> Result<usize, StorageError>;

    fn list_investments(&self) -> Result<Vec<Investment>, StorageError>;
    /// Stores the investment and credits its campaign in one step.
    /// Returns the campaign as updated.
    fn record_investment(&mut self, investment: Investment) -> Result<Campaign, StorageError>;

    fn list_plays(&self) -> Result<Vec<PlayEvent>, StorageError>;
    fn record_play(&mut self, play: PlayEvent) -> Result<(), StorageError>;

    fn list_progress(&self) -> Result<Vec<UserProgress>, StorageError>;
    /// Replaces the user's cached progress and moves it to the front.
    fn put_progress(&mut self, progress: UserProgress) -> Result<(), StorageError>;

    /// Drops every collection
    fn clear_all(&mut self) -> Result<(), StorageError>;

    fn get_music(&self, id: &str) -> Result<Option<Music>, StorageError> {
        Ok(self.list_music()?.into_iter().find(|m| m.id == id))
    }

    fn music_by_creator(&self, creator: &str) -> Result<Vec<Music>, StorageError> {
        Ok(self
            .list_music()?
            .into_iter()
            .filter(|m| same_address(&m.creator_address, creator))
            .collect())
    }

    fn get_campaign(&self, id: &str) -> Result<Option<Campaign>, StorageError> {
        Ok(self.list_campaigns()?.into_iter().find(|c| c.id == id))
    }

    fn campaigns_by_music(&self, music_id: &str) -> Result<Vec<Campaign>, StorageError> {
        Ok(self
            .list_campaigns()?
            .into_iter()
            .filter(|c| c.music_token_id == music_id)
            .collect())
    }

    fn campaigns_by_creator(&self, creator: &str) -> Result<Vec<Campaign>, StorageError> {
        Ok(self
            .list_campaigns()?
            .into_iter()
            .filter(|c| same_address(&c.creator_address, creator))
            .collect())
    }

    fn active_campaigns(&self) -> Result<Vec<Campaign>, StorageError> {
        Ok(self
            .list_campaigns()?
            .into_iter()
            .filter(Campaign::is_active)
            .collect())
    }

    fn get_investment(&self, id: &str) -> Result<Option<Investment>, StorageError> {
        Ok(self.list_investments()?.into_iter().find(|i| i.id == id))
    }

    fn investments_by_user(&self, user: &str) -> Result<Vec<Investment>, StorageError> {
        Ok(self
            .list_investments()?
            .into_iter()
            .filter(|i| same_address(&i.investor_address, user))
            .collect())
    }

    fn investments_by_campaign(&self, campaign_id: &str) -> Result<Vec<Investment>, StorageError> {
        Ok(self
            .list_investments()?
            .into_iter()
            .filter(|i| i.campaign_id == campaign_id)
            .collect())
    }

    fn plays_by_user(&self, user: &str) -> Result<Vec<PlayEvent>, StorageError> {
        Ok(self
            .list_plays()?
            .into_iter()
            .filter(|p| p.user_id == user)
            .collect())
    }

    fn plays_by_music(&self, music_id: &str) -> Result<Vec<PlayEvent>, StorageError> {
        Ok(self
            .list_plays()?
            .into_iter()
            .filter(|p| p.music_id == music_id)
            .collect())
    }

    fn play_count(&self, music_id: &str) -> Result<u64, StorageError> {
        Ok(self.plays_by_music(music_id)?.len() as u64)
    }

    fn snapshot(&self) -> Result<LedgerSnapshot, StorageError> {
        Ok(LedgerSnapshot {
            music: self.list_music()?,
            campaigns: self.list_campaigns()?,
            investments: self.list_investments()?,
            plays: self.list_plays()?,
        })
    }

    fn storage_stats(&self) -> Result<StorageStats, StorageError> {
        Ok(StorageStats::from_snapshot(&self.snapshot()?))
    }

    /// Validates and records an investment of `amount` by `investor` into a campaign.
    fn invest(
        &mut self,
        campaign_id: &str,
        investor: Option<&str>,
        amount: Amount,
    ) -> Result<(Investment, Campaign), StorageError> {
        let campaign = self
            .get_campaign(campaign_id)?
            .ok_or_else(|| StorageError::CampaignNotFound(campaign_id.to_string()))?;
        let mut investment =
            Investment::new(generate_id(), &campaign, investor, amount, Utc::now())?;
        let campaign = self.record_investment(investment.clone())?;
        investment.raised_at_investment = Some(campaign.current_amount);
        Ok((investment, campaign))
    }

    fn get_user_progress(&self, user: &str) -> Result<Option<UserProgress>, StorageError> {
        Ok(self.list_progress()?.into_iter().find(|p| p.user_id == user))
    }

    /// Recomputes the user's progress from all collections and caches it.
    fn update_user_progress(
        &mut self,
        user: &str,
        role: Role,
        calc: &RoyaltyCalculator,
    ) -> Result<UserProgress, StorageError> {
        let snapshot = self.snapshot()?;
        let progress = UserProgress::compute(&snapshot, calc, user, role, Utc::now());
        self.put_progress(progress.clone())?;
        log::info!(
            "progress of {user}: {} ({:.1}%)",
            progress.level,
            progress.progress_percentage
        );
        Ok(progress)
    }
}

/// Storage of uploaded media blobs
pub trait MediaStore {
    fn save_media(
        &mut self,
        kind: MediaKind,
        id: &str,
        bytes: &[u8],
        mime_type: &str,
    ) -> Result<MediaRef, StorageError>;

    fn load_media(&self, reference: &MediaRef) -> Result<Option<MediaFile>, StorageError>;
}
