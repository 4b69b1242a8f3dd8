use std::path::Path;

use chrono::Utc;

use crate::{
    config,
    domain::{
        campaign::{Campaign, CampaignPatch},
        hash::Fingerprint,
        ids::generate_id,
        investment::Investment,
        music::{Music, MusicDraft, MusicPatch},
        play::PlayEvent,
        progress::UserProgress,
        validation::ValidationError,
    },
    storage::{
        collection::{self, Record},
        db,
        error::StorageError,
        media::{self, MediaFile, MediaKind, MediaRef},
        repository::{LedgerRepository, MediaStore},
        schema::keys,
    },
};

/// Ledger kept in a SQLite database
pub struct SqliteLedger {
    pub(crate) db: rusqlite::Connection,
}

impl SqliteLedger {
    /// when called, opens a data base connection
    pub fn new(db_config: &config::Database) -> Result<Self, StorageError> {
        let db = db::open(db_config)?;
        Ok(Self::from_existing_conn(db))
    }

    pub fn from_existing_conn(db: rusqlite::Connection) -> Self {
        Self { db }
    }

    /// Stores the audio file (and optional cover) as media blobs and registers the track.
    ///
    /// Blobs and the record are written in one transaction.
    pub fn upload_music(
        &mut self,
        draft: MusicDraft,
        audio: &Path,
        cover: Option<&Path>,
    ) -> Result<Music, StorageError> {
        let audio_mime = media::mime_for_path(audio);
        if !audio_mime.starts_with("audio/") {
            return Err(ValidationError::NotAudio(audio.to_string_lossy().to_string()).into());
        }
        let audio_bytes = std::fs::read(audio)?;
        let cover_blob = match cover {
            Some(path) => Some((std::fs::read(path)?, media::mime_for_path(path))),
            None => None,
        };

        let id = generate_id();
        let fingerprint = Fingerprint::from_bytes(&audio_bytes);

        let tx = self.db.transaction()?;
        let audio_ref = media::save_media(&tx, MediaKind::Audio, &id, &audio_bytes, &audio_mime)?;
        let cover_ref = match &cover_blob {
            Some((bytes, mime)) => {
                Some(media::save_media(&tx, MediaKind::Image, &id, bytes, mime)?.to_string())
            }
            None => None,
        };

        let music = draft.into_music(
            id,
            audio_ref.to_string(),
            cover_ref,
            Some(fingerprint.to_hex()),
            Utc::now(),
        )?;
        collection::save(&tx, music.clone())?;
        tx.commit()?;

        log::info!(
            "registered '{}' by {} ({} bytes of audio)",
            music.title,
            music.artist,
            audio_bytes.len()
        );
        Ok(music)
    }

    /// Deletes the track record together with its stored audio and cover.
    pub fn remove_music(&mut self, id: &str) -> Result<bool, StorageError> {
        let tx = self.db.transaction()?;
        let removed = collection::delete::<Music>(&tx, id)?;
        for kind in [MediaKind::Audio, MediaKind::Image] {
            media::delete_media(&tx, &MediaRef::new(kind, id))?;
        }
        tx.commit()?;

        if removed > 0 {
            log::info!("removed music {id}");
        }
        Ok(removed > 0)
    }

    /// Tracks whose audio has the same fingerprint
    pub fn find_by_fingerprint(&self, fingerprint: &Fingerprint) -> Result<Vec<Music>, StorageError> {
        let hex = fingerprint.to_hex();
        Ok(self
            .list_music()?
            .into_iter()
            .filter(|m| m.fingerprint.as_deref() == Some(hex.as_str()))
            .collect())
    }
}

impl LedgerRepository for SqliteLedger {
    fn list_music(&self) -> Result<Vec<Music>, StorageError> {
        collection::get_all(&self.db)
    }

    fn save_music(&mut self, music: Music) -> Result<(), StorageError> {
        collection::save(&self.db, music)
    }

    fn update_music(&mut self, id: &str, patch: MusicPatch) -> Result<bool, StorageError> {
        collection::update::<Music, _>(&self.db, id, patch)
    }

    fn delete_music(&mut self, id: &str) -> Result<usize, StorageError> {
        collection::delete::<Music>(&self.db, id)
    }

    fn list_campaigns(&self) -> Result<Vec<Campaign>, StorageError> {
        collection::get_all(&self.db)
    }

    fn save_campaign(&mut self, campaign: Campaign) -> Result<(), StorageError> {
        collection::save(&self.db, campaign)
    }

    fn update_campaign(&mut self, id: &str, patch: CampaignPatch) -> Result<bool, StorageError> {
        collection::update::<Campaign, _>(&self.db, id, patch)
    }

    fn delete_campaign(&mut self, id: &str) -> Result<usize, StorageError> {
        collection::delete::<Campaign>(&self.db, id)
    }

    fn list_investments(&self) -> Result<Vec<Investment>, StorageError> {
        collection::get_all(&self.db)
    }

    fn record_investment(&mut self, mut investment: Investment) -> Result<Campaign, StorageError> {
        let tx = self.db.transaction()?;

        let mut campaigns = collection::get_all::<Campaign>(&tx)?;
        let campaign = campaigns
            .iter_mut()
            .find(|c| c.id == investment.campaign_id)
            .ok_or_else(|| StorageError::CampaignNotFound(investment.campaign_id.clone()))?;

        campaign.add_contribution(investment.amount);
        investment.raised_at_investment = Some(campaign.current_amount);
        let updated = campaign.clone();

        collection::put_all(&tx, &campaigns)?;
        collection::save(&tx, investment)?;
        tx.commit()?;

        log::info!(
            "campaign {} now at {} from {} backers",
            updated.id,
            updated.current_amount,
            updated.backers
        );
        Ok(updated)
    }

    fn list_plays(&self) -> Result<Vec<PlayEvent>, StorageError> {
        collection::get_all(&self.db)
    }

    fn record_play(&mut self, play: PlayEvent) -> Result<(), StorageError> {
        log::debug!("play of {} by {}", play.music_id, play.user_id);
        collection::save(&self.db, play)
    }

    fn list_progress(&self) -> Result<Vec<UserProgress>, StorageError> {
        collection::get_all(&self.db)
    }

    fn put_progress(&mut self, progress: UserProgress) -> Result<(), StorageError> {
        let tx = self.db.transaction()?;
        let mut all = collection::get_all::<UserProgress>(&tx)?;
        all.retain(|p| p.id() != progress.id());
        all.insert(0, progress);
        collection::put_all(&tx, &all)?;
        tx.commit()?;
        Ok(())
    }

    fn clear_all(&mut self) -> Result<(), StorageError> {
        let tx = self.db.transaction()?;
        for key in keys::ALL_KEYS {
            collection::clear(&tx, key)?;
        }
        tx.commit()?;
        Ok(())
    }
}

impl MediaStore for SqliteLedger {
    fn save_media(
        &mut self,
        kind: MediaKind,
        id: &str,
        bytes: &[u8],
        mime_type: &str,
    ) -> Result<MediaRef, StorageError> {
        media::save_media(&self.db, kind, id, bytes, mime_type)
    }

    fn load_media(&self, reference: &MediaRef) -> Result<Option<MediaFile>, StorageError> {
        media::load_media(&self.db, reference)
    }
}
