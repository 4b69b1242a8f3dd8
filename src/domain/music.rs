use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Patch, validation::ValidationError};

pub const DEFAULT_GENRE: &str = "General";
pub const DEFAULT_COVER: &str = "/assets/default-cover.png";
pub const DEFAULT_DURATION_SECS: u32 = 180;

/// An uploaded track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Music {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub genre: String,
    pub description: String,
    /// seconds
    pub duration: u32,
    pub cover_image_url: String,
    /// plain url or a media reference, see [`crate::storage::media::MediaRef`]
    pub audio_file_url: String,
    pub creator_address: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
}

/// What the upload form collects before a [`Music`] record exists
#[derive(Debug, Clone, Default)]
pub struct MusicDraft {
    pub title: String,
    pub artist: String,
    pub genre: Option<String>,
    pub description: Option<String>,
    /// `MM:SS` or plain seconds
    pub duration: Option<String>,
    pub creator_address: String,
}

impl MusicDraft {
    /// Builds the record. `audio_ref` and `cover_ref` are already stored media references.
    pub fn into_music(
        self,
        id: String,
        audio_ref: String,
        cover_ref: Option<String>,
        fingerprint: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Music, ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::MissingField("title"));
        }
        if self.artist.trim().is_empty() {
            return Err(ValidationError::MissingField("artist"));
        }
        if audio_ref.trim().is_empty() {
            return Err(ValidationError::MissingField("audio file"));
        }

        let duration = match self.duration.as_deref() {
            Some(d) if !d.trim().is_empty() => parse_duration(d)?,
            _ => DEFAULT_DURATION_SECS,
        };

        Ok(Music {
            id,
            title: self.title,
            artist: self.artist,
            genre: self
                .genre
                .filter(|g| !g.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_GENRE.to_string()),
            description: self.description.unwrap_or_default(),
            duration,
            cover_image_url: cover_ref.unwrap_or_else(|| DEFAULT_COVER.to_string()),
            audio_file_url: audio_ref,
            creator_address: self.creator_address,
            created_at: now,
            fingerprint,
            token_id: None,
            tx_hash: None,
        })
    }
}

/// parses `MM:SS` or a bare number of seconds
pub fn parse_duration(input: &str) -> Result<u32, ValidationError> {
    let invalid = || ValidationError::InvalidDuration(input.to_string());
    let input = input.trim();

    match input.split_once(':') {
        Some((minutes, seconds)) => {
            let minutes: u32 = minutes.trim().parse().map_err(|_| invalid())?;
            let seconds: u32 = seconds.trim().parse().map_err(|_| invalid())?;
            if seconds >= 60 {
                return Err(invalid());
            }
            minutes
                .checked_mul(60)
                .and_then(|m| m.checked_add(seconds))
                .ok_or_else(invalid)
        }
        None => input.parse().map_err(|_| invalid()),
    }
}

/// Partial update of a [`Music`] record. `None` leaves the field alone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MusicPatch {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub genre: Option<String>,
    pub description: Option<String>,
    pub duration: Option<u32>,
    pub cover_image_url: Option<String>,
    pub audio_file_url: Option<String>,
    pub token_id: Option<String>,
    pub tx_hash: Option<String>,
}

impl Patch<Music> for MusicPatch {
    fn apply(self, music: &mut Music) {
        if let Some(v) = self.title {
            music.title = v;
        }
        if let Some(v) = self.artist {
            music.artist = v;
        }
        if let Some(v) = self.genre {
            music.genre = v;
        }
        if let Some(v) = self.description {
            music.description = v;
        }
        if let Some(v) = self.duration {
            music.duration = v;
        }
        if let Some(v) = self.cover_image_url {
            music.cover_image_url = v;
        }
        if let Some(v) = self.audio_file_url {
            music.audio_file_url = v;
        }
        if self.token_id.is_some() {
            music.token_id = self.token_id;
        }
        if self.tx_hash.is_some() {
            music.tx_hash = self.tx_hash;
        }
    }
}
