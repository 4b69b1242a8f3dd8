pub mod amount;
pub mod campaign;
pub mod hash;
pub mod ids;
pub mod investment;
pub mod music;
pub mod play;
pub mod progress;
pub mod royalty;
pub mod snapshot;
pub mod stats;
pub mod validation;

/// Partial update of a record: fields left out keep their value.
pub trait Patch<T> {
    fn apply(self, record: &mut T);
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{DateTime, Utc};

    use super::{
        amount::Amount,
        campaign::{Campaign, CampaignStatus},
        investment::Investment,
        music::Music,
        play::PlayEvent,
    };

    pub fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    pub fn music(id: &str, creator: &str) -> Music {
        Music {
            id: id.to_string(),
            title: format!("Song {id}"),
            artist: "Tenxi".to_string(),
            genre: "Pop".to_string(),
            description: String::new(),
            duration: 180,
            cover_image_url: "/assets/default-cover.png".to_string(),
            audio_file_url: format!("blobstore:audio:{id}"),
            creator_address: creator.to_string(),
            created_at: t0(),
            fingerprint: None,
            token_id: None,
            tx_hash: None,
        }
    }

    /// active campaign with a goal of 1000 and nothing raised
    pub fn campaign(id: &str, music_id: &str, royalty: f64) -> Campaign {
        Campaign {
            id: id.to_string(),
            music_token_id: music_id.to_string(),
            music_title: format!("Song {music_id}"),
            goal: Amount(1000.0),
            royalty_percentage: royalty,
            deadline: t0(),
            lockup_period: 90,
            current_amount: Amount::ZERO,
            backers: 0,
            creator_address: "creator".to_string(),
            description: format!("Pool {id}"),
            status: CampaignStatus::Active,
            created_at: t0(),
            campaign_id: None,
            tx_hash: None,
        }
    }

    pub fn investment(id: &str, campaign_id: &str, investor: &str, amount: f64) -> Investment {
        Investment {
            id: id.to_string(),
            campaign_id: campaign_id.to_string(),
            music_title: "Song".to_string(),
            investor_address: investor.to_string(),
            amount: Amount(amount),
            invested_at: t0(),
            royalty_share: 30.0,
            raised_at_investment: None,
        }
    }

    pub fn plays(music_id: &str, count: usize) -> Vec<PlayEvent> {
        (0..count)
            .map(|n| PlayEvent {
                id: format!("p_{music_id}_{n}"),
                music_id: music_id.to_string(),
                music_title: format!("Song {music_id}"),
                user_id: format!("listener{}", n % 3),
                played_at: t0(),
                duration: 30.0,
            })
            .collect()
    }
}
