use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Patch, amount::Amount, validation::ValidationError};

pub const DEFAULT_DURATION_DAYS: u32 = 30;
pub const DEFAULT_LOCKUP_DAYS: u32 = 90;
pub const MAX_ROYALTY_PERCENTAGE: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Active,
    Successful,
    Failed,
    Cancelled,
}

impl Display for CampaignStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CampaignStatus::Active => "active",
            CampaignStatus::Successful => "successful",
            CampaignStatus::Failed => "failed",
            CampaignStatus::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

impl FromStr for CampaignStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(CampaignStatus::Active),
            "successful" => Ok(CampaignStatus::Successful),
            "failed" => Ok(CampaignStatus::Failed),
            "cancelled" => Ok(CampaignStatus::Cancelled),
            other => Err(anyhow::anyhow!("unknown campaign status '{other}'")),
        }
    }
}

/// A funding pool tied to one music work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: String,
    /// `Music::id`, not enforced
    pub music_token_id: String,
    pub music_title: String,
    pub goal: Amount,
    pub royalty_percentage: f64,
    pub deadline: DateTime<Utc>,
    /// days
    pub lockup_period: u32,
    pub current_amount: Amount,
    pub backers: u32,
    pub creator_address: String,
    pub description: String,
    pub status: CampaignStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
}

impl Campaign {
    pub fn is_active(&self) -> bool {
        self.status == CampaignStatus::Active
    }

    /// raised / goal in percent, capped at 100
    pub fn funded_percentage(&self) -> f64 {
        if !self.goal.is_positive() {
            return 0.0;
        }
        (self.current_amount.value() / self.goal.value() * 100.0).min(100.0)
    }

    /// Applies one contribution. Only `current_amount` and `backers` change.
    pub fn add_contribution(&mut self, amount: Amount) {
        self.current_amount = self.current_amount + amount;
        self.backers += 1;
    }
}

#[derive(Debug, Clone, Default)]
pub struct CampaignDraft {
    pub music_token_id: String,
    pub music_title: String,
    pub goal: Amount,
    pub royalty_percentage: f64,
    pub duration_days: Option<u32>,
    pub lockup_days: Option<u32>,
    pub description: Option<String>,
    pub creator_address: String,
}

impl CampaignDraft {
    pub fn into_campaign(self, id: String, now: DateTime<Utc>) -> Result<Campaign, ValidationError> {
        if self.music_token_id.trim().is_empty() {
            return Err(ValidationError::MissingField("music id"));
        }
        if !self.goal.is_positive() {
            return Err(ValidationError::NonPositiveGoal);
        }
        let royalty = self.royalty_percentage;
        if !(royalty > 0.0 && royalty <= MAX_ROYALTY_PERCENTAGE) {
            return Err(ValidationError::RoyaltyOutOfRange(royalty));
        }

        let days = self.duration_days.unwrap_or(DEFAULT_DURATION_DAYS);
        let deadline = Duration::try_days(i64::from(days))
            .and_then(|d| now.checked_add_signed(d))
            .ok_or(ValidationError::DurationOutOfRange(days))?;
        let description = self
            .description
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| format!("Funding pool for {}", self.music_title));

        Ok(Campaign {
            id,
            music_token_id: self.music_token_id,
            music_title: self.music_title,
            goal: self.goal,
            royalty_percentage: royalty,
            deadline,
            lockup_period: self.lockup_days.unwrap_or(DEFAULT_LOCKUP_DAYS),
            current_amount: Amount::ZERO,
            backers: 0,
            creator_address: self.creator_address,
            description,
            status: CampaignStatus::Active,
            created_at: now,
            campaign_id: None,
            tx_hash: None,
        })
    }
}

/// Partial update of a [`Campaign`]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignPatch {
    pub goal: Option<Amount>,
    pub royalty_percentage: Option<f64>,
    pub deadline: Option<DateTime<Utc>>,
    pub lockup_period: Option<u32>,
    pub current_amount: Option<Amount>,
    pub backers: Option<u32>,
    pub description: Option<String>,
    pub status: Option<CampaignStatus>,
    pub campaign_id: Option<String>,
    pub tx_hash: Option<String>,
}

impl CampaignPatch {
    pub fn status(status: CampaignStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}

impl Patch<Campaign> for CampaignPatch {
    fn apply(self, campaign: &mut Campaign) {
        if let Some(v) = self.goal {
            campaign.goal = v;
        }
        if let Some(v) = self.royalty_percentage {
            campaign.royalty_percentage = v;
        }
        if let Some(v) = self.deadline {
            campaign.deadline = v;
        }
        if let Some(v) = self.lockup_period {
            campaign.lockup_period = v;
        }
        if let Some(v) = self.current_amount {
            campaign.current_amount = v;
        }
        if let Some(v) = self.backers {
            campaign.backers = v;
        }
        if let Some(v) = self.description {
            campaign.description = v;
        }
        if let Some(v) = self.status {
            campaign.status = v;
        }
        if self.campaign_id.is_some() {
            campaign.campaign_id = self.campaign_id;
        }
        if self.tx_hash.is_some() {
            campaign.tx_hash = self.tx_hash;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(goal: f64, royalty: f64) -> CampaignDraft {
        CampaignDraft {
            music_token_id: "m1".into(),
            music_title: "Hindia".into(),
            goal: Amount(goal),
            royalty_percentage: royalty,
            creator_address: "creator".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_draft_rejects_unrepresentable_deadline() {
        let draft = CampaignDraft {
            duration_days: Some(u32::MAX),
            ..draft(1000.0, 20.0)
        };
        assert_eq!(
            draft.into_campaign("c1".into(), Utc::now()).unwrap_err(),
            ValidationError::DurationOutOfRange(u32::MAX)
        );
    }

    #[test]
    fn test_draft_sets_defaults() -> anyhow::Result<()> {
        let now = Utc::now();
        let campaign = draft(1000.0, 30.0).into_campaign("c1".into(), now)?;

        assert_eq!(campaign.current_amount, Amount::ZERO);
        assert_eq!(campaign.backers, 0);
        assert_eq!(campaign.status, CampaignStatus::Active);
        assert_eq!(campaign.lockup_period, DEFAULT_LOCKUP_DAYS);
        assert_eq!(campaign.deadline, now + Duration::days(30));
        assert_eq!(campaign.description, "Funding pool for Hindia");
        Ok(())
    }

    #[test]
    fn test_draft_validation() {
        let now = Utc::now();
        assert_eq!(
            draft(0.0, 30.0).into_campaign("c".into(), now).unwrap_err(),
            ValidationError::NonPositiveGoal
        );
        assert!(matches!(
            draft(100.0, 0.0).into_campaign("c".into(), now),
            Err(ValidationError::RoyaltyOutOfRange(_))
        ));
        assert!(matches!(
            draft(100.0, 50.5).into_campaign("c".into(), now),
            Err(ValidationError::RoyaltyOutOfRange(_))
        ));
        assert!(draft(100.0, 50.0).into_campaign("c".into(), now).is_ok());
        assert!(draft(100.0, 0.01).into_campaign("c".into(), now).is_ok());
    }

    #[test]
    fn test_status_serializes_lowercase() -> anyhow::Result<()> {
        assert_eq!(
            serde_json::to_string(&CampaignStatus::Cancelled)?,
            "\"cancelled\""
        );
        assert_eq!("Successful".parse::<CampaignStatus>()?, CampaignStatus::Successful);
        Ok(())
    }

    #[test]
    fn test_funded_percentage_caps_at_hundred() -> anyhow::Result<()> {
        let mut c = draft(100.0, 10.0).into_campaign("c".into(), Utc::now())?;
        c.add_contribution(Amount(40.0));
        assert_eq!(c.funded_percentage(), 40.0);
        c.add_contribution(Amount(100.0));
        assert_eq!(c.funded_percentage(), 100.0);
        assert_eq!(c.backers, 2);
        Ok(())
    }
}
