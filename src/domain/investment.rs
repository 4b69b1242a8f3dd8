use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{amount::Amount, campaign::Campaign, validation::ValidationError};

/// A supporter's contribution to a campaign
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Investment {
    pub id: String,
    pub campaign_id: String,
    pub music_title: String,
    pub investor_address: String,
    pub amount: Amount,
    pub invested_at: DateTime<Utc>,
    /// campaign royalty percentage at investment time
    pub royalty_share: f64,
    /// campaign total right after this investment was applied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raised_at_investment: Option<Amount>,
}

impl Investment {
    /// Builds an investment into `campaign`, copying its title and royalty terms.
    pub fn new(
        id: String,
        campaign: &Campaign,
        investor: Option<&str>,
        amount: Amount,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let investor = investor
            .filter(|i| !i.trim().is_empty())
            .ok_or(ValidationError::UnknownUser)?;
        if !amount.is_positive() {
            return Err(ValidationError::NonPositiveAmount);
        }

        Ok(Self {
            id,
            campaign_id: campaign.id.clone(),
            music_title: campaign.music_title.clone(),
            investor_address: investor.to_string(),
            amount,
            invested_at: now,
            royalty_share: campaign.royalty_percentage,
            raised_at_investment: None,
        })
    }
}
