use chrono::Utc;
use log::info;
use rouille::{Request, Response};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::{
    config::{HttpConfig, PublicEndpoint},
    domain::{
        amount::Amount,
        campaign::Campaign,
        investment::Investment,
        music::Music,
        play::{PlayPolicy, PlaySession, simulate_listen},
        progress::{Role, UserProgress},
        royalty::{RoyaltyCalculator, RoyaltyDetail},
        stats::{Leaderboard, PortfolioValue, QuickStats},
    },
    http::error::ApiError,
    public_endpoint::resolve_location,
    storage::{
        error::StorageError,
        media::{MediaKind, MediaRef},
        repository::{LedgerRepository, MediaStore},
    },
};

const DEFAULT_LEADERBOARD_LIMIT: usize = 10;

/// Local JSON API over a ledger
pub struct HttpServer<R> {
    storage: Arc<Mutex<R>>,
    pub config: HttpConfig,
    public: PublicEndpoint,
    royalty: RoyaltyCalculator,
    playback: PlayPolicy,
}

impl<R> HttpServer<R>
where
    R: LedgerRepository + MediaStore + Send + 'static,
{
    pub fn new(
        storage: R,
        config: HttpConfig,
        public: PublicEndpoint,
        royalty: RoyaltyCalculator,
        playback: PlayPolicy,
    ) -> Self {
        Self {
            storage: Arc::new(Mutex::new(storage)),
            config,
            public,
            royalty,
            playback,
        }
    }

    pub fn run(self) {
        let addr = format!("{}:{}", self.config.bind_addr, self.config.port);
        rouille::start_server(addr, move |request| self.handle_request(request));
    }

    fn handle_request(&self, request: &Request) -> Response {
        Self::log_request(request);

        let result = rouille::router!(request,
            (GET) (/music) => { self.list_music() },
            (GET) (/music/{id: String}) => { self.get_music(&id) },
            (GET) (/campaigns) => { self.list_campaigns(request) },
            (GET) (/campaigns/{id: String}) => { self.get_campaign(&id) },
            (GET) (/campaigns/{id: String}/investments) => { self.list_investments(&id) },
            (POST) (/campaigns/{id: String}/investments) => { self.invest(&id, request) },
            (POST) (/plays) => { self.record_listen(request) },
            (GET) (/users/{id: String}/royalty) => { self.user_royalty(&id, request) },
            (GET) (/users/{id: String}/progress) => { self.cached_progress(&id) },
            (POST) (/users/{id: String}/progress) => { self.refresh_progress(&id, request) },
            (GET) (/users/{id: String}/stats) => { self.user_stats(&id) },
            (GET) (/media/{kind: String}/{id: String}) => { self.get_media(&kind, &id) },
            (GET) (/stats) => { self.storage_stats() },
            (GET) (/leaderboard) => { self.leaderboard(request) },
            _ => Ok(Response::empty_404())
        );

        let response = result.unwrap_or_else(ApiError::into_response);
        info!("Response: {} {}", request.method(), response.status_code);
        response
    }

    fn log_request(request: &Request) {
        info!("{} {}", request.method(), request.url());
    }

    fn lock(&self) -> Result<MutexGuard<'_, R>, ApiError> {
        self.storage.lock().map_err(|e| {
            ApiError::from(StorageError::Internal(anyhow::anyhow!(
                "Could not access ledger under lock: {e}"
            )))
        })
    }

    fn music_response(&self, music: Music, play_count: u64) -> MusicResponse {
        MusicResponse {
            audio_url: resolve_location(&self.public, &music.audio_file_url),
            cover_url: resolve_location(&self.public, &music.cover_image_url),
            play_count,
            music,
        }
    }

    fn list_music(&self) -> Result<Response, ApiError> {
        let snapshot = self.lock()?.snapshot()?;
        let counts = snapshot.play_counts();

        let body: Vec<MusicResponse> = snapshot
            .music
            .iter()
            .map(|m| {
                let plays = counts.get(m.id.as_str()).copied().unwrap_or(0);
                self.music_response(m.clone(), plays)
            })
            .collect();
        Ok(Response::json(&body))
    }

    fn get_music(&self, id: &str) -> Result<Response, ApiError> {
        let (music, plays) = {
            let storage = self.lock()?;
            let music = storage
                .get_music(id)?
                .ok_or_else(|| StorageError::MusicNotFound(id.to_string()))?;
            (music, storage.play_count(id)?)
        };
        Ok(Response::json(&self.music_response(music, plays)))
    }

    fn list_campaigns(&self, request: &Request) -> Result<Response, ApiError> {
        let storage = self.lock()?;
        let campaigns = match request.get_param("active").as_deref() {
            Some("1") | Some("true") => storage.active_campaigns()?,
            _ => storage.list_campaigns()?,
        };
        Ok(Response::json(&campaigns))
    }

    fn get_campaign(&self, id: &str) -> Result<Response, ApiError> {
        let campaign = self
            .lock()?
            .get_campaign(id)?
            .ok_or_else(|| StorageError::CampaignNotFound(id.to_string()))?;
        Ok(Response::json(&CampaignResponse::from_domain(campaign)))
    }

    fn list_investments(&self, campaign_id: &str) -> Result<Response, ApiError> {
        let investments = self.lock()?.investments_by_campaign(campaign_id)?;
        Ok(Response::json(&investments))
    }

    fn invest(&self, campaign_id: &str, request: &Request) -> Result<Response, ApiError> {
        let body: InvestRequest = rouille::input::json_input(request)
            .map_err(|e| ApiError::BadRequest(format!("invalid investment body: {e}")))?;

        let (investment, campaign) = self.lock()?.invest(
            campaign_id,
            Some(body.investor_address.as_str()),
            body.amount,
        )?;

        Ok(Response::json(&InvestResponse {
            investment,
            campaign: CampaignResponse::from_domain(campaign),
        })
        .with_status_code(201))
    }

    /// Runs the reported listen through the play tracker and stores the plays it counts.
    fn record_listen(&self, request: &Request) -> Result<Response, ApiError> {
        let body: ListenRequest = rouille::input::json_input(request)
            .map_err(|e| ApiError::BadRequest(format!("invalid listen body: {e}")))?;

        if !body.listened_secs.is_finite() || body.listened_secs < 0.0 {
            return Err(ApiError::BadRequest(format!(
                "invalid listenedSecs {}",
                body.listened_secs
            )));
        }

        let mut storage = self.lock()?;
        let music = storage
            .get_music(&body.music_id)?
            .ok_or_else(|| StorageError::MusicNotFound(body.music_id.clone()))?;

        // the listen ended now, and cannot have lasted longer than the track
        let track_secs = f64::from(music.duration);
        let listened_ms = (body.listened_secs.min(track_secs) * 1000.0) as i64;
        let started_at = Utc::now() - chrono::Duration::milliseconds(listened_ms);

        let mut session = PlaySession::new(&music.id, &music.title, self.playback);
        let events = simulate_listen(
            &mut session,
            started_at,
            body.listened_secs,
            track_secs,
            body.user_id.as_deref(),
        )
        .map_err(StorageError::from)?;

        for event in events.iter().cloned() {
            storage.record_play(event)?;
        }
        Ok(Response::json(&events))
    }

    fn user_royalty(&self, user: &str, request: &Request) -> Result<Response, ApiError> {
        let role = Self::role_param(request)?;
        let snapshot = self.lock()?.snapshot()?;

        let body = match role {
            Role::Creator => RoyaltyResponse {
                role,
                total: self.royalty.total_creator_royalty(&snapshot, user),
                details: Vec::new(),
            },
            Role::User => RoyaltyResponse {
                role,
                total: self.royalty.total_investor_royalty(&snapshot, user),
                details: self.royalty.royalty_breakdown(&snapshot, user),
            },
        };
        Ok(Response::json(&body))
    }

    fn cached_progress(&self, user: &str) -> Result<Response, ApiError> {
        let progress: UserProgress = self
            .lock()?
            .get_user_progress(user)?
            .ok_or_else(|| ApiError::NotFound(format!("no progress recorded for {user}")))?;
        Ok(Response::json(&progress))
    }

    fn refresh_progress(&self, user: &str, request: &Request) -> Result<Response, ApiError> {
        let role = Self::role_param(request)?;
        let progress = self
            .lock()?
            .update_user_progress(user, role, &self.royalty)?;
        Ok(Response::json(&progress))
    }

    fn user_stats(&self, user: &str) -> Result<Response, ApiError> {
        let snapshot = self.lock()?.snapshot()?;
        Ok(Response::json(&UserStatsResponse {
            quick: QuickStats::for_user(&snapshot, user),
            portfolio: PortfolioValue::for_creator(&snapshot, user),
        }))
    }

    fn get_media(&self, kind: &str, id: &str) -> Result<Response, ApiError> {
        let kind: MediaKind = kind.parse()?;
        let reference = MediaRef::new(kind, id);

        let file = self
            .lock()?
            .load_media(&reference)?
            .ok_or_else(|| ApiError::NotFound(format!("{reference} not found")))?;

        log::debug!(
            "MEDIA {} -> 200 OK, {} bytes, MIME type: {}",
            reference,
            file.bytes.len(),
            file.mime_type
        );
        Ok(Response::from_data(file.mime_type, file.bytes))
    }

    fn storage_stats(&self) -> Result<Response, ApiError> {
        Ok(Response::json(&self.lock()?.storage_stats()?))
    }

    fn leaderboard(&self, request: &Request) -> Result<Response, ApiError> {
        let limit = match request.get_param("limit") {
            Some(raw) => raw
                .parse::<usize>()
                .map_err(|_| ApiError::BadRequest(format!("invalid limit '{raw}'")))?,
            None => DEFAULT_LEADERBOARD_LIMIT,
        };
        let snapshot = self.lock()?.snapshot()?;
        Ok(Response::json(&Leaderboard::from_snapshot(&snapshot, limit)))
    }

    fn role_param(request: &Request) -> Result<Role, ApiError> {
        match request.get_param("role") {
            Some(raw) => raw
                .parse()
                .map_err(|e: anyhow::Error| ApiError::BadRequest(e.to_string())),
            None => Ok(Role::User),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MusicResponse {
    #[serde(flatten)]
    music: Music,
    play_count: u64,
    audio_url: Option<String>,
    cover_url: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CampaignResponse {
    #[serde(flatten)]
    campaign: Campaign,
    funded_percentage: f64,
}

impl CampaignResponse {
    fn from_domain(campaign: Campaign) -> Self {
        Self {
            funded_percentage: campaign.funded_percentage(),
            campaign,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InvestRequest {
    investor_address: String,
    amount: Amount,
}

#[derive(Serialize)]
struct InvestResponse {
    investment: Investment,
    campaign: CampaignResponse,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListenRequest {
    music_id: String,
    user_id: Option<String>,
    listened_secs: f64,
}

#[derive(Serialize)]
struct RoyaltyResponse {
    role: Role,
    total: f64,
    details: Vec<RoyaltyDetail>,
}

#[derive(Serialize)]
struct UserStatsResponse {
    quick: QuickStats,
    portfolio: PortfolioValue,
}

#[cfg(test)]
pub fn parse_json_response<T: serde::de::DeserializeOwned>(
    response: rouille::Response,
) -> anyhow::Result<T> {
    Ok(serde_json::from_reader(
        response.data.into_reader_and_size().0,
    )?)
}
