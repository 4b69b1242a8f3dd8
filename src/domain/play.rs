//! Listening sessions and the rule deciding when one becomes a paid play.
//!
//! A session counts once the listener is at least `threshold` into the track
//! and at least `threshold` of wall-clock time has passed since playback started.
//! Reaching the end of the track records a completion play.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{ids::generate_id_at, validation::ValidationError};

pub const DEFAULT_PLAY_THRESHOLD_SECS: u32 = 30;

/// One monetizable listen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayEvent {
    pub id: String,
    pub music_id: String,
    pub music_title: String,
    pub user_id: String,
    pub played_at: DateTime<Utc>,
    /// seconds listened
    pub duration: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct PlayPolicy {
    pub threshold: Duration,
    /// record a completion play even when the threshold play was already recorded
    pub count_completion_after_threshold: bool,
}

impl Default for PlayPolicy {
    fn default() -> Self {
        Self {
            threshold: Duration::seconds(i64::from(DEFAULT_PLAY_THRESHOLD_SECS)),
            count_completion_after_threshold: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NotStarted,
    Playing,
    /// threshold play recorded
    Counted,
    Ended,
}

#[derive(Debug, Clone)]
pub struct PlaySession {
    music_id: String,
    music_title: String,
    policy: PlayPolicy,
    state: SessionState,
    started_at: Option<DateTime<Utc>>,
}

impl PlaySession {
    pub fn new(music_id: impl Into<String>, music_title: impl Into<String>, policy: PlayPolicy) -> Self {
        Self {
            music_id: music_id.into(),
            music_title: music_title.into(),
            policy,
            state: SessionState::NotStarted,
            started_at: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Starts playback. Starting an ended session begins a fresh one.
    pub fn start(&mut self, now: DateTime<Utc>) {
        match self.state {
            SessionState::NotStarted | SessionState::Ended => {
                self.state = SessionState::Playing;
                self.started_at = Some(now);
            }
            SessionState::Playing | SessionState::Counted => {}
        }
    }

    /// Position update from the player. Returns the threshold play the first time it is reached.
    pub fn on_progress(
        &mut self,
        now: DateTime<Utc>,
        position_secs: f64,
        user_id: Option<&str>,
    ) -> Option<PlayEvent> {
        if self.state != SessionState::Playing {
            return None;
        }
        let user_id = user_id.filter(|u| !u.is_empty())?;
        let started_at = self.started_at?;

        let threshold_secs = self.policy.threshold.num_milliseconds() as f64 / 1000.0;
        if position_secs < threshold_secs || now - started_at < self.policy.threshold {
            return None;
        }

        self.state = SessionState::Counted;
        log::debug!("play of {} counted at {position_secs:.1}s", self.music_id);
        Some(self.event(now, user_id, position_secs))
    }

    /// Playback reached the end of the track.
    pub fn on_ended(
        &mut self,
        now: DateTime<Utc>,
        track_duration_secs: f64,
        user_id: Option<&str>,
    ) -> Option<PlayEvent> {
        let previous = self.state;
        if matches!(previous, SessionState::NotStarted | SessionState::Ended) {
            return None;
        }
        self.state = SessionState::Ended;

        let user_id = user_id.filter(|u| !u.is_empty())?;
        if previous == SessionState::Counted && !self.policy.count_completion_after_threshold {
            return None;
        }

        log::debug!("play of {} completed", self.music_id);
        Some(self.event(now, user_id, track_duration_secs))
    }

    fn event(&self, now: DateTime<Utc>, user_id: &str, duration: f64) -> PlayEvent {
        PlayEvent {
            id: generate_id_at(now),
            music_id: self.music_id.clone(),
            music_title: self.music_title.clone(),
            user_id: user_id.to_string(),
            played_at: now,
            duration,
        }
    }
}

/// Replays a listen of `listened_secs` through a session, as a player would report it.
///
/// Used where only the listened length is known, e.g. the command line.
/// Negative or non-finite lengths are rejected.
pub fn simulate_listen(
    session: &mut PlaySession,
    started_at: DateTime<Utc>,
    listened_secs: f64,
    track_duration_secs: f64,
    user_id: Option<&str>,
) -> Result<Vec<PlayEvent>, ValidationError> {
    if !listened_secs.is_finite() || listened_secs < 0.0 {
        return Err(ValidationError::InvalidListen(listened_secs));
    }

    session.start(started_at);

    let listened = listened_secs.min(track_duration_secs).max(0.0);
    let at = started_at + Duration::milliseconds((listened * 1000.0) as i64);

    let mut events = Vec::new();
    events.extend(session.on_progress(at, listened, user_id));
    if listened_secs >= track_duration_secs {
        events.extend(session.on_ended(at, track_duration_secs, user_id));
    }
    Ok(events)
}
