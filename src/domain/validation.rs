use thiserror::Error;

/// Rejected user input. Nothing is written when one of these is returned.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("goal amount must be greater than zero")]
    NonPositiveGoal,

    #[error("royalty percentage must be between 0.01% and 50%, got {0}")]
    RoyaltyOutOfRange(f64),

    #[error("investment amount must be greater than zero")]
    NonPositiveAmount,

    #[error("a known user id is required")]
    UnknownUser,

    #[error("invalid duration '{0}', expected MM:SS or seconds")]
    InvalidDuration(String),

    #[error("listened time must be a non-negative number of seconds, got {0}")]
    InvalidListen(f64),

    #[error("campaign duration of {0} days is out of range")]
    DurationOutOfRange(u32),

    #[error("'{0}' is not an audio file")]
    NotAudio(String),
}
