//! Error types for the rewards engine.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RewardsError {
    #[error("Malformed action: {reason}")]
    MalformedAction { reason: String },

    #[error("Invalid user id: must be non-empty")]
    InvalidUserId,

    #[error("Level table error: {0}")]
    LevelTable(String),

    #[error("Tier table error: {0}")]
    TierTable(String),

    #[error("Badge catalog error: {0}")]
    BadgeCatalog(String),

    #[error("Challenge catalog error: {0}")]
    ChallengeCatalog(String),

    #[error("Invalid stats for user '{user_id}': {reason}")]
    InvalidStats { user_id: String, reason: String },

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RewardsError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        RewardsError::MalformedAction { reason: reason.into() }
    }

    pub fn code(&self) -> i32 {
        match self {
            RewardsError::MalformedAction { .. } => -32602,
            RewardsError::InvalidUserId => -32001,
            RewardsError::LevelTable(_) => -32010,
            RewardsError::TierTable(_) => -32011,
            RewardsError::BadgeCatalog(_) => -32012,
            RewardsError::ChallengeCatalog(_) => -32013,
            RewardsError::InvalidStats { .. } => -32020,
            RewardsError::Config(_) => -32030,
            RewardsError::Io(_) => -32006,
            RewardsError::Json(_) => -32700,
        }
    }

    /// Catalog errors are programming errors in static configuration.
    pub fn is_catalog_error(&self) -> bool {
        matches!(
            self,
            RewardsError::LevelTable(_)
                | RewardsError::TierTable(_)
                | RewardsError::BadgeCatalog(_)
                | RewardsError::ChallengeCatalog(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, RewardsError>;
