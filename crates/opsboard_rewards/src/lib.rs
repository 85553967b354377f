//! Gamification engine for the hotel operations dashboard.
//!
//! Turns a stream of staff actions (incidents, maintenance, quality audits,
//! lost and found, procedures, logins) into XP, levels, badges, a composite
//! rank and weekly challenge progress.
//!
//! ```ignore
//! use opsboard_rewards::{Action, GamificationService, MemoryRepository, RewardsEngine};
//!
//! let service = GamificationService::new(RewardsEngine::standard()?, MemoryRepository::new());
//! let outcome = service.apply_action("front-desk-01", Action::ReturnLostItem)?;
//! println!("+{} XP, {} new badges", outcome.xp_gained, outcome.new_badges.len());
//! ```

pub mod action;
pub mod badges;
pub mod calendar;
pub mod challenges;
pub mod config;
pub mod engine;
pub mod error;
pub mod progression;
pub mod rank;
pub mod service;
pub mod store;

pub use action::{Action, ActionKind, ActionRequest, Module, Severity};
pub use badges::{Badge, BadgeCatalog, BadgeCategory, BadgeCondition, BadgeTier, BadgeView};
pub use calendar::Calendar;
pub use challenges::{Challenge, ChallengeBoard, ChallengeCatalog, ChallengeTemplate};
pub use config::{RewardsConfig, XpRewards};
pub use engine::{ActionOutcome, LevelInfo, RewardsEngine};
pub use error::{Result, RewardsError};
pub use progression::{LevelDef, LevelTable, UserStats};
pub use rank::{RankInfo, Tier, TierTable};
pub use service::{Clock, GamificationService, LeaderboardEntry, ManualClock, SystemClock};
pub use store::{JsonDirRepository, MemoryRepository, StatsRepository};
