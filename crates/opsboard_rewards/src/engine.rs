//! Rewards engine
//!
//! Bundles the validated catalogs (levels, tiers, badges, challenges) with
//! the XP table and calendar, and composes them into the per-action scoring
//! step. Everything here is pure; [`crate::service`] adds the per-user state.

use crate::action::Action;
use crate::badges::{Badge, BadgeCatalog, BadgeView};
use crate::calendar::Calendar;
use crate::challenges::{ChallengeBoard, ChallengeCatalog};
use crate::config::{RewardsConfig, XpRewards};
use crate::error::{Result, RewardsError};
use crate::progression::{Accumulator, LevelTable, UserStats};
use crate::rank::{RankInfo, TierTable};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Outcome of one scored action
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionOutcome {
    pub new_stats: UserStats,
    pub xp_gained: u64,
    pub new_badges: Vec<Badge>,
    pub previous_level: u32,
}

impl ActionOutcome {
    pub fn leveled_up(&self) -> bool {
        self.new_stats.level > self.previous_level
    }
}

/// Level display data for one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelInfo {
    pub level: u32,
    pub name: String,
    pub color: String,
    pub icon: String,
    pub xp: u64,
    pub min_xp: u64,
    pub next_min_xp: Option<u64>,
    pub xp_to_next: u64,
    pub progress_percent: u8,
}

#[derive(Debug, Clone)]
pub struct RewardsEngine {
    rewards: XpRewards,
    calendar: Calendar,
    levels: LevelTable,
    tiers: TierTable,
    badges: BadgeCatalog,
    challenges: ChallengeCatalog,
}

impl RewardsEngine {
    /// Engine with the built-in catalogs. Fails fast on invalid config.
    pub fn new(config: &RewardsConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| RewardsError::Config(e.to_string()))?;
        Ok(Self::with_catalogs(
            config.xp.clone(),
            Calendar::with_offset_minutes(config.calendar.utc_offset_minutes)?,
            LevelTable::standard()?,
            TierTable::standard()?,
            BadgeCatalog::standard()?,
            ChallengeCatalog::standard()?,
        ))
    }

    pub fn standard() -> Result<Self> {
        Self::new(&RewardsConfig::default())
    }

    pub fn with_catalogs(
        rewards: XpRewards,
        calendar: Calendar,
        levels: LevelTable,
        tiers: TierTable,
        badges: BadgeCatalog,
        challenges: ChallengeCatalog,
    ) -> Self {
        Self { rewards, calendar, levels, tiers, badges, challenges }
    }

    pub fn rewards(&self) -> &XpRewards {
        &self.rewards
    }

    pub fn calendar(&self) -> &Calendar {
        &self.calendar
    }

    pub fn levels(&self) -> &LevelTable {
        &self.levels
    }

    pub fn tiers(&self) -> &TierTable {
        &self.tiers
    }

    pub fn badge_catalog(&self) -> &BadgeCatalog {
        &self.badges
    }

    pub fn challenge_catalog(&self) -> &ChallengeCatalog {
        &self.challenges
    }

    pub fn accumulator(&self) -> Accumulator<'_> {
        Accumulator::new(&self.rewards, &self.levels, &self.calendar)
    }

    /// Fresh record for a user seen for the first time
    pub fn new_user(&self, user_id: &str, now: DateTime<Utc>) -> UserStats {
        let mut stats = UserStats::new(user_id, now);
        stats.level = self.levels.level_number(0);
        stats
    }

    /// Accumulate, relevel, then unlock newly satisfied badges
    pub fn score(&self, stats: &UserStats, action: &Action, now: DateTime<Utc>) -> Result<ActionOutcome> {
        let gain = self.accumulator().apply(stats, action, now)?;
        let mut new_stats = gain.stats;

        let new_badges: Vec<Badge> = self
            .badges
            .evaluate(&new_stats)
            .into_iter()
            .cloned()
            .collect();
        new_stats
            .badges
            .extend(new_badges.iter().map(|b| b.id.clone()));

        Ok(ActionOutcome {
            new_stats,
            xp_gained: gain.xp_gained,
            new_badges,
            previous_level: stats.level,
        })
    }

    pub fn level_info(&self, stats: &UserStats) -> LevelInfo {
        let current = self.levels.level_of(stats.xp);
        LevelInfo {
            level: current.level,
            name: current.name.clone(),
            color: current.color.clone(),
            icon: current.icon.clone(),
            xp: stats.xp,
            min_xp: current.min_xp,
            next_min_xp: self.levels.next_after(current.level).map(|l| l.min_xp),
            xp_to_next: self.levels.xp_to_next(stats.xp),
            progress_percent: self.levels.progress_to_next(stats.xp),
        }
    }

    pub fn rank(&self, stats: &UserStats) -> RankInfo {
        self.tiers.rank_of(stats)
    }

    pub fn visible_badges(&self, stats: &UserStats) -> Vec<BadgeView> {
        self.badges.visible(stats)
    }

    pub fn challenges(&self, stats: &UserStats, now: DateTime<Utc>) -> ChallengeBoard {
        self.challenges.board(&self.calendar, now, stats)
    }

    /// Check the invariants of a snapshot coming from outside the engine
    pub fn check_stats(&self, stats: &UserStats) -> Result<()> {
        let invalid = |reason: String| RewardsError::InvalidStats {
            user_id: stats.user_id.clone(),
            reason,
        };

        if stats.user_id.trim().is_empty() {
            return Err(RewardsError::InvalidUserId);
        }
        let expected = self.levels.level_number(stats.xp);
        if stats.level != expected {
            return Err(invalid(format!(
                "level {} does not match xp {} (expected level {})",
                stats.level, stats.xp, expected
            )));
        }
        if stats.longest_streak < stats.current_streak {
            return Err(invalid(format!(
                "longest streak {} below current streak {}",
                stats.longest_streak, stats.current_streak
            )));
        }
        if stats.resolution_time_samples > stats.incidents_resolved {
            return Err(invalid(format!(
                "{} timed resolutions but only {} resolved incidents",
                stats.resolution_time_samples, stats.incidents_resolved
            )));
        }
        if let Some(unknown) = stats.badges.iter().find(|id| !self.badges.contains(id)) {
            return Err(invalid(format!("unknown badge '{}'", unknown)));
        }
        for (name, value) in [
            ("avg_resolution_time", stats.avg_resolution_time),
            ("avg_quality_score", stats.avg_quality_score),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(format!("{} must be a non-negative number, got {}", name, value)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Severity;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 20, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_score_unlocks_badges_once() {
        let engine = RewardsEngine::standard().unwrap();
        let stats = engine.new_user("u", now());
        let outcome = engine
            .score(&stats, &Action::CreateIncident { severity: None }, now())
            .unwrap();
        assert_eq!(outcome.new_badges.len(), 1);
        assert!(outcome.new_stats.has_badge("premier_signalement"));

        let again = engine
            .score(&outcome.new_stats, &Action::CreateIncident { severity: None }, now())
            .unwrap();
        assert!(again.new_badges.is_empty());
        assert!(again.new_stats.has_badge("premier_signalement"));
    }

    #[test]
    fn test_critical_resolution_unlocks_crisis_manager() {
        let engine = RewardsEngine::standard().unwrap();
        let stats = engine.new_user("u", now());
        let outcome = engine
            .score(
                &stats,
                &Action::ResolveIncident { severity: Some(Severity::Critical), resolution_time: None },
                now(),
            )
            .unwrap();
        assert!(outcome.new_badges.iter().any(|b| b.id == "gestionnaire_de_crise"));
    }

    #[test]
    fn test_leveled_up() {
        let engine = RewardsEngine::standard().unwrap();
        let mut stats = engine.new_user("u", now());
        stats.xp = 90;
        let outcome = engine.score(&stats, &Action::CreateProcedure, now()).unwrap();
        assert!(outcome.leveled_up());
        assert_eq!(outcome.new_stats.level, 2);
    }

    #[test]
    fn test_level_info() {
        let engine = RewardsEngine::standard().unwrap();
        let mut stats = engine.new_user("u", now());
        stats.xp = 175;
        stats.level = 2;
        let info = engine.level_info(&stats);
        assert_eq!(info.level, 2);
        assert_eq!(info.name, "Débutant");
        assert_eq!(info.next_min_xp, Some(250));
        assert_eq!(info.xp_to_next, 75);
        assert_eq!(info.progress_percent, 50);
    }

    #[test]
    fn test_check_stats() {
        let engine = RewardsEngine::standard().unwrap();
        let mut stats = engine.new_user("u", now());
        assert!(engine.check_stats(&stats).is_ok());

        stats.xp = 500;
        assert!(matches!(engine.check_stats(&stats), Err(RewardsError::InvalidStats { .. })));
        stats.level = 4;
        assert!(engine.check_stats(&stats).is_ok());

        stats.current_streak = 3;
        assert!(engine.check_stats(&stats).is_err());
        stats.longest_streak = 3;
        stats.resolution_time_samples = 1;
        assert!(engine.check_stats(&stats).is_err());
        stats.incidents_resolved = 1;
        assert!(engine.check_stats(&stats).is_ok());
        stats.badges.insert("made_up".to_string());
        assert!(engine.check_stats(&stats).is_err());
    }

    #[test]
    fn test_invalid_config_fails_fast() {
        let mut config = RewardsConfig::default();
        config.xp.high_score_threshold = f64::NAN;
        assert!(matches!(RewardsEngine::new(&config), Err(RewardsError::Config(_))));
    }
}
