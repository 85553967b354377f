//! Per-user statistics snapshot
//!
//! `UserStats` is the only persisted gamification record. Counters only
//! grow, averages are folded in incrementally, and `level` is a cached
//! projection of `xp` that the accumulator rewrites after every action.

use crate::action::Module;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Everything the engine knows about one user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserStats {
    pub user_id: String,

    /// Total XP, never decreases
    pub xp: u64,
    /// Derived from `xp` via the level table
    pub level: u32,
    /// Unlocked badge ids, append-only
    pub badges: BTreeSet<String>,

    pub incidents_created: u64,
    pub incidents_resolved: u64,
    pub critical_incidents_resolved: u64,
    pub maintenance_created: u64,
    pub maintenance_completed: u64,
    pub maintenance_quick_completed: u64,
    pub quality_checks_completed: u64,
    pub quality_high_scores: u64,
    pub lost_items_registered: u64,
    pub lost_items_returned: u64,
    pub procedures_created: u64,
    pub procedures_read: u64,
    pub procedures_validated: u64,
    pub total_logins: u64,
    pub help_provided: u64,
    pub thanks_received: u64,
    pub weekly_goals_completed: u64,

    /// Running mean, hours
    pub avg_resolution_time: f64,
    /// Resolutions that reported a resolution time
    pub resolution_time_samples: u64,
    /// Running mean, 0-100
    pub avg_quality_score: f64,

    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_login_date: Option<NaiveDate>,

    pub contributions_per_module: BTreeMap<Module, u64>,

    pub last_updated: DateTime<Utc>,
}

impl UserStats {
    /// Zero-valued record at level 1
    pub fn new(user_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            level: 1,
            last_updated: now,
            ..Default::default()
        }
    }

    pub fn counter(&self, counter: Counter) -> u64 {
        match counter {
            Counter::Xp => self.xp,
            Counter::Level => u64::from(self.level),
            Counter::IncidentsCreated => self.incidents_created,
            Counter::IncidentsResolved => self.incidents_resolved,
            Counter::CriticalIncidentsResolved => self.critical_incidents_resolved,
            Counter::MaintenanceCreated => self.maintenance_created,
            Counter::MaintenanceCompleted => self.maintenance_completed,
            Counter::MaintenanceQuickCompleted => self.maintenance_quick_completed,
            Counter::QualityChecksCompleted => self.quality_checks_completed,
            Counter::QualityHighScores => self.quality_high_scores,
            Counter::LostItemsRegistered => self.lost_items_registered,
            Counter::LostItemsReturned => self.lost_items_returned,
            Counter::ProceduresCreated => self.procedures_created,
            Counter::ProceduresRead => self.procedures_read,
            Counter::ProceduresValidated => self.procedures_validated,
            Counter::TotalLogins => self.total_logins,
            Counter::CurrentStreak => u64::from(self.current_streak),
            Counter::LongestStreak => u64::from(self.longest_streak),
            Counter::HelpProvided => self.help_provided,
            Counter::ThanksReceived => self.thanks_received,
            Counter::WeeklyGoalsCompleted => self.weekly_goals_completed,
        }
    }

    pub fn average(&self, average: Average) -> f64 {
        match average {
            Average::ResolutionTime => self.avg_resolution_time,
            Average::QualityScore => self.avg_quality_score,
        }
    }

    /// Number of samples folded into an average
    pub fn average_samples(&self, average: Average) -> u64 {
        match average {
            Average::ResolutionTime => self.resolution_time_samples,
            Average::QualityScore => self.quality_checks_completed,
        }
    }

    pub fn contributions(&self, module: Module) -> u64 {
        self.contributions_per_module.get(&module).copied().unwrap_or(0)
    }

    pub fn has_badge(&self, id: &str) -> bool {
        self.badges.contains(id)
    }
}

/// Named counter of [`UserStats`], used by badge conditions and challenges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Counter {
    Xp,
    Level,
    IncidentsCreated,
    IncidentsResolved,
    CriticalIncidentsResolved,
    MaintenanceCreated,
    MaintenanceCompleted,
    MaintenanceQuickCompleted,
    QualityChecksCompleted,
    QualityHighScores,
    LostItemsRegistered,
    LostItemsReturned,
    ProceduresCreated,
    ProceduresRead,
    ProceduresValidated,
    TotalLogins,
    CurrentStreak,
    LongestStreak,
    HelpProvided,
    ThanksReceived,
    WeeklyGoalsCompleted,
}

/// Running averages of [`UserStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Average {
    ResolutionTime,
    QualityScore,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_stats_are_zeroed() {
        let stats = UserStats::new("alice", Utc::now());
        assert_eq!(stats.user_id, "alice");
        assert_eq!(stats.xp, 0);
        assert_eq!(stats.level, 1);
        assert!(stats.badges.is_empty());
        assert_eq!(stats.contributions(Module::Quality), 0);
        assert!(stats.last_login_date.is_none());
    }

    #[test]
    fn test_counter_accessors() {
        let mut stats = UserStats::new("bob", Utc::now());
        stats.incidents_resolved = 4;
        stats.resolution_time_samples = 3;
        stats.quality_checks_completed = 2;
        stats.longest_streak = 9;
        assert_eq!(stats.counter(Counter::IncidentsResolved), 4);
        assert_eq!(stats.counter(Counter::LongestStreak), 9);
        assert_eq!(stats.average_samples(Average::ResolutionTime), 3);
        assert_eq!(stats.average_samples(Average::QualityScore), 2);
    }

    #[test]
    fn test_serialization_tolerates_missing_fields() {
        let parsed: UserStats =
            serde_json::from_str(r#"{"user_id":"carol","xp":120,"level":2}"#).unwrap();
        assert_eq!(parsed.user_id, "carol");
        assert_eq!(parsed.xp, 120);
        assert_eq!(parsed.total_logins, 0);
    }

    #[test]
    fn test_module_map_serializes_with_string_keys() {
        let mut stats = UserStats::new("dan", Utc::now());
        stats.contributions_per_module.insert(Module::LostFound, 3);
        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains(r#""lost_found":3"#));
        let back: UserStats = serde_json::from_str(&json).unwrap();
        assert_eq!(back.contributions(Module::LostFound), 3);
    }
}
