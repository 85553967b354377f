//! Weekly challenges.
//!
//! Challenges are not persisted. Each request instantiates the catalog
//! templates for the Sunday-to-Saturday week containing "now", so every
//! call inside one week yields the same ids and date windows.

use crate::action::Module;
use crate::calendar::Calendar;
use crate::error::{Result, RewardsError};
use crate::progression::{Counter, UserStats};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Catalog entry a weekly challenge is built from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeTemplate {
    pub id: String,
    pub title: String,
    pub description: String,
    pub xp_reward: u64,
    pub target: u64,
    /// Stat the progress is read from
    pub metric: Counter,
    #[serde(default)]
    pub module: Option<Module>,
}

impl ChallengeTemplate {
    fn new(
        id: &str,
        title: &str,
        description: &str,
        xp_reward: u64,
        target: u64,
        metric: Counter,
        module: Option<Module>,
    ) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            xp_reward,
            target,
            metric,
            module,
        }
    }
}

pub fn default_challenges() -> Vec<ChallengeTemplate> {
    vec![
        ChallengeTemplate::new("incidents", "Chasseur d'Incidents", "Résoudre 5 incidents",
            100, 5, Counter::IncidentsResolved, Some(Module::Incidents)),
        ChallengeTemplate::new("maintenance", "Main Verte", "Terminer 3 maintenances",
            75, 3, Counter::MaintenanceCompleted, Some(Module::Maintenance)),
        ChallengeTemplate::new("quality", "Excellence", "Obtenir 2 contrôles qualité au-dessus de 90",
            75, 2, Counter::QualityHighScores, Some(Module::Quality)),
        ChallengeTemplate::new("streak", "Assiduité", "Se connecter 5 jours de suite",
            50, 5, Counter::CurrentStreak, None),
        ChallengeTemplate::new("procedures", "Gardien des Règles", "Valider 3 procédures",
            60, 3, Counter::ProceduresValidated, Some(Module::Procedures)),
    ]
}

/// One challenge for a concrete week
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    /// `<template>-<week start>`
    pub id: String,
    pub template_id: String,
    pub title: String,
    pub description: String,
    pub xp_reward: u64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub target: u64,
    pub metric: Counter,
    pub module: Option<Module>,
}

impl Challenge {
    /// `min(100, floor(100 * value / target))`
    pub fn progress(&self, stats: &UserStats) -> u8 {
        if self.target == 0 {
            return 100;
        }
        let value = u128::from(stats.counter(self.metric));
        let pct = value * 100 / u128::from(self.target);
        pct.min(100) as u8
    }

    pub fn is_complete(&self, stats: &UserStats) -> bool {
        self.progress(stats) >= 100
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        day >= self.start_date && day <= self.end_date
    }
}

/// Challenges of the current week with per-challenge progress
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChallengeBoard {
    pub challenges: Vec<Challenge>,
    pub progress_by_id: BTreeMap<String, u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeCatalog {
    templates: Vec<ChallengeTemplate>,
}

impl ChallengeCatalog {
    pub fn new(templates: Vec<ChallengeTemplate>) -> Result<Self> {
        let mut seen = HashSet::new();
        for t in &templates {
            if !seen.insert(t.id.as_str()) {
                return Err(RewardsError::ChallengeCatalog(format!("duplicate challenge id '{}'", t.id)));
            }
            if t.target == 0 {
                return Err(RewardsError::ChallengeCatalog(format!(
                    "challenge '{}' must have a positive target",
                    t.id
                )));
            }
        }
        Ok(Self { templates })
    }

    pub fn standard() -> Result<Self> {
        Self::new(default_challenges())
    }

    pub fn templates(&self) -> &[ChallengeTemplate] {
        &self.templates
    }

    pub fn current_week(&self, calendar: &Calendar, now: DateTime<Utc>) -> Vec<Challenge> {
        let (start, end) = calendar.week_of(calendar.day_of(now));
        self.templates
            .iter()
            .map(|t| Challenge {
                id: format!("{}-{}", t.id, start.format("%Y-%m-%d")),
                template_id: t.id.clone(),
                title: t.title.clone(),
                description: t.description.clone(),
                xp_reward: t.xp_reward,
                start_date: start,
                end_date: end,
                target: t.target,
                metric: t.metric,
                module: t.module,
            })
            .collect()
    }

    pub fn board(&self, calendar: &Calendar, now: DateTime<Utc>, stats: &UserStats) -> ChallengeBoard {
        let challenges = self.current_week(calendar, now);
        let progress_by_id = challenges
            .iter()
            .map(|c| (c.id.clone(), c.progress(stats)))
            .collect();
        ChallengeBoard { challenges, progress_by_id }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_week_window_is_stable_within_week() {
        let catalog = ChallengeCatalog::standard().unwrap();
        let cal = Calendar::utc();
        // Sunday 18th through Saturday 24th
        let monday = catalog.current_week(&cal, at(19, 8));
        let saturday = catalog.current_week(&cal, at(24, 23));
        assert_eq!(monday, saturday);
        assert_eq!(monday[0].start_date, NaiveDate::from_ymd_opt(2026, 10, 18).unwrap());
        assert_eq!(monday[0].end_date, NaiveDate::from_ymd_opt(2026, 10, 24).unwrap());
        assert_eq!(monday[0].id, "incidents-2026-10-18");

        let next = catalog.current_week(&cal, at(25, 0));
        assert_ne!(next[0].start_date, monday[0].start_date);
    }

    #[test]
    fn test_sunday_starts_its_own_week() {
        let catalog = ChallengeCatalog::standard().unwrap();
        let week = catalog.current_week(&Calendar::utc(), at(18, 0));
        assert_eq!(week[0].start_date, NaiveDate::from_ymd_opt(2026, 10, 18).unwrap());
        assert!(week[0].contains(NaiveDate::from_ymd_opt(2026, 10, 24).unwrap()));
    }

    #[test]
    fn test_progress_is_floored_and_clamped() {
        let catalog = ChallengeCatalog::standard().unwrap();
        let week = catalog.current_week(&Calendar::utc(), at(20, 12));
        let incidents = &week[0];
        let mut stats = UserStats::new("u", at(20, 12));
        assert_eq!(incidents.progress(&stats), 0);
        stats.incidents_resolved = 2;
        assert_eq!(incidents.progress(&stats), 40);
        stats.incidents_resolved = 12;
        assert_eq!(incidents.progress(&stats), 100);
        assert!(incidents.is_complete(&stats));

        let maintenance = &week[1];
        stats.maintenance_completed = 1;
        assert_eq!(maintenance.progress(&stats), 33);
    }

    #[test]
    fn test_board_has_progress_for_every_challenge() {
        let catalog = ChallengeCatalog::standard().unwrap();
        let mut stats = UserStats::new("u", at(20, 12));
        stats.current_streak = 4;
        let board = catalog.board(&Calendar::utc(), at(20, 12), &stats);
        assert_eq!(board.challenges.len(), 5);
        assert_eq!(board.progress_by_id.len(), 5);
        assert_eq!(board.progress_by_id["streak-2026-10-18"], 80);
    }

    #[test]
    fn test_catalog_rejects_zero_target() {
        let mut templates = default_challenges();
        templates[0].target = 0;
        assert!(matches!(
            ChallengeCatalog::new(templates),
            Err(RewardsError::ChallengeCatalog(_))
        ));
    }
}
