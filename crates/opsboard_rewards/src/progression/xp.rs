//! Stats accumulator
//!
//! Folds one [`Action`] into a [`UserStats`] snapshot and reports the XP it
//! earned. The input snapshot is never modified: the caller gets a new one,
//! which keeps a rejected or failed update from leaving half-applied
//! counters behind.
//!
//! Running averages use the incremental mean
//! `new = (old * n_before + sample) / n_after`, where `n` is the counter the
//! average belongs to (resolved incidents, completed quality checks).

use super::levels::LevelTable;
use super::stats::UserStats;
use crate::action::Action;
use crate::calendar::{Calendar, DayRelation};
use crate::config::XpRewards;
use crate::error::Result;
use chrono::{DateTime, Utc};

/// Result of folding one action
#[derive(Debug, Clone, PartialEq)]
pub struct XpGain {
    pub stats: UserStats,
    pub xp_gained: u64,
}

/// Pure `(UserStats, Action) -> (UserStats', xp)` step
#[derive(Debug, Clone, Copy)]
pub struct Accumulator<'a> {
    rewards: &'a XpRewards,
    levels: &'a LevelTable,
    calendar: &'a Calendar,
}

impl<'a> Accumulator<'a> {
    pub fn new(rewards: &'a XpRewards, levels: &'a LevelTable, calendar: &'a Calendar) -> Self {
        Self { rewards, levels, calendar }
    }

    pub fn apply(&self, stats: &UserStats, action: &Action, now: DateTime<Utc>) -> Result<XpGain> {
        action.validate()?;

        let r = self.rewards;
        let mut next = stats.clone();

        let xp_gained = match action {
            Action::CreateIncident { severity } => {
                next.incidents_created += 1;
                r.create_incident_xp(severity.map_or(false, |s| s.is_critical()))
            }
            Action::ResolveIncident { severity, resolution_time } => {
                let before = next.incidents_resolved;
                next.incidents_resolved += 1;
                if let Some(hours) = resolution_time {
                    next.avg_resolution_time =
                        fold_mean(next.avg_resolution_time, before, *hours);
                    next.resolution_time_samples += 1;
                }
                if severity.map_or(false, |s| s.is_critical()) {
                    next.critical_incidents_resolved += 1;
                    r.resolve_critical_incident
                } else {
                    r.resolve_incident
                }
            }
            Action::CreateMaintenance => {
                next.maintenance_created += 1;
                r.create_maintenance
            }
            Action::CompleteMaintenance { before_schedule } => {
                next.maintenance_completed += 1;
                if *before_schedule {
                    next.maintenance_quick_completed += 1;
                    r.complete_maintenance + r.quick_maintenance_bonus
                } else {
                    r.complete_maintenance
                }
            }
            Action::CompleteQualityCheck { score } => {
                let before = next.quality_checks_completed;
                next.quality_checks_completed += 1;
                next.avg_quality_score = fold_mean(next.avg_quality_score, before, *score);
                if *score > r.high_score_threshold {
                    next.quality_high_scores += 1;
                    r.complete_quality_check + r.high_score_bonus
                } else {
                    r.complete_quality_check
                }
            }
            Action::RegisterLostItem => {
                next.lost_items_registered += 1;
                r.register_lost_item
            }
            Action::ReturnLostItem => {
                next.lost_items_returned += 1;
                r.return_lost_item
            }
            Action::CreateProcedure => {
                next.procedures_created += 1;
                r.create_procedure
            }
            Action::ReadProcedure => {
                next.procedures_read += 1;
                r.read_procedure
            }
            Action::ValidateProcedure => {
                next.procedures_validated += 1;
                r.validate_procedure
            }
            Action::Login => self.login(&mut next, now),
            Action::HelpColleague => {
                next.help_provided += 1;
                r.help_colleague
            }
            Action::ReceiveThanks => {
                next.thanks_received += 1;
                r.receive_thanks
            }
            Action::CompleteWeeklyGoal => {
                next.weekly_goals_completed += 1;
                r.complete_weekly_goal
            }
        };

        if let Some(module) = action.module() {
            *next.contributions_per_module.entry(module).or_insert(0) += 1;
        }

        next.xp = next.xp.saturating_add(xp_gained);
        next.level = self.levels.level_number(next.xp);
        next.last_updated = now;

        Ok(XpGain { stats: next, xp_gained })
    }

    /// Login counter and calendar-day streak.
    ///
    /// Every login counts toward `total_logins`; the streak only moves once
    /// per calendar day.
    fn login(&self, next: &mut UserStats, now: DateTime<Utc>) -> u64 {
        let today = self.calendar.day_of(now);
        next.total_logins += 1;

        let mut xp = self.rewards.login;
        match self.calendar.relation(next.last_login_date, today) {
            DayRelation::SameDay => {}
            DayRelation::Consecutive => {
                next.current_streak = next.current_streak.saturating_add(1);
                xp += self.rewards.streak_bonus;
            }
            DayRelation::Broken => next.current_streak = 1,
        }
        next.longest_streak = next.longest_streak.max(next.current_streak);
        next.last_login_date = Some(today);
        xp
    }
}

fn fold_mean(mean: f64, count_before: u64, sample: f64) -> f64 {
    let n = count_before as f64;
    (mean * n + sample) / (n + 1.0)
}
