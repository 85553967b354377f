//! Gamification service
//!
//! The only stateful component. It owns the engine, a repository and a
//! clock, and keeps one cached `UserStats` per user behind that user's own
//! mutex: actions for the same user are serialised, actions for different
//! users never wait on each other. The user map itself is only write-locked
//! to insert an empty slot; loading and first-contact initialisation happen
//! under the per-user lock.
//!
//! An update is computed on a copy, persisted, and only then published in
//! the cache, so a rejected action or a failed save leaves the previous
//! snapshot in place.

use crate::action::{Action, ActionRequest};
use crate::badges::BadgeView;
use crate::challenges::ChallengeBoard;
use crate::engine::{ActionOutcome, LevelInfo, RewardsEngine};
use crate::error::{Result, RewardsError};
use crate::progression::UserStats;
use crate::rank::{rank_points, RankInfo};
use crate::store::StatsRepository;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, info, warn};

/// Source of "now"
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to (tests, log replay)
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(start) }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = at;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// One row of the leaderboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub level: u32,
    pub rank: RankInfo,
}

type Slot = Arc<Mutex<Option<UserStats>>>;

pub struct GamificationService<R: StatsRepository, C: Clock = SystemClock> {
    engine: RewardsEngine,
    repository: R,
    clock: C,
    users: RwLock<HashMap<String, Slot>>,
}

impl<R: StatsRepository> GamificationService<R, SystemClock> {
    pub fn new(engine: RewardsEngine, repository: R) -> Self {
        Self::with_clock(engine, repository, SystemClock)
    }
}

impl<R: StatsRepository, C: Clock> GamificationService<R, C> {
    pub fn with_clock(engine: RewardsEngine, repository: R, clock: C) -> Self {
        Self {
            engine,
            repository,
            clock,
            users: RwLock::new(HashMap::new()),
        }
    }

    pub fn engine(&self) -> &RewardsEngine {
        &self.engine
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Score one action for a user
    pub fn apply_action(&self, user_id: &str, action: Action) -> Result<ActionOutcome> {
        check_user_id(user_id)?;
        if let Err(e) = action.validate() {
            warn!(user = user_id, kind = %action.kind(), "rejected action: {}", e);
            return Err(e);
        }

        let slot = self.slot(user_id);
        let mut guard = slot.lock().unwrap_or_else(|e| e.into_inner());
        let current = self.ensure_loaded(user_id, &mut guard)?;

        let outcome = self.engine.score(current, &action, self.clock.now())?;
        self.repository.save(&outcome.new_stats)?;
        *current = outcome.new_stats.clone();

        debug!(
            user = user_id,
            kind = %action.kind(),
            xp_gained = outcome.xp_gained,
            xp = outcome.new_stats.xp,
            "applied action"
        );
        if outcome.leveled_up() {
            info!(user = user_id, level = outcome.new_stats.level, "level up");
        }
        for badge in &outcome.new_badges {
            info!(user = user_id, badge = %badge.id, "badge unlocked");
        }

        Ok(outcome)
    }

    /// Validate a host request, then score it
    pub fn apply_request(&self, user_id: &str, request: ActionRequest) -> Result<ActionOutcome> {
        let action = Action::try_from(request).map_err(|e| {
            warn!(user = user_id, "rejected action request: {}", e);
            e
        })?;
        self.apply_action(user_id, action)
    }

    pub fn get_stats(&self, user_id: &str) -> Result<UserStats> {
        self.read_user(user_id, |stats| stats.clone())
    }

    pub fn get_badges(&self, user_id: &str) -> Result<Vec<BadgeView>> {
        self.read_user(user_id, |stats| self.engine.visible_badges(stats))
    }

    pub fn get_level(&self, user_id: &str) -> Result<LevelInfo> {
        self.read_user(user_id, |stats| self.engine.level_info(stats))
    }

    pub fn get_rank(&self, user_id: &str) -> Result<RankInfo> {
        self.read_user(user_id, |stats| self.engine.rank(stats))
    }

    pub fn get_challenges(&self, user_id: &str) -> Result<ChallengeBoard> {
        let now = self.clock.now();
        self.read_user(user_id, |stats| self.engine.challenges(stats, now))
    }

    /// Install a snapshot the host loaded from durable storage.
    ///
    /// The snapshot may not be older than the cached or stored record: XP
    /// and the badge set never shrink.
    pub fn hydrate(&self, stats: UserStats) -> Result<()> {
        self.engine.check_stats(&stats)?;
        let slot = self.slot(&stats.user_id);
        let mut guard = slot.lock().unwrap_or_else(|e| e.into_inner());

        let stored;
        let current = match guard.as_ref() {
            Some(cached) => Some(cached),
            None => {
                stored = self.repository.load(&stats.user_id)?;
                stored.as_ref()
            }
        };
        if let Some(current) = current {
            if let Err(e) = check_not_rolled_back(current, &stats) {
                warn!(user = %stats.user_id, "rejected stale snapshot: {}", e);
                return Err(e);
            }
        }

        debug!(user = %stats.user_id, xp = stats.xp, "hydrated stats");
        *guard = Some(stats);
        Ok(())
    }

    /// Users ranked by composite points, highest first
    pub fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>> {
        let mut everyone: BTreeMap<String, UserStats> = self
            .repository
            .load_all()?
            .into_iter()
            .map(|s| (s.user_id.clone(), s))
            .collect();

        let slots: Vec<Slot> = self
            .users
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect();
        for slot in slots {
            let guard = slot.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(stats) = guard.as_ref() {
                everyone.insert(stats.user_id.clone(), stats.clone());
            }
        }

        let mut rows: Vec<(u64, LeaderboardEntry)> = everyone
            .into_values()
            .map(|stats| {
                let entry = LeaderboardEntry {
                    user_id: stats.user_id.clone(),
                    level: stats.level,
                    rank: self.engine.rank(&stats),
                };
                (rank_points(&stats), entry)
            })
            .collect();
        rows.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.user_id.cmp(&b.1.user_id)));

        Ok(rows.into_iter().take(limit).map(|(_, entry)| entry).collect())
    }

    fn read_user<T>(&self, user_id: &str, f: impl FnOnce(&UserStats) -> T) -> Result<T> {
        check_user_id(user_id)?;
        let slot = self.slot(user_id);
        let mut guard = slot.lock().unwrap_or_else(|e| e.into_inner());
        let stats = self.ensure_loaded(user_id, &mut guard)?;
        Ok(f(stats))
    }

    fn slot(&self, user_id: &str) -> Slot {
        if let Some(slot) = self.users.read().unwrap_or_else(|e| e.into_inner()).get(user_id) {
            return Arc::clone(slot);
        }
        let mut users = self.users.write().unwrap_or_else(|e| e.into_inner());
        Arc::clone(users.entry(user_id.to_string()).or_default())
    }

    /// Cached snapshot, loading it or initialising a first-contact user
    fn ensure_loaded<'a>(
        &self,
        user_id: &str,
        slot: &'a mut Option<UserStats>,
    ) -> Result<&'a mut UserStats> {
        let stats = match slot.take() {
            Some(stats) => stats,
            None => match self.repository.load(user_id)? {
                Some(stored) => {
                    if stored.user_id != user_id {
                        return Err(RewardsError::InvalidStats {
                            user_id: user_id.to_string(),
                            reason: format!("stored record belongs to '{}'", stored.user_id),
                        });
                    }
                    self.engine.check_stats(&stored)?;
                    stored
                }
                None => self.first_contact(user_id)?,
            },
        };
        Ok(slot.insert(stats))
    }

    /// Zero-valued record with one implicit login
    fn first_contact(&self, user_id: &str) -> Result<UserStats> {
        let now = self.clock.now();
        let fresh = self.engine.new_user(user_id, now);
        let outcome = self.engine.score(&fresh, &Action::Login, now)?;
        self.repository.save(&outcome.new_stats)?;
        info!(user = user_id, "initialised stats on first contact");
        Ok(outcome.new_stats)
    }
}

/// `incoming` must carry at least the XP and every badge of `current`
fn check_not_rolled_back(current: &UserStats, incoming: &UserStats) -> Result<()> {
    let invalid = |reason: String| RewardsError::InvalidStats {
        user_id: incoming.user_id.clone(),
        reason,
    };
    if incoming.xp < current.xp {
        return Err(invalid(format!(
            "xp {} is below the current {}",
            incoming.xp, current.xp
        )));
    }
    if let Some(lost) = current.badges.difference(&incoming.badges).next() {
        return Err(invalid(format!("snapshot drops owned badge '{}'", lost)));
    }
    Ok(())
}

fn check_user_id(user_id: &str) -> Result<()> {
    if user_id.trim().is_empty() {
        return Err(RewardsError::InvalidUserId);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryRepository;
    use chrono::TimeZone;

    fn service() -> GamificationService<MemoryRepository, ManualClock> {
        let start = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();
        GamificationService::with_clock(
            RewardsEngine::standard().unwrap(),
            MemoryRepository::new(),
            ManualClock::new(start),
        )
    }

    #[test]
    fn test_first_contact_applies_implicit_login() {
        let svc = service();
        let stats = svc.get_stats("alice").unwrap();
        assert_eq!(stats.total_logins, 1);
        assert_eq!(stats.current_streak, 1);
        assert_eq!(stats.xp, 5);
        assert!(svc.repository().load("alice").unwrap().is_some());

        // second read does not log in again
        assert_eq!(svc.get_stats("alice").unwrap().total_logins, 1);
    }

    #[test]
    fn test_empty_user_id_rejected() {
        let svc = service();
        assert!(matches!(svc.get_rank(" "), Err(RewardsError::InvalidUserId)));
        assert!(svc.apply_action("", Action::Login).is_err());
    }

    #[test]
    fn test_malformed_action_leaves_stats_unchanged() {
        let svc = service();
        let before = svc.get_stats("bob").unwrap();
        let err = svc
            .apply_action("bob", Action::CompleteQualityCheck { score: 250.0 })
            .unwrap_err();
        assert!(matches!(err, RewardsError::MalformedAction { .. }));
        assert_eq!(svc.get_stats("bob").unwrap(), before);
    }

    #[test]
    fn test_malformed_action_does_not_create_user() {
        let svc = service();
        let req = ActionRequest::new(crate::action::ActionKind::CompleteQualityCheck);
        assert!(svc.apply_request("ghost", req).is_err());
        assert!(svc.repository().load("ghost").unwrap().is_none());
    }

    #[test]
    fn test_manual_clock_moves_streak() {
        let svc = service();
        svc.get_stats("carol").unwrap();
        svc.clock().advance(Duration::days(1));
        let outcome = svc.apply_action("carol", Action::Login).unwrap();
        assert_eq!(outcome.new_stats.current_streak, 2);
        assert_eq!(outcome.xp_gained, 10);
    }

    #[test]
    fn test_hydrate_rejects_inconsistent_snapshot() {
        let svc = service();
        let mut stats = UserStats::new("dan", svc.clock().now());
        stats.xp = 300;
        stats.level = 1;
        assert!(svc.hydrate(stats.clone()).is_err());
        stats.level = 3;
        svc.hydrate(stats).unwrap();
        assert_eq!(svc.get_level("dan").unwrap().name, "Apprenti");
    }

    #[test]
    fn test_hydrate_rejects_stale_snapshot() {
        let svc = service();
        let stale = svc.get_stats("erin").unwrap();
        let outcome = svc
            .apply_action(
                "erin",
                Action::ResolveIncident {
                    severity: Some(crate::action::Severity::Critical),
                    resolution_time: None,
                },
            )
            .unwrap();
        let current = outcome.new_stats;
        assert!(current.has_badge("gestionnaire_de_crise"));

        let err = svc.hydrate(stale).unwrap_err();
        assert!(matches!(err, RewardsError::InvalidStats { .. }));
        assert_eq!(svc.get_stats("erin").unwrap(), current);
        assert_eq!(svc.repository().load("erin").unwrap().unwrap(), current);

        // same xp but a badge missing
        let mut stripped = current.clone();
        stripped.badges.clear();
        assert!(svc.hydrate(stripped).is_err());

        // a newer snapshot is accepted
        let mut newer = current.clone();
        newer.xp += 10;
        newer.level = svc.engine().levels().level_number(newer.xp);
        svc.hydrate(newer.clone()).unwrap();
        assert_eq!(svc.get_stats("erin").unwrap().xp, newer.xp);
    }

    #[test]
    fn test_hydrate_checks_repository_when_not_cached() {
        let repo = MemoryRepository::new();
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();
        let mut stored = UserStats::new("fay", now);
        stored.xp = 120;
        stored.level = 2;
        repo.save(&stored).unwrap();

        let svc = GamificationService::with_clock(
            RewardsEngine::standard().unwrap(),
            repo,
            ManualClock::new(now),
        );
        assert!(svc.hydrate(UserStats::new("fay", now)).is_err());
        assert_eq!(svc.get_stats("fay").unwrap().xp, 120);
    }
}
