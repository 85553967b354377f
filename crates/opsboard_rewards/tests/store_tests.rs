//! Persistence tests: service state survives a restart on disk.

use chrono::{Duration, TimeZone, Utc};
use opsboard_rewards::{
    Action, GamificationService, JsonDirRepository, ManualClock, RewardsEngine, RewardsError,
    StatsRepository, UserStats,
};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn open(dir: &Path) -> GamificationService<JsonDirRepository, ManualClock> {
    let start = Utc.with_ymd_and_hms(2026, 10, 21, 10, 0, 0).unwrap();
    GamificationService::with_clock(
        RewardsEngine::standard().unwrap(),
        JsonDirRepository::open(dir).unwrap(),
        ManualClock::new(start),
    )
}

#[test]
fn test_stats_survive_restart() {
    let dir = tempdir().unwrap();
    let before = {
        let svc = open(dir.path());
        svc.apply_action("reception", Action::ReturnLostItem).unwrap();
        svc.apply_action("reception", Action::CompleteQualityCheck { score: 95.0 })
            .unwrap()
            .new_stats
    };

    let svc = open(dir.path());
    let after = svc.get_stats("reception").unwrap();
    assert_eq!(after, before);
    // no second first-contact login
    assert_eq!(after.total_logins, 1);
    assert!(after.has_badge("bon_samaritain"));
}

#[test]
fn test_streak_continues_after_restart() {
    let dir = tempdir().unwrap();
    {
        let svc = open(dir.path());
        svc.get_stats("nuit").unwrap();
    }
    let svc = open(dir.path());
    svc.clock().advance(Duration::days(1));
    let stats = svc.apply_action("nuit", Action::Login).unwrap().new_stats;
    assert_eq!(stats.current_streak, 2);
}

#[test]
fn test_leaderboard_includes_users_not_in_cache() {
    let dir = tempdir().unwrap();
    {
        let svc = open(dir.path());
        svc.apply_action("gouvernante", Action::CreateProcedure).unwrap();
        svc.apply_action("bagagiste", Action::Login).unwrap();
    }
    let svc = open(dir.path());
    let board = svc.leaderboard(10).unwrap();
    let ids: Vec<_> = board.iter().map(|e| e.user_id.as_str()).collect();
    assert_eq!(ids, vec!["gouvernante", "bagagiste"]);
}

#[test]
fn test_tampered_record_is_rejected() {
    let dir = tempdir().unwrap();
    let repo = JsonDirRepository::open(dir.path()).unwrap();
    let mut stats = UserStats::new("triche", Utc::now());
    stats.xp = 5000;
    stats.level = 1;
    repo.save(&stats).unwrap();

    let svc = open(dir.path());
    let err = svc.get_stats("triche").unwrap_err();
    assert!(matches!(err, RewardsError::InvalidStats { .. }));
    assert_eq!(err.code(), -32020);
}

#[test]
fn test_record_under_wrong_name_is_rejected() {
    let dir = tempdir().unwrap();
    let repo = JsonDirRepository::open(dir.path()).unwrap();
    repo.save(&UserStats::new("alice", Utc::now())).unwrap();

    let alice = dir.path().join(format!("{}.json", hex::encode("alice")));
    let mallory = dir.path().join(format!("{}.json", hex::encode("mallory")));
    fs::copy(alice, mallory).unwrap();

    let svc = open(dir.path());
    assert!(matches!(
        svc.get_stats("mallory"),
        Err(RewardsError::InvalidStats { .. })
    ));
}
