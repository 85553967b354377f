//! Command handlers for opsboardctl.

use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use opsboard_rewards::badges::{format_badge_unlock, format_badges};
use opsboard_rewards::{
    ActionOutcome, ActionRequest, GamificationService, JsonDirRepository, ManualClock,
    RewardsConfig, RewardsEngine, RewardsError,
};
use owo_colors::OwoColorize;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const MAX_BADGE_ICONS: usize = 8;
const HR: &str = "------------------------------------------------------------";

/// Loaded config plus a service over the on-disk stats directory
pub struct Context {
    config: RewardsConfig,
    service: GamificationService<JsonDirRepository, ManualClock>,
    json: bool,
}

impl Context {
    pub fn open(config_path: Option<&Path>, data_dir: Option<PathBuf>, json: bool) -> Result<Self> {
        let mut config = RewardsConfig::load(config_path)?;
        if let Some(dir) = data_dir {
            config.store.data_dir = dir;
        }

        let engine = RewardsEngine::new(&config).map_err(engine_error)?;
        let repository = JsonDirRepository::open(&config.store.data_dir).with_context(|| {
            format!("Failed to open stats directory {}", config.store.data_dir.display())
        })?;
        let service = GamificationService::with_clock(engine, repository, ManualClock::new(Utc::now()));

        Ok(Self { config, service, json })
    }

    fn print_json<T: Serialize>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }
}

/// One line of a replay file
#[derive(Debug, Deserialize)]
struct ReplayEvent {
    user: String,
    #[serde(default)]
    at: Option<DateTime<Utc>>,
    action: ActionRequest,
}

/// Catalog errors are bugs in the shipped tables, not in the user's config
fn engine_error(e: RewardsError) -> anyhow::Error {
    if e.is_catalog_error() {
        anyhow::anyhow!("built-in catalog is invalid ({}): {}", e.code(), e)
    } else {
        anyhow::Error::new(e).context("invalid rewards configuration")
    }
}

fn parse_event(line: &str) -> Result<ReplayEvent> {
    Ok(serde_json::from_str(line)?)
}

/// Handle apply command
pub fn handle_apply(ctx: &Context, user: &str, action_json: &str) -> Result<()> {
    let request = ActionRequest::from_json(action_json)?;
    let outcome = ctx.service.apply_request(user, request)?;

    if ctx.json {
        return ctx.print_json(&outcome);
    }
    print_outcome(user, &outcome);
    Ok(())
}

#[derive(Debug, Default, Serialize)]
struct ReplaySummary {
    applied: usize,
    skipped: usize,
    xp_gained: u64,
    badges_unlocked: usize,
}

/// Handle replay command
pub fn handle_replay(ctx: &Context, file: &Path) -> Result<()> {
    let content = fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let mut summary = ReplaySummary::default();

    for (idx, line) in content.lines().enumerate() {
        let lineno = idx + 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let event = match parse_event(line) {
            Ok(event) => event,
            Err(e) => {
                warn!("line {}: skipping malformed event: {}", lineno, e);
                summary.skipped += 1;
                continue;
            }
        };

        ctx.service.clock().set(event.at.unwrap_or_else(Utc::now));
        match ctx.service.apply_request(&event.user, event.action) {
            Ok(outcome) => {
                summary.applied += 1;
                summary.xp_gained += outcome.xp_gained;
                summary.badges_unlocked += outcome.new_badges.len();
                if !ctx.json {
                    for badge in &outcome.new_badges {
                        println!("{} {}", event.user.bold(), format_badge_unlock(badge).bright_yellow());
                    }
                }
            }
            Err(e @ (RewardsError::MalformedAction { .. } | RewardsError::InvalidUserId)) => {
                warn!("line {}: skipping rejected action: {}", lineno, e);
                summary.skipped += 1;
            }
            Err(e) => return Err(anyhow::Error::new(e).context(format!("line {}", lineno))),
        }
    }

    info!(
        applied = summary.applied,
        skipped = summary.skipped,
        "replay of {} finished",
        file.display()
    );

    if ctx.json {
        return ctx.print_json(&summary);
    }
    println!("{}", HR.dimmed());
    println!(
        "{} applied, {} skipped, +{} XP, {} badges unlocked",
        summary.applied.to_string().bright_green(),
        summary.skipped.to_string().bright_red(),
        summary.xp_gained,
        summary.badges_unlocked
    );
    Ok(())
}

/// Handle stats command
pub fn handle_stats(ctx: &Context, user: &str) -> Result<()> {
    let stats = ctx.service.get_stats(user)?;
    if ctx.json {
        return ctx.print_json(&stats);
    }

    println!();
    println!("{}", format!("stats for {}", stats.user_id).bold());
    println!("{}", HR.dimmed());
    let kw = 28;
    print_kv("xp", &stats.xp.to_string(), kw);
    print_kv("level", &stats.level.to_string(), kw);
    print_kv("incidents created/resolved", &format!("{} / {}", stats.incidents_created, stats.incidents_resolved), kw);
    print_kv("critical incidents resolved", &stats.critical_incidents_resolved.to_string(), kw);
    print_kv("avg resolution time (h)", &format!("{:.2}", stats.avg_resolution_time), kw);
    print_kv("maintenance created/done", &format!("{} / {}", stats.maintenance_created, stats.maintenance_completed), kw);
    print_kv("maintenance ahead of time", &stats.maintenance_quick_completed.to_string(), kw);
    print_kv("quality checks", &stats.quality_checks_completed.to_string(), kw);
    print_kv("avg quality score", &format!("{:.1}", stats.avg_quality_score), kw);
    print_kv("lost items reg/returned", &format!("{} / {}", stats.lost_items_registered, stats.lost_items_returned), kw);
    print_kv(
        "procedures c/r/v",
        &format!("{} / {} / {}", stats.procedures_created, stats.procedures_read, stats.procedures_validated),
        kw,
    );
    print_kv("logins", &stats.total_logins.to_string(), kw);
    print_kv("streak (current/longest)", &format!("{} / {}", stats.current_streak, stats.longest_streak), kw);
    print_kv("badges", &stats.badges.len().to_string(), kw);
    println!();
    Ok(())
}

/// Handle level command
pub fn handle_level(ctx: &Context, user: &str) -> Result<()> {
    let info = ctx.service.get_level(user)?;
    if ctx.json {
        return ctx.print_json(&info);
    }

    let (r, g, b) = hex_rgb(&info.color);
    println!(
        "{} {} {}",
        info.icon,
        info.name.truecolor(r, g, b).bold(),
        format!("(level {})", info.level).dimmed()
    );
    match info.next_min_xp {
        Some(next) => println!(
            "{} {} XP  [{}] {}%  ({} XP to go)",
            progress_bar(info.progress_percent, 20),
            info.xp,
            next,
            info.progress_percent,
            info.xp_to_next
        ),
        None => println!("{} {} XP  (max level)", progress_bar(100, 20), info.xp),
    }
    Ok(())
}

/// Handle rank command
pub fn handle_rank(ctx: &Context, user: &str) -> Result<()> {
    let rank = ctx.service.get_rank(user)?;
    if ctx.json {
        return ctx.print_json(&rank);
    }

    println!("{} {} points", rank.tier.bold().bright_cyan(), rank.points);
    if rank.is_max() {
        println!("{}", "top tier reached".dimmed());
    } else {
        println!("{} points to {}", rank.points_to_next, rank.next_tier);
    }
    Ok(())
}

/// Handle badges command
pub fn handle_badges(ctx: &Context, user: &str) -> Result<()> {
    let views = ctx.service.get_badges(user)?;
    if ctx.json {
        return ctx.print_json(&views);
    }

    let owned = views.iter().filter(|v| v.unlocked).count();
    println!(
        "{} {}/{}  {}",
        "badges".bold(),
        owned,
        views.len(),
        format_badges(&views, MAX_BADGE_ICONS)
    );
    println!("{}", HR.dimmed());
    for view in &views {
        let badge = &view.badge;
        let line = format!("{:<7} {:<24} {:<7} {}", badge.icon, badge.name, tier_label(badge.tier), badge.description);
        if view.unlocked {
            println!("{} {}", "[x]".bright_green(), line);
        } else {
            println!("{} {}", "[ ]".dimmed(), line.dimmed());
        }
    }
    Ok(())
}

/// Handle challenges command
pub fn handle_challenges(ctx: &Context, user: &str) -> Result<()> {
    let board = ctx.service.get_challenges(user)?;
    if ctx.json {
        return ctx.print_json(&board);
    }

    if let Some(first) = board.challenges.first() {
        println!("{} {} .. {}", "week".bold(), first.start_date, first.end_date);
        println!("{}", HR.dimmed());
    }
    for challenge in &board.challenges {
        let pct = board.progress_by_id.get(&challenge.id).copied().unwrap_or(0);
        let mark = if pct >= 100 {
            "[x]".bright_green().to_string()
        } else {
            "[ ]".dimmed().to_string()
        };
        println!(
            "{} {:<22} {} {:>3}%  +{} XP  {}",
            mark,
            challenge.title,
            progress_bar(pct, 10),
            pct,
            challenge.xp_reward,
            challenge.description.dimmed()
        );
    }
    Ok(())
}

/// Handle leaderboard command
pub fn handle_leaderboard(ctx: &Context, limit: usize) -> Result<()> {
    let rows = ctx.service.leaderboard(limit)?;
    if ctx.json {
        return ctx.print_json(&rows);
    }

    if rows.is_empty() {
        println!("{}", "no users yet".dimmed());
        return Ok(());
    }
    for (pos, row) in rows.iter().enumerate() {
        println!(
            "{:>3}. {:<24} {:<9} {:>7} pts  lvl {}",
            pos + 1,
            row.user_id,
            row.rank.tier,
            row.rank.points,
            row.level
        );
    }
    Ok(())
}

/// Handle levels command
pub fn handle_levels(ctx: &Context) -> Result<()> {
    let levels = ctx.service.engine().levels().levels();
    if ctx.json {
        return ctx.print_json(&levels);
    }

    for level in levels {
        let (r, g, b) = hex_rgb(&level.color);
        let range = match level.max_xp {
            Some(max) => format!("{} - {}", level.min_xp, max),
            None => format!("{}+", level.min_xp),
        };
        println!(
            "{:>2} {:<5} {:<14} {}",
            level.level,
            level.icon,
            level.name.truecolor(r, g, b),
            range.dimmed()
        );
    }
    Ok(())
}

/// Handle config command
pub fn handle_config(ctx: &Context) -> Result<()> {
    if ctx.json {
        return ctx.print_json(&ctx.config);
    }
    print!("{}", ctx.config.to_toml_string()?);
    Ok(())
}

fn print_outcome(user: &str, outcome: &ActionOutcome) {
    println!(
        "{} {} XP  (total {})",
        user.bold(),
        format!("+{}", outcome.xp_gained).bright_green(),
        outcome.new_stats.xp
    );
    if outcome.leveled_up() {
        println!(
            "{} level {} -> {}",
            "[LEVEL UP]".bright_magenta().bold(),
            outcome.previous_level,
            outcome.new_stats.level
        );
    }
    for badge in &outcome.new_badges {
        println!("{}", format_badge_unlock(badge).bright_yellow());
    }
}

fn print_kv(key: &str, value: &str, width: usize) {
    println!("{:width$} {}", key.dimmed(), value, width = width);
}

fn tier_label(tier: opsboard_rewards::BadgeTier) -> &'static str {
    match tier {
        opsboard_rewards::BadgeTier::Bronze => "bronze",
        opsboard_rewards::BadgeTier::Silver => "silver",
        opsboard_rewards::BadgeTier::Gold => "gold",
    }
}

fn progress_bar(percent: u8, width: usize) -> String {
    let filled = (usize::from(percent.min(100)) * width) / 100;
    format!("[{}{}]", "#".repeat(filled), ".".repeat(width - filled))
}

/// `#RRGGBB` to rgb, grey when unparsable
fn hex_rgb(color: &str) -> (u8, u8, u8) {
    let hex = color.trim_start_matches('#');
    let channel = |i: usize| hex.get(i..i + 2).and_then(|s| u8::from_str_radix(s, 16).ok());
    match (hex.len(), channel(0), channel(2), channel(4)) {
        (6, Some(r), Some(g), Some(b)) => (r, g, b),
        _ => (158, 158, 158),
    }
}
