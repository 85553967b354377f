//! Composite rank
//!
//! A coarser classification than level. Points blend XP with owned badges
//! and the domain counters that represent finished work:
//!
//! ```text
//! points = xp
//!        + 100 * badges
//!        +  10 * incidents_resolved
//!        +  10 * maintenance_completed
//!        +  15 * quality_checks_completed
//!        +   5 * lost_items_returned
//!        +  20 * procedures_created
//! ```

use crate::error::{Result, RewardsError};
use crate::progression::UserStats;
use serde::{Deserialize, Serialize};

/// Name reported as `next_tier` once the top tier is reached
pub const MAX_TIER: &str = "Max";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tier {
    pub name: String,
    pub min_points: u64,
}

impl Tier {
    pub fn new(name: &str, min_points: u64) -> Self {
        Self { name: name.to_string(), min_points }
    }
}

pub fn default_tiers() -> Vec<Tier> {
    vec![
        Tier::new("Bronze", 0),
        Tier::new("Argent", 500),
        Tier::new("Or", 1500),
        Tier::new("Platine", 3500),
        Tier::new("Diamant", 7000),
        Tier::new("Maître", 12000),
    ]
}

/// Rank of one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankInfo {
    pub tier: String,
    pub points: u64,
    pub next_tier: String,
    pub points_to_next: u64,
}

impl RankInfo {
    pub fn is_max(&self) -> bool {
        self.next_tier == MAX_TIER
    }
}

pub fn rank_points(stats: &UserStats) -> u64 {
    let badges = stats.badges.len() as u64;
    stats
        .xp
        .saturating_add(badges.saturating_mul(100))
        .saturating_add(stats.incidents_resolved.saturating_mul(10))
        .saturating_add(stats.maintenance_completed.saturating_mul(10))
        .saturating_add(stats.quality_checks_completed.saturating_mul(15))
        .saturating_add(stats.lost_items_returned.saturating_mul(5))
        .saturating_add(stats.procedures_created.saturating_mul(20))
}

/// Tiers sorted by strictly ascending `min_points`, starting at 0
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierTable {
    tiers: Vec<Tier>,
}

impl TierTable {
    pub fn new(tiers: Vec<Tier>) -> Result<Self> {
        let first = tiers
            .first()
            .ok_or_else(|| RewardsError::TierTable("table is empty".to_string()))?;
        if first.min_points != 0 {
            return Err(RewardsError::TierTable(format!(
                "first tier '{}' must start at 0 points",
                first.name
            )));
        }
        for pair in tiers.windows(2) {
            if pair[1].min_points <= pair[0].min_points {
                return Err(RewardsError::TierTable(format!(
                    "tiers not sorted ascending: '{}' ({}) then '{}' ({})",
                    pair[0].name, pair[0].min_points, pair[1].name, pair[1].min_points
                )));
            }
        }
        Ok(Self { tiers })
    }

    pub fn standard() -> Result<Self> {
        Self::new(default_tiers())
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    /// Index of the highest tier whose `min_points <= points`
    fn position(&self, points: u64) -> usize {
        self.tiers
            .iter()
            .rposition(|t| t.min_points <= points)
            .unwrap_or(0)
    }

    pub fn rank_for_points(&self, points: u64) -> RankInfo {
        let idx = self.position(points);
        let tier = &self.tiers[idx];
        match self.tiers.get(idx + 1) {
            Some(next) => RankInfo {
                tier: tier.name.clone(),
                points,
                next_tier: next.name.clone(),
                points_to_next: next.min_points.saturating_sub(points),
            },
            None => RankInfo {
                tier: tier.name.clone(),
                points,
                next_tier: MAX_TIER.to_string(),
                points_to_next: 0,
            },
        }
    }

    pub fn rank_of(&self, stats: &UserStats) -> RankInfo {
        self.rank_for_points(rank_points(stats))
    }
}
