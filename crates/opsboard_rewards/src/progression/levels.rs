//! Level table
//!
//! Ten named XP bands. A level is never stored independently of XP: it is
//! always looked up from the table, so the table must be contiguous and
//! sorted, which [`LevelTable::new`] checks once at construction.
//!
//! | Level | Name          | XP            |
//! |-------|---------------|---------------|
//! | 1     | Stagiaire     | 0 - 99        |
//! | 2     | Débutant      | 100 - 249     |
//! | 3     | Apprenti      | 250 - 499     |
//! | 4     | Confirmé      | 500 - 999     |
//! | 5     | Expérimenté   | 1000 - 1999   |
//! | 6     | Expert        | 2000 - 3499   |
//! | 7     | Maître        | 3500 - 5499   |
//! | 8     | Grand Maître  | 5500 - 7999   |
//! | 9     | Champion      | 8000 - 11999  |
//! | 10    | Légende       | 12000+        |

use crate::error::{Result, RewardsError};
use serde::{Deserialize, Serialize};

/// One XP band
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelDef {
    pub level: u32,
    pub name: String,
    pub min_xp: u64,
    /// Inclusive upper bound; `None` only for the top level
    pub max_xp: Option<u64>,
    pub color: String,
    /// ASCII glyph
    pub icon: String,
}

impl LevelDef {
    pub fn new(level: u32, name: &str, min_xp: u64, max_xp: Option<u64>, color: &str, icon: &str) -> Self {
        Self {
            level,
            name: name.to_string(),
            min_xp,
            max_xp,
            color: color.to_string(),
            icon: icon.to_string(),
        }
    }

    pub fn contains(&self, xp: u64) -> bool {
        xp >= self.min_xp && self.max_xp.map_or(true, |max| xp <= max)
    }
}

/// Default level bands
pub fn default_levels() -> Vec<LevelDef> {
    vec![
        LevelDef::new(1, "Stagiaire", 0, Some(99), "#9E9E9E", "[.]"),
        LevelDef::new(2, "Débutant", 100, Some(249), "#8BC34A", "[:]"),
        LevelDef::new(3, "Apprenti", 250, Some(499), "#4CAF50", "[+]"),
        LevelDef::new(4, "Confirmé", 500, Some(999), "#03A9F4", "[=]"),
        LevelDef::new(5, "Expérimenté", 1000, Some(1999), "#3F51B5", "[*]"),
        LevelDef::new(6, "Expert", 2000, Some(3499), "#9C27B0", "<*>"),
        LevelDef::new(7, "Maître", 3500, Some(5499), "#FF9800", "<**>"),
        LevelDef::new(8, "Grand Maître", 5500, Some(7999), "#FF5722", "{**}"),
        LevelDef::new(9, "Champion", 8000, Some(11999), "#F44336", "{***}"),
        LevelDef::new(10, "Légende", 12000, None, "#FFD700", "~***~"),
    ]
}

/// Validated, contiguous level table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelTable {
    levels: Vec<LevelDef>,
}

impl LevelTable {
    pub fn new(levels: Vec<LevelDef>) -> Result<Self> {
        let first = levels
            .first()
            .ok_or_else(|| RewardsError::LevelTable("table is empty".to_string()))?;
        if first.min_xp != 0 {
            return Err(RewardsError::LevelTable(format!(
                "first level '{}' must start at 0 XP, starts at {}",
                first.name, first.min_xp
            )));
        }

        for pair in levels.windows(2) {
            let (lower, upper) = (&pair[0], &pair[1]);
            if upper.level <= lower.level {
                return Err(RewardsError::LevelTable(format!(
                    "level numbers must increase: {} then {}",
                    lower.level, upper.level
                )));
            }
            let max = lower.max_xp.ok_or_else(|| {
                RewardsError::LevelTable(format!(
                    "only the top level may be unbounded, level {} is not the top",
                    lower.level
                ))
            })?;
            if max < lower.min_xp {
                return Err(RewardsError::LevelTable(format!(
                    "level {} has max_xp {} below min_xp {}",
                    lower.level, max, lower.min_xp
                )));
            }
            if max.checked_add(1) != Some(upper.min_xp) {
                return Err(RewardsError::LevelTable(format!(
                    "gap or overlap between level {} (max {}) and level {} (min {})",
                    lower.level, max, upper.level, upper.min_xp
                )));
            }
        }

        if let Some(top) = levels.last() {
            if top.max_xp.is_some() {
                return Err(RewardsError::LevelTable(format!(
                    "top level {} must be unbounded",
                    top.level
                )));
            }
        }

        Ok(Self { levels })
    }

    pub fn standard() -> Result<Self> {
        Self::new(default_levels())
    }

    pub fn levels(&self) -> &[LevelDef] {
        &self.levels
    }

    pub fn top(&self) -> &LevelDef {
        &self.levels[self.levels.len() - 1]
    }

    /// Highest level whose `min_xp <= xp`, scanning from the top
    pub fn level_of(&self, xp: u64) -> &LevelDef {
        self.levels
            .iter()
            .rev()
            .find(|l| l.min_xp <= xp)
            .unwrap_or(&self.levels[0])
    }

    pub fn level_number(&self, xp: u64) -> u32 {
        self.level_of(xp).level
    }

    pub fn get(&self, level: u32) -> Option<&LevelDef> {
        self.levels.iter().find(|l| l.level == level)
    }

    pub fn next_after(&self, level: u32) -> Option<&LevelDef> {
        self.levels.iter().find(|l| l.level > level)
    }

    /// Percent of the way from the current level's floor to the next one (0-100)
    pub fn progress_to_next(&self, xp: u64) -> u8 {
        let current = self.level_of(xp);
        let Some(next) = self.next_after(current.level) else {
            return 100;
        };
        let span = next.min_xp.saturating_sub(current.min_xp);
        if span == 0 {
            return 100;
        }
        let into = xp.saturating_sub(current.min_xp);
        let pct = (u128::from(into) * 100) / u128::from(span);
        pct.min(100) as u8
    }

    /// XP still needed to reach the next level; 0 at the top
    pub fn xp_to_next(&self, xp: u64) -> u64 {
        let current = self.level_of(xp);
        self.next_after(current.level)
            .map(|next| next.min_xp.saturating_sub(xp))
            .unwrap_or(0)
    }
}
