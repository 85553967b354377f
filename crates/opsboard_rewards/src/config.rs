//! Rewards configuration
//!
//! XP amounts, the calendar timezone and the repository location.
//! Config file: ~/.config/opsboard/rewards.toml or /etc/opsboard/rewards.toml

use crate::calendar::Calendar;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// XP awarded per action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct XpRewards {
    pub create_incident: u64,
    /// Applied to `create_incident` when the incident is critical
    pub critical_create_multiplier: f64,
    pub resolve_incident: u64,
    /// Replaces `resolve_incident` for critical incidents
    pub resolve_critical_incident: u64,
    pub create_maintenance: u64,
    pub complete_maintenance: u64,
    pub quick_maintenance_bonus: u64,
    pub complete_quality_check: u64,
    pub high_score_bonus: u64,
    /// Scores strictly above this earn the high-score bonus
    pub high_score_threshold: f64,
    pub register_lost_item: u64,
    pub return_lost_item: u64,
    pub create_procedure: u64,
    pub read_procedure: u64,
    pub validate_procedure: u64,
    pub login: u64,
    pub streak_bonus: u64,
    pub help_colleague: u64,
    pub receive_thanks: u64,
    pub complete_weekly_goal: u64,
}

impl Default for XpRewards {
    fn default() -> Self {
        Self {
            create_incident: 10,
            critical_create_multiplier: 1.5,
            resolve_incident: 20,
            resolve_critical_incident: 50,
            create_maintenance: 5,
            complete_maintenance: 15,
            quick_maintenance_bonus: 10,
            complete_quality_check: 15,
            high_score_bonus: 10,
            high_score_threshold: 90.0,
            register_lost_item: 5,
            return_lost_item: 15,
            create_procedure: 25,
            read_procedure: 2,
            validate_procedure: 10,
            login: 5,
            streak_bonus: 5,
            help_colleague: 10,
            receive_thanks: 5,
            complete_weekly_goal: 50,
        }
    }
}

impl XpRewards {
    /// XP for creating an incident, with the critical multiplier applied
    pub fn create_incident_xp(&self, critical: bool) -> u64 {
        if critical {
            (self.create_incident as f64 * self.critical_create_multiplier).floor() as u64
        } else {
            self.create_incident
        }
    }
}

/// Calendar settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    /// Fixed offset from UTC used for day and week boundaries
    pub utc_offset_minutes: i32,
}

/// Repository settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub data_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { data_dir: default_data_dir() }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("/var/lib"))
        .join("opsboard")
        .join("rewards")
}

/// Main rewards configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RewardsConfig {
    #[serde(default)]
    pub xp: XpRewards,

    #[serde(default)]
    pub calendar: CalendarConfig,

    #[serde(default)]
    pub store: StoreConfig,
}

impl RewardsConfig {
    /// Get default user config path: ~/.config/opsboard/rewards.toml
    pub fn user_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Cannot determine config directory")?;
        Ok(config_dir.join("opsboard").join("rewards.toml"))
    }

    /// Get system config path: /etc/opsboard/rewards.toml
    pub fn system_config_path() -> PathBuf {
        PathBuf::from("/etc/opsboard/rewards.toml")
    }

    /// Load configuration
    ///
    /// Priority:
    /// 1. Explicit path (must exist)
    /// 2. User config (~/.config/opsboard/rewards.toml)
    /// 3. System config (/etc/opsboard/rewards.toml)
    /// 4. Defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }

        if let Ok(user_path) = Self::user_config_path() {
            if user_path.exists() {
                return Self::load_from(&user_path);
            }
        }

        let system_path = Self::system_config_path();
        if system_path.exists() {
            return Self::load_from(&system_path);
        }

        Ok(Self::default())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config = Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: RewardsConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }

    pub fn validate(&self) -> Result<()> {
        let m = self.xp.critical_create_multiplier;
        if !m.is_finite() || m < 0.0 {
            bail!("xp.critical_create_multiplier must be a non-negative number, got {}", m);
        }
        let t = self.xp.high_score_threshold;
        if !t.is_finite() || !(0.0..=100.0).contains(&t) {
            bail!("xp.high_score_threshold must be within 0-100, got {}", t);
        }
        self.calendar()?;
        Ok(())
    }

    pub fn calendar(&self) -> Result<Calendar> {
        Ok(Calendar::with_offset_minutes(self.calendar.utc_offset_minutes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = RewardsConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.xp.create_incident_xp(false), 10);
        assert_eq!(config.xp.create_incident_xp(true), 15);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = RewardsConfig::from_toml_str(
            r#"
            [xp]
            login = 8

            [calendar]
            utc_offset_minutes = 60
            "#,
        )
        .unwrap();
        assert_eq!(config.xp.login, 8);
        assert_eq!(config.xp.resolve_critical_incident, 50);
        assert_eq!(config.calendar().unwrap().offset_minutes(), 60);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(RewardsConfig::from_toml_str("[xp]\nhigh_score_threshold = 140.0").is_err());
        assert!(RewardsConfig::from_toml_str("[xp]\ncritical_create_multiplier = -1.0").is_err());
        assert!(RewardsConfig::from_toml_str("[calendar]\nutc_offset_minutes = 5000").is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = RewardsConfig::default();
        config.xp.streak_bonus = 3;
        let text = config.to_toml_string().unwrap();
        let parsed = RewardsConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rewards.toml");
        fs::write(&path, "[xp]\nreturn_lost_item = 30\n").unwrap();
        let config = RewardsConfig::load(Some(&path)).unwrap();
        assert_eq!(config.xp.return_lost_item, 30);

        assert!(RewardsConfig::load(Some(&dir.path().join("missing.toml"))).is_err());
    }
}
