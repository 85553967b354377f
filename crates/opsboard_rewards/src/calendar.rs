//! Calendar-day arithmetic in a fixed timezone.
//!
//! Login streaks and weekly challenge windows compare calendar days, never
//! elapsed hours. Every date the engine derives from a timestamp goes
//! through [`Calendar::day_of`], so a deployment picks one UTC offset and
//! the streak rules stay stable regardless of the host's local timezone.

use crate::error::{Result, RewardsError};
use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Offset, Utc};

/// How a previous login day relates to the current one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayRelation {
    /// Same calendar day
    SameDay,
    /// Previous day was exactly yesterday
    Consecutive,
    /// Never seen, a gap of two or more days, or a day in the future
    Broken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calendar {
    offset: FixedOffset,
}

impl Calendar {
    /// Largest accepted offset, in minutes, either side of UTC
    pub const MAX_OFFSET_MINUTES: i32 = 18 * 60;

    pub fn utc() -> Self {
        Self { offset: Utc.fix() }
    }

    pub fn with_offset_minutes(minutes: i32) -> Result<Self> {
        if minutes.abs() > Self::MAX_OFFSET_MINUTES {
            return Err(RewardsError::Config(format!(
                "utc_offset_minutes {} outside ±{}",
                minutes,
                Self::MAX_OFFSET_MINUTES
            )));
        }
        FixedOffset::east_opt(minutes * 60)
            .map(|offset| Self { offset })
            .ok_or_else(|| RewardsError::Config(format!("invalid utc offset: {} minutes", minutes)))
    }

    pub fn offset_minutes(&self) -> i32 {
        self.offset.local_minus_utc() / 60
    }

    /// Calendar day of an instant in this calendar's timezone
    pub fn day_of(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.offset).date_naive()
    }

    /// Sunday-to-Saturday week containing `day`
    pub fn week_of(&self, day: NaiveDate) -> (NaiveDate, NaiveDate) {
        let back = i64::from(day.weekday().num_days_from_sunday());
        let start = day - Duration::days(back);
        (start, start + Duration::days(6))
    }

    pub fn relation(&self, previous: Option<NaiveDate>, today: NaiveDate) -> DayRelation {
        match previous {
            Some(day) if day == today => DayRelation::SameDay,
            Some(day) if today.pred_opt() == Some(day) => DayRelation::Consecutive,
            _ => DayRelation::Broken,
        }
    }
}

impl Default for Calendar {
    fn default() -> Self {
        Self::utc()
    }
}
