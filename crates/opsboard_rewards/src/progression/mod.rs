//! Progression
//!
//! XP, levels and the per-user statistics they are derived from.
//!
//! ## Flow
//!
//! - `xp::Accumulator` folds an action into a new `UserStats` snapshot
//! - `levels::LevelTable` maps the resulting XP back to a level
//! - `stats::UserStats` holds the counters every other component reads

pub mod levels;
pub mod stats;
pub mod xp;

pub use levels::{default_levels, LevelDef, LevelTable};
pub use stats::{Average, Counter, UserStats};
pub use xp::{Accumulator, XpGain};
