//! Persistence collaborators for `UserStats`.
//!
//! The engine itself keeps only an in-memory cache; durability is the
//! repository's job. `JsonDirRepository` stores one pretty-printed JSON
//! file per user, named by the hex-encoded user id so arbitrary ids are
//! safe as file names.

use crate::error::Result;
use crate::progression::UserStats;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

pub trait StatsRepository: Send + Sync {
    fn load(&self, user_id: &str) -> Result<Option<UserStats>>;
    fn save(&self, stats: &UserStats) -> Result<()>;
    fn load_all(&self) -> Result<Vec<UserStats>>;
}

/// Repository that forgets everything on drop
#[derive(Debug, Default)]
pub struct MemoryRepository {
    records: Mutex<HashMap<String, UserStats>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StatsRepository for MemoryRepository {
    fn load(&self, user_id: &str) -> Result<Option<UserStats>> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        Ok(records.get(user_id).cloned())
    }

    fn save(&self, stats: &UserStats) -> Result<()> {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.insert(stats.user_id.clone(), stats.clone());
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<UserStats>> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        let mut all: Vec<_> = records.values().cloned().collect();
        all.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        Ok(all)
    }
}

/// One JSON file per user under a directory
#[derive(Debug, Clone)]
pub struct JsonDirRepository {
    dir: PathBuf,
}

impl JsonDirRepository {
    /// Open (and create if needed) the repository directory
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, user_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", hex::encode(user_id.as_bytes())))
    }
}

impl StatsRepository for JsonDirRepository {
    fn load(&self, user_id: &str) -> Result<Option<UserStats>> {
        let path = self.path_for(user_id);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn save(&self, stats: &UserStats) -> Result<()> {
        let path = self.path_for(&stats.user_id);
        let tmp = path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(stats)?;
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<UserStats>> {
        let mut all = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let content = fs::read_to_string(&path)?;
            match serde_json::from_str::<UserStats>(&content) {
                Ok(stats) => all.push(stats),
                Err(e) => warn!("skipping unreadable stats file {}: {}", path.display(), e),
            }
        }
        all.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        Ok(all)
    }
}
