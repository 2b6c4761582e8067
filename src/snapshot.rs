//! Cache snapshot and its on-disk persistence.
//!
//! A [`CacheSnapshot`] is built whole by the refresh scheduler and never
//! edited after publication. The persisted copy is only read back when a
//! refresh exhausts its retries.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{DiningError, Result};
use crate::model::FacilityMenu;

/// Every facility's week plus when it was fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    /// Facility id → week.
    pub facilities: BTreeMap<String, FacilityMenu>,
    /// When the upstream data was fetched. Kept as-is when restored.
    pub fetched_at: DateTime<Utc>,
    /// Failed attempts before this snapshot was obtained.
    pub retry_count: u32,
}

impl Default for CacheSnapshot {
    fn default() -> Self {
        Self {
            facilities: BTreeMap::new(),
            fetched_at: DateTime::<Utc>::UNIX_EPOCH,
            retry_count: 0,
        }
    }
}

impl CacheSnapshot {
    pub fn new(facilities: BTreeMap<String, FacilityMenu>, fetched_at: DateTime<Utc>) -> Self {
        Self {
            facilities,
            fetched_at,
            retry_count: 0,
        }
    }

    /// True when no facility has any listed meal.
    pub fn is_empty(&self) -> bool {
        self.facilities.values().all(FacilityMenu::is_empty)
    }

    pub fn facility(&self, id: &str) -> Option<&FacilityMenu> {
        self.facilities.get(id)
    }

    /// Time since the upstream data was fetched.
    pub fn age(&self, now: DateTime<Utc>) -> TimeDelta {
        now.signed_duration_since(self.fetched_at)
    }
}

/// Durable storage for the last published snapshot.
pub trait SnapshotStore: Send + Sync {
    /// Persist `snapshot`, replacing any previous one.
    fn save(&self, snapshot: &CacheSnapshot) -> Result<()>;

    /// Load the persisted snapshot, `None` if nothing was ever saved.
    fn load(&self) -> Result<Option<CacheSnapshot>>;
}

/// Current on-disk schema version.
const SNAPSHOT_VERSION: u8 = 1;

#[derive(Serialize)]
struct SnapshotFileRef<'a> {
    version: u8,
    snapshot: &'a CacheSnapshot,
}

#[derive(Deserialize)]
struct SnapshotFile {
    #[serde(default = "default_version")]
    version: u8,
    snapshot: CacheSnapshot,
}

fn default_version() -> u8 {
    SNAPSHOT_VERSION
}

/// Pretty JSON file store.
#[derive(Debug, Clone)]
pub struct JsonSnapshotStore {
    path: PathBuf,
}

impl JsonSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStore for JsonSnapshotStore {
    fn save(&self, snapshot: &CacheSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| DiningError::Store(format!("cannot create snapshot dir: {e}")))?;
        }

        let file = SnapshotFileRef {
            version: SNAPSHOT_VERSION,
            snapshot,
        };
        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| DiningError::Store(format!("cannot serialize snapshot: {e}")))?;

        // Write beside the target and rename so readers never see a torn file.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .map_err(|e| DiningError::Store(format!("cannot write snapshot: {e}")))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| DiningError::Store(format!("cannot replace snapshot: {e}")))?;

        debug!(path = %self.path.display(), "snapshot persisted");
        Ok(())
    }

    fn load(&self) -> Result<Option<CacheSnapshot>> {
        let bytes = match std::fs::read(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(DiningError::Store(format!("cannot read snapshot: {e}")));
            }
        };

        let file: SnapshotFile = serde_json::from_slice(&bytes)
            .map_err(|e| DiningError::Store(format!("cannot parse snapshot: {e}")))?;
        if file.version > SNAPSHOT_VERSION {
            return Err(DiningError::Store(format!(
                "snapshot version {} is newer than supported {SNAPSHOT_VERSION}",
                file.version
            )));
        }
        Ok(Some(file.snapshot))
    }
}
