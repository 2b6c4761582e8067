//! In-memory cache of the unit directory.
//!
//! The landing page lists every unit with its oid and rarely changes, so a
//! refresh cycle over many facilities downloads it once. Keys are unit
//! names normalised to lowercase with collapsed whitespace. Uses [`moka`]
//! for async-friendly TTL expiry.

use std::time::Duration;

use moka::future::Cache;

/// Upper bound on cached unit names.
const MAX_UNITS: u64 = 512;

/// Unit name → unit oid cache owned by one source instance.
#[derive(Clone)]
pub struct UnitCache {
    inner: Cache<String, String>,
}

impl UnitCache {
    /// Create an empty cache whose entries expire after `ttl_seconds`.
    pub fn new(ttl_seconds: u64) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(MAX_UNITS)
                .time_to_live(Duration::from_secs(ttl_seconds.max(1)))
                .build(),
        }
    }

    /// Look up the oid for a unit name.
    pub async fn get(&self, unit: &str) -> Option<String> {
        self.inner.get(&normalise(unit)).await
    }

    /// Replace cached entries with a freshly parsed directory.
    pub async fn insert_all(&self, units: &[(String, String)]) {
        for (name, oid) in units {
            self.inner.insert(normalise(name), oid.clone()).await;
        }
    }
}

fn normalise(unit: &str) -> String {
    unit.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
