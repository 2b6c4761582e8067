//! Shared helpers for integration tests.
//!
//! [`ScriptedSource`] is an in-memory catalog whose failures can be
//! switched on and off while a scheduler owns it.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{NaiveTime, Weekday};
use netnutrition::{
    CatalogSource, DayHours, DayListing, HoursBlock, ItemEntry, MealListing, SourceError,
    WeeklyHours, WeeklyListing,
};
use vandydine::config::FacilityConfig;
use vandydine::model::WEEK;
use vandydine::scheduler::{RefreshPolicy, RefreshScheduler};
use vandydine::snapshot::JsonSnapshotStore;

pub(crate) fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

#[derive(Default)]
pub(crate) struct ScriptState {
    /// Remaining calls that fail with an HTTP error; `u32::MAX` fails forever.
    pub fail_remaining: AtomicU32,
    /// Serve listings with no meals.
    pub empty: AtomicBool,
    /// Fail every menu call with a configuration error.
    pub misconfigured: AtomicBool,
    /// Units that fail with an HTTP error regardless of `fail_remaining`.
    pub broken_units: Mutex<HashSet<String>>,
    pub menu_calls: AtomicU32,
    pub resets: AtomicU32,
    listings: HashMap<String, WeeklyListing>,
    hours: HashMap<String, WeeklyHours>,
}

/// In-memory catalog with breakfast 7-10 and lunch 11-14 every day.
#[derive(Clone)]
pub(crate) struct ScriptedSource(pub Arc<ScriptState>);

impl ScriptedSource {
    pub fn new(units: &[&str]) -> Self {
        let mut state = ScriptState::default();
        for unit in units {
            state.listings.insert((*unit).to_owned(), weekly_listing(unit));
            state.hours.insert((*unit).to_owned(), weekly_hours(unit));
        }
        Self(Arc::new(state))
    }

    pub fn fail_next(&self, calls: u32) {
        self.0.fail_remaining.store(calls, Ordering::SeqCst);
    }

    pub fn fail_forever(&self) {
        self.fail_next(u32::MAX);
    }

    pub fn break_unit(&self, unit: &str) {
        self.0.broken_units.lock().unwrap().insert(unit.to_owned());
    }

    pub fn menu_calls(&self) -> u32 {
        self.0.menu_calls.load(Ordering::SeqCst)
    }

    pub fn resets(&self) -> u32 {
        self.0.resets.load(Ordering::SeqCst)
    }

    fn check(&self, unit: &str) -> Result<(), SourceError> {
        if self.0.misconfigured.load(Ordering::SeqCst) {
            return Err(SourceError::Config("base_url is not a NetNutrition site".into()));
        }
        if self.0.broken_units.lock().unwrap().contains(unit) {
            return Err(SourceError::Http(format!("{unit} is down")));
        }
        let remaining = self.0.fail_remaining.load(Ordering::SeqCst);
        if remaining == u32::MAX {
            return Err(SourceError::Http("upstream unavailable".into()));
        }
        if remaining > 0 {
            self.0.fail_remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(SourceError::Http("transient upstream failure".into()));
        }
        Ok(())
    }
}

impl CatalogSource for ScriptedSource {
    async fn fetch_weekly_menu(&self, unit: &str) -> Result<WeeklyListing, SourceError> {
        self.0.menu_calls.fetch_add(1, Ordering::SeqCst);
        self.check(unit)?;
        let listing = self
            .0
            .listings
            .get(unit)
            .cloned()
            .ok_or_else(|| SourceError::UnitNotFound(unit.to_owned()))?;
        if self.0.empty.load(Ordering::SeqCst) {
            return Ok(WeeklyListing {
                unit: listing.unit,
                days: Vec::new(),
            });
        }
        Ok(listing)
    }

    async fn fetch_hours(&self, unit: &str) -> Result<WeeklyHours, SourceError> {
        self.0
            .hours
            .get(unit)
            .cloned()
            .ok_or_else(|| SourceError::UnitNotFound(unit.to_owned()))
    }

    async fn reset_selection(&self) -> Result<(), SourceError> {
        self.0.resets.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn weekly_listing(unit: &str) -> WeeklyListing {
    WeeklyListing {
        unit: unit.to_owned(),
        days: WEEK
            .iter()
            .map(|&day| DayListing {
                day,
                meals: vec![
                    MealListing {
                        name: "Breakfast".into(),
                        items: vec![ItemEntry::new(Some("Griddle"), "Pancakes")],
                    },
                    MealListing {
                        name: "Lunch".into(),
                        items: vec![ItemEntry::new(Some("Grill"), "Burger")],
                    },
                ],
            })
            .collect(),
    }
}

fn weekly_hours(unit: &str) -> WeeklyHours {
    WeeklyHours {
        unit: unit.to_owned(),
        days: WEEK
            .iter()
            .map(|&day| DayHours {
                day,
                blocks: if day == Weekday::Sat {
                    vec![HoursBlock::Closed]
                } else {
                    vec![
                        HoursBlock::open(t(7, 0), t(10, 0)),
                        HoursBlock::open(t(11, 0), t(14, 0)),
                    ]
                },
            })
            .collect(),
    }
}

pub(crate) fn facilities() -> Vec<FacilityConfig> {
    vec![
        FacilityConfig::new("rand", "Rand Dining Center"),
        FacilityConfig::new("kissam", "Kissam Kitchen"),
    ]
}

pub(crate) fn policy(max_retries: u32) -> RefreshPolicy {
    RefreshPolicy {
        trigger_at: t(4, 0),
        retry_delay: Duration::from_millis(5),
        max_retries,
        refresh_on_startup: false,
        retry_until_data: true,
    }
}

/// Scheduler over both facilities with a snapshot file in `dir`.
pub(crate) fn scheduler(
    source: &ScriptedSource,
    dir: &tempfile::TempDir,
    max_retries: u32,
) -> RefreshScheduler<ScriptedSource, JsonSnapshotStore> {
    RefreshScheduler::new(
        source.clone(),
        JsonSnapshotStore::new(dir.path().join("snapshot.json")),
        facilities(),
        policy(max_retries),
    )
}

/// Poll `condition` every few milliseconds for up to two seconds.
pub(crate) async fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..400 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
