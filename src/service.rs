//! Read-only query surface over the live snapshot.
//!
//! Every call reads whichever snapshot is current when it starts and works
//! on that `Arc` throughout, so a concurrent refresh never yields a mix of
//! old and new data.

use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, NaiveTime, TimeDelta, Utc, Weekday};
use tokio::sync::watch;

use crate::classifier::{MealSelection, Selection};
use crate::error::{DiningError, Result};
use crate::model::{FacilityMenu, HoursStatus, MealKind, MealSlot};
use crate::resolver;
use crate::snapshot::CacheSnapshot;

/// Which meal a single lookup asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MealFilter {
    /// The next available meal, via the resolver.
    Next,
    /// A specific kind, with the breakfast/brunch swap.
    Kind(MealKind),
}

/// One row of a facility's hours for a day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoursLine {
    pub kind: MealKind,
    pub name: String,
    pub status: HoursStatus,
    pub opens_at: NaiveTime,
    pub closes_at: NaiveTime,
    pub crosses_midnight: bool,
}

/// One result of a fanned-out selection.
#[derive(Debug)]
pub struct Answer {
    pub facility: String,
    pub day: Weekday,
    pub result: Result<MealSlot>,
}

/// Query handle over the scheduler's published snapshots.
#[derive(Debug, Clone)]
pub struct DiningService {
    snapshots: watch::Receiver<Arc<CacheSnapshot>>,
}

impl DiningService {
    pub fn new(snapshots: watch::Receiver<Arc<CacheSnapshot>>) -> Self {
        Self { snapshots }
    }

    /// A service over a fixed snapshot, e.g. one loaded from disk.
    pub fn from_snapshot(snapshot: CacheSnapshot) -> Self {
        let (_tx, rx) = watch::channel(Arc::new(snapshot));
        Self::new(rx)
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<CacheSnapshot> {
        Arc::clone(&self.snapshots.borrow())
    }

    fn menu<'a>(snapshot: &'a CacheSnapshot, facility: &str, day: Weekday) -> Result<&'a FacilityMenu> {
        snapshot
            .facility(facility)
            .ok_or_else(|| DiningError::MenuNotFound {
                facility: facility.to_owned(),
                day,
                meal: "any".into(),
            })
    }

    /// One slot for `facility` on `day`.
    ///
    /// # Errors
    ///
    /// [`DiningError::MenuNotFound`] when the facility or meal is not
    /// listed, [`DiningError::NoMealFound`] when the resolver finds nothing.
    pub fn get_menu(
        &self,
        facility: &str,
        day: Weekday,
        filter: &MealFilter,
        now: NaiveDateTime,
    ) -> Result<MealSlot> {
        let snapshot = self.snapshot();
        let menu = Self::menu(&snapshot, facility, day)?;

        match filter {
            MealFilter::Next => {
                resolver::next_meal(menu, day, now, None).map(|found| found.slot.clone())
            }
            MealFilter::Kind(kind) => {
                let day_menu = menu.day(day);
                let listed = |k: &MealKind| {
                    day_menu
                        .and_then(|d| d.slot(k))
                        .filter(|slot| slot.is_listed())
                };
                listed(kind)
                    .or_else(|| kind.swap_partner().and_then(|partner| listed(&partner)))
                    .cloned()
                    .ok_or_else(|| DiningError::MenuNotFound {
                        facility: facility.to_owned(),
                        day,
                        meal: kind.display_name().to_owned(),
                    })
            }
        }
    }

    /// Every listed slot for `facility` on `day`, in canonical order.
    ///
    /// # Errors
    ///
    /// [`DiningError::MenuNotFound`] when the facility is not in the snapshot.
    pub fn list_facility_menu(&self, facility: &str, day: Weekday) -> Result<Vec<MealSlot>> {
        let snapshot = self.snapshot();
        let menu = Self::menu(&snapshot, facility, day)?;
        Ok(menu
            .day(day)
            .map(|d| d.slots.iter().filter(|s| s.is_listed()).cloned().collect())
            .unwrap_or_default())
    }

    /// Hours for each listed meal plus the daily aggregate.
    ///
    /// # Errors
    ///
    /// [`DiningError::MenuNotFound`] when the facility is not in the snapshot.
    pub fn facility_hours(&self, facility: &str, day: Weekday) -> Result<Vec<HoursLine>> {
        let snapshot = self.snapshot();
        let menu = Self::menu(&snapshot, facility, day)?;
        Ok(menu
            .day(day)
            .map(|d| {
                d.slots
                    .iter()
                    .filter(|s| s.is_listed() || s.kind.is_daily())
                    .map(|s| HoursLine {
                        kind: s.kind.clone(),
                        name: s.name.clone(),
                        status: s.hours_status,
                        opens_at: s.opens_at,
                        closes_at: s.closes_at,
                        crosses_midnight: s.crosses_midnight,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Time since the live snapshot's data was fetched.
    pub fn snapshot_age(&self, now: DateTime<Utc>) -> TimeDelta {
        self.snapshot().age(now)
    }

    /// An empty snapshot is always stale.
    pub fn is_stale(&self, now: DateTime<Utc>, max_age: TimeDelta) -> bool {
        let snapshot = self.snapshot();
        snapshot.is_empty() || snapshot.age(now) > max_age
    }

    /// Fan a classified selection out over facility × day × meal.
    pub fn answer(&self, selection: &Selection, now: NaiveDateTime) -> Vec<Answer> {
        let mut answers = Vec::with_capacity(selection.result_count());
        for facility in &selection.facilities {
            for &day in &selection.days {
                let answer = |result: Result<MealSlot>| Answer {
                    facility: facility.clone(),
                    day,
                    result,
                };
                match &selection.meals {
                    MealSelection::Next => {
                        answers.push(answer(self.get_menu(facility, day, &MealFilter::Next, now)));
                    }
                    MealSelection::Kinds(kinds) => {
                        for kind in kinds {
                            let filter = MealFilter::Kind(kind.clone());
                            answers.push(answer(self.get_menu(facility, day, &filter, now)));
                        }
                    }
                    MealSelection::All => match self.list_facility_menu(facility, day) {
                        Ok(slots) if slots.is_empty() => {
                            answers.push(answer(Err(DiningError::MenuNotFound {
                                facility: facility.clone(),
                                day,
                                meal: "any".into(),
                            })));
                        }
                        Ok(slots) => answers.extend(slots.into_iter().map(|s| answer(Ok(s)))),
                        Err(e) => answers.push(answer(Err(e))),
                    },
                }
            }
        }
        answers
    }
}
