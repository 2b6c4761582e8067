//! Menu builder: raw weekly listings → complete facility weeks.
//!
//! Every day gets a slot for every meal kind the facility lists anywhere
//! in the week, plus the daily aggregate, so lookups never have to
//! distinguish "missing cell" from "meal not served".

use std::collections::{BTreeMap, BTreeSet};

use netnutrition::{CatalogSource, ItemEntry, WeeklyListing};
use tracing::{debug, trace};

use crate::config::FacilityConfig;
use crate::error::{DiningError, Result};
use crate::hours;
use crate::model::{DayMenu, FacilityMenu, ItemsStatus, MealKind, MealSlot, WEEK};

/// Station bucket for items scraped without a station header.
pub const GENERAL_STATION: &str = "General Items";

/// Build a facility week from a raw listing. Hours are left unknown.
pub fn build_facility_menu(facility: &str, listing: &WeeklyListing) -> FacilityMenu {
    let mut kinds: BTreeSet<MealKind> = listing
        .days
        .iter()
        .flat_map(|d| &d.meals)
        .map(|m| MealKind::from_upstream(&m.name))
        .collect();
    kinds.insert(MealKind::DailyOfferings);

    let days = WEEK
        .iter()
        .map(|&day| {
            let listed = listing.day(day);
            let slots = kinds
                .iter()
                .map(|kind| {
                    let mut slot = MealSlot::new(facility, day, kind.clone());
                    let meals = listed
                        .into_iter()
                        .flat_map(|d| &d.meals)
                        .filter(|m| &MealKind::from_upstream(&m.name) == kind);
                    for meal in meals {
                        if slot.items_status == ItemsStatus::NotFound {
                            slot.name = meal.name.trim().to_owned();
                            slot.items_status = ItemsStatus::NotListed;
                        }
                        group_items(&mut slot.items, &meal.items);
                    }
                    if !slot.items.is_empty() {
                        slot.items_status = ItemsStatus::Available;
                    }
                    slot
                })
                .collect();
            DayMenu { day, slots }
        })
        .collect();

    FacilityMenu {
        facility: facility.to_owned(),
        days,
    }
}

fn group_items(stations: &mut BTreeMap<String, Vec<String>>, items: &[ItemEntry]) {
    for item in items {
        let station = item
            .station
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(GENERAL_STATION);
        stations
            .entry(station.to_owned())
            .or_default()
            .push(item.name.clone());
    }
}

/// Fetch, build and allocate hours for one facility.
///
/// The upstream session selection is reset once before the facility's
/// requests. Any source failure discards the partial week.
pub async fn fetch_facility_menu<S: CatalogSource>(
    source: &S,
    facility: &FacilityConfig,
) -> Result<FacilityMenu> {
    let id = facility.id.as_str();
    source
        .reset_selection()
        .await
        .map_err(|e| DiningError::from_source(id, e))?;

    let listing = source
        .fetch_weekly_menu(&facility.unit)
        .await
        .map_err(|e| DiningError::from_source(id, e))?;
    trace!(facility = id, meals = listing.meal_count(), "weekly listing received");

    let weekly_hours = source
        .fetch_hours(&facility.unit)
        .await
        .map_err(|e| DiningError::from_source(id, e))?;

    let mut menu = build_facility_menu(id, &listing);
    hours::allocate_week(&mut menu, &weekly_hours);
    debug!(facility = id, empty = menu.is_empty(), "facility menu built");
    Ok(menu)
}
