//! Next-meal resolver.
//!
//! Picks the most relevant slot for "now": the earliest-closing meal still
//! open today, otherwise the earliest-opening meal on the following days.
//! A strict pass only considers meals with published items; a relaxed pass
//! also accepts listed-but-unpublished meals and runs only when the strict
//! pass finds nothing.

use chrono::{Datelike, NaiveDateTime, Weekday};
use tracing::trace;

use crate::error::{DiningError, Result};
use crate::model::{FacilityMenu, HoursStatus, ItemsStatus, MealKind, MealSlot, minutes_of};

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Which eligibility rule produced a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    /// Only meals with published items.
    Strict,
    /// Also meals listed without items.
    Relaxed,
}

impl Pass {
    fn accepts(self, status: ItemsStatus) -> bool {
        match self {
            Self::Strict => status == ItemsStatus::Available,
            Self::Relaxed => status != ItemsStatus::NotFound,
        }
    }
}

/// A resolved slot and how it was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution<'a> {
    pub slot: &'a MealSlot,
    pub pass: Pass,
    /// Days after the target day the slot falls on.
    pub days_ahead: u32,
}

/// Resolve the next meal at `menu` for `target`, seen from `now`.
///
/// When `target` is today the scan starts with meals still open, including
/// yesterday's meals that run past midnight; a full week is scanned,
/// wrapping back to the same weekday. `filter` limits the scan to one kind.
/// Slots whose hours are known to be closed are skipped.
///
/// # Errors
///
/// [`DiningError::NoMealFound`] when neither pass finds a slot.
pub fn next_meal<'a>(
    menu: &'a FacilityMenu,
    target: Weekday,
    now: NaiveDateTime,
    filter: Option<&MealKind>,
) -> Result<Resolution<'a>> {
    for pass in [Pass::Strict, Pass::Relaxed] {
        if let Some((slot, days_ahead)) = scan(menu, target, now, filter, pass) {
            return Ok(Resolution {
                slot,
                pass,
                days_ahead,
            });
        }
        trace!(facility = %menu.facility, ?pass, "no eligible meal in pass");
    }

    Err(DiningError::NoMealFound {
        facility: menu.facility.clone(),
    })
}

fn scan<'a>(
    menu: &'a FacilityMenu,
    target: Weekday,
    now: NaiveDateTime,
    filter: Option<&MealKind>,
    pass: Pass,
) -> Option<(&'a MealSlot, u32)> {
    let starts_today = target == now.weekday();
    let now_minutes = minutes_of(now.time());
    let last = if starts_today { 7 } else { 6 };

    let eligible = |slot: &&MealSlot| {
        pass.accepts(slot.items_status)
            && slot.hours_status != HoursStatus::Closed
            && filter.is_none_or(|kind| &slot.kind == kind)
    };

    for offset in 0..=last {
        let day = (0..offset).fold(target, |d, _| d.succ());
        let Some(day_menu) = menu.day(day) else {
            continue;
        };
        let slots = day_menu.slots.iter().filter(eligible);

        // Specific meals win ties against the daily aggregate.
        let pick = if starts_today && offset == 0 {
            let carried = menu
                .day(day.pred())
                .into_iter()
                .flat_map(|d| &d.slots)
                .filter(eligible)
                .filter(|slot| slot.crosses_midnight)
                .map(|slot| (slot, slot.closes_minutes() - MINUTES_PER_DAY));
            slots
                .map(|slot| (slot, slot.closes_minutes()))
                .chain(carried)
                .filter(|&(_, closes)| closes > now_minutes)
                .min_by_key(|&(slot, closes)| (closes, slot.kind.is_daily()))
                .map(|(slot, _)| slot)
        } else {
            slots.min_by_key(|slot| (slot.opens_minutes(), slot.kind.is_daily()))
        };

        if let Some(slot) = pick {
            return Some((slot, offset));
        }
    }
    None
}
