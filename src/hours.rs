//! Hours allocator: positional assignment of untagged hours blocks to meals.
//!
//! The upstream hours table does not say which meal a block belongs to, and
//! it often lists fewer blocks than the menu has meals (brunch standing in
//! for breakfast and lunch, for example). Blocks are handed out in scrape
//! order to the meals that need hours. When blocks are scarce, only meals
//! with published items take one, so an unpublished meal does not steal a
//! real meal's window.

use netnutrition::{HoursBlock, WeeklyHours};
use tracing::debug;

use crate::model::{
    DayMenu, FacilityMenu, HoursStatus, ItemsStatus, MealSlot, minutes_of, time_of_minutes,
};

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Allocate every day's blocks onto the matching day of `menu`.
pub fn allocate_week(menu: &mut FacilityMenu, hours: &WeeklyHours) {
    for day in &mut menu.days {
        allocate_day(day, hours.blocks_for(day.day));
    }
}

/// Allocate one day's blocks, then derive the daily aggregate.
///
/// An empty or unreadable block list leaves every slot at
/// [`HoursStatus::NotFound`].
pub fn allocate_day(day: &mut DayMenu, blocks: &[HoursBlock]) {
    let needing: Vec<usize> = day
        .slots
        .iter()
        .enumerate()
        .filter(|(_, slot)| slot.is_listed() && !slot.kind.is_daily())
        .map(|(index, _)| index)
        .collect();

    if needing.is_empty() {
        if let Some(daily) = day.slots.iter_mut().find(|s| s.kind.is_daily()) {
            span_blocks(daily, blocks);
        }
        return;
    }

    let plentiful = needing.len() <= blocks.len();
    let mut candidates = needing.iter().copied();

    for (position, block) in blocks.iter().enumerate() {
        let target = candidates
            .find(|&index| plentiful || day.slots[index].items_status == ItemsStatus::Available);
        let Some(index) = target else {
            debug!(
                day = ?day.day,
                ignored = blocks.len() - position,
                "no meal left for remaining hours blocks"
            );
            break;
        };

        let slot = &mut day.slots[index];
        match *block {
            HoursBlock::Open { opens, closes } => slot.set_hours(opens, closes),
            HoursBlock::Closed => slot.hours_status = HoursStatus::Closed,
        }
    }

    aggregate(day, &needing);
}

/// Widest window over the needing meals that received hours.
///
/// The aggregate is `Closed` only when every assigned block was a closed
/// marker; otherwise it stays `NotFound` without any open window.
fn aggregate(day: &mut DayMenu, needing: &[usize]) {
    let windows: Vec<(u32, u32)> = needing
        .iter()
        .map(|&index| &day.slots[index])
        .filter(|slot| slot.hours_status == HoursStatus::Available)
        .map(|slot| (slot.opens_minutes(), slot.closes_minutes()))
        .collect();
    let any_closed = needing
        .iter()
        .any(|&index| day.slots[index].hours_status == HoursStatus::Closed);

    let Some(daily) = day.slots.iter_mut().find(|s| s.kind.is_daily()) else {
        return;
    };

    let opens = windows.iter().map(|w| w.0).min();
    let closes = windows.iter().map(|w| w.1).max();
    match (opens, closes) {
        (Some(opens), Some(closes)) => set_span(daily, opens, closes),
        _ if any_closed => daily.hours_status = HoursStatus::Closed,
        _ => {}
    }
}

/// The daily slot is the only meal needing hours: it spans every open block.
fn span_blocks(daily: &mut MealSlot, blocks: &[HoursBlock]) {
    let windows: Vec<(u32, u32)> = blocks
        .iter()
        .filter_map(|block| match *block {
            HoursBlock::Open { opens, closes } => {
                let open = minutes_of(opens);
                let mut close = minutes_of(closes);
                if closes < opens {
                    close += MINUTES_PER_DAY;
                }
                Some((open, close))
            }
            HoursBlock::Closed => None,
        })
        .collect();

    let opens = windows.iter().map(|w| w.0).min();
    let closes = windows.iter().map(|w| w.1).max();
    match (opens, closes) {
        (Some(opens), Some(closes)) => set_span(daily, opens, closes),
        _ if !blocks.is_empty() => daily.hours_status = HoursStatus::Closed,
        _ => {}
    }
}

fn set_span(slot: &mut MealSlot, opens: u32, closes: u32) {
    slot.opens_at = time_of_minutes(opens);
    slot.closes_at = time_of_minutes(closes);
    slot.crosses_midnight = closes >= MINUTES_PER_DAY;
    slot.hours_status = HoursStatus::Available;
}
