//! Raw listing types returned by a catalog source.
//!
//! These mirror what the upstream pages expose and carry no availability
//! interpretation: a listed meal may have zero items, hours blocks are not
//! tagged with a meal, and days may be missing entirely.

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

/// One food item row as scraped, with the station header it appeared under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemEntry {
    /// Station header text, or `None` when the item appeared before any
    /// header or under an unlabeled/placeholder header.
    pub station: Option<String>,
    /// Item display name.
    pub name: String,
}

impl ItemEntry {
    /// Convenience constructor used by parsers and tests.
    pub fn new(station: Option<&str>, name: &str) -> Self {
        Self {
            station: station.map(str::to_owned),
            name: name.to_owned(),
        }
    }
}

/// A meal the upstream lists for a day, with whatever items it published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealListing {
    /// Upstream meal name, e.g. `"Breakfast"` or `"Daily Offerings"`.
    pub name: String,
    /// Item rows in page order. Empty when the meal exists but nothing is published yet.
    pub items: Vec<ItemEntry>,
}

/// All meals listed for one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayListing {
    pub day: Weekday,
    /// Meals in the order the upstream lists them.
    pub meals: Vec<MealListing>,
}

/// A unit's weekly menu listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyListing {
    /// Upstream unit name this listing was fetched for.
    pub unit: String,
    pub days: Vec<DayListing>,
}

impl WeeklyListing {
    /// Returns the listing for `day`, if the upstream published one.
    pub fn day(&self, day: Weekday) -> Option<&DayListing> {
        self.days.iter().find(|d| d.day == day)
    }

    /// Total number of listed meals across the week.
    pub fn meal_count(&self) -> usize {
        self.days.iter().map(|d| d.meals.len()).sum()
    }
}

/// One scraped hours-of-operation cell group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HoursBlock {
    /// An open/close pair. `closes` earlier than `opens` means the block
    /// runs past midnight.
    Open { opens: NaiveTime, closes: NaiveTime },
    /// The upstream printed "Closed" for this position.
    Closed,
}

impl HoursBlock {
    pub fn open(opens: NaiveTime, closes: NaiveTime) -> Self {
        Self::Open { opens, closes }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

/// Hours blocks for one day, in scrape order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayHours {
    pub day: Weekday,
    pub blocks: Vec<HoursBlock>,
}

/// A unit's weekly hours of operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyHours {
    pub unit: String,
    pub days: Vec<DayHours>,
}

impl WeeklyHours {
    /// Blocks scraped for `day`, empty when the day was missing or malformed.
    pub fn blocks_for(&self, day: Weekday) -> &[HoursBlock] {
        self.days
            .iter()
            .find(|d| d.day == day)
            .map(|d| d.blocks.as_slice())
            .unwrap_or(&[])
    }
}
