//! Availability matrix types: meal kinds, meal slots and facility weeks.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};

/// Days of a facility week, Sunday first.
pub const WEEK: [Weekday; 7] = [
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

const MINUTES_PER_DAY: u32 = 24 * 60;

/// A named meal category.
///
/// Variant order is the canonical chronological order; a day's slots are
/// kept sorted by it, with the daily aggregate last.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealKind {
    Breakfast,
    Brunch,
    Lunch,
    Dinner,
    LateNight,
    /// An upstream meal name with no dedicated kind.
    Other(String),
    /// Synthetic slot spanning the facility's whole open window for a day.
    DailyOfferings,
}

impl MealKind {
    /// Match an upstream meal name, ignoring case and spacing.
    pub fn from_upstream(name: &str) -> Self {
        let key = name
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        match key.as_str() {
            "breakfast" => Self::Breakfast,
            "brunch" => Self::Brunch,
            "lunch" => Self::Lunch,
            "dinner" => Self::Dinner,
            "late night" | "late-night" | "latenight" => Self::LateNight,
            "daily offerings" | "daily" | "all day" => Self::DailyOfferings,
            _ => Self::Other(name.trim().to_owned()),
        }
    }

    /// Stable lowercase identifier, e.g. `late-night`.
    pub fn slug(&self) -> String {
        match self {
            Self::Breakfast => "breakfast".into(),
            Self::Brunch => "brunch".into(),
            Self::Lunch => "lunch".into(),
            Self::Dinner => "dinner".into(),
            Self::LateNight => "late-night".into(),
            Self::Other(name) => name.to_lowercase().split_whitespace().collect::<Vec<_>>().join("-"),
            Self::DailyOfferings => "daily-offerings".into(),
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Self::Breakfast => "Breakfast",
            Self::Brunch => "Brunch",
            Self::Lunch => "Lunch",
            Self::Dinner => "Dinner",
            Self::LateNight => "Late Night",
            Self::Other(name) => name,
            Self::DailyOfferings => "Daily Offerings",
        }
    }

    pub fn is_daily(&self) -> bool {
        matches!(self, Self::DailyOfferings)
    }

    /// Fixed display category for this kind.
    pub fn category(&self) -> DisplayCategory {
        match self {
            Self::Breakfast => DisplayCategory::new("breakfast", 0xEA_BA_38),
            Self::Brunch => DisplayCategory::new("brunch", 0xF1_69_07),
            Self::Lunch => DisplayCategory::new("lunch", 0xCC_25_37),
            Self::Dinner => DisplayCategory::new("dinner", 0x90_13_FE),
            Self::DailyOfferings => DisplayCategory::new("daily", 0x4A_90_E2),
            Self::LateNight | Self::Other(_) => DisplayCategory::new("other", 0x9B_9B_9B),
        }
    }

    /// The kind a specific-meal lookup falls back to when this one is absent.
    pub fn swap_partner(&self) -> Option<Self> {
        match self {
            Self::Breakfast => Some(Self::Brunch),
            Self::Brunch => Some(Self::Breakfast),
            _ => None,
        }
    }
}

impl fmt::Display for MealKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Color and tag used by presentation layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayCategory {
    pub tag: &'static str,
    /// 24-bit RGB.
    pub color: u32,
}

impl DisplayCategory {
    const fn new(tag: &'static str, color: u32) -> Self {
        Self { tag, color }
    }
}

/// Whether a slot's opening hours are known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoursStatus {
    /// No hours could be matched; open status is unknown, not closed.
    NotFound,
    Closed,
    Available,
}

/// Whether a slot's food items are known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemsStatus {
    /// The upstream did not list this meal for the day.
    NotFound,
    /// The meal is listed but its items are not published.
    NotListed,
    Available,
}

/// One (facility, day, meal kind) cell of the availability matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealSlot {
    pub facility: String,
    pub day: Weekday,
    pub kind: MealKind,
    /// Display name; the upstream name when the meal was listed.
    pub name: String,
    pub opens_at: NaiveTime,
    pub closes_at: NaiveTime,
    /// `closes_at` falls on the following day.
    pub crosses_midnight: bool,
    pub hours_status: HoursStatus,
    /// Station name → item names in upstream order.
    pub items: BTreeMap<String, Vec<String>>,
    pub items_status: ItemsStatus,
}

impl MealSlot {
    /// An unlisted slot with unknown hours spanning the whole day.
    pub fn new(facility: &str, day: Weekday, kind: MealKind) -> Self {
        Self {
            facility: facility.to_owned(),
            day,
            name: kind.display_name().to_owned(),
            kind,
            opens_at: NaiveTime::MIN,
            closes_at: unknown_close(),
            crosses_midnight: false,
            hours_status: HoursStatus::NotFound,
            items: BTreeMap::new(),
            items_status: ItemsStatus::NotFound,
        }
    }

    /// Record an open window. A close earlier than the open runs past midnight.
    pub fn set_hours(&mut self, opens: NaiveTime, closes: NaiveTime) {
        self.opens_at = opens;
        self.closes_at = closes;
        self.crosses_midnight = closes < opens;
        self.hours_status = HoursStatus::Available;
    }

    /// Minutes after midnight of `day` at which the slot opens.
    pub fn opens_minutes(&self) -> u32 {
        minutes_of(self.opens_at)
    }

    /// Minutes after midnight of `day` at which the slot closes, past 1440
    /// when it crosses midnight.
    pub fn closes_minutes(&self) -> u32 {
        let closes = minutes_of(self.closes_at);
        if self.crosses_midnight {
            closes + MINUTES_PER_DAY
        } else {
            closes
        }
    }

    pub fn category(&self) -> DisplayCategory {
        self.kind.category()
    }

    pub fn item_count(&self) -> usize {
        self.items.values().map(Vec::len).sum()
    }

    pub fn is_listed(&self) -> bool {
        self.items_status != ItemsStatus::NotFound
    }
}

/// The "unknown/maximal" close used until hours are allocated.
pub fn unknown_close() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)
}

pub(crate) fn minutes_of(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

/// Convert minutes after midnight (possibly past 1440) back to a time of day.
pub(crate) fn time_of_minutes(minutes: u32) -> NaiveTime {
    let minutes = minutes % MINUTES_PER_DAY;
    NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0).unwrap_or(NaiveTime::MIN)
}

/// All slots for one day, in canonical kind order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayMenu {
    pub day: Weekday,
    pub slots: Vec<MealSlot>,
}

impl DayMenu {
    pub fn slot(&self, kind: &MealKind) -> Option<&MealSlot> {
        self.slots.iter().find(|s| &s.kind == kind)
    }

    pub fn slot_mut(&mut self, kind: &MealKind) -> Option<&mut MealSlot> {
        self.slots.iter_mut().find(|s| &s.kind == kind)
    }

    pub fn daily(&self) -> Option<&MealSlot> {
        self.slot(&MealKind::DailyOfferings)
    }
}

/// A facility's full week, Sunday through Saturday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacilityMenu {
    pub facility: String,
    pub days: Vec<DayMenu>,
}

impl FacilityMenu {
    pub fn day(&self, day: Weekday) -> Option<&DayMenu> {
        self.days.iter().find(|d| d.day == day)
    }

    pub fn day_mut(&mut self, day: Weekday) -> Option<&mut DayMenu> {
        self.days.iter_mut().find(|d| d.day == day)
    }

    /// True when no meal is listed on any day.
    pub fn is_empty(&self) -> bool {
        !self.days.iter().flat_map(|d| &d.slots).any(MealSlot::is_listed)
    }
}
