//! Trait definition for pluggable catalog backends.
//!
//! The dining engine only ever talks to a [`CatalogSource`]; the concrete
//! NetNutrition scraper is one implementation and tests supply scripted
//! in-memory ones.

use std::sync::Arc;

use crate::error::SourceError;
use crate::types::{WeeklyHours, WeeklyListing};

/// A source of raw weekly menus and hours for named dining units.
///
/// Calls are idempotent and have no side effects on the upstream data.
/// Stateful upstreams may keep a per-session selection, which the caller
/// clears with [`CatalogSource::reset_selection`] once per unit per refresh.
///
/// All implementations must be `Send + Sync` so refreshes can run on a
/// spawned task.
pub trait CatalogSource: Send + Sync {
    /// Fetch the unit's weekly menu, including every listed meal's items.
    ///
    /// # Errors
    ///
    /// [`SourceError::UnitNotFound`] when the unit is not listed upstream;
    /// [`SourceError::Http`] / [`SourceError::Parse`] for transient failures.
    fn fetch_weekly_menu(
        &self,
        unit: &str,
    ) -> impl std::future::Future<Output = Result<WeeklyListing, SourceError>> + Send;

    /// Fetch the unit's raw hours-of-operation blocks for the week.
    ///
    /// # Errors
    ///
    /// Same as [`CatalogSource::fetch_weekly_menu`].
    fn fetch_hours(
        &self,
        unit: &str,
    ) -> impl std::future::Future<Output = Result<WeeklyHours, SourceError>> + Send;

    /// Clear any selection state the upstream session holds.
    fn reset_selection(
        &self,
    ) -> impl std::future::Future<Output = Result<(), SourceError>> + Send;
}

impl<T: CatalogSource> CatalogSource for Arc<T> {
    fn fetch_weekly_menu(
        &self,
        unit: &str,
    ) -> impl std::future::Future<Output = Result<WeeklyListing, SourceError>> + Send {
        (**self).fetch_weekly_menu(unit)
    }

    fn fetch_hours(
        &self,
        unit: &str,
    ) -> impl std::future::Future<Output = Result<WeeklyHours, SourceError>> + Send {
        (**self).fetch_hours(unit)
    }

    fn reset_selection(
        &self,
    ) -> impl std::future::Future<Output = Result<(), SourceError>> + Send {
        (**self).reset_selection()
    }
}
