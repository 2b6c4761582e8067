//! CBORD NetNutrition scraper.
//!
//! Flow per unit: resolve the unit oid from the landing page, select the
//! unit to get its weekly menu cards, select each meal to get its items,
//! and fetch the hours markup separately. The site tracks the current
//! selection in the session cookie, so requests for one unit must not be
//! interleaved with requests for another on the same source.

use crate::cache::UnitCache;
use crate::config::SourceConfig;
use crate::error::SourceError;
use crate::http;
use crate::parse::{self, MenuLink};
use crate::source::CatalogSource;
use crate::types::{DayListing, MealListing, WeeklyHours, WeeklyListing};

const SELECT_UNIT: &str = "Unit/SelectUnitFromUnitsList";
const SELECT_MENU: &str = "Menu/SelectMenu";
const UNIT_HOURS: &str = "Unit/GetHoursOfOperationMarkup";
const RESET_SELECTIONS: &str = "Home/ResetSelections";

/// NetNutrition catalog source with a single cookie-carrying session.
pub struct NetNutritionSource {
    config: SourceConfig,
    client: reqwest::Client,
    units: UnitCache,
}

impl NetNutritionSource {
    /// Create a source for the configured instance.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Config`] for an invalid configuration or
    /// [`SourceError::Http`] if the HTTP client cannot be built.
    pub fn new(config: SourceConfig) -> Result<Self, SourceError> {
        config.validate()?;
        let client = http::build_client(&config)?;
        let units = UnitCache::new(config.unit_cache_ttl_seconds);
        Ok(Self {
            config,
            client,
            units,
        })
    }

    /// Resolve a unit name to its oid, downloading the directory on a cache miss.
    ///
    /// # Errors
    ///
    /// [`SourceError::UnitNotFound`] if the unit is not on the landing page.
    pub async fn unit_oid(&self, unit: &str) -> Result<String, SourceError> {
        if let Some(oid) = self.units.get(unit).await {
            return Ok(oid);
        }

        let html = self.get_root().await?;
        let directory = parse::parse_unit_directory(&html)?;
        tracing::debug!(units = directory.len(), "unit directory refreshed");
        self.units.insert_all(&directory).await;

        self.units
            .get(unit)
            .await
            .ok_or_else(|| SourceError::UnitNotFound(unit.to_owned()))
    }

    async fn get_root(&self) -> Result<String, SourceError> {
        let response = self
            .client
            .get(self.config.base_url.as_str())
            .send()
            .await
            .map_err(|e| SourceError::Http(format!("landing page request failed: {e}")))?
            .error_for_status()
            .map_err(|e| SourceError::Http(format!("landing page HTTP error: {e}")))?;

        response
            .text()
            .await
            .map_err(|e| SourceError::Http(format!("landing page read failed: {e}")))
    }

    async fn post(&self, path: &str, form: &[(&str, &str)]) -> Result<String, SourceError> {
        let url = self.config.endpoint(path)?;
        tracing::trace!(%url, "NetNutrition POST");

        let response = self
            .client
            .post(url)
            .form(form)
            .send()
            .await
            .map_err(|e| SourceError::Http(format!("{path} request failed: {e}")))?
            .error_for_status()
            .map_err(|e| SourceError::Http(format!("{path} HTTP error: {e}")))?;

        let body = response
            .text()
            .await
            .map_err(|e| SourceError::Http(format!("{path} response read failed: {e}")))?;

        tracing::trace!(bytes = body.len(), path, "NetNutrition response received");
        Ok(parse::extract_panel_html(&body))
    }

    async fn meal_listing(&self, link: &MenuLink) -> Result<MealListing, SourceError> {
        let html = self.post(SELECT_MENU, &[("menuOid", link.oid.as_str())]).await?;
        let items = parse::parse_menu_items(&html)?;
        Ok(MealListing {
            name: link.name.clone(),
            items,
        })
    }
}

impl CatalogSource for NetNutritionSource {
    async fn fetch_weekly_menu(&self, unit: &str) -> Result<WeeklyListing, SourceError> {
        tracing::debug!(unit, "fetching weekly menu");
        let oid = self.unit_oid(unit).await?;
        let html = self.post(SELECT_UNIT, &[("unitOid", oid.as_str())]).await?;
        let cards = parse::parse_weekly_menu(&html)?;

        let mut days = Vec::with_capacity(cards.len());
        for (day, links) in cards {
            let mut meals = Vec::with_capacity(links.len());
            for link in &links {
                meals.push(self.meal_listing(link).await?);
            }
            days.push(DayListing { day, meals });
        }

        let listing = WeeklyListing {
            unit: unit.to_owned(),
            days,
        };
        tracing::debug!(unit, meals = listing.meal_count(), "weekly menu fetched");
        Ok(listing)
    }

    async fn fetch_hours(&self, unit: &str) -> Result<WeeklyHours, SourceError> {
        let oid = self.unit_oid(unit).await?;
        let html = self.post(UNIT_HOURS, &[("unitOid", oid.as_str())]).await?;
        let days = parse::parse_hours(&html)?;
        tracing::debug!(unit, days = ?parse::hours::days_covered(&days), "hours fetched");
        Ok(WeeklyHours {
            unit: unit.to_owned(),
            days,
        })
    }

    async fn reset_selection(&self) -> Result<(), SourceError> {
        self.post(RESET_SELECTIONS, &[]).await.map(|_| ())
    }
}
