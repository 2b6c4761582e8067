//! Markup parsers for NetNutrition pages.
//!
//! Every parser takes a markup string and is independent of the network,
//! so they are tested against inline fixtures.

pub mod hours;
pub mod items;
pub mod menu;
pub mod time;
pub mod units;

use scraper::Selector;

use crate::error::SourceError;

pub use hours::parse_hours;
pub use items::parse_menu_items;
pub use menu::{MenuLink, parse_weekly_menu};
pub use time::{parse_time_of_day, parse_weekday};
pub use units::parse_unit_directory;

/// Unwrap the markup from a NetNutrition response body.
///
/// The POST endpoints answer with a JSON envelope
/// `{"success": true, "panels": [{"id": "...", "html": "..."}]}`; the
/// landing page is plain HTML. Panel markup is concatenated in order.
pub fn extract_panel_html(body: &str) -> String {
    let trimmed = body.trim_start();
    if !trimmed.starts_with('{') {
        return body.to_owned();
    }

    let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) else {
        return body.to_owned();
    };

    let panels = value
        .get("panels")
        .and_then(|p| p.as_array())
        .map(|panels| {
            panels
                .iter()
                .filter_map(|panel| panel.get("html").and_then(|h| h.as_str()))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default();

    if panels.is_empty() {
        value
            .get("html")
            .and_then(|h| h.as_str())
            .map(str::to_owned)
            .unwrap_or_default()
    } else {
        panels
    }
}

/// Parse a CSS selector, mapping failures to [`SourceError::Parse`].
pub(crate) fn selector(css: &str) -> Result<Selector, SourceError> {
    Selector::parse(css).map_err(|e| SourceError::Parse(format!("invalid selector {css}: {e:?}")))
}

/// Pull the numeric oid out of a handler such as
/// `javascript:unitsSelectUnit(12);` or `menuListSelectMenu(4411)`.
pub(crate) fn extract_oid(handler: &str) -> Option<String> {
    let open = handler.find('(')?;
    let close = handler[open..].find(')')? + open;
    let inner = handler[open + 1..close].trim().trim_matches(|c| c == '\'' || c == '"');
    let digits: String = inner.chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() { None } else { Some(digits) }
}

/// Collapse runs of whitespace and trim.
pub(crate) fn clean_text<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
