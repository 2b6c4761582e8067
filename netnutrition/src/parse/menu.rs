//! Weekly menu card parsing (`Unit/SelectUnitFromUnitsList`).

use chrono::Weekday;

use crate::error::SourceError;

use super::{clean_text, extract_oid, parse_weekday, selector};

/// A meal link on a day card; `oid` is the menu oid for `Menu/SelectMenu`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuLink {
    pub name: String,
    pub oid: String,
}

/// Parse the unit's menu panel into per-day meal links, in page order.
///
/// Each day is a `.card-block` whose `header` reads like
/// `"Monday, October 12, 2026"`. Cards whose header does not start with a
/// weekday are ignored.
pub fn parse_weekly_menu(html: &str) -> Result<Vec<(Weekday, Vec<MenuLink>)>, SourceError> {
    let document = scraper::Html::parse_fragment(html);
    let card_sel = selector(".card-block")?;
    let header_sel = selector("header")?;
    let link_sel = selector(".cbo_nn_menuLinkCell")?;
    let anchor_sel = selector("a")?;

    let mut days: Vec<(Weekday, Vec<MenuLink>)> = Vec::new();

    for card in document.select(&card_sel) {
        let Some(header) = card.select(&header_sel).next() else {
            continue;
        };
        let header_text = clean_text(header.text());
        let day_name = header_text.split(',').next().unwrap_or_default();
        let Some(day) = parse_weekday(day_name) else {
            tracing::trace!(header = %header_text, "menu card without weekday header skipped");
            continue;
        };

        let mut meals = Vec::new();
        for cell in card.select(&link_sel) {
            let name = clean_text(cell.text());
            if name.is_empty() {
                continue;
            }
            let oid = cell
                .value()
                .attr("data-menuoid")
                .map(str::to_owned)
                .or_else(|| cell.value().attr("onclick").and_then(extract_oid))
                .or_else(|| {
                    cell.select(&anchor_sel)
                        .find_map(|a| a.value().attr("onclick").and_then(extract_oid))
                });
            match oid {
                Some(oid) => meals.push(MenuLink { name, oid }),
                None => tracing::trace!(meal = %name, "meal link without oid skipped"),
            }
        }

        match days.iter_mut().find(|(d, _)| *d == day) {
            Some((_, existing)) => existing.extend(meals),
            None => days.push((day, meals)),
        }
    }

    tracing::debug!(days = days.len(), "weekly menu parsed");
    Ok(days)
}
