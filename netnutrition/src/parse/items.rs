//! Menu item parsing (`Menu/SelectMenu`).

use crate::error::SourceError;
use crate::types::ItemEntry;

use super::{clean_text, selector};

const GROUP_ROW: &str = "cbo_nn_itemGroupRow";

/// Parse a meal's item table into entries tagged with their station.
///
/// Rows are either station headers (`cbo_nn_itemGroupRow`) or items
/// (`cbo_nn_itemHover`), interleaved in page order. Headers reading
/// `"None"` or blank are placeholders and leave items without a station.
pub fn parse_menu_items(html: &str) -> Result<Vec<ItemEntry>, SourceError> {
    let document = scraper::Html::parse_fragment(html);
    let row_sel = selector(".cbo_nn_itemGroupRow, .cbo_nn_itemHover")?;

    let mut station: Option<String> = None;
    let mut items = Vec::new();

    for row in document.select(&row_sel) {
        let text = clean_text(row.text());
        if row.value().classes().any(|c| c == GROUP_ROW) {
            station = if text.is_empty() || text.eq_ignore_ascii_case("none") {
                None
            } else {
                Some(text)
            };
            continue;
        }

        if text.is_empty() {
            continue;
        }
        items.push(ItemEntry {
            station: station.clone(),
            name: text,
        });
    }

    tracing::trace!(count = items.len(), "menu items parsed");
    Ok(items)
}
