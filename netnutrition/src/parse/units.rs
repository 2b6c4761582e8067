//! Unit directory parsing (landing page).

use crate::error::SourceError;

use super::{clean_text, extract_oid, selector};

/// Parse the landing page into `(unit name, unit oid)` pairs in page order.
///
/// Unit links carry their oid in an `onclick="javascript:unitsSelectUnit(N);"`
/// handler, or in a `data-unitoid` attribute on newer skins. Links without a
/// recoverable oid are skipped.
pub fn parse_unit_directory(html: &str) -> Result<Vec<(String, String)>, SourceError> {
    let document = scraper::Html::parse_document(html);
    let unit_sel = selector(".d-flex.flex-wrap.col-9.p-0, [onclick*='SelectUnit'], [data-unitoid]")?;

    let mut units: Vec<(String, String)> = Vec::new();
    for element in document.select(&unit_sel) {
        let name = clean_text(element.text());
        if name.is_empty() {
            continue;
        }

        let oid = element
            .value()
            .attr("data-unitoid")
            .map(str::to_owned)
            .or_else(|| element.value().attr("onclick").and_then(extract_oid));
        let Some(oid) = oid else {
            tracing::trace!(unit = %name, "unit link without oid skipped");
            continue;
        };

        if !units.iter().any(|(existing, _)| existing == &name) {
            units.push((name, oid));
        }
    }

    tracing::debug!(count = units.len(), "unit directory parsed");
    Ok(units)
}
