//! Hours-of-operation parsing (`Unit/GetHoursOfOperationMarkup`).

use chrono::{NaiveTime, Weekday};

use crate::error::SourceError;
use crate::types::{DayHours, HoursBlock};

use super::{clean_text, parse_time_of_day, parse_weekday, selector};

/// Parse the hours table into per-day blocks in scrape order.
///
/// The markup is a flat run of `td` cells: a weekday name followed by
/// either `Closed` or an open time and a close time (occasionally both in
/// one `7:00 AM - 10:00 AM` cell). A weekday may appear several times, once
/// per serving period. Entries whose times cannot be read are dropped, so a
/// malformed day ends up with fewer blocks (possibly none).
pub fn parse_hours(html: &str) -> Result<Vec<DayHours>, SourceError> {
    let document = scraper::Html::parse_fragment(html);
    let cell_sel = selector("td")?;
    let cells: Vec<String> = document
        .select(&cell_sel)
        .map(|td| clean_text(td.text()))
        .collect();

    let mut days: Vec<DayHours> = Vec::new();
    let mut index = 0;

    while index < cells.len() {
        let Some(day) = parse_weekday(&cells[index]) else {
            index += 1;
            continue;
        };

        let next = cells.get(index + 1).map(String::as_str).unwrap_or_default();
        let (block, consumed) = if next.eq_ignore_ascii_case("closed") {
            (Some(HoursBlock::Closed), 2)
        } else if let Some((opens, closes)) = parse_range(next) {
            (Some(HoursBlock::open(opens, closes)), 2)
        } else {
            let closes = cells.get(index + 2).and_then(|c| parse_time_of_day(c));
            match (parse_time_of_day(next), closes) {
                (Some(opens), Some(closes)) => (Some(HoursBlock::open(opens, closes)), 3),
                _ => {
                    tracing::debug!(?day, cell = %next, "unreadable hours entry dropped");
                    (None, 1)
                }
            }
        };

        let entry = match days.iter_mut().position(|d| d.day == day) {
            Some(pos) => &mut days[pos],
            None => {
                days.push(DayHours {
                    day,
                    blocks: Vec::new(),
                });
                let last = days.len() - 1;
                &mut days[last]
            }
        };
        if let Some(block) = block {
            entry.blocks.push(block);
        }

        index += consumed;
    }

    Ok(days)
}

/// Parse a single-cell range such as `7:00 AM - 10:00 AM` or `11am to 2pm`.
fn parse_range(cell: &str) -> Option<(NaiveTime, NaiveTime)> {
    let (open, close) = cell
        .split_once(" - ")
        .or_else(|| cell.split_once('-'))
        .or_else(|| cell.split_once(" to "))?;
    Some((parse_time_of_day(open)?, parse_time_of_day(close)?))
}

/// Days present in `days` in Sunday-first order, for stable logging.
pub fn days_covered(days: &[DayHours]) -> Vec<Weekday> {
    let mut covered: Vec<Weekday> = days.iter().map(|d| d.day).collect();
    covered.sort_by_key(Weekday::num_days_from_sunday);
    covered
}
