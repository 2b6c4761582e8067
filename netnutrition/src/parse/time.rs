//! Weekday and time-of-day parsing for scraped cells.

use chrono::{NaiveTime, Weekday};

/// Parse a weekday cell ("Monday", "mon", " TUESDAY ").
pub fn parse_weekday(text: &str) -> Option<Weekday> {
    text.trim().parse::<Weekday>().ok()
}

/// Parse a time-of-day cell.
///
/// Accepts `7:00 AM`, `7 AM`, `7:00am`, `7pm`, `7:30 p.m.`, `noon`,
/// `midnight` and 24-hour `19:00`.
pub fn parse_time_of_day(text: &str) -> Option<NaiveTime> {
    let compact: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '.')
        .collect::<String>()
        .to_ascii_uppercase();

    match compact.as_str() {
        "" => return None,
        "NOON" => return NaiveTime::from_hms_opt(12, 0, 0),
        "MIDNIGHT" => return NaiveTime::from_hms_opt(0, 0, 0),
        _ => {}
    }

    let (clock, meridiem) = if let Some(rest) = compact.strip_suffix("AM") {
        (rest, Some(false))
    } else if let Some(rest) = compact.strip_suffix("PM") {
        (rest, Some(true))
    } else {
        (compact.as_str(), None)
    };

    let (hour, minute) = match clock.split_once(':') {
        Some((h, m)) => (h.parse::<u32>().ok()?, m.parse::<u32>().ok()?),
        None => (clock.parse::<u32>().ok()?, 0),
    };

    let hour = match meridiem {
        Some(pm) => {
            if hour == 0 || hour > 12 {
                return None;
            }
            hour % 12 + if pm { 12 } else { 0 }
        }
        None => hour,
    };

    NaiveTime::from_hms_opt(hour, minute, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn twelve_hour_forms() {
        assert_eq!(parse_time_of_day("7:00 AM"), Some(t(7, 0)));
        assert_eq!(parse_time_of_day("7 AM"), Some(t(7, 0)));
        assert_eq!(parse_time_of_day("7:30pm"), Some(t(19, 30)));
        assert_eq!(parse_time_of_day("12:00 PM"), Some(t(12, 0)));
        assert_eq!(parse_time_of_day("12:15 AM"), Some(t(0, 15)));
        assert_eq!(parse_time_of_day("8:00 p.m."), Some(t(20, 0)));
    }

    #[test]
    fn twenty_four_hour_and_words() {
        assert_eq!(parse_time_of_day("19:00"), Some(t(19, 0)));
        assert_eq!(parse_time_of_day("Noon"), Some(t(12, 0)));
        assert_eq!(parse_time_of_day("midnight"), Some(t(0, 0)));
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(parse_time_of_day(""), None);
        assert_eq!(parse_time_of_day("Closed"), None);
        assert_eq!(parse_time_of_day("13 PM"), None);
        assert_eq!(parse_time_of_day("7:75 AM"), None);
    }

    #[test]
    fn weekdays() {
        assert_eq!(parse_weekday("Monday"), Some(Weekday::Mon));
        assert_eq!(parse_weekday(" sat "), Some(Weekday::Sat));
        assert_eq!(parse_weekday("7:00 AM"), None);
    }
}
