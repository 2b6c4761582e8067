//! Query argument classifier: free-text tokens → facilities, days, meals.
//!
//! Tokens may come in any order and may repeat. Each one is tried as a
//! facility, then a meal, then a day keyword; anything else is rejected.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::str::FromStr;

use chrono::Weekday;

use crate::config::{DiningConfig, FacilityConfig};
use crate::error::{DiningError, Result};
use crate::model::MealKind;

/// Normalise a user token: lowercase, apostrophes dropped, spaces and
/// underscores turned into hyphens.
pub fn normalize_token(token: &str) -> String {
    token
        .trim()
        .to_lowercase()
        .replace('\'', "")
        .replace([' ', '_'], "-")
}

/// Which meals a selection asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MealSelection {
    /// The next available meal on each day.
    Next,
    /// Every listed meal on each day.
    All,
    /// Specific kinds, in canonical order.
    Kinds(Vec<MealKind>),
}

impl MealSelection {
    fn count(&self) -> usize {
        match self {
            Self::Next | Self::All => 1,
            Self::Kinds(kinds) => kinds.len(),
        }
    }
}

/// A classified query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Facility ids in the order first mentioned.
    pub facilities: Vec<String>,
    /// Days in the order first mentioned.
    pub days: Vec<Weekday>,
    pub meals: MealSelection,
}

impl Selection {
    /// Number of results this selection fans out into.
    pub fn result_count(&self) -> usize {
        self.facilities.len() * self.days.len() * self.meals.count()
    }
}

#[derive(Debug, Clone)]
enum MealToken {
    Kind(MealKind),
    All,
    Next,
}

/// Token tables built once from configuration.
#[derive(Debug, Clone)]
pub struct Classifier {
    facilities: HashMap<String, String>,
    hours_only: HashMap<String, String>,
    meals: HashMap<String, MealToken>,
    max_selections: usize,
}

impl Classifier {
    pub fn new(
        facilities: &[FacilityConfig],
        meal_aliases: &BTreeMap<String, String>,
        max_selections: usize,
    ) -> Self {
        let mut menu_names = HashMap::new();
        let mut hours_only = HashMap::new();
        for facility in facilities {
            let names = std::iter::once(&facility.id).chain(&facility.aliases);
            for name in names {
                if facility.menu {
                    menu_names.insert(normalize_token(name), facility.id.clone());
                } else {
                    hours_only.insert(normalize_token(name), facility.unit.clone());
                }
            }
        }

        let mut meals: HashMap<String, MealToken> = [
            ("breakfast", MealKind::Breakfast),
            ("brunch", MealKind::Brunch),
            ("lunch", MealKind::Lunch),
            ("dinner", MealKind::Dinner),
            ("late-night", MealKind::LateNight),
            ("latenight", MealKind::LateNight),
            ("daily", MealKind::DailyOfferings),
            ("daily-offerings", MealKind::DailyOfferings),
            ("all-day", MealKind::DailyOfferings),
        ]
        .into_iter()
        .map(|(name, kind)| (name.to_owned(), MealToken::Kind(kind)))
        .collect();
        meals.insert("all".into(), MealToken::All);
        meals.insert("next".into(), MealToken::Next);

        for (alias, target) in meal_aliases {
            let token = match normalize_token(target).as_str() {
                "all" => MealToken::All,
                "next" => MealToken::Next,
                _ => MealToken::Kind(MealKind::from_upstream(&target.replace(['-', '_'], " "))),
            };
            meals.insert(normalize_token(alias), token);
        }

        Self {
            facilities: menu_names,
            hours_only,
            meals,
            max_selections,
        }
    }

    pub fn from_config(config: &DiningConfig) -> Self {
        Self::new(
            &config.facilities,
            &config.meals,
            config.query.max_selections,
        )
    }

    /// Resolve a facility name or alias to its id.
    pub fn facility_id(&self, token: &str) -> Option<&str> {
        self.facilities
            .get(&normalize_token(token))
            .map(String::as_str)
    }

    /// Classify `tokens` relative to `today`.
    ///
    /// Without a day the query is for today. Without a meal it asks for the
    /// next meal when the only day is today, otherwise for all meals.
    ///
    /// # Errors
    ///
    /// [`DiningError::UnrecognizedArgument`] for the first unknown token,
    /// [`DiningError::MenuNotAvailable`] for an hours-only facility,
    /// [`DiningError::NoFacilityProvided`] and [`DiningError::TooManySelections`].
    pub fn classify<S: AsRef<str>>(&self, tokens: &[S], today: Weekday) -> Result<Selection> {
        let mut facilities: Vec<String> = Vec::new();
        let mut days: Vec<Weekday> = Vec::new();
        let mut kinds: BTreeSet<MealKind> = BTreeSet::new();
        let mut all = false;
        let mut next = false;

        for raw in tokens {
            let token = normalize_token(raw.as_ref());
            if token.is_empty() {
                continue;
            }

            if let Some(id) = self.facilities.get(&token) {
                if !facilities.contains(id) {
                    facilities.push(id.clone());
                }
            } else if let Some(meal) = self.meals.get(&token) {
                match meal {
                    MealToken::All => all = true,
                    MealToken::Next => next = true,
                    MealToken::Kind(kind) => {
                        kinds.insert(kind.clone());
                    }
                }
            } else if let Some(day) = parse_day(&token, today) {
                if !days.contains(&day) {
                    days.push(day);
                }
            } else if let Some(unit) = self.hours_only.get(&token) {
                return Err(DiningError::MenuNotAvailable {
                    facility: unit.clone(),
                });
            } else {
                return Err(DiningError::UnrecognizedArgument {
                    token: raw.as_ref().trim().to_owned(),
                });
            }
        }

        if facilities.is_empty() {
            return Err(DiningError::NoFacilityProvided);
        }
        if days.is_empty() {
            days.push(today);
        }

        let meals = if all {
            MealSelection::All
        } else if !kinds.is_empty() {
            MealSelection::Kinds(kinds.into_iter().collect())
        } else if next || days == [today] {
            MealSelection::Next
        } else {
            MealSelection::All
        };

        let selection = Selection {
            facilities,
            days,
            meals,
        };
        let requested = selection.result_count();
        if requested > self.max_selections {
            return Err(DiningError::TooManySelections {
                requested,
                max: self.max_selections,
            });
        }
        Ok(selection)
    }
}

/// `today`, `tomorrow` or a weekday name, already normalized.
pub fn parse_day(token: &str, today: Weekday) -> Option<Weekday> {
    match token {
        "today" => Some(today),
        "tomorrow" => Some(today.succ()),
        other => Weekday::from_str(other).ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn classifier() -> Classifier {
        let config = DiningConfig::default();
        Classifier::from_config(&config)
    }

    #[test]
    fn normalize_handles_case_apostrophes_and_separators() {
        assert_eq!(normalize_token("Suzie's"), "suzies");
        assert_eq!(normalize_token(" Late Night "), "late-night");
        assert_eq!(normalize_token("kissam_kitchen"), "kissam-kitchen");
    }

    #[test]
    fn facility_and_tomorrow_defaults_to_all() {
        let selection = classifier()
            .classify(&["commons", "tomorrow"], Weekday::Mon)
            .unwrap();
        assert_eq!(selection.facilities, vec!["commons"]);
        assert_eq!(selection.days, vec![Weekday::Tue]);
        assert_eq!(selection.meals, MealSelection::All);
    }

    #[test]
    fn meals_without_day_default_to_today() {
        let selection = classifier()
            .classify(&["kissam", "lunch", "dinner"], Weekday::Thu)
            .unwrap();
        assert_eq!(selection.facilities, vec!["kissam"]);
        assert_eq!(selection.days, vec![Weekday::Thu]);
        assert_eq!(
            selection.meals,
            MealSelection::Kinds(vec![MealKind::Lunch, MealKind::Dinner])
        );
    }

    #[test]
    fn facility_alone_asks_for_next_meal() {
        let selection = classifier().classify(&["Kitchen"], Weekday::Fri).unwrap();
        assert_eq!(selection.facilities, vec!["kissam"]);
        assert_eq!(selection.meals, MealSelection::Next);
    }

    #[test]
    fn naming_todays_weekday_still_means_next() {
        let selection = classifier()
            .classify(&["rand", "friday"], Weekday::Fri)
            .unwrap();
        assert_eq!(selection.meals, MealSelection::Next);
    }

    #[test]
    fn order_does_not_matter_and_duplicates_collapse() {
        let c = classifier();
        let a = c.classify(&["dinner", "wed", "rand"], Weekday::Mon).unwrap();
        let b = c
            .classify(&["rand", "Wednesday", "dinner", "rand", "DINNER"], Weekday::Mon)
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(a.result_count(), 1);
    }

    #[test]
    fn all_wins_over_specific_meals() {
        let selection = classifier()
            .classify(&["rand", "lunch", "all"], Weekday::Mon)
            .unwrap();
        assert_eq!(selection.meals, MealSelection::All);
    }

    #[test]
    fn no_tokens_is_missing_facility() {
        let err = classifier().classify::<&str>(&[], Weekday::Mon).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoFacilityProvided);
    }

    #[test]
    fn unknown_token_is_rejected() {
        let err = classifier()
            .classify(&["rand", "pizza"], Weekday::Mon)
            .unwrap_err();
        assert!(matches!(
            err,
            DiningError::UnrecognizedArgument { ref token } if token == "pizza"
        ));
    }

    #[test]
    fn hours_only_facility_has_no_menu() {
        let err = classifier()
            .classify(&["Suzie's"], Weekday::Mon)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MenuNotAvailable);
    }

    #[test]
    fn six_facilities_exceed_cap_of_five() {
        let err = classifier()
            .classify(
                &["commons", "ebi", "kissam", "rand", "zeppos", "rothschild"],
                Weekday::Mon,
            )
            .unwrap_err();
        assert!(matches!(
            err,
            DiningError::TooManySelections {
                requested: 6,
                max: 5
            }
        ));
    }

    #[test]
    fn cap_counts_days_and_meals() {
        let err = classifier()
            .classify(&["rand", "mon", "tue", "lunch", "dinner", "brunch"], Weekday::Sun)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TooManySelections);
    }

    #[test]
    fn configured_meal_aliases_are_recognised() {
        let mut config = DiningConfig::default();
        config.meals.insert("bfast".into(), "breakfast".into());
        config.meals.insert("supper".into(), "Dinner".into());
        config.meals.insert("whatever".into(), "next".into());
        let c = Classifier::from_config(&config);

        let selection = c.classify(&["rand", "bfast", "supper"], Weekday::Mon).unwrap();
        assert_eq!(
            selection.meals,
            MealSelection::Kinds(vec![MealKind::Breakfast, MealKind::Dinner])
        );
        let selection = c.classify(&["rand", "sat", "whatever"], Weekday::Mon).unwrap();
        assert_eq!(selection.meals, MealSelection::Next);
    }
}
