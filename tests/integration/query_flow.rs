//! Arguments in, meal slots out: classifier, registry and service over a
//! freshly refreshed snapshot.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime, Weekday};
use vandydine::classifier::{Classifier, MealSelection};
use vandydine::config::default_facilities;
use vandydine::error::ErrorKind;
use vandydine::model::{HoursStatus, MealKind};
use vandydine::registry::{AliasRegistry, Operation};
use vandydine::service::DiningService;

use crate::helpers::{ScriptedSource, scheduler, t};

/// 2026-10-12 is a Monday.
fn monday_at(h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 10, 12)
        .unwrap()
        .and_time(t(h, m))
}

async fn refreshed_service() -> DiningService {
    let dir = tempfile::tempdir().unwrap();
    let source = ScriptedSource::new(&["Rand Dining Center", "Kissam Kitchen"]);
    let scheduler = scheduler(&source, &dir, 2);
    scheduler.trigger().await;
    DiningService::from_snapshot((*scheduler.snapshot()).clone())
}

fn classifier() -> Classifier {
    Classifier::new(&default_facilities(), &BTreeMap::new(), 5)
}

#[tokio::test]
async fn bare_facility_resolves_next_meal() {
    let service = refreshed_service().await;
    let selection = classifier().classify(&["kitchen"], Weekday::Mon).unwrap();
    assert_eq!(selection.meals, MealSelection::Next);

    let answers = service.answer(&selection, monday_at(10, 30));
    assert_eq!(answers.len(), 1);
    let slot = answers[0].result.as_ref().unwrap();
    assert_eq!(slot.facility, "kissam");
    assert_eq!(slot.kind, MealKind::Lunch);
    assert_eq!(slot.items["Grill"], vec!["Burger".to_owned()]);
}

#[tokio::test]
async fn explicit_meal_and_day_fan_out() {
    let service = refreshed_service().await;
    let selection = classifier()
        .classify(&["rand", "kissam", "breakfast", "tomorrow"], Weekday::Mon)
        .unwrap();
    assert_eq!(selection.days, vec![Weekday::Tue]);

    let answers = service.answer(&selection, monday_at(12, 0));
    assert_eq!(answers.len(), 2);
    for answer in &answers {
        let slot = answer.result.as_ref().unwrap();
        assert_eq!(slot.day, Weekday::Tue);
        assert_eq!(slot.kind, MealKind::Breakfast);
        assert_eq!(slot.opens_at, t(7, 0));
    }
}

#[tokio::test]
async fn brunch_falls_back_to_breakfast() {
    let service = refreshed_service().await;
    let selection = classifier()
        .classify(&["rand", "brunch", "wednesday"], Weekday::Mon)
        .unwrap();
    let answers = service.answer(&selection, monday_at(12, 0));
    let slot = answers[0].result.as_ref().unwrap();
    assert_eq!(slot.kind, MealKind::Breakfast);
}

#[tokio::test]
async fn unlisted_meal_and_facility_report_per_answer() {
    let service = refreshed_service().await;
    let selection = classifier()
        .classify(&["rand", "commons", "dinner"], Weekday::Mon)
        .unwrap();
    let answers = service.answer(&selection, monday_at(12, 0));
    assert_eq!(answers.len(), 2);
    assert!(
        answers
            .iter()
            .all(|a| a.result.as_ref().unwrap_err().kind() == ErrorKind::MenuNotFound)
    );
}

#[tokio::test]
async fn another_day_without_meal_lists_everything() {
    let service = refreshed_service().await;
    let selection = classifier()
        .classify(&["rand", "friday"], Weekday::Mon)
        .unwrap();
    assert_eq!(selection.meals, MealSelection::All);

    let answers = service.answer(&selection, monday_at(12, 0));
    let kinds: Vec<MealKind> = answers
        .iter()
        .map(|a| a.result.as_ref().unwrap().kind.clone())
        .collect();
    assert_eq!(kinds, vec![MealKind::Breakfast, MealKind::Lunch]);
}

#[tokio::test]
async fn saturday_closed_hours_flow_through() {
    let service = refreshed_service().await;
    // One closed marker for two meals: breakfast takes it, lunch stays unknown.
    let lines = service.facility_hours("rand", Weekday::Sat).unwrap();
    let status: Vec<(MealKind, HoursStatus)> =
        lines.iter().map(|l| (l.kind.clone(), l.status)).collect();
    assert_eq!(
        status,
        vec![
            (MealKind::Breakfast, HoursStatus::Closed),
            (MealKind::Lunch, HoursStatus::NotFound),
            (MealKind::DailyOfferings, HoursStatus::Closed),
        ]
    );

    let weekday = service.facility_hours("rand", Weekday::Mon).unwrap();
    let daily = weekday.iter().find(|l| l.kind.is_daily()).unwrap();
    assert_eq!(daily.status, HoursStatus::Available);
    assert_eq!((daily.opens_at, daily.closes_at), (t(7, 0), t(14, 0)));
}

#[tokio::test]
async fn shortcut_command_expands_into_query() {
    let service = refreshed_service().await;
    let registry = AliasRegistry::from_facilities(&default_facilities()).unwrap();

    let expansion = registry
        .expand("kissam", &["menu", "lunch"])
        .unwrap()
        .unwrap();
    assert_eq!(expansion.operation, Operation::Menu);

    let selection = classifier()
        .classify(&expansion.tokens, Weekday::Mon)
        .unwrap();
    let answers = service.answer(&selection, monday_at(8, 0));
    let slot = answers[0].result.as_ref().unwrap();
    assert_eq!((slot.facility.as_str(), &slot.kind), ("kissam", &MealKind::Lunch));

    let err = registry.expand("kissam", &["lunch"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingScope);
}

#[test]
fn classification_errors_surface_before_lookup() {
    let classifier = classifier();
    let err = classifier.classify(&["lunch"], Weekday::Mon).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoFacilityProvided);

    let err = classifier.classify(&["rand", "pizza"], Weekday::Mon).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnrecognizedArgument);

    let err = classifier.classify(&["java"], Weekday::Mon).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MenuNotAvailable);
}
