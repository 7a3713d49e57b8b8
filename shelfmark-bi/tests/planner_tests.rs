//! Row planner behavior tests

use chrono::NaiveDate;
use shelfmark_bi::import::csv::{parse_goodreads_csv, CsvRow};
use shelfmark_bi::import::planner::{plan_row, TargetCollection};
use shelfmark_bi::models::issue::codes;
use shelfmark_bi::models::{ImportOptions, Judgment};

const HEADER: &str = "Title,Author,ISBN,ISBN13,My Rating,Date Read,Date Added,Exclusive Shelf";

fn parse_row(fields: &str) -> CsvRow {
    let text = format!("{}\n{}\n", HEADER, fields);
    parse_goodreads_csv(&text).unwrap().remove(0)
}

fn mapping_options() -> ImportOptions {
    ImportOptions {
        map_ratings: true,
        ..Default::default()
    }
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
}

#[test]
fn read_row_with_only_read_date_infers_start() {
    // Given: a finished book whose added date is blank
    let row = parse_row("Dune,Frank Herbert,,9780441013593,5,2020/3/15,,read");

    // When: the row is planned with star5 → accepted
    let plan = plan_row(&row, &mapping_options(), today());

    // Then: both dates land on the read date, with one start-date inference
    assert_eq!(plan.target, TargetCollection::Reading);
    assert_eq!(plan.started_at, NaiveDate::from_ymd_opt(2020, 3, 15));
    assert_eq!(plan.finished_at, NaiveDate::from_ymd_opt(2020, 3, 15));
    assert_eq!(plan.judgment, Some(Judgment::Accepted));
    assert_eq!(plan.warnings.len(), 1);
    assert_eq!(plan.warnings[0].code, codes::INFERRED_START_DATE);
}

#[test]
fn read_row_with_both_dates_plans_cleanly() {
    let row = parse_row("Dune,Frank Herbert,,,0,2020/3/15,2020/1/2,read");
    let plan = plan_row(&row, &mapping_options(), today());

    assert_eq!(plan.started_at, NaiveDate::from_ymd_opt(2020, 1, 2));
    assert_eq!(plan.finished_at, NaiveDate::from_ymd_opt(2020, 3, 15));
    // Zero rating is unjudged
    assert_eq!(plan.judgment, None);
    assert!(plan.warnings.is_empty());
}

#[test]
fn read_row_without_read_date_copies_start_to_finish() {
    let row = parse_row("Dune,Frank Herbert,,,0,,2020/1/2,read");
    let plan = plan_row(&row, &mapping_options(), today());

    assert_eq!(plan.started_at, NaiveDate::from_ymd_opt(2020, 1, 2));
    assert_eq!(plan.finished_at, NaiveDate::from_ymd_opt(2020, 1, 2));
    assert_eq!(plan.warnings.len(), 1);
    assert_eq!(plan.warnings[0].code, codes::INFERRED_END_DATE);
}

#[test]
fn currently_reading_row_has_no_finish_date() {
    let row = parse_row("Hyperion,Dan Simmons,,,0,,2024/2/10,currently-reading");
    let plan = plan_row(&row, &mapping_options(), today());

    assert_eq!(plan.target, TargetCollection::Reading);
    assert_eq!(plan.started_at, NaiveDate::from_ymd_opt(2024, 2, 10));
    assert_eq!(plan.finished_at, None);
    assert!(plan.warnings.is_empty());
}

#[test]
fn currently_reading_without_dates_starts_today() {
    let row = parse_row("Hyperion,Dan Simmons,,,0,,,currently-reading");
    let plan = plan_row(&row, &mapping_options(), today());

    assert_eq!(plan.started_at, Some(today()));
    assert_eq!(plan.warnings.len(), 1);
    assert_eq!(plan.warnings[0].code, codes::INFERRED_START_DATE);
}

#[test]
fn to_read_row_carries_no_dates_or_judgment() {
    // A rating on a to-read shelf is ignored
    let row = parse_row("Hyperion,Dan Simmons,,,5,,,to-read");
    let plan = plan_row(&row, &mapping_options(), today());

    assert_eq!(plan.target, TargetCollection::Planned);
    assert_eq!(plan.started_at, None);
    assert_eq!(plan.finished_at, None);
    assert_eq!(plan.judgment, None);
    assert!(plan.warnings.is_empty());
}

#[test]
fn unrecognized_shelf_with_read_date_becomes_read() {
    let row = parse_row("Dune,Frank Herbert,,,0,2020/3/15,,favorites");
    let plan = plan_row(&row, &mapping_options(), today());

    assert_eq!(plan.target, TargetCollection::Reading);
    assert_eq!(plan.finished_at, NaiveDate::from_ymd_opt(2020, 3, 15));
    let status_warnings: Vec<_> = plan
        .warnings
        .iter()
        .filter(|w| w.code == codes::INFERRED_STATUS)
        .collect();
    assert_eq!(status_warnings.len(), 1);
    assert_eq!(
        status_warnings[0].inference.as_deref(),
        Some("status←read")
    );
}

#[test]
fn empty_shelf_without_dates_becomes_planned() {
    let row = parse_row("Dune,Frank Herbert,,,0,,,");
    let plan = plan_row(&row, &mapping_options(), today());

    assert_eq!(plan.target, TargetCollection::Planned);
    assert_eq!(plan.warnings.len(), 1);
    assert_eq!(plan.warnings[0].code, codes::INFERRED_STATUS);
    assert_eq!(
        plan.warnings[0].inference.as_deref(),
        Some("status←to-read")
    );
}

#[test]
fn rating_mapping_disabled_yields_unjudged() {
    let row = parse_row("Dune,Frank Herbert,,,5,2020/3/15,2020/1/2,read");
    let plan = plan_row(&row, &ImportOptions::default(), today());
    assert_eq!(plan.judgment, None);
}

#[test]
fn unjudged_mapping_entry_resolves_to_none() {
    // Default table maps three stars to unjudged
    let row = parse_row("Dune,Frank Herbert,,,3,2020/3/15,2020/1/2,read");
    let plan = plan_row(&row, &mapping_options(), today());
    assert_eq!(plan.judgment, None);
}

#[test]
fn low_rating_maps_to_rejected() {
    let row = parse_row("Dune,Frank Herbert,,,1,2020/3/15,2020/1/2,read");
    let plan = plan_row(&row, &mapping_options(), today());
    assert_eq!(plan.judgment, Some(Judgment::Rejected));
}

#[test]
fn plan_row_is_deterministic() {
    let row = parse_row("Dune,Frank Herbert,,,5,2020/3/15,,read");
    let options = mapping_options();

    let first = plan_row(&row, &options, today());
    let second = plan_row(&row, &options, today());

    assert_eq!(first, second);
}

#[test]
fn shelf_matching_is_case_insensitive() {
    let row = parse_row("Dune,Frank Herbert,,,0,,2020/1/2, Currently-Reading ");
    let plan = plan_row(&row, &mapping_options(), today());
    assert_eq!(plan.target, TargetCollection::Reading);
    assert_eq!(plan.finished_at, None);
}
