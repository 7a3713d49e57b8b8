//! Row planning: shelf, date, and judgment inference
//!
//! `plan_row` is pure and total: every row yields a plan, and ambiguous or
//! contradictory source columns are resolved by documented defaults that
//! surface as inference warnings rather than errors.

use chrono::NaiveDate;

use crate::import::csv::CsvRow;
use crate::models::issue::codes;
use crate::models::{ImportOptions, Judgment, RatingOutcome};

/// Which collection a row lands in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetCollection {
    Reading,
    Planned,
}

/// One inference made while planning a row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanWarning {
    pub code: &'static str,
    pub message: String,
    /// Short inference-rule string for the audit trail
    pub inference: Option<String>,
}

/// Planner output for one row; holds no identity and is never persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowPlan {
    pub target: TargetCollection,
    pub started_at: Option<NaiveDate>,
    pub finished_at: Option<NaiveDate>,
    pub judgment: Option<Judgment>,
    pub warnings: Vec<PlanWarning>,
}

/// Parse a Goodreads export date.
///
/// Prefers the strict `YYYY/M/D` shape, falls back to a handful of general
/// formats, and yields no date for anything out of calendar range.
pub fn parse_export_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    // Strict YYYY/M/D token
    let parts: Vec<&str> = raw.split('/').collect();
    if parts.len() == 3 {
        if let (Ok(year), Ok(month), Ok(day)) = (
            parts[0].parse::<i32>(),
            parts[1].parse::<u32>(),
            parts[2].parse::<u32>(),
        ) {
            // from_ymd_opt rejects out-of-range calendar fields
            return NaiveDate::from_ymd_opt(year, month, day);
        }
    }

    // General fallbacks
    for format in ["%Y-%m-%d", "%m/%d/%Y", "%b %d, %Y", "%d %b %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date);
        }
    }

    None
}

/// Deterministically plan one row. Never fails.
pub fn plan_row(row: &CsvRow, options: &ImportOptions, today: NaiveDate) -> RowPlan {
    let shelf = row.get("Exclusive Shelf").trim().to_lowercase();
    let date_added = parse_export_date(row.get("Date Added"));
    let date_read = parse_export_date(row.get("Date Read"));
    let judgment = judgment_from_rating(row, options);

    let mut warnings = Vec::new();

    match shelf.as_str() {
        "currently-reading" => {
            let started_at = infer_start_date(date_added, date_read, today, &mut warnings);
            RowPlan {
                target: TargetCollection::Reading,
                started_at: Some(started_at),
                finished_at: None,
                judgment,
                warnings,
            }
        }
        "read" => plan_finished(date_added, date_read, judgment, today, warnings),
        "to-read" => RowPlan {
            target: TargetCollection::Planned,
            started_at: None,
            finished_at: None,
            judgment: None,
            warnings,
        },
        other => {
            if date_read.is_some() {
                warnings.push(PlanWarning {
                    code: codes::INFERRED_STATUS,
                    message: format!(
                        "Shelf {:?} not recognized; treated as read because a read date is present",
                        other
                    ),
                    inference: Some(String::from("status←read")),
                });
                plan_finished(date_added, date_read, judgment, today, warnings)
            } else {
                warnings.push(PlanWarning {
                    code: codes::INFERRED_STATUS,
                    message: format!("Shelf {:?} not recognized; treated as to-read", other),
                    inference: Some(String::from("status←to-read")),
                });
                RowPlan {
                    target: TargetCollection::Planned,
                    started_at: None,
                    finished_at: None,
                    judgment: None,
                    warnings,
                }
            }
        }
    }
}

/// Shared plan for rows that end up in the finished branch
fn plan_finished(
    date_added: Option<NaiveDate>,
    date_read: Option<NaiveDate>,
    judgment: Option<Judgment>,
    today: NaiveDate,
    mut warnings: Vec<PlanWarning>,
) -> RowPlan {
    let started_at = infer_start_date(date_added, date_read, today, &mut warnings);
    let finished_at = match date_read {
        Some(date) => date,
        None => {
            warnings.push(PlanWarning {
                code: codes::INFERRED_END_DATE,
                message: String::from("Read date missing; used the start date as the finish date"),
                inference: Some(String::from("finish←start")),
            });
            started_at
        }
    };

    RowPlan {
        target: TargetCollection::Reading,
        started_at: Some(started_at),
        finished_at: Some(finished_at),
        judgment,
        warnings,
    }
}

fn infer_start_date(
    date_added: Option<NaiveDate>,
    date_read: Option<NaiveDate>,
    today: NaiveDate,
    warnings: &mut Vec<PlanWarning>,
) -> NaiveDate {
    if let Some(date) = date_added {
        return date;
    }

    if let Some(date) = date_read {
        warnings.push(PlanWarning {
            code: codes::INFERRED_START_DATE,
            message: String::from("Added date missing; used the read date as the start date"),
            inference: Some(String::from("start←Date Read")),
        });
        return date;
    }

    warnings.push(PlanWarning {
        code: codes::INFERRED_START_DATE,
        message: String::from("No usable dates; used today as the start date"),
        inference: Some(String::from("start←today")),
    });
    today
}

fn judgment_from_rating(row: &CsvRow, options: &ImportOptions) -> Option<Judgment> {
    if !options.map_ratings {
        return None;
    }

    let rating: f64 = row.get("My Rating").trim().parse().ok()?;
    let stars = rating as i64;
    if stars <= 0 {
        return None;
    }

    match options.ratings.outcome_for(stars) {
        RatingOutcome::Accepted => Some(Judgment::Accepted),
        RatingOutcome::Rejected => Some(Judgment::Rejected),
        RatingOutcome::Unjudged => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_date_token_parses() {
        assert_eq!(
            parse_export_date("2020/3/15"),
            NaiveDate::from_ymd_opt(2020, 3, 15)
        );
        assert_eq!(
            parse_export_date(" 2021/12/01 "),
            NaiveDate::from_ymd_opt(2021, 12, 1)
        );
    }

    #[test]
    fn out_of_range_dates_yield_none() {
        assert_eq!(parse_export_date("2020/13/01"), None);
        assert_eq!(parse_export_date("2020/02/30"), None);
        assert_eq!(parse_export_date("not a date"), None);
        assert_eq!(parse_export_date(""), None);
    }

    #[test]
    fn general_formats_fall_back() {
        assert_eq!(
            parse_export_date("2020-03-15"),
            NaiveDate::from_ymd_opt(2020, 3, 15)
        );
        assert_eq!(
            parse_export_date("Mar 15, 2020"),
            NaiveDate::from_ymd_opt(2020, 3, 15)
        );
    }
}
