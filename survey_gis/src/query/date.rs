//! Recorded-date terms for archive searches.
//!
//! A date term is a year (`1990`), month/year (`6/1990`) or
//! month/day/year (`6/15/1990`). A partial date expands to the full span
//! it covers, so `date 1990 1995` matches everything recorded from
//! 1990-01-01 through 1995-12-31 inclusive.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ParseError;

static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:(\d{1,2})/)?(?:(\d{1,2})/)?(\d{4})$").unwrap());

/// Inclusive range of recorded dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub until: NaiveDate,
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_y, next_m) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_y, next_m, 1)?.pred_opt()
}

/// Span covered by a single date term.
fn term_span(term: &str) -> Option<(NaiveDate, NaiveDate)> {
    let caps = DATE_RE.captures(term)?;
    let year: i32 = caps[3].parse().ok()?;
    match (caps.get(1), caps.get(2)) {
        (None, None) => Some((
            NaiveDate::from_ymd_opt(year, 1, 1)?,
            NaiveDate::from_ymd_opt(year, 12, 31)?,
        )),
        (Some(m), None) => {
            let month: u32 = m.as_str().parse().ok()?;
            Some((
                NaiveDate::from_ymd_opt(year, month, 1)?,
                last_day_of_month(year, month)?,
            ))
        }
        (Some(m), Some(d)) => {
            let month: u32 = m.as_str().parse().ok()?;
            let day: u32 = d.as_str().parse().ok()?;
            let date = NaiveDate::from_ymd_opt(year, month, day)?;
            Some((date, date))
        }
        (None, Some(_)) => unreachable!("first group matches before the second"),
    }
}

/// Parses one or two date terms into an inclusive range.
///
/// With one term the range is the span the term covers; with two terms it
/// runs from the start of the first to the end of the second. Calendar
/// nonsense (`2/30/1990`) and an empty or reversed pair are rejected.
pub fn parse_date_range(terms: &[&str]) -> Result<DateRange, ParseError> {
    let (from, until) = match terms {
        [one] => term_span(one).ok_or_else(|| ParseError::new(*one))?,
        [first, second] => {
            let (from, _) = term_span(first).ok_or_else(|| ParseError::new(*first))?;
            let (_, until) = term_span(second).ok_or_else(|| ParseError::new(*second))?;
            (from, until)
        }
        _ => {
            return Err(ParseError::new(terms.join(" ")));
        }
    };
    if from > until {
        return Err(ParseError::new(terms.join(" ")));
    }
    Ok(DateRange { from, until })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn single_year_covers_the_year() {
        let r = parse_date_range(&["1990"]).unwrap();
        assert_eq!(r.from, ymd(1990, 1, 1));
        assert_eq!(r.until, ymd(1990, 12, 31));
    }

    #[test]
    fn month_year_covers_the_month() {
        let r = parse_date_range(&["6/1990"]).unwrap();
        assert_eq!(r.from, ymd(1990, 6, 1));
        assert_eq!(r.until, ymd(1990, 6, 30));
        // February of a leap year.
        let r = parse_date_range(&["2/1992"]).unwrap();
        assert_eq!(r.until, ymd(1992, 2, 29));
        // December rolls the year.
        let r = parse_date_range(&["12/1990"]).unwrap();
        assert_eq!(r.until, ymd(1990, 12, 31));
    }

    #[test]
    fn full_date_is_a_single_day() {
        let r = parse_date_range(&["6/15/1990"]).unwrap();
        assert_eq!(r.from, ymd(1990, 6, 15));
        assert_eq!(r.until, ymd(1990, 6, 15));
    }

    #[test]
    fn two_terms_span_inclusive() {
        let r = parse_date_range(&["1990", "1995"]).unwrap();
        assert_eq!(r.from, ymd(1990, 1, 1));
        assert_eq!(r.until, ymd(1995, 12, 31));

        let r = parse_date_range(&["6/1990", "6/15/1995"]).unwrap();
        assert_eq!(r.from, ymd(1990, 6, 1));
        assert_eq!(r.until, ymd(1995, 6, 15));
    }

    #[test]
    fn bad_terms_are_rejected() {
        assert!(parse_date_range(&["2/30/1990"]).is_err());
        assert!(parse_date_range(&["13/1990"]).is_err());
        assert!(parse_date_range(&["90"]).is_err());
        assert!(parse_date_range(&[]).is_err());
        assert!(parse_date_range(&["1995", "1990"]).is_err());
        assert!(parse_date_range(&["1990", "1991", "1992"]).is_err());
    }
}
