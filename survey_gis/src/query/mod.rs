//! Search query parser for the map archive.
//!
//! A query string splits into segments on `+`/`-` prefixes; each segment
//! unions its matches into the result (`+` or no prefix) or subtracts
//! them (`-`). Within a segment the parser extracts, in order, quoted
//! keyword clauses (`by="…"`), unquoted keyword clauses (`type=rm|pm`),
//! explicit map identifiers (`11RM5`), parcel and tract map numbers
//! (`PM123`, `TR45`), and a township/range/section clause (`NW/4 S32 T7N
//! R1E`). Leftover text becomes an implicit full-text clause.

pub mod date;
pub mod plan;
pub mod trs;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ParseError;

pub use date::{parse_date_range, DateRange};
pub use plan::{build_query_plan, Predicate, QueryPlan};
pub use trs::{rng_num, subsection_code, tshp_num};

static QUOTED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(by|for|date|desc|type|id|any)\s*[:=]\s*"([^"]*)""#).unwrap()
});
static UNQUOTED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(by|for|date|desc|type|id|any)[:=](\S*)").unwrap());
static MAP_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d{1,3})([A-Z]{1,4})(\d{1,3})\b").unwrap());
static PARCEL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(PM|TR)(\d{1,4})\b").unwrap());
static TSHP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bT?(\d{1,2})([NS])\b").unwrap());
static RNG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bR?(\d{1,2})([EW])\b").unwrap());
static SECTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b((?:(?:[NS][EW]/4|[NSEW]/2)\s+)?(?:[NS][EW]/4|[NSEW]/2|1/1)\s+)?S(\d{1,2})\b")
        .unwrap()
});

/// One clause within a search segment. Same-segment clauses AND together.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub enum Clause {
    /// Surveyor name or license pattern (`by=`).
    Surveyor(String),
    /// Client name pattern (`for=`).
    Client(String),
    /// Map description pattern (`desc=`).
    Description(String),
    /// Map type abbreviation pattern (`type=`).
    MapType(String),
    /// Document id pattern (`id=`).
    DocId(String),
    /// Full-text pattern over all text fields (`any=`, or leftover text).
    AnyText(String),
    /// Recorded-date range (`date=`).
    Date(DateRange),
    /// Explicit map identifier such as `11RM5`.
    MapId {
        book: u32,
        map_type: String,
        page: u32,
    },
    /// Parcel map (`PM123`) or tract map (`TR45`) number.
    ParcelId { prefix: String, number: u32 },
    /// Township/range/section membership.
    Trs(TrsClause),
}

/// A resolved township/range and the sections claimed within it.
///
/// An empty section list means the whole township.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TrsClause {
    pub tshp: i32,
    pub rng: i32,
    pub sections: Vec<SectionSpec>,
}

/// A section number with the quarter-quarter cells claimed within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct SectionSpec {
    pub sec: u32,
    pub qqsec: u16,
}

/// One `+`/`-` segment of a query.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Segment {
    pub exclude: bool,
    pub clauses: Vec<Clause>,
}

/// A parsed query: segments to union in and segments to subtract.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Search {
    pub segments: Vec<Segment>,
}

/// Parses a full query string.
pub fn parse_search(query: &str) -> Result<Search, ParseError> {
    let mut segments = Vec::new();
    for (exclude, text) in split_segments(query) {
        let clauses = parse_segment(&text)?;
        if !clauses.is_empty() {
            segments.push(Segment { exclude, clauses });
        }
    }
    Ok(Search { segments })
}

/// Splits a query on `+`/`-` segment prefixes, honoring quoted values.
///
/// A prefix only counts at the start of the string or after whitespace, so
/// hyphenated names inside quotes pass through untouched.
fn split_segments(query: &str) -> Vec<(bool, String)> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut exclude = false;
    let mut in_quotes = false;
    let mut at_boundary = true;

    for c in query.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
                at_boundary = false;
            }
            '+' | '-' if !in_quotes && at_boundary => {
                if !current.trim().is_empty() {
                    segments.push((exclude, std::mem::take(&mut current)));
                } else {
                    current.clear();
                }
                exclude = c == '-';
            }
            _ => {
                current.push(c);
                at_boundary = !in_quotes && c.is_whitespace();
            }
        }
    }
    if !current.trim().is_empty() {
        segments.push((exclude, current));
    }
    segments
}

fn keyword_clause(key: &str, value: &str) -> Result<Clause, ParseError> {
    let key = key.to_ascii_lowercase();
    if key == "date" {
        let terms: Vec<&str> = value.split_whitespace().collect();
        return Ok(Clause::Date(parse_date_range(&terms)?));
    }
    // The remaining clauses match as regular expressions downstream, so a
    // pattern that does not compile is the user's error, not the backend's.
    if Regex::new(value).is_err() {
        return Err(ParseError::with_context(value, format!("{key}=")));
    }
    let value = value.to_string();
    Ok(match key.as_str() {
        "by" => Clause::Surveyor(value),
        "for" => Clause::Client(value),
        "desc" => Clause::Description(value),
        "type" => Clause::MapType(value),
        "id" => Clause::DocId(value),
        _ => Clause::AnyText(value),
    })
}

/// Extracts all matches of `re` from `text`, handing the capture groups to
/// `f` and blanking the matched spans.
fn extract_all<F>(text: &mut String, re: &Regex, mut f: F) -> Result<(), ParseError>
where
    F: FnMut(&regex::Captures) -> Result<(), ParseError>,
{
    let mut spans = Vec::new();
    for caps in re.captures_iter(text.as_str()) {
        f(&caps)?;
        let m = caps.get(0).unwrap();
        spans.push((m.start(), m.end()));
    }
    if spans.is_empty() {
        return Ok(());
    }
    let mut blanked = String::with_capacity(text.len());
    for (i, c) in text.char_indices() {
        if !c.is_whitespace() && spans.iter().any(|&(s, e)| i >= s && i < e) {
            blanked.push(' ');
        } else {
            blanked.push(c);
        }
    }
    *text = blanked;
    Ok(())
}

fn parse_segment(text: &str) -> Result<Vec<Clause>, ParseError> {
    let mut clauses = Vec::new();
    let mut rest = text.to_string();

    extract_all(&mut rest, &QUOTED_RE, |caps| {
        clauses.push(keyword_clause(&caps[1], &caps[2])?);
        Ok(())
    })?;

    // Any quote left at this point is unbalanced.
    if rest.contains('"') {
        let token = rest
            .split_whitespace()
            .find(|t| t.contains('"'))
            .unwrap_or("\"");
        return Err(ParseError::with_context(token, text.trim()));
    }

    extract_all(&mut rest, &UNQUOTED_RE, |caps| {
        let value = &caps[2];
        if value.is_empty() {
            return Err(ParseError::with_context(&caps[0], text.trim()));
        }
        clauses.push(keyword_clause(&caps[1], value)?);
        Ok(())
    })?;

    extract_all(&mut rest, &MAP_ID_RE, |caps| {
        clauses.push(Clause::MapId {
            book: caps[1].parse().map_err(|_| ParseError::new(&caps[0]))?,
            map_type: caps[2].to_ascii_uppercase(),
            page: caps[3].parse().map_err(|_| ParseError::new(&caps[0]))?,
        });
        Ok(())
    })?;

    extract_all(&mut rest, &PARCEL_RE, |caps| {
        clauses.push(Clause::ParcelId {
            prefix: caps[1].to_ascii_uppercase(),
            number: caps[2].parse().map_err(|_| ParseError::new(&caps[0]))?,
        });
        Ok(())
    })?;

    if let Some(trs) = parse_trs(&mut rest, text)? {
        clauses.push(Clause::Trs(trs));
    }

    // Leftover free text folds into an implicit full-text clause.
    let leftover = rest.split_whitespace().collect::<Vec<_>>().join(" ");
    if !leftover.is_empty() {
        clauses.push(keyword_clause("any", &leftover)?);
    }

    Ok(clauses)
}

/// Pulls the township/range/section clause out of a segment, if present.
///
/// A township and range must appear together; sections additionally
/// require both. A dangling township, range or section token is an error
/// rather than free text, since its intent is unambiguous.
fn parse_trs(rest: &mut String, context: &str) -> Result<Option<TrsClause>, ParseError> {
    let mut tshp = None;
    extract_all(rest, &TSHP_RE, |caps| {
        tshp = tshp_num(&caps[0]);
        Ok(())
    })?;
    let mut rng = None;
    extract_all(rest, &RNG_RE, |caps| {
        rng = rng_num(&caps[0]);
        Ok(())
    })?;

    let mut sections = Vec::new();
    extract_all(rest, &SECTION_RE, |caps| {
        let sec: u32 = caps[2].parse().map_err(|_| ParseError::new(&caps[0]))?;
        if !(1..=36).contains(&sec) {
            return Err(ParseError::with_context(&caps[0], context.trim()));
        }
        let qqsec = match caps.get(1) {
            Some(sub) => subsection_code(sub.as_str().trim())
                .ok_or_else(|| ParseError::with_context(sub.as_str().trim(), context.trim()))?,
            None => trs::FULL_SECTION,
        };
        sections.push(SectionSpec { sec, qqsec });
        Ok(())
    })?;

    // Section lists may be comma separated.
    if !sections.is_empty() {
        *rest = rest.replace(',', " ");
    }

    match (tshp, rng) {
        (Some(tshp), Some(rng)) => Ok(Some(TrsClause {
            tshp,
            rng,
            sections,
        })),
        (None, None) if sections.is_empty() => Ok(None),
        _ => Err(ParseError::with_context(
            "incomplete township/range",
            context.trim(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn single_segment(query: &str) -> Vec<Clause> {
        let search = parse_search(query).unwrap();
        assert_eq!(search.segments.len(), 1, "{query}");
        search.segments[0].clauses.clone()
    }

    #[test]
    fn explicit_map_id() {
        let clauses = single_segment("11RM5");
        assert_eq!(
            clauses,
            vec![Clause::MapId {
                book: 11,
                map_type: "RM".into(),
                page: 5
            }]
        );
    }

    #[test]
    fn parcel_and_tract_ids() {
        let clauses = single_segment("PM123 tr45");
        assert_eq!(
            clauses,
            vec![
                Clause::ParcelId {
                    prefix: "PM".into(),
                    number: 123
                },
                Clause::ParcelId {
                    prefix: "TR".into(),
                    number: 45
                },
            ]
        );
    }

    #[test]
    fn quoted_keyword_clauses() {
        let clauses = single_segment(r#"by="Crivelli" for="PALCO" date="6/1990 1995""#);
        assert_eq!(clauses[0], Clause::Surveyor("Crivelli".into()));
        assert_eq!(clauses[1], Clause::Client("PALCO".into()));
        assert_eq!(
            clauses[2],
            Clause::Date(DateRange {
                from: NaiveDate::from_ymd_opt(1990, 6, 1).unwrap(),
                until: NaiveDate::from_ymd_opt(1995, 12, 31).unwrap(),
            })
        );
    }

    #[test]
    fn unquoted_keyword_clause() {
        let clauses = single_segment("type=rm|pm");
        assert_eq!(clauses, vec![Clause::MapType("rm|pm".into())]);
    }

    #[test]
    fn trs_clause_with_subsection() {
        let clauses = single_segment("NW/4 S32 T7N R1E");
        assert_eq!(
            clauses,
            vec![Clause::Trs(TrsClause {
                tshp: 6,
                rng: 0,
                sections: vec![SectionSpec {
                    sec: 32,
                    qqsec: 0x0033
                }],
            })]
        );
    }

    #[test]
    fn trs_clause_section_list() {
        let clauses = single_segment("S32, NE/4 S33 t2s r5w");
        assert_eq!(
            clauses,
            vec![Clause::Trs(TrsClause {
                tshp: -2,
                rng: -5,
                sections: vec![
                    SectionSpec {
                        sec: 32,
                        qqsec: trs::FULL_SECTION
                    },
                    SectionSpec {
                        sec: 33,
                        qqsec: 0x00CC
                    },
                ],
            })]
        );
    }

    #[test]
    fn leftover_text_becomes_any() {
        let clauses = single_segment("mad river");
        assert_eq!(clauses, vec![Clause::AnyText("mad river".into())]);
    }

    #[test]
    fn segments_split_on_prefixes() {
        let search = parse_search(r#"11RM5 + 12RM6 - by="Smith""#).unwrap();
        assert_eq!(search.segments.len(), 3);
        assert!(!search.segments[0].exclude);
        assert!(!search.segments[1].exclude);
        assert!(search.segments[2].exclude);
    }

    #[test]
    fn hyphen_inside_quotes_is_not_a_segment() {
        let search = parse_search(r#"for="Smith -Jones""#).unwrap();
        assert_eq!(search.segments.len(), 1);
        assert_eq!(
            search.segments[0].clauses,
            vec![Clause::Client("Smith -Jones".into())]
        );
    }

    #[test]
    fn unterminated_quote_is_an_error() {
        let err = parse_search(r#"desc:""#).unwrap_err();
        assert!(err.to_string().contains("desc"));
        assert!(parse_search(r#"by="Smith"#).is_err());
    }

    #[test]
    fn empty_unquoted_value_is_an_error() {
        assert!(parse_search("by= S32 T7N R1E").is_err());
    }

    #[test]
    fn bad_dates_and_sections_are_errors() {
        assert!(parse_search(r#"date="14/1990""#).is_err());
        assert!(parse_search("S37 T7N R1E").is_err());
        assert!(parse_search("E/2 N/2 S32 T7N R1E").is_err());
    }

    #[test]
    fn dangling_township_is_an_error() {
        assert!(parse_search("T7N").is_err());
        assert!(parse_search("S32 T7N").is_err());
    }

    #[test]
    fn invalid_pattern_is_an_error() {
        assert!(parse_search(r#"desc="[unclosed""#).is_err());
    }
}
