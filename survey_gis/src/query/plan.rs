//! Backend-neutral query plans.
//!
//! A [`QueryPlan`] translates a parsed [`Search`] into predicate lists a
//! data-access layer can execute: each include segment's matches union
//! into the result, each exclude segment's matches subtract out, and the
//! predicates within a segment all have to hold at once. The plan owns no
//! persistence and issues no I/O.

use super::date::DateRange;
use super::{Clause, Search, SectionSpec, Segment};

/// A single condition against the archive schema.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    /// Surveyor name or license matches the pattern.
    SurveyorMatches { pattern: String },
    /// Client name matches the pattern.
    ClientMatches { pattern: String },
    /// Map description matches the pattern.
    DescriptionMatches { pattern: String },
    /// Map type abbreviation matches the pattern.
    MapTypeMatches { pattern: String },
    /// Document id matches the pattern.
    DocIdMatches { pattern: String },
    /// Any text field matches the pattern.
    AnyFieldMatches { pattern: String },
    /// Recorded date falls within the inclusive range.
    RecordedBetween { range: DateRange },
    /// The map's book/type page range contains the given page.
    MapContains {
        book: u32,
        map_type: String,
        page: u32,
    },
    /// The map carries the given parcel or tract number.
    ParcelNumber { prefix: String, number: u32 },
    /// The map touches the township/range, restricted to the listed
    /// sections (any match suffices; empty list means the whole township).
    /// Section membership tests `record_qqsec & qqsec != 0`.
    TrsMembership {
        tshp: i32,
        rng: i32,
        sections: Vec<SectionSpec>,
    },
}

/// All predicates of one segment, combined with AND.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SegmentPlan {
    pub predicates: Vec<Predicate>,
}

/// The executable form of a search.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct QueryPlan {
    /// Segments whose matches union into the result.
    pub include: Vec<SegmentPlan>,
    /// Segments whose matches subtract from the result.
    pub exclude: Vec<SegmentPlan>,
}

fn predicate(clause: &Clause) -> Predicate {
    match clause {
        Clause::Surveyor(p) => Predicate::SurveyorMatches { pattern: p.clone() },
        Clause::Client(p) => Predicate::ClientMatches { pattern: p.clone() },
        Clause::Description(p) => Predicate::DescriptionMatches { pattern: p.clone() },
        Clause::MapType(p) => Predicate::MapTypeMatches { pattern: p.clone() },
        Clause::DocId(p) => Predicate::DocIdMatches { pattern: p.clone() },
        Clause::AnyText(p) => Predicate::AnyFieldMatches { pattern: p.clone() },
        Clause::Date(range) => Predicate::RecordedBetween { range: *range },
        Clause::MapId {
            book,
            map_type,
            page,
        } => Predicate::MapContains {
            book: *book,
            map_type: map_type.clone(),
            page: *page,
        },
        Clause::ParcelId { prefix, number } => Predicate::ParcelNumber {
            prefix: prefix.clone(),
            number: *number,
        },
        Clause::Trs(trs) => Predicate::TrsMembership {
            tshp: trs.tshp,
            rng: trs.rng,
            sections: trs.sections.clone(),
        },
    }
}

fn segment_plan(segment: &Segment) -> SegmentPlan {
    SegmentPlan {
        predicates: segment.clauses.iter().map(predicate).collect(),
    }
}

/// Translates a parsed search into its executable plan.
pub fn build_query_plan(search: &Search) -> QueryPlan {
    let (exclude, include): (Vec<_>, Vec<_>) = search.segments.iter().partition(|s| s.exclude);
    QueryPlan {
        include: include.iter().map(|s| segment_plan(s)).collect(),
        exclude: exclude.iter().map(|s| segment_plan(s)).collect(),
    }
}
