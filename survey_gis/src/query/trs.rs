//! Township/range normalization and the section quarter-quarter encoding.
//!
//! A section divides into a 4x4 grid of sixteen quarter-quarter sections.
//! Each is one bit of a `u16`: bit `row * 4 + col`, rows counting south
//! from the north edge and columns east from the west edge, so bit 0 is
//! the extreme northwest cell and bit 15 the extreme southeast. Records
//! match a subsection when `qqsec & mask != 0`.

use once_cell::sync::Lazy;
use regex::Regex;

/// The whole section: all sixteen quarter-quarter cells.
pub const FULL_SECTION: u16 = 0xFFFF;

static TSHP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[Tt]?(\d{1,2})([NnSs])$").unwrap());
static RNG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[Rr]?(\d{1,2})([EeWw])$").unwrap());

/// Normalizes a township token ("T7N", "7n") to its signed index.
///
/// North townships are zero-based (`T7N` is 6), south townships are the
/// negated one-based number (`T1S` is -1). The asymmetry is the archive
/// database convention and must be preserved exactly.
pub fn tshp_num(text: &str) -> Option<i32> {
    let caps = TSHP_RE.captures(text)?;
    let n: i32 = caps[1].parse().ok()?;
    if n == 0 {
        return None;
    }
    match &caps[2] {
        "N" | "n" => Some(n - 1),
        _ => Some(-n),
    }
}

/// Normalizes a range token ("R1E", "4w") to its signed index.
///
/// East ranges are zero-based, west ranges the negated one-based number,
/// mirroring [`tshp_num`].
pub fn rng_num(text: &str) -> Option<i32> {
    let caps = RNG_RE.captures(text)?;
    let n: i32 = caps[1].parse().ok()?;
    if n == 0 {
        return None;
    }
    match &caps[2] {
        "E" | "e" => Some(n - 1),
        _ => Some(-n),
    }
}

/// Absolute mask: the cells a single-term specifier denotes.
fn absolute_mask(term: &str) -> Option<u16> {
    Some(match term {
        "N/2" => 0x00FF,
        "S/2" => 0xFF00,
        "E/2" => 0xCCCC,
        "W/2" => 0x3333,
        "NW/4" => 0x0033,
        "NE/4" => 0x00CC,
        "SW/4" => 0x3300,
        "SE/4" => 0xCC00,
        _ => return None,
    })
}

/// Positional mask: the cells occupying a given position within each
/// quarter. Intersecting a positional outer mask with an absolute inner
/// mask selects the outer subdivision of the inner area.
fn positional_mask(term: &str) -> Option<u16> {
    Some(match term {
        "N/2" => 0x0F0F,
        "S/2" => 0xF0F0,
        "E/2" => 0xAAAA,
        "W/2" => 0x5555,
        "NW/4" => 0x0505,
        "NE/4" => 0x0A0A,
        "SW/4" => 0x5050,
        "SE/4" => 0xA0A0,
        _ => return None,
    })
}

fn is_half(term: &str) -> bool {
    matches!(term, "N/2" | "S/2" | "E/2" | "W/2")
}

fn is_north_south_half(term: &str) -> bool {
    matches!(term, "N/2" | "S/2")
}

fn is_quarter(term: &str) -> bool {
    matches!(term, "NW/4" | "NE/4" | "SW/4" | "SE/4")
}

/// Resolves a subsection description to its quarter-quarter bitmask.
///
/// Accepts a single half or quarter (`"E/2"`, `"NE/4"`), a two-term
/// subdivision (`"SW/4 NE/4"` is the southwest quarter of the northeast
/// quarter, `"N/2 S/2"` the north half of the south half), or `"1/1"` for
/// the whole section. Returns `None` for anything else, including the
/// geometrically self-contradictory perpendicular half-of-half forms:
/// `"E/2 N/2"` does not quarter a section the way the two-term grammar
/// assumes (the caller should have written `"NE/4"` or a half of a
/// quarter instead), and likewise a quarter of a half (`"NW/4 E/2"`).
pub fn subsection_code(text: &str) -> Option<u16> {
    let upper = text.to_ascii_uppercase();
    let terms: Vec<&str> = upper.split_whitespace().collect();
    match terms.as_slice() {
        ["1/1"] => Some(FULL_SECTION),
        [term] => absolute_mask(term),
        [outer, inner] => {
            let inner_mask = absolute_mask(inner)?;
            let outer_mask = positional_mask(outer)?;
            if is_half(outer) && is_half(inner) {
                // Halves only compose along the same axis.
                if is_north_south_half(outer) != is_north_south_half(inner) {
                    return None;
                }
            }
            if is_quarter(outer) && is_half(inner) {
                return None;
            }
            Some(outer_mask & inner_mask)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn township_normalization() {
        assert_eq!(tshp_num("T7N"), Some(6));
        assert_eq!(tshp_num("T1N"), Some(0));
        assert_eq!(tshp_num("T1S"), Some(-1));
        assert_eq!(tshp_num("5n"), Some(4));
        assert_eq!(tshp_num("T0N"), None);
        assert_eq!(tshp_num("7"), None);
        assert_eq!(tshp_num("R7N"), None);
    }

    #[test]
    fn range_normalization() {
        assert_eq!(rng_num("R1E"), Some(0));
        assert_eq!(rng_num("R2W"), Some(-2));
        assert_eq!(rng_num("4e"), Some(3));
        assert_eq!(rng_num("R1N"), None);
    }

    #[test]
    fn single_term_masks() {
        assert_eq!(subsection_code("1/1"), Some(0xFFFF));
        assert_eq!(subsection_code("N/2"), Some(0x00FF));
        assert_eq!(subsection_code("S/2"), Some(0xFF00));
        assert_eq!(subsection_code("E/2"), Some(0xCCCC));
        assert_eq!(subsection_code("W/2"), Some(0x3333));
        assert_eq!(subsection_code("NW/4"), Some(0x0033));
        assert_eq!(subsection_code("NE/4"), Some(0x00CC));
        assert_eq!(subsection_code("SW/4"), Some(0x3300));
        assert_eq!(subsection_code("SE/4"), Some(0xCC00));
        assert_eq!(subsection_code("ne/4"), Some(0x00CC));
    }

    #[test]
    fn quarter_of_quarter() {
        // Single cells: NE of NE is the extreme northeast cell (bit 3).
        assert_eq!(subsection_code("NE/4 NE/4"), Some(0x0008));
        assert_eq!(subsection_code("SW/4 NE/4"), Some(0x0040));
        assert_eq!(subsection_code("NW/4 NW/4"), Some(0x0001));
        assert_eq!(subsection_code("SE/4 SE/4"), Some(0x8000));
    }

    #[test]
    fn half_of_quarter() {
        // North half of the southeast quarter: bits 10 and 11.
        assert_eq!(subsection_code("N/2 SE/4"), Some(0x0C00));
        // East half of the northwest quarter: bits 1 and 5.
        assert_eq!(subsection_code("E/2 NW/4"), Some(0x0022));
    }

    #[test]
    fn half_of_half_same_axis() {
        // North half of the south half: row 2.
        assert_eq!(subsection_code("N/2 S/2"), Some(0x0F00));
        // North half of the north half: row 0.
        assert_eq!(subsection_code("N/2 N/2"), Some(0x000F));
        // East half of the west half: column 1.
        assert_eq!(subsection_code("E/2 W/2"), Some(0x2222));
    }

    #[test]
    fn contradictory_forms_are_rejected() {
        assert_eq!(subsection_code("E/2 N/2"), None);
        assert_eq!(subsection_code("N/2 E/2"), None);
        assert_eq!(subsection_code("W/2 S/2"), None);
        assert_eq!(subsection_code("NW/4 E/2"), None);
        assert_eq!(subsection_code("NE/4 1/1"), None);
        assert_eq!(subsection_code("N/3"), None);
        assert_eq!(subsection_code("N/2 S/2 E/2"), None);
    }

    #[test]
    fn masks_cover_the_section_exactly() {
        assert_eq!(
            subsection_code("N/2").unwrap() | subsection_code("S/2").unwrap(),
            FULL_SECTION
        );
        assert_eq!(
            subsection_code("NW/4").unwrap()
                | subsection_code("NE/4").unwrap()
                | subsection_code("SW/4").unwrap()
                | subsection_code("SE/4").unwrap(),
            FULL_SECTION
        );
        assert_eq!(
            subsection_code("NE/4").unwrap() & subsection_code("SW/4").unwrap(),
            0
        );
    }
}
