//! Cell reference parsing and formatting.
//!
//! Provides bidirectional conversion between spreadsheet-style references
//! (e.g., "A1", "B2", "AA100", "B2:C9") and zero-indexed row/column
//! coordinates. This is the only place where 1-based rows and letter
//! columns are translated.
//!
//! # Examples
//!
//! ```
//! use cellgrid_engine::engine::CellPos;
//!
//! let pos = CellPos::from_a1("B3").unwrap();
//! assert_eq!(pos.col, 1); // 0-indexed
//! assert_eq!(pos.row, 2);
//! assert_eq!(pos.to_string(), "B3");
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// A cell position (0-indexed row and column).
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct CellPos {
    pub row: usize,
    pub col: usize,
}

impl CellPos {
    pub fn new(row: usize, col: usize) -> CellPos {
        CellPos { row, col }
    }

    /// Parse a reference in A1 notation ("A1", "b2", "AA10").
    /// Returns None if the input is malformed or out of range.
    pub fn from_a1(name: &str) -> Option<CellPos> {
        let caps = a1_re().captures(name.trim())?;
        let letters = &caps["letters"];
        let numbers = &caps["numbers"];

        let col = letters_to_col(letters)?;
        let row = numbers.parse::<usize>().ok()?.checked_sub(1)?;

        Some(CellPos::new(row, col))
    }

    /// Canonical `"row-col"` key used by maps and logs.
    pub fn key(&self) -> String {
        format!("{}-{}", self.row, self.col)
    }

    /// Move by a signed delta, returning None if either axis goes negative.
    pub fn offset(&self, delta_row: isize, delta_col: isize) -> Option<CellPos> {
        let row = self.row.checked_add_signed(delta_row)?;
        let col = self.col.checked_add_signed(delta_col)?;
        Some(CellPos::new(row, col))
    }

    /// Convert column index to spreadsheet-style letters (0 -> A, 25 -> Z, 26 -> AA).
    pub fn col_to_letters(col: usize) -> String {
        let mut result = String::new();
        let mut n = col as u128 + 1;
        while n > 0 {
            n -= 1;
            result.insert(0, (b'A' + (n % 26) as u8) as char);
            n /= 26;
        }
        result
    }
}

fn a1_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?<letters>[A-Za-z]+)(?<numbers>[0-9]+)$")
            .expect("A1 reference regex must compile")
    })
}

/// Bijective base-26: A=1 .. Z=26, AA=27, shifted to 0-based.
fn letters_to_col(letters: &str) -> Option<usize> {
    let mut acc = 0usize;
    for c in letters.to_ascii_uppercase().bytes() {
        let digit = (c - b'A') as usize + 1;
        acc = acc.checked_mul(26)?.checked_add(digit)?;
    }
    acc.checked_sub(1)
}

impl std::str::FromStr for CellPos {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_a1(s).ok_or_else(|| format!("Invalid cell reference: {}", s))
    }
}

impl fmt::Display for CellPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", CellPos::col_to_letters(self.col), self.row + 1)
    }
}

/// A rectangle given by two corners.
///
/// Corners are stored as given (a drag from bottom-right to top-left keeps
/// that order); use [`CellRange::top_left`] / [`CellRange::bottom_right`]
/// when iterating.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct CellRange {
    pub start: CellPos,
    pub end: CellPos,
}

impl CellRange {
    pub fn new(start: CellPos, end: CellPos) -> CellRange {
        CellRange { start, end }
    }

    pub fn single(pos: CellPos) -> CellRange {
        CellRange {
            start: pos,
            end: pos,
        }
    }

    /// Parse `"A1"` or `"A1:B5"` (corners in any order).
    pub fn parse(text: &str) -> Option<CellRange> {
        match text.split_once(':') {
            Some((a, b)) => Some(CellRange::new(CellPos::from_a1(a)?, CellPos::from_a1(b)?)),
            None => CellPos::from_a1(text).map(CellRange::single),
        }
    }

    pub fn top_left(&self) -> CellPos {
        CellPos::new(
            self.start.row.min(self.end.row),
            self.start.col.min(self.end.col),
        )
    }

    pub fn bottom_right(&self) -> CellPos {
        CellPos::new(
            self.start.row.max(self.end.row),
            self.start.col.max(self.end.col),
        )
    }

    pub fn normalized(&self) -> CellRange {
        CellRange::new(self.top_left(), self.bottom_right())
    }

    pub fn rows(&self) -> usize {
        self.bottom_right().row - self.top_left().row + 1
    }

    pub fn cols(&self) -> usize {
        self.bottom_right().col - self.top_left().col + 1
    }

    /// Number of cells covered, or None on overflow.
    pub fn cell_count(&self) -> Option<usize> {
        self.rows().checked_mul(self.cols())
    }

    pub fn is_single(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        let tl = self.top_left();
        let br = self.bottom_right();
        row >= tl.row && row <= br.row && col >= tl.col && col <= br.col
    }

    /// Row-major iteration over the normalized rectangle.
    pub fn positions(&self) -> impl Iterator<Item = CellPos> + use<> {
        let tl = self.top_left();
        let br = self.bottom_right();
        (tl.row..=br.row).flat_map(move |row| (tl.col..=br.col).map(move |col| CellPos::new(row, col)))
    }

    /// `"A1"` for a single cell, `"A1:B5"` (normalized) otherwise.
    pub fn label(&self) -> String {
        if self.is_single() {
            self.start.to_string()
        } else {
            format!("{}:{}", self.top_left(), self.bottom_right())
        }
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::{CellPos, CellRange};
    use proptest::prelude::*;

    #[test]
    fn test_parse_a1_overflow_returns_none() {
        let huge = format!("{}1", "Z".repeat(40));
        assert!(CellPos::from_a1(&huge).is_none());
    }

    #[test]
    fn test_col_to_letters_handles_max_usize() {
        let letters = CellPos::col_to_letters(usize::MAX);
        assert!(!letters.is_empty());
        assert!(letters.chars().all(|c| c.is_ascii_uppercase()));
    }

    #[test]
    fn test_col_letters_boundaries() {
        assert_eq!(CellPos::col_to_letters(0), "A");
        assert_eq!(CellPos::col_to_letters(25), "Z");
        assert_eq!(CellPos::col_to_letters(26), "AA");
        assert_eq!(CellPos::col_to_letters(701), "ZZ");
        assert_eq!(CellPos::col_to_letters(702), "AAA");
    }

    #[test]
    fn test_key_is_row_dash_col() {
        assert_eq!(CellPos::new(3, 7).key(), "3-7");
    }

    #[test]
    fn test_range_parse_keeps_corner_order() {
        let range = CellRange::parse("C5:A1").unwrap();
        assert_eq!(range.start, CellPos::new(4, 2));
        assert_eq!(range.end, CellPos::new(0, 0));
        assert_eq!(range.label(), "A1:C5");
        assert_eq!(range.rows(), 5);
        assert_eq!(range.cols(), 3);
    }

    #[test]
    fn test_range_parse_rejects_garbage() {
        assert!(CellRange::parse("A1:").is_none());
        assert!(CellRange::parse("A1:B2:C3").is_none());
        assert!(CellRange::parse("hello").is_none());
    }

    #[test]
    fn test_range_positions_row_major() {
        let range = CellRange::parse("B2:A1").unwrap();
        let labels: Vec<String> = range.positions().map(|p| p.to_string()).collect();
        assert_eq!(labels, vec!["A1", "B1", "A2", "B2"]);
    }

    proptest! {
        #[test]
        fn prop_a1_round_trip(row in 0usize..1_000_000, col in 0usize..100_000) {
            let pos = CellPos::new(row, col);
            prop_assert_eq!(CellPos::from_a1(&pos.to_string()), Some(pos));
        }

        #[test]
        fn prop_lowercase_parses_like_uppercase(row in 0usize..10_000, col in 0usize..2_000) {
            let label = CellPos::new(row, col).to_string();
            prop_assert_eq!(CellPos::from_a1(&label.to_lowercase()), CellPos::from_a1(&label));
        }
    }
}
