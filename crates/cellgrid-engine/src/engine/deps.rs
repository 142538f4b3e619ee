//! Reference extraction from formula strings.
//!
//! Two scanners with intentionally different breadth:
//!
//! - [`extract_references`] finds accessor calls (`cell("A1")`) *and* bare
//!   references (`A1`, `B2:C5`). It feeds reference highlighting while a
//!   formula is edited.
//! - [`extract_dependency_keys`] finds accessor calls only and expands ranges
//!   into individual cells. It feeds the dependency graph, so it must match
//!   exactly what the evaluator can read.

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

use super::cell_ref::{CellPos, CellRange};

/// Maximum number of cells to expand from a single range reference.
/// Larger ranges are skipped to avoid runaway memory usage.
pub const MAX_DEPENDENCY_RANGE_CELLS: usize = 1_000_000;

/// Highlight colours handed out to references in order of appearance.
pub const REFERENCE_COLORS: &[&str] = &[
    "#4285F4", // blue
    "#DB4437", // red
    "#F4B400", // yellow
    "#0F9D58", // green
    "#AB47BC", // purple
    "#00ACC1", // cyan
    "#EF6C00", // deep orange
    "#5E35B1", // deep purple
    "#757575", // gray
    "#00897B", // teal
];

/// Colour for the `index`-th highlighted reference (cycles).
pub fn reference_color(index: usize) -> &'static str {
    REFERENCE_COLORS[index % REFERENCE_COLORS.len()]
}

/// Matches `cell("A1")`, `cell('a1:b5')`, any case, optional whitespace.
///
/// Captures:
/// - group 1: opening quote
/// - group 2: the reference text
fn accessor_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)cell\s*\(\s*(["'])([a-z]+[0-9]+(?::[a-z]+[0-9]+)?)["']\s*\)"#)
            .expect("accessor reference regex must compile")
    })
}

/// Bare `A1` / `A1:B5` bounded by non-word characters.
fn bare_ref_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?-u:\b)([A-Za-z]+[0-9]+(?::[A-Za-z]+[0-9]+)?)(?-u:\b)")
            .expect("bare reference regex must compile")
    })
}

/// All references a formula mentions, for UI highlighting.
///
/// Returns nothing unless `formula` starts with `=`. Accessor matches come
/// first, then bare matches; duplicates (by upper-cased label) are dropped.
pub fn extract_references(formula: &str) -> Vec<CellRange> {
    if !formula.starts_with('=') {
        return Vec::new();
    }

    let mut seen = HashSet::new();
    let labels = accessor_re()
        .captures_iter(formula)
        .map(|caps| caps[2].to_ascii_uppercase())
        .chain(
            bare_ref_re()
                .captures_iter(formula)
                .map(|caps| caps[1].to_ascii_uppercase()),
        )
        .filter(|label| seen.insert(label.clone()))
        .collect::<Vec<_>>();

    labels.iter().filter_map(|label| CellRange::parse(label)).collect()
}

/// Every cell a formula reads through `cell(...)`, ranges expanded
/// row-major over the normalized rectangle. Duplicates are removed.
pub fn extract_dependency_keys(formula: &str) -> Vec<CellPos> {
    extract_dependency_keys_capped(formula, MAX_DEPENDENCY_RANGE_CELLS)
}

/// As [`extract_dependency_keys`], skipping ranges larger than `max_range_cells`.
pub fn extract_dependency_keys_capped(formula: &str, max_range_cells: usize) -> Vec<CellPos> {
    let mut seen = HashSet::new();
    let mut deps = Vec::new();

    for caps in accessor_re().captures_iter(formula) {
        let Some(range) = CellRange::parse(&caps[2]) else {
            continue;
        };
        let Some(cell_count) = range.cell_count() else {
            continue;
        };
        if cell_count > max_range_cells {
            continue;
        }
        for pos in range.positions() {
            if seen.insert(pos) {
                deps.push(pos);
            }
        }
    }

    deps
}

/// Offset every accessor reference by a relative row/column delta.
/// Used by paste so copied formulas keep relative references.
///
/// Rules:
/// - `cell("A1")` offset by (+2, +1) becomes `cell("B3")`
/// - both corners of a range move: `cell("A1:B2")` -> `cell("B3:C4")`
/// - refs that move out of bounds become `#REF!`, which later fails to resolve
pub fn offset_formula_references(formula: &str, delta_row: isize, delta_col: isize) -> String {
    if delta_row == 0 && delta_col == 0 {
        return formula.to_string();
    }

    accessor_re()
        .replace_all(formula, |caps: &regex::Captures| {
            let quote = &caps[1];
            let shifted = caps[2]
                .split(':')
                .map(|part| {
                    CellPos::from_a1(part)
                        .and_then(|pos| pos.offset(delta_row, delta_col))
                        .map(|pos| pos.to_string())
                })
                .collect::<Option<Vec<_>>>()
                .map(|parts| parts.join(":"))
                .unwrap_or_else(|| "#REF!".to_string());
            format!("cell({q}{}{q})", shifted, q = quote)
        })
        .to_string()
}
