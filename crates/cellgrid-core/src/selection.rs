//! Selection state: focus cell, rectangular ranges, and range insertion
//! while a formula is being edited.
//!
//! Interaction model:
//! - mouse down -> [`SelectionModel::start_selection`]
//! - drag -> [`SelectionModel::extend_selection`]
//! - mouse up -> [`SelectionModel::end_selection`]
//!
//! While a formula is open in the editor
//! ([`SelectionModel::begin_formula_edit`]), the same gestures pick a range
//! to splice into the formula as `cell("A1:B5")` instead of moving the
//! selection.

use regex::Regex;
use std::sync::OnceLock;

use cellgrid_engine::engine::{CellPos, CellRange};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Formula text being edited, with the caret as a char index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormulaEdit {
    pub target: CellPos,
    pub text: String,
    pub cursor_pos: usize,
}

/// Editor update produced by range insertion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReferenceInsert {
    pub text: String,
    pub cursor_pos: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectionModel {
    ranges: Vec<CellRange>,
    anchor: Option<CellPos>,
    current: Option<CellPos>,
    dragging: bool,
    formula_edit: Option<FormulaEdit>,
    inserting: Option<CellRange>,
}

impl SelectionModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ranges(&self) -> &[CellRange] {
        &self.ranges
    }

    /// The focused cell.
    pub fn current(&self) -> Option<CellPos> {
        self.current
    }

    pub fn anchor(&self) -> Option<CellPos> {
        self.anchor
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn formula_edit(&self) -> Option<&FormulaEdit> {
        self.formula_edit.as_ref()
    }

    /// Range being picked for insertion into the edited formula.
    pub fn inserting_range(&self) -> Option<CellRange> {
        self.inserting
    }

    /// Mouse down on `cell`. With `extend` (ctrl-click) a new independent
    /// range is appended instead of replacing the selection.
    pub fn start_selection(&mut self, cell: CellPos, extend: bool) {
        self.anchor = Some(cell);
        self.dragging = true;

        if self.formula_edit.is_some() {
            self.inserting = Some(CellRange::single(cell));
            return;
        }

        let range = CellRange::single(cell);
        if extend {
            self.ranges.push(range);
        } else {
            self.ranges = vec![range];
        }
        self.current = Some(cell);
    }

    /// Drag to `cell`: the active range becomes the rectangle spanning the
    /// anchor and `cell`.
    pub fn extend_selection(&mut self, cell: CellPos) {
        let Some(anchor) = self.anchor else {
            return;
        };
        let spanned = CellRange::new(anchor, cell).normalized();

        if self.inserting.is_some() {
            self.inserting = Some(spanned);
        } else if let Some(last) = self.ranges.last_mut() {
            *last = spanned;
        }
    }

    /// Mouse up. In range-insertion mode, returns the editor update and
    /// applies it to the edited formula.
    pub fn end_selection(&mut self) -> Option<ReferenceInsert> {
        self.dragging = false;
        let range = self.inserting.take()?;
        let edit = self.formula_edit.as_mut()?;

        let insert = insert_cell_reference(&edit.text, edit.cursor_pos, &range.label());
        edit.text = insert.text.clone();
        edit.cursor_pos = insert.cursor_pos;
        Some(insert)
    }

    pub fn is_cell_selected(&self, row: usize, col: usize) -> bool {
        self.ranges.iter().any(|r| r.contains(row, col))
    }

    pub fn clear_selection(&mut self) {
        self.ranges.clear();
        self.dragging = false;
    }

    /// Focus `cell` and make it the only selected range.
    pub fn set_selected_cell(&mut self, cell: CellPos) {
        self.current = Some(cell);
        self.anchor = Some(cell);
        self.ranges = vec![CellRange::single(cell)];
    }

    /// Arrow-key navigation clamped to a `rows` x `cols` grid.
    /// Collapses the selection to the new focus cell.
    pub fn move_focus(&mut self, direction: Direction, rows: usize, cols: usize) -> Option<CellPos> {
        if rows == 0 || cols == 0 {
            return None;
        }
        let cur = self.current.unwrap_or(CellPos::new(0, 0));
        let next = match direction {
            Direction::Up => CellPos::new(cur.row.saturating_sub(1), cur.col),
            Direction::Down => CellPos::new((cur.row + 1).min(rows - 1), cur.col),
            Direction::Left => CellPos::new(cur.row, cur.col.saturating_sub(1)),
            Direction::Right => CellPos::new(cur.row, (cur.col + 1).min(cols - 1)),
        };
        self.set_selected_cell(next);
        Some(next)
    }

    pub fn begin_formula_edit(&mut self, target: CellPos, text: impl Into<String>) {
        let text = text.into();
        let cursor_pos = text.chars().count();
        self.formula_edit = Some(FormulaEdit {
            target,
            text,
            cursor_pos,
        });
    }

    /// Track editor changes. Leaving formula mode (text no longer starting
    /// with `=`) does not end the edit; only [`Self::finish_formula_edit`] does.
    pub fn update_formula_edit(&mut self, text: impl Into<String>, cursor_pos: usize) {
        if let Some(edit) = self.formula_edit.as_mut() {
            edit.text = text.into();
            edit.cursor_pos = cursor_pos.min(edit.text.chars().count());
        }
    }

    pub fn finish_formula_edit(&mut self) -> Option<FormulaEdit> {
        self.inserting = None;
        self.formula_edit.take()
    }

    /// Every selected position, each once, in row-major order per range.
    pub fn selected_positions(&self) -> Vec<CellPos> {
        let mut seen = std::collections::HashSet::new();
        self.ranges
            .iter()
            .flat_map(|r| r.positions())
            .filter(|p| seen.insert(*p))
            .collect()
    }
}

/// `cell("A1")` / `cell('A1:B2')` ending exactly at the end of the text.
fn trailing_accessor_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)cell\(\s*(?:"[a-z0-9:]+"|'[a-z0-9:]+')\s*\)$"#)
            .expect("trailing accessor regex must compile")
    })
}

/// Splice `cell("<label>")` into `text` at the char index `cursor_pos`.
///
/// If an accessor call ends exactly at the caret it is replaced, so
/// repeated drags keep rewriting the same reference.
pub fn insert_cell_reference(text: &str, cursor_pos: usize, label: &str) -> ReferenceInsert {
    let split = text
        .char_indices()
        .nth(cursor_pos)
        .map_or(text.len(), |(i, _)| i);
    let (before, after) = text.split_at(split);
    let insert = format!("cell(\"{}\")", label);

    let kept = match trailing_accessor_re().find(before) {
        Some(m) => &before[..m.start()],
        None => before,
    };
    let new_before = format!("{}{}", kept, insert);
    ReferenceInsert {
        cursor_pos: new_before.chars().count(),
        text: format!("{}{}", new_before, after),
    }
}
