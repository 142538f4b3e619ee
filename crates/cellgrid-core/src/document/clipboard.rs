//! In-memory clipboard: copy, cut and paste rectangular blocks.
//!
//! Copies shift `cell("...")` references by the paste offset so formulas
//! keep pointing at the same relative cells. Cuts move formulas verbatim.

use tracing::debug;

use super::Document;
use super::cell::CellStyle;
use crate::error::{CellgridError, Result};
use cellgrid_engine::engine::{
    CellPos, CellRange, CellValue, DataType, Format, offset_formula_references,
};

/// One copied cell.
#[derive(Clone, Debug, PartialEq)]
pub struct ClipboardCell {
    pub raw_value: CellValue,
    pub formula: Option<String>,
    pub style: CellStyle,
    pub formatting: Format,
    pub data_type_override: Option<DataType>,
}

/// Rectangular snapshot, row-major. `None` marks a cell that did not exist.
#[derive(Clone, Debug, PartialEq)]
pub struct ClipboardData {
    pub cells: Vec<Vec<Option<ClipboardCell>>>,
    /// Normalized source rectangle.
    pub source: CellRange,
    pub is_cut: bool,
}

impl ClipboardData {
    pub fn rows(&self) -> usize {
        self.cells.len()
    }

    pub fn cols(&self) -> usize {
        self.cells.first().map_or(0, Vec::len)
    }
}

impl Document {
    pub fn copy(&mut self, range: CellRange) {
        self.clipboard = Some(self.snapshot(range, false));
    }

    /// Like [`Document::copy`]; the source is cleared on the next paste.
    pub fn cut(&mut self, range: CellRange) {
        self.clipboard = Some(self.snapshot(range, true));
    }

    pub fn clipboard(&self) -> Option<&ClipboardData> {
        self.clipboard.as_ref()
    }

    fn snapshot(&self, range: CellRange, is_cut: bool) -> ClipboardData {
        let range = range.normalized();
        let (tl, br) = (range.top_left(), range.bottom_right());
        let cells = (tl.row..=br.row)
            .map(|row| {
                (tl.col..=br.col)
                    .map(|col| {
                        self.grid.get(&CellPos::new(row, col)).map(|cell| ClipboardCell {
                            raw_value: cell.raw_value.clone(),
                            formula: cell.formula.clone(),
                            style: cell.style.clone(),
                            formatting: cell.formatting,
                            data_type_override: cell.data_type_override,
                        })
                    })
                    .collect()
            })
            .collect();
        debug!(range = %range, is_cut, "clipboard snapshot");
        ClipboardData {
            cells,
            source: range,
            is_cut,
        }
    }

    /// Paste the clipboard with its top-left corner at `at`.
    ///
    /// Returns the rectangle that was written. Cells that would land
    /// outside the addressable grid are skipped.
    pub fn paste(&mut self, at: CellPos) -> Result<CellRange> {
        let data = self.clipboard.clone().ok_or(CellgridError::EmptyClipboard)?;
        let origin = data.source.top_left();
        let delta_row = at.row as isize - origin.row as isize;
        let delta_col = at.col as isize - origin.col as isize;

        for (r, row) in data.cells.iter().enumerate() {
            for (c, entry) in row.iter().enumerate() {
                let Some(target) = at.offset(r as isize, c as isize) else {
                    continue;
                };
                match entry {
                    Some(copied) => self.paste_cell(target, copied, data.is_cut, delta_row, delta_col),
                    None => {
                        if self.grid.contains_key(&target) {
                            self.clear_cell(target);
                        }
                    }
                }
            }
        }

        let dest = CellRange::new(
            at,
            CellPos::new(
                at.row + data.rows().saturating_sub(1),
                at.col + data.cols().saturating_sub(1),
            ),
        );

        if data.is_cut {
            for pos in data.source.positions() {
                if !dest.contains(pos.row, pos.col) && self.grid.contains_key(&pos) {
                    self.clear_cell(pos);
                }
            }
            self.clipboard = None;
        }

        debug!(from = %data.source, to = %dest, is_cut = data.is_cut, "pasted");
        Ok(dest)
    }

    fn paste_cell(
        &mut self,
        target: CellPos,
        copied: &ClipboardCell,
        is_cut: bool,
        delta_row: isize,
        delta_col: isize,
    ) {
        self.set_cell_data_type(target, copied.data_type_override);
        if let Some(mut cell) = self.grid.get_mut(&target) {
            cell.style = copied.style.clone();
            if copied.formatting.allowed_for(cell.data_type) {
                cell.formatting = copied.formatting;
            }
        }

        match &copied.formula {
            Some(formula) if is_cut => self.set_cell_formula(target, formula),
            Some(formula) => {
                let shifted = offset_formula_references(formula, delta_row, delta_col);
                self.set_cell_formula(target, &shifted);
            }
            None => self.write_literal(target, copied.raw_value.clone()),
        }

        // The value may have changed the data type; formats follow it.
        if let Some(mut cell) = self.grid.get_mut(&target) {
            if copied.formatting.allowed_for(cell.data_type) {
                cell.formatting = copied.formatting;
            }
            cell.refresh_display();
        }
    }

    /// Clear every cell in the current selection.
    pub fn clear_selected(&mut self) {
        for pos in self.selection.selected_positions() {
            if self.grid.contains_key(&pos) {
                self.clear_cell(pos);
            }
        }
    }
}
