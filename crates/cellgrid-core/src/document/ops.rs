use tracing::debug;

use super::Document;
use super::cell::{Cell, CellStyle};
use super::events::EngineEvent;
use crate::error::{CellgridError, Result};
use cellgrid_engine::engine::{
    CellPos, CellValue, DataType, Format, extract_dependency_keys_capped,
};

impl Document {
    /// Write user input (or an already typed value) into a cell.
    ///
    /// Text starting with `=` is a formula. Other text is parsed into a
    /// typed literal. Empty input clears the value but keeps style, pinned
    /// type and format.
    pub fn set_cell(&mut self, pos: CellPos, value: impl Into<CellValue>) {
        let value = value.into();
        if let CellValue::Text(text) = &value
            && text.trim_start().starts_with('=')
        {
            let formula = text.trim().to_string();
            self.set_cell_formula(pos, &formula);
            return;
        }

        let value = match value {
            CellValue::Text(text) => CellValue::from_input(&text),
            other => other,
        };
        self.write_literal(pos, value);
    }

    /// [`Document::set_cell`] addressed by an A1 reference.
    pub fn set_cell_a1(&mut self, reference: &str, value: impl Into<CellValue>) -> Result<()> {
        let pos = CellPos::from_a1(reference)
            .ok_or_else(|| CellgridError::InvalidReference(reference.to_string()))?;
        self.set_cell(pos, value);
        Ok(())
    }

    pub fn clear_cell(&mut self, pos: CellPos) {
        self.write_literal(pos, CellValue::Empty);
    }

    /// Store `value` verbatim (no input parsing).
    pub(crate) fn write_literal(&mut self, pos: CellPos, value: CellValue) {
        self.detach_formula(pos);

        if value.is_empty() {
            if let Some(mut cell) = self.grid.get_mut(&pos) {
                cell.clear_value();
            }
            debug!(cell = %pos, "cleared");
        } else {
            let mut cell = self.grid.entry(pos).or_default();
            cell.formula = None;
            cell.computed = false;
            cell.store_value(value);
            debug!(cell = %pos, value = %cell.display_value, "set literal");
        }

        self.modified = true;
        self.recalculate_dependents(pos);
        self.events.push_back(EngineEvent::CellCommitted { pos });
    }

    /// Assign a formula (text including the leading `=`) and evaluate it.
    pub fn set_cell_formula(&mut self, pos: CellPos, formula: &str) {
        let deps = extract_dependency_keys_capped(formula, self.config.max_range_cells);

        self.detach_formula(pos);
        for source in &deps {
            self.graph.add_dependency(*source, pos);
        }

        {
            let mut cell = self.grid.entry(pos).or_default();
            cell.formula = Some(formula.to_string());
            cell.computed = true;
            cell.depends_on = deps;
        }
        debug!(cell = %pos, formula, "set formula");

        self.modified = true;
        self.recalculate_cell(pos);
        self.events.push_back(EngineEvent::CellCommitted { pos });
    }

    /// Merge presentational attributes into the cell's style.
    pub fn set_cell_style<K, V>(&mut self, pos: CellPos, style: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut cell = self.grid.entry(pos).or_default();
        cell.style
            .extend(style.into_iter().map(|(k, v)| (k.into(), v.into())));
        self.modified = true;
    }

    /// Pin the cell to `data_type` (or unpin with `None`) and re-validate.
    pub fn set_cell_data_type(&mut self, pos: CellPos, data_type: Option<DataType>) {
        {
            let mut cell = self.grid.entry(pos).or_default();
            cell.set_data_type_override(data_type);
            debug!(cell = %pos, data_type = ?data_type, "set data type");
        }
        self.modified = true;
        self.recalculate_dependents(pos);
    }

    /// Change the display format. The format must be offered for the
    /// cell's current data type.
    pub fn set_cell_formatting(&mut self, pos: CellPos, format: Format) -> Result<()> {
        let data_type = self
            .grid
            .get(&pos)
            .map(|cell| cell.data_type)
            .unwrap_or(DataType::Empty);
        if !format.allowed_for(data_type) {
            return Err(CellgridError::FormatNotAllowed { format, data_type });
        }
        let mut cell = self.grid.entry(pos).or_default();
        cell.formatting = format;
        cell.refresh_display();
        self.modified = true;
        Ok(())
    }

    /// Remove the graph edges of the formula currently stored at `pos`.
    fn detach_formula(&mut self, pos: CellPos) {
        let old = match self.grid.get(&pos) {
            Some(cell) if !cell.depends_on.is_empty() => cell.depends_on.clone(),
            _ => return,
        };
        self.graph.remove_listener(pos, &old);
        if let Some(mut cell) = self.grid.get_mut(&pos) {
            cell.depends_on.clear();
        }
    }

    /// Snapshot of a cell, if it has ever been written.
    pub fn cell(&self, pos: CellPos) -> Option<Cell> {
        self.grid.get(&pos).map(|c| c.clone())
    }

    pub fn display(&self, pos: CellPos) -> String {
        self.grid
            .get(&pos)
            .map(|c| c.display_value.clone())
            .unwrap_or_default()
    }

    pub fn raw_value(&self, pos: CellPos) -> CellValue {
        self.grid
            .get(&pos)
            .map(|c| c.raw_value.clone())
            .unwrap_or_default()
    }

    pub fn formula(&self, pos: CellPos) -> Option<String> {
        self.grid.get(&pos).and_then(|c| c.formula.clone())
    }

    pub fn style(&self, pos: CellPos) -> CellStyle {
        self.grid
            .get(&pos)
            .map(|c| c.style.clone())
            .unwrap_or_default()
    }

    /// Number of materialized cells (including cleared ones).
    pub fn cell_count(&self) -> usize {
        self.grid.len()
    }
}
