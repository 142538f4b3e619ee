//! Formula evaluation against the grid and dependent propagation.

use tracing::{trace, warn};

use super::Document;
use super::cell::{CellError, ErrorKind, Grid};
use cellgrid_engine::engine::{
    CellPos, CellRange, CellResolver, CellValue, EvalError, MAX_DEPENDENCY_RANGE_CELLS,
    collect_range, evaluate,
};

/// Reads cell values straight out of the grid.
///
/// Errored cells still yield their last good `raw_value`. Ranges larger than
/// `max_range_cells` are refused, matching the ranges that get no
/// dependency edges.
pub struct GridResolver<'a> {
    grid: &'a Grid,
    max_range_cells: usize,
}

impl<'a> GridResolver<'a> {
    pub fn new(grid: &'a Grid) -> Self {
        Self::with_range_cap(grid, MAX_DEPENDENCY_RANGE_CELLS)
    }

    pub fn with_range_cap(grid: &'a Grid, max_range_cells: usize) -> Self {
        GridResolver {
            grid,
            max_range_cells,
        }
    }

    fn value_at(&self, pos: CellPos) -> CellValue {
        self.grid
            .get(&pos)
            .map(|cell| cell.raw_value.clone())
            .unwrap_or_default()
    }
}

impl CellResolver for GridResolver<'_> {
    fn resolve(&self, reference: &str) -> Result<CellValue, EvalError> {
        let range = CellRange::parse(reference)
            .ok_or_else(|| EvalError::InvalidReference(reference.to_string()))?;
        match range.cell_count() {
            Some(n) if n <= self.max_range_cells => {}
            _ => {
                return Err(EvalError::RangeTooLarge {
                    reference: reference.to_string(),
                    max: self.max_range_cells,
                });
            }
        }
        Ok(collect_range(&range, |pos| self.value_at(pos)))
    }
}

impl Document {
    /// Evaluate `pos` (if it holds a formula) and everything downstream of it.
    pub fn recalculate_cell(&mut self, pos: CellPos) {
        self.run_cascade(pos, true);
    }

    /// Re-evaluate every cell that transitively reads `pos`, but not `pos`.
    pub fn recalculate_dependents(&mut self, pos: CellPos) {
        self.run_cascade(pos, false);
    }

    /// Evaluate every formula in the grid in dependency order.
    pub fn recalculate_all(&mut self) {
        let scope = self
            .grid
            .iter()
            .filter(|entry| entry.computed)
            .map(|entry| *entry.key())
            .collect();
        self.evaluate_scope(scope);
    }

    fn run_cascade(&mut self, origin: CellPos, include_origin: bool) {
        let mut scope = self.graph.reachable_from(origin);
        if include_origin {
            scope.insert(origin);
        }
        if scope.is_empty() {
            return;
        }
        trace!(origin = %origin, cells = scope.len(), "recalculating");
        self.evaluate_scope(scope);
    }

    fn evaluate_scope(&mut self, scope: std::collections::BTreeSet<CellPos>) {
        let (order, stuck) = self.graph.topological_order(&scope);
        for pos in order {
            self.evaluate_cell(pos);
        }

        if stuck.is_empty() {
            return;
        }
        warn!(
            cells = %stuck.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(","),
            "circular reference"
        );
        for pos in stuck {
            if let Some(mut cell) = self.grid.get_mut(&pos) {
                cell.store_error(CellError::new(
                    ErrorKind::Circular,
                    "Circular reference detected",
                ));
            }
        }
    }

    /// Evaluate a single formula cell and store the outcome on it.
    fn evaluate_cell(&mut self, pos: CellPos) {
        let (formula, sources) = match self.grid.get(&pos) {
            Some(cell) if cell.computed => match &cell.formula {
                Some(f) => (f.clone(), cell.depends_on.clone()),
                None => return,
            },
            _ => return,
        };

        // Sources are ordered first, so a circular source is still on a cycle.
        if let Some(source) = sources.iter().find(|src| self.is_circular(src)) {
            trace!(cell = %pos, source = %source, "reads a circular reference");
            if let Some(mut cell) = self.grid.get_mut(&pos) {
                cell.store_error(CellError::new(
                    ErrorKind::Circular,
                    format!("Reads circular reference {}", source),
                ));
            }
            return;
        }

        let resolver = GridResolver::with_range_cap(&self.grid, self.config.max_range_cells);
        let result = evaluate(&formula, &resolver);

        let Some(mut cell) = self.grid.get_mut(&pos) else {
            return;
        };
        match result {
            Ok(value) => {
                trace!(cell = %pos, "evaluated");
                cell.store_value(value);
            }
            Err(err) => {
                trace!(cell = %pos, error = %err, "evaluation failed");
                let kind = if err.is_reference() {
                    ErrorKind::Reference
                } else {
                    ErrorKind::Formula
                };
                cell.store_error(CellError::new(kind, err.to_string()));
            }
        }
    }

    fn is_circular(&self, pos: &CellPos) -> bool {
        self.grid
            .get(pos)
            .and_then(|cell| cell.error.as_ref().map(|e| e.kind == ErrorKind::Circular))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolver_reads_single_and_range() {
        let grid = Grid::new();
        let mut a1 = crate::document::Cell::new_empty();
        a1.store_value(CellValue::Number(4.0));
        grid.insert(CellPos::new(0, 0), a1);

        let resolver = GridResolver::new(&grid);
        assert_eq!(resolver.resolve("A1"), Ok(CellValue::Number(4.0)));
        assert_eq!(
            resolver.resolve("A1:A2"),
            Ok(CellValue::Sequence(vec![CellValue::Number(4.0), CellValue::Empty]))
        );
        assert!(resolver.resolve("nope").unwrap_err().is_reference());
    }

    #[test]
    fn test_resolver_refuses_ranges_over_the_cap() {
        let grid = Grid::new();
        let resolver = GridResolver::with_range_cap(&grid, 4);
        assert!(resolver.resolve("A1:B2").is_ok());
        let err = resolver.resolve("A1:A5").unwrap_err();
        assert!(err.is_reference());
        assert!(matches!(err, EvalError::RangeTooLarge { max: 4, .. }));
        // Whole-sheet ranges are refused without reading a cell.
        assert!(GridResolver::new(&grid).resolve("A1:XFD1048576").is_err());
    }

    #[test]
    fn test_self_reference_is_circular() {
        let mut doc = Document::default();
        doc.set_cell(CellPos::new(0, 0), "=cell(\"A1\") + 1");
        let cell = doc.cell(CellPos::new(0, 0)).unwrap();
        assert_eq!(cell.error.map(|e| e.kind), Some(ErrorKind::Circular));
        assert_eq!(cell.display_value, "#CIRC!");
    }

    #[test]
    fn test_bad_reference_is_reference_error() {
        let mut doc = Document::default();
        doc.set_cell(CellPos::new(0, 0), "=cell(\"1A\")");
        let cell = doc.cell(CellPos::new(0, 0)).unwrap();
        assert_eq!(cell.error.map(|e| e.kind), Some(ErrorKind::Reference));
        assert_eq!(cell.display_value, "#REF!");
    }

    #[test]
    fn test_recalculate_all_picks_up_direct_grid_edits() {
        let mut doc = Document::default();
        doc.set_cell(CellPos::new(0, 0), 2);
        doc.set_cell(CellPos::new(0, 1), "=cell(\"A1\") * 10");
        if let Some(mut a1) = doc.grid.get_mut(&CellPos::new(0, 0)) {
            a1.store_value(CellValue::Number(3.0));
        }
        doc.recalculate_all();
        assert_eq!(doc.display(CellPos::new(0, 1)), "30");
    }
}
