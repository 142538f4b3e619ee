//! Document state and logic (UI-agnostic).

mod cell;
mod clipboard;
mod events;
mod graph;
mod ops;
mod recalc;

pub use cell::{Cell, CellError, CellStyle, ErrorKind, Grid};
pub use clipboard::{ClipboardCell, ClipboardData};
pub use events::EngineEvent;
pub use graph::DependencyGraph;
pub use recalc::GridResolver;

use std::collections::VecDeque;

use crate::config::EngineConfig;
use crate::selection::{Direction, ReferenceInsert, SelectionModel};
use crate::viewport::{Viewport, VisibleWindow};
use cellgrid_engine::engine::{CellPos, CellRange, extract_references, reference_color};

/// One spreadsheet: cells, their dependency graph, and the interaction
/// state around them.
pub struct Document {
    /// The spreadsheet grid
    pub grid: Grid,
    /// Reverse dependency map: cell -> cells whose formulas read it
    pub graph: DependencyGraph,
    pub selection: SelectionModel,
    /// Row heights and column widths
    pub viewport: Viewport,
    pub config: EngineConfig,
    /// Whether the grid has been modified
    pub modified: bool,
    pub(crate) clipboard: Option<ClipboardData>,
    pub(crate) events: VecDeque<EngineEvent>,
}

impl Document {
    pub fn new(config: EngineConfig) -> Self {
        Document {
            grid: Grid::new(),
            graph: DependencyGraph::new(),
            selection: SelectionModel::new(),
            viewport: Viewport::from_config(&config),
            config,
            modified: false,
            clipboard: None,
            events: VecDeque::new(),
        }
    }

    /// Take all queued events, oldest first.
    pub fn drain_events(&mut self) -> impl Iterator<Item = EngineEvent> + '_ {
        self.events.drain(..)
    }

    /// Finish a mouse selection. While a formula is being edited this
    /// queues [`EngineEvent::FormulaReferenceInsert`] for the editor.
    pub fn end_selection(&mut self) -> Option<ReferenceInsert> {
        let insert = self.selection.end_selection()?;
        self.events.push_back(EngineEvent::FormulaReferenceInsert {
            text: insert.text.clone(),
            cursor_pos: insert.cursor_pos,
        });
        Some(insert)
    }

    /// Arrow-key navigation within the configured grid bounds.
    pub fn move_focus(&mut self, direction: Direction) -> Option<CellPos> {
        self.selection
            .move_focus(direction, self.config.row_count, self.config.col_count)
    }

    pub fn set_row_height(&mut self, row: usize, height: f64) {
        self.viewport.rows.set(row, height);
    }

    pub fn set_column_width(&mut self, col: usize, width: f64) {
        self.viewport.cols.set(col, width);
    }

    pub fn visible_window(
        &self,
        scroll_top: f64,
        scroll_left: f64,
        height: f64,
        width: f64,
    ) -> VisibleWindow {
        self.viewport.visible(scroll_top, scroll_left, height, width)
    }

    /// References in a formula being edited, each with its highlight colour.
    pub fn reference_highlights(formula: &str) -> Vec<(CellRange, &'static str)> {
        extract_references(formula)
            .into_iter()
            .enumerate()
            .map(|(i, range)| (range, reference_color(i)))
            .collect()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellgrid_engine::engine::REFERENCE_COLORS;

    #[test]
    fn test_new_document_is_empty() {
        let doc = Document::default();
        assert_eq!(doc.cell_count(), 0);
        assert!(doc.graph.is_empty());
        assert!(!doc.modified);
    }

    #[test]
    fn test_end_selection_queues_reference_insert() {
        let mut doc = Document::default();
        doc.selection.begin_formula_edit(CellPos::new(0, 2), "=");
        doc.selection.start_selection(CellPos::new(0, 0), false);
        let insert = doc.end_selection().unwrap();
        assert_eq!(insert.text, "=cell(\"A1\")");

        let events: Vec<_> = doc.drain_events().collect();
        assert_eq!(
            events,
            vec![EngineEvent::FormulaReferenceInsert {
                text: "=cell(\"A1\")".into(),
                cursor_pos: 11,
            }]
        );
    }

    #[test]
    fn test_row_height_override_moves_window() {
        let mut doc = Document::default();
        assert_eq!(doc.visible_window(200.0, 0.0, 100.0, 240.0).rows, 3..18);
        doc.set_row_height(0, 225.0);
        assert_eq!(doc.visible_window(200.0, 0.0, 100.0, 240.0).rows.start, 0);
    }

    #[test]
    fn test_reference_highlights_assign_colors_in_order() {
        let refs = Document::reference_highlights("=cell(\"A1\") + B2");
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].1, REFERENCE_COLORS[0]);
        assert_eq!(refs[1].1, REFERENCE_COLORS[1]);
        assert_eq!(refs[1].0.label(), "B2");
    }

    #[test]
    fn test_move_focus_stays_in_grid() {
        let mut doc = Document::default();
        doc.selection.set_selected_cell(CellPos::new(99, 25));
        assert_eq!(doc.move_focus(Direction::Down), Some(CellPos::new(99, 25)));
        assert_eq!(doc.move_focus(Direction::Left), Some(CellPos::new(99, 24)));
    }
}
