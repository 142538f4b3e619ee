//! Typed notifications emitted by the document.
//!
//! Events are queued on the [`Document`](super::Document) and handed out by
//! [`Document::drain_events`](super::Document::drain_events). Nothing is
//! delivered synchronously.

use cellgrid_engine::engine::CellPos;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineEvent {
    /// A cell value was written through a set operation.
    CellCommitted { pos: CellPos },
    /// A range was selected while editing a formula; the editor should
    /// replace its text and move the caret.
    FormulaReferenceInsert { text: String, cursor_pos: usize },
}
