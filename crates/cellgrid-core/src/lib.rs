//! cellgrid-core - UI-agnostic document model, recalculation, selection and viewport.

pub mod config;
pub mod document;
pub mod error;
pub mod selection;
pub mod viewport;

pub use config::EngineConfig;
pub use document::{
    Cell, CellError, ClipboardData, DependencyGraph, Document, EngineEvent, ErrorKind, Grid,
};
pub use error::{CellgridError, Result};
pub use selection::{Direction, ReferenceInsert, SelectionModel};
pub use viewport::{SizeMap, Viewport, VisibleWindow};

pub use cellgrid_engine::engine::{CellPos, CellRange, CellValue, DataType, Format};
