//! Error types for cellgrid core.

use thiserror::Error;

use cellgrid_engine::engine::{DataType, Format};

/// Errors returned by document operations.
///
/// Formula failures are *not* reported here: they are stored on the cell
/// that failed (see [`crate::CellError`]).
#[derive(Error, Debug)]
pub enum CellgridError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Invalid cell reference: {0}")]
    InvalidReference(String),

    #[error("Format {format} is not available for {data_type} cells")]
    FormatNotAllowed { format: Format, data_type: DataType },

    #[error("Clipboard is empty")]
    EmptyClipboard,
}

pub type Result<T> = std::result::Result<T, CellgridError>;
