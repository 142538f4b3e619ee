//! cellgrid_engine - formula language, references and value formatting.

pub mod builtins;
pub mod engine;
