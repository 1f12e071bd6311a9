//! Fusion Error Types
//!
//! Error types for fusion grouping.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use thiserror::Error;
use weft_ir::IrError;

/// Result type for fusion operations.
pub type FusionResult<T> = Result<T, FusionError>;

/// Errors that can occur while collapsing fusion groups.
#[derive(Error, Debug)]
pub enum FusionError {
    /// No backend is registered under this name.
    #[error("Unknown fusion backend: {0}")]
    UnknownBackend(String),

    /// Graph mutation failed.
    #[error("Graph error: {0}")]
    Ir(#[from] IrError),
}
