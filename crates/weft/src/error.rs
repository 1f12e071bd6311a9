//! Error - Compiler Error Types
//!
//! Top-level error type covering every pass and the configuration layer.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use thiserror::Error;
use weft_fusion::FusionError;
use weft_ir::IrError;
use weft_opt::OptError;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that abort a compilation unit.
#[derive(Error, Debug)]
pub enum WeftError {
    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Graph model error
    #[error(transparent)]
    Ir(#[from] IrError),

    /// Fusion error
    #[error(transparent)]
    Fusion(#[from] FusionError),

    /// Rewriter or scheduler error
    #[error(transparent)]
    Opt(#[from] OptError),
}

/// Result type for compiler operations
pub type WeftResult<T> = Result<T, WeftError>;

// =============================================================================
// Error Conversion
// =============================================================================

impl From<toml::de::Error> for WeftError {
    fn from(e: toml::de::Error) -> Self {
        WeftError::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for WeftError {
    fn from(e: toml::ser::Error) -> Self {
        WeftError::Config(e.to_string())
    }
}
