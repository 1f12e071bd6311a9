//! Config - Compiler Configuration
//!
//! TOML configuration for the pass pipeline.
//!
//! ```toml
//! [merge]
//! fuse_operations = true
//!
//! [fusion]
//! backends = ["dldt"]
//! ```
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use std::path::Path;

use serde::{Deserialize, Serialize};
use weft_opt::MergeConfig;

use crate::error::WeftResult;

// =============================================================================
// Compiler Configuration
// =============================================================================

/// Pipeline configuration (weft.toml)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CompilerConfig {
    /// Rewriter settings
    #[serde(default)]
    pub merge: MergeSection,

    /// Fusion settings
    #[serde(default)]
    pub fusion: FusionSection,

    /// Scheduler settings
    #[serde(default)]
    pub schedule: ScheduleSection,
}

// =============================================================================
// Sections
// =============================================================================

/// `[merge]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeSection {
    /// Run the rewriter at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Keep gradient-supporting nodes; disables Conv/BatchNorm folding
    #[serde(default)]
    pub gen_backprop: bool,

    /// Experimental BatchNorm/Relu fusion
    #[serde(default)]
    pub fuse_operations: bool,

    /// Cap on rewriter scans
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<usize>,
}

impl Default for MergeSection {
    fn default() -> Self {
        Self {
            enabled: true,
            gen_backprop: false,
            fuse_operations: false,
            max_iterations: None,
        }
    }
}

impl MergeSection {
    /// Flags for [`weft_opt::merge_operations`].
    pub fn to_merge_config(&self) -> MergeConfig {
        MergeConfig {
            gen_backprop: self.gen_backprop,
            fuse_operations: self.fuse_operations,
            max_iterations: self.max_iterations,
        }
    }
}

/// `[fusion]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FusionSection {
    /// Backends to run, in order
    #[serde(default)]
    pub backends: Vec<String>,

    /// Overrides every backend's minimum group size
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_group_size: Option<usize>,
}

/// `[schedule]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSection {
    /// Run the graph sanity check after every pass
    #[serde(default = "default_true")]
    pub check_sanity: bool,
}

impl Default for ScheduleSection {
    fn default() -> Self {
        Self { check_sanity: true }
    }
}

fn default_true() -> bool {
    true
}

// =============================================================================
// Loading
// =============================================================================

impl CompilerConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(s: &str) -> WeftResult<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> WeftResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Render the configuration as TOML
    pub fn to_toml_string(&self) -> WeftResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
