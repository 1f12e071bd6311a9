//! Weft - Neural Network Graph Compiler Middle-End
//!
//! Umbrella crate over the graph model, the fusion grouper and the
//! rewriting/scheduling passes, plus the configured [`Pipeline`] that runs
//! them in sequence.
//!
//! # Example
//! ```ignore
//! use weft::prelude::*;
//!
//! let config = CompilerConfig::load("weft.toml")?;
//! let report = Pipeline::new(config).run(&mut graph)?;
//! for id in &report.sequence {
//!     println!("{}", graph.node(*id).name());
//! }
//! ```
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

pub mod config;
pub mod error;
pub mod pipeline;

pub use weft_fusion as fusion;
pub use weft_ir as ir;
pub use weft_opt as opt;

pub use config::{CompilerConfig, FusionSection, MergeSection, ScheduleSection};
pub use error::{WeftError, WeftResult};
pub use pipeline::{CompileReport, Pipeline};

/// Common imports
pub mod prelude {
    pub use crate::config::CompilerConfig;
    pub use crate::error::{WeftError, WeftResult};
    pub use crate::pipeline::{CompileReport, Pipeline};
    pub use weft_fusion::{fuse_operations, FusionBackend};
    pub use weft_ir::{
        Attributes, DType, Graph, GraphBuilder, Node, NodeId, OpType, Tensor, ValueId, ValueType,
    };
    pub use weft_opt::{merge_operations, schedule_computation, MergeConfig};
}
