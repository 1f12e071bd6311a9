//! Weft Opt - Graph Rewriting and Scheduling
//!
//! The passes that run after a graph has been imported:
//!
//! - [`merge_operations`]: fixed-point local rewrites (Split/Concat
//!   cancellation, Pad/Conv and Conv/BatchNorm folding, Transpose/Gemm
//!   absorption, experimental BatchNorm/Relu fusion)
//! - [`schedule_computation`]: dead-code exclusion and execution ordering
//!
//! # Example
//! ```ignore
//! use weft_opt::{merge_operations, schedule_computation, MergeConfig};
//!
//! let stats = merge_operations(&mut graph, &MergeConfig::default())?;
//! let sequence = schedule_computation(&mut graph)?;
//! ```
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

pub mod error;
pub mod merge;
pub mod schedule;

pub use error::{OptError, OptResult};
pub use merge::{merge_operations, ConvBnOperands, MergeConfig, MergeRule, MergeStats};
pub use schedule::{live_nodes_from_outputs, schedule_computation};
