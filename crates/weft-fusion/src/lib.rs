//! Weft Fusion - Backend-Directed Fusion Grouping
//!
//! Partitions a dataflow graph into groups that an accelerator backend can
//! compile independently:
//!
//! - [`fuse_all_connected_nodes`]: generic connected-component grouper
//! - [`FusionBackend`]: per-backend fusability policy
//! - built-in backends: [`DldtBackend`] and [`ElementwiseBackend`]
//!
//! # Example
//! ```ignore
//! use weft_fusion::{fuse_operations, DldtBackend, fuse_with_backend};
//!
//! let fused = fuse_with_backend(&mut graph, &DldtBackend)?;
//! for id in fused {
//!     let group = graph.node(id).fusion_group().unwrap();
//!     println!("{} -> {} members", group.backend, group.members.len());
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

pub mod backend;
pub mod backends;
pub mod error;
pub mod grouper;

pub use backend::{
    backend_by_name, fuse_operations, fuse_with_backend, BackendGroups, FusionBackend,
    AVAILABLE_BACKENDS,
};
pub use backends::{DldtBackend, ElementwiseBackend, DLDT_EXCLUDED_OPS, DLDT_FUSABLE_OPS};
pub use error::{FusionError, FusionResult};
pub use grouper::{fuse_all_connected_nodes, has_static_shapes, FUSION_ATTR_BACKEND};
