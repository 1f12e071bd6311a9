//! Weft IR - Dataflow Graph Model
//!
//! The graph representation shared by every Weft pass:
//!
//! - [`Graph`], [`Node`] and [`Value`] stored in an arena with stable ids
//! - detach-not-delete mutation, safe under in-flight traversal snapshots
//! - [`GraphBuilder`], the only way passes introduce replacement nodes
//! - constant [`Tensor`] payloads backed by `ndarray`
//!
//! # Example
//! ```ignore
//! use weft_ir::{Attributes, DType, Graph, OpType, ValueType};
//!
//! let mut graph = Graph::new("mlp");
//! let x = graph.add_input("x", ValueType::new(DType::F32, &[1, 16]));
//! let y = graph.add_value("y", ValueType::new(DType::F32, &[1, 16]));
//! graph.add_node(OpType::Relu, &[x], &[y], Attributes::new())?;
//! graph.add_output(y)?;
//! graph.check_sanity()?;
//! ```
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

pub mod attr;
pub mod builder;
mod check;
pub mod error;
pub mod graph;
pub mod op;
pub mod tensor;
pub mod types;

pub use attr::{Attribute, Attributes};
pub use builder::GraphBuilder;
pub use error::{IrError, IrResult};
pub use graph::{FusionGroup, Graph, Node, NodeId, Use, Value, ValueId};
pub use op::{ActivationKind, OpType};
pub use tensor::{DType, Tensor};
pub use types::{Dim, ValueType};
