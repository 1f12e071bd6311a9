//! IR Error Types
//!
//! Error types for graph construction and mutation.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use thiserror::Error;

use crate::graph::{NodeId, ValueId};

/// Result type for IR operations.
pub type IrResult<T> = Result<T, IrError>;

/// Errors raised by the graph model and the subgraph builder.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IrError {
    /// A node id that does not belong to this graph.
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    /// A value id that does not belong to this graph.
    #[error("Unknown value: {0}")]
    UnknownValue(ValueId),

    /// A value that already has a live producer was bound as a node output.
    #[error("Value '{value}' already produced by live node '{producer}'")]
    MultipleProducers {
        /// Name of the value.
        value: String,
        /// Name of the node that currently produces it.
        producer: String,
    },

    /// Tensor construction failed.
    #[error("Invalid tensor: {0}")]
    InvalidTensor(String),

    /// Structural invariant violated.
    #[error("Invalid graph: {0}")]
    InvalidGraph(String),
}
