//! Optimizer Error Types
//!
//! Fatal conditions raised by the rewriter and the scheduler. A rule that
//! simply does not match is not an error.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use thiserror::Error;
use weft_ir::{DType, IrError, OpType};

/// Result type for optimizer operations.
pub type OptResult<T> = Result<T, OptError>;

/// Errors that abort a compilation unit.
#[derive(Error, Debug)]
pub enum OptError {
    /// Constant operands disagree in shape.
    #[error("Shape mismatch at {node} ({op}): {message}")]
    ShapeMismatch {
        /// Offending node name.
        node: String,
        /// Offending operator.
        op: OpType,
        /// What disagreed.
        message: String,
    },

    /// Constant operands disagree in element type, or the type cannot be folded.
    #[error("DType mismatch at {node} ({op}): expected {expected}, got {actual}")]
    DTypeMismatch {
        /// Offending node name.
        node: String,
        /// Offending operator.
        op: OpType,
        /// Expected element type.
        expected: DType,
        /// Actual element type.
        actual: DType,
    },

    /// A live node never became ready during scheduling.
    #[error("Unschedulable node {node} ({op}): cycle or input that is neither a graph input nor produced")]
    Unschedulable {
        /// First node, in graph order, that never became ready.
        node: String,
        /// Its operator.
        op: OpType,
    },

    /// Graph mutation failed.
    #[error("Graph error: {0}")]
    Ir(#[from] IrError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_node() {
        let err = OptError::Unschedulable {
            node: "Relu_3".to_string(),
            op: OpType::Relu,
        };
        assert!(err.to_string().contains("Relu_3 (Relu)"));

        let err = OptError::DTypeMismatch {
            node: "BatchNormalization_0".to_string(),
            op: OpType::BatchNormalization,
            expected: DType::F32,
            actual: DType::F64,
        };
        assert_eq!(
            err.to_string(),
            "DType mismatch at BatchNormalization_0 (BatchNormalization): expected f32, got f64"
        );
    }
}
