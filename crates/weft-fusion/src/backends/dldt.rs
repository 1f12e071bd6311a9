//! DLDT Inference Engine Backend
//!
//! Operator allowlist of the DLDT model optimizer's ONNX front end, plus the
//! side conditions its nearest-neighbour resize support imposes.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use weft_ir::{Graph, Node, OpType};

use crate::backend::FusionBackend;

/// Operators the DLDT front end imports.
pub const DLDT_FUSABLE_OPS: &[OpType] = &[
    OpType::Add,
    OpType::ArgMax,
    OpType::AveragePool,
    OpType::BatchNormalization,
    OpType::Cast,
    OpType::Clip,
    OpType::Concat,
    OpType::Constant,
    OpType::ConstantFill,
    OpType::Conv,
    OpType::ConvTranspose,
    OpType::Dropout,
    OpType::Elu,
    OpType::Exp,
    OpType::Flatten,
    OpType::Gru,
    OpType::Gather,
    OpType::Gemm,
    OpType::GlobalAveragePool,
    OpType::GlobalMaxPool,
    OpType::Identity,
    OpType::ImageScaler,
    OpType::Lrn,
    OpType::Lstm,
    OpType::LeakyRelu,
    OpType::MatMul,
    OpType::MaxPool,
    OpType::Mul,
    OpType::Neg,
    OpType::Pad,
    OpType::Pow,
    OpType::Rnn,
    OpType::ReduceMean,
    OpType::ReduceSum,
    OpType::Relu,
    OpType::Reshape,
    OpType::Sigmoid,
    OpType::Softmax,
    OpType::Split,
    OpType::Sum,
    OpType::Tanh,
    OpType::Transpose,
    OpType::Unsqueeze,
    OpType::Resize,
    OpType::Upsample,
];

/// Operators known to be unsupported by the target.
///
/// Together with [`DLDT_FUSABLE_OPS`] this covers the whole vocabulary, so a
/// newly added operator type has to be classified explicitly.
pub const DLDT_EXCLUDED_OPS: &[OpType] = &[
    OpType::BatchNormalizationActivation,
    OpType::Crop,
    OpType::Div,
    OpType::Fused,
    OpType::InstanceNormalization,
    OpType::Log,
    OpType::Quantize,
    OpType::Slice,
    OpType::Sqrt,
    OpType::Squeeze,
    OpType::Sub,
];

/// DLDT backend: every supported operator, single nodes allowed.
#[derive(Debug, Clone, Copy, Default)]
pub struct DldtBackend;

impl DldtBackend {
    /// Backend name.
    pub const NAME: &'static str = "dldt";
}

impl FusionBackend for DldtBackend {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn min_group_size(&self) -> usize {
        1
    }

    fn allow_single_node(&self) -> bool {
        true
    }

    fn is_fusable(&self, graph: &Graph, node: &Node) -> bool {
        let op = node.op_type();
        if DLDT_EXCLUDED_OPS.contains(&op) || !DLDT_FUSABLE_OPS.contains(&op) {
            return false;
        }
        match op {
            OpType::Resize | OpType::Upsample => is_supported_resize(graph, node),
            _ => true,
        }
    }
}

/// Nearest-neighbour resize with constant scales `[1, 1, s, s]`.
fn is_supported_resize(graph: &Graph, node: &Node) -> bool {
    if node.inputs().len() != 2 {
        return false;
    }
    if node.attrs().string("mode").unwrap_or("nearest") != "nearest" {
        return false;
    }
    let Some(scales) = node.input(1).and_then(|v| graph.const_tensor(v)) else {
        return false;
    };
    if scales.ndim() != 1 {
        return false;
    }
    matches!(
        scales.to_f64_vec().as_slice(),
        [n, c, h, w] if *n == 1.0 && *c == 1.0 && h == w
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_ir::{Attributes, DType, Tensor, ValueId, ValueType};

    #[test]
    fn test_vocabulary_is_classified() {
        for op in OpType::ALL {
            let allowed = DLDT_FUSABLE_OPS.contains(op);
            let excluded = DLDT_EXCLUDED_OPS.contains(op);
            assert!(allowed ^ excluded, "{op} must be in exactly one list");
        }
    }

    fn resize_graph(mode: &str, scales: Vec<f32>, constant: bool) -> (Graph, ValueId) {
        let mut graph = Graph::new("resize");
        let x = graph.add_input("x", ValueType::new(DType::F32, &[1, 3, 8, 8]));
        let s = if constant {
            graph.add_initializer("scales", Tensor::from_f32(scales, &[4]).unwrap())
        } else {
            graph.add_input("scales", ValueType::new(DType::F32, &[4]))
        };
        let y = graph.add_value("y", ValueType::new(DType::F32, &[1, 3, 16, 16]));
        graph
            .add_node(OpType::Resize, &[x, s], &[y], Attributes::new().with("mode", mode))
            .unwrap();
        graph.add_output(y).unwrap();
        (graph, y)
    }

    fn resize_fusable(graph: &Graph, y: ValueId) -> bool {
        let node = graph.node(graph.value(y).producer().unwrap());
        DldtBackend.is_fusable(graph, node)
    }

    #[test]
    fn test_resize_nearest_symmetric() {
        let (graph, y) = resize_graph("nearest", vec![1.0, 1.0, 2.0, 2.0], true);
        assert!(resize_fusable(&graph, y));
    }

    #[test]
    fn test_resize_rejections() {
        let (graph, y) = resize_graph("linear", vec![1.0, 1.0, 2.0, 2.0], true);
        assert!(!resize_fusable(&graph, y));

        let (graph, y) = resize_graph("nearest", vec![1.0, 2.0, 2.0, 2.0], true);
        assert!(!resize_fusable(&graph, y));

        let (graph, y) = resize_graph("nearest", vec![1.0, 1.0, 2.0, 3.0], true);
        assert!(!resize_fusable(&graph, y));

        let (graph, y) = resize_graph("nearest", vec![1.0, 1.0, 2.0, 2.0], false);
        assert!(!resize_fusable(&graph, y));
    }

    #[test]
    fn test_excluded_op() {
        let mut graph = Graph::new("g");
        let x = graph.add_input("x", ValueType::new(DType::F32, &[4]));
        let y = graph.add_value("y", ValueType::new(DType::F32, &[4]));
        let id = graph.add_node(OpType::Squeeze, &[x], &[y], Attributes::new()).unwrap();
        assert!(!DldtBackend.is_fusable(&graph, graph.node(id)));
    }
}
