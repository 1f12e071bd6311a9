//! Pointwise kernel backend: chains of element-wise floating point math are
//! emitted as one generated kernel.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use weft_ir::{Graph, Node};

use crate::backend::FusionBackend;

/// Element-wise backend. Only multi-node groups pay off.
#[derive(Debug, Clone, Copy, Default)]
pub struct ElementwiseBackend;

impl ElementwiseBackend {
    /// Backend name.
    pub const NAME: &'static str = "elementwise";
}

impl FusionBackend for ElementwiseBackend {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn min_group_size(&self) -> usize {
        2
    }

    fn allow_single_node(&self) -> bool {
        false
    }

    fn is_fusable(&self, graph: &Graph, node: &Node) -> bool {
        node.op_type().is_elementwise()
            && node
                .outputs()
                .iter()
                .all(|&v| graph.value(v).ty().dtype.is_float())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fuse_with_backend;
    use weft_ir::{Attributes, DType, OpType, ValueType};

    #[test]
    fn test_pointwise_chain() {
        let mut graph = Graph::new("g");
        let ty = ValueType::new(DType::F32, &[16]);
        let x = graph.add_input("x", ty.clone());
        let a = graph.add_value("a", ty.clone());
        let b = graph.add_value("b", ty.clone());
        let c = graph.add_value("c", ty);
        graph.add_node(OpType::Mul, &[x, x], &[a], Attributes::new()).unwrap();
        graph.add_node(OpType::Sigmoid, &[a], &[b], Attributes::new()).unwrap();
        graph.add_node(OpType::Softmax, &[b], &[c], Attributes::new()).unwrap();
        graph.add_output(c).unwrap();

        let fused = fuse_with_backend(&mut graph, &ElementwiseBackend).unwrap();

        assert_eq!(fused.len(), 1);
        let group = graph.node(fused[0]).fusion_group().unwrap();
        assert_eq!(group.backend, "elementwise");
        assert_eq!(group.members.len(), 2);
        assert_eq!(graph.node(fused[0]).inputs(), &[x]);
    }

    #[test]
    fn test_integer_outputs_rejected() {
        let mut graph = Graph::new("g");
        let ty = ValueType::new(DType::I64, &[4]);
        let x = graph.add_input("x", ty.clone());
        let y = graph.add_value("y", ty);
        let id = graph.add_node(OpType::Add, &[x, x], &[y], Attributes::new()).unwrap();
        assert!(!ElementwiseBackend.is_fusable(&graph, graph.node(id)));
    }
}
