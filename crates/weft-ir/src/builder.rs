//! Subgraph Builder
//!
//! The only sanctioned way for an optimization pass to introduce nodes.
//! A rewrite describes the replacement motif through a [`GraphBuilder`] and
//! then detaches the nodes it supersedes.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use crate::attr::Attributes;
use crate::error::IrResult;
use crate::graph::{Graph, Node, NodeId, ValueId};
use crate::op::OpType;
use crate::tensor::Tensor;
use crate::types::ValueType;

/// Scoped helper that inserts replacement nodes next to an anchor value.
///
/// Fresh nodes and values are named `"{category}_{n}"`. Each node is placed
/// in graph order right after the latest producer among the anchor and its
/// inputs, which keeps the live order topological.
///
/// # Example
/// ```ignore
/// let mut gb = GraphBuilder::new(&mut graph, "MergeSplitConcat", output);
/// gb.op(OpType::Identity, &[input], output)?;
/// ```
pub struct GraphBuilder<'g> {
    graph: &'g mut Graph,
    category: String,
    anchor: ValueId,
    created: Vec<NodeId>,
}

impl<'g> GraphBuilder<'g> {
    /// Creates a builder anchored at `anchor`.
    pub fn new(graph: &'g mut Graph, category: &str, anchor: ValueId) -> Self {
        Self {
            graph,
            category: category.to_string(),
            anchor,
            created: Vec::new(),
        }
    }

    /// Creates a node writing a single existing value.
    pub fn op(&mut self, op_type: OpType, inputs: &[ValueId], output: ValueId) -> IrResult<NodeId> {
        self.mop(op_type, inputs, &[output])
    }

    /// Creates a node writing a fresh value of type `ty`, returning the value.
    pub fn op_new(
        &mut self,
        op_type: OpType,
        inputs: &[ValueId],
        ty: ValueType,
    ) -> IrResult<ValueId> {
        let output = self.value(ty);
        self.mop(op_type, inputs, &[output])?;
        Ok(output)
    }

    /// Creates a node writing several existing values.
    pub fn mop(
        &mut self,
        op_type: OpType,
        inputs: &[ValueId],
        outputs: &[ValueId],
    ) -> IrResult<NodeId> {
        self.mop_with(op_type, inputs, outputs, Attributes::new())
    }

    /// Creates a node writing several existing values, with attributes.
    pub fn mop_with(
        &mut self,
        op_type: OpType,
        inputs: &[ValueId],
        outputs: &[ValueId],
        attrs: Attributes,
    ) -> IrResult<NodeId> {
        self.graph.check_value(self.anchor)?;
        let position = self.insertion_point(inputs)?;
        let name = self.graph.gen_name(&self.category);
        let id = self
            .graph
            .link_node(name, op_type, inputs, outputs, attrs, position)?;
        self.graph.ensure_topological(id);
        self.created.push(id);
        Ok(id)
    }

    /// Allocates a constant value holding `tensor`.
    pub fn param(&mut self, tensor: Tensor) -> ValueId {
        let name = self.graph.gen_name(&self.category);
        let ty = ValueType::new(tensor.dtype(), tensor.shape());
        self.graph.alloc_value(name, ty, Some(tensor))
    }

    /// Allocates a fresh intermediate value.
    pub fn value(&mut self, ty: ValueType) -> ValueId {
        let name = self.graph.gen_name(&self.category);
        self.graph.alloc_value(name, ty, None)
    }

    /// Nodes created so far, in creation order.
    pub fn created(&self) -> &[NodeId] {
        &self.created
    }

    /// Read access to the graph being edited.
    pub fn graph(&self) -> &Graph {
        self.graph
    }

    /// Mutable access to a node, for attribute edits after creation.
    pub fn node_mut(&mut self, id: NodeId) -> IrResult<&mut Node> {
        self.graph.check_node(id)?;
        Ok(self.graph.node_mut(id))
    }

    fn insertion_point(&self, inputs: &[ValueId]) -> IrResult<usize> {
        let mut after: Option<usize> = None;
        for &value in std::iter::once(&self.anchor).chain(inputs) {
            self.graph.check_value(value)?;
            if let Some(producer) = self.graph.value(value).producer() {
                let pos = self.graph.position(producer);
                after = after.max(pos);
            }
        }
        Ok(after.map_or(0, |p| p + 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Use;
    use crate::tensor::DType;

    #[test]
    fn test_replace_node_preserves_output_identity() {
        let mut graph = Graph::new("g");
        let x = graph.add_input("x", ValueType::new(DType::F32, &[4]));
        let y = graph.add_value("y", ValueType::new(DType::F32, &[4]));
        let z = graph.add_value("z", ValueType::new(DType::F32, &[4]));
        let neg = graph.add_node(OpType::Neg, &[x], &[y], Attributes::new()).unwrap();
        let exp = graph.add_node(OpType::Exp, &[y], &[z], Attributes::new()).unwrap();
        graph.add_output(z).unwrap();

        let id = {
            let mut gb = GraphBuilder::new(&mut graph, "Replace", x);
            gb.op(OpType::Identity, &[x], y).unwrap()
        };
        graph.detach_node(neg);

        assert_eq!(graph.value(y).producer(), Some(id));
        assert_eq!(graph.value(x).users(), &[Use { node: id, slot: 0 }]);
        assert_eq!(graph.node(id).name(), "Replace_0");
        assert_eq!(graph.live_nodes(), vec![id, exp]);
    }

    #[test]
    fn test_insertion_after_latest_producer() {
        let mut graph = Graph::new("g");
        let x = graph.add_input("x", ValueType::new(DType::F32, &[4]));
        let a = graph.add_value("a", ValueType::new(DType::F32, &[4]));
        let b = graph.add_value("b", ValueType::new(DType::F32, &[4]));
        let first = graph.add_node(OpType::Relu, &[x], &[a], Attributes::new()).unwrap();
        let second = graph.add_node(OpType::Tanh, &[x], &[b], Attributes::new()).unwrap();

        let mut gb = GraphBuilder::new(&mut graph, "Sum", a);
        let sum = gb
            .op_new(OpType::Add, &[a, b], ValueType::new(DType::F32, &[4]))
            .unwrap();
        let created = gb.created().to_vec();

        assert_eq!(graph.live_nodes(), vec![first, second, created[0]]);
        assert_eq!(graph.value(sum).producer(), Some(created[0]));
        assert!(graph.value(sum).name().starts_with("Sum_"));
    }

    #[test]
    fn test_order_repaired_when_user_precedes() {
        let mut graph = Graph::new("g");
        let x = graph.add_input("x", ValueType::new(DType::F32, &[4]));
        let y = graph.add_value("y", ValueType::new(DType::F32, &[4]));
        let late = graph.add_value("late", ValueType::new(DType::F32, &[4]));
        let out = graph.add_value("out", ValueType::new(DType::F32, &[4]));
        let old = graph.add_node(OpType::Relu, &[x], &[y], Attributes::new()).unwrap();
        let user = graph.add_node(OpType::Exp, &[y], &[out], Attributes::new()).unwrap();
        let producer = graph.add_node(OpType::Tanh, &[x], &[late], Attributes::new()).unwrap();

        // The replacement for `old` depends on a value produced after `user`.
        let id = {
            let mut gb = GraphBuilder::new(&mut graph, "Late", x);
            gb.op(OpType::Add, &[x, late], y).unwrap()
        };
        graph.detach_node(old);

        let live = graph.live_nodes();
        let pos = |n: NodeId| live.iter().position(|&m| m == n).unwrap();
        assert!(pos(producer) < pos(id));
        assert!(pos(id) < pos(user));
    }

    #[test]
    fn test_param_is_constant() {
        let mut graph = Graph::new("g");
        let x = graph.add_input("x", ValueType::new(DType::F32, &[2]));
        let mut gb = GraphBuilder::new(&mut graph, "Fold", x);
        let w = gb.param(Tensor::from_f32(vec![1.0, 2.0], &[2]).unwrap());

        assert_eq!(graph.value(w).ty(), &ValueType::new(DType::F32, &[2]));
        assert!(graph.const_tensor(w).is_some());
        assert_eq!(graph.value(w).name(), "Fold_0");
    }
}
