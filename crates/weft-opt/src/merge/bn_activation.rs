//! `BatchNormalization -> Relu` fusion into one normalize-and-activate node.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use weft_ir::{ActivationKind, Attributes, Graph, GraphBuilder, NodeId, OpType};

use super::{sole_internal_use, MergeRule};
use crate::error::OptResult;

/// Normalization attributes carried over to the fused node.
const CARRIED_ATTRS: &[&str] = &["epsilon", "momentum", "spatial"];

pub(super) fn merge(graph: &mut Graph, bn: NodeId) -> OptResult<bool> {
    let node = graph.node(bn);
    let Some(normalized) = node.output(0) else {
        return Ok(false);
    };
    let Some(u) = sole_internal_use(graph, normalized) else {
        return Ok(false);
    };
    let activation = graph.node(u.node);
    if activation.op_type() != OpType::Relu || activation.outputs().len() != 1 {
        return Ok(false);
    }

    let activated = activation.outputs()[0];
    let mut outputs = vec![activated];
    outputs.extend_from_slice(&node.outputs()[1..]);
    let inputs = node.inputs().to_vec();
    let mut attrs = Attributes::new();
    for &name in CARRIED_ATTRS {
        if let Some(value) = node.attrs().get(name) {
            attrs.set(name, value.clone());
        }
    }
    attrs.set("activation", ActivationKind::Relu.code());

    let mut gb = GraphBuilder::new(graph, MergeRule::BatchNormActivation.name(), activated);
    gb.mop_with(OpType::BatchNormalizationActivation, &inputs, &outputs, attrs)?;

    graph.detach_node(bn);
    graph.detach_node(u.node);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_ir::{DType, Tensor, ValueType};

    #[test]
    fn test_fused_node_keeps_statistics_outputs() {
        let mut graph = Graph::new("bnr");
        let x = graph.add_input("x", ValueType::new(DType::F32, &[1, 2, 4, 4]));
        let stats: Vec<_> = ["scale", "bias", "mean", "var"]
            .iter()
            .map(|name| graph.add_initializer(name, Tensor::from_f32(vec![1.0, 1.0], &[2]).unwrap()))
            .collect();
        let y = graph.add_value("y", ValueType::new(DType::F32, &[1, 2, 4, 4]));
        let running_mean = graph.add_value("running_mean", ValueType::new(DType::F32, &[2]));
        let r = graph.add_value("r", ValueType::new(DType::F32, &[1, 2, 4, 4]));
        let mut inputs = vec![x];
        inputs.extend(&stats);
        let bn = graph
            .add_node(
                OpType::BatchNormalization,
                &inputs,
                &[y, running_mean],
                Attributes::new().with("epsilon", 1e-3f32).with("momentum", 0.9f32),
            )
            .unwrap();
        graph.add_node(OpType::Relu, &[y], &[r], Attributes::new()).unwrap();
        graph.add_output(r).unwrap();
        graph.add_output(running_mean).unwrap();

        assert!(merge(&mut graph, bn).unwrap());

        let live = graph.live_nodes();
        assert_eq!(live.len(), 1);
        let fused = graph.node(live[0]);
        assert_eq!(fused.op_type(), OpType::BatchNormalizationActivation);
        assert_eq!(fused.inputs(), inputs.as_slice());
        assert_eq!(fused.outputs(), &[r, running_mean]);
        assert_eq!(fused.attrs().float("epsilon"), Some(1e-3));
        assert_eq!(fused.attrs().float("momentum"), Some(0.9));
        assert_eq!(
            fused.attrs().int("activation").and_then(ActivationKind::from_code),
            Some(ActivationKind::Relu)
        );
        graph.check_sanity().unwrap();
    }

    #[test]
    fn test_other_activation_declines() {
        let mut graph = Graph::new("bns");
        let x = graph.add_input("x", ValueType::new(DType::F32, &[2]));
        let y = graph.add_value("y", ValueType::new(DType::F32, &[2]));
        let s = graph.add_value("s", ValueType::new(DType::F32, &[2]));
        let bn = graph
            .add_node(OpType::BatchNormalization, &[x], &[y], Attributes::new())
            .unwrap();
        graph.add_node(OpType::Sigmoid, &[y], &[s], Attributes::new()).unwrap();
        graph.add_output(s).unwrap();
        assert!(!merge(&mut graph, bn).unwrap());
    }

    #[test]
    fn test_normalized_graph_output_declines() {
        let mut graph = Graph::new("bno");
        let x = graph.add_input("x", ValueType::new(DType::F32, &[2]));
        let y = graph.add_value("y", ValueType::new(DType::F32, &[2]));
        let r = graph.add_value("r", ValueType::new(DType::F32, &[2]));
        let bn = graph
            .add_node(OpType::BatchNormalization, &[x], &[y], Attributes::new())
            .unwrap();
        graph.add_node(OpType::Relu, &[y], &[r], Attributes::new()).unwrap();
        graph.add_output(y).unwrap();
        graph.add_output(r).unwrap();

        assert!(!merge(&mut graph, bn).unwrap());
        assert_eq!(graph.live_count(), 2);
        assert_eq!(graph.value(y).producer(), Some(bn));
    }
}
