//! `Conv -> BatchNormalization` folding.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use rustc_hash::FxHashSet;
use weft_ir::{Attributes, Graph, GraphBuilder, NodeId, OpType, Tensor, ValueId};

use super::fold::ConvBnOperands;
use super::{sole_internal_use, MergeRule};
use crate::error::OptResult;

const DEFAULT_EPSILON: f32 = 1e-5;

pub(super) fn merge(graph: &mut Graph, conv: NodeId) -> OptResult<bool> {
    let node = graph.node(conv);
    if node.outputs().len() != 1 || node.inputs().len() < 2 {
        return Ok(false);
    }
    let Some(u) = sole_internal_use(graph, node.outputs()[0]) else {
        return Ok(false);
    };
    let bn = graph.node(u.node);
    if bn.op_type() != OpType::BatchNormalization
        || u.slot != 0
        || bn.outputs().len() != 1
        || bn.inputs().len() < 5
    {
        return Ok(false);
    }

    let weight_value = node.inputs()[1];
    let bias_value = node.input(2);
    let stats = &bn.inputs()[1..5];
    let Some(weight) = graph.const_tensor(weight_value) else {
        return Ok(false);
    };
    let bias = match bias_value {
        Some(v) => match graph.const_tensor(v) {
            Some(t) => Some(t),
            None => return Ok(false),
        },
        None => None,
    };
    let Some([scale, shift, mean, var]) = const_operands(graph, stats) else {
        return Ok(false);
    };

    let Some(epsilon) = bn.attrs().read_or("epsilon", Attributes::float, DEFAULT_EPSILON) else {
        return Ok(false);
    };
    let operands = ConvBnOperands {
        weight,
        bias,
        scale,
        shift,
        mean,
        var,
        epsilon,
    };
    let (new_weight, new_bias) = operands.fold(bn)?;

    let anchor = node.outputs()[0];
    let input = node.inputs()[0];
    let outputs = bn.outputs().to_vec();
    let attrs = node.attrs().clone();
    let folded: Vec<ValueId> = std::iter::once(weight_value)
        .chain(bias_value)
        .chain(stats.iter().copied())
        .collect();
    let bn = u.node;

    let mut gb = GraphBuilder::new(graph, MergeRule::ConvBatchNorm.name(), anchor);
    let w = gb.param(new_weight);
    let b = gb.param(new_bias);
    gb.mop_with(OpType::Conv, &[input, w, b], &outputs, attrs)?;

    graph.detach_node(conv);
    graph.detach_node(bn);
    detach_orphaned_constants(graph, &folded);
    Ok(true)
}

fn const_operands<'g>(graph: &'g Graph, values: &[ValueId]) -> Option<[&'g Tensor; 4]> {
    let [a, b, c, d] = values else {
        return None;
    };
    Some([
        graph.const_tensor(*a)?,
        graph.const_tensor(*b)?,
        graph.const_tensor(*c)?,
        graph.const_tensor(*d)?,
    ])
}

/// Detaches `Constant` producers of `values` that nothing reads any more.
fn detach_orphaned_constants(graph: &mut Graph, values: &[ValueId]) {
    let mut seen = FxHashSet::default();
    for &value in values {
        let Some(producer) = graph.value(value).producer() else {
            continue;
        };
        if !seen.insert(producer) {
            continue;
        }
        let node = graph.node(producer);
        let unused = node
            .outputs()
            .iter()
            .all(|&out| graph.value(out).users().is_empty() && !graph.is_output(out));
        if node.op_type() == OpType::Constant && unused {
            graph.detach_node(producer);
        }
    }
}
