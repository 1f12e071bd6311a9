//! `Split -> Concat` cancellation.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use weft_ir::{Attributes, Graph, GraphBuilder, Node, NodeId, OpType};

use super::{sole_internal_use, MergeRule};
use crate::error::OptResult;

/// Split's default axis. Concat has no default, so a missing axis is read the
/// same way on both sides.
const DEFAULT_AXIS: i64 = 0;

pub(super) fn merge(graph: &mut Graph, split: NodeId) -> OptResult<bool> {
    let node = graph.node(split);

    // Output i must feed input slot i of one shared Concat.
    let mut concat = None;
    for (slot, &output) in node.outputs().iter().enumerate() {
        let Some(u) = sole_internal_use(graph, output) else {
            return Ok(false);
        };
        if u.slot != slot || concat.is_some_and(|c| c != u.node) {
            return Ok(false);
        }
        concat = Some(u.node);
    }
    let Some(concat) = concat else {
        return Ok(false);
    };

    let user = graph.node(concat);
    if user.op_type() != OpType::Concat
        || node.inputs().len() != user.outputs().len()
        || node.outputs().len() != user.inputs().len()
    {
        return Ok(false);
    }
    let axis = |n: &Node| n.attrs().read_or("axis", Attributes::int, DEFAULT_AXIS);
    if axis(node).is_none() || axis(node) != axis(user) {
        return Ok(false);
    }

    let pairs: Vec<_> = node
        .inputs()
        .iter()
        .copied()
        .zip(user.outputs().iter().copied())
        .collect();
    for (input, output) in pairs {
        let mut gb = GraphBuilder::new(graph, MergeRule::SplitConcat.name(), output);
        gb.op(OpType::Identity, &[input], output)?;
    }

    graph.detach_node(split);
    graph.detach_node(concat);
    Ok(true)
}
