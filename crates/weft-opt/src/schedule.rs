//! Scheduling
//!
//! Assigns the dense 1-based execution order consumed by bytecode emission.
//! Phase one walks producer edges back from the graph outputs to find the
//! live set. Phase two runs Kahn's algorithm forward from the values that
//! are available before anything executes.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use std::collections::VecDeque;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, info, trace};
use weft_ir::{Graph, NodeId, ValueId};

use crate::error::{OptError, OptResult};

/// Orders every node that contributes to a graph output.
///
/// Previous orders are cleared first. Dead nodes are left in place but get no
/// order. Returns the scheduled nodes in execution order; the node at index
/// `i` carries order `i + 1`.
pub fn schedule_computation(graph: &mut Graph) -> OptResult<Vec<NodeId>> {
    graph.reset_order();

    let live = live_nodes_from_outputs(graph);
    let sequence = topological_order(graph, &live)?;

    for (i, &id) in sequence.iter().enumerate() {
        graph.node_mut(id).set_order(Some(i + 1));
    }

    info!(
        scheduled = sequence.len(),
        dead = graph.live_count() - sequence.len(),
        "Scheduling complete"
    );
    trace!("{graph}");
    Ok(sequence)
}

/// Nodes with a producer path to at least one graph output.
pub fn live_nodes_from_outputs(graph: &Graph) -> FxHashSet<NodeId> {
    let mut live = FxHashSet::default();
    let mut queue = VecDeque::new();

    let visit = |value: ValueId, live: &mut FxHashSet<NodeId>, queue: &mut VecDeque<NodeId>| {
        if let Some(producer) = graph.value(value).producer() {
            if !graph.node(producer).is_detached() && live.insert(producer) {
                queue.push_back(producer);
            }
        }
    };

    for &output in graph.output_values() {
        visit(output, &mut live, &mut queue);
    }
    while let Some(id) = queue.pop_front() {
        for &input in graph.node(id).inputs() {
            visit(input, &mut live, &mut queue);
        }
    }
    live
}

fn topological_order(graph: &Graph, live: &FxHashSet<NodeId>) -> OptResult<Vec<NodeId>> {
    let in_graph_order: Vec<NodeId> = graph
        .live_nodes()
        .into_iter()
        .filter(|id| live.contains(id))
        .collect();

    let mut pending: FxHashMap<NodeId, usize> = in_graph_order
        .iter()
        .map(|&id| (id, graph.node(id).inputs().len()))
        .collect();
    let mut sequence = Vec::with_capacity(in_graph_order.len());
    let mut available = FxHashSet::default();
    let mut queue = VecDeque::new();

    // Graph inputs first, then literal initializers in first-use order.
    for &input in graph.input_values() {
        if available.insert(input) {
            queue.push_back(input);
        }
    }
    for &id in &in_graph_order {
        for &input in graph.node(id).inputs() {
            let value = graph.value(input);
            if value.producer().is_none()
                && value.initializer().is_some()
                && available.insert(input)
            {
                queue.push_back(input);
            }
        }
    }

    let mut ready = |id: NodeId, sequence: &mut Vec<NodeId>, queue: &mut VecDeque<ValueId>| {
        sequence.push(id);
        for &output in graph.node(id).outputs() {
            if available.insert(output) {
                queue.push_back(output);
            }
        }
    };

    for &id in &in_graph_order {
        if pending.get(&id) == Some(&0) {
            ready(id, &mut sequence, &mut queue);
        }
    }

    while let Some(value) = queue.pop_front() {
        for u in graph.value(value).users() {
            let Some(count) = pending.get_mut(&u.node) else {
                continue;
            };
            *count -= 1;
            if *count == 0 {
                ready(u.node, &mut sequence, &mut queue);
            }
        }
    }

    if sequence.len() != in_graph_order.len() {
        let scheduled: FxHashSet<NodeId> = sequence.iter().copied().collect();
        if let Some(&stuck) = in_graph_order.iter().find(|id| !scheduled.contains(id)) {
            let node = graph.node(stuck);
            debug!(
                node = node.name(),
                scheduled = sequence.len(),
                live = in_graph_order.len(),
                "Scheduling stalled"
            );
            return Err(OptError::Unschedulable {
                node: node.name().to_string(),
                op: node.op_type(),
            });
        }
    }
    Ok(sequence)
}
