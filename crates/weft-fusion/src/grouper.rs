//! Connected-Component Fusion Grouping
//!
//! Backend-agnostic discovery of maximal weakly-connected components of
//! fusable nodes, each collapsed into one opaque `Fused` node.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use std::collections::VecDeque;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, info, trace, warn};
use weft_ir::{Attributes, FusionGroup, Graph, GraphBuilder, Node, NodeId, OpType, ValueId};

use crate::error::FusionResult;

/// Builder category used for fused node names.
pub const FUSION_CATEGORY: &str = "Fusion";

/// Attribute carrying the backend name on fused nodes.
pub const FUSION_ATTR_BACKEND: &str = "backend";

// =============================================================================
// Eligibility
// =============================================================================

/// Returns true when every input and output of `node` has a static shape.
///
/// Accelerator backends compile groups ahead of time, so a node touching a
/// dynamically shaped edge is never fusable.
pub fn has_static_shapes(graph: &Graph, node: &Node) -> bool {
    node.inputs()
        .iter()
        .chain(node.outputs())
        .all(|&v| graph.value(v).ty().has_known_shape())
}

/// A group is kept when it reaches `min_group_size`, or when single nodes are
/// allowed and it is non-empty.
fn accepts_size(len: usize, min_group_size: usize, allow_single_node: bool) -> bool {
    len > 0 && (len >= min_group_size || allow_single_node)
}

// =============================================================================
// Grouping
// =============================================================================

/// Collapses every eligible connected component of fusable nodes.
///
/// `is_fusable` must not depend on graph mutations made by this pass; it is
/// evaluated once per live node before any component is collapsed. Nodes with
/// dynamically shaped edges and existing `Fused` nodes are never members.
///
/// Components are discovered from seeds in graph order, members are recorded
/// in graph order, and the fused node's inputs and outputs follow the
/// members' slot order, so identical graphs yield identical signatures.
///
/// Returns the fused nodes created, in discovery order.
pub fn fuse_all_connected_nodes<F>(
    backend_name: &str,
    graph: &mut Graph,
    min_group_size: usize,
    allow_single_node: bool,
    is_fusable: F,
) -> FusionResult<Vec<NodeId>>
where
    F: Fn(&Graph, &Node) -> bool,
{
    let live = graph.live_nodes();
    let fusable: FxHashSet<NodeId> = live
        .iter()
        .copied()
        .filter(|&id| {
            let node = graph.node(id);
            node.op_type() != OpType::Fused
                && has_static_shapes(graph, node)
                && is_fusable(graph, node)
        })
        .collect();

    let rank: FxHashMap<NodeId, usize> =
        live.iter().enumerate().map(|(i, &id)| (id, i)).collect();
    let mut assigned: FxHashSet<NodeId> = FxHashSet::default();
    let mut fused = Vec::new();

    for &seed in &live {
        if !fusable.contains(&seed) || assigned.contains(&seed) {
            continue;
        }
        let members = collect_component(graph, seed, &fusable, &rank);
        assigned.extend(members.iter().copied());

        if !accepts_size(members.len(), min_group_size, allow_single_node) {
            continue;
        }
        if !is_convex(graph, &members) {
            warn!(
                backend = backend_name,
                seed = graph.node(seed).name(),
                size = members.len(),
                "Skipping fusion group that would introduce a cycle"
            );
            continue;
        }
        if let Some(id) = collapse(backend_name, graph, &members)? {
            fused.push(id);
        }
    }

    info!(
        backend = backend_name,
        groups = fused.len(),
        candidates = fusable.len(),
        "Fusion grouping complete"
    );
    trace!("{graph}");
    Ok(fused)
}

/// Breadth-first walk over producer and consumer edges between fusable nodes.
/// The result is sorted into graph order.
fn collect_component(
    graph: &Graph,
    seed: NodeId,
    fusable: &FxHashSet<NodeId>,
    rank: &FxHashMap<NodeId, usize>,
) -> Vec<NodeId> {
    let mut seen: FxHashSet<NodeId> = FxHashSet::default();
    let mut queue = VecDeque::from([seed]);
    let mut members = Vec::new();

    while let Some(id) = queue.pop_front() {
        if !seen.insert(id) {
            continue;
        }
        members.push(id);
        let node = graph.node(id);
        for &input in node.inputs() {
            if let Some(producer) = graph.value(input).producer() {
                if fusable.contains(&producer) && !seen.contains(&producer) {
                    queue.push_back(producer);
                }
            }
        }
        for &output in node.outputs() {
            for u in graph.value(output).users() {
                if fusable.contains(&u.node) && !seen.contains(&u.node) {
                    queue.push_back(u.node);
                }
            }
        }
    }

    members.sort_by_key(|id| rank.get(id).copied().unwrap_or(usize::MAX));
    members
}

/// A component is convex when no path leaves it through a non-member and
/// comes back in. Collapsing a non-convex component would create a cycle.
fn is_convex(graph: &Graph, members: &[NodeId]) -> bool {
    let inside: FxHashSet<NodeId> = members.iter().copied().collect();
    let mut visited: FxHashSet<NodeId> = FxHashSet::default();
    let mut stack: Vec<NodeId> = Vec::new();

    for &m in members {
        for &output in graph.node(m).outputs() {
            for u in graph.value(output).users() {
                if !inside.contains(&u.node) {
                    stack.push(u.node);
                }
            }
        }
    }

    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }
        for &output in graph.node(id).outputs() {
            for u in graph.value(output).users() {
                if inside.contains(&u.node) {
                    return false;
                }
                stack.push(u.node);
            }
        }
    }
    true
}

/// Replaces `members` by a single fused node and detaches them.
fn collapse(
    backend_name: &str,
    graph: &mut Graph,
    members: &[NodeId],
) -> FusionResult<Option<NodeId>> {
    let inside: FxHashSet<NodeId> = members.iter().copied().collect();
    let mut inputs: Vec<ValueId> = Vec::new();
    let mut outputs: Vec<ValueId> = Vec::new();

    for &m in members {
        let node = graph.node(m);
        for &input in node.inputs() {
            let internal = graph
                .value(input)
                .producer()
                .is_some_and(|p| inside.contains(&p));
            if !internal && !inputs.contains(&input) {
                inputs.push(input);
            }
        }
        for &output in node.outputs() {
            let value = graph.value(output);
            let escapes =
                graph.is_output(output) || value.users().iter().any(|u| !inside.contains(&u.node));
            if escapes && !outputs.contains(&output) {
                outputs.push(output);
            }
        }
    }

    let Some(&anchor) = inputs.first().or(outputs.first()) else {
        return Ok(None);
    };

    let group_id = graph.next_fusion_group_id();
    let id = {
        let mut gb = GraphBuilder::new(graph, FUSION_CATEGORY, anchor);
        gb.mop_with(
            OpType::Fused,
            &inputs,
            &outputs,
            Attributes::new().with(FUSION_ATTR_BACKEND, backend_name),
        )?
    };
    graph.node_mut(id).set_fusion_group(FusionGroup {
        backend: backend_name.to_string(),
        group_id,
        members: members.to_vec(),
    });
    for &m in members {
        graph.detach_node(m);
    }

    debug!(
        backend = backend_name,
        node = graph.node(id).name(),
        group_id,
        members = members.len(),
        inputs = inputs.len(),
        outputs = outputs.len(),
        "Collapsed fusion group"
    );
    Ok(Some(id))
}
