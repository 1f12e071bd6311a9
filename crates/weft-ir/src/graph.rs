//! Graph Model
//!
//! Arena-backed dataflow graph of operator nodes and value edges.
//!
//! Nodes are never freed once created. Detaching a node flips its `detached`
//! flag and unlinks it from its input values, so ids held by an in-flight
//! traversal stay valid. All traversal views skip detached nodes.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fmt;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

use crate::attr::Attributes;
use crate::error::{IrError, IrResult};
use crate::op::OpType;
use crate::tensor::Tensor;
use crate::types::ValueType;

// =============================================================================
// Identifiers
// =============================================================================

/// Stable identifier for a node in a [`Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Returns the raw arena index.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Stable identifier for a value in a [`Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueId(pub(crate) usize);

impl ValueId {
    /// Returns the raw arena index.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

// =============================================================================
// Values
// =============================================================================

/// A consumer of a value: the node and the input slot it binds the value to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Use {
    /// Consuming node.
    pub node: NodeId,
    /// Input slot on the consuming node.
    pub slot: usize,
}

/// An edge in the dataflow graph.
#[derive(Debug, Clone)]
pub struct Value {
    id: ValueId,
    name: String,
    ty: ValueType,
    initializer: Option<Tensor>,
    producer: Option<NodeId>,
    users: Vec<Use>,
}

impl Value {
    /// Identifier.
    pub fn id(&self) -> ValueId {
        self.id
    }

    /// Name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type descriptor.
    pub fn ty(&self) -> &ValueType {
        &self.ty
    }

    /// Literal tensor, for initializer values.
    pub fn initializer(&self) -> Option<&Tensor> {
        self.initializer.as_ref()
    }

    /// Live node producing this value, if any.
    pub fn producer(&self) -> Option<NodeId> {
        self.producer
    }

    /// Live consumers, one entry per bound input slot.
    pub fn users(&self) -> &[Use] {
        &self.users
    }

    /// Returns the only use of this value, if there is exactly one.
    pub fn single_use(&self) -> Option<Use> {
        match self.users.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }
}

// =============================================================================
// Nodes
// =============================================================================

/// Membership record of a fused node: the backend it is offloaded to and the
/// detached members it replaced, in graph order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FusionGroup {
    /// Backend name, e.g. `"dldt"`.
    pub backend: String,
    /// Graph-unique group number.
    pub group_id: usize,
    /// Original member nodes.
    pub members: Vec<NodeId>,
}

/// A typed operator instance.
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    name: String,
    op_type: OpType,
    inputs: Vec<ValueId>,
    outputs: Vec<ValueId>,
    attrs: Attributes,
    detached: bool,
    order: Option<usize>,
    fusion_group: Option<FusionGroup>,
}

impl Node {
    /// Identifier.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Operator type.
    pub fn op_type(&self) -> OpType {
        self.op_type
    }

    /// Ordered input values.
    pub fn inputs(&self) -> &[ValueId] {
        &self.inputs
    }

    /// Ordered output values.
    pub fn outputs(&self) -> &[ValueId] {
        &self.outputs
    }

    /// Input value at `slot`.
    pub fn input(&self, slot: usize) -> Option<ValueId> {
        self.inputs.get(slot).copied()
    }

    /// Output value at `slot`.
    pub fn output(&self, slot: usize) -> Option<ValueId> {
        self.outputs.get(slot).copied()
    }

    /// Attributes.
    pub fn attrs(&self) -> &Attributes {
        &self.attrs
    }

    /// Mutable attributes.
    pub fn attrs_mut(&mut self) -> &mut Attributes {
        &mut self.attrs
    }

    /// Whether the node has been superseded.
    pub fn is_detached(&self) -> bool {
        self.detached
    }

    /// Execution order assigned by the scheduler (1-based).
    pub fn order(&self) -> Option<usize> {
        self.order
    }

    /// Sets the execution order.
    pub fn set_order(&mut self, order: Option<usize>) {
        self.order = order;
    }

    /// Fusion record, for `Fused` nodes.
    pub fn fusion_group(&self) -> Option<&FusionGroup> {
        self.fusion_group.as_ref()
    }

    /// Attaches a fusion record.
    pub fn set_fusion_group(&mut self, group: FusionGroup) {
        self.fusion_group = Some(group);
    }
}

// =============================================================================
// Graph
// =============================================================================

/// A dataflow graph that exclusively owns its nodes and values.
///
/// `order` lists every node ever created in graph order. Nodes built during
/// construction appear in creation order; nodes introduced by a
/// [`GraphBuilder`](crate::GraphBuilder) are slotted in right after the last
/// producer they depend on, so the live subsequence stays topological.
#[derive(Debug, Clone)]
pub struct Graph {
    name: String,
    nodes: Vec<Node>,
    values: Vec<Value>,
    order: Vec<NodeId>,
    input_values: Vec<ValueId>,
    output_values: Vec<ValueId>,
    name_counters: FxHashMap<String, usize>,
    next_group_id: usize,
}

impl Graph {
    /// Creates a new empty graph.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            nodes: Vec::new(),
            values: Vec::new(),
            order: Vec::new(),
            input_values: Vec::new(),
            output_values: Vec::new(),
            name_counters: FxHashMap::default(),
            next_group_id: 0,
        }
    }

    /// Graph name.
    pub fn name(&self) -> &str {
        &self.name
    }

    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// Adds a graph input.
    pub fn add_input(&mut self, name: &str, ty: ValueType) -> ValueId {
        let id = self.alloc_value(name.to_string(), ty, None);
        self.input_values.push(id);
        id
    }

    /// Adds an intermediate value with no producer yet.
    pub fn add_value(&mut self, name: &str, ty: ValueType) -> ValueId {
        self.alloc_value(name.to_string(), ty, None)
    }

    /// Adds a constant value carrying a literal tensor.
    pub fn add_initializer(&mut self, name: &str, tensor: Tensor) -> ValueId {
        let ty = ValueType::new(tensor.dtype(), tensor.shape());
        self.alloc_value(name.to_string(), ty, Some(tensor))
    }

    /// Marks a value as a graph output.
    pub fn add_output(&mut self, value: ValueId) -> IrResult<()> {
        self.check_value(value)?;
        if !self.output_values.contains(&value) {
            self.output_values.push(value);
        }
        Ok(())
    }

    /// Appends a node during graph construction.
    ///
    /// Unlike builder insertion, an output that already has a live producer
    /// is rejected.
    pub fn add_node(
        &mut self,
        op_type: OpType,
        inputs: &[ValueId],
        outputs: &[ValueId],
        attrs: Attributes,
    ) -> IrResult<NodeId> {
        for &output in outputs {
            self.check_value(output)?;
            if let Some(producer) = self.values[output.0].producer {
                return Err(IrError::MultipleProducers {
                    value: self.values[output.0].name.clone(),
                    producer: self.nodes[producer.0].name.clone(),
                });
            }
        }
        let name = self.gen_name(op_type.as_str());
        let position = self.order.len();
        self.link_node(name, op_type, inputs, outputs, attrs, position)
    }

    // -------------------------------------------------------------------------
    // Lookup
    // -------------------------------------------------------------------------

    /// Returns the node for an ID.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Returns the mutable node for an ID.
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Returns the value for an ID.
    pub fn value(&self, id: ValueId) -> &Value {
        &self.values[id.0]
    }

    /// All nodes ever created, live or detached, in arena order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// All values ever created.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Snapshot of the live nodes in graph order.
    pub fn live_nodes(&self) -> Vec<NodeId> {
        self.order
            .iter()
            .copied()
            .filter(|id| !self.nodes[id.0].detached)
            .collect()
    }

    /// Number of live nodes.
    pub fn live_count(&self) -> usize {
        self.nodes.iter().filter(|n| !n.detached).count()
    }

    /// Designated graph inputs.
    pub fn input_values(&self) -> &[ValueId] {
        &self.input_values
    }

    /// Designated graph outputs.
    pub fn output_values(&self) -> &[ValueId] {
        &self.output_values
    }

    /// Returns whether `value` is a designated graph input.
    pub fn is_input(&self, value: ValueId) -> bool {
        self.input_values.contains(&value)
    }

    /// Returns whether `value` is a designated graph output.
    pub fn is_output(&self, value: ValueId) -> bool {
        self.output_values.contains(&value)
    }

    /// Finds a value by name.
    pub fn find_value(&self, name: &str) -> Option<ValueId> {
        self.values.iter().find(|v| v.name == name).map(|v| v.id)
    }

    /// Resolves the compile-time tensor of a value.
    ///
    /// A value is constant when it has no producer and carries a literal, or
    /// when its producer is a live `Constant` node.
    pub fn const_tensor(&self, value: ValueId) -> Option<&Tensor> {
        let v = &self.values[value.0];
        match v.producer {
            None => v.initializer.as_ref(),
            Some(producer) => {
                let node = &self.nodes[producer.0];
                if node.op_type == OpType::Constant {
                    node.attrs.tensor("value")
                } else {
                    None
                }
            }
        }
    }

    /// Position of a node in graph order.
    pub fn position(&self, id: NodeId) -> Option<usize> {
        self.order.iter().position(|&n| n == id)
    }

    // -------------------------------------------------------------------------
    // Mutation
    // -------------------------------------------------------------------------

    /// Detaches a node.
    ///
    /// The node stays in the arena but is unlinked from the user lists of its
    /// inputs, drops producer ownership of any output still bound to it, and
    /// is skipped by every live traversal from now on. Detaching twice is a
    /// no-op.
    pub fn detach_node(&mut self, id: NodeId) {
        let node = &mut self.nodes[id.0];
        if node.detached {
            return;
        }
        node.detached = true;
        trace!(node = %node.name, "Detached node");
        let inputs = node.inputs.clone();
        let outputs = node.outputs.clone();
        for input in inputs {
            self.values[input.0].users.retain(|u| u.node != id);
        }
        for output in outputs {
            let value = &mut self.values[output.0];
            if value.producer == Some(id) {
                value.producer = None;
            }
        }
    }

    /// Clears every scheduled execution order.
    pub fn reset_order(&mut self) {
        for node in &mut self.nodes {
            node.order = None;
        }
    }

    /// Hands out the next fusion group number.
    pub fn next_fusion_group_id(&mut self) -> usize {
        let id = self.next_group_id;
        self.next_group_id += 1;
        id
    }

    // -------------------------------------------------------------------------
    // Internal edge surgery, reachable only through construction and builders
    // -------------------------------------------------------------------------

    pub(crate) fn gen_name(&mut self, category: &str) -> String {
        let counter = self.name_counters.entry(category.to_string()).or_insert(0);
        let name = format!("{category}_{counter}");
        *counter += 1;
        name
    }

    pub(crate) fn alloc_value(
        &mut self,
        name: String,
        ty: ValueType,
        initializer: Option<Tensor>,
    ) -> ValueId {
        let id = ValueId(self.values.len());
        self.values.push(Value {
            id,
            name,
            ty,
            initializer,
            producer: None,
            users: Vec::new(),
        });
        id
    }

    pub(crate) fn check_value(&self, value: ValueId) -> IrResult<()> {
        if value.0 < self.values.len() {
            Ok(())
        } else {
            Err(IrError::UnknownValue(value))
        }
    }

    pub(crate) fn check_node(&self, node: NodeId) -> IrResult<()> {
        if node.0 < self.nodes.len() {
            Ok(())
        } else {
            Err(IrError::UnknownNode(node))
        }
    }

    /// Creates a node at `position` in graph order and binds its edges.
    ///
    /// Outputs are claimed by the new node even if a live node still produces
    /// them; the caller detaches the superseded producer afterwards.
    pub(crate) fn link_node(
        &mut self,
        name: String,
        op_type: OpType,
        inputs: &[ValueId],
        outputs: &[ValueId],
        attrs: Attributes,
        position: usize,
    ) -> IrResult<NodeId> {
        for &value in inputs.iter().chain(outputs) {
            self.check_value(value)?;
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            id,
            name,
            op_type,
            inputs: inputs.to_vec(),
            outputs: outputs.to_vec(),
            attrs,
            detached: false,
            order: None,
            fusion_group: None,
        });
        for (slot, &input) in inputs.iter().enumerate() {
            self.values[input.0].users.push(Use { node: id, slot });
        }
        for &output in outputs {
            self.values[output.0].producer = Some(id);
        }
        let position = position.min(self.order.len());
        self.order.insert(position, id);
        Ok(id)
    }

    /// Restores a topological graph order if any consumer of `id`'s outputs
    /// sits before `id`.
    ///
    /// The repair is a stable Kahn sort keyed on the current positions, so
    /// nodes that are already correctly placed keep their relative order.
    pub(crate) fn ensure_topological(&mut self, id: NodeId) {
        let Some(at) = self.position(id) else {
            return;
        };
        let misplaced = self.nodes[id.0].outputs.iter().any(|&out| {
            self.values[out.0]
                .users
                .iter()
                .any(|u| self.position(u.node).is_some_and(|p| p < at))
        });
        if misplaced {
            debug!(node = %self.nodes[id.0].name, "Repairing graph order");
            self.stable_topological_sort();
        }
    }

    fn stable_topological_sort(&mut self) {
        let rank: FxHashMap<NodeId, usize> =
            self.order.iter().enumerate().map(|(i, &n)| (n, i)).collect();
        let mut pending: FxHashMap<NodeId, usize> = FxHashMap::default();
        for &id in &self.order {
            let node = &self.nodes[id.0];
            let deps = if node.detached {
                0
            } else {
                node.inputs
                    .iter()
                    .filter(|v| self.values[v.0].producer.is_some())
                    .count()
            };
            pending.insert(id, deps);
        }

        let mut ready: BinaryHeap<Reverse<(usize, NodeId)>> = pending
            .iter()
            .filter(|(_, &deps)| deps == 0)
            .map(|(&id, _)| Reverse((rank[&id], id)))
            .collect();
        let mut sorted = Vec::with_capacity(self.order.len());
        while let Some(Reverse((_, id))) = ready.pop() {
            sorted.push(id);
            if self.nodes[id.0].detached {
                continue;
            }
            for &out in &self.nodes[id.0].outputs {
                if self.values[out.0].producer != Some(id) {
                    continue;
                }
                for u in &self.values[out.0].users {
                    if let Some(deps) = pending.get_mut(&u.node) {
                        *deps -= 1;
                        if *deps == 0 {
                            ready.push(Reverse((rank[&u.node], u.node)));
                        }
                    }
                }
            }
        }

        // A cycle leaves nodes behind; keep them at the end so nothing is lost
        // and the sanity check can report it.
        if sorted.len() < self.order.len() {
            let placed: FxHashSet<NodeId> = sorted.iter().copied().collect();
            let rest: Vec<NodeId> = self
                .order
                .iter()
                .copied()
                .filter(|n| !placed.contains(n))
                .collect();
            sorted.extend(rest);
        }
        self.order = sorted;
    }
}
