//! Graph Sanity Checking and Dumping
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use std::fmt;

use rustc_hash::FxHashMap;

use crate::error::{IrError, IrResult};
use crate::graph::{Graph, NodeId, Use, ValueId};

impl Graph {
    /// Verifies the structural invariants of the live graph.
    ///
    /// Checks that producer and user back-references agree with node edge
    /// lists, that no value has two live producers, that live nodes appear
    /// after the producers of their inputs, and that every graph output is
    /// computable.
    pub fn check_sanity(&self) -> IrResult<()> {
        let live = self.live_nodes();
        let position: FxHashMap<NodeId, usize> =
            live.iter().enumerate().map(|(i, &n)| (n, i)).collect();
        let mut producers: FxHashMap<ValueId, NodeId> = FxHashMap::default();

        for &id in &live {
            let node = self.node(id);
            for (slot, &input) in node.inputs().iter().enumerate() {
                let value = self.value(input);
                if !value.users().contains(&Use { node: id, slot }) {
                    return Err(invalid(format!(
                        "'{}' is missing from the users of '{}'",
                        node.name(),
                        value.name()
                    )));
                }
                if let Some(producer) = value.producer() {
                    let before = position.get(&producer).is_some_and(|&p| p < position[&id]);
                    if !before {
                        return Err(invalid(format!(
                            "'{}' consumes '{}' before it is produced",
                            node.name(),
                            value.name()
                        )));
                    }
                }
            }
            for &output in node.outputs() {
                if let Some(other) = producers.insert(output, id) {
                    return Err(IrError::MultipleProducers {
                        value: self.value(output).name().to_string(),
                        producer: self.node(other).name().to_string(),
                    });
                }
                if self.value(output).producer() != Some(id) {
                    return Err(invalid(format!(
                        "'{}' does not record '{}' as its producer",
                        self.value(output).name(),
                        node.name()
                    )));
                }
            }
        }

        for value in self.values() {
            if let Some(producer) = value.producer() {
                if self.node(producer).is_detached() {
                    return Err(invalid(format!(
                        "'{}' is produced by detached node '{}'",
                        value.name(),
                        self.node(producer).name()
                    )));
                }
            }
            for u in value.users() {
                let user = self.node(u.node);
                if user.is_detached() || user.input(u.slot) != Some(value.id()) {
                    return Err(invalid(format!(
                        "stale use of '{}' by '{}' slot {}",
                        value.name(),
                        user.name(),
                        u.slot
                    )));
                }
            }
        }

        for &output in self.output_values() {
            let value = self.value(output);
            let computable = value.producer().is_some()
                || self.is_input(output)
                || value.initializer().is_some();
            if !computable {
                return Err(invalid(format!(
                    "graph output '{}' has no producer",
                    value.name()
                )));
            }
        }

        Ok(())
    }
}

fn invalid(msg: String) -> IrError {
    IrError::InvalidGraph(msg)
}

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = |values: &[ValueId]| -> String {
            values
                .iter()
                .map(|&v| self.value(v).name())
                .collect::<Vec<_>>()
                .join(", ")
        };
        writeln!(
            f,
            "graph {} ({}) -> ({})",
            self.name(),
            names(self.input_values()),
            names(self.output_values())
        )?;
        for id in self.live_nodes() {
            let node = self.node(id);
            let order = node
                .order()
                .map_or_else(|| "-".to_string(), |o| o.to_string());
            write!(
                f,
                "  [{order:>3}] {} = {}({})",
                names(node.outputs()),
                node.op_type(),
                names(node.inputs())
            )?;
            if let Some(group) = node.fusion_group() {
                write!(f, " backend={} members={}", group.backend, group.members.len())?;
            }
            for (key, attr) in node.attrs().iter() {
                write!(f, " {key}={attr}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
