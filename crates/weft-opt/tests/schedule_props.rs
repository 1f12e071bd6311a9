//! Property tests for the scheduler on random DAGs.

use proptest::prelude::*;
use rustc_hash::FxHashSet;
use weft_ir::{Attributes, DType, Graph, NodeId, OpType, ValueType};
use weft_opt::schedule_computation;

/// Node `i` reads up to two earlier values; value 0 is the graph input and
/// value `i + 1` is node `i`'s output.
#[derive(Debug, Clone)]
struct Dag {
    inputs: Vec<Vec<usize>>,
    outputs: Vec<usize>,
    insertion: Vec<usize>,
}

fn dag() -> impl Strategy<Value = Dag> {
    (1usize..24)
        .prop_flat_map(|n| {
            let edges = prop::collection::vec(prop::collection::vec(any::<prop::sample::Index>(), 1..3), n);
            let outputs = prop::collection::vec(any::<prop::sample::Index>(), 1..4);
            let insertion = Just((0..n).collect::<Vec<_>>()).prop_shuffle();
            (edges, outputs, insertion)
        })
        .prop_map(|(edges, outputs, insertion)| {
            let n = edges.len();
            let inputs = edges
                .iter()
                .enumerate()
                .map(|(i, picks)| picks.iter().map(|p| p.index(i + 1)).collect())
                .collect();
            let outputs = outputs.iter().map(|p| p.index(n) + 1).collect();
            Dag {
                inputs,
                outputs,
                insertion,
            }
        })
}

/// Builds the graph, adding nodes in a shuffled order so that graph order is
/// not already topological.
fn build(dag: &Dag) -> (Graph, Vec<NodeId>) {
    let ty = ValueType::new(DType::F32, &[8]);
    let mut graph = Graph::new("random");
    let mut values = vec![graph.add_input("x", ty.clone())];
    for i in 0..dag.inputs.len() {
        values.push(graph.add_value(&format!("v{i}"), ty.clone()));
    }

    let mut ids = vec![None; dag.inputs.len()];
    for &i in &dag.insertion {
        let inputs: Vec<_> = dag.inputs[i].iter().map(|&v| values[v]).collect();
        let op = if inputs.len() == 1 { OpType::Relu } else { OpType::Add };
        ids[i] = Some(graph.add_node(op, &inputs, &[values[i + 1]], Attributes::new()).unwrap());
    }
    for &out in &dag.outputs {
        if !graph.is_output(values[out]) {
            graph.add_output(values[out]).unwrap();
        }
    }
    (graph, ids.into_iter().map(Option::unwrap).collect())
}

/// Nodes with a path to an output, computed on the index structure.
fn expected_live(dag: &Dag) -> FxHashSet<usize> {
    let mut live = FxHashSet::default();
    let mut stack: Vec<usize> = dag.outputs.iter().map(|&v| v - 1).collect();
    while let Some(i) = stack.pop() {
        if live.insert(i) {
            stack.extend(dag.inputs[i].iter().filter(|&&v| v > 0).map(|&v| v - 1));
        }
    }
    live
}

proptest! {
    #[test]
    fn prop_orders_are_dense_and_respect_edges(dag in dag()) {
        let (mut graph, ids) = build(&dag);
        let live = expected_live(&dag);

        let sequence = schedule_computation(&mut graph).unwrap();

        prop_assert_eq!(sequence.len(), live.len());
        let mut seen = FxHashSet::default();
        for (i, &id) in ids.iter().enumerate() {
            let order = graph.node(id).order();
            if live.contains(&i) {
                let order = order.unwrap();
                prop_assert!((1..=live.len()).contains(&order));
                prop_assert!(seen.insert(order));
                for &v in &dag.inputs[i] {
                    if v > 0 {
                        let producer = graph.node(ids[v - 1]).order().unwrap();
                        prop_assert!(producer < order);
                    }
                }
            } else {
                prop_assert_eq!(order, None);
            }
        }
    }

    #[test]
    fn prop_schedule_is_deterministic(dag in dag()) {
        let (mut a, _) = build(&dag);
        let (mut b, _) = build(&dag);
        prop_assert_eq!(schedule_computation(&mut a).unwrap(), schedule_computation(&mut b).unwrap());
    }
}
