//! `Transpose([1, 0]) -> Gemm` absorption into the Gemm's transpose flags.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use weft_ir::{Attributes, Graph, GraphBuilder, NodeId, OpType};

use super::{sole_internal_use, MergeRule};
use crate::error::OptResult;

const SWAP: [i64; 2] = [1, 0];

pub(super) fn merge(graph: &mut Graph, transpose: NodeId) -> OptResult<bool> {
    let node = graph.node(transpose);
    if node.inputs().len() != 1 || node.outputs().len() != 1 {
        return Ok(false);
    }
    let source = node.inputs()[0];
    let is_swap = match node.attrs().get("perm") {
        Some(_) => node.attrs().ints("perm") == Some(&SWAP[..]),
        // Default perm reverses the axes, a swap for rank 2.
        None => graph.value(source).ty().ndim() == Some(2),
    };
    if !is_swap {
        return Ok(false);
    }

    let Some(u) = sole_internal_use(graph, node.outputs()[0]) else {
        return Ok(false);
    };
    let gemm = graph.node(u.node);
    if gemm.op_type() != OpType::Gemm {
        return Ok(false);
    }
    let flag = match u.slot {
        0 => "transA",
        1 => "transB",
        _ => return Ok(false),
    };

    let mut inputs = gemm.inputs().to_vec();
    inputs[u.slot] = source;
    let outputs = gemm.outputs().to_vec();
    let Some(current) = gemm.attrs().read_or(flag, Attributes::int, 0) else {
        return Ok(false);
    };
    let mut attrs = gemm.attrs().clone();
    attrs.set(flag, i64::from(current == 0));

    let mut gb = GraphBuilder::new(graph, MergeRule::TransposeGemm.name(), source);
    gb.mop_with(OpType::Gemm, &inputs, &outputs, attrs)?;

    graph.detach_node(transpose);
    graph.detach_node(u.node);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_ir::{Attributes, DType, ValueId, ValueType};

    fn transpose_gemm(perm: Option<Vec<i64>>, slot: usize, trans: i64) -> (Graph, NodeId, ValueId) {
        let mut graph = Graph::new("tg");
        let x = graph.add_input("x", ValueType::new(DType::F32, &[3, 4]));
        let other = graph.add_input("o", ValueType::new(DType::F32, &[4, 3]));
        let c = graph.add_input("c", ValueType::new(DType::F32, &[4]));
        let t = graph.add_value("t", ValueType::new(DType::F32, &[4, 3]));
        let y = graph.add_value("y", ValueType::new(DType::F32, &[4, 4]));
        let attrs = match perm {
            Some(p) => Attributes::new().with("perm", p),
            None => Attributes::new(),
        };
        let id = graph.add_node(OpType::Transpose, &[x], &[t], attrs).unwrap();
        let inputs = if slot == 0 { [t, other, c] } else { [other, t, c] };
        let flags = Attributes::new()
            .with("alpha", 0.5f32)
            .with("transA", trans)
            .with("transB", trans);
        graph.add_node(OpType::Gemm, &inputs, &[y], flags).unwrap();
        graph.add_output(y).unwrap();
        (graph, id, x)
    }

    #[test]
    fn test_first_operand_flag_flips() {
        let (mut graph, id, x) = transpose_gemm(Some(vec![1, 0]), 0, 0);
        assert!(merge(&mut graph, id).unwrap());

        let live = graph.live_nodes();
        assert_eq!(live.len(), 1);
        let gemm = graph.node(live[0]);
        assert_eq!(gemm.input(0), Some(x));
        assert_eq!(gemm.attrs().int("transA"), Some(1));
        assert_eq!(gemm.attrs().int("transB"), Some(0));
        assert_eq!(gemm.attrs().float("alpha"), Some(0.5));
        graph.check_sanity().unwrap();
    }

    #[test]
    fn test_second_operand_flag_flips_back() {
        let (mut graph, id, x) = transpose_gemm(None, 1, 1);
        assert!(merge(&mut graph, id).unwrap());

        let gemm = graph.node(graph.live_nodes()[0]);
        assert_eq!(gemm.input(1), Some(x));
        assert_eq!(gemm.attrs().int("transA"), Some(1));
        assert_eq!(gemm.attrs().int("transB"), Some(0));
    }

    #[test]
    fn test_other_permutation_declines() {
        let (mut graph, id, _) = transpose_gemm(Some(vec![0, 1]), 0, 0);
        assert!(!merge(&mut graph, id).unwrap());
        assert_eq!(graph.live_count(), 2);
    }

    #[test]
    fn test_mistyped_perm_declines() {
        let (mut graph, id, _) = transpose_gemm(None, 0, 0);
        graph.node_mut(id).attrs_mut().set("perm", 1i64);
        assert!(!merge(&mut graph, id).unwrap());
        assert_eq!(graph.live_count(), 2);
    }

    #[test]
    fn test_mistyped_flag_declines() {
        let (mut graph, id, _) = transpose_gemm(Some(vec![1, 0]), 1, 0);
        let gemm = graph.live_nodes()[1];
        graph.node_mut(gemm).attrs_mut().set("transB", 1.0f32);
        assert!(!merge(&mut graph, id).unwrap());
        assert_eq!(graph.live_count(), 2);
    }

    #[test]
    fn test_transposed_graph_output_declines() {
        let (mut graph, id, _) = transpose_gemm(Some(vec![1, 0]), 0, 0);
        let t = graph.node(id).outputs()[0];
        graph.add_output(t).unwrap();

        assert!(!merge(&mut graph, id).unwrap());
        assert_eq!(graph.live_count(), 2);
        assert_eq!(graph.value(t).producer(), Some(id));
    }
}
