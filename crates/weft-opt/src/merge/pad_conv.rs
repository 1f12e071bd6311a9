//! Zero `Pad -> Conv` folding.
//!
//! ONNX `pads` list all begin amounts, then all end amounts. For a pad over
//! `N, C, spatial...` the non-spatial entries sit at `0, 1, n/2, n/2 + 1`.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use weft_ir::{Attributes, Graph, GraphBuilder, NodeId, OpType};

use super::{sole_internal_use, MergeRule};
use crate::error::OptResult;

pub(super) fn merge(graph: &mut Graph, pad: NodeId) -> OptResult<bool> {
    let node = graph.node(pad);
    if node.inputs().len() != 1 || node.outputs().len() != 1 {
        return Ok(false);
    }
    let attrs = node.attrs();
    let mode = attrs.read_or("mode", Attributes::string, "constant");
    let value = attrs.read_or("value", Attributes::float, 0.0);
    if mode != Some("constant") || value != Some(0.0) {
        return Ok(false);
    }
    let Some(pads) = attrs.ints("pads") else {
        return Ok(false);
    };
    let n = pads.len();
    if n < 4 || n % 2 != 0 {
        return Ok(false);
    }
    let half = n / 2;
    if pads[0] != 0 || pads[1] != 0 || pads[half] != 0 || pads[half + 1] != 0 {
        return Ok(false);
    }
    if (2..half).any(|i| pads[i] != pads[half + i]) || pads.iter().any(|&p| p < 0) {
        return Ok(false);
    }

    let padded = node.outputs()[0];
    let Some(u) = sole_internal_use(graph, padded) else {
        return Ok(false);
    };
    let conv = graph.node(u.node);
    if conv.op_type() != OpType::Conv || u.slot != 0 {
        return Ok(false);
    }
    if conv.attrs().read_or("auto_pad", Attributes::string, "NOTSET") != Some("NOTSET") {
        return Ok(false);
    }

    let spatial = half - 2;
    let zeros = vec![0; 2 * spatial];
    let Some(conv_pads) = conv.attrs().read_or("pads", Attributes::ints, &zeros[..]) else {
        return Ok(false);
    };
    if conv_pads.len() != 2 * spatial {
        return Ok(false);
    }
    let begins = (0..spatial).map(|i| conv_pads[i] + pads[2 + i]);
    let ends = (0..spatial).map(|i| conv_pads[spatial + i] + pads[half + 2 + i]);
    let new_pads: Vec<i64> = begins.chain(ends).collect();

    let source = node.inputs()[0];
    let mut inputs = vec![source];
    inputs.extend_from_slice(&conv.inputs()[1..]);
    let outputs = conv.outputs().to_vec();
    let mut conv_attrs = conv.attrs().clone();
    conv_attrs.set("pads", new_pads);
    let conv = u.node;

    let mut gb = GraphBuilder::new(graph, MergeRule::PadConv.name(), source);
    gb.mop_with(OpType::Conv, &inputs, &outputs, conv_attrs)?;

    graph.detach_node(pad);
    graph.detach_node(conv);
    Ok(true)
}
