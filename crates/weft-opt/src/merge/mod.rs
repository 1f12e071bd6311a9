//! Operation Merging
//!
//! Fixed-point pattern rewriter. Every scan walks a snapshot of the live
//! nodes, dispatches each one by operator type to at most one rule, and the
//! loop stops after a scan in which nothing fired.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

mod bn_activation;
mod conv_bn;
mod fold;
mod pad_conv;
mod split_concat;
mod transpose_gemm;

use std::fmt;

use rustc_hash::FxHashMap;
use tracing::{debug, info, trace, warn};
use weft_ir::{Graph, NodeId, OpType, Use, ValueId};

use crate::error::OptResult;

pub use fold::ConvBnOperands;

// =============================================================================
// Configuration
// =============================================================================

/// Flags threaded into [`merge_operations`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeConfig {
    /// Gradient-supporting nodes must survive; disables irreversible folds.
    pub gen_backprop: bool,
    /// Enables experimental normalize+activate fusion.
    pub fuse_operations: bool,
    /// Upper bound on full scans. `None` runs to the fixed point.
    pub max_iterations: Option<usize>,
}

// =============================================================================
// Rule Table
// =============================================================================

/// A local rewrite, keyed by the operator it is anchored on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MergeRule {
    /// `Split -> Concat` on the same axis becomes identities.
    SplitConcat,
    /// Zero `Pad -> Conv` folds the padding into the convolution.
    PadConv,
    /// `Conv -> BatchNormalization` folds the statistics into the weights.
    ConvBatchNorm,
    /// `Transpose([1,0]) -> Gemm` flips the operand's transpose flag.
    TransposeGemm,
    /// `BatchNormalization -> Relu` becomes a single fused node.
    BatchNormActivation,
}

impl MergeRule {
    /// Every rule.
    pub const ALL: [MergeRule; 5] = [
        MergeRule::SplitConcat,
        MergeRule::PadConv,
        MergeRule::ConvBatchNorm,
        MergeRule::TransposeGemm,
        MergeRule::BatchNormActivation,
    ];

    /// Builder category, also used as the name prefix of created nodes.
    pub fn name(self) -> &'static str {
        match self {
            Self::SplitConcat => "MergeSplitConcat",
            Self::PadConv => "MergePadConv",
            Self::ConvBatchNorm => "MergeConvBN",
            Self::TransposeGemm => "MergeTransposeGemm",
            Self::BatchNormActivation => "MergeBatchNormalization",
        }
    }

    /// The rule anchored on `op`, if it is enabled under `config`.
    pub fn for_anchor(op: OpType, config: &MergeConfig) -> Option<Self> {
        match op {
            OpType::Split => Some(Self::SplitConcat),
            OpType::Pad => Some(Self::PadConv),
            OpType::Conv if !config.gen_backprop => Some(Self::ConvBatchNorm),
            OpType::Transpose => Some(Self::TransposeGemm),
            OpType::BatchNormalization if config.fuse_operations && !config.gen_backprop => {
                Some(Self::BatchNormActivation)
            }
            _ => None,
        }
    }

    /// Tries the rule at `node`. Returns whether the graph changed.
    pub fn apply(self, graph: &mut Graph, node: NodeId) -> OptResult<bool> {
        match self {
            Self::SplitConcat => split_concat::merge(graph, node),
            Self::PadConv => pad_conv::merge(graph, node),
            Self::ConvBatchNorm => conv_bn::merge(graph, node),
            Self::TransposeGemm => transpose_gemm::merge(graph, node),
            Self::BatchNormActivation => bn_activation::merge(graph, node),
        }
    }
}

impl fmt::Display for MergeRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Statistics
// =============================================================================

/// What a merge run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Full scans performed, including the final quiet one.
    pub iterations: usize,
    /// Successful applications per rule.
    pub applied: FxHashMap<MergeRule, usize>,
}

impl MergeStats {
    /// Applications of one rule.
    pub fn count(&self, rule: MergeRule) -> usize {
        self.applied.get(&rule).copied().unwrap_or(0)
    }

    /// Applications of all rules.
    pub fn total(&self) -> usize {
        self.applied.values().sum()
    }

    fn record(&mut self, rule: MergeRule) {
        *self.applied.entry(rule).or_insert(0) += 1;
    }
}

// =============================================================================
// Driver
// =============================================================================

/// Applies the rule table until a full scan changes nothing.
///
/// Each scan iterates a snapshot of the live nodes, so nodes detached by an
/// earlier rewrite in the same scan are skipped, and nodes created by it are
/// first seen on the next scan.
pub fn merge_operations(graph: &mut Graph, config: &MergeConfig) -> OptResult<MergeStats> {
    let mut stats = MergeStats::default();

    loop {
        if config.max_iterations.is_some_and(|max| stats.iterations >= max) {
            warn!(
                iterations = stats.iterations,
                "Merge stopped at iteration cap before reaching a fixed point"
            );
            break;
        }
        stats.iterations += 1;

        let mut replaced = false;
        for id in graph.live_nodes() {
            let node = graph.node(id);
            if node.is_detached() {
                continue;
            }
            let Some(rule) = MergeRule::for_anchor(node.op_type(), config) else {
                continue;
            };
            let name = node.name().to_string();
            if rule.apply(graph, id)? {
                debug!(rule = rule.name(), node = %name, "Merged operations");
                stats.record(rule);
                replaced = true;
            }
        }

        if !replaced {
            break;
        }
    }

    info!(
        iterations = stats.iterations,
        merged = stats.total(),
        live = graph.live_count(),
        "Merge pass complete"
    );
    trace!("{graph}");
    Ok(stats)
}

// =============================================================================
// Match Helpers
// =============================================================================

/// The sole consumer of `value`, unless the value is also a graph output.
///
/// Rewrites that swallow an intermediate value use this so that the graph's
/// output contract never changes.
pub(crate) fn sole_internal_use(graph: &Graph, value: ValueId) -> Option<Use> {
    if graph.is_output(value) {
        return None;
    }
    graph.value(value).single_use()
}
