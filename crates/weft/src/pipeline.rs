//! Pipeline - Pass Orchestration
//!
//! Runs the rewriter, the configured fusion backends and the scheduler over
//! one graph, in that order.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use tracing::{debug, info, info_span};
use weft_fusion::{
    backend_by_name, fuse_all_connected_nodes, BackendGroups, FusionBackend, FusionError,
};
use weft_ir::{Graph, NodeId};
use weft_opt::{merge_operations, schedule_computation, MergeStats};

use crate::config::CompilerConfig;
use crate::error::WeftResult;

// =============================================================================
// Report
// =============================================================================

/// What a pipeline run did to the graph.
#[derive(Debug, Clone, Default)]
pub struct CompileReport {
    /// Rewriter statistics, if the rewriter ran.
    pub merge: Option<MergeStats>,
    /// Fused nodes per backend, in run order.
    pub fusion: Vec<BackendGroups>,
    /// Execution sequence; node `sequence[i]` has order `i + 1`.
    pub sequence: Vec<NodeId>,
}

impl CompileReport {
    /// Total fused nodes across backends.
    pub fn fused_count(&self) -> usize {
        self.fusion.iter().map(|g| g.nodes.len()).sum()
    }
}

// =============================================================================
// Pipeline
// =============================================================================

/// Configured pass sequence.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: CompilerConfig,
}

impl Pipeline {
    /// Creates a pipeline.
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    /// The configuration in use.
    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compiles `graph` in place.
    ///
    /// Backend names are resolved before any pass runs, so a bad name leaves
    /// the graph untouched.
    pub fn run(&self, graph: &mut Graph) -> WeftResult<CompileReport> {
        let _span = info_span!("compile", graph = graph.name()).entered();
        let backends = self.resolve_backends()?;
        let mut report = CompileReport::default();

        self.check(graph, "input")?;

        if self.config.merge.enabled {
            let stats = merge_operations(graph, &self.config.merge.to_merge_config())?;
            self.check(graph, "merge")?;
            report.merge = Some(stats);
        }

        for backend in &backends {
            let min_group_size = self
                .config
                .fusion
                .min_group_size
                .unwrap_or_else(|| backend.min_group_size());
            let nodes = fuse_all_connected_nodes(
                backend.name(),
                graph,
                min_group_size,
                backend.allow_single_node(),
                |g, n| backend.is_fusable(g, n),
            )?;
            self.check(graph, backend.name())?;
            report.fusion.push(BackendGroups {
                backend: backend.name().to_string(),
                nodes,
            });
        }

        report.sequence = schedule_computation(graph)?;

        info!(
            merged = report.merge.as_ref().map_or(0, MergeStats::total),
            fused = report.fused_count(),
            scheduled = report.sequence.len(),
            "Compilation complete"
        );
        Ok(report)
    }

    fn resolve_backends(&self) -> WeftResult<Vec<Box<dyn FusionBackend>>> {
        let mut backends = Vec::with_capacity(self.config.fusion.backends.len());
        for name in &self.config.fusion.backends {
            let backend =
                backend_by_name(name).ok_or_else(|| FusionError::UnknownBackend(name.clone()))?;
            backends.push(backend);
        }
        Ok(backends)
    }

    fn check(&self, graph: &Graph, stage: &str) -> WeftResult<()> {
        if self.config.schedule.check_sanity {
            debug!(stage, "Checking graph sanity");
            graph.check_sanity()?;
        }
        Ok(())
    }
}
