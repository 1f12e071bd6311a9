//! Fusion Backends
//!
//! Pluggable fusability policies and the registry that resolves them by name.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use tracing::debug;
use weft_ir::{Graph, Node, NodeId};

use crate::backends::{DldtBackend, ElementwiseBackend};
use crate::error::{FusionError, FusionResult};
use crate::grouper::fuse_all_connected_nodes;

// =============================================================================
// Backend Trait
// =============================================================================

/// A target that compiles fused groups ahead of time.
pub trait FusionBackend: Send + Sync {
    /// Name tagged onto fused nodes.
    fn name(&self) -> &'static str;

    /// Smallest multi-node component worth offloading.
    fn min_group_size(&self) -> usize;

    /// Whether a lone fusable node is offloaded by itself.
    fn allow_single_node(&self) -> bool;

    /// Whether `node` may join a group. Must not mutate or depend on
    /// anything but the graph passed in.
    fn is_fusable(&self, graph: &Graph, node: &Node) -> bool;
}

// =============================================================================
// Registry
// =============================================================================

/// Names of the built-in backends.
pub const AVAILABLE_BACKENDS: &[&str] = &[DldtBackend::NAME, ElementwiseBackend::NAME];

/// Looks up a built-in backend by name.
pub fn backend_by_name(name: &str) -> Option<Box<dyn FusionBackend>> {
    match name {
        DldtBackend::NAME => Some(Box::new(DldtBackend)),
        ElementwiseBackend::NAME => Some(Box::new(ElementwiseBackend)),
        _ => None,
    }
}

/// Runs the grouper with a backend's own policy.
pub fn fuse_with_backend(graph: &mut Graph, backend: &dyn FusionBackend) -> FusionResult<Vec<NodeId>> {
    fuse_all_connected_nodes(
        backend.name(),
        graph,
        backend.min_group_size(),
        backend.allow_single_node(),
        |g, n| backend.is_fusable(g, n),
    )
}

/// Fused nodes created for one backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendGroups {
    /// Backend name.
    pub backend: String,
    /// Fused nodes, in discovery order.
    pub nodes: Vec<NodeId>,
}

/// Runs every named backend in turn.
///
/// Unknown names are rejected before the graph is touched.
pub fn fuse_operations(graph: &mut Graph, backends: &[String]) -> FusionResult<Vec<BackendGroups>> {
    let resolved = backends
        .iter()
        .map(|name| backend_by_name(name).ok_or_else(|| FusionError::UnknownBackend(name.clone())))
        .collect::<FusionResult<Vec<_>>>()?;

    let mut out = Vec::with_capacity(resolved.len());
    for backend in resolved {
        debug!(backend = backend.name(), "Running fusion backend");
        let nodes = fuse_with_backend(graph, backend.as_ref())?;
        out.push(BackendGroups {
            backend: backend.name().to_string(),
            nodes,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry() {
        for name in AVAILABLE_BACKENDS {
            let backend = backend_by_name(name).unwrap();
            assert_eq!(backend.name(), *name);
        }
        assert!(backend_by_name("tvm").is_none());
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let mut graph = Graph::new("g");
        let err = fuse_operations(&mut graph, &["dldt".to_string(), "bogus".to_string()])
            .unwrap_err();
        assert!(matches!(err, FusionError::UnknownBackend(ref n) if n == "bogus"));
    }
}
