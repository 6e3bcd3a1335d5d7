use super::Graph;
use crate::algo::forces;
use rustc_hash::FxHashMap;

/// An edge whose endpoints resolved to node indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ResolvedEdge {
    /// Index into `Graph::edges`.
    pub(crate) edge: usize,
    pub(crate) source: usize,
    pub(crate) target: usize,
}

impl ResolvedEdge {
    pub(crate) fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

/// Per-invocation lookup tables derived from a [`Graph`].
#[derive(Debug, Clone)]
pub(crate) struct GraphIndex {
    pub(crate) edges: Vec<ResolvedEdge>,
    pub(crate) degrees: Vec<usize>,
    pub(crate) masses: Vec<f64>,
}

impl GraphIndex {
    pub(crate) fn build(graph: &Graph) -> Self {
        let mut id_to_idx: FxHashMap<String, usize> = FxHashMap::default();
        id_to_idx.reserve(graph.nodes.len());
        for (idx, n) in graph.nodes.iter().enumerate() {
            if id_to_idx.contains_key(n.id.as_str()) {
                tracing::warn!(node = %n.id, "duplicate node id; keeping the first occurrence");
                continue;
            }
            id_to_idx.insert(n.id.clone(), idx);
        }

        let mut edges: Vec<ResolvedEdge> = Vec::with_capacity(graph.edges.len());
        for (idx, e) in graph.edges.iter().enumerate() {
            let (Some(&source), Some(&target)) = (
                id_to_idx.get(e.source.as_str()),
                id_to_idx.get(e.target.as_str()),
            ) else {
                tracing::warn!(edge = %e.label(), "edge references an unknown node; skipping");
                continue;
            };
            edges.push(ResolvedEdge {
                edge: idx,
                source,
                target,
            });
        }

        let degrees = forces::degrees(
            graph.nodes.len(),
            edges.iter().map(|e| (e.source, e.target)),
        );
        let masses = forces::masses(graph.nodes.iter().map(|n| n.mass), &degrees);

        Self {
            edges,
            degrees,
            masses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::GraphIndex;
    use crate::graph::{Edge, Graph, Node};

    #[test]
    fn unknown_endpoints_are_skipped() {
        let g = Graph::new(
            vec![Node::new("a"), Node::new("b")],
            vec![Edge::new("a", "b"), Edge::new("a", "ghost"), Edge::new("b", "b")],
        );
        let idx = GraphIndex::build(&g);
        assert_eq!(idx.edges.len(), 2);
        assert_eq!(idx.degrees, vec![1, 2]);
        assert_eq!(idx.masses, vec![1.0, 2.0]);
        assert!(idx.edges[1].is_self_loop());
    }

    #[test]
    fn duplicate_ids_keep_the_first_node() {
        let g = Graph::new(
            vec![Node::new("a"), Node::new("a"), Node::new("b")],
            vec![Edge::new("a", "b")],
        );
        let idx = GraphIndex::build(&g);
        assert_eq!((idx.edges[0].source, idx.edges[0].target), (0, 2));
        assert_eq!(idx.degrees, vec![1, 0, 1]);
    }
}
