// src/cluster/graph.rs
use log::trace;
use petgraph::stable_graph::{NodeIndex, StableUnGraph};
use crate::similarity::SimilarityPredicate;
use crate::types::Group;

/// Undirected similarity graph over one group. Node weights are the record
/// indices within the group, and node `i` is created for record `i`.
pub type SimilarityGraph = StableUnGraph<usize, ()>;

pub struct SimilarityGraphBuilder<'a> {
    predicate: &'a dyn SimilarityPredicate,
}

impl<'a> SimilarityGraphBuilder<'a> {
    pub fn new(predicate: &'a dyn SimilarityPredicate) -> Self {
        Self { predicate }
    }

    /// Test every unordered pair of the group once and connect the similar ones.
    pub fn build(&self, group: &Group) -> SimilarityGraph {
        let n = group.len();
        let mut graph = SimilarityGraph::with_capacity(n, n);
        for idx in 0..n {
            graph.add_node(idx);
        }

        for i in 0..n {
            let left = group.records[i].junction_aa.as_str();
            for j in (i + 1)..n {
                if self.predicate.is_similar(left, &group.records[j].junction_aa) {
                    graph.add_edge(NodeIndex::new(i), NodeIndex::new(j), ());
                }
            }
        }

        trace!(
            "Built similarity graph for {}: {} nodes, {} edges",
            group.key, graph.node_count(), graph.edge_count()
        );
        graph
    }
}
