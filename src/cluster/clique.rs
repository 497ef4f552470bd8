// src/cluster/clique.rs
//
// Greedy clique cover of a similarity graph.
//
// Similarity is not transitive, so connected components would chain A-B-C
// together even when A and C are dissimilar. Each round enumerates every
// maximal clique of what is left of the graph, keeps the largest one and
// removes its nodes. Nodes are never put back, so the cover is a heuristic:
// it guarantees the clique invariant, not a minimal number of clusters.

use ahash::{AHashMap, AHashSet};
use log::{debug, trace};
use petgraph::stable_graph::NodeIndex;
use crate::error::{Error, Result};
use crate::types::{Cluster, GroupKey};
use super::graph::SimilarityGraph;

/// Counts Bron-Kerbosch expansions and fails once the limit is passed.
#[derive(Debug, Clone, Copy)]
pub struct CliqueBudget {
    limit: u64,
    used: u64,
}

impl CliqueBudget {
    pub fn new(limit: u64) -> Self {
        Self { limit, used: 0 }
    }

    pub fn used(&self) -> u64 {
        self.used
    }

    #[inline]
    fn tick(&mut self) -> std::result::Result<(), ()> {
        self.used += 1;
        if self.used > self.limit {
            Err(())
        } else {
            Ok(())
        }
    }
}

type Adjacency = AHashMap<NodeIndex, AHashSet<NodeIndex>>;

fn adjacency(graph: &SimilarityGraph, nodes: &[NodeIndex]) -> Adjacency {
    nodes
        .iter()
        .map(|&v| (v, graph.neighbors(v).collect::<AHashSet<_>>()))
        .collect()
}

/// Bron-Kerbosch with Tomita pivoting. `p` and `x` are kept in ascending
/// node order so the expansion order is reproducible.
fn bron_kerbosch(
    adj: &Adjacency,
    r: &mut Vec<NodeIndex>,
    mut p: Vec<NodeIndex>,
    mut x: Vec<NodeIndex>,
    cliques: &mut Vec<Vec<NodeIndex>>,
    budget: &mut CliqueBudget,
) -> std::result::Result<(), ()> {
    budget.tick()?;

    if p.is_empty() {
        if x.is_empty() {
            cliques.push(r.clone());
        }
        return Ok(());
    }

    // Pivot on the vertex covering most of P; only its non-neighbours branch
    let pivot = p
        .iter()
        .chain(x.iter())
        .copied()
        .max_by_key(|u| {
            let nu = &adj[u];
            (p.iter().filter(|v| nu.contains(*v)).count(), std::cmp::Reverse(u.index()))
        });
    let candidates: Vec<NodeIndex> = match pivot {
        Some(u) => p.iter().copied().filter(|v| !adj[&u].contains(v)).collect(),
        None => p.clone(),
    };

    for v in candidates {
        let nv = &adj[&v];
        let p_next: Vec<NodeIndex> = p.iter().copied().filter(|w| nv.contains(w)).collect();
        let x_next: Vec<NodeIndex> = x.iter().copied().filter(|w| nv.contains(w)).collect();

        r.push(v);
        bron_kerbosch(adj, r, p_next, x_next, cliques, budget)?;
        r.pop();

        p.retain(|&w| w != v);
        let pos = x.partition_point(|w| w.index() < v.index());
        x.insert(pos, v);
    }
    Ok(())
}

/// All maximal cliques of the non-isolated part of `graph`, each sorted by
/// record index.
pub fn maximal_cliques(
    graph: &SimilarityGraph,
    key: &GroupKey,
    budget: &mut CliqueBudget,
) -> Result<Vec<Vec<usize>>> {
    let mut nodes: Vec<NodeIndex> = graph
        .node_indices()
        .filter(|&v| graph.neighbors(v).next().is_some())
        .collect();
    nodes.sort_unstable_by_key(|v| v.index());

    let adj = adjacency(graph, &nodes);
    let mut cliques = Vec::new();
    let mut r = Vec::new();
    bron_kerbosch(&adj, &mut r, nodes, Vec::new(), &mut cliques, budget).map_err(|_| {
        Error::CliqueBudgetExceeded { key: key.to_string(), limit: budget.limit }
    })?;

    Ok(cliques
        .into_iter()
        .map(|clique| {
            let mut members: Vec<usize> = clique.into_iter().map(|v| graph[v]).collect();
            members.sort_unstable();
            members
        })
        .collect())
}

/// Largest clique; equal sizes resolve to the lexicographically smallest
/// sorted member tuple.
pub fn select_largest(cliques: Vec<Vec<usize>>) -> Option<Vec<usize>> {
    cliques.into_iter().reduce(|best, candidate| {
        if candidate.len() > best.len() || (candidate.len() == best.len() && candidate < best) {
            candidate
        } else {
            best
        }
    })
}

#[derive(Debug, Clone, Copy)]
pub struct MaximalCliqueCover {
    max_steps: u64,
}

impl MaximalCliqueCover {
    pub fn new(max_steps: u64) -> Self {
        Self { max_steps }
    }

    /// Consume the graph, returning disjoint cliques of two or more records
    /// in the order they were extracted.
    pub fn cover(&self, mut graph: SimilarityGraph, key: &GroupKey) -> Result<Vec<Cluster>> {
        let mut budget = CliqueBudget::new(self.max_steps);
        let mut clusters = Vec::new();
        let mut rounds = 0usize;

        while graph.edge_count() > 0 {
            rounds += 1;
            let cliques = maximal_cliques(&graph, key, &mut budget)?;
            trace!("Round {} for {}: {} maximal cliques", rounds, key, cliques.len());

            let best = match select_largest(cliques) {
                Some(best) if best.len() > 1 => best,
                _ => break,
            };
            for &idx in &best {
                graph.remove_node(NodeIndex::new(idx));
            }
            clusters.push(Cluster::new(best));
        }

        debug!(
            "Clique cover of {} produced {} clusters in {} rounds ({} expansions)",
            key, clusters.len(), rounds, budget.used()
        );
        Ok(clusters)
    }
}
