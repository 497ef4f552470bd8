// src/cluster/streaming.rs
//
// Single-pass incremental clustering. Each record joins the first existing
// cluster whose every member is compatible with it, otherwise it opens a new
// cluster. The result depends on input order and earlier assignments are
// never revisited; it is a separate strategy from the clique cover.

use std::fmt::Write as _;
use log::debug;
use crate::similarity::{match_score, SimilarityPredicate};
use crate::types::{Cluster, Group};
use super::summary::representative;

#[derive(Debug, Clone)]
pub struct StreamingCluster {
    members: Vec<(usize, String)>,
}

impl StreamingCluster {
    pub fn new(index: usize, sequence: &str) -> Self {
        Self { members: vec![(index, sequence.to_string())] }
    }

    /// Add the item when it is compatible with every current member.
    pub fn try_add(&mut self, index: usize, sequence: &str, predicate: &dyn SimilarityPredicate) -> bool {
        if self.members.iter().all(|(_, member)| predicate.is_similar(member, sequence)) {
            self.members.push((index, sequence.to_string()));
            true
        } else {
            false
        }
    }

    pub fn indices(&self) -> Vec<usize> {
        self.members.iter().map(|(idx, _)| *idx).collect()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn representative(&self) -> Option<&str> {
        representative(self.members.iter().map(|(_, s)| s.as_str()))
    }

    /// One line per member: index, sequence and its match score to the
    /// representative (`*` when identical).
    pub fn render(&self) -> String {
        let rep = self.representative().unwrap_or_default();
        let mut out = String::new();
        for (idx, seq) in &self.members {
            let score = match match_score(seq, rep) {
                Ok(s) if (s - 1.0).abs() < f64::EPSILON => "*".to_string(),
                Ok(s) => format!("{:.2}", s),
                Err(_) => "-".to_string(),
            };
            let _ = writeln!(out, "{} {} {}", idx, seq, score);
        }
        out
    }
}

pub struct StreamingClusterer<'a> {
    predicate: &'a dyn SimilarityPredicate,
}

impl<'a> StreamingClusterer<'a> {
    pub fn new(predicate: &'a dyn SimilarityPredicate) -> Self {
        Self { predicate }
    }

    pub fn assign(&self, group: &Group) -> Vec<StreamingCluster> {
        let mut clusters: Vec<StreamingCluster> = Vec::new();
        for (idx, record) in group.records.iter().enumerate() {
            let joined = clusters
                .iter_mut()
                .any(|c| c.try_add(idx, &record.junction_aa, self.predicate));
            if !joined {
                clusters.push(StreamingCluster::new(idx, &record.junction_aa));
            }
        }
        clusters
    }

    /// Clusters of two or more records, in creation order.
    pub fn cluster(&self, group: &Group) -> Vec<Cluster> {
        let assigned = self.assign(group);
        if log::log_enabled!(log::Level::Debug) {
            for c in assigned.iter().filter(|c| c.len() > 1) {
                debug!("Streaming cluster in {}:\n{}", group.key, c.render());
            }
        }
        assigned
            .into_iter()
            .filter(|c| c.len() > 1)
            .map(|c| Cluster::new(c.indices()))
            .collect()
    }
}
