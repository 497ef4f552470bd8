// src/cluster/filter.rs
use crate::types::{Cluster, Group};

/// Keeps clusters spanning at least `patient_min` distinct patients.
#[derive(Debug, Clone, Copy)]
pub struct ClusterFilter {
    patient_min: usize,
}

impl ClusterFilter {
    pub fn new(patient_min: usize) -> Self {
        Self { patient_min }
    }

    pub fn patient_min(&self) -> usize {
        self.patient_min
    }

    pub fn retains(&self, cluster: &Cluster, group: &Group) -> bool {
        cluster.patient_count(group) >= self.patient_min
    }

    pub fn apply(&self, clusters: Vec<Cluster>, group: &Group) -> Vec<Cluster> {
        clusters.into_iter().filter(|c| self.retains(c, group)).collect()
    }
}
