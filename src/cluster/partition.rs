// src/cluster/partition.rs
use ahash::AHashMap;
use log::debug;
use serde::Serialize;
use crate::config::subsystems::ClusteringPolicy;
use crate::types::{Group, GroupKey, Record};

/// Counters describing one partitioning pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PartitionStats {
    pub total_groups: usize,
    pub retained_groups: usize,
    pub singleton_groups: usize,
    pub below_patient_min: usize,
}

/// Splits records into disjoint groups on the categorical key of a policy.
#[derive(Debug, Clone, Copy)]
pub struct GroupPartitioner {
    policy: ClusteringPolicy,
    patient_min: usize,
}

impl GroupPartitioner {
    pub fn new(policy: ClusteringPolicy, patient_min: usize) -> Self {
        Self { policy, patient_min }
    }

    pub fn key_for(&self, record: &Record) -> GroupKey {
        match self.policy {
            ClusteringPolicy::Exact => GroupKey::Sequence {
                v_call: record.v_call.clone(),
                j_call: record.j_call.clone(),
                junction_aa: record.junction_aa.clone(),
            },
            ClusteringPolicy::Similar | ClusteringPolicy::Convergence => GroupKey::Length {
                v_call: record.v_call.clone(),
                j_call: record.j_call.clone(),
                length: record.junction_len(),
            },
        }
    }

    pub fn partition(&self, records: &[Record]) -> Vec<Group> {
        self.partition_with_stats(records).0
    }

    /// Group records, dropping groups that can never yield a cluster: fewer
    /// than two records or fewer than `patient_min` distinct patients.
    ///
    /// Records keep their input order inside a group and groups are returned
    /// sorted by key.
    pub fn partition_with_stats(&self, records: &[Record]) -> (Vec<Group>, PartitionStats) {
        let mut buckets: AHashMap<GroupKey, Vec<Record>> = AHashMap::new();
        for record in records {
            buckets.entry(self.key_for(record)).or_default().push(record.clone());
        }

        let mut stats = PartitionStats {
            total_groups: buckets.len(),
            ..Default::default()
        };

        let mut groups: Vec<Group> = Vec::with_capacity(buckets.len());
        for (key, members) in buckets {
            let group = Group::new(key, members);
            if group.len() < 2 {
                stats.singleton_groups += 1;
                continue;
            }
            if group.distinct_patients() < self.patient_min {
                stats.below_patient_min += 1;
                continue;
            }
            groups.push(group);
        }
        groups.sort_by(|a, b| a.key.cmp(&b.key));
        stats.retained_groups = groups.len();

        debug!(
            "Partitioned {} records into {} groups ({} retained) for {} clustering",
            records.len(), stats.total_groups, stats.retained_groups, self.policy.as_str()
        );
        (groups, stats)
    }
}
