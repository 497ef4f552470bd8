// src/cluster/summary.rs
use std::cmp::Ordering;
use ahash::AHashMap;
use serde::{Serialize, Serializer};
use crate::types::{Cluster, Group};

/// Most frequent sequence; ties go to the one seen first.
pub fn representative<'a, I>(sequences: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: AHashMap<&'a str, (usize, usize)> = AHashMap::new();
    for (pos, seq) in sequences.into_iter().enumerate() {
        counts.entry(seq).or_insert((0, pos)).0 += 1;
    }
    counts
        .into_iter()
        .max_by(|(_, (ca, fa)), (_, (cb, fb))| ca.cmp(cb).then(fb.cmp(fa)))
        .map(|(seq, _)| seq)
}

/// Round to five decimals; whole numbers keep one trailing zero.
pub fn format_mean(value: f64) -> String {
    let rounded = (value * 100_000.0).round() / 100_000.0;
    if rounded.fract() == 0.0 {
        format!("{:.1}", rounded)
    } else {
        format!("{}", rounded)
    }
}

fn serialize_mean<S: Serializer>(value: &f64, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_mean(*value))
}

/// One row of `summary.csv`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterSummary {
    pub v_call: String,
    pub j_call: String,
    pub junction_aa: String,
    #[serde(serialize_with = "serialize_mean")]
    pub consensus_count: f64,
    pub patient_count: usize,
    pub patient_id: String,
}

impl ClusterSummary {
    /// Returns None for an empty cluster.
    pub fn summarize(cluster: &Cluster, group: &Group) -> Option<Self> {
        let junction_aa = representative(cluster.records(group).map(|r| r.junction_aa.as_str()))?;

        let total: u128 = cluster.records(group).map(|r| u128::from(r.consensus_count)).sum();
        let consensus_count = total as f64 / cluster.len() as f64;

        let mut patients: Vec<&str> = cluster.records(group).map(|r| r.patient_id.as_str()).collect();
        patients.sort_unstable();
        patients.dedup();

        Some(Self {
            v_call: group.key.v_call().to_string(),
            j_call: group.key.j_call().to_string(),
            junction_aa: junction_aa.to_string(),
            consensus_count,
            patient_count: patients.len(),
            patient_id: patients.join("_"),
        })
    }

    fn rank(&self, other: &Self) -> Ordering {
        other
            .patient_count
            .cmp(&self.patient_count)
            .then_with(|| self.v_call.cmp(&other.v_call))
            .then_with(|| self.j_call.cmp(&other.j_call))
            .then_with(|| self.junction_aa.cmp(&other.junction_aa))
    }
}

/// Merges per-group summaries into the ranked global table.
#[derive(Debug, Default)]
pub struct SummaryAggregator {
    rows: Vec<ClusterSummary>,
}

impl SummaryAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend<I: IntoIterator<Item = ClusterSummary>>(&mut self, rows: I) {
        self.rows.extend(rows);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows by descending patient count, then v_call, j_call and junction.
    pub fn finish(mut self) -> Vec<ClusterSummary> {
        self.rows.sort_by(|a, b| a.rank(b));
        self.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GroupKey, Record};

    fn record(patient: &str, junction: &str, count: u64) -> Record {
        Record {
            sample_id: format!("{}_s", patient),
            patient_id: patient.to_string(),
            v_call: "IGHV1".into(),
            j_call: "IGHJ4".into(),
            junction_aa: junction.to_string(),
            consensus_count: count,
        }
    }

    fn row(patients: usize, v: &str, junction: &str) -> ClusterSummary {
        ClusterSummary {
            v_call: v.into(),
            j_call: "IGHJ4".into(),
            junction_aa: junction.into(),
            consensus_count: 1.0,
            patient_count: patients,
            patient_id: String::new(),
        }
    }

    #[test]
    fn representative_is_mode_with_first_seen_tie_break() {
        assert_eq!(representative(["CARW", "CARF", "CARF"]), Some("CARF"));
        assert_eq!(representative(["CARW", "CARF", "CARF", "CARW"]), Some("CARW"));
        assert_eq!(representative(["CASS", "CARW", "CARF"]), Some("CASS"));
        assert_eq!(representative(std::iter::empty()), None);
    }

    #[test]
    fn summary_of_cluster() {
        let records = vec![
            record("p2", "CARW", 3),
            record("p1", "CARF", 1),
            record("p2", "CARF", 2),
            record("p9", "CASS", 7),
        ];
        let key = GroupKey::Length { v_call: "IGHV1".into(), j_call: "IGHJ4".into(), length: 4 };
        let group = Group::new(key, records);
        let summary = ClusterSummary::summarize(&Cluster::new(vec![0, 1, 2]), &group).unwrap();

        assert_eq!(summary.junction_aa, "CARF");
        assert_eq!(summary.consensus_count, 2.0);
        assert_eq!(summary.patient_count, 2);
        assert_eq!(summary.patient_id, "p1_p2");
        assert_eq!(summary.v_call, "IGHV1");
    }

    #[test]
    fn mean_of_huge_counts_does_not_overflow() {
        let records = vec![record("p1", "CARW", u64::MAX), record("p2", "CARW", u64::MAX)];
        let key = GroupKey::Length { v_call: "IGHV1".into(), j_call: "IGHJ4".into(), length: 4 };
        let group = Group::new(key, records);
        let summary = ClusterSummary::summarize(&Cluster::new(vec![0, 1]), &group).unwrap();
        assert_eq!(summary.consensus_count, u64::MAX as f64);
    }

    #[test]
    fn mean_is_rounded_to_five_decimals() {
        assert_eq!(format_mean(2.0), "2.0");
        assert_eq!(format_mean(1.5), "1.5");
        assert_eq!(format_mean(10.0 / 3.0), "3.33333");
        assert_eq!(format_mean(2.0 / 3.0), "0.66667");
    }

    #[test]
    fn global_summary_is_ranked() {
        let mut aggregator = SummaryAggregator::new();
        aggregator.extend(vec![row(2, "IGHV3", "CARW"), row(5, "IGHV2", "CASS")]);
        aggregator.extend(vec![row(2, "IGHV1", "CARW"), row(2, "IGHV1", "CARF")]);
        let rows = aggregator.finish();

        let order: Vec<(usize, &str, &str)> = rows
            .iter()
            .map(|r| (r.patient_count, r.v_call.as_str(), r.junction_aa.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![(5, "IGHV2", "CASS"), (2, "IGHV1", "CARF"), (2, "IGHV1", "CARW"), (2, "IGHV3", "CARW")]
        );
    }
}
