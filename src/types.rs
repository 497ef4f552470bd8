use ahash::AHashSet;
use serde::{Serialize, Deserialize};
use std::fmt;

/// One cleaned receptor call: a junction sequence observed in one sample.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    pub sample_id: String,
    pub patient_id: String,
    pub v_call: String,
    pub j_call: String,
    pub junction_aa: String,
    pub consensus_count: u64,
}

impl Record {
    pub fn junction_len(&self) -> usize {
        self.junction_aa.len()
    }
}

/// Categorical key shared by every record of a group.
///
/// Exact clustering keys on the full junction; the graph policies only need
/// equal-length sequences, so they key on the junction length.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GroupKey {
    Sequence {
        v_call: String,
        j_call: String,
        junction_aa: String,
    },
    Length {
        v_call: String,
        j_call: String,
        length: usize,
    },
}

impl GroupKey {
    pub fn v_call(&self) -> &str {
        match self {
            GroupKey::Sequence { v_call, .. } | GroupKey::Length { v_call, .. } => v_call,
        }
    }

    pub fn j_call(&self) -> &str {
        match self {
            GroupKey::Sequence { j_call, .. } | GroupKey::Length { j_call, .. } => j_call,
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Sequence { v_call, j_call, junction_aa } => {
                write!(f, "{}|{}|{}", v_call, j_call, junction_aa)
            }
            GroupKey::Length { v_call, j_call, length } => {
                write!(f, "{}|{}|len={}", v_call, j_call, length)
            }
        }
    }
}

/// Records sharing one `GroupKey`, in input order.
#[derive(Debug, Clone)]
pub struct Group {
    pub key: GroupKey,
    pub records: Vec<Record>,
}

impl Group {
    pub fn new(key: GroupKey, records: Vec<Record>) -> Self {
        Self { key, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn distinct_patients(&self) -> usize {
        self.records
            .iter()
            .map(|r| r.patient_id.as_str())
            .collect::<AHashSet<_>>()
            .len()
    }
}

/// A clique of record indices drawn from a single group.
///
/// Members are kept sorted ascending, which is also input order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cluster {
    members: Vec<usize>,
}

impl Cluster {
    pub fn new(mut members: Vec<usize>) -> Self {
        members.sort_unstable();
        members.dedup();
        Self { members }
    }

    pub fn members(&self) -> &[usize] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn records<'a>(&'a self, group: &'a Group) -> impl Iterator<Item = &'a Record> + 'a {
        self.members.iter().map(move |&idx| &group.records[idx])
    }

    pub fn patient_count(&self, group: &Group) -> usize {
        self.records(group)
            .map(|r| r.patient_id.as_str())
            .collect::<AHashSet<_>>()
            .len()
    }
}
