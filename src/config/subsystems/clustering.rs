// src/config/subsystems/clustering.rs

use serde::{Serialize, Deserialize};
use crate::error::{Error, Result};
use crate::config::FromIni;

/// Which similarity relation defines an edge between two junctions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ClusteringPolicy {
    /// Identical junctions only.
    Exact,
    /// Positional identity at or above the similarity threshold.
    Similar,
    /// Positional identity plus a positive substitution score at every position.
    Convergence,
}

impl ClusteringPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClusteringPolicy::Exact => "exact",
            ClusteringPolicy::Similar => "similar",
            ClusteringPolicy::Convergence => "convergence",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().trim_matches('"').to_lowercase().as_str() {
            "exact" => Some(Self::Exact),
            "similar" | "similarity" | "positional" => Some(Self::Similar),
            "convergence" | "convergent" | "biochemical" => Some(Self::Convergence),
            _ => None,
        }
    }

    /// Name of the per-policy output directory.
    pub fn output_dir_name(&self) -> String {
        format!("clustering_{}", self.as_str())
    }

    /// Whether clusters come from a clique search rather than from grouping.
    pub fn needs_graph(&self) -> bool {
        !matches!(self, ClusteringPolicy::Exact)
    }

    pub fn all() -> Vec<Self> {
        vec![Self::Exact, Self::Similar, Self::Convergence]
    }
}

/// How a group's similarity relation is turned into clusters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClusteringStrategy {
    /// Greedy cover by largest maximal cliques.
    Clique,
    /// Single pass, order dependent: each record joins the first compatible cluster.
    Streaming,
}

impl ClusteringStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClusteringStrategy::Clique => "clique",
            ClusteringStrategy::Streaming => "streaming",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().trim_matches('"').to_lowercase().as_str() {
            "clique" => Some(Self::Clique),
            "streaming" | "incremental" => Some(Self::Streaming),
            _ => None,
        }
    }
}

impl Default for ClusteringStrategy {
    fn default() -> Self {
        Self::Clique
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusteringConfig {
    pub policies: Vec<ClusteringPolicy>,
    pub similarity_threshold: f64,
    pub patient_min: usize,
    pub strategy: ClusteringStrategy,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            policies: ClusteringPolicy::all(),
            similarity_threshold: 0.8,
            patient_min: 2,
            strategy: ClusteringStrategy::Clique,
        }
    }
}

pub fn parse_policies(value: &str) -> Result<Vec<ClusteringPolicy>> {
    let mut policies = Vec::new();
    for name in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if name.eq_ignore_ascii_case("all") {
            return Ok(ClusteringPolicy::all());
        }
        match ClusteringPolicy::from_str(name) {
            Some(policy) if !policies.contains(&policy) => policies.push(policy),
            Some(_) => {}
            None => return Err(Error::Config(format!("Invalid clustering policy: {}", name))),
        }
    }
    Ok(policies)
}

impl FromIni for ClusteringConfig {
    fn from_ini_section(&mut self, _section_name: &str, key: &str, value: &str) -> Option<Result<()>> {
        match key {
            "policies" | "policy" => {
                match parse_policies(value) {
                    Ok(policies) => {
                        self.policies = policies;
                        Some(Ok(()))
                    },
                    Err(e) => Some(Err(e)),
                }
            },
            "similarity_threshold" => {
                match value.parse::<f64>() {
                    Ok(threshold) if threshold > 0.0 && threshold <= 1.0 => {
                        self.similarity_threshold = threshold;
                        Some(Ok(()))
                    },
                    _ => Some(Err(Error::Config(
                        format!("Invalid similarity_threshold (must be in (0, 1]): {}", value)
                    ))),
                }
            },
            "patient_min" => {
                match value.parse::<usize>() {
                    Ok(min) if min >= 1 => {
                        self.patient_min = min;
                        Some(Ok(()))
                    },
                    _ => Some(Err(Error::Config(
                        format!("Invalid patient_min (must be >= 1): {}", value)
                    ))),
                }
            },
            "strategy" => {
                match ClusteringStrategy::from_str(value) {
                    Some(strategy) => {
                        self.strategy = strategy;
                        Some(Ok(()))
                    },
                    None => Some(Err(Error::Config(
                        format!("Invalid clustering strategy: {}", value)
                    ))),
                }
            },
            _ => None,
        }
    }
}

impl ClusteringConfig {
    pub fn validate(&self) -> Result<()> {
        if self.policies.is_empty() {
            return Err(Error::config("At least one clustering policy is required"));
        }
        if !(self.similarity_threshold > 0.0 && self.similarity_threshold <= 1.0) {
            return Err(Error::Config(
                format!("similarity_threshold must be in (0, 1], got {}", self.similarity_threshold)
            ));
        }
        if self.patient_min == 0 {
            return Err(Error::config("patient_min must be at least 1"));
        }
        Ok(())
    }
}
