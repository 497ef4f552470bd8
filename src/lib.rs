//! cdr3_cluster groups immune receptor junction sequences (CDR3) that share
//! V and J gene calls into clusters of identical, similar or biochemically
//! convergent sequences, and keeps the clusters seen across enough patients.

// Module declarations
pub mod error;
pub mod types;
pub mod config;
pub mod similarity;
pub mod cluster;
pub mod storage;
pub mod utils;

use log::info;

// Re-exports
pub use error::{Error, Result};
pub use cluster::{ClusteringOrchestrator, PolicyRun};
pub use types::{Cluster, Group, GroupKey, Record};

// Re-export the config from config module
pub use config::ClusterConfig;

/// Read the configured input table and run every configured policy on it.
pub fn run(config: &ClusterConfig) -> Result<Vec<PolicyRun>> {
    let input = config
        .files
        .input
        .as_ref()
        .ok_or_else(|| Error::config("No input table configured"))?;

    let (records, stats) = storage::read_records(input)?;
    if stats.skipped > 0 {
        info!("{} of {} rows dropped as malformed", stats.skipped, stats.rows);
    }

    let orchestrator = ClusteringOrchestrator::new(config)?;
    orchestrator.run(&records)
}
