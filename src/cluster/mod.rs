pub mod clique;
pub mod filter;
pub mod graph;
pub mod metrics;
pub mod parallel;
pub mod partition;
pub mod streaming;
pub mod summary;

// Re-export the main types
pub use self::clique::{CliqueBudget, MaximalCliqueCover};
pub use self::filter::ClusterFilter;
pub use self::graph::{SimilarityGraph, SimilarityGraphBuilder};
pub use self::metrics::{RunMetrics, RunMetricsStats};
pub use self::parallel::{ClusteringOrchestrator, GroupOutcomes, PolicyRun};
pub use self::partition::{GroupPartitioner, PartitionStats};
pub use self::streaming::{StreamingCluster, StreamingClusterer};
pub use self::summary::{ClusterSummary, SummaryAggregator};
