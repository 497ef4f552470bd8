pub mod clustering;
pub mod processor;

pub use clustering::{ClusteringConfig, ClusteringPolicy, ClusteringStrategy};
pub use processor::ProcessorConfig;
