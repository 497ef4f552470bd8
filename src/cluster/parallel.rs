// src/cluster/parallel.rs
//
// Drives one or more clustering policies over a loaded record set. Groups are
// independent, so each rayon worker takes one group end to end and returns
// its summaries; nothing is shared between workers except the atomic run
// counters. A group that errors or panics is reported and left out of the
// merge while the others carry on.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use ahash::AHashSet;
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use rayon::prelude::*;
use crate::config::ClusterConfig;
use crate::config::subsystems::{ClusteringConfig, ClusteringPolicy, ClusteringStrategy, ProcessorConfig};
use crate::error::{Error, Result};
use crate::similarity::{build_predicate, SimilarityPredicate, SubstitutionMatrix};
use crate::storage::output::{
    write_report, write_summary, ClusterWriter, FailedGroup, RunParameters, RunReport,
    REPORT_FILE, SUMMARY_FILE,
};
use crate::types::{Cluster, Group, Record};
use crate::utils::format_duration;
use super::clique::MaximalCliqueCover;
use super::filter::ClusterFilter;
use super::graph::SimilarityGraphBuilder;
use super::metrics::RunMetrics;
use super::partition::GroupPartitioner;
use super::streaming::StreamingClusterer;
use super::summary::{ClusterSummary, SummaryAggregator};

const BUILTIN_MATRIX_NAME: &str = "BLOSUM62 (built-in)";

/// Result of one policy over the record set.
#[derive(Debug, Clone)]
pub struct PolicyRun {
    pub policy: ClusteringPolicy,
    pub output_dir: PathBuf,
    /// Set when an existing summary was kept and nothing was recomputed.
    pub skipped: bool,
    pub report: Option<RunReport>,
    pub summary: Vec<ClusterSummary>,
}

/// Per-group results after the parallel stage, before ranking.
#[derive(Debug, Default)]
pub struct GroupOutcomes {
    pub summaries: Vec<ClusterSummary>,
    pub failed: Vec<FailedGroup>,
}

pub struct ClusteringOrchestrator {
    clustering: ClusteringConfig,
    processor: ProcessorConfig,
    output_dir: PathBuf,
    matrix: Option<Arc<SubstitutionMatrix>>,
    matrix_source: Option<String>,
    thread_pool: rayon::ThreadPool,
}

impl ClusteringOrchestrator {
    /// Build the worker pool and load the substitution matrix once, when a
    /// configured policy needs it.
    pub fn new(config: &ClusterConfig) -> Result<Self> {
        let needs_matrix = config.clustering.policies.contains(&ClusteringPolicy::Convergence);
        let (matrix, matrix_source) = if needs_matrix {
            match &config.files.substitution_matrix {
                Some(path) => (
                    Some(Arc::new(SubstitutionMatrix::from_path(path)?)),
                    Some(path.display().to_string()),
                ),
                None => {
                    info!("Using the built-in BLOSUM62 substitution matrix");
                    (Some(Arc::new(SubstitutionMatrix::blosum62()?)), Some(BUILTIN_MATRIX_NAME.to_string()))
                }
            }
        } else {
            (None, None)
        };

        let thread_count = config.processor.get_thread_count();
        let thread_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(thread_count)
            .thread_name(|idx| format!("cluster-worker-{}", idx))
            .build()?;
        debug!("Created clustering pool with {} threads", thread_count);

        Ok(Self {
            clustering: config.clustering.clone(),
            processor: config.processor.clone(),
            output_dir: config.files.output_dir.clone(),
            matrix,
            matrix_source,
            thread_pool,
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn policy_dir(&self, policy: ClusteringPolicy) -> PathBuf {
        self.output_dir.join(policy.output_dir_name())
    }

    /// Run every configured policy, in configuration order.
    pub fn run(&self, records: &[Record]) -> Result<Vec<PolicyRun>> {
        let patients = distinct_patients(records);
        info!("{} records from {} distinct patients", records.len(), patients);
        if records.is_empty() {
            warn!("Input holds no usable records");
        }

        self.clustering
            .policies
            .iter()
            .map(|&policy| self.run_policy(policy, records))
            .collect()
    }

    pub fn run_policy(&self, policy: ClusteringPolicy, records: &[Record]) -> Result<PolicyRun> {
        let start_time = Instant::now();
        let policy_dir = self.policy_dir(policy);
        let summary_path = policy_dir.join(SUMMARY_FILE);

        if self.processor.skip_existing && summary_path.exists() {
            info!("Skipping {} clustering: {:?} already exists", policy.as_str(), summary_path);
            return Ok(PolicyRun {
                policy,
                output_dir: policy_dir,
                skipped: true,
                report: None,
                summary: Vec::new(),
            });
        }

        let strategy = if policy.needs_graph() {
            self.clustering.strategy
        } else {
            ClusteringStrategy::Clique
        };
        info!(
            "Starting {} clustering (strategy: {}, threshold: {}, patient_min: {})",
            policy.as_str(), strategy.as_str(), self.clustering.similarity_threshold, self.clustering.patient_min
        );

        std::fs::create_dir_all(&policy_dir)?;
        let writer = ClusterWriter::new(&policy_dir);
        writer.reset()?;

        let predicate = build_predicate(policy, self.clustering.similarity_threshold, self.matrix.as_ref())?;
        let partitioner = GroupPartitioner::new(policy, self.clustering.patient_min);
        let (groups, partition_stats) = partitioner.partition_with_stats(records);
        info!(
            "{} of {} groups entering the clustering stage ({} singletons, {} below patient_min)",
            partition_stats.retained_groups,
            partition_stats.total_groups,
            partition_stats.singleton_groups,
            partition_stats.below_patient_min
        );

        let metrics = RunMetrics::new();
        let outcomes = self.cluster_groups(policy, &groups, predicate.as_ref(), &writer, &metrics);

        let mut aggregator = SummaryAggregator::new();
        aggregator.extend(outcomes.summaries);
        let summary = aggregator.finish();
        write_summary(&summary_path, &summary)?;

        let stats = metrics.get_stats();
        if summary.is_empty() {
            info!("There is no {} cluster", policy.as_str());
        } else {
            info!(
                "{} clustering kept {} of {} clusters ({} files written)",
                policy.as_str(), stats.clusters_retained, stats.clusters_found, stats.files_written
            );
        }
        if !outcomes.failed.is_empty() {
            warn!("{} groups failed and were left out of the summary", outcomes.failed.len());
        }

        let report = RunReport {
            policy: policy.as_str().to_string(),
            strategy: strategy.as_str().to_string(),
            records: records.len(),
            distinct_patients: distinct_patients(records),
            groups_considered: partition_stats.retained_groups,
            groups_clustered: stats.groups_clustered,
            groups_failed: outcomes.failed,
            clusters_found: stats.clusters_found,
            clusters_retained: stats.clusters_retained,
            elapsed_seconds: start_time.elapsed().as_secs_f64(),
            parameters: self.parameters(policy),
        };
        write_report(policy_dir.join(REPORT_FILE), &report)?;

        info!(
            "Finished {} clustering in {}",
            policy.as_str(), format_duration(start_time.elapsed())
        );
        Ok(PolicyRun {
            policy,
            output_dir: policy_dir,
            skipped: false,
            report: Some(report),
            summary,
        })
    }

    /// Process every group on the pool. Failures are collected, never
    /// propagated.
    pub fn cluster_groups(
        &self,
        policy: ClusteringPolicy,
        groups: &[Group],
        predicate: &dyn SimilarityPredicate,
        writer: &ClusterWriter,
        metrics: &RunMetrics,
    ) -> GroupOutcomes {
        let progress = self.progress_bar(groups.len(), policy);

        let results: Vec<(String, Result<Vec<ClusterSummary>>)> = self.thread_pool.install(|| {
            groups
                .par_iter()
                .progress_with(progress.clone())
                .map(|group| {
                    let result = panic::catch_unwind(AssertUnwindSafe(|| {
                        self.process_group(policy, group, predicate, writer, metrics)
                    }))
                    .unwrap_or_else(|payload| Err(Error::group(panic_message(payload))));
                    (group.key.to_string(), result)
                })
                .collect()
        });
        progress.finish_and_clear();

        let mut outcomes = GroupOutcomes::default();
        for (key, result) in results {
            match result {
                Ok(summaries) => outcomes.summaries.extend(summaries),
                Err(e) => {
                    error!("Group {} failed: {}", key, e);
                    metrics.record_failure();
                    outcomes.failed.push(FailedGroup { key, reason: e.to_string() });
                }
            }
        }
        outcomes.failed.sort_by(|a, b| a.key.cmp(&b.key));
        outcomes
    }

    /// Clusters of one group: graph or stream, then filter, summarise and
    /// write.
    fn process_group(
        &self,
        policy: ClusteringPolicy,
        group: &Group,
        predicate: &dyn SimilarityPredicate,
        writer: &ClusterWriter,
        metrics: &RunMetrics,
    ) -> Result<Vec<ClusterSummary>> {
        let clusters = self.find_clusters(policy, group, predicate)?;
        let found = clusters.len();

        let retained = ClusterFilter::new(self.clustering.patient_min).apply(clusters, group);
        let mut summaries = Vec::with_capacity(retained.len());
        for cluster in &retained {
            let summary = ClusterSummary::summarize(cluster, group)
                .ok_or_else(|| Error::group(format!("empty cluster in group {}", group.key)))?;
            writer.write(cluster, group, &summary)?;
            metrics.record_file();
            summaries.push(summary);
        }

        metrics.record_group(found, retained.len());
        Ok(summaries)
    }

    pub fn find_clusters(
        &self,
        policy: ClusteringPolicy,
        group: &Group,
        predicate: &dyn SimilarityPredicate,
    ) -> Result<Vec<Cluster>> {
        if !policy.needs_graph() {
            // the group key already is the full junction
            return Ok(vec![Cluster::new((0..group.len()).collect())]);
        }

        if group.len() > self.processor.max_group_size {
            return Err(Error::GroupTooLarge {
                key: group.key.to_string(),
                size: group.len(),
                limit: self.processor.max_group_size,
            });
        }

        match self.clustering.strategy {
            ClusteringStrategy::Clique => {
                let graph = SimilarityGraphBuilder::new(predicate).build(group);
                MaximalCliqueCover::new(self.processor.max_clique_steps).cover(graph, &group.key)
            }
            ClusteringStrategy::Streaming => Ok(StreamingClusterer::new(predicate).cluster(group)),
        }
    }

    fn parameters(&self, policy: ClusteringPolicy) -> RunParameters {
        RunParameters {
            similarity_threshold: self.clustering.similarity_threshold,
            patient_min: self.clustering.patient_min,
            max_group_size: self.processor.max_group_size,
            max_clique_steps: self.processor.max_clique_steps,
            substitution_matrix: match policy {
                ClusteringPolicy::Convergence => self.matrix_source.clone(),
                _ => None,
            },
        }
    }

    fn progress_bar(&self, len: usize, policy: ClusteringPolicy) -> ProgressBar {
        if !self.processor.show_progress {
            return ProgressBar::hidden();
        }
        let progress = ProgressBar::new(len as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix}: [{bar:40.cyan/blue}] {pos}/{len} groups ({eta})")
        {
            progress.set_style(style.progress_chars("#>-"));
        }
        progress.set_prefix(policy.as_str());
        progress
    }
}

fn distinct_patients(records: &[Record]) -> usize {
    records
        .iter()
        .map(|r| r.patient_id.as_str())
        .collect::<AHashSet<_>>()
        .len()
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", msg)
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("panicked: {}", msg)
    } else {
        "panicked".to_string()
    }
}
