use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use log::trace;

/// Counters shared by the workers of one policy run.
#[derive(Debug)]
pub struct RunMetrics {
    groups_clustered: AtomicU64,
    groups_failed: AtomicU64,
    clusters_found: AtomicU64,
    clusters_retained: AtomicU64,
    files_written: AtomicU64,
    start_time: Instant,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self {
            groups_clustered: AtomicU64::new(0),
            groups_failed: AtomicU64::new(0),
            clusters_found: AtomicU64::new(0),
            clusters_retained: AtomicU64::new(0),
            files_written: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_group(&self, found: usize, retained: usize) {
        self.groups_clustered.fetch_add(1, Ordering::Relaxed);
        self.clusters_found.fetch_add(found as u64, Ordering::Relaxed);
        self.clusters_retained.fetch_add(retained as u64, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.groups_failed.fetch_add(1, Ordering::Relaxed);
        trace!("Group failure recorded. Total failures: {}", self.groups_failed.load(Ordering::Relaxed));
    }

    pub fn record_file(&self) {
        self.files_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> RunMetricsStats {
        RunMetricsStats {
            groups_clustered: self.groups_clustered.load(Ordering::Relaxed) as usize,
            groups_failed: self.groups_failed.load(Ordering::Relaxed) as usize,
            clusters_found: self.clusters_found.load(Ordering::Relaxed) as usize,
            clusters_retained: self.clusters_retained.load(Ordering::Relaxed) as usize,
            files_written: self.files_written.load(Ordering::Relaxed) as usize,
            elapsed_seconds: self.start_time.elapsed().as_secs_f64(),
        }
    }
}

impl Default for RunMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RunMetricsStats {
    pub groups_clustered: usize,
    pub groups_failed: usize,
    pub clusters_found: usize,
    pub clusters_retained: usize,
    pub files_written: usize,
    pub elapsed_seconds: f64,
}

impl RunMetricsStats {
    pub fn retention_rate(&self) -> f64 {
        if self.clusters_found == 0 {
            return 0.0;
        }
        self.clusters_retained as f64 / self.clusters_found as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;

    #[test]
    fn counters_add_up_across_threads() {
        let metrics = RunMetrics::new();
        (0..100usize).into_par_iter().for_each(|i| {
            if i % 10 == 0 {
                metrics.record_failure();
            } else {
                metrics.record_group(2, 1);
            }
        });
        let stats = metrics.get_stats();
        assert_eq!(stats.groups_failed, 10);
        assert_eq!(stats.groups_clustered, 90);
        assert_eq!(stats.clusters_found, 180);
        assert!((stats.retention_rate() - 0.5).abs() < 1e-12);
    }
}
