use std::path::PathBuf;
use std::time::Instant;
use clap::Parser;
use log::{error, info};
use cdr3_cluster::config::subsystems::clustering::parse_policies;
use cdr3_cluster::config::subsystems::ClusteringStrategy;
use cdr3_cluster::utils::{format_duration, init_logging};
use cdr3_cluster::{ClusterConfig, Error};

/// Cluster CDR3 junction sequences shared across patients.
#[derive(Debug, Parser)]
#[command(name = "cluster_junctions", version)]
struct Cli {
    /// INI configuration file; built-in defaults are used when omitted
    config: Option<PathBuf>,

    /// Cleaned record table (CSV, or TSV by extension)
    #[arg(short, long)]
    input: Option<PathBuf>,

    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// exact, similar, convergence or all; repeat or comma-separate
    #[arg(short, long = "policy")]
    policies: Vec<String>,

    /// Positional identity threshold in (0, 1]
    #[arg(short, long)]
    similarity: Option<f64>,

    /// Minimum number of distinct patients per cluster
    #[arg(long)]
    patient_min: Option<usize>,

    /// Substitution matrix for convergence clustering (default: BLOSUM62)
    #[arg(short, long)]
    matrix: Option<PathBuf>,

    /// clique (default) or streaming
    #[arg(long)]
    strategy: Option<String>,

    /// Worker threads, 0 for one per CPU
    #[arg(short, long)]
    threads: Option<usize>,

    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Keep policies whose summary.csv already exists
    #[arg(long, conflicts_with = "force")]
    skip_existing: bool,

    /// Recompute every policy even when skip_existing is configured
    #[arg(long)]
    force: bool,
}

impl Cli {
    fn apply(&self, config: &mut ClusterConfig) -> Result<(), Error> {
        if let Some(input) = &self.input {
            config.files.input = Some(input.clone());
        }
        if let Some(output_dir) = &self.output_dir {
            config.files.output_dir = output_dir.clone();
        }
        if let Some(matrix) = &self.matrix {
            config.files.substitution_matrix = Some(matrix.clone());
        }
        if let Some(log_dir) = &self.log_dir {
            config.files.log_dir = log_dir.clone();
        }
        if !self.policies.is_empty() {
            config.clustering.policies = parse_policies(&self.policies.join(","))?;
        }
        if let Some(similarity) = self.similarity {
            config.clustering.similarity_threshold = similarity;
        }
        if let Some(patient_min) = self.patient_min {
            config.clustering.patient_min = patient_min;
        }
        if let Some(strategy) = &self.strategy {
            config.clustering.strategy = ClusteringStrategy::from_str(strategy)
                .ok_or_else(|| Error::config(format!("Invalid clustering strategy: {}", strategy)))?;
        }
        if let Some(threads) = self.threads {
            config.processor.thread_count = threads;
        }
        if self.skip_existing {
            config.processor.skip_existing = true;
        }
        if self.force {
            config.processor.skip_existing = false;
        }
        Ok(())
    }
}

fn load_config(cli: &Cli) -> Result<ClusterConfig, Error> {
    let mut config = match &cli.config {
        Some(path) => ClusterConfig::read_ini(path)?,
        None => ClusterConfig::default(),
    };
    cli.apply(&mut config)?;
    config.validate()?;
    Ok(config)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("Configuration error: {}", error);
            eprintln!("Use --help to see available options.");
            return Err(error.into());
        }
    };

    let log_level = config.processor.get_log_level();
    if let Some(log_path) = init_logging(&config.files.log_dir, log_level)? {
        info!("Logging to {:?} with level {:?}", log_path, log_level);
    }

    info!("Input: {:?}", config.files.input);
    info!("Output directory: {:?}", config.files.output_dir);
    info!(
        "Policies: {}",
        config.clustering.policies.iter().map(|p| p.as_str()).collect::<Vec<_>>().join(", ")
    );
    info!(
        "Similarity threshold: {}, patient_min: {}, strategy: {}",
        config.clustering.similarity_threshold,
        config.clustering.patient_min,
        config.clustering.strategy.as_str()
    );
    info!("Worker threads: {}", config.processor.get_thread_count());

    let runs = match cdr3_cluster::run(&config) {
        Ok(runs) => runs,
        Err(e) => {
            error!("Clustering failed: {}", e);
            return Err(e.into());
        }
    };

    for run in &runs {
        match &run.report {
            Some(report) => info!(
                "{}: {} clusters retained, {} groups failed -> {:?}",
                report.policy, report.clusters_retained, report.groups_failed.len(), run.output_dir
            ),
            None => info!("{}: skipped, existing results kept in {:?}", run.policy.as_str(), run.output_dir),
        }
    }

    info!("Total running time: {}", format_duration(start_time.elapsed()));
    Ok(())
}
