// src/storage/output.rs
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use log::{debug, trace};
use serde::Serialize;
use crate::cluster::summary::ClusterSummary;
use crate::error::Result;
use crate::types::{Cluster, Group};

pub const SUMMARY_FILE: &str = "summary.csv";
pub const REPORT_FILE: &str = "report.json";
pub const CLUSTERS_DIR: &str = "clusters";

/// Header written even when there are no rows.
const SUMMARY_HEADER: [&str; 6] = [
    "v_call",
    "j_call",
    "junction_aa",
    "consensus_count",
    "patient_count",
    "patient_id",
];

/// Percent-encode path separators, whitespace and `%` itself so a call or
/// junction can be used as part of a file name. Distinct inputs give distinct
/// outputs.
pub fn sanitize_component(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '/' || c == '\\' || c == '%' || c.is_whitespace() {
            let mut buf = [0u8; 4];
            for b in c.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("%{:02X}", b));
            }
        } else {
            out.push(c);
        }
    }
    out
}

pub fn cluster_file_stem(summary: &ClusterSummary) -> String {
    format!(
        "{}_{}_{}",
        sanitize_component(&summary.v_call),
        sanitize_component(&summary.j_call),
        sanitize_component(&summary.junction_aa)
    )
}

/// Writes one file per retained cluster under `{root}/{patient_count}/`.
#[derive(Debug, Clone)]
pub struct ClusterWriter {
    root: PathBuf,
}

impl ClusterWriter {
    pub fn new<P: AsRef<Path>>(policy_dir: P) -> Self {
        Self { root: policy_dir.as_ref().join(CLUSTERS_DIR) }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Remove clusters left by an earlier run of the same policy.
    pub fn reset(&self) -> Result<()> {
        if self.root.exists() {
            debug!("Clearing previous cluster files in {:?}", self.root);
            fs::remove_dir_all(&self.root)?;
        }
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    /// Write the member records of `cluster`. A name already taken gets a
    /// `_2`, `_3`, ... suffix. Returns the path written.
    pub fn write(&self, cluster: &Cluster, group: &Group, summary: &ClusterSummary) -> Result<PathBuf> {
        let dir = self.root.join(summary.patient_count.to_string());
        fs::create_dir_all(&dir)?;

        let (path, file) = create_unique(&dir, &cluster_file_stem(summary))?;
        let mut writer = csv::Writer::from_writer(BufWriter::new(file));
        for record in cluster.records(group) {
            writer.serialize(record)?;
        }
        writer.flush()?;

        trace!("Wrote {} records to {:?}", cluster.len(), path);
        Ok(path)
    }
}

fn create_unique(dir: &Path, stem: &str) -> io::Result<(PathBuf, File)> {
    let mut suffix = 1usize;
    loop {
        let name = if suffix == 1 {
            format!("{}.csv", stem)
        } else {
            format!("{}_{}.csv", stem, suffix)
        };
        let path = dir.join(name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => suffix += 1,
            Err(e) => return Err(e),
        }
    }
}

pub fn write_summary<P: AsRef<Path>>(path: P, rows: &[ClusterSummary]) -> Result<()> {
    let file = File::create(path.as_ref())?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(BufWriter::new(file));
    writer.write_record(SUMMARY_HEADER)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// A group excluded from the merge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedGroup {
    pub key: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunParameters {
    pub similarity_threshold: f64,
    pub patient_min: usize,
    pub max_group_size: usize,
    pub max_clique_steps: u64,
    pub substitution_matrix: Option<String>,
}

/// Contents of `report.json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub policy: String,
    pub strategy: String,
    pub records: usize,
    pub distinct_patients: usize,
    pub groups_considered: usize,
    pub groups_clustered: usize,
    pub groups_failed: Vec<FailedGroup>,
    pub clusters_found: usize,
    pub clusters_retained: usize,
    pub elapsed_seconds: f64,
    pub parameters: RunParameters,
}

pub fn write_report<P: AsRef<Path>>(path: P, report: &RunReport) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
