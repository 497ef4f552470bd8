// src/storage/records.rs
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};
use crate::types::Record;

/// Columns every input table must carry.
pub const REQUIRED_COLUMNS: [&str; 6] = [
    "sample_id",
    "patient_id",
    "v_call",
    "j_call",
    "junction_aa",
    "consensus_count",
];

// Rows past this many get logged at debug level only
const MAX_ROW_WARNINGS: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReadStats {
    pub rows: usize,
    pub accepted: usize,
    pub skipped: usize,
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(default)]
    sample_id: Option<String>,
    #[serde(default)]
    patient_id: Option<String>,
    #[serde(default)]
    v_call: Option<String>,
    #[serde(default)]
    j_call: Option<String>,
    #[serde(default)]
    junction_aa: Option<String>,
    #[serde(default)]
    consensus_count: Option<String>,
}

fn required(field: Option<String>, name: &str) -> std::result::Result<String, String> {
    match field {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(format!("empty {}", name)),
    }
}

fn is_valid_junction(junction: &str) -> bool {
    junction.bytes().all(|b| b.is_ascii_alphabetic() || b == b'*')
}

impl RawRecord {
    fn into_record(self) -> std::result::Result<Record, String> {
        let junction_aa = required(self.junction_aa, "junction_aa")?.to_ascii_uppercase();
        if !is_valid_junction(&junction_aa) {
            return Err(format!("invalid junction_aa '{}'", junction_aa));
        }
        let count = required(self.consensus_count, "consensus_count")?;
        let consensus_count = count
            .parse::<u64>()
            .map_err(|_| format!("invalid consensus_count '{}'", count))?;

        Ok(Record {
            sample_id: self.sample_id.unwrap_or_default(),
            patient_id: required(self.patient_id, "patient_id")?,
            v_call: required(self.v_call, "v_call")?,
            j_call: required(self.j_call, "j_call")?,
            junction_aa,
            consensus_count,
        })
    }
}

fn delimiter_for(path: &Path) -> u8 {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => b'\t',
        _ => b',',
    }
}

/// Read the record table at `path`. Malformed rows are skipped and counted.
pub fn read_records<P: AsRef<Path>>(path: P) -> Result<(Vec<Record>, ReadStats)> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| Error::input(format!("cannot open {:?}: {}", path, e)))?;
    let (records, stats) = read_records_from(BufReader::new(file), delimiter_for(path))?;

    info!(
        "Read {} records from {:?} ({} rows, {} skipped)",
        stats.accepted, path, stats.rows, stats.skipped
    );
    Ok((records, stats))
}

pub fn read_records_from<R: Read>(reader: R, delimiter: u8) -> Result<(Vec<Record>, ReadStats)> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|col| !headers.iter().any(|h| h == *col))
        .collect();
    if !missing.is_empty() {
        return Err(Error::input(format!("missing columns: {}", missing.join(", "))));
    }

    let mut records = Vec::new();
    let mut stats = ReadStats::default();

    for (i, result) in csv_reader.deserialize::<RawRecord>().enumerate() {
        stats.rows += 1;
        // header is line 1
        let line = i + 2;
        let parsed = result
            .map_err(|e| e.to_string())
            .and_then(RawRecord::into_record);

        match parsed {
            Ok(record) => {
                records.push(record);
                stats.accepted += 1;
            }
            Err(reason) => {
                stats.skipped += 1;
                if stats.skipped <= MAX_ROW_WARNINGS {
                    warn!("Skipping row {}: {}", line, reason);
                } else {
                    debug!("Skipping row {}: {}", line, reason);
                }
            }
        }
    }

    if stats.skipped > MAX_ROW_WARNINGS {
        warn!("{} malformed rows skipped in total", stats.skipped);
    }
    Ok((records, stats))
}
