// src/config/file.rs

use serde::{Serialize, Deserialize};
use std::path::PathBuf;
use crate::error::{Error, Result};
use super::FromIni;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    /// Cleaned record table (CSV, or TSV by extension).
    pub input: Option<PathBuf>,
    pub output_dir: PathBuf,
    /// Falls back to the built-in BLOSUM62 when unset.
    pub substitution_matrix: Option<PathBuf>,
    pub log_dir: PathBuf,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            input: None,
            output_dir: PathBuf::from("results"),
            substitution_matrix: None,
            log_dir: PathBuf::from("logs"),
        }
    }
}

fn optional_path(value: &str) -> Option<PathBuf> {
    let cleaned = value.trim_matches('"');
    if cleaned.is_empty() {
        None
    } else {
        Some(PathBuf::from(cleaned))
    }
}

impl FromIni for FileConfig {
    fn from_ini_section(&mut self, _section_name: &str, key: &str, value: &str) -> Option<Result<()>> {
        match key {
            "input" => {
                self.input = optional_path(value);
                Some(Ok(()))
            },
            "output_dir" => {
                self.output_dir = PathBuf::from(value.trim_matches('"'));
                Some(Ok(()))
            },
            "substitution_matrix" => {
                self.substitution_matrix = optional_path(value);
                Some(Ok(()))
            },
            "log_dir" => {
                self.log_dir = PathBuf::from(value.trim_matches('"'));
                Some(Ok(()))
            },
            _ => None,
        }
    }
}

impl FileConfig {
    pub fn validate(&self) -> Result<()> {
        match &self.input {
            None => return Err(Error::config("No input table configured")),
            Some(input) if !input.is_file() => {
                return Err(Error::Config(
                    format!("Input table does not exist: {:?}", input)
                ));
            },
            _ => {}
        }
        if let Some(matrix) = &self.substitution_matrix {
            if !matrix.is_file() {
                return Err(Error::Config(
                    format!("Substitution matrix does not exist: {:?}", matrix)
                ));
            }
        }

        // Create output directories if they don't exist (instead of checking)
        std::fs::create_dir_all(&self.output_dir)?;

        Ok(())
    }
}
