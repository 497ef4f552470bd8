pub mod file;
pub mod subsystems;

use serde::{Serialize, Deserialize};
use std::path::Path;
use std::fs;
use crate::error::Result;
use log::{warn, trace};

pub trait FromIni {
    fn from_ini_section(&mut self, section_name: &str, key: &str, value: &str) -> Option<Result<()>>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterConfig {
    // File paths
    pub files: file::FileConfig,

    // Subsystem configs
    pub clustering: subsystems::ClusteringConfig,
    pub processor: subsystems::ProcessorConfig,
}

impl ClusterConfig {
    pub fn validate(&self) -> Result<()> {
        self.files.validate()?;
        self.clustering.validate()?;
        self.processor.validate()?;
        Ok(())
    }

    /// Load and validate an INI file.
    pub fn from_ini<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Self::read_ini(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Load an INI file without validating it, so command line overrides can
    /// still be applied before `validate` runs.
    pub fn read_ini<P: AsRef<Path>>(path: P) -> Result<Self> {
        let absolute_path = std::fs::canonicalize(&path)
            .unwrap_or_else(|_| path.as_ref().to_path_buf());

        trace!("Loading configuration from: {:?}", absolute_path);

        let content = fs::read_to_string(&path)?;
        Self::parse_ini(&content)
    }

    pub fn parse_ini(content: &str) -> Result<Self> {
        let mut config = Self::default();
        let mut current_section = String::new();

        for (line_num, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if line.starts_with('[') && line.ends_with(']') {
                current_section = line[1..line.len() - 1].trim().to_string();
                trace!("  Line {}: Found section: [{}]", line_num + 1, current_section);
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                let value = value.trim();

                // Delegate to appropriate subsystem config
                let handled = match current_section.as_str() {
                    "file" => config.files.from_ini_section(&current_section, key, value),
                    "clustering" => config.clustering.from_ini_section(&current_section, key, value),
                    "processor" => config.processor.from_ini_section(&current_section, key, value),
                    _ => None,
                };

                match handled {
                    Some(Err(e)) => return Err(e),
                    Some(Ok(())) => {}
                    None => warn!(
                        "Unrecognized config key: {}={} in section [{}]",
                        key, value, current_section
                    ),
                }
            } else {
                warn!("Ignoring malformed config line {}: {}", line_num + 1, line);
            }
        }

        Ok(config)
    }
}
