// src/config/subsystems/processor.rs

use serde::{Serialize, Deserialize};
use log::LevelFilter;
use crate::error::{Error, Result};
use crate::config::FromIni;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorConfig {
    // Worker pool size, 0 means one worker per logical CPU
    pub thread_count: usize,

    // Groups above this many records are not clustered
    pub max_group_size: usize,

    // Bron-Kerbosch expansion budget per group
    pub max_clique_steps: u64,

    // Skip a policy whose summary.csv is already present
    pub skip_existing: bool,

    pub show_progress: bool,
    pub log_level: String,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            thread_count: 0,
            max_group_size: 5000,
            max_clique_steps: 5_000_000,
            skip_existing: false,
            show_progress: true,
            log_level: "info".to_string(),
        }
    }
}

impl FromIni for ProcessorConfig {
    fn from_ini_section(&mut self, _section_name: &str, key: &str, value: &str) -> Option<Result<()>> {
        match key {
            "thread_count" => {
                match value.parse() {
                    Ok(count) => {
                        self.thread_count = count;
                        Some(Ok(()))
                    },
                    Err(_) => Some(Err(Error::Config(
                        format!("Invalid thread_count: {}", value)
                    ))),
                }
            },
            "max_group_size" => {
                match value.parse() {
                    Ok(size) if size >= 2 => {
                        self.max_group_size = size;
                        Some(Ok(()))
                    },
                    _ => Some(Err(Error::Config(
                        format!("Invalid max_group_size (must be >= 2): {}", value)
                    ))),
                }
            },
            "max_clique_steps" => {
                match value.replace('_', "").parse() {
                    Ok(steps) if steps > 0 => {
                        self.max_clique_steps = steps;
                        Some(Ok(()))
                    },
                    _ => Some(Err(Error::Config(
                        format!("Invalid max_clique_steps (must be > 0): {}", value)
                    ))),
                }
            },
            "skip_existing" => {
                match value.parse::<bool>() {
                    Ok(val) => {
                        self.skip_existing = val;
                        Some(Ok(()))
                    },
                    Err(_) => Some(Err(Error::Config(
                        format!("Invalid skip_existing (must be true or false): {}", value)
                    ))),
                }
            },
            "show_progress" => {
                match value.parse::<bool>() {
                    Ok(val) => {
                        self.show_progress = val;
                        Some(Ok(()))
                    },
                    Err(_) => Some(Err(Error::Config(
                        format!("Invalid show_progress (must be true or false): {}", value)
                    ))),
                }
            },
            "log_level" => {
                self.log_level = value.trim_matches('"').to_string();
                Some(Ok(()))
            },
            _ => None,
        }
    }
}

impl ProcessorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_group_size < 2 {
            return Err(Error::config("max_group_size must be at least 2"));
        }
        if self.max_clique_steps == 0 {
            return Err(Error::config("max_clique_steps must be greater than 0"));
        }
        Ok(())
    }

    pub fn get_log_level(&self) -> LevelFilter {
        match self.log_level.trim().to_lowercase().as_str() {
            "error" => LevelFilter::Error,
            "warn" => LevelFilter::Warn,
            "info" => LevelFilter::Info,
            "debug" => LevelFilter::Debug,
            "trace" => LevelFilter::Trace,
            "none" => LevelFilter::Off,
            _ => LevelFilter::Info, // Default to Info if invalid
        }
    }

    /// Number of workers the pool should run with.
    pub fn get_thread_count(&self) -> usize {
        if self.thread_count == 0 {
            num_cpus::get()
        } else {
            self.thread_count
        }
    }
}
