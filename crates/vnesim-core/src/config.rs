//! TOML configuration parsing for vnesim.
//!
//! Defines the configuration schema for simulation runs: substrate and
//! request file locations, reporting cadence, and general simulation
//! parameters.

use crate::metrics::ReportInterval;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// Top-level simulation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    pub simulation: SimulationSection,
    pub substrate: SubstrateSection,
    pub requests: RequestsSection,
    #[serde(default)]
    pub report: ReportSection,
}

/// General simulation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationSection {
    /// Human-readable name for this simulation.
    #[serde(default = "default_sim_name")]
    pub name: String,
    /// Random seed for stochastic strategies.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_sim_name() -> String {
    "simulation".to_string()
}

fn default_seed() -> u64 {
    42
}

/// Substrate network source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubstrateSection {
    /// Path to the substrate network file.
    pub path: String,
}

/// Virtual network request source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestsSection {
    /// Directory containing `req<k>.txt` files.
    pub dir: String,
    /// Number of request files to load.
    pub count: u64,
}

/// Reporting configuration: snapshot cadence and output location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSection {
    /// Snapshot cadence value, in ticks or events depending on `by`.
    #[serde(default = "default_report_interval")]
    pub interval: u64,
    /// Cadence unit: "time" or "events".
    #[serde(default = "default_report_by")]
    pub by: String,
    /// Directory snapshot text files are written to.
    #[serde(default = "default_report_output")]
    pub output: String,
}

fn default_report_interval() -> u64 {
    1000
}
fn default_report_by() -> String {
    "time".to_string()
}
fn default_report_output() -> String {
    "results/".to_string()
}

impl Default for ReportSection {
    fn default() -> Self {
        Self {
            interval: default_report_interval(),
            by: default_report_by(),
            output: default_report_output(),
        }
    }
}

impl SimConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration consistency.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.requests.count == 0 {
            return Err(ConfigError::Validation(
                "requests.count must be > 0".to_string(),
            ));
        }
        if self.report.interval == 0 {
            return Err(ConfigError::Validation(
                "report.interval must be > 0".to_string(),
            ));
        }
        match self.report.by.as_str() {
            "time" | "events" => {}
            other => {
                return Err(ConfigError::Validation(format!(
                    "report.by must be \"time\" or \"events\", got \"{}\"",
                    other
                )));
            }
        }
        Ok(())
    }

    /// The configured snapshot cadence.
    pub fn report_interval(&self) -> ReportInterval {
        match self.report.by.as_str() {
            "events" => ReportInterval::Events(self.report.interval),
            _ => ReportInterval::Time(self.report.interval),
        }
    }
}
