//! Engine configuration: where flows come from, which detector runs, where
//! results go. Command-line flags override individual fields.

use crate::detectors::DetectorConfig;
use crate::error::Result;
use crate::ingest::{InputFormat, MalformedPolicy};
use crate::record::fields;
use crate::sink::OutputFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Flow or packet input
    pub input: InputConfig,
    /// Detector composition and its parameters
    pub detector: DetectorConfig,
    /// Result sink
    pub output: OutputConfig,
    /// Logging
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Input file; stdin when unset
    pub path: Option<PathBuf>,
    pub format: InputFormat,
    /// Epoch column name for stamped flow input
    pub epoch_field: String,
    pub on_malformed: MalformedPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    /// Output file; stdout when unset
    pub path: Option<PathBuf>,
    /// Print flush contexts and a `[reset]` marker (dump and JSON formats)
    pub show_reset: bool,
    /// Write a header row (CSV format)
    pub header: bool,
    /// Constant `(name, value)` column prepended to every CSV row
    pub static_field: Option<(String, String)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: None,
            format: InputFormat::default(),
            epoch_field: fields::EPOCH.to_string(),
            on_malformed: MalformedPolicy::default(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            path: None,
            show_reset: false,
            header: true,
            static_field: None,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl EngineConfig {
    /// Load from JSON file if present; otherwise return default.
    /// A file that exists but does not parse is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }
}
