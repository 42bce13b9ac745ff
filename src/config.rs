//! Pipeline configuration.
//!
//! The core stages consume a fully resolved `Config`: TOML file, then
//! environment overrides, then CLI overrides (applied by the binary), then
//! `validate()`. Anything invalid is fatal before a stage runs.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub steps: StepsConfig,
    pub chunking: ChunkingConfig,
    pub merging: MergingConfig,
    pub validation: ValidationConfig,
}

/// Which pipeline stages run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StepsConfig {
    pub chunking: bool,
    pub merging: bool,
    pub validation: bool,
}

/// Configuration for the chunking stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Clips shorter than this are discarded.
    pub min_duration_ms: u64,
    pub output_subdir: String,
    pub metadata_file: String,
}

/// Configuration for the merging stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MergingConfig {
    /// Carry record 0 through verbatim instead of discarding it.
    pub keep_first_segment: bool,
    pub output_subdir: String,
    pub metadata_file: String,
}

/// Configuration for the validation stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ValidationConfig {
    pub host: String,
    pub primary_port: u16,
    pub secondary_port: u16,
    pub primary_model: String,
    pub secondary_model: String,
    /// Word-window size for boundary fingerprints.
    pub boundary_window: usize,
    /// Language hint passed to both transcription endpoints.
    pub language: String,
    pub max_workers: usize,
    /// Per-request timeout; a timed-out call counts as a failed call.
    pub timeout_secs: u64,
    pub output_metadata: String,
    pub flagged_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("data/input"),
            output_dir: PathBuf::from("data/output"),
            steps: StepsConfig::default(),
            chunking: ChunkingConfig::default(),
            merging: MergingConfig::default(),
            validation: ValidationConfig::default(),
        }
    }
}

impl Default for StepsConfig {
    fn default() -> Self {
        Self {
            chunking: true,
            merging: false,
            validation: true,
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            min_duration_ms: 500,
            output_subdir: "chunked".to_string(),
            metadata_file: "metadata_chunked.csv".to_string(),
        }
    }
}

impl Default for MergingConfig {
    fn default() -> Self {
        Self {
            keep_first_segment: true,
            output_subdir: "merged".to_string(),
            metadata_file: "metadata_merged.csv".to_string(),
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            primary_port: 8000,
            secondary_port: 8001,
            primary_model: "openai/whisper-large-v3".to_string(),
            secondary_model: "openai/whisper-large-v3-turbo".to_string(),
            boundary_window: 2,
            language: "fa".to_string(),
            max_workers: 8,
            timeout_secs: 60,
            output_metadata: "metadata_validated.csv".to_string(),
            flagged_file: "flagged_files.csv".to_string(),
        }
    }
}

impl ValidationConfig {
    /// Base URL of the primary endpoint, e.g. `http://localhost:8000/v1`.
    pub fn primary_base_url(&self) -> String {
        format!("http://{}:{}/v1", self.host, self.primary_port)
    }

    /// Base URL of the secondary endpoint.
    pub fn secondary_base_url(&self) -> String {
        format!("http://{}:{}/v1", self.host, self.secondary_port)
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// Missing fields fall back to defaults; invalid TOML is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            Error::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: Config = toml::from_str(&contents)
            .map_err(|e| Error::InvalidConfig(format!("cannot parse {}: {e}", path.display())))?;
        Ok(config)
    }

    /// Apply environment variable overrides.
    ///
    /// Supported variables:
    /// - `QUARRY_INPUT_DIR` → `input_dir`
    /// - `QUARRY_OUTPUT_DIR` → `output_dir`
    /// - `QUARRY_MAX_WORKERS` → `validation.max_workers`
    /// - `QUARRY_PRIMARY_PORT` → `validation.primary_port`
    /// - `QUARRY_SECONDARY_PORT` → `validation.secondary_port`
    ///
    /// Empty values are ignored; unparseable numeric values are fatal.
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Some(dir) = non_empty_env("QUARRY_INPUT_DIR") {
            self.input_dir = PathBuf::from(dir);
        }

        if let Some(dir) = non_empty_env("QUARRY_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }

        if let Some(raw) = non_empty_env("QUARRY_MAX_WORKERS") {
            self.validation.max_workers = parse_env("QUARRY_MAX_WORKERS", &raw)?;
        }

        if let Some(raw) = non_empty_env("QUARRY_PRIMARY_PORT") {
            self.validation.primary_port = parse_env("QUARRY_PRIMARY_PORT", &raw)?;
        }

        if let Some(raw) = non_empty_env("QUARRY_SECONDARY_PORT") {
            self.validation.secondary_port = parse_env("QUARRY_SECONDARY_PORT", &raw)?;
        }

        Ok(self)
    }

    /// Reject configurations no stage could run with.
    pub fn validate(&self) -> Result<()> {
        if self.input_dir.as_os_str().is_empty() {
            return Err(Error::InvalidConfig("input_dir must not be empty".into()));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(Error::InvalidConfig("output_dir must not be empty".into()));
        }
        if self.chunking.min_duration_ms == 0 {
            return Err(Error::InvalidConfig(
                "chunking.min_duration_ms must be at least 1".into(),
            ));
        }
        if self.validation.boundary_window == 0 {
            return Err(Error::InvalidConfig(
                "validation.boundary_window must be at least 1".into(),
            ));
        }
        if self.validation.max_workers == 0 {
            return Err(Error::InvalidConfig(
                "validation.max_workers must be at least 1".into(),
            ));
        }
        if self.validation.timeout_secs == 0 {
            return Err(Error::InvalidConfig(
                "validation.timeout_secs must be at least 1".into(),
            ));
        }
        if self.validation.primary_model.trim().is_empty()
            || self.validation.secondary_model.trim().is_empty()
        {
            return Err(Error::InvalidConfig(
                "validation model names must not be empty".into(),
            ));
        }
        Ok(())
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| Error::InvalidConfig(format!("{key} has invalid value '{raw}'")))
}
