//! Run configuration loaded from YAML.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use opm_core::{Real, ScanType, UnsupportedGeometry};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Missing or malformed keys; the run aborts before touching any data.
    #[error("failed to parse config file {path}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Instrument constants that are not recorded in the raw files.
#[derive(Debug, Clone, Deserialize)]
pub struct HardcodedVars {
    /// Camera pixel pitch in the image plane, in microns.
    pub pix_x: Real,
    /// Scanning-mirror tilt in degrees.
    pub mirror_tilt: Real,
    /// Patch the known corrupted-frame pattern before appending views.
    #[serde(default)]
    pub fix_corrupt_even_planes: bool,
}

/// Per-dataset section of the run configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    /// Scan geometry name; parsed with [`DataConfig::parse_scan_type`].
    #[serde(rename = "type")]
    pub scan_type: String,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub hardcoded_vars: HardcodedVars,
}

impl DataConfig {
    /// Parse the configured scan type, failing before any file is touched.
    pub fn parse_scan_type(&self) -> Result<ScanType, UnsupportedGeometry> {
        self.scan_type.parse()
    }
}

/// Top-level run configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    pub data: DataConfig,
}

impl RunConfig {
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}
