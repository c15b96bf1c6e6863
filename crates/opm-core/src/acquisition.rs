//! Acquisition-grid value types shared by discovery, geometry, and assembly.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::math::Real;

/// Well identifier on the plate, e.g. `B2`: one uppercase letter followed by
/// digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WellId(String);

#[derive(Debug, Error)]
#[error("invalid well id '{0}': expected an uppercase letter followed by digits, e.g. B2")]
pub struct InvalidWellId(String);

impl WellId {
    pub fn new(id: impl Into<String>) -> Result<Self, InvalidWellId> {
        let id = id.into();
        let bytes = id.as_bytes();
        let valid = bytes.len() >= 2
            && bytes[0].is_ascii_uppercase()
            && bytes[1..].iter().all(u8::is_ascii_digit);
        if valid {
            Ok(Self(id))
        } else {
            Err(InvalidWellId(id))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for WellId {
    type Err = InvalidWellId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Distinct acquisition values discovered for one well, sorted ascending.
///
/// Immutable once built: the directory scan is the single source of truth for
/// dataset shape, and nothing downstream re-derives it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionSet {
    times: Vec<u32>,
    tiles: Vec<u32>,
    angles: Vec<u32>,
}

impl DimensionSet {
    pub fn new(mut times: Vec<u32>, mut tiles: Vec<u32>, mut angles: Vec<u32>) -> Self {
        for axis in [&mut times, &mut tiles, &mut angles] {
            axis.sort_unstable();
            axis.dedup();
        }
        Self { times, tiles, angles }
    }

    pub fn times(&self) -> &[u32] {
        &self.times
    }

    pub fn tiles(&self) -> &[u32] {
        &self.tiles
    }

    pub fn angles(&self) -> &[u32] {
        &self.angles
    }
}

/// Index key of one 3-D stack within an assembled dataset.
///
/// Indices run over the enumerated axes of a [`DimensionSet`] plus the
/// channel list, not over the raw filename values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewKey {
    pub time: usize,
    pub tile: usize,
    pub angle: usize,
    pub channel: usize,
}

/// Voxel extents of one raw stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackDimensions {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

/// Per-well metadata pulled once from a representative raw file.
///
/// Channel count and names are trusted from this single sample and assumed
/// uniform across the well's tiles and timepoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleMetadata {
    pub width_px: usize,
    pub height_px: usize,
    pub sequence_count: usize,
    pub z_step_um: Real,
    pub channel_names: Vec<String>,
}

impl SampleMetadata {
    pub fn stack_dimensions(&self) -> StackDimensions {
        StackDimensions {
            x: self.width_px,
            y: self.height_px,
            z: self.sequence_count,
        }
    }
}

/// Physical acquisition geometry; each variant carries its own deskew math.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanType {
    StageScanning,
    RemoteScanning,
}

/// Scan type outside the two known modes. Raised when configuration is
/// parsed, before any file is touched.
#[derive(Debug, Error)]
#[error("unsupported scan type '{0}': expected 'stage_scanning' or 'remote_scanning'")]
pub struct UnsupportedGeometry(pub String);

impl FromStr for ScanType {
    type Err = UnsupportedGeometry;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stage_scanning" => Ok(Self::StageScanning),
            "remote_scanning" => Ok(Self::RemoteScanning),
            other => Err(UnsupportedGeometry(other.to_owned())),
        }
    }
}

impl fmt::Display for ScanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StageScanning => f.write_str("stage_scanning"),
            Self::RemoteScanning => f.write_str("remote_scanning"),
        }
    }
}

/// Immutable per-well scan geometry.
///
/// `z_step_um` comes from the well's sample file; the remaining fields from
/// instrument configuration. Built once per well and passed by value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScanGeometry {
    pub scan_type: ScanType,
    pub mirror_tilt_deg: Real,
    pub pix_x: Real,
    pub z_step_um: Real,
}
