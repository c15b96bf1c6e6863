//! Directory scans that derive dataset shape from filenames.
//!
//! Acquisition files follow
//! `<prefix>_Time<tttt>_Tile<tttt>_angle<a>_Well<id><suffix>.<ext>`, with one
//! or two underscores before `Well`. Times and tiles are four digits, the
//! angle is any integer; values are compared numerically, never lexically.
//! The scan is the single source of truth for dataset shape.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::Path;

use log::{debug, warn};
use regex::Regex;
use thiserror::Error;

use opm_core::{DimensionSet, WellId};

#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// No filename in the directory matched the grammar for the well.
    #[error("no acquisition files found for well '{well}' in {dir}")]
    NoFilesForWell { well: WellId, dir: String },

    /// No file for the requested well/time/tile at any angle.
    #[error("no sample file for well '{well}' at time {time}, tile {tile} in {dir}")]
    SampleNotFound { well: WellId, time: u32, tile: u32, dir: String },

    #[error("failed to scan directory {dir}")]
    Scan {
        dir: String,
        #[source]
        source: io::Error,
    },
}

/// Filename pattern for one well, capturing time, tile, and angle.
fn well_file_pattern(well: &WellId) -> Regex {
    Regex::new(&format!(
        r"^.*_Time(\d{{4}})_Tile(\d{{4}})_angle(\d+)_{{1,2}}Well{}.*\.\w+$",
        regex::escape(well.as_str())
    ))
    .expect("well filename pattern is valid")
}

/// Sorted names of the directory's entries.
pub(crate) fn list_file_names(dir: &Path) -> Result<Vec<String>, DiscoveryError> {
    let scan_err = |source| DiscoveryError::Scan { dir: dir.display().to_string(), source };
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(scan_err)? {
        let entry = entry.map_err(scan_err)?;
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_owned());
        }
    }
    names.sort_unstable();
    Ok(names)
}

/// Scan `dir` for the well's acquisition files and collect the distinct
/// times, tiles, and angles present.
///
/// # Errors
///
/// [`DiscoveryError::NoFilesForWell`] if nothing matches the grammar.
pub fn discover_dimensions(dir: &Path, well: &WellId) -> Result<DimensionSet, DiscoveryError> {
    let pattern = well_file_pattern(well);
    let mut times = Vec::new();
    let mut tiles = Vec::new();
    let mut angles = Vec::new();

    for name in list_file_names(dir)? {
        let Some(caps) = pattern.captures(&name) else {
            continue;
        };
        // Captures are digit-only; parse can only fail on overflow.
        let (Ok(time), Ok(tile), Ok(angle)) =
            (caps[1].parse(), caps[2].parse(), caps[3].parse())
        else {
            continue;
        };
        times.push(time);
        tiles.push(tile);
        angles.push(angle);
    }

    if times.is_empty() {
        return Err(DiscoveryError::NoFilesForWell {
            well: well.clone(),
            dir: dir.display().to_string(),
        });
    }

    let dims = DimensionSet::new(times, tiles, angles);
    debug!(
        "well {well}: discovered {} times, {} tiles, {} angles",
        dims.times().len(),
        dims.tiles().len(),
        dims.angles().len()
    );
    Ok(dims)
}

/// Scan `dir` for the `Well<id>` token across all files, irrespective of the
/// other axes, and return the sorted distinct well ids.
///
/// Finding no wells is not an error; it is logged as a warning and yields an
/// empty list.
pub fn discover_wells(dir: &Path) -> Result<Vec<WellId>, DiscoveryError> {
    let pattern = Regex::new(r"_{1,2}Well([A-Z]\d+)").expect("well token pattern is valid");
    let mut wells = BTreeSet::new();

    for name in list_file_names(dir)? {
        if let Some(caps) = pattern.captures(&name) {
            // The capture matches the well grammar by construction.
            if let Ok(well) = WellId::new(&caps[1]) {
                wells.insert(well);
            }
        }
    }

    if wells.is_empty() {
        warn!("no wells discovered in {}", dir.display());
    }
    Ok(wells.into_iter().collect())
}
