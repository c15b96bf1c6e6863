//! Locating individual view files for a well.

use std::path::{Path, PathBuf};

use regex::Regex;

use opm_core::WellId;

use crate::discovery::{list_file_names, DiscoveryError};

/// First file for the well at `time`/`tile`, at any angle.
///
/// Used to pull representative per-well metadata (channel names, z-step,
/// stack shape) from a single file.
///
/// # Errors
///
/// [`DiscoveryError::SampleNotFound`] if no file matches.
pub fn find_sample_file(
    dir: &Path,
    well: &WellId,
    time: u32,
    tile: u32,
) -> Result<PathBuf, DiscoveryError> {
    let pattern = view_pattern(well, time, tile, None);
    for name in list_file_names(dir)? {
        if pattern.is_match(&name) {
            return Ok(dir.join(name));
        }
    }
    Err(DiscoveryError::SampleNotFound {
        well: well.clone(),
        time,
        tile,
        dir: dir.display().to_string(),
    })
}

/// File for the exact `(time, tile, angle)` view, or `None` if the view was
/// never acquired.
///
/// Absence is not an error: sparse and long time-lapse acquisitions routinely
/// miss combinations, and callers skip the view.
pub fn find_specific_file(
    dir: &Path,
    well: &WellId,
    time: u32,
    tile: u32,
    angle: u32,
) -> Result<Option<PathBuf>, DiscoveryError> {
    let pattern = view_pattern(well, time, tile, Some(angle));
    for name in list_file_names(dir)? {
        if pattern.is_match(&name) {
            return Ok(Some(dir.join(name)));
        }
    }
    Ok(None)
}

fn view_pattern(well: &WellId, time: u32, tile: u32, angle: Option<u32>) -> Regex {
    let angle = match angle {
        Some(a) => a.to_string(),
        None => r"\d+".to_owned(),
    };
    Regex::new(&format!(
        r"^.*_Time{time:04}_Tile{tile:04}_angle{angle}_{{1,2}}Well{}.*\.\w+$",
        regex::escape(well.as_str())
    ))
    .expect("view filename pattern is valid")
}
