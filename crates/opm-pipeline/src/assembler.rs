//! Top-level orchestration: one output container per well per pass.
//!
//! The assembler is single-threaded and synchronous; distributed runs
//! partition work per well (or per well/tile range) before it starts, so no
//! two processes ever write the same container. There is no rollback: a
//! failure mid-grid abandons the writer, which releases the file on drop,
//! and the partial artifact is invalid until a re-run completes.

use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use log::{debug, info};

use opm_core::{
    calibration_z, deskew_transforms, patch_corrupt_planes, Affine, DimensionSet, Real,
    SampleMetadata, ScanGeometry, ScanType, UnsupportedGeometry, ViewKey, WellId, NUM_ANGLES,
};

use crate::config::DataConfig;
use crate::discovery::discover_dimensions;
use crate::io::{RegisteredVolume, StackSource, ViewPayload, VolumeLayout, VolumeWriter, VolumeWriterFactory};
use crate::locate::{find_sample_file, find_specific_file};
use crate::registration::read_registered_transforms;

/// Output container block size.
const BLOCK_SIZE: [usize; 3] = [64, 64, 64];
/// Exposure metadata recorded with every view.
const EXPOSURE_MS: Real = 10.0;
const VOXEL_UNITS: &str = "um";
const EXPOSURE_UNITS: &str = "ms";

/// Drives assembly of output containers, one per well per pass.
///
/// Holds the immutable run parameters plus the reader and writer-factory
/// collaborators; no mutable global state is consulted.
pub struct DatasetAssembler<R, F> {
    input_dir: PathBuf,
    output_dir: PathBuf,
    scan_type: ScanType,
    mirror_tilt_deg: Real,
    pix_x: Real,
    fix_corrupt_even_planes: bool,
    source: R,
    factory: F,
}

/// Everything read once per well before the grid is traversed.
struct WellPrep {
    dims: DimensionSet,
    metadata: SampleMetadata,
    geometry: ScanGeometry,
    calibration_z: Real,
}

impl<R: StackSource, F: VolumeWriterFactory> DatasetAssembler<R, F> {
    /// Build an assembler from the data section of the run configuration.
    ///
    /// # Errors
    ///
    /// [`UnsupportedGeometry`] if the configured scan type is not one of the
    /// two known modes. No I/O has happened at that point.
    pub fn from_config(config: &DataConfig, source: R, factory: F) -> Result<Self, UnsupportedGeometry> {
        let scan_type = config.parse_scan_type()?;
        Ok(Self {
            input_dir: config.input_path.clone(),
            output_dir: config.output_path.clone(),
            scan_type,
            mirror_tilt_deg: config.hardcoded_vars.mirror_tilt,
            pix_x: config.hardcoded_vars.pix_x,
            fix_corrupt_even_planes: config.hardcoded_vars.fix_corrupt_even_planes,
            source,
            factory,
        })
    }

    /// Assemble the well with the per-angle deskew transforms.
    ///
    /// Returns the path of the written container.
    pub fn assemble_well(&mut self, well: &WellId) -> Result<PathBuf> {
        let prep = self.prepare_well(well)?;
        ensure!(
            prep.dims.angles().len() == NUM_ANGLES,
            "well {well}: deskew is defined for {NUM_ANGLES} angles, found {}",
            prep.dims.angles().len()
        );
        let affines = deskew_transforms(&prep.geometry, &prep.metadata.stack_dimensions());

        let output = self.output_dir.join(format!("dataset_Well{well}.xml"));
        self.write_container(well, &prep, &output, |key| Ok(affines[key.angle]))?;
        Ok(output)
    }

    /// Assemble the well with per-view transforms recovered from a
    /// previously registered container.
    ///
    /// Returns the path of the written container.
    pub fn assemble_well_registered<V: RegisteredVolume>(
        &mut self,
        well: &WellId,
        registered: V,
    ) -> Result<PathBuf> {
        let prep = self.prepare_well(well)?;
        let transforms = read_registered_transforms(registered, None)
            .with_context(|| format!("recovering registration transforms for well {well}"))?;

        let output = self.output_dir.join(format!("dataset_Well{well}_registered.xml"));
        self.write_container(well, &prep, &output, |key| {
            transforms
                .lookup(key.channel, key.angle, key.tile)
                .copied()
                .with_context(|| {
                    format!(
                        "no registered transform for channel {}, angle {}, tile {}",
                        key.channel, key.angle, key.tile
                    )
                })
        })?;
        Ok(output)
    }

    fn prepare_well(&mut self, well: &WellId) -> Result<WellPrep> {
        let dims = discover_dimensions(&self.input_dir, well)?;
        info!(
            "well {well}: {} times, {} tiles, {} angles",
            dims.times().len(),
            dims.tiles().len(),
            dims.angles().len()
        );

        let sample = find_sample_file(&self.input_dir, well, dims.times()[0], dims.tiles()[0])?;
        let metadata = self
            .source
            .sample_metadata(&sample)
            .with_context(|| format!("reading sample metadata from {}", sample.display()))?;

        let geometry = ScanGeometry {
            scan_type: self.scan_type,
            mirror_tilt_deg: self.mirror_tilt_deg,
            pix_x: self.pix_x,
            z_step_um: metadata.z_step_um,
        };
        let calibration_z = calibration_z(&geometry);
        Ok(WellPrep { dims, metadata, geometry, calibration_z })
    }

    /// Traverse the full view grid, appending every located view, then write
    /// the header and release the container exactly once.
    fn write_container(
        &mut self,
        well: &WellId,
        prep: &WellPrep,
        output: &Path,
        select_affine: impl Fn(&ViewKey) -> Result<Affine>,
    ) -> Result<()> {
        std::fs::create_dir_all(&self.output_dir)
            .with_context(|| format!("creating output directory {}", self.output_dir.display()))?;

        let channels = prep.metadata.channel_names.len();
        let layout = VolumeLayout {
            block_size: BLOCK_SIZE,
            channels,
            angles: prep.dims.angles().len(),
            tiles: prep.dims.tiles().len(),
            illuminations: 1,
        };
        let mut writer = self
            .factory
            .create(output, &layout)
            .with_context(|| format!("creating output container {}", output.display()))?;

        let angle_labels: Vec<String> =
            prep.dims.angles().iter().map(u32::to_string).collect();
        writer.set_attribute_labels("angle", &angle_labels)?;
        writer.set_attribute_labels("channel", &prep.metadata.channel_names)?;

        for (time_index, &time) in prep.dims.times().iter().enumerate() {
            for (tile_index, &tile) in prep.dims.tiles().iter().enumerate() {
                for (angle_index, &angle) in prep.dims.angles().iter().enumerate() {
                    let located =
                        find_specific_file(&self.input_dir, well, time, tile, angle)?;
                    let Some(file) = located else {
                        // Expected for sparse and long time-lapse runs.
                        debug!("well {well}: no file for time {time}, tile {tile}, angle {angle}; skipping view");
                        continue;
                    };
                    debug!("processing {}", file.display());

                    for channel in 0..channels {
                        let mut stack = self
                            .source
                            .channel_stack(&file, channel)
                            .with_context(|| {
                                format!("reading channel {channel} of {}", file.display())
                            })?;
                        if self.fix_corrupt_even_planes {
                            let patched = patch_corrupt_planes(&mut stack);
                            if patched > 0 {
                                debug!("patched {patched} corrupt planes in {}", file.display());
                            }
                        }

                        let key = ViewKey {
                            time: time_index,
                            tile: tile_index,
                            angle: angle_index,
                            channel,
                        };
                        writer.append_view(&ViewPayload {
                            stack: &stack,
                            key,
                            affine: select_affine(&key)?,
                            voxel_size: [self.pix_x, self.pix_x, prep.geometry.z_step_um],
                            voxel_units: VOXEL_UNITS,
                            calibration: [1.0, 1.0, prep.calibration_z],
                            exposure: EXPOSURE_MS,
                            exposure_units: EXPOSURE_UNITS,
                        })?;
                    }
                }
            }
        }

        writer.write_header()?;
        writer.close()?;
        info!("well {well}: container written to {}", output.display());
        Ok(())
    }
}
