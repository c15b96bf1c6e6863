//! Contracts for the external microscopy reader and volume containers.
//!
//! The engine never parses raw instrument files or writes container formats
//! itself; it drives these traits. Implementations adapt the concrete reader
//! and container libraries. Read errors propagate uncaught; there is no retry
//! inside the engine.

use std::path::Path;

use anyhow::Result;
use ndarray::Array3;

use opm_core::{Affine, Real, SampleMetadata, ViewKey};

/// Reader side: one raw acquisition file, one channel at a time.
pub trait StackSource {
    /// Representative per-well metadata from a single file.
    fn sample_metadata(&mut self, path: &Path) -> Result<SampleMetadata>;

    /// The 3-D stack of one channel, planes ordered `(z, y, x)`.
    fn channel_stack(&mut self, path: &Path, channel: usize) -> Result<Array3<u16>>;
}

/// Fixed shape of an output container, decided once per well.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeLayout {
    pub block_size: [usize; 3],
    pub channels: usize,
    pub angles: usize,
    pub tiles: usize,
    pub illuminations: usize,
}

/// One view ready to append, with its placement and calibration metadata.
#[derive(Debug)]
pub struct ViewPayload<'a> {
    pub stack: &'a Array3<u16>,
    pub key: ViewKey,
    pub affine: Affine,
    pub voxel_size: [Real; 3],
    pub voxel_units: &'a str,
    pub calibration: [Real; 3],
    pub exposure: Real,
    pub exposure_units: &'a str,
}

/// Writer side of an output container.
///
/// The handle is a scoped resource: acquired once per well, written
/// incrementally, and finalized with [`VolumeWriter::close`] on success.
/// Implementations must release the underlying file when dropped, so an
/// error path that abandons the writer cannot leave it locked.
pub trait VolumeWriter {
    fn set_attribute_labels(&mut self, attribute: &str, labels: &[String]) -> Result<()>;

    fn append_view(&mut self, view: &ViewPayload<'_>) -> Result<()>;

    /// Write the container header after the full grid has been appended.
    fn write_header(&mut self) -> Result<()>;

    fn close(self) -> Result<()>;
}

/// Creates container writers; the factory owns any backend configuration.
pub trait VolumeWriterFactory {
    type Writer: VolumeWriter;

    fn create(&self, path: &Path, layout: &VolumeLayout) -> Result<Self::Writer>;
}

/// Attribute counts of a previously written container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeCounts {
    pub times: usize,
    pub illuminations: usize,
    pub channels: usize,
    pub tiles: usize,
    pub angles: usize,
}

/// Reader side of a registered container.
pub trait RegisteredVolume {
    fn attribute_counts(&mut self) -> Result<AttributeCounts>;

    /// Ordered affine steps recorded for one view, outermost first; the last
    /// entry is the calibration-only step.
    fn affine_chain(
        &mut self,
        time: usize,
        illumination: usize,
        channel: usize,
        tile: usize,
        angle: usize,
    ) -> Result<Vec<Affine>>;

    /// Release the container handle.
    fn close(self) -> Result<()>;
}
