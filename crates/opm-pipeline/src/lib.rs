//! Assembly pipeline for oblique-plane microscopy acquisitions.
//!
//! This crate turns a directory of raw per-view acquisitions into one
//! calibrated output container per well:
//!
//! 1. [`discovery`] scans filenames once to fix the dataset shape
//!    (times, tiles, angles) and the set of wells.
//! 2. [`locate`] resolves individual view files, tolerating the gaps left
//!    by sparse and long time-lapse acquisitions.
//! 3. [`registration`] recovers net per-view transforms from a container
//!    written by an external alignment pass.
//! 4. [`assembler`] orchestrates the passes, selecting either the deskew
//!    transforms from `opm-core` (unregistered) or the recovered transforms
//!    (registered), and appends every located view to the container writer.
//!
//! Raw-file parsing and container formats stay behind the [`io`] traits;
//! implementations adapt the concrete reader and container libraries.

pub mod assembler;
pub mod config;
pub mod discovery;
pub mod io;
pub mod locate;
pub mod registration;

pub use assembler::DatasetAssembler;
pub use config::{ConfigError, DataConfig, HardcodedVars, RunConfig};
pub use discovery::{discover_dimensions, discover_wells, DiscoveryError};
pub use io::{
    AttributeCounts, RegisteredVolume, StackSource, ViewPayload, VolumeLayout, VolumeWriter,
    VolumeWriterFactory,
};
pub use locate::{find_sample_file, find_specific_file};
pub use registration::{
    read_registered_transforms, KeyScheme, RegisteredTransforms, RegistrationError,
    RegistrationKey,
};
