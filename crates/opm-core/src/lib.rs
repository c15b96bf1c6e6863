//! Core value types and geometry for oblique-plane microscopy reslicing.
//!
//! This crate contains:
//! - linear algebra aliases (`Real`, `Affine`, `Mat4`) and homogeneous-form
//!   helpers,
//! - the acquisition data model (wells, dimension sets, view keys, scan
//!   geometry),
//! - the per-angle deskew transforms for the two scanning geometries,
//! - the corrupt-plane stack patch.
//!
//! Everything here is pure: no file I/O, no container access. The
//! `opm-pipeline` crate drives these types against its collaborator traits.

/// Acquisition data model: wells, dimensions, scan geometry.
pub mod acquisition;
/// Per-angle deskew transforms and Z calibration.
pub mod geometry;
/// Linear algebra aliases and homogeneous-form helpers.
pub mod math;
/// In-memory stack helpers.
pub mod stack;

pub use acquisition::*;
pub use geometry::*;
pub use math::*;
pub use stack::*;
