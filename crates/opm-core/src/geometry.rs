//! Per-angle deskew transforms for the two scanning geometries.
//!
//! Both geometries produce one affine per detection angle that maps the
//! sheared raw volume into an orthogonal world frame. The matrices are
//! composed in homogeneous form; the factor order is load-bearing (the
//! rightmost factor is applied to voxels first) and must not be reshuffled.
//! Only whole-pixel shift terms are rounded; rotation blocks never are.

use std::f64::consts::FRAC_PI_2;

use nalgebra::Vector4;

use crate::acquisition::{ScanGeometry, ScanType, StackDimensions};
use crate::math::{rot_x, shear_y_by_z, translation, truncate, Affine, Mat4, Real};

/// Number of detection angles; the deskew math is defined for exactly two.
pub const NUM_ANGLES: usize = 2;

/// Compute the per-angle deskew transforms for a raw stack shape.
///
/// Pure and deterministic: identical inputs yield bit-identical matrices.
pub fn deskew_transforms(geometry: &ScanGeometry, dims: &StackDimensions) -> [Affine; NUM_ANGLES] {
    match geometry.scan_type {
        ScanType::StageScanning => stage_scan_transforms(geometry, dims),
        ScanType::RemoteScanning => remote_scan_transforms(geometry, dims),
    }
}

/// Scalar relating the raw Z spacing to the world Z axis.
///
/// Depends only on the scan geometry; identical for the unregistered and
/// registered passes.
pub fn calibration_z(geometry: &ScanGeometry) -> Real {
    match geometry.scan_type {
        ScanType::RemoteScanning => geometry.z_step_um / geometry.pix_x,
        ScanType::StageScanning => {
            let mirror_theta = geometry.mirror_tilt_deg.to_radians();
            geometry.z_step_um * (FRAC_PI_2 - 2.0 * mirror_theta).cos() / geometry.pix_x
        }
    }
}

fn flip_y() -> Mat4 {
    Mat4::from_diagonal(&Vector4::new(1.0, -1.0, 1.0, 1.0))
}

fn flip_z() -> Mat4 {
    Mat4::from_diagonal(&Vector4::new(1.0, 1.0, -1.0, 1.0))
}

/// Stage scanning: shear and counter-rotation in the XY image plane, then a
/// quarter-turn onto the lab axes.
fn stage_scan_transforms(geometry: &ScanGeometry, dims: &StackDimensions) -> [Affine; NUM_ANGLES] {
    let mirror_theta = geometry.mirror_tilt_deg.to_radians();
    let shear = 1.0 / (2.0 * mirror_theta).tan();
    let image_theta = FRAC_PI_2 - 2.0 * mirror_theta;

    // Shift of the Y flip, rounded to whole camera pixels.
    let flip_shift =
        (dims.y as Real * geometry.pix_x * (2.0 * mirror_theta).sin()).round() / geometry.pix_x;

    let angle0 = rot_x(FRAC_PI_2)
        * translation(0.0, flip_shift, 0.0)
        * rot_x(image_theta)
        * shear_y_by_z(shear)
        * flip_y();
    let angle1 = rot_x(FRAC_PI_2) * rot_x(-image_theta) * shear_y_by_z(-shear);

    [truncate(&angle0), truncate(&angle1)]
}

/// Remote scanning: shear about the deskewed stack center, with the second
/// angle additionally Z-flipped back into the shared frame.
fn remote_scan_transforms(geometry: &ScanGeometry, dims: &StackDimensions) -> [Affine; NUM_ANGLES] {
    let mirror_theta = geometry.mirror_tilt_deg.to_radians();
    let shear = mirror_theta.tan();
    let image_theta = 2.0 * mirror_theta;

    let zdim_px = (dims.z as Real * geometry.z_step_um / geometry.pix_x).round();
    let flipz_shift = (zdim_px / mirror_theta.cos()).round();
    let y_deskewed = (dims.y as Real + zdim_px * shear).round();

    let center_to_origin =
        translation(-(dims.x as Real) / 2.0, -y_deskewed / 2.0, -zdim_px / 2.0);
    let center_back = translation(dims.x as Real / 2.0, y_deskewed / 2.0, zdim_px / 2.0);

    let angle0 = center_back * rot_x(image_theta) * center_to_origin * shear_y_by_z(shear);
    let angle1 = center_back
        * rot_x(-image_theta)
        * center_to_origin
        * translation(0.0, 0.0, flipz_shift)
        * flip_z()
        * shear_y_by_z(shear);

    [truncate(&angle0), truncate(&angle1)]
}
