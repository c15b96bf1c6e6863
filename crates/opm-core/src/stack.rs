//! In-memory stack helpers.
//!
//! Stacks are `ndarray::Array3<u16>` in `(z, y, x)` plane order, matching the
//! order channels come out of the instrument reader.

use ndarray::{s, Array3};

/// Overwrite every odd z-plane (1, 3, 5, ...) with the plane before it,
/// compensating for a known corrupted-frame pattern on the sensor.
///
/// Dimensions are unchanged; returns the number of planes patched.
pub fn patch_corrupt_planes(stack: &mut Array3<u16>) -> usize {
    let nz = stack.shape()[0];
    let mut patched = 0;
    for z in (1..nz).step_by(2) {
        let (prev, mut curr) = stack.multi_slice_mut((s![z - 1, .., ..], s![z, .., ..]));
        curr.assign(&prev);
        patched += 1;
    }
    patched
}
