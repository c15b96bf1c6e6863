use nalgebra::{Matrix3x4, Matrix4, Rotation3, Vector3};

pub type Real = f64;

/// 3x4 affine block: a rotation sub-block plus a translation column, mapping
/// a view's local voxel grid into the shared reference frame.
pub type Affine = Matrix3x4<Real>;
pub type Mat4 = Matrix4<Real>;
pub type Vec3 = Vector3<Real>;

/// Promote a 3x4 affine block to homogeneous form by appending `[0 0 0 1]`.
pub fn promote(a: &Affine) -> Mat4 {
    let mut m = Mat4::identity();
    m.fixed_view_mut::<3, 4>(0, 0).copy_from(a);
    m
}

/// Truncate a homogeneous matrix back to its top 3x4 affine block.
pub fn truncate(m: &Mat4) -> Affine {
    m.fixed_view::<3, 4>(0, 0).into_owned()
}

/// Homogeneous rotation about the X axis (acts in the YZ plane).
pub fn rot_x(theta: Real) -> Mat4 {
    Rotation3::from_axis_angle(&Vec3::x_axis(), theta).to_homogeneous()
}

/// Homogeneous translation by `(tx, ty, tz)`.
pub fn translation(tx: Real, ty: Real, tz: Real) -> Mat4 {
    Mat4::new_translation(&Vec3::new(tx, ty, tz))
}

/// Homogeneous shear of Y by Z: `y' = y + s * z`.
pub fn shear_y_by_z(s: Real) -> Mat4 {
    let mut m = Mat4::identity();
    m[(1, 2)] = s;
    m
}
