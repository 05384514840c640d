//! Matrix helpers exposed to hosts that work with raw pose data.

use glam::{Mat4, Vec3};

/// Transforms a point (w = 1) with perspective divide.
#[inline]
#[must_use]
pub fn transform_point(p: Vec3, m: &Mat4) -> Vec3 {
    m.project_point3(p)
}

/// Transforms a direction (w = 0); translation is ignored.
#[inline]
#[must_use]
pub fn transform_vector(v: Vec3, m: &Mat4) -> Vec3 {
    m.transform_vector3(v)
}

/// Right-handed look-to view matrix.
///
/// Returns `None` when `view` or `up` are degenerate.
#[must_use]
pub fn look_to(eye: Vec3, view: Vec3, up: Vec3) -> Option<Mat4> {
    let dir = view.try_normalize()?;
    if dir.cross(up).length_squared() < 1e-12 {
        return None;
    }
    Some(Mat4::look_to_rh(eye, dir, up))
}

/// Builds the world-to-unit-box matrix of an oriented box and its inverse.
///
/// `y_axis` and `z_axis` are the box's local axes in world space; `scale` is
/// the box extent along each local axis. Points inside the box map to the
/// unit cube centred at the origin.
#[must_use]
pub fn compute_box_transform_matrix(
    scale: Vec3,
    center: Vec3,
    y_axis: Vec3,
    z_axis: Vec3,
) -> Option<(Mat4, Mat4)> {
    let ws2cs = look_to(center, -z_axis, y_axis)?;
    if scale.cmpeq(Vec3::ZERO).any() {
        return None;
    }
    let unit = Mat4::from_scale(scale.recip()) * ws2cs;
    let inv = unit.inverse();
    inv.is_finite().then_some((unit, inv))
}
