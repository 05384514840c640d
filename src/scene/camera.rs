use glam::{Affine3A, Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// Projection model of a camera.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Projection {
    Perspective,
    /// Parallel projection; `height` is the visible world-space height.
    Orthographic { height: f32 },
}

/// Engine-side camera component.
///
/// The pose (`eye`/`at`/`up`) is derived from the owning entity's world
/// transform by [`Camera::update_from_world`]. Matrices are right-handed with
/// a `[0, 1]` depth range.
#[derive(Debug, Clone)]
pub struct Camera {
    pub eye: Vec3,
    pub at: Vec3,
    pub up: Vec3,

    pub z_near: f32,
    pub z_far: f32,
    /// Vertical field of view in radians.
    pub fov: f32,
    pub projection: Projection,

    pub width: f32,
    pub height: f32,

    pub(crate) view_matrix: Mat4,
    pub(crate) projection_matrix: Mat4,
    pub(crate) view_projection_matrix: Mat4,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

impl Camera {
    pub const DEFAULT_NEAR: f32 = 0.1;
    pub const DEFAULT_FAR: f32 = 1000.0;
    pub const DEFAULT_FOV: f32 = std::f32::consts::FRAC_PI_3;

    #[must_use]
    pub fn new() -> Self {
        let mut cam = Self {
            eye: Vec3::ZERO,
            at: Vec3::NEG_Z,
            up: Vec3::Y,
            z_near: Self::DEFAULT_NEAR,
            z_far: Self::DEFAULT_FAR,
            fov: Self::DEFAULT_FOV,
            projection: Projection::Perspective,
            width: 16.0,
            height: 16.0,
            view_matrix: Mat4::IDENTITY,
            projection_matrix: Mat4::IDENTITY,
            view_projection_matrix: Mat4::IDENTITY,
        };
        cam.update_view();
        cam.update_projection_matrix();
        cam
    }

    /// Recomputes a perspective projection for the given canvas.
    pub fn create_perspective(&mut self, width: f32, height: f32, near: f32, far: f32, fov: f32) {
        self.width = width.max(1.0);
        self.height = height.max(1.0);
        self.z_near = near;
        self.z_far = far;
        self.fov = fov;
        self.projection = Projection::Perspective;
        self.update_projection_matrix();
    }

    /// Switches to a parallel projection keeping the canvas aspect.
    pub fn set_orthographic(&mut self, height: f32) {
        self.projection = Projection::Orthographic { height };
        self.update_projection_matrix();
    }

    #[inline]
    #[must_use]
    pub fn aspect(&self) -> f32 {
        self.width / self.height.max(1.0)
    }

    #[inline]
    #[must_use]
    pub fn is_perspective(&self) -> bool {
        matches!(self.projection, Projection::Perspective)
    }

    pub fn update_projection_matrix(&mut self) {
        let aspect = self.aspect();
        self.projection_matrix = match self.projection {
            Projection::Perspective => {
                Mat4::perspective_rh(self.fov, aspect, self.z_near, self.z_far)
            }
            Projection::Orthographic { height } => {
                let h = height * 0.5;
                let w = h * aspect;
                Mat4::orthographic_rh(-w, w, -h, h, self.z_near, self.z_far)
            }
        };
        self.view_projection_matrix = self.projection_matrix * self.view_matrix;
    }

    /// Derives eye/at/up and the view matrix from a world transform.
    pub fn update_from_world(&mut self, world: &Affine3A) {
        self.eye = world.transform_point3(Vec3::ZERO);
        let forward = world.transform_vector3(Vec3::NEG_Z).normalize_or_zero();
        self.at = self.eye + forward;
        self.up = world.transform_vector3(Vec3::Y).normalize_or_zero();
        self.update_view();
    }

    fn update_view(&mut self) {
        let dir = (self.at - self.eye).normalize_or_zero();
        if dir == Vec3::ZERO || dir.cross(self.up).length_squared() < 1e-12 {
            return;
        }
        self.view_matrix = Mat4::look_to_rh(self.eye, dir, self.up);
        self.view_projection_matrix = self.projection_matrix * self.view_matrix;
    }

    /// Normalised view direction.
    #[inline]
    #[must_use]
    pub fn view_dir(&self) -> Vec3 {
        (self.at - self.eye).normalize_or_zero()
    }

    #[inline]
    #[must_use]
    pub fn view(&self) -> Mat4 {
        self.view_matrix
    }

    #[inline]
    #[must_use]
    pub fn projection_matrix(&self) -> Mat4 {
        self.projection_matrix
    }

    #[inline]
    #[must_use]
    pub fn view_projection(&self) -> Mat4 {
        self.view_projection_matrix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn world_transform_drives_pose() {
        let mut cam = Camera::new();
        let world = Affine3A::from_translation(Vec3::new(0.0, 0.0, 5.0));
        cam.update_from_world(&world);
        assert_eq!(cam.eye, Vec3::new(0.0, 0.0, 5.0));
        assert!((cam.view_dir() - Vec3::NEG_Z).length() < 1e-6);
        let origin = cam.view().transform_point3(Vec3::ZERO);
        assert!((origin.z + 5.0).abs() < 1e-5);
    }

    #[test]
    fn perspective_tracks_aspect() {
        let mut cam = Camera::new();
        cam.create_perspective(800.0, 400.0, 0.1, 100.0, Camera::DEFAULT_FOV);
        assert!((cam.aspect() - 2.0).abs() < 1e-6);
        let m = cam.projection_matrix();
        assert!((m.y_axis.y / m.x_axis.x - 2.0).abs() < 1e-4);
    }
}
