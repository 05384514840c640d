use glam::{Affine3A, Mat3, Mat4, Quat, Vec3};

/// Transform component
///
/// Local translation/rotation/scale (TRS) plus cached local and world
/// matrices. The local matrix is rebuilt lazily by comparing the public TRS
/// against a shadow copy taken at the last rebuild.
#[derive(Debug, Clone)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,

    pub(crate) local_matrix: Affine3A,
    pub(crate) world_matrix: Affine3A,

    last_position: Vec3,
    last_rotation: Quat,
    last_scale: Vec3,
    force_update: bool,
}

impl Transform {
    #[must_use]
    pub fn new() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,

            local_matrix: Affine3A::IDENTITY,
            world_matrix: Affine3A::IDENTITY,

            last_position: Vec3::ZERO,
            last_rotation: Quat::IDENTITY,
            last_scale: Vec3::ONE,
            force_update: true,
        }
    }

    // ========================================================================
    // Shadow-state update
    // ========================================================================

    /// Rebuilds the local matrix if TRS changed since the last call.
    ///
    /// Returns `true` when the matrix was rebuilt.
    pub fn update_local_matrix(&mut self) -> bool {
        let changed = self.position != self.last_position
            || self.rotation != self.last_rotation
            || self.scale != self.last_scale
            || self.force_update;

        if changed {
            self.local_matrix =
                Affine3A::from_scale_rotation_translation(self.scale, self.rotation, self.position);
            self.last_position = self.position;
            self.last_rotation = self.rotation;
            self.last_scale = self.scale;
            self.force_update = false;
        }

        changed
    }

    /// Local matrix computed from the current TRS, ignoring the cache.
    #[inline]
    #[must_use]
    pub fn compose_local(&self) -> Affine3A {
        Affine3A::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    // ========================================================================
    // Mutators
    // ========================================================================

    /// Adds `value` to the local translation.
    pub fn translate(&mut self, value: Vec3) {
        self.position += value;
    }

    /// Multiplies the local scale component-wise.
    pub fn apply_scale(&mut self, value: Vec3) {
        self.scale *= value;
    }

    /// Pre-multiplies the local rotation.
    pub fn rotate(&mut self, quat: Quat) {
        self.rotation = (quat * self.rotation).normalize();
    }

    /// Composes `mat` onto the current local matrix (`mat * local`).
    pub fn matrix_transform(&mut self, mat: Mat4) {
        let current = Mat4::from(self.compose_local());
        self.apply_local_matrix(Affine3A::from_mat4(mat * current));
    }

    /// Resets TRS to identity.
    pub fn clear(&mut self) {
        self.position = Vec3::ZERO;
        self.rotation = Quat::IDENTITY;
        self.scale = Vec3::ONE;
        self.mark_dirty();
    }

    /// Sets the local matrix directly and decomposes it back into TRS.
    ///
    /// Shear is lost by the decomposition.
    pub fn apply_local_matrix(&mut self, mat: Affine3A) {
        self.local_matrix = mat;

        let (scale, rotation, translation) = mat.to_scale_rotation_translation();
        self.scale = scale;
        self.rotation = rotation;
        self.position = translation;

        self.last_scale = scale;
        self.last_rotation = rotation;
        self.last_position = translation;

        self.mark_dirty();
    }

    /// Orients the transform to look along `dir` (parent space).
    ///
    /// Degenerate `dir`/`up` pairs leave the rotation untouched.
    pub fn look_to(&mut self, dir: Vec3, up: Vec3) {
        let Some(forward) = dir.try_normalize() else {
            return;
        };
        if forward.cross(up).length_squared() < 1e-8 {
            return;
        }
        let right = forward.cross(up).normalize();
        let new_up = right.cross(forward).normalize();
        self.rotation = Quat::from_mat3(&Mat3::from_cols(right, new_up, -forward));
    }

    /// Forces a rebuild on the next [`update_local_matrix`](Self::update_local_matrix).
    pub fn mark_dirty(&mut self) {
        self.force_update = true;
    }

    // ========================================================================
    // Getters
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn local_matrix(&self) -> &Affine3A {
        &self.local_matrix
    }

    #[inline]
    #[must_use]
    pub fn world_matrix(&self) -> &Affine3A {
        &self.world_matrix
    }

    #[inline]
    #[must_use]
    pub fn world_matrix_as_mat4(&self) -> Mat4 {
        Mat4::from(self.world_matrix)
    }

    pub fn set_world_matrix(&mut self, mat: Affine3A) {
        self.world_matrix = mat;
    }

    #[must_use]
    pub fn world_position(&self) -> Vec3 {
        self.world_matrix.translation.into()
    }

    /// World-space -Z axis.
    #[must_use]
    pub fn world_forward(&self) -> Vec3 {
        self.world_matrix
            .transform_vector3(Vec3::NEG_Z)
            .normalize_or_zero()
    }

    #[must_use]
    pub fn world_right(&self) -> Vec3 {
        self.world_matrix
            .transform_vector3(Vec3::X)
            .normalize_or_zero()
    }

    #[must_use]
    pub fn world_up(&self) -> Vec3 {
        self.world_matrix
            .transform_vector3(Vec3::Y)
            .normalize_or_zero()
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}
