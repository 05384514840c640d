use glam::{Mat4, Quat, Vec2, Vec3};

use crate::core::Vid;
use crate::errors::{Result, VizError};
use crate::registry::Registry;
use crate::scene::Camera;

/// Below this world-space length a pan is treated as no movement.
const PAN_EPSILON: f32 = 1e-6;

/// Below this axis length a drag produces no rotation.
const AXIS_EPSILON: f32 = 1e-7;

/// Sphere the camera orbits.
#[derive(Debug, Clone, Copy)]
struct Stage {
    camera: Vid,
    center: Vec3,
    radius: f32,
}

/// Camera state frozen by [`ArcBall::start`]. Every drag step is applied to
/// this snapshot, never to the live pose, so repeated moves cannot drift.
#[derive(Debug, Clone, Copy)]
struct Snapshot {
    eye: Vec3,
    view: Vec3,
    up: Vec3,
    near: f32,
    perspective: bool,
    start: Vec2,
    sensitivity: f32,
    ws2ss: Mat4,
    ss2ws: Mat4,
    /// Start point on the unit sphere, relative to the stage centre.
    start_on_sphere: Vec3,
}

/// Virtual-sphere orbit controller for one camera.
///
/// Call [`set_target_cam`](Self::set_target_cam) (re-calling it per frame
/// with a tracked centre is fine), then [`start`](Self::start) on press and
/// [`move_to`](Self::move_to) or [`pan_move`](Self::pan_move) while dragging.
#[derive(Debug, Clone, Default)]
pub struct ArcBall {
    stage: Option<Stage>,
    snapshot: Option<Snapshot>,
}

impl ArcBall {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the orbited camera and stage sphere.
    pub fn set_target_cam(&mut self, camera: Vid, center: Vec3, radius: f32) -> Result<()> {
        if !center.is_finite() || !radius.is_finite() || radius <= 0.0 {
            return Err(VizError::ArcballNotReady("stage sphere must be finite and non-empty"));
        }
        self.stage = Some(Stage {
            camera,
            center,
            radius,
        });
        Ok(())
    }

    #[must_use]
    pub fn target_cam(&self) -> Option<Vid> {
        self.stage.map(|s| s.camera)
    }

    #[must_use]
    pub fn stage_center(&self) -> Option<Vec3> {
        self.stage.map(|s| s.center)
    }

    /// Whether a gesture snapshot is held.
    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.snapshot.is_some()
    }

    /// Ends the current gesture.
    pub fn release(&mut self) {
        self.snapshot = None;
    }

    /// Captures the camera pose and screen transforms for a new gesture.
    pub fn start(&mut self, registry: &mut Registry, pos: Vec2, sensitivity: f32) -> Result<()> {
        let stage = self
            .stage
            .ok_or(VizError::ArcballNotReady("no stage set"))?;

        if let Some(store) = registry.store_of_mut(stage.camera) {
            store.refresh_camera(stage.camera);
        }
        let cam = registry
            .engine_camera(stage.camera)
            .ok_or(VizError::CameraNotResolved(stage.camera))?;

        let ws2ss = world_to_screen(cam);
        let det = ws2ss.determinant();
        let ss2ws = ws2ss.inverse();
        if det == 0.0 || !det.is_finite() || !ss2ws.is_finite() {
            return Err(VizError::SingularTransform);
        }

        let start_on_sphere = map_to_sphere(&ss2ws, pos, stage.center, stage.radius)
            .ok_or(VizError::SingularTransform)?;

        self.snapshot = Some(Snapshot {
            eye: cam.eye,
            view: cam.view_dir(),
            up: cam.up,
            near: cam.z_near,
            perspective: cam.is_perspective(),
            start: pos,
            sensitivity,
            ws2ss,
            ss2ws,
            start_on_sphere,
        });
        Ok(())
    }

    /// Rotation (as an affine world transform) for dragging to `pos`.
    ///
    /// Identity when `pos` maps to the start point.
    pub fn rotation_to(&self, pos: Vec2) -> Result<Mat4> {
        let (stage, snap) = self.active()?;
        let current = map_to_sphere(&snap.ss2ws, pos, stage.center, stage.radius)
            .ok_or(VizError::SingularTransform)?;

        let axis = snap.start_on_sphere.cross(current);
        if axis.length() < AXIS_EPSILON {
            return Ok(Mat4::IDENTITY);
        }
        let angle = snap.start_on_sphere.dot(current).clamp(-1.0, 1.0).acos() * snap.sensitivity;

        // The scene follows the pointer, so the camera turns the other way.
        let rotation = Quat::from_axis_angle(axis.normalize(), -angle);
        Ok(Mat4::from_translation(stage.center)
            * Mat4::from_quat(rotation)
            * Mat4::from_translation(-stage.center))
    }

    /// Orbits the camera for a drag from the start point to `pos`.
    pub fn move_to(&mut self, registry: &mut Registry, pos: Vec2) -> Result<()> {
        let (stage, snap) = self.active()?;
        let tr = self.rotation_to(pos)?;

        let eye = tr.transform_point3(snap.eye);
        let view = tr.transform_vector3(snap.view).normalize_or_zero();
        let up = tr.transform_vector3(snap.up).normalize_or_zero();
        apply_pose(registry, stage.camera, eye, view, up)
    }

    /// Pans the camera for a drag from the start point to `pos`.
    ///
    /// View and up stay those of the snapshot.
    pub fn pan_move(&mut self, registry: &mut Registry, pos: Vec2) -> Result<()> {
        let (stage, snap) = self.active()?;

        let eye = if snap.perspective {
            let cur = snap.ss2ws.project_point3(pos.extend(0.0));
            let old = snap.ss2ws.project_point3(snap.start.extend(0.0));
            let diff = cur - old;
            let len = diff.length();
            if !len.is_finite() {
                return Err(VizError::SingularTransform);
            }
            if len < PAN_EPSILON {
                snap.eye
            } else {
                let corrected = len * (stage.center - snap.eye).length() / snap.near;
                snap.eye - diff / len * corrected
            }
        } else {
            let delta = (pos - snap.start).extend(0.0);
            let eye_ss = snap.ws2ss.project_point3(snap.eye) - delta;
            snap.ss2ws.project_point3(eye_ss)
        };

        apply_pose(registry, stage.camera, eye, snap.view, snap.up)
    }

    /// Maps a screen point (pixels, y down) at `depth` into world space using
    /// the snapshot transforms.
    pub fn screen_to_world(&self, pos: Vec2, depth: f32) -> Result<Vec3> {
        let (_, snap) = self.active()?;
        Ok(snap.ss2ws.project_point3(pos.extend(depth)))
    }

    pub fn world_to_screen(&self, point: Vec3) -> Result<Vec3> {
        let (_, snap) = self.active()?;
        Ok(snap.ws2ss.project_point3(point))
    }

    fn active(&self) -> Result<(Stage, Snapshot)> {
        let stage = self
            .stage
            .ok_or(VizError::ArcballNotReady("no stage set"))?;
        let snap = self
            .snapshot
            .ok_or(VizError::ArcballNotReady("start was not called"))?;
        Ok((stage, snap))
    }
}

fn apply_pose(registry: &mut Registry, camera: Vid, eye: Vec3, view: Vec3, up: Vec3) -> Result<()> {
    if !(eye.is_finite() && view.is_finite() && up.is_finite()) {
        return Err(VizError::SingularTransform);
    }
    if registry.engine_camera(camera).is_none() {
        return Err(VizError::CameraNotResolved(camera));
    }
    registry.camera(camera).set_pose(eye, view, up);
    Ok(())
}

/// Maps normalised device coordinates to pixels: y flipped, pixel centres
/// at integer coordinates.
#[must_use]
pub fn viewport_matrix(width: f32, height: f32) -> Mat4 {
    Mat4::from_translation(Vec3::new(-0.5, -0.5, 0.0))
        * Mat4::from_scale(Vec3::new(0.5 * width, -0.5 * height, 1.0))
        * Mat4::from_translation(Vec3::new(1.0, -1.0, 0.0))
}

/// World to screen transform of `cam` at its current canvas size.
#[must_use]
pub fn world_to_screen(cam: &Camera) -> Mat4 {
    viewport_matrix(cam.width, cam.height) * cam.projection_matrix() * cam.view()
}

/// Projects a screen point onto the stage sphere and returns the unit
/// direction from the centre. Rays that miss land on the silhouette.
fn map_to_sphere(ss2ws: &Mat4, pos: Vec2, center: Vec3, radius: f32) -> Option<Vec3> {
    let near = ss2ws.project_point3(pos.extend(0.0));
    let far = ss2ws.project_point3(pos.extend(1.0));
    let dir = (far - near).try_normalize()?;

    let oc = near - center;
    let b = oc.dot(dir);
    let c = oc.length_squared() - radius * radius;
    let disc = b * b - c;

    let point = if disc >= 0.0 {
        let root = disc.sqrt();
        let t = if -b - root >= 0.0 { -b - root } else { -b + root };
        near + dir * t
    } else {
        let closest = near + dir * -b;
        center + (closest - center).try_normalize()? * radius
    };
    let on_sphere = (point - center).try_normalize()?;
    on_sphere.is_finite().then_some(on_sphere)
}
