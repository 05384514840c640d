//! Typed write-through views over engine components.
//!
//! A view borrows the [`Registry`] mutably for the duration of a chain of
//! calls and re-resolves the engine component on every call. All methods
//! silently no-op (setters) or return `None` (getters) when the handle is
//! stale or names a different kind, so a dangling handle never panics.
//!
//! Every setter that reaches a component stamps the wrapper's
//! `last_modified`.
//!
//! ```rust,ignore
//! registry.light(vid)
//!     .set_color(Vec3::new(1.0, 0.9, 0.8))
//!     .set_intensity(4.0)
//!     .set_cast_shadow(true);
//! ```
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::must_use_candidate)]

use glam::{Affine3A, Mat4, Quat, Vec3};

use super::Registry;
use crate::core::Vid;
use crate::renderer::{InfoDisplay, RendererOptions};
use crate::scene::{
    Animation, Collider, ColliderShape, Emitter, Light, LightType, Projection, SceneStore, Weather,
};

/// Shared resolve-and-stamp plumbing of every view.
struct Access<'a> {
    registry: &'a mut Registry,
    vid: Vid,
}

impl Access<'_> {
    fn read<R>(&self, f: impl FnOnce(&SceneStore, Vid) -> Option<R>) -> Option<R> {
        f(self.registry.store_of(self.vid)?, self.vid)
    }

    fn write<R>(&mut self, f: impl FnOnce(&mut SceneStore, Vid) -> Option<R>) -> Option<R> {
        let vid = self.vid;
        let out = f(self.registry.store_of_mut(vid)?, vid);
        if out.is_some() {
            self.registry.touch(vid);
        }
        out
    }
}

// ============================================================================
// Base
// ============================================================================

/// Transform accessors shared by every hierarchy entity.
pub struct BaseView<'a> {
    access: Access<'a>,
}

impl<'a> BaseView<'a> {
    pub(crate) fn new(registry: &'a mut Registry, vid: Vid) -> Self {
        Self {
            access: Access { registry, vid },
        }
    }

    #[inline]
    pub fn vid(&self) -> Vid {
        self.access.vid
    }

    pub fn name(&self) -> Option<String> {
        self.access.registry.name_of(self.access.vid)
    }

    pub fn set_name(mut self, name: &str) -> Self {
        self.access.write(|s, v| s.set_name(v, name).then_some(()));
        self
    }

    pub fn parent_vid(&self) -> Option<Vid> {
        self.access.read(|s, v| s.parent_of(v))
    }

    // -- World-space queries --

    fn world(&self) -> Option<Affine3A> {
        self.access
            .read(|s, v| s.transform(v).map(|_| s.world_matrix_of(v)))
    }

    pub fn world_position(&self) -> Option<Vec3> {
        self.world().map(|m| m.translation.into())
    }

    pub fn world_forward(&self) -> Option<Vec3> {
        self.world()
            .map(|m| m.transform_vector3(Vec3::NEG_Z).normalize_or_zero())
    }

    pub fn world_right(&self) -> Option<Vec3> {
        self.world()
            .map(|m| m.transform_vector3(Vec3::X).normalize_or_zero())
    }

    pub fn world_up(&self) -> Option<Vec3> {
        self.world()
            .map(|m| m.transform_vector3(Vec3::Y).normalize_or_zero())
    }

    pub fn local_transform(&self) -> Option<Mat4> {
        self.access
            .read(|s, v| s.transform(v).map(|t| Mat4::from(t.compose_local())))
    }

    pub fn world_transform(&self) -> Option<Mat4> {
        self.world().map(Mat4::from)
    }

    pub fn local_inv_transform(&self) -> Option<Mat4> {
        self.local_transform().map(|m| m.inverse())
    }

    pub fn world_inv_transform(&self) -> Option<Mat4> {
        self.world_transform().map(|m| m.inverse())
    }

    // -- Local-space setters --

    fn edit(mut self, f: impl FnOnce(&mut crate::scene::Transform)) -> Self {
        self.access.write(|s, v| s.transform_mut(v).map(f));
        self
    }

    pub fn set_translate(self, value: Vec3) -> Self {
        self.edit(|t| t.position = value)
    }

    pub fn set_scale(self, value: Vec3) -> Self {
        self.edit(|t| t.scale = value)
    }

    pub fn set_quaternion(self, value: Quat) -> Self {
        self.edit(|t| t.rotation = value.normalize())
    }

    /// Replaces the local matrix, or composes onto it when `additive`.
    pub fn set_matrix(self, value: Mat4, additive: bool) -> Self {
        self.edit(|t| {
            if additive {
                t.matrix_transform(value);
            } else {
                t.apply_local_matrix(Affine3A::from_mat4(value));
            }
        })
    }
}

// ============================================================================
// Camera
// ============================================================================

pub struct CameraView<'a> {
    access: Access<'a>,
}

impl<'a> CameraView<'a> {
    pub(crate) fn new(registry: &'a mut Registry, vid: Vid) -> Self {
        Self {
            access: Access { registry, vid },
        }
    }

    #[inline]
    pub fn vid(&self) -> Vid {
        self.access.vid
    }

    /// Sets the world-space pose.
    ///
    /// `up` is re-orthogonalised against `view`; the local transform is
    /// solved against the parent chain. Degenerate input is ignored.
    pub fn set_pose(mut self, eye: Vec3, view: Vec3, up: Vec3) -> Self {
        let Some(dir) = view.try_normalize() else {
            log::warn!("Camera {}: zero view direction ignored", self.access.vid);
            return self;
        };
        let Some(right) = dir.cross(up).try_normalize() else {
            log::warn!("Camera {}: up parallel to view ignored", self.access.vid);
            return self;
        };
        let up = right.cross(dir);
        let world = Affine3A::from_mat4(Mat4::look_to_rh(eye, dir, up).inverse());

        self.access.write(|s, v| {
            if s.camera(v).is_none() {
                return None;
            }
            let parent_world = s
                .parent_of(v)
                .map_or(Affine3A::IDENTITY, |p| s.world_matrix_of(p));
            s.transform_mut(v)?
                .apply_local_matrix(parent_world.inverse() * world);
            s.refresh_camera(v).then_some(())
        });
        self
    }

    /// World-space `(eye, view, up)`.
    pub fn pose(&self) -> Option<(Vec3, Vec3, Vec3)> {
        self.access
            .read(|s, v| s.camera(v).map(|c| (c.eye, c.view_dir(), c.up)))
    }

    pub fn set_perspective_projection(
        mut self,
        z_near: f32,
        z_far: f32,
        fov_y: f32,
        aspect: f32,
    ) -> Self {
        self.access.write(|s, v| {
            let cam = s.camera_mut(v)?;
            let height = cam.height;
            cam.create_perspective(height * aspect, height, z_near, z_far, fov_y);
            Some(())
        });
        self
    }

    /// `(near, far, fov_y, aspect)`.
    pub fn perspective_projection(&self) -> Option<(f32, f32, f32, f32)> {
        self.access.read(|s, v| {
            s.camera(v)
                .map(|c| (c.z_near, c.z_far, c.fov, c.aspect()))
        })
    }

    pub fn set_orthographic(mut self, height: f32) -> Self {
        self.access.write(|s, v| {
            s.camera_mut(v)?.set_orthographic(height);
            Some(())
        });
        self
    }

    pub fn projection(&self) -> Option<Projection> {
        self.access.read(|s, v| s.camera(v).map(|c| c.projection))
    }

    /// Resizes the camera canvas and the bound renderer's logical size.
    ///
    /// Render targets follow lazily on the next render.
    pub fn set_canvas_size(mut self, width: f32, height: f32, dpi: f32) -> Self {
        let updated = self.access.write(|s, v| {
            let cam = s.camera_mut(v)?;
            match cam.projection {
                Projection::Perspective => {
                    let (near, far, fov) = (cam.z_near, cam.z_far, cam.fov);
                    cam.create_perspective(width, height, near, far, fov);
                }
                Projection::Orthographic { .. } => {
                    cam.width = width.max(1.0);
                    cam.height = height.max(1.0);
                    cam.update_projection_matrix();
                }
            }
            Some(())
        });
        if updated.is_some()
            && let Some(renderer) = self.access.registry.renderer_mut(self.access.vid)
        {
            renderer.init(width.round() as u32, height.round() as u32, dpi);
        }
        self
    }

    /// `(width, height, dpi)` of the canvas.
    pub fn canvas_size(&self) -> Option<(f32, f32, f32)> {
        let (w, h) = self.access.read(|s, v| s.camera(v).map(|c| (c.width, c.height)))?;
        let dpi = self
            .access
            .registry
            .renderer(self.access.vid)
            .map_or(self.access.registry.settings().canvas_init_dpi, |r| {
                r.canvas().2
            });
        Some((w, h, dpi))
    }

    // -- Renderer settings --

    pub fn renderer_options(&self) -> Option<&RendererOptions> {
        self.access
            .registry
            .renderer(self.access.vid)
            .map(|r| &r.options)
    }

    pub fn set_renderer_options(mut self, options: RendererOptions) -> Self {
        if let Some(r) = self.access.registry.renderer_mut(self.access.vid) {
            r.options = options;
            self.access.registry.touch(self.access.vid);
        }
        self
    }

    pub fn set_info_display(mut self, flags: InfoDisplay) -> Self {
        if let Some(r) = self.access.registry.renderer_mut(self.access.vid) {
            r.info_display = flags;
            self.access.registry.touch(self.access.vid);
        }
        self
    }

    pub fn start_fade(mut self, seconds: f32, color: Vec3) -> Self {
        if let Some(r) = self.access.registry.renderer_mut(self.access.vid) {
            r.fade.start(seconds, color);
            self.access.registry.touch(self.access.vid);
        }
        self
    }
}

// ============================================================================
// Component views
// ============================================================================

/// Generates the constructor and the `edit`/`get` helpers of a view.
macro_rules! component_view {
    ($view:ident, $ty:ty, $get:ident, $get_mut:ident) => {
        pub struct $view<'a> {
            access: Access<'a>,
        }

        impl<'a> $view<'a> {
            pub(crate) fn new(registry: &'a mut Registry, vid: Vid) -> Self {
                Self {
                    access: Access { registry, vid },
                }
            }

            #[inline]
            pub fn vid(&self) -> Vid {
                self.access.vid
            }

            /// Whether the handle currently resolves to this component kind.
            pub fn exists(&self) -> bool {
                self.access.read(|s, v| s.$get(v).map(|_| ())).is_some()
            }

            fn edit(mut self, f: impl FnOnce(&mut $ty)) -> Self {
                self.access.write(|s, v| s.$get_mut(v).map(f));
                self
            }

            fn get<R>(&self, f: impl FnOnce(&$ty) -> R) -> Option<R> {
                self.access.read(|s, v| s.$get(v).map(f))
            }
        }
    };
}

component_view!(LightView, Light, light, light_mut);
component_view!(EmitterView, Emitter, emitter, emitter_mut);
component_view!(AnimationView, Animation, animation, animation_mut);
component_view!(ColliderView, Collider, collider, collider_mut);

impl LightView<'_> {
    pub fn set_color(self, value: Vec3) -> Self {
        self.edit(|l| l.color = value)
    }
    pub fn set_intensity(self, value: f32) -> Self {
        self.edit(|l| l.intensity = value)
    }
    pub fn set_range(self, value: f32) -> Self {
        self.edit(|l| l.range = value)
    }
    pub fn set_cone_outer_range(self, value: f32) -> Self {
        self.edit(|l| l.outer_cone_angle = value)
    }
    pub fn set_cone_inner_range(self, value: f32) -> Self {
        self.edit(|l| l.inner_cone_angle = value)
    }
    pub fn set_radius(self, value: f32) -> Self {
        self.edit(|l| l.radius = value)
    }
    pub fn set_length(self, value: f32) -> Self {
        self.edit(|l| l.length = value)
    }
    pub fn set_cast_shadow(self, value: bool) -> Self {
        self.edit(|l| l.cast_shadow = value)
    }
    pub fn set_volumetrics_enabled(self, value: bool) -> Self {
        self.edit(|l| l.volumetrics = value)
    }
    pub fn set_visualizer_enabled(self, value: bool) -> Self {
        self.edit(|l| l.visualizer = value)
    }
    pub fn set_static(self, value: bool) -> Self {
        self.edit(|l| l.is_static = value)
    }
    pub fn set_volumetric_clouds_enabled(self, value: bool) -> Self {
        self.edit(|l| l.volumetric_clouds = value)
    }
    pub fn set_type(self, value: LightType) -> Self {
        self.edit(|l| l.light_type = value)
    }

    pub fn color(&self) -> Option<Vec3> {
        self.get(|l| l.color)
    }
    pub fn intensity(&self) -> Option<f32> {
        self.get(|l| l.intensity)
    }
    pub fn range(&self) -> Option<f32> {
        self.get(|l| l.range)
    }
    pub fn is_casting_shadow(&self) -> Option<bool> {
        self.get(|l| l.cast_shadow)
    }
    pub fn is_volumetrics_enabled(&self) -> Option<bool> {
        self.get(|l| l.volumetrics)
    }
    pub fn is_visualizer_enabled(&self) -> Option<bool> {
        self.get(|l| l.visualizer)
    }
    pub fn is_static(&self) -> Option<bool> {
        self.get(|l| l.is_static)
    }
    pub fn light_type(&self) -> Option<LightType> {
        self.get(|l| l.light_type)
    }
}

impl EmitterView<'_> {
    /// Requests `count` extra particles on the next simulation step.
    pub fn burst(self, count: u32) -> Self {
        self.edit(|e| e.pending_burst = e.pending_burst.saturating_add(count))
    }
    pub fn restart(self) -> Self {
        self.edit(|e| {
            e.pending_burst = 0;
            e.restart_generation = e.restart_generation.wrapping_add(1);
        })
    }
    pub fn set_mesh_vid(self, mesh: Vid) -> Self {
        self.edit(|e| e.mesh = mesh)
    }
    pub fn set_count(self, value: f32) -> Self {
        self.edit(|e| e.count = value)
    }
    pub fn set_life(self, value: f32) -> Self {
        self.edit(|e| e.life = value)
    }
    pub fn set_random_life(self, value: f32) -> Self {
        self.edit(|e| e.random_life = value)
    }
    pub fn set_size(self, value: f32) -> Self {
        self.edit(|e| e.size = value)
    }
    pub fn set_mass(self, value: f32) -> Self {
        self.edit(|e| e.mass = value)
    }
    pub fn set_velocity(self, value: Vec3) -> Self {
        self.edit(|e| e.velocity = value)
    }
    pub fn set_gravity(self, value: Vec3) -> Self {
        self.edit(|e| e.gravity = value)
    }
    pub fn set_drag(self, value: f32) -> Self {
        self.edit(|e| e.drag = value)
    }
    pub fn set_restitution(self, value: f32) -> Self {
        self.edit(|e| e.restitution = value)
    }
    pub fn set_paused(self, value: bool) -> Self {
        self.edit(|e| e.paused = value)
    }
    pub fn set_sorted(self, value: bool) -> Self {
        self.edit(|e| e.sorted = value)
    }
    pub fn set_max_particle_count(self, value: u32) -> Self {
        self.edit(|e| e.max_particle_count = value)
    }

    pub fn mesh_vid(&self) -> Option<Vid> {
        self.get(|e| e.mesh)
    }
    pub fn count(&self) -> Option<f32> {
        self.get(|e| e.count)
    }
    pub fn life(&self) -> Option<f32> {
        self.get(|e| e.life)
    }
    pub fn size(&self) -> Option<f32> {
        self.get(|e| e.size)
    }
    pub fn mass(&self) -> Option<f32> {
        self.get(|e| e.mass)
    }
    pub fn velocity(&self) -> Option<Vec3> {
        self.get(|e| e.velocity)
    }
    pub fn gravity(&self) -> Option<Vec3> {
        self.get(|e| e.gravity)
    }
    pub fn is_paused(&self) -> Option<bool> {
        self.get(|e| e.paused)
    }
    pub fn max_particle_count(&self) -> Option<u32> {
        self.get(|e| e.max_particle_count)
    }
    pub fn pending_burst(&self) -> Option<u32> {
        self.get(|e| e.pending_burst)
    }
}

impl AnimationView<'_> {
    pub fn play(self) -> Self {
        self.edit(Animation::play)
    }
    pub fn pause(self) -> Self {
        self.edit(Animation::pause)
    }
    pub fn stop(self) -> Self {
        self.edit(Animation::stop)
    }
    pub fn set_looped(self, value: bool) -> Self {
        self.edit(|a| a.looped = value)
    }
    pub fn set_root_motion(self, value: bool) -> Self {
        self.edit(|a| a.root_motion = value)
    }

    pub fn is_playing(&self) -> Option<bool> {
        self.get(|a| a.playing)
    }
    pub fn is_looped(&self) -> Option<bool> {
        self.get(|a| a.looped)
    }
    pub fn is_ended(&self) -> Option<bool> {
        self.get(Animation::is_ended)
    }
    pub fn is_root_motion(&self) -> Option<bool> {
        self.get(|a| a.root_motion)
    }
    pub fn length(&self) -> Option<f32> {
        self.get(Animation::length)
    }
}

impl ColliderView<'_> {
    pub fn set_shape(self, value: ColliderShape) -> Self {
        self.edit(|c| c.shape = value)
    }
    pub fn set_radius(self, value: f32) -> Self {
        self.edit(|c| c.radius = value)
    }
    pub fn set_offset(self, value: Vec3) -> Self {
        self.edit(|c| c.offset = value)
    }
    pub fn set_tail(self, value: Vec3) -> Self {
        self.edit(|c| c.tail = value)
    }
    pub fn set_cpu_enabled(self, value: bool) -> Self {
        self.edit(|c| c.cpu_enabled = value)
    }
    pub fn set_gpu_enabled(self, value: bool) -> Self {
        self.edit(|c| c.gpu_enabled = value)
    }

    pub fn shape(&self) -> Option<ColliderShape> {
        self.get(|c| c.shape)
    }
    pub fn radius(&self) -> Option<f32> {
        self.get(|c| c.radius)
    }
    pub fn offset(&self) -> Option<Vec3> {
        self.get(|c| c.offset)
    }
    pub fn tail(&self) -> Option<Vec3> {
        self.get(|c| c.tail)
    }
    pub fn is_cpu_enabled(&self) -> Option<bool> {
        self.get(|c| c.cpu_enabled)
    }
    pub fn is_gpu_enabled(&self) -> Option<bool> {
        self.get(|c| c.gpu_enabled)
    }
}

// ============================================================================
// Weather
// ============================================================================

/// Weather of a scene (scene handle) or of a weather preset entity.
pub struct WeatherView<'a> {
    registry: &'a mut Registry,
    vid: Vid,
}

impl<'a> WeatherView<'a> {
    pub(crate) fn new(registry: &'a mut Registry, vid: Vid) -> Self {
        Self { registry, vid }
    }

    fn resolve(&self) -> Option<&Weather> {
        if let Some(scene) = self.registry.scene(self.vid) {
            return Some(&scene.store().weather);
        }
        self.registry.store_of(self.vid)?.weather_entry(self.vid)
    }

    fn resolve_mut(&mut self) -> Option<&mut Weather> {
        let vid = self.vid;
        if self.registry.scene(vid).is_some() {
            return self.registry.scene_mut(vid).map(|s| &mut s.store_mut().weather);
        }
        self.registry.store_of_mut(vid)?.weather_entry_mut(vid)
    }

    fn edit(mut self, f: impl FnOnce(&mut Weather)) -> Self {
        if let Some(w) = self.resolve_mut() {
            f(w);
            self.registry.touch(self.vid);
        }
        self
    }

    fn get<R>(&self, f: impl FnOnce(&Weather) -> R) -> Option<R> {
        self.resolve().map(f)
    }

    /// Activates the `index`-th weather entry of the scene. Scene handles only.
    pub fn set_weather_preset(self, index: usize) -> Self {
        let vid = self.vid;
        let applied = self
            .registry
            .scene_mut(vid)
            .is_some_and(|s| s.store_mut().set_weather_preset(index));
        if applied {
            self.registry.touch(vid);
        } else {
            log::warn!("Weather preset {index} not available for {vid}");
        }
        self
    }

    pub fn set_ambient(self, value: Vec3) -> Self {
        self.edit(|w| w.ambient = value)
    }
    pub fn set_horizon_color(self, value: Vec3) -> Self {
        self.edit(|w| w.horizon = value)
    }
    pub fn set_zenith_color(self, value: Vec3) -> Self {
        self.edit(|w| w.zenith = value)
    }
    pub fn set_sun_color(self, value: Vec3) -> Self {
        self.edit(|w| w.sun_color = value)
    }
    pub fn set_sky_exposure(self, value: f32) -> Self {
        self.edit(|w| w.sky_exposure = value)
    }
    pub fn set_fog_start(self, value: f32) -> Self {
        self.edit(|w| w.fog_start = value)
    }
    pub fn set_fog_density(self, value: f32) -> Self {
        self.edit(|w| w.fog_density = value)
    }
    pub fn set_height_fog(self, value: bool) -> Self {
        self.edit(|w| w.height_fog = value)
    }
    pub fn set_wind_direction(self, value: Vec3) -> Self {
        self.edit(|w| w.wind_direction = value)
    }
    pub fn set_wind_speed(self, value: f32) -> Self {
        self.edit(|w| w.wind_speed = value)
    }
    pub fn set_gravity(self, value: Vec3) -> Self {
        self.edit(|w| w.gravity = value)
    }
    pub fn set_realistic_sky(self, value: bool) -> Self {
        self.edit(|w| w.realistic_sky = value)
    }

    pub fn ambient(&self) -> Option<Vec3> {
        self.get(|w| w.ambient)
    }
    pub fn horizon_color(&self) -> Option<Vec3> {
        self.get(|w| w.horizon)
    }
    pub fn zenith_color(&self) -> Option<Vec3> {
        self.get(|w| w.zenith)
    }
    pub fn fog_start(&self) -> Option<f32> {
        self.get(|w| w.fog_start)
    }
    pub fn fog_density(&self) -> Option<f32> {
        self.get(|w| w.fog_density)
    }
    pub fn is_fog_enabled(&self) -> Option<bool> {
        self.get(Weather::fog_enabled)
    }
    pub fn wind_direction(&self) -> Option<Vec3> {
        self.get(|w| w.wind_direction)
    }
    pub fn gravity(&self) -> Option<Vec3> {
        self.get(|w| w.gravity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ComponentKind;

    fn setup() -> (Registry, Vid) {
        let mut reg = Registry::default();
        let s = reg.create_scene("s").unwrap();
        (reg, s)
    }

    #[test]
    fn setters_stamp_last_modified() {
        let (mut reg, s) = setup();
        let l = reg
            .create_component(ComponentKind::Light, s, "l", None)
            .unwrap();
        let before = reg.get_component(ComponentKind::Light, l).unwrap().last_modified();
        reg.light(l).set_intensity(5.0).set_cast_shadow(true);
        let after = reg.get_component(ComponentKind::Light, l).unwrap().last_modified();
        assert!(after >= before);
        assert_eq!(reg.light(l).intensity(), Some(5.0));
        assert_eq!(reg.light(l).is_casting_shadow(), Some(true));
    }

    #[test]
    fn stale_handle_is_a_silent_noop() {
        let (mut reg, s) = setup();
        let l = reg
            .create_component(ComponentKind::Light, s, "l", None)
            .unwrap();
        reg.remove_entity(l).unwrap();
        reg.light(l).set_intensity(2.0);
        assert_eq!(reg.light(l).intensity(), None);
        assert!(!reg.light(l).exists());
    }

    #[test]
    fn wrong_kind_does_not_resolve() {
        let (mut reg, s) = setup();
        let e = reg
            .create_component(ComponentKind::Emitter, s, "e", None)
            .unwrap();
        assert!(reg.light(e).color().is_none());
        reg.emitter(e).burst(10).burst(5);
        assert_eq!(reg.emitter(e).pending_burst(), Some(15));
    }

    #[test]
    fn set_pose_round_trips_under_parent() {
        let (mut reg, s) = setup();
        let root = reg
            .create_component(ComponentKind::Base, s, "rig", None)
            .unwrap();
        reg.base(root)
            .set_translate(Vec3::new(3.0, 0.0, 0.0))
            .set_quaternion(Quat::from_rotation_y(0.7));
        let cam = reg
            .create_component(ComponentKind::Camera, s, "cam", Some(root))
            .unwrap();

        let eye = Vec3::new(1.0, 2.0, 5.0);
        let view = Vec3::new(0.0, -0.2, -1.0).normalize();
        reg.camera(cam).set_pose(eye, view, Vec3::Y);

        let (e, v, u) = reg.camera(cam).pose().unwrap();
        assert!((e - eye).length() < 1e-4);
        assert!((v - view).length() < 1e-4);
        assert!(u.dot(v).abs() < 1e-4);
        assert!(u.y > 0.9);
    }

    #[test]
    fn canvas_size_updates_renderer_lazily() {
        let (mut reg, s) = setup();
        let cam = reg
            .create_component(ComponentKind::Camera, s, "cam", None)
            .unwrap();
        reg.camera(cam).set_canvas_size(800.0, 600.0, 144.0);
        assert_eq!(reg.renderer(cam).unwrap().canvas(), (800, 600, 144.0));
        assert_eq!(reg.camera(cam).canvas_size(), Some((800.0, 600.0, 144.0)));
        let (_, _, _, aspect) = reg.camera(cam).perspective_projection().unwrap();
        assert!((aspect - 800.0 / 600.0).abs() < 1e-5);
        assert_eq!(reg.renderer(cam).unwrap().resize_count(), 0);
    }

    #[test]
    fn scene_weather_defaults_and_presets() {
        let (mut reg, s) = setup();
        assert_eq!(reg.weather(s).fog_start(), Some(f32::MAX));
        assert_eq!(reg.weather(s).fog_density(), Some(0.0));
        let w = reg
            .create_component(ComponentKind::Weather, s, "storm", None)
            .unwrap();
        reg.weather(w).set_fog_density(0.3).set_fog_start(5.0);
        reg.weather(s).set_weather_preset(0);
        assert_eq!(reg.weather(s).fog_density(), Some(0.3));
        assert_eq!(reg.weather(s).is_fog_enabled(), Some(true));
    }
}
