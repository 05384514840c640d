//! Plain-data components stored per entity by [`SceneStore`](super::SceneStore).
//!
//! Only cameras and transforms carry behaviour; the remaining components are
//! state that the render path and the host read back.

use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::core::{INVALID_VID, Vid};

// ============================================================================
// Light
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LightType {
    Directional,
    #[default]
    Point,
    Spot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Light {
    pub light_type: LightType,
    pub color: Vec3,
    pub intensity: f32,
    pub range: f32,
    pub outer_cone_angle: f32,
    pub inner_cone_angle: f32,
    pub radius: f32,
    pub length: f32,
    pub cast_shadow: bool,
    pub volumetrics: bool,
    pub visualizer: bool,
    pub is_static: bool,
    pub volumetric_clouds: bool,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            light_type: LightType::Point,
            color: Vec3::ONE,
            intensity: 1.0,
            range: 10.0,
            outer_cone_angle: std::f32::consts::FRAC_PI_4,
            inner_cone_angle: 0.0,
            radius: 0.0,
            length: 0.0,
            cast_shadow: false,
            volumetrics: false,
            visualizer: false,
            is_static: false,
            volumetric_clouds: false,
        }
    }
}

// ============================================================================
// Emitter
// ============================================================================

/// Particle emitter parameters. Simulation is performed by the render path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Emitter {
    pub mesh: Vid,
    pub count: f32,
    pub life: f32,
    pub random_life: f32,
    pub size: f32,
    pub mass: f32,
    pub velocity: Vec3,
    pub gravity: Vec3,
    pub drag: f32,
    pub restitution: f32,
    pub max_particle_count: u32,
    pub paused: bool,
    pub sorted: bool,
    /// Particles requested by `burst` since the last simulation step.
    pub pending_burst: u32,
    /// Bumped by `restart`; the render path drops live particles on change.
    pub restart_generation: u32,
}

impl Default for Emitter {
    fn default() -> Self {
        Self {
            mesh: INVALID_VID,
            count: 0.0,
            life: 1.0,
            random_life: 0.0,
            size: 1.0,
            mass: 1.0,
            velocity: Vec3::ZERO,
            gravity: Vec3::ZERO,
            drag: 1.0,
            restitution: 0.98,
            max_particle_count: 1000,
            paused: false,
            sorted: false,
            pending_burst: 0,
            restart_generation: 0,
        }
    }
}

// ============================================================================
// Animation
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Animation {
    pub start: f32,
    pub end: f32,
    pub timer: f32,
    pub speed: f32,
    pub playing: bool,
    pub looped: bool,
    pub root_motion: bool,
}

impl Default for Animation {
    fn default() -> Self {
        Self {
            start: 0.0,
            end: 0.0,
            timer: 0.0,
            speed: 1.0,
            playing: false,
            looped: true,
            root_motion: false,
        }
    }
}

impl Animation {
    #[inline]
    #[must_use]
    pub fn length(&self) -> f32 {
        self.end - self.start
    }

    #[inline]
    #[must_use]
    pub fn is_ended(&self) -> bool {
        !self.looped && self.timer >= self.end
    }

    pub fn play(&mut self) {
        self.playing = true;
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    pub fn stop(&mut self) {
        self.playing = false;
        self.timer = self.start;
    }

    /// Advances the playhead, wrapping when looped.
    pub fn advance(&mut self, dt: f32) {
        if !self.playing {
            return;
        }
        self.timer += dt * self.speed;
        if self.timer < self.end {
            return;
        }
        let length = self.length();
        if self.looped && length > 0.0 {
            self.timer = self.start + (self.timer - self.start) % length;
        } else {
            self.timer = self.end;
            self.playing = false;
        }
    }
}

// ============================================================================
// Object / Mesh / Material
// ============================================================================

/// Renderable instance referencing a mesh resource.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Object {
    pub mesh: Vid,
    pub cast_shadow: bool,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Mesh {
    pub subset_materials: Vec<Vid>,
    pub vertex_count: u32,
    pub index_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub base_color: Vec4,
    pub roughness: f32,
    pub metalness: f32,
    pub emissive: Vec4,
    pub double_sided: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            base_color: Vec4::ONE,
            roughness: 0.2,
            metalness: 0.0,
            emissive: Vec4::ZERO,
            double_sided: false,
        }
    }
}

// ============================================================================
// Collider
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColliderShape {
    #[default]
    Sphere,
    Capsule,
    Plane,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collider {
    pub shape: ColliderShape,
    pub radius: f32,
    pub offset: Vec3,
    pub tail: Vec3,
    pub cpu_enabled: bool,
    pub gpu_enabled: bool,
}

impl Default for Collider {
    fn default() -> Self {
        Self {
            shape: ColliderShape::Sphere,
            radius: 0.0,
            offset: Vec3::ZERO,
            tail: Vec3::ZERO,
            cpu_enabled: true,
            gpu_enabled: true,
        }
    }
}

// ============================================================================
// Weather
// ============================================================================

/// Sky, fog and wind parameters of a scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weather {
    pub ambient: Vec3,
    pub zenith: Vec3,
    pub horizon: Vec3,
    pub sun_color: Vec3,
    pub sky_exposure: f32,
    pub fog_start: f32,
    pub fog_density: f32,
    pub wind_direction: Vec3,
    pub wind_speed: f32,
    pub gravity: Vec3,
    pub height_fog: bool,
    pub realistic_sky: bool,
}

impl Default for Weather {
    fn default() -> Self {
        Self {
            ambient: Vec3::splat(0.9),
            zenith: Vec3::new(30.0 / 255.0, 40.0 / 255.0, 60.0 / 255.0) * (200.0 / 255.0),
            horizon: Vec3::new(10.0 / 255.0, 10.0 / 255.0, 20.0 / 255.0) * (220.0 / 255.0),
            sun_color: Vec3::ZERO,
            sky_exposure: 1.0,
            fog_start: f32::MAX,
            fog_density: 0.0,
            wind_direction: Vec3::ZERO,
            wind_speed: 1.0,
            gravity: Vec3::new(0.0, -10.0, 0.0),
            height_fog: false,
            realistic_sky: false,
        }
    }
}

impl Weather {
    /// Fog is disabled when it starts at infinity or has no density.
    #[must_use]
    pub fn fog_enabled(&self) -> bool {
        self.fog_start < f32::MAX && self.fog_density > 0.0
    }
}
