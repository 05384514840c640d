//! Per-renderer feature toggles and diagnostic overlays.
//!
//! [`RendererOptions`] mirrors the post-processing and debug switches a host
//! can flip per viewport. The render path reads them each frame; changing an
//! option never reallocates render targets.

use bitflags::bitflags;
use glam::Vec4;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Text/graph overlays drawn on top of a renderer's output.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct InfoDisplay: u32 {
        /// Master switch; nothing is drawn without it.
        const ACTIVE          = 1 << 0;
        const WATERMARK       = 1 << 1;
        const FPS             = 1 << 2;
        const RESOLUTION      = 1 << 3;
        const COLORSPACE      = 1 << 4;
        const HEAP_ALLOCATION = 1 << 5;
        const PIPELINE_COUNT  = 1 << 6;
        const VRAM_USAGE      = 1 << 7;
        const DEVICE_NAME     = 1 << 8;
        const ENGINE_NAME     = 1 << 9;
        const PROFILER        = 1 << 10;
    }
}

impl InfoDisplay {
    /// Overlay set used by the engine profiling canvas.
    #[must_use]
    pub fn profiling() -> Self {
        Self::ACTIVE
            | Self::WATERMARK
            | Self::FPS
            | Self::RESOLUTION
            | Self::COLORSPACE
            | Self::HEAP_ALLOCATION
            | Self::VRAM_USAGE
            | Self::DEVICE_NAME
            | Self::ENGINE_NAME
            | Self::PROFILER
    }
}

/// Tone mapping operator of the post chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Tonemap {
    Reinhard,
    #[default]
    Aces,
}

/// Ambient occlusion technique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AmbientOcclusion {
    #[default]
    Disabled,
    Ssao,
    Hbao,
    Msao,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererOptions {
    // -- Post processing --
    pub exposure: f32,
    pub brightness: f32,
    pub contrast: f32,
    pub saturation: f32,
    pub tonemap: Tonemap,
    pub bloom: bool,
    pub bloom_threshold: f32,
    pub fxaa: bool,
    pub temporal_aa: bool,
    pub msaa_samples: u32,
    pub outline: bool,
    pub outline_threshold: f32,
    pub outline_thickness: f32,
    pub outline_color: Vec4,

    // -- Lighting --
    pub shadows: bool,
    pub reflections: bool,
    pub ao: AmbientOcclusion,
    pub ao_range: f32,
    pub ao_power: f32,
    pub volume_lights: bool,

    // -- Debug --
    pub wire_render: bool,
    pub grid_helper: bool,
    pub debug_cameras: bool,
    pub debug_colliders: bool,
    pub debug_emitters: bool,
    pub occlusion_culling: bool,

    /// Multiplier on the scene `dt` used by this renderer's updates.
    pub game_speed: f32,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            exposure: 1.0,
            brightness: 0.0,
            contrast: 1.0,
            saturation: 1.0,
            tonemap: Tonemap::Aces,
            bloom: true,
            bloom_threshold: 1.0,
            fxaa: false,
            temporal_aa: false,
            msaa_samples: 1,
            outline: false,
            outline_threshold: 0.2,
            outline_thickness: 1.0,
            outline_color: Vec4::new(0.0, 0.0, 0.0, 1.0),
            shadows: true,
            reflections: true,
            ao: AmbientOcclusion::Disabled,
            ao_range: 1.0,
            ao_power: 1.0,
            volume_lights: true,
            wire_render: false,
            grid_helper: false,
            debug_cameras: false,
            debug_colliders: false,
            debug_emitters: false,
            occlusion_culling: true,
            game_speed: 1.0,
        }
    }
}
