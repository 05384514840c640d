//! Per-Camera Renderer
//!
//! A [`Renderer`] is bound to exactly one camera handle. It owns the render
//! targets of that viewport, its frame pacing state and diagnostic overlays.
//!
//! # Resize lifecycle
//!
//! Canvas changes only record the requested logical size and mark the
//! renderer dirty. GPU textures are reallocated lazily by
//! [`Renderer::try_resize_targets`] at the start of a render pass, and only
//! when `(width, height, dpi, colour-space conversion)` differs from the last
//! allocation:
//!
//! ```text
//! Bound(Dirty) --try_resize_targets--> Bound(Clean) --init(new size)--> Bound(Dirty)
//! ```
//!
//! Any shared handle exported from the colour target is invalidated by a
//! reallocation and must be fetched again.

pub mod options;
pub mod timing;

pub use options::{AmbientOcclusion, InfoDisplay, RendererOptions, Tonemap};
pub use timing::{FixedStepper, FpsCounter, FrameTimer};

use std::time::Duration;

use glam::Vec3;

use crate::core::Vid;
use crate::errors::{Result, VizError};
use crate::gpu::{GraphicsDevice, TextureDesc, TextureFormat, TextureId, TextureUsage};
use crate::settings::EngineSettings;

/// Allocation state of a renderer's targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererState {
    /// Logical size or output colour space changed since the last allocation.
    Dirty,
    /// Targets match the logical size.
    Clean,
}

/// Values the current render targets were allocated for.
#[derive(Debug, Clone, Copy, PartialEq)]
struct TargetKey {
    width: u32,
    height: u32,
    dpi: f32,
    conversion: bool,
}

/// Result of [`Renderer::begin_frame`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStep {
    /// Wall-clock frame time in seconds, scaled by `game_speed`.
    pub dt: f32,
    /// Whole fixed-update steps due this frame.
    pub fixed_steps: u32,
}

// ============================================================================
// Fade
// ============================================================================

/// Screen fade: out to a solid colour, then back in.
#[derive(Debug, Clone, Default)]
pub struct FadeState {
    pub color: Vec3,
    duration: f32,
    elapsed: f32,
}

impl FadeState {
    /// Starts a fade lasting `seconds` in total.
    pub fn start(&mut self, seconds: f32, color: Vec3) {
        self.color = color;
        self.duration = seconds.max(0.0);
        self.elapsed = 0.0;
    }

    pub fn update(&mut self, dt: f32) {
        if self.is_active() {
            self.elapsed = (self.elapsed + dt).min(self.duration);
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.duration > 0.0 && self.elapsed < self.duration
    }

    /// Overlay opacity: 0 → 1 over the first half, 1 → 0 over the second.
    #[must_use]
    pub fn opacity(&self) -> f32 {
        if !self.is_active() {
            return 0.0;
        }
        let t = self.elapsed / self.duration;
        1.0 - (2.0 * t - 1.0).abs()
    }
}

// ============================================================================
// Renderer
// ============================================================================

pub struct Renderer {
    camera: Vid,
    scene: Vid,

    width: u32,
    height: u32,
    dpi: f32,
    min_extent: u32,

    state: RendererState,
    allocated_for: Option<TargetKey>,
    color_target: Option<TextureId>,
    intermediate_target: Option<TextureId>,
    resize_count: u64,
    path_generation: u64,

    frame_count: u64,
    fences: Vec<u64>,
    fence_timeout: Duration,

    timer: FrameTimer,
    fps: FpsCounter,
    stepper: FixedStepper,

    pub options: RendererOptions,
    pub info_display: InfoDisplay,
    pub fade: FadeState,
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("camera", &self.camera)
            .field("scene", &self.scene)
            .field("size", &(self.width, self.height, self.dpi))
            .field("state", &self.state)
            .field("frame_count", &self.frame_count)
            .finish_non_exhaustive()
    }
}

impl Renderer {
    /// Creates a dirty renderer sized to the initial canvas of `settings`.
    #[must_use]
    pub fn new(camera: Vid, scene: Vid, settings: &EngineSettings) -> Self {
        let mut renderer = Self {
            camera,
            scene,
            width: 0,
            height: 0,
            dpi: 0.0,
            min_extent: settings.min_canvas_extent.max(1),
            state: RendererState::Dirty,
            allocated_for: None,
            color_target: None,
            intermediate_target: None,
            resize_count: 0,
            path_generation: 0,
            frame_count: 0,
            fences: vec![0; settings.frames_in_flight.max(1)],
            fence_timeout: Duration::from_millis(settings.fence_timeout_ms),
            timer: FrameTimer::new(),
            fps: FpsCounter::new(),
            stepper: FixedStepper::default(),
            options: RendererOptions::default(),
            info_display: settings.default_info_display,
            fade: FadeState::default(),
        };
        renderer.init(
            settings.canvas_init_width,
            settings.canvas_init_height,
            settings.canvas_init_dpi,
        );
        renderer
    }

    // ========================================================================
    // Canvas
    // ========================================================================

    /// Sets the logical canvas, clamped to the minimum extent.
    ///
    /// Marks the renderer dirty only if the size actually changed.
    pub fn init(&mut self, width: u32, height: u32, dpi: f32) {
        let width = width.max(self.min_extent);
        let height = height.max(self.min_extent);
        if (width, height) != (self.width, self.height) || dpi != self.dpi {
            self.width = width;
            self.height = height;
            self.dpi = dpi;
            self.state = RendererState::Dirty;
        }
    }

    /// Logical `(width, height, dpi)`.
    #[must_use]
    pub fn canvas(&self) -> (u32, u32, f32) {
        (self.width, self.height, self.dpi)
    }

    // ========================================================================
    // Render targets
    // ========================================================================

    /// Reallocates the render targets if the canvas or colour space changed.
    ///
    /// Returns `true` when a reallocation happened.
    pub fn try_resize_targets(&mut self, device: &mut dyn GraphicsDevice) -> Result<bool> {
        let key = TargetKey {
            width: self.width,
            height: self.height,
            dpi: self.dpi,
            conversion: device.output_color_space().requires_conversion(),
        };
        if self.allocated_for == Some(key) && self.color_target.is_some() {
            self.state = RendererState::Clean;
            return Ok(false);
        }

        self.release_targets(device);

        if key.conversion {
            self.intermediate_target = Some(device.create_texture(&TextureDesc {
                label: format!("renderInterResult#{}", self.camera),
                width: key.width,
                height: key.height,
                format: TextureFormat::R11G11B10Float,
                usage: TextureUsage::RENDER_TARGET | TextureUsage::SHADER_RESOURCE,
            })?);
        }
        self.color_target = Some(device.create_texture(&TextureDesc {
            label: format!("renderResult#{}", self.camera),
            width: key.width,
            height: key.height,
            format: TextureFormat::R10G10B10A2Unorm,
            usage: TextureUsage::RENDER_TARGET
                | TextureUsage::SHADER_RESOURCE
                | TextureUsage::SHARED,
        })?);

        // Path resources are sized from the targets; start them over.
        self.path_generation += 1;
        self.allocated_for = Some(key);
        self.resize_count += 1;
        self.state = RendererState::Clean;

        log::debug!(
            "Renderer {} targets {}x{} @{}dpi (hdr conversion: {})",
            self.camera,
            key.width,
            key.height,
            key.dpi,
            key.conversion
        );
        Ok(true)
    }

    /// Destroys the owned textures. The renderer becomes dirty.
    pub fn release_targets(&mut self, device: &mut dyn GraphicsDevice) {
        for texture in self.take_targets() {
            device.destroy_texture(texture);
        }
    }

    /// Detaches the owned textures for deferred destruction.
    pub fn take_targets(&mut self) -> Vec<TextureId> {
        self.allocated_for = None;
        self.state = RendererState::Dirty;
        self.color_target
            .take()
            .into_iter()
            .chain(self.intermediate_target.take())
            .collect()
    }

    // ========================================================================
    // Frame
    // ========================================================================

    /// Measures the frame, applies the frame-rate lock and fixed-step accounting.
    pub fn begin_frame(&mut self, settings: &EngineSettings) -> FrameStep {
        let step = Duration::from_secs_f32(settings.fixed_step());

        if settings.framerate_lock {
            let spent = self.timer.peek();
            if spent < step {
                std::thread::sleep(step - spent);
            }
        }

        self.timer.tick();
        if let Some(fps) = self.fps.update() {
            log::trace!("Renderer {} fps {:.1}", self.camera, fps);
        }

        let fixed_steps = if settings.frameskip {
            self.stepper.advance(self.timer.delta, step)
        } else {
            0
        };

        let dt = self.timer.dt_seconds() * self.options.game_speed;
        self.fade.update(dt);
        FrameStep { dt, fixed_steps }
    }

    /// Submits the frame and records its fence in the ring.
    ///
    /// Waits for the fence previously stored in the slot being reused, so at
    /// most `frames_in_flight` frames are outstanding.
    pub fn submit(&mut self, device: &mut dyn GraphicsDevice) -> Result<u64> {
        let target = self.color_target.ok_or_else(|| {
            VizError::Device(format!("renderer {} has no colour target", self.camera))
        })?;

        let slot = (self.frame_count % self.fences.len() as u64) as usize;
        let pending = self.fences[slot];
        if pending > device.completed_fence() && !device.wait_for_fence(pending, self.fence_timeout)
        {
            log::warn!(
                "Renderer {}: fence {} not signalled within {:?}",
                self.camera,
                pending,
                self.fence_timeout
            );
        }

        let fence = device.submit(target);
        self.fences[slot] = fence;
        self.frame_count += 1;
        Ok(fence)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn camera(&self) -> Vid {
        self.camera
    }

    /// Scene the bound camera lives in.
    #[inline]
    #[must_use]
    pub fn scene(&self) -> Vid {
        self.scene
    }

    pub(crate) fn rebind_scene(&mut self, scene: Vid) {
        self.scene = scene;
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> RendererState {
        self.state
    }

    #[inline]
    #[must_use]
    pub fn color_target(&self) -> Option<TextureId> {
        self.color_target
    }

    #[inline]
    #[must_use]
    pub fn intermediate_target(&self) -> Option<TextureId> {
        self.intermediate_target
    }

    /// Number of target reallocations so far.
    #[inline]
    #[must_use]
    pub fn resize_count(&self) -> u64 {
        self.resize_count
    }

    /// Incremented every time path resources are restarted.
    #[inline]
    #[must_use]
    pub fn path_generation(&self) -> u64 {
        self.path_generation
    }

    #[inline]
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    #[inline]
    #[must_use]
    pub fn fps(&self) -> f32 {
        self.fps.current_fps
    }
}
