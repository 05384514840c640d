//! GPU Service Boundary
//!
//! The facade never talks to a graphics API directly. Render targets, fences
//! and cross-device sharing go through the [`GraphicsDevice`] trait so the
//! host decides which backend drives the frames.
//!
//! [`HeadlessDevice`] is a complete in-memory implementation used when no
//! backend is attached (tests, tooling, server-side scene processing).

mod headless;

pub use headless::HeadlessDevice;

use std::time::Duration;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

use crate::errors::Result;

new_key_type! {
    /// Handle of a device-owned texture.
    pub struct TextureId;
}

/// Opaque host-side object (device or descriptor heap) passed through untouched.
pub type ExternalHandle = usize;

/// Texture formats used by the render targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextureFormat {
    /// Presentable colour target.
    R10G10B10A2Unorm,
    /// Linear intermediate used ahead of colour-space conversion.
    R11G11B10Float,
    R8G8B8A8Unorm,
    D32Float,
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct TextureUsage: u32 {
        const RENDER_TARGET    = 1 << 0;
        const SHADER_RESOURCE  = 1 << 1;
        const UNORDERED_ACCESS = 1 << 2;
        /// Can be opened by a second device.
        const SHARED           = 1 << 3;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureDesc {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub usage: TextureUsage,
}

/// Output colour space of the presentation chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ColorSpace {
    #[default]
    Srgb,
    HdrLinear,
    /// HDR10 with the ST.2084 (PQ) transfer function.
    Hdr10St2084,
}

impl ColorSpace {
    /// Whether rendering needs a linear intermediate followed by a conversion pass.
    #[inline]
    #[must_use]
    pub fn requires_conversion(self) -> bool {
        matches!(self, ColorSpace::Hdr10St2084)
    }
}

/// Opaque GPU service consumed by renderers.
pub trait GraphicsDevice: Send {
    /// `false` while the device is still compiling shaders / warming up.
    fn is_ready(&self) -> bool;

    fn output_color_space(&self) -> ColorSpace;

    fn create_texture(&mut self, desc: &TextureDesc) -> Result<TextureId>;

    fn destroy_texture(&mut self, texture: TextureId);

    fn texture_desc(&self, texture: TextureId) -> Option<&TextureDesc>;

    /// Opens `texture` on an external device and descriptor heap.
    ///
    /// The returned handle is a view: it is invalidated when the texture is
    /// destroyed.
    fn open_shared_resource(
        &mut self,
        texture: TextureId,
        external_device: ExternalHandle,
        external_heap: ExternalHandle,
        slot: u32,
    ) -> Option<u64>;

    /// Submits a frame rendered into `target`; returns its fence value.
    fn submit(&mut self, target: TextureId) -> u64;

    /// Last fence value known to be signalled.
    fn completed_fence(&self) -> u64;

    /// Blocks until `value` is signalled or `timeout` elapses.
    fn wait_for_fence(&mut self, value: u64, timeout: Duration) -> bool;

    /// Fills `target` with the loading screen shown while not ready.
    fn draw_wait_screen(&mut self, target: Option<TextureId>);
}
