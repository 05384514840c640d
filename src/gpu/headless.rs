use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use slotmap::{Key, SlotMap};

use super::{ColorSpace, ExternalHandle, GraphicsDevice, TextureDesc, TextureId, TextureUsage};
use crate::errors::{Result, VizError};

/// In-memory [`GraphicsDevice`].
///
/// Tracks texture descriptors and fence values without touching a GPU.
/// Submissions complete immediately.
#[derive(Debug)]
pub struct HeadlessDevice {
    textures: SlotMap<TextureId, TextureDesc>,
    ready: Arc<AtomicBool>,
    color_space: ColorSpace,
    next_fence: u64,
    completed: u64,
    allocations: u64,
    wait_screens: u64,
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessDevice {
    #[must_use]
    pub fn new() -> Self {
        Self {
            textures: SlotMap::with_key(),
            ready: Arc::new(AtomicBool::new(true)),
            color_space: ColorSpace::Srgb,
            next_fence: 0,
            completed: 0,
            allocations: 0,
            wait_screens: 0,
        }
    }

    #[must_use]
    pub fn with_color_space(mut self, color_space: ColorSpace) -> Self {
        self.color_space = color_space;
        self
    }

    /// Starts in the warming-up state; flip the returned switch to finish.
    #[must_use]
    pub fn warming_up() -> (Self, Arc<AtomicBool>) {
        let device = Self::new();
        device.ready.store(false, Ordering::Release);
        let switch = device.ready.clone();
        (device, switch)
    }

    /// Total textures created over the device lifetime.
    #[must_use]
    pub fn allocations(&self) -> u64 {
        self.allocations
    }

    #[must_use]
    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    #[must_use]
    pub fn wait_screens_drawn(&self) -> u64 {
        self.wait_screens
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    fn output_color_space(&self) -> ColorSpace {
        self.color_space
    }

    fn create_texture(&mut self, desc: &TextureDesc) -> Result<TextureId> {
        if desc.width == 0 || desc.height == 0 {
            return Err(VizError::Device(format!(
                "zero-sized texture '{}' ({}x{})",
                desc.label, desc.width, desc.height
            )));
        }
        self.allocations += 1;
        log::trace!(
            "Create texture '{}' {}x{} {:?}",
            desc.label,
            desc.width,
            desc.height,
            desc.format
        );
        Ok(self.textures.insert(desc.clone()))
    }

    fn destroy_texture(&mut self, texture: TextureId) {
        self.textures.remove(texture);
    }

    fn texture_desc(&self, texture: TextureId) -> Option<&TextureDesc> {
        self.textures.get(texture)
    }

    fn open_shared_resource(
        &mut self,
        texture: TextureId,
        _external_device: ExternalHandle,
        _external_heap: ExternalHandle,
        slot: u32,
    ) -> Option<u64> {
        let desc = self.textures.get(texture)?;
        if !desc.usage.contains(TextureUsage::SHARED) {
            log::warn!("Texture '{}' was not created shareable", desc.label);
            return None;
        }
        // Key data is never zero for a live key; fold the slot into the high bits.
        Some(texture.data().as_ffi() ^ (u64::from(slot) << 48))
    }

    fn submit(&mut self, target: TextureId) -> u64 {
        if !self.textures.contains_key(target) {
            log::warn!("Submit to a destroyed texture");
        }
        self.next_fence += 1;
        self.completed = self.next_fence;
        self.next_fence
    }

    fn completed_fence(&self) -> u64 {
        self.completed
    }

    fn wait_for_fence(&mut self, value: u64, _timeout: Duration) -> bool {
        self.completed >= value
    }

    fn draw_wait_screen(&mut self, _target: Option<TextureId>) {
        self.wait_screens += 1;
    }
}
