//! Engine Facade
//!
//! [`Engine`] is the host-facing entry point. It owns the [`Registry`], the
//! [`GraphicsDevice`], the importer table and the background load queue, and
//! translates internal `Result`s into the sentinel contract hosts rely on:
//! invalid handles ([`INVALID_VID`]), `None`, or a [`VzResult`] code. Errors
//! are logged where they are swallowed, so no public operation panics on bad
//! input.
//!
//! # Lifecycle
//!
//! 1. Create with [`Engine::new`] or [`Engine::headless`]
//! 2. [`Engine::init`] once (installs the logger)
//! 3. Build scenes, then [`Engine::render`] each camera per frame and
//!    [`Engine::poll_loads`] to install finished background loads
//! 4. [`Engine::deinit`] (also run on drop)
//!
//! # Example
//!
//! ```rust,ignore
//! use vizm::{ComponentKind, Engine, INVALID_VID};
//!
//! let mut engine = Engine::headless();
//! engine.init();
//!
//! let scene = engine.new_scene("main");
//! let cam = engine.new_scene_component(ComponentKind::Camera, scene, "cam", INVALID_VID);
//! engine.registry_mut().camera(cam).set_canvas_size(1280.0, 720.0, 96.0);
//!
//! loop {
//!     engine.poll_loads();
//!     engine.render(cam, true);
//! }
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::core::{ComponentKind, INVALID_VID, Vid};
use crate::errors::{Result, VizError, VzResult};
use crate::gpu::{ExternalHandle, GraphicsDevice, HeadlessDevice};
use crate::loader::{
    self, FileType, ImporterRegistry, LoadCallback, LoadOutcome, LoadQueue, LoadTicket,
    SceneImporter,
};
use crate::registry::{ComponentWrapper, Registry};
use crate::renderer::InfoDisplay;
use crate::settings::EngineSettings;

/// Name of the diagnostics-only scene.
pub const INTERNAL_SCENE_NAME: &str = "__VZM_ENGINE_INTERNAL__";
/// Name of the camera rendering the profiling overlay.
pub const INFO_CANVAS_NAME: &str = "INFO_CANVAS";

/// Colour target of a renderer opened on an external device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SharedRenderTarget {
    pub handle: u64,
    pub width: u32,
    pub height: u32,
}

/// Cameras that rendered a scene during its current tick.
///
/// A tick ends when a camera that already rendered in it renders again.
#[derive(Debug, Default)]
struct SceneTick {
    rendered: SmallVec<[Vid; 4]>,
    updated: bool,
}

impl SceneTick {
    /// Registers a render of `camera` and decides whether it drives the
    /// scene update. At most one render per tick does.
    fn enter(&mut self, camera: Vid, update_scene: bool, first_frame: bool) -> bool {
        if self.rendered.contains(&camera) {
            self.rendered.clear();
            self.updated = false;
        }
        self.rendered.push(camera);

        let drive = !self.updated && (update_scene || first_frame);
        self.updated |= drive;
        drive
    }
}

pub struct Engine {
    settings: EngineSettings,
    registry: Registry,
    device: Box<dyn GraphicsDevice>,
    importers: ImporterRegistry,
    loads: LoadQueue,
    ticks: FxHashMap<Vid, SceneTick>,
    profiling_camera: Option<Vid>,
    initialized: bool,
}

impl Engine {
    #[must_use]
    pub fn new(settings: EngineSettings, device: Box<dyn GraphicsDevice>) -> Self {
        Self {
            registry: Registry::new(settings.clone()),
            settings,
            device,
            importers: ImporterRegistry::new(),
            loads: LoadQueue::new(),
            ticks: FxHashMap::default(),
            profiling_camera: None,
            initialized: false,
        }
    }

    /// Engine over a [`HeadlessDevice`] with default settings.
    #[must_use]
    pub fn headless() -> Self {
        Self::new(EngineSettings::default(), Box::new(HeadlessDevice::new()))
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Initializes the engine. A second call is a `Warning` no-op.
    pub fn init(&mut self) -> VzResult {
        if self.initialized {
            log::warn!("{}", VizError::AlreadyInitialized);
            return VizError::AlreadyInitialized.code();
        }
        install_logger(&self.settings.log_filter);
        self.initialized = true;
        log::info!("{} initialized", self.settings.core_name);
        VzResult::Ok
    }

    /// Releases every scene, renderer and wrapper and cancels pending loads.
    pub fn deinit(&mut self) -> VzResult {
        if !self.initialized {
            log::warn!("Deinit without a matching init");
            return VzResult::Warning;
        }
        self.loads.cancel_all();
        self.loads = LoadQueue::new();
        self.registry.clear();
        self.release_retired_targets();
        self.ticks.clear();
        self.profiling_camera = None;
        self.initialized = false;
        log::info!("{} deinitialized", self.settings.core_name);
        VzResult::Ok
    }

    #[inline]
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    #[inline]
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Direct registry access for typed views and the arcball.
    #[inline]
    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    #[inline]
    #[must_use]
    pub fn device(&self) -> &dyn GraphicsDevice {
        self.device.as_ref()
    }

    #[inline]
    pub fn device_mut(&mut self) -> &mut dyn GraphicsDevice {
        self.device.as_mut()
    }

    // ========================================================================
    // Scenes and components
    // ========================================================================

    /// Creates a scene; `INVALID_VID` on failure (e.g. duplicate name).
    pub fn new_scene(&mut self, name: &str) -> Vid {
        vid_or_log(self.registry.create_scene(name), "NewScene")
    }

    /// Creates a component; `parent` may be `INVALID_VID` or the scene handle.
    pub fn new_scene_component(
        &mut self,
        kind: ComponentKind,
        scene: Vid,
        name: &str,
        parent: Vid,
    ) -> Vid {
        let parent = (parent != INVALID_VID).then_some(parent);
        vid_or_log(
            self.registry.create_component(kind, scene, name, parent),
            "NewSceneComponent",
        )
    }

    /// Re-parents `vid`; returns its scene, or `INVALID_VID` on failure.
    pub fn append_component_to(&mut self, vid: Vid, parent: Vid) -> Vid {
        vid_or_log(
            self.registry.append_component_to(vid, parent),
            "AppendComponentTo",
        )
    }

    /// Removes a scene or an entity subtree with its wrappers and renderers.
    pub fn remove_component(&mut self, vid: Vid) -> VzResult {
        let result = self.registry.remove_entity(vid);
        self.release_retired_targets();
        self.prune_ticks();
        if self.profiling_camera.is_some_and(|c| self.registry.renderer(c).is_none()) {
            self.profiling_camera = None;
        }
        code_or_log(result, "RemoveComponent")
    }

    #[must_use]
    pub fn get_component(&self, kind: ComponentKind, vid: Vid) -> Option<&ComponentWrapper> {
        self.registry.get_component(kind, vid)
    }

    pub fn get_component_mut(
        &mut self,
        kind: ComponentKind,
        vid: Vid,
    ) -> Option<&mut ComponentWrapper> {
        self.registry.get_component_mut(kind, vid)
    }

    /// Handles of `kind` in `scene`; empty when the scene is unknown.
    #[must_use]
    pub fn get_scene_component_vids(&self, kind: ComponentKind, scene: Vid) -> Vec<Vid> {
        match self.registry.scene_component_vids(kind, scene) {
            Ok(vids) => vids,
            Err(e) => {
                log::error!("GetSceneComponentVids: {e}");
                Vec::new()
            }
        }
    }

    #[must_use]
    pub fn get_first_vid_by_name(&self, name: &str) -> Vid {
        self.registry.find_by_name(name).unwrap_or(INVALID_VID)
    }

    #[must_use]
    pub fn get_vids_by_name(&self, name: &str) -> Vec<Vid> {
        self.registry.find_all_by_name(name)
    }

    #[must_use]
    pub fn get_name_by_vid(&self, vid: Vid) -> Option<String> {
        self.registry.name_of(vid)
    }

    /// Merges scene `src` into `dst`; `src` is removed on success.
    pub fn merge_scenes(&mut self, src: Vid, dst: Vid) -> VzResult {
        let result = self.registry.merge_scenes(src, dst);
        self.prune_ticks();
        code_or_log(result, "MergeScenes")
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Registers the importer used for `file_type`.
    pub fn register_importer(&mut self, file_type: FileType, importer: Arc<dyn SceneImporter>) {
        self.importers.register(file_type, importer);
    }

    /// Loads `path` into a new scene. Returns `(scene, root)`, both
    /// `INVALID_VID` on failure. An empty `scene_name` uses the file stem.
    pub fn load_file_into_new_scene(
        &mut self,
        path: impl AsRef<Path>,
        root_name: &str,
        scene_name: &str,
    ) -> (Vid, Vid) {
        let path = path.as_ref();
        match loader::load_into_new_scene(
            &mut self.registry,
            &self.importers,
            path,
            root_name,
            scene_name,
        ) {
            Ok(pair) => pair,
            Err(e) => {
                log::error!("LoadFileIntoNewScene '{}': {e}", path.display());
                (INVALID_VID, INVALID_VID)
            }
        }
    }

    /// Starts a background load. `callback` runs inside [`poll_loads`](Self::poll_loads).
    ///
    /// `None` when the file type is unsupported or has no importer.
    pub fn load_file_into_new_scene_async(
        &mut self,
        path: impl AsRef<Path>,
        root_name: &str,
        scene_name: &str,
        callback: impl FnOnce(Vid, Vid) + 'static,
    ) -> Option<LoadTicket> {
        let path = path.as_ref();
        let importer = match self.importers.resolve(path) {
            Ok(importer) => importer,
            Err(e) => {
                log::error!("LoadFileIntoNewSceneAsync '{}': {e}", path.display());
                return None;
            }
        };
        let callback: LoadCallback = Box::new(callback);
        Some(self.loads.submit(
            importer,
            self.registry.allocator().clone(),
            path,
            root_name,
            scene_name,
            Some(callback),
        ))
    }

    /// Installs finished background loads and runs their callbacks.
    pub fn poll_loads(&mut self) -> Vec<LoadOutcome> {
        self.loads.poll(&mut self.registry)
    }

    /// Like [`poll_loads`](Self::poll_loads), waiting up to `timeout` for
    /// the next load to finish.
    pub fn wait_loads(&mut self, timeout: Duration) -> Vec<LoadOutcome> {
        self.loads.poll_timeout(&mut self.registry, timeout)
    }

    #[must_use]
    pub fn pending_loads(&self) -> usize {
        self.loads.pending()
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    /// Renders one frame for `camera`.
    ///
    /// `update_scene = false` keeps scene simulation frozen for this call
    /// while still rendering with the current camera pose. Returns `JobWait`
    /// while the device is warming up or the engine is not initialized.
    pub fn render(&mut self, camera: Vid, update_scene: bool) -> VzResult {
        match self.try_render(camera, update_scene) {
            Ok(code) => code,
            Err(e) => {
                let code = e.code();
                if code == VzResult::JobWait {
                    log::warn!("Render {camera}: {e}");
                } else {
                    log::error!("Render {camera}: {e}");
                }
                code
            }
        }
    }

    fn try_render(&mut self, camera: Vid, update_scene: bool) -> Result<VzResult> {
        if !self.initialized {
            return Err(VizError::NotInitialized);
        }
        self.release_retired_targets();

        let (renderer, store) = self
            .registry
            .renderer_and_store_mut(camera)
            .ok_or(VizError::NoRenderer(camera))?;

        if !store.refresh_camera(camera) {
            return Err(VizError::CameraNotResolved(camera));
        }
        renderer.try_resize_targets(self.device.as_mut())?;

        if !self.device.is_ready() {
            self.device.draw_wait_screen(renderer.color_target());
            return Ok(VzResult::JobWait);
        }

        let step = renderer.begin_frame(&self.settings);
        let first_frame = renderer.frame_count() == 0;
        let drive = self
            .ticks
            .entry(renderer.scene())
            .or_default()
            .enter(camera, update_scene, first_frame);
        if drive {
            store.update(step.dt);
            if step.fixed_steps > 0 {
                log::trace!("Scene {}: {} fixed steps", renderer.scene(), step.fixed_steps);
            }
        }

        let fence = renderer.submit(self.device.as_mut())?;
        log::trace!("Camera {camera} frame submitted (fence {fence})");
        Ok(VzResult::Ok)
    }

    /// Opens the colour target of `camera` on an external device.
    ///
    /// The handle is invalidated by the next resize of that renderer.
    pub fn shared_render_target(
        &mut self,
        camera: Vid,
        external_device: ExternalHandle,
        external_heap: ExternalHandle,
        slot: u32,
    ) -> Option<SharedRenderTarget> {
        let target = self.registry.renderer(camera)?.color_target()?;
        let (width, height) = self
            .device
            .texture_desc(target)
            .map(|d| (d.width, d.height))?;
        let handle = self
            .device
            .open_shared_resource(target, external_device, external_heap, slot)?;
        Some(SharedRenderTarget {
            handle,
            width,
            height,
        })
    }

    /// Renders the profiling overlay into an internal `width` x `height`
    /// canvas and returns its camera; `INVALID_VID` while the device is not
    /// ready.
    pub fn display_engine_profiling(&mut self, width: u32, height: u32) -> Vid {
        if !self.device.is_ready() {
            return INVALID_VID;
        }
        let camera = match self.profiling_camera {
            Some(cam) if self.registry.renderer(cam).is_some() => cam,
            _ => match self.create_profiling_camera() {
                Ok(cam) => cam,
                Err(e) => {
                    log::error!("DisplayEngineProfiling: {e}");
                    return INVALID_VID;
                }
            },
        };

        let dpi = self.settings.canvas_init_dpi;
        self.registry
            .camera(camera)
            .set_canvas_size(width as f32, height as f32, dpi);
        if self.render(camera, false).is_fail() {
            return INVALID_VID;
        }
        camera
    }

    fn create_profiling_camera(&mut self) -> Result<Vid> {
        let scene = match self.registry.find_scene_by_name(INTERNAL_SCENE_NAME) {
            Some(scene) => scene,
            None => self.registry.create_scene(INTERNAL_SCENE_NAME)?,
        };
        let camera = self
            .registry
            .create_component(ComponentKind::Camera, scene, INFO_CANVAS_NAME, None)?;
        if let Some(renderer) = self.registry.renderer_mut(camera) {
            renderer.info_display = InfoDisplay::profiling();
        }
        self.profiling_camera = Some(camera);
        Ok(camera)
    }

    // ========================================================================
    // Internal
    // ========================================================================

    fn release_retired_targets(&mut self) {
        for texture in self.registry.take_retired_targets() {
            self.device.destroy_texture(texture);
        }
    }

    fn prune_ticks(&mut self) {
        let registry = &self.registry;
        self.ticks.retain(|scene, _| registry.scene(*scene).is_some());
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if self.initialized {
            log::warn!("Engine dropped without deinit");
            self.deinit();
        }
    }
}

fn install_logger(filter: &str) {
    let env = env_logger::Env::default().default_filter_or(filter);
    if env_logger::Builder::from_env(env).try_init().is_err() {
        log::debug!("A logger is already installed, keeping it");
    }
}

fn vid_or_log(result: Result<Vid>, op: &str) -> Vid {
    result.unwrap_or_else(|e| {
        log::error!("{op}: {e}");
        INVALID_VID
    })
}

fn code_or_log(result: Result<()>, op: &str) -> VzResult {
    match result {
        Ok(()) => VzResult::Ok,
        Err(e) => {
            log::error!("{op}: {e}");
            e.code()
        }
    }
}
