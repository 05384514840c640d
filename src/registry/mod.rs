//! Handle Registry
//!
//! [`Registry`] is the single source of truth mapping handles to scenes,
//! renderers and component wrappers. It is an explicit value owned by the
//! [`Engine`](crate::Engine) and is not safe for concurrent mutation.
//!
//! Entity lookups go through an entity→scene index maintained on create,
//! merge and remove, so resolving a handle never scans the scene list.
//!
//! # Invariants
//!
//! - Every camera with a wrapper has exactly one [`Renderer`], and vice versa.
//! - Every wrapper names an entity that lives in exactly one scene.
//! - Removing a scene or entity removes the renderers and wrappers of every
//!   entity it took with it.

mod merge;
pub mod views;
pub mod wrapper;

pub use views::{
    AnimationView, BaseView, CameraView, ColliderView, EmitterView, LightView, WeatherView,
};
pub use wrapper::ComponentWrapper;

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

use crate::core::{ComponentKind, EntityAllocator, INVALID_VID, Vid};
use crate::errors::{Result, VizError};
use crate::gpu::TextureId;
use crate::renderer::Renderer;
use crate::scene::{Camera, SceneStore, Transform};
use crate::settings::EngineSettings;

// ============================================================================
// Scene record
// ============================================================================

/// A named scene: engine storage plus its active-weather wrapper.
#[derive(Debug)]
pub struct Scene {
    handle: Vid,
    name: String,
    store: SceneStore,
    active_weather: ComponentWrapper,
}

impl Scene {
    #[inline]
    #[must_use]
    pub fn handle(&self) -> Vid {
        self.handle
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn store(&self) -> &SceneStore {
        &self.store
    }

    #[inline]
    pub fn store_mut(&mut self) -> &mut SceneStore {
        &mut self.store
    }

    /// Wrapper of the scene's active weather (`handle` is the scene handle).
    #[inline]
    #[must_use]
    pub fn active_weather(&self) -> &ComponentWrapper {
        &self.active_weather
    }
}

// ============================================================================
// Registry
// ============================================================================

pub struct Registry {
    settings: EngineSettings,
    allocator: EntityAllocator,

    scenes: BTreeMap<Vid, Scene>,
    renderers: FxHashMap<Vid, Renderer>,
    wrappers: FxHashMap<Vid, ComponentWrapper>,
    /// entity → owning scene
    entity_index: FxHashMap<Vid, Vid>,

    /// Targets of destroyed renderers awaiting release on the device.
    retired_targets: Vec<TextureId>,
}

impl Registry {
    #[must_use]
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            allocator: EntityAllocator::new(),
            scenes: BTreeMap::new(),
            renderers: FxHashMap::default(),
            wrappers: FxHashMap::default(),
            entity_index: FxHashMap::default(),
            retired_targets: Vec::new(),
        }
    }

    /// Allocator shared with scene stores and load workers.
    #[inline]
    #[must_use]
    pub fn allocator(&self) -> &EntityAllocator {
        &self.allocator
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    // ========================================================================
    // Scenes
    // ========================================================================

    /// Creates an empty scene with default weather.
    pub fn create_scene(&mut self, name: &str) -> Result<Vid> {
        let store = SceneStore::new(self.allocator.clone());
        self.install_scene(name, store)
    }

    /// Registers a populated store as a new scene and indexes its entities.
    ///
    /// No wrappers or renderers are created for the installed entities.
    pub fn install_scene(&mut self, name: &str, store: SceneStore) -> Result<Vid> {
        if self.scenes.values().any(|s| s.name == name) {
            return Err(VizError::DuplicateSceneName(name.to_string()));
        }
        let handle = self.allocator.allocate();
        if handle == INVALID_VID {
            return Err(VizError::HandleSpaceExhausted);
        }

        for &entity in store.find_all_entities() {
            self.entity_index.insert(entity, handle);
        }
        log::info!(
            "Scene '{}' ({}) created with {} entities",
            name,
            handle,
            store.len()
        );
        self.scenes.insert(
            handle,
            Scene {
                handle,
                name: name.to_string(),
                store,
                active_weather: ComponentWrapper::new(handle, ComponentKind::Weather),
            },
        );
        Ok(handle)
    }

    #[inline]
    #[must_use]
    pub fn scene(&self, vid: Vid) -> Option<&Scene> {
        self.scenes.get(&vid)
    }

    #[inline]
    pub fn scene_mut(&mut self, vid: Vid) -> Option<&mut Scene> {
        self.scenes.get_mut(&vid)
    }

    /// Live scenes in creation order.
    pub fn scenes(&self) -> impl Iterator<Item = &Scene> {
        self.scenes.values()
    }

    #[must_use]
    pub fn find_scene_by_name(&self, name: &str) -> Option<Vid> {
        self.scenes
            .values()
            .find(|s| s.name == name)
            .map(|s| s.handle)
    }

    // ========================================================================
    // Entity resolution
    // ========================================================================

    /// Scene owning `entity`.
    #[inline]
    #[must_use]
    pub fn scene_of(&self, entity: Vid) -> Option<Vid> {
        self.entity_index.get(&entity).copied()
    }

    #[must_use]
    pub fn store_of(&self, entity: Vid) -> Option<&SceneStore> {
        let scene = self.scene_of(entity)?;
        self.scenes.get(&scene).map(|s| &s.store)
    }

    pub fn store_of_mut(&mut self, entity: Vid) -> Option<&mut SceneStore> {
        let scene = self.scene_of(entity)?;
        self.scenes.get_mut(&scene).map(|s| &mut s.store)
    }

    #[must_use]
    pub fn engine_camera(&self, vid: Vid) -> Option<&Camera> {
        self.store_of(vid)?.camera(vid)
    }

    pub fn engine_camera_mut(&mut self, vid: Vid) -> Option<&mut Camera> {
        self.store_of_mut(vid)?.camera_mut(vid)
    }

    #[must_use]
    pub fn engine_transform(&self, vid: Vid) -> Option<&Transform> {
        self.store_of(vid)?.transform(vid)
    }

    pub fn engine_transform_mut(&mut self, vid: Vid) -> Option<&mut Transform> {
        self.store_of_mut(vid)?.transform_mut(vid)
    }

    // ========================================================================
    // Components
    // ========================================================================

    /// Creates an entity of `kind` in `scene` and registers its wrapper.
    ///
    /// Cameras also get a bound [`Renderer`] at the initial canvas size.
    /// `parent` is honoured when it names a transform entity of the same
    /// scene; the scene handle itself means "root".
    pub fn create_component(
        &mut self,
        kind: ComponentKind,
        scene: Vid,
        name: &str,
        parent: Option<Vid>,
    ) -> Result<Vid> {
        let init_w = self.settings.canvas_init_width as f32;
        let init_h = self.settings.canvas_init_height as f32;

        let store = &mut self
            .scenes
            .get_mut(&scene)
            .ok_or(VizError::SceneNotFound(scene))?
            .store;

        let vid = match kind {
            ComponentKind::Base => store.create_node(name)?,
            ComponentKind::Camera => {
                let vid = store.create_camera(name)?;
                if let Some(cam) = store.camera_mut(vid) {
                    cam.create_perspective(
                        init_w,
                        init_h,
                        Camera::DEFAULT_NEAR,
                        Camera::DEFAULT_FAR,
                        Camera::DEFAULT_FOV,
                    );
                }
                vid
            }
            ComponentKind::Actor => store.create_object(name)?,
            ComponentKind::Geometry => store.create_mesh(name)?,
            ComponentKind::Material => store.create_material(name)?,
            ComponentKind::Light => store.create_light(name)?,
            ComponentKind::Emitter => store.create_emitter(name)?,
            ComponentKind::Collider => store.create_collider(name)?,
            ComponentKind::Weather => store.create_weather(name)?,
            ComponentKind::Animation | ComponentKind::Undefined => {
                return Err(VizError::UnsupportedKind(kind));
            }
        };

        if let Some(parent) = parent.filter(|p| *p != INVALID_VID && *p != scene) {
            if store.contains(parent) {
                if let Err(err) = store.attach(vid, parent) {
                    log::warn!("'{name}': {err}");
                }
            } else {
                log::warn!("'{name}': parent {parent} is not in scene {scene}, created at root");
            }
        }

        self.entity_index.insert(vid, scene);
        self.wrappers.insert(vid, ComponentWrapper::new(vid, kind));

        if kind == ComponentKind::Camera
            && let Err(err) = self.bind_renderer(vid)
        {
            self.erase_entities(&[vid]);
            if let Some(s) = self.scenes.get_mut(&scene) {
                s.store.remove_entity(vid);
            }
            return Err(err);
        }

        log::debug!("Component {kind:?} '{name}' ({vid}) created in scene {scene}");
        Ok(vid)
    }

    /// Wrapper of `vid` if it has exactly `kind`.
    ///
    /// `Base` matches any wrapper; `Weather` on a scene handle yields the
    /// scene's active weather.
    #[must_use]
    pub fn get_component(&self, kind: ComponentKind, vid: Vid) -> Option<&ComponentWrapper> {
        if let Some(w) = self.wrappers.get(&vid) {
            return (kind == ComponentKind::Base || w.kind() == kind).then_some(w);
        }
        if kind == ComponentKind::Weather {
            return self.scenes.get(&vid).map(|s| &s.active_weather);
        }
        None
    }

    pub fn get_component_mut(
        &mut self,
        kind: ComponentKind,
        vid: Vid,
    ) -> Option<&mut ComponentWrapper> {
        if let Some(w) = self.wrappers.get_mut(&vid) {
            return (kind == ComponentKind::Base || w.kind() == kind).then_some(w);
        }
        if kind == ComponentKind::Weather {
            return self.scenes.get_mut(&vid).map(|s| &mut s.active_weather);
        }
        None
    }

    /// Active weather wrapper of a scene.
    #[must_use]
    pub fn active_weather(&self, scene: Vid) -> Option<&ComponentWrapper> {
        self.scenes.get(&scene).map(|s| &s.active_weather)
    }

    /// Stamps the wrapper (or scene weather wrapper) of `vid`.
    pub(crate) fn touch(&mut self, vid: Vid) {
        if let Some(w) = self.wrappers.get_mut(&vid) {
            w.touch();
        } else if let Some(s) = self.scenes.get_mut(&vid) {
            s.active_weather.touch();
        }
    }

    /// Handles of `kind` in `scene`, in creation order.
    pub fn scene_component_vids(&self, kind: ComponentKind, scene: Vid) -> Result<Vec<Vid>> {
        let scene = self
            .scenes
            .get(&scene)
            .ok_or(VizError::SceneNotFound(scene))?;
        Ok(scene.store.entities_of(kind))
    }

    /// Re-parents `vid` and returns its scene handle.
    ///
    /// `INVALID_VID` or the scene handle as parent detaches to the root.
    pub fn append_component_to(&mut self, vid: Vid, parent: Vid) -> Result<Vid> {
        let scene = self.scene_of(vid).ok_or(VizError::EntityNotFound(vid))?;
        let store = &mut self
            .scenes
            .get_mut(&scene)
            .ok_or(VizError::SceneNotFound(scene))?
            .store;

        if parent == INVALID_VID || parent == scene {
            store.detach(vid);
        } else {
            if !store.contains(parent) {
                return Err(VizError::InvalidParent {
                    entity: vid,
                    parent,
                });
            }
            store.attach(vid, parent)?;
        }
        self.touch(vid);
        Ok(scene)
    }

    // ========================================================================
    // Renderers
    // ========================================================================

    /// Binds a new renderer to `camera`.
    ///
    /// Fails if one is already bound or if `camera` is not a camera entity of
    /// a live scene; no renderer is left behind on failure.
    pub fn bind_renderer(&mut self, camera: Vid) -> Result<&mut Renderer> {
        if self.renderers.contains_key(&camera) {
            return Err(VizError::RendererAlreadyBound(camera));
        }
        let scene = self
            .scene_of(camera)
            .filter(|_| self.engine_camera(camera).is_some())
            .ok_or(VizError::CameraNotResolved(camera))?;

        let renderer = Renderer::new(camera, scene, &self.settings);
        Ok(self.renderers.entry(camera).or_insert(renderer))
    }

    #[inline]
    #[must_use]
    pub fn renderer(&self, camera: Vid) -> Option<&Renderer> {
        self.renderers.get(&camera)
    }

    #[inline]
    pub fn renderer_mut(&mut self, camera: Vid) -> Option<&mut Renderer> {
        self.renderers.get_mut(&camera)
    }

    /// Splits the borrow so a render pass can update the scene and the renderer.
    pub(crate) fn renderer_and_store_mut(
        &mut self,
        camera: Vid,
    ) -> Option<(&mut Renderer, &mut SceneStore)> {
        let renderer = self.renderers.get_mut(&camera)?;
        let scene = self.scenes.get_mut(&renderer.scene())?;
        Some((renderer, &mut scene.store))
    }

    #[must_use]
    pub fn renderer_count(&self) -> usize {
        self.renderers.len()
    }

    #[must_use]
    pub fn wrapper_count(&self) -> usize {
        self.wrappers.len()
    }

    /// Textures of destroyed renderers; the caller releases them on the device.
    pub fn take_retired_targets(&mut self) -> Vec<TextureId> {
        std::mem::take(&mut self.retired_targets)
    }

    // ========================================================================
    // Removal
    // ========================================================================

    /// Removes a scene (cascading over its entities) or an entity subtree.
    pub fn remove_entity(&mut self, vid: Vid) -> Result<()> {
        if let Some(scene) = self.scenes.remove(&vid) {
            let entities = scene.store.find_all_entities().to_vec();
            self.erase_entities(&entities);
            log::info!(
                "Scene '{}' ({}) removed with {} entities",
                scene.name,
                vid,
                entities.len()
            );
            return Ok(());
        }

        let scene = self.scene_of(vid).ok_or(VizError::EntityNotFound(vid))?;
        let removed = self
            .scenes
            .get_mut(&scene)
            .map(|s| s.store.remove_entity(vid))
            .unwrap_or_default();
        self.erase_entities(&removed);
        log::debug!("Entity {} removed ({} in subtree)", vid, removed.len());
        Ok(())
    }

    fn erase_entities(&mut self, entities: &[Vid]) {
        for vid in entities {
            if let Some(mut renderer) = self.renderers.remove(vid) {
                self.retired_targets.extend(renderer.take_targets());
            }
            self.wrappers.remove(vid);
            self.entity_index.remove(vid);
        }
    }

    /// Drops every scene, renderer and wrapper.
    pub fn clear(&mut self) {
        for (_, mut renderer) in self.renderers.drain() {
            self.retired_targets.extend(renderer.take_targets());
        }
        self.wrappers.clear();
        self.entity_index.clear();
        self.scenes.clear();
    }

    // ========================================================================
    // Names
    // ========================================================================

    /// First entity or scene named `name`.
    ///
    /// Scenes are scanned in creation order; within a scene entity names are
    /// checked before the scene's own name.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<Vid> {
        self.scenes.values().find_map(|s| {
            s.store
                .find_by_name(name)
                .or_else(|| (s.name == name).then_some(s.handle))
        })
    }

    #[must_use]
    pub fn find_all_by_name(&self, name: &str) -> Vec<Vid> {
        let mut found = Vec::new();
        for s in self.scenes.values() {
            found.extend(s.store.find_all_by_name(name));
            if s.name == name {
                found.push(s.handle);
            }
        }
        found
    }

    #[must_use]
    pub fn name_of(&self, vid: Vid) -> Option<String> {
        if let Some(s) = self.scenes.get(&vid) {
            return Some(s.name.clone());
        }
        self.store_of(vid)?.name_of(vid).map(str::to_string)
    }

    // ========================================================================
    // Typed views
    // ========================================================================

    pub fn base(&mut self, vid: Vid) -> BaseView<'_> {
        BaseView::new(self, vid)
    }

    pub fn camera(&mut self, vid: Vid) -> CameraView<'_> {
        CameraView::new(self, vid)
    }

    pub fn light(&mut self, vid: Vid) -> LightView<'_> {
        LightView::new(self, vid)
    }

    pub fn emitter(&mut self, vid: Vid) -> EmitterView<'_> {
        EmitterView::new(self, vid)
    }

    pub fn animation(&mut self, vid: Vid) -> AnimationView<'_> {
        AnimationView::new(self, vid)
    }

    pub fn collider(&mut self, vid: Vid) -> ColliderView<'_> {
        ColliderView::new(self, vid)
    }

    /// Weather view; a scene handle resolves to the scene's active weather.
    pub fn weather(&mut self, vid: Vid) -> WeatherView<'_> {
        WeatherView::new(self, vid)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(EngineSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_scene_name_rejected() {
        let mut reg = Registry::default();
        let s = reg.create_scene("s").unwrap();
        assert!(matches!(
            reg.create_scene("s"),
            Err(VizError::DuplicateSceneName(_))
        ));
        reg.remove_entity(s).unwrap();
        assert!(reg.create_scene("s").is_ok());
    }

    #[test]
    fn camera_gets_exactly_one_renderer() {
        let mut reg = Registry::default();
        let s = reg.create_scene("s").unwrap();
        let cam = reg
            .create_component(ComponentKind::Camera, s, "cam", None)
            .unwrap();
        assert!(reg.renderer(cam).is_some());
        assert!(matches!(
            reg.bind_renderer(cam),
            Err(VizError::RendererAlreadyBound(_))
        ));
        assert_eq!(reg.renderer_count(), 1);
    }

    #[test]
    fn bind_renderer_rejects_non_camera() {
        let mut reg = Registry::default();
        let s = reg.create_scene("s").unwrap();
        let light = reg
            .create_component(ComponentKind::Light, s, "l", None)
            .unwrap();
        assert!(reg.bind_renderer(light).is_err());
        assert!(reg.bind_renderer(9999).is_err());
        assert_eq!(reg.renderer_count(), 0);
    }

    #[test]
    fn animation_cannot_be_created_directly() {
        let mut reg = Registry::default();
        let s = reg.create_scene("s").unwrap();
        assert!(
            reg.create_component(ComponentKind::Animation, s, "a", None)
                .is_err()
        );
        assert_eq!(reg.wrapper_count(), 0);
    }

    #[test]
    fn scene_handle_as_parent_means_root() {
        let mut reg = Registry::default();
        let s = reg.create_scene("s").unwrap();
        let a = reg
            .create_component(ComponentKind::Base, s, "a", Some(s))
            .unwrap();
        assert_eq!(reg.store_of(a).unwrap().parent_of(a), None);
    }

    #[test]
    fn name_lookup_prefers_entities_over_scene() {
        let mut reg = Registry::default();
        let s = reg.create_scene("shared").unwrap();
        let e = reg
            .create_component(ComponentKind::Base, s, "shared", None)
            .unwrap();
        assert_eq!(reg.find_by_name("shared"), Some(e));
        assert_eq!(reg.find_all_by_name("shared"), vec![e, s]);
        assert_eq!(reg.name_of(s).as_deref(), Some("shared"));
        assert_eq!(reg.find_by_name("missing"), None);
    }
}
