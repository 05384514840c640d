//! Scene merge: moves every entity of one scene into another and
//! completes the wrapper and renderer bookkeeping for what arrived.

use super::{ComponentWrapper, Registry};
use crate::core::{ComponentKind, Vid};
use crate::errors::{Result, VizError};

#[derive(Debug, Default)]
struct MergeCounts {
    cameras: usize,
    renderers_created: usize,
    renderers_rebound: usize,
    wrappers_created: usize,
}

impl Registry {
    /// Merges scene `src` into scene `dst`.
    ///
    /// Afterwards every camera of the moved set has exactly one wrapper and
    /// one renderer, every light, emitter, animation, actor, collider,
    /// transform node, geometry, material and weather entry has a wrapper,
    /// and `src` no longer exists. Existing wrappers and renderers are
    /// rebound, never duplicated.
    ///
    /// Validation happens before any mutation: merging a scene into itself
    /// or naming an unknown scene leaves the registry untouched.
    pub fn merge_scenes(&mut self, src: Vid, dst: Vid) -> Result<()> {
        if src == dst {
            return Err(VizError::SelfMerge(src));
        }
        if !self.scenes.contains_key(&dst) {
            return Err(VizError::SceneNotFound(dst));
        }
        let Some(mut source) = self.scenes.remove(&src) else {
            return Err(VizError::SceneNotFound(src));
        };

        let moved = source.store.find_all_entities().to_vec();
        let categories: Vec<(ComponentKind, Vec<Vid>)> = [
            ComponentKind::Camera,
            ComponentKind::Light,
            ComponentKind::Emitter,
            ComponentKind::Animation,
            ComponentKind::Actor,
            ComponentKind::Collider,
            ComponentKind::Geometry,
            ComponentKind::Material,
            ComponentKind::Weather,
        ]
        .into_iter()
        .map(|kind| (kind, source.store.entities_of(kind)))
        .collect();

        if let Some(target) = self.scenes.get_mut(&dst) {
            target.store.merge(&mut source.store);
        }
        for &vid in &moved {
            self.entity_index.insert(vid, dst);
        }

        let mut counts = MergeCounts::default();
        for (kind, vids) in &categories {
            for &vid in vids {
                if self.ensure_wrapper(vid, *kind) {
                    counts.wrappers_created += 1;
                }
                if *kind == ComponentKind::Camera {
                    counts.cameras += 1;
                    self.ensure_renderer(vid, dst, &mut counts)?;
                }
            }
        }

        // Plain transform nodes (bones, groups) become Base wrappers.
        for &vid in &moved {
            let is_node = self
                .store_of(vid)
                .is_some_and(|s| s.kind_of(vid) == Some(ComponentKind::Base));
            if is_node && self.ensure_wrapper(vid, ComponentKind::Base) {
                counts.wrappers_created += 1;
            }
        }

        log::info!(
            "Merged scene '{}' ({}) into {}: {} entities, {} cameras, {} renderers created, {} rebound, {} wrappers created",
            source.name,
            src,
            dst,
            moved.len(),
            counts.cameras,
            counts.renderers_created,
            counts.renderers_rebound,
            counts.wrappers_created
        );
        Ok(())
    }

    /// Returns `true` when a wrapper had to be created.
    fn ensure_wrapper(&mut self, vid: Vid, kind: ComponentKind) -> bool {
        if self.wrappers.contains_key(&vid) {
            return false;
        }
        self.wrappers.insert(vid, ComponentWrapper::new(vid, kind));
        true
    }

    fn ensure_renderer(&mut self, camera: Vid, dst: Vid, counts: &mut MergeCounts) -> Result<()> {
        if let Some(renderer) = self.renderers.get_mut(&camera) {
            renderer.rebind_scene(dst);
            counts.renderers_rebound += 1;
            return Ok(());
        }
        self.bind_renderer(camera)?;
        counts.renderers_created += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::core::ComponentKind;
    use crate::errors::VizError;
    use crate::registry::Registry;

    #[test]
    fn self_merge_is_rejected_without_mutation() {
        let mut reg = Registry::default();
        let s = reg.create_scene("s").unwrap();
        reg.create_component(ComponentKind::Camera, s, "cam", None)
            .unwrap();
        assert!(matches!(reg.merge_scenes(s, s), Err(VizError::SelfMerge(_))));
        assert!(matches!(
            reg.merge_scenes(s, 4242),
            Err(VizError::SceneNotFound(4242))
        ));
        assert!(reg.scene(s).is_some());
        assert_eq!(reg.renderer_count(), 1);
    }

    #[test]
    fn existing_renderer_is_rebound_not_duplicated() {
        let mut reg = Registry::default();
        let a = reg.create_scene("a").unwrap();
        let b = reg.create_scene("b").unwrap();
        let cam = reg
            .create_component(ComponentKind::Camera, a, "cam", None)
            .unwrap();

        reg.merge_scenes(a, b).unwrap();

        assert!(reg.scene(a).is_none());
        assert_eq!(reg.scene_of(cam), Some(b));
        assert_eq!(reg.renderer_count(), 1);
        assert_eq!(reg.renderer(cam).unwrap().scene(), b);
        assert_eq!(reg.wrapper_count(), 1);
    }
}
