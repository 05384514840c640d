//! Scene Merge Tests
//!
//! Tests for:
//! - Wrapper and renderer completeness for every moved category
//! - Rebinding of already-wrapped cameras
//! - Removal of the source scene
//! - Validation before mutation

use std::path::Path;
use std::sync::Arc;

use vizm::loader::{ImporterRegistry, load_into_new_scene};
use vizm::registry::Registry;
use vizm::scene::SceneStore;
use vizm::{ComponentKind, FileType, Result, SceneImporter, Vid, VizError};

// ============================================================================
// Helper
// ============================================================================

/// One entity of every kind, cameras nested under the root.
struct EveryKind;

impl SceneImporter for EveryKind {
    fn import(&self, _path: &Path, store: &mut SceneStore) -> Result<Vid> {
        let root = store.create_node("root")?;
        let bone = store.create_node("bone")?;
        store.attach(bone, root)?;
        for name in ["cam_a", "cam_b"] {
            let cam = store.create_camera(name)?;
            store.attach(cam, root)?;
        }
        let light = store.create_light("light")?;
        store.attach(light, bone)?;
        store.create_emitter("emitter")?;
        store.create_animation("walk")?;
        store.create_object("actor")?;
        store.create_collider("collider")?;
        store.create_mesh("mesh")?;
        store.create_material("material")?;
        store.create_weather("weather")?;
        Ok(root)
    }
}

fn load(reg: &mut Registry, scene_name: &str) -> (Vid, Vid) {
    let importers = ImporterRegistry::new();
    importers.register(FileType::Gltf, Arc::new(EveryKind));
    load_into_new_scene(reg, &importers, Path::new("model.gltf"), "", scene_name).unwrap()
}

const MOVED_KINDS: [ComponentKind; 9] = [
    ComponentKind::Camera,
    ComponentKind::Light,
    ComponentKind::Emitter,
    ComponentKind::Animation,
    ComponentKind::Actor,
    ComponentKind::Collider,
    ComponentKind::Geometry,
    ComponentKind::Material,
    ComponentKind::Weather,
];

// ============================================================================
// Completeness
// ============================================================================

#[test]
fn merge_wraps_every_moved_entity() {
    let mut reg = Registry::default();
    let (a, _) = load(&mut reg, "A");
    let b = reg.create_scene("B").unwrap();

    let before: Vec<(ComponentKind, Vec<Vid>)> = MOVED_KINDS
        .iter()
        .map(|&kind| (kind, reg.scene_component_vids(kind, a).unwrap()))
        .collect();
    assert_eq!(reg.wrapper_count(), 0);

    reg.merge_scenes(a, b).unwrap();

    for (kind, vids) in &before {
        assert!(!vids.is_empty(), "{kind:?} missing from fixture");
        for &vid in vids {
            let w = reg
                .get_component(*kind, vid)
                .unwrap_or_else(|| panic!("{kind:?} {vid} has no wrapper"));
            assert_eq!(w.kind(), *kind);
            assert_eq!(reg.scene_of(vid), Some(b));
        }
    }
}

#[test]
fn merged_cameras_get_exactly_one_renderer() {
    let mut reg = Registry::default();
    let (a, _) = load(&mut reg, "A");
    let b = reg.create_scene("B").unwrap();
    let cams = reg.scene_component_vids(ComponentKind::Camera, a).unwrap();
    assert_eq!(cams.len(), 2);
    assert_eq!(reg.renderer_count(), 0);

    reg.merge_scenes(a, b).unwrap();

    assert_eq!(reg.renderer_count(), 2);
    for cam in cams {
        let renderer = reg.renderer(cam).unwrap();
        assert_eq!(renderer.camera(), cam);
        assert_eq!(renderer.scene(), b);
    }
}

#[test]
fn plain_nodes_become_base_wrappers() {
    let mut reg = Registry::default();
    let (a, root) = load(&mut reg, "A");
    let b = reg.create_scene("B").unwrap();
    reg.merge_scenes(a, b).unwrap();

    let bone = reg.find_by_name("bone").unwrap();
    for node in [root, bone] {
        let w = reg.get_component(ComponentKind::Base, node).unwrap();
        assert_eq!(w.kind(), ComponentKind::Base);
    }
    // Hierarchy travels with the entities
    assert_eq!(reg.base(bone).parent_vid(), Some(root));
}

#[test]
fn merge_removes_source_scene() {
    let mut reg = Registry::default();
    let (a, root) = load(&mut reg, "A");
    let (b, _) = load(&mut reg, "B");

    reg.merge_scenes(a, b).unwrap();

    assert!(reg.scene(a).is_none());
    assert!(reg.find_scene_by_name("A").is_none());
    assert_eq!(reg.scene_of(root), Some(b));
    assert_eq!(
        reg.scene_component_vids(ComponentKind::Camera, b).unwrap().len(),
        4
    );
    assert!(reg.scene_component_vids(ComponentKind::Camera, a).is_err());
}

#[test]
fn wrapped_cameras_are_rebound_not_duplicated() {
    let mut reg = Registry::default();
    let a = reg.create_scene("A").unwrap();
    let b = reg.create_scene("B").unwrap();
    let cam = reg
        .create_component(ComponentKind::Camera, a, "cam", None)
        .unwrap();
    reg.get_component_mut(ComponentKind::Camera, cam)
        .unwrap()
        .set_attribute("tag", "kept");

    reg.merge_scenes(a, b).unwrap();

    assert_eq!(reg.renderer_count(), 1);
    assert_eq!(reg.wrapper_count(), 1);
    assert_eq!(reg.renderer(cam).unwrap().scene(), b);
    assert_eq!(
        reg.get_component(ComponentKind::Camera, cam)
            .unwrap()
            .attribute_as::<String>("tag")
            .as_deref(),
        Some("kept")
    );
}

#[test]
fn merged_camera_pose_still_updates() {
    let mut reg = Registry::default();
    let (a, _) = load(&mut reg, "A");
    let b = reg.create_scene("B").unwrap();
    reg.merge_scenes(a, b).unwrap();

    let cam = reg.find_by_name("cam_a").unwrap();
    reg.camera(cam)
        .set_pose(glam::Vec3::new(0.0, 1.0, 5.0), glam::Vec3::NEG_Z, glam::Vec3::Y);
    let (eye, _, _) = reg.camera(cam).pose().unwrap();
    assert!((eye - glam::Vec3::new(0.0, 1.0, 5.0)).length() < 1e-4);
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn invalid_merge_leaves_registry_untouched() {
    let mut reg = Registry::default();
    let (a, root) = load(&mut reg, "A");

    assert!(matches!(reg.merge_scenes(a, a), Err(VizError::SelfMerge(_))));
    assert!(matches!(
        reg.merge_scenes(a, 9999),
        Err(VizError::SceneNotFound(9999))
    ));
    assert!(matches!(
        reg.merge_scenes(9999, a),
        Err(VizError::SceneNotFound(9999))
    ));

    assert!(reg.scene(a).is_some());
    assert_eq!(reg.scene_of(root), Some(a));
    assert_eq!(reg.wrapper_count(), 0);
    assert_eq!(reg.renderer_count(), 0);
}
