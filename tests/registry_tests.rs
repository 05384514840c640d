//! Registry Tests
//!
//! Tests for:
//! - Handle uniqueness across scenes and components
//! - Camera/renderer 1:1 binding and its teardown
//! - Cascade delete of scenes and subtrees
//! - Name lookup and parent handling
//! - Write-through views and wrapper timestamps

use std::collections::HashSet;

use glam::{Quat, Vec3};
use vizm::registry::Registry;
use vizm::scene::LightType;
use vizm::{ComponentKind, INVALID_VID, Vid, VizError};

// ============================================================================
// Helper
// ============================================================================

const EPSILON: f32 = 1e-5;

fn vec3_approx(a: Vec3, b: Vec3) -> bool {
    (a - b).length() < EPSILON
}

fn registry_with_scene(name: &str) -> (Registry, Vid) {
    let mut reg = Registry::default();
    let scene = reg.create_scene(name).unwrap();
    (reg, scene)
}

fn create(reg: &mut Registry, kind: ComponentKind, scene: Vid, name: &str) -> Vid {
    reg.create_component(kind, scene, name, None).unwrap()
}

// ============================================================================
// Handle Space
// ============================================================================

#[test]
fn handles_are_unique_and_never_invalid() {
    let mut reg = Registry::default();
    let mut seen = HashSet::new();

    for s in 0..4 {
        let scene = reg.create_scene(&format!("scene{s}")).unwrap();
        assert!(seen.insert(scene));
        for kind in [
            ComponentKind::Base,
            ComponentKind::Camera,
            ComponentKind::Light,
            ComponentKind::Emitter,
            ComponentKind::Collider,
            ComponentKind::Actor,
            ComponentKind::Geometry,
            ComponentKind::Material,
            ComponentKind::Weather,
        ] {
            let vid = create(&mut reg, kind, scene, "c");
            assert_ne!(vid, INVALID_VID);
            assert!(seen.insert(vid), "duplicate handle {vid}");
        }
    }
}

#[test]
fn removed_handles_are_not_handed_out_again() {
    let (mut reg, scene) = registry_with_scene("s");
    let a = create(&mut reg, ComponentKind::Light, scene, "a");
    reg.remove_entity(a).unwrap();
    let b = create(&mut reg, ComponentKind::Light, scene, "b");
    assert_ne!(a, b);
}

#[test]
fn unknown_scene_is_rejected() {
    let mut reg = Registry::default();
    assert!(matches!(
        reg.create_component(ComponentKind::Light, 77, "l", None),
        Err(VizError::SceneNotFound(77))
    ));
    assert_eq!(reg.wrapper_count(), 0);
}

// ============================================================================
// Camera / Renderer Binding
// ============================================================================

#[test]
fn camera_and_renderer_are_one_to_one() {
    let (mut reg, scene) = registry_with_scene("s");
    let cams: Vec<Vid> = (0..3)
        .map(|i| create(&mut reg, ComponentKind::Camera, scene, &format!("cam{i}")))
        .collect();
    create(&mut reg, ComponentKind::Light, scene, "light");

    assert_eq!(reg.renderer_count(), cams.len());
    for &cam in &cams {
        assert_eq!(reg.renderer(cam).unwrap().camera(), cam);
        assert_eq!(reg.renderer(cam).unwrap().scene(), scene);
        assert!(reg.get_component(ComponentKind::Camera, cam).is_some());
    }

    reg.remove_entity(cams[1]).unwrap();
    assert!(reg.renderer(cams[1]).is_none());
    assert!(reg.get_component(ComponentKind::Camera, cams[1]).is_none());
    assert_eq!(reg.renderer_count(), 2);
}

#[test]
fn new_camera_starts_at_initial_canvas() {
    let (mut reg, scene) = registry_with_scene("s");
    let cam = create(&mut reg, ComponentKind::Camera, scene, "cam");
    assert_eq!(reg.renderer(cam).unwrap().canvas(), (16, 16, 96.0));
    let (w, h, dpi) = reg.camera(cam).canvas_size().unwrap();
    assert_eq!((w, h, dpi), (16.0, 16.0, 96.0));
}

// ============================================================================
// Cascade Delete
// ============================================================================

#[test]
fn removing_scene_cascades_over_every_entity() {
    let (mut reg, scene) = registry_with_scene("s");
    let other = reg.create_scene("other").unwrap();
    let keep = create(&mut reg, ComponentKind::Camera, other, "keep");

    let root = create(&mut reg, ComponentKind::Base, scene, "root");
    let cam = reg
        .create_component(ComponentKind::Camera, scene, "cam", Some(root))
        .unwrap();
    let light = reg
        .create_component(ComponentKind::Light, scene, "light", Some(cam))
        .unwrap();
    let doomed = [root, cam, light];

    reg.remove_entity(scene).unwrap();

    assert!(reg.scene(scene).is_none());
    for vid in doomed {
        assert!(reg.get_component(ComponentKind::Base, vid).is_none());
        assert!(reg.renderer(vid).is_none());
        assert!(reg.scene_of(vid).is_none());
    }
    assert!(reg.renderer(keep).is_some());
    assert_eq!(reg.renderer_count(), 1);
    assert_eq!(reg.take_retired_targets().len(), 0);
}

#[test]
fn removing_entity_takes_its_subtree() {
    let (mut reg, scene) = registry_with_scene("s");
    let root = create(&mut reg, ComponentKind::Base, scene, "root");
    let cam = reg
        .create_component(ComponentKind::Camera, scene, "cam", Some(root))
        .unwrap();
    let sibling = create(&mut reg, ComponentKind::Light, scene, "sibling");

    reg.remove_entity(root).unwrap();

    assert!(reg.get_component(ComponentKind::Camera, cam).is_none());
    assert!(reg.renderer(cam).is_none());
    assert!(reg.get_component(ComponentKind::Light, sibling).is_some());
    assert!(matches!(
        reg.remove_entity(root),
        Err(VizError::EntityNotFound(_))
    ));
}

// ============================================================================
// Lookup
// ============================================================================

#[test]
fn get_component_requires_matching_kind() {
    let (mut reg, scene) = registry_with_scene("s");
    let light = create(&mut reg, ComponentKind::Light, scene, "l");
    assert!(reg.get_component(ComponentKind::Light, light).is_some());
    assert!(reg.get_component(ComponentKind::Base, light).is_some());
    assert!(reg.get_component(ComponentKind::Camera, light).is_none());
    assert!(reg.get_component(ComponentKind::Light, 9999).is_none());
}

#[test]
fn scene_handle_resolves_active_weather() {
    let (reg, scene) = registry_with_scene("s");
    let w = reg.get_component(ComponentKind::Weather, scene).unwrap();
    assert_eq!(w.handle(), scene);
    assert_eq!(w.kind(), ComponentKind::Weather);
    assert_eq!(reg.active_weather(scene).unwrap().handle(), scene);
}

#[test]
fn scene_component_vids_in_creation_order() {
    let (mut reg, scene) = registry_with_scene("s");
    let a = create(&mut reg, ComponentKind::Light, scene, "a");
    create(&mut reg, ComponentKind::Camera, scene, "cam");
    let b = create(&mut reg, ComponentKind::Light, scene, "b");
    assert_eq!(
        reg.scene_component_vids(ComponentKind::Light, scene).unwrap(),
        vec![a, b]
    );
    assert!(reg.scene_component_vids(ComponentKind::Light, 4242).is_err());
}

#[test]
fn find_by_name_scans_scenes_in_creation_order() {
    let mut reg = Registry::default();
    let s1 = reg.create_scene("one").unwrap();
    let s2 = reg.create_scene("two").unwrap();
    let a = create(&mut reg, ComponentKind::Light, s1, "lamp");
    let b = create(&mut reg, ComponentKind::Light, s2, "lamp");

    assert_eq!(reg.find_by_name("lamp"), Some(a));
    assert_eq!(reg.find_all_by_name("lamp"), vec![a, b]);
    assert_eq!(reg.find_by_name("two"), Some(s2));
    assert_eq!(reg.name_of(b).as_deref(), Some("lamp"));
    assert_eq!(reg.name_of(12345), None);
}

// ============================================================================
// Hierarchy
// ============================================================================

#[test]
fn append_component_to_reparents_within_scene() {
    let (mut reg, scene) = registry_with_scene("s");
    let parent = create(&mut reg, ComponentKind::Base, scene, "p");
    let child = create(&mut reg, ComponentKind::Light, scene, "c");

    assert_eq!(reg.append_component_to(child, parent).unwrap(), scene);
    assert_eq!(reg.base(child).parent_vid(), Some(parent));
    // Same parent again is a no-op success
    assert_eq!(reg.append_component_to(child, parent).unwrap(), scene);
    assert!(matches!(
        reg.append_component_to(child, child),
        Err(VizError::InvalidParent { .. })
    ));

    assert_eq!(reg.append_component_to(child, INVALID_VID).unwrap(), scene);
    assert_eq!(reg.base(child).parent_vid(), None);
}

#[test]
fn cross_scene_parent_is_rejected() {
    let mut reg = Registry::default();
    let s1 = reg.create_scene("one").unwrap();
    let s2 = reg.create_scene("two").unwrap();
    let a = create(&mut reg, ComponentKind::Base, s1, "a");
    let b = create(&mut reg, ComponentKind::Base, s2, "b");
    assert!(reg.append_component_to(a, b).is_err());
    assert_eq!(reg.base(a).parent_vid(), None);
}

// ============================================================================
// Views
// ============================================================================

#[test]
fn base_view_writes_through() {
    let (mut reg, scene) = registry_with_scene("s");
    let node = create(&mut reg, ComponentKind::Base, scene, "n");
    reg.base(node)
        .set_translate(Vec3::new(1.0, 2.0, 3.0))
        .set_quaternion(Quat::from_rotation_y(std::f32::consts::FRAC_PI_2))
        .set_scale(Vec3::splat(2.0));

    assert!(vec3_approx(
        reg.base(node).world_position().unwrap(),
        Vec3::new(1.0, 2.0, 3.0)
    ));
    assert!(vec3_approx(reg.base(node).world_forward().unwrap(), Vec3::NEG_X));
    let inv = reg.base(node).world_inv_transform().unwrap();
    assert!(vec3_approx(
        inv.transform_point3(Vec3::new(1.0, 2.0, 3.0)),
        Vec3::ZERO
    ));
}

#[test]
fn light_view_round_trips_and_stamps() {
    let (mut reg, scene) = registry_with_scene("s");
    let light = create(&mut reg, ComponentKind::Light, scene, "l");
    let before = reg
        .get_component(ComponentKind::Light, light)
        .unwrap()
        .last_modified();

    reg.light(light)
        .set_type(LightType::Spot)
        .set_color(Vec3::new(1.0, 0.5, 0.25))
        .set_range(42.0);

    assert_eq!(reg.light(light).light_type(), Some(LightType::Spot));
    assert_eq!(reg.light(light).range(), Some(42.0));
    let after = reg
        .get_component(ComponentKind::Light, light)
        .unwrap()
        .last_modified();
    assert!(after >= before);
}

#[test]
fn wrapper_attributes_are_host_data() {
    let (mut reg, scene) = registry_with_scene("s");
    let node = create(&mut reg, ComponentKind::Base, scene, "n");
    let wrapper = reg.get_component_mut(ComponentKind::Base, node).unwrap();
    wrapper.set_attribute("selected", true);
    assert_eq!(
        reg.get_component(ComponentKind::Base, node)
            .unwrap()
            .attribute_as::<bool>("selected"),
        Some(true)
    );
}
