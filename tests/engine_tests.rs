//! Engine Facade Tests
//!
//! Tests for:
//! - init/deinit lifecycle codes
//! - Sentinel results of the scene and component operations
//! - Render codes, device warm-up and one scene update per tick
//! - Loading files (sync and async) and merging loaded scenes
//! - Shared render targets and the profiling overlay

use std::cell::Cell;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use glam::Vec3;
use vizm::engine::INFO_CANVAS_NAME;
use vizm::scene::SceneStore;
use vizm::{
    ComponentKind, Engine, EngineSettings, FileType, GraphicsDevice, HeadlessDevice, INVALID_VID,
    Result, SceneImporter, Vid, VizError, VzResult,
};

// ============================================================================
// Helper
// ============================================================================

const EPSILON: f32 = 1e-5;

fn vec3_approx(a: Vec3, b: Vec3) -> bool {
    (a - b).length() < EPSILON
}

fn engine() -> Engine {
    let mut engine = Engine::headless();
    assert_eq!(engine.init(), VzResult::Ok);
    engine
}

fn camera_in(engine: &mut Engine, scene: Vid, name: &str) -> Vid {
    engine.new_scene_component(ComponentKind::Camera, scene, name, INVALID_VID)
}

/// Root node with two cameras and a light under it.
struct TwoCameras;

impl SceneImporter for TwoCameras {
    fn import(&self, _path: &Path, store: &mut SceneStore) -> Result<Vid> {
        let root = store.create_node("root")?;
        for name in ["front", "side"] {
            let cam = store.create_camera(name)?;
            store.attach(cam, root)?;
        }
        let light = store.create_light("key")?;
        store.attach(light, root)?;
        Ok(root)
    }
}

struct Failing;

impl SceneImporter for Failing {
    fn import(&self, path: &Path, _store: &mut SceneStore) -> Result<Vid> {
        Err(VizError::Import(format!("{} is corrupt", path.display())))
    }
}

fn with_importers(mut engine: Engine) -> Engine {
    engine.register_importer(FileType::Glb, Arc::new(TwoCameras));
    engine.register_importer(FileType::Obj, Arc::new(Failing));
    engine
}

fn node_world_x(engine: &Engine, vid: Vid) -> f32 {
    engine
        .registry()
        .engine_transform(vid)
        .unwrap()
        .world_matrix()
        .translation
        .x
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn init_twice_warns() {
    let mut engine = Engine::headless();
    assert_eq!(engine.init(), VzResult::Ok);
    assert_eq!(engine.init(), VzResult::Warning);
    assert!(engine.is_initialized());
    assert_eq!(engine.deinit(), VzResult::Ok);
}

#[test]
fn deinit_without_init_warns() {
    let mut engine = Engine::headless();
    assert_eq!(engine.deinit(), VzResult::Warning);
}

#[test]
fn deinit_drops_everything() {
    let mut engine = engine();
    let scene = engine.new_scene("s");
    let cam = camera_in(&mut engine, scene, "cam");
    engine.render(cam, true);

    assert_eq!(engine.deinit(), VzResult::Ok);

    assert!(engine.get_component(ComponentKind::Camera, cam).is_none());
    assert!(engine.registry().scene(scene).is_none());
    assert_eq!(engine.render(cam, true), VzResult::JobWait);
}

#[test]
fn render_before_init_waits() {
    let mut engine = Engine::headless();
    let scene = engine.new_scene("s");
    let cam = camera_in(&mut engine, scene, "cam");
    assert_eq!(engine.render(cam, true), VzResult::JobWait);
}

// ============================================================================
// Scenes and components
// ============================================================================

#[test]
fn render_after_init_succeeds() {
    let mut engine = engine();
    let scene = engine.new_scene("main");
    let cam = camera_in(&mut engine, scene, "cam");
    let code = engine.render(cam, true);
    assert!(matches!(code, VzResult::Ok | VzResult::JobWait));
    assert_eq!(code, VzResult::Ok);
}

#[test]
fn duplicate_scene_name_is_invalid() {
    let mut engine = engine();
    let first = engine.new_scene("dup");
    assert_ne!(first, INVALID_VID);
    assert_eq!(engine.new_scene("dup"), INVALID_VID);
    assert_eq!(engine.get_first_vid_by_name("dup"), first);
}

#[test]
fn bad_handles_yield_sentinels() {
    let mut engine = engine();
    let scene = engine.new_scene("s");
    let light = engine.new_scene_component(ComponentKind::Light, scene, "l", INVALID_VID);

    assert_eq!(
        engine.new_scene_component(ComponentKind::Light, 4242, "x", INVALID_VID),
        INVALID_VID
    );
    assert_eq!(
        engine.new_scene_component(ComponentKind::Animation, scene, "a", INVALID_VID),
        INVALID_VID
    );
    assert_eq!(engine.append_component_to(4242, scene), INVALID_VID);
    assert_eq!(engine.append_component_to(light, scene), scene);
    assert_eq!(engine.remove_component(4242), VzResult::Fail);
    assert!(engine.get_scene_component_vids(ComponentKind::Light, 4242).is_empty());
    assert_eq!(engine.get_first_vid_by_name("missing"), INVALID_VID);
    assert_eq!(engine.get_name_by_vid(light).as_deref(), Some("l"));
    assert_eq!(engine.get_name_by_vid(4242), None);
}

#[test]
fn parent_handle_nests_new_component() {
    let mut engine = engine();
    let scene = engine.new_scene("s");
    let root = engine.new_scene_component(ComponentKind::Base, scene, "root", scene);
    let cam = engine.new_scene_component(ComponentKind::Camera, scene, "cam", root);
    assert_eq!(engine.registry_mut().base(cam).parent_vid(), Some(root));
    assert_eq!(engine.registry_mut().base(root).parent_vid(), None);
    assert_eq!(engine.get_vids_by_name("cam"), vec![cam]);
}

#[test]
fn removing_scene_releases_renderers_and_targets() {
    let mut engine = engine();
    let scene = engine.new_scene("s");
    let cam = camera_in(&mut engine, scene, "cam");
    engine.render(cam, true);
    let target = engine.registry().renderer(cam).unwrap().color_target().unwrap();

    assert_eq!(engine.remove_component(scene), VzResult::Ok);

    assert!(engine.get_component(ComponentKind::Camera, cam).is_none());
    assert!(engine.device().texture_desc(target).is_none());
    assert_eq!(engine.render(cam, true), VzResult::Fail);
}

// ============================================================================
// Rendering
// ============================================================================

#[test]
fn render_without_renderer_fails() {
    let mut engine = engine();
    let scene = engine.new_scene("s");
    let light = engine.new_scene_component(ComponentKind::Light, scene, "l", INVALID_VID);
    assert_eq!(engine.render(light, true), VzResult::Fail);
    assert_eq!(engine.render(INVALID_VID, true), VzResult::Fail);
}

#[test]
fn warming_device_waits_then_renders() {
    let (device, ready) = HeadlessDevice::warming_up();
    let mut engine = Engine::new(EngineSettings::default(), Box::new(device));
    engine.init();
    let scene = engine.new_scene("s");
    let cam = camera_in(&mut engine, scene, "cam");

    assert_eq!(engine.render(cam, true), VzResult::JobWait);
    assert_eq!(engine.display_engine_profiling(256, 128), INVALID_VID);
    assert_eq!(engine.registry().renderer(cam).unwrap().frame_count(), 0);

    ready.store(true, Ordering::Release);
    assert_eq!(engine.render(cam, true), VzResult::Ok);
    assert_eq!(engine.registry().renderer(cam).unwrap().frame_count(), 1);
}

#[test]
fn scene_updates_once_per_tick() {
    let mut engine = engine();
    let scene = engine.new_scene("s");
    let a = camera_in(&mut engine, scene, "a");
    let b = camera_in(&mut engine, scene, "b");
    let node = engine.new_scene_component(ComponentKind::Base, scene, "node", INVALID_VID);

    assert_eq!(engine.render(a, true), VzResult::Ok);
    engine.registry_mut().base(node).set_translate(Vec3::X);

    // Same tick: b does not update the scene again
    assert_eq!(engine.render(b, true), VzResult::Ok);
    assert!(node_world_x(&engine, node).abs() < EPSILON);

    // a renders again: new tick
    assert_eq!(engine.render(a, true), VzResult::Ok);
    assert!((node_world_x(&engine, node) - 1.0).abs() < EPSILON);
}

#[test]
fn frozen_render_keeps_scene_but_follows_camera() {
    let mut engine = engine();
    let scene = engine.new_scene("s");
    let cam = camera_in(&mut engine, scene, "cam");
    let node = engine.new_scene_component(ComponentKind::Base, scene, "node", INVALID_VID);
    engine.render(cam, true);

    engine.registry_mut().base(node).set_translate(Vec3::X);
    engine
        .registry_mut()
        .camera(cam)
        .set_pose(Vec3::new(0.0, 2.0, 8.0), Vec3::NEG_Z, Vec3::Y);
    assert_eq!(engine.render(cam, false), VzResult::Ok);

    assert!(node_world_x(&engine, node).abs() < EPSILON);
    let (eye, _, _) = engine.registry_mut().camera(cam).pose().unwrap();
    assert!(vec3_approx(eye, Vec3::new(0.0, 2.0, 8.0)));
}

#[test]
fn first_frame_updates_even_when_frozen() {
    let mut engine = engine();
    let scene = engine.new_scene("s");
    let cam = camera_in(&mut engine, scene, "cam");
    let node = engine.new_scene_component(ComponentKind::Base, scene, "node", INVALID_VID);
    engine.registry_mut().base(node).set_translate(Vec3::X);

    assert_eq!(engine.render(cam, false), VzResult::Ok);
    assert!((node_world_x(&engine, node) - 1.0).abs() < EPSILON);
}

#[test]
fn shared_target_requires_a_rendered_frame() {
    let mut engine = engine();
    let scene = engine.new_scene("s");
    let cam = camera_in(&mut engine, scene, "cam");
    assert!(engine.shared_render_target(cam, 1, 2, 0).is_none());

    engine.registry_mut().camera(cam).set_canvas_size(640.0, 360.0, 96.0);
    engine.render(cam, true);

    let shared = engine.shared_render_target(cam, 1, 2, 0).unwrap();
    assert_ne!(shared.handle, 0);
    assert_eq!((shared.width, shared.height), (640, 360));
    assert!(engine.shared_render_target(4242, 1, 2, 0).is_none());
}

#[test]
fn profiling_overlay_reuses_its_camera() {
    let mut engine = engine();
    let first = engine.display_engine_profiling(300, 200);
    assert_ne!(first, INVALID_VID);
    assert_eq!(engine.get_name_by_vid(first).as_deref(), Some(INFO_CANVAS_NAME));
    assert_eq!(
        engine.registry().renderer(first).unwrap().canvas(),
        (300, 200, 96.0)
    );

    let second = engine.display_engine_profiling(400, 300);
    assert_eq!(first, second);
    assert_eq!(
        engine.registry().renderer(first).unwrap().canvas(),
        (400, 300, 96.0)
    );
}

// ============================================================================
// Loading
// ============================================================================

#[test]
fn loaded_scenes_merge_with_live_cameras() {
    let mut engine = with_importers(engine());
    let (a, root_a) = engine.load_file_into_new_scene("assets/a.glb", "rootA", "A");
    let (b, _) = engine.load_file_into_new_scene("assets/b.glb", "rootB", "B");
    assert!(a != INVALID_VID && b != INVALID_VID && root_a != INVALID_VID);

    let cams = engine.get_scene_component_vids(ComponentKind::Camera, a);
    assert_eq!(cams.len(), 2);
    // Loaded cameras have no wrapper until merged
    assert!(engine.get_component(ComponentKind::Camera, cams[0]).is_none());

    assert_eq!(engine.merge_scenes(a, b), VzResult::Ok);

    for &cam in &cams {
        assert!(engine.get_component(ComponentKind::Camera, cam).is_some());
        assert_eq!(engine.render(cam, true), VzResult::Ok);
        let shared = engine.shared_render_target(cam, 1, 1, 0);
        assert!(shared.is_some_and(|s| s.handle != 0));
    }
    assert!(engine.registry().scene(a).is_none());
    assert_eq!(engine.get_name_by_vid(root_a).as_deref(), Some("rootA"));
    assert_eq!(engine.merge_scenes(a, b), VzResult::Fail);
}

#[test]
fn sync_load_reports_failures_as_invalid() {
    let mut engine = with_importers(engine());
    assert_eq!(
        engine.load_file_into_new_scene("broken.obj", "", ""),
        (INVALID_VID, INVALID_VID)
    );
    assert_eq!(
        engine.load_file_into_new_scene("notes.txt", "", ""),
        (INVALID_VID, INVALID_VID)
    );
    assert_eq!(
        engine.load_file_into_new_scene("model.vrm", "", ""),
        (INVALID_VID, INVALID_VID)
    );
    assert_eq!(engine.registry().scenes().count(), 0);
}

#[test]
fn async_load_installs_and_calls_back() {
    let mut engine = with_importers(engine());
    let loaded = Rc::new(Cell::new((INVALID_VID, INVALID_VID)));
    let failed = Rc::new(Cell::new(None));

    let sink = Rc::clone(&loaded);
    let ticket = engine.load_file_into_new_scene_async("model.glb", "root", "", move |s, r| {
        sink.set((s, r));
    });
    assert!(ticket.is_some());
    let sink = Rc::clone(&failed);
    engine
        .load_file_into_new_scene_async("broken.obj", "", "", move |s, r| {
            sink.set(Some((s, r)));
        })
        .unwrap();
    assert!(engine
        .load_file_into_new_scene_async("notes.txt", "", "", |_, _| {})
        .is_none());

    let deadline = Instant::now() + Duration::from_secs(10);
    while engine.pending_loads() > 0 && Instant::now() < deadline {
        engine.wait_loads(Duration::from_millis(50));
    }
    assert_eq!(engine.pending_loads(), 0);

    let (scene, root) = loaded.get();
    assert_ne!(scene, INVALID_VID);
    assert_eq!(engine.get_name_by_vid(scene).as_deref(), Some("model"));
    assert_eq!(engine.get_name_by_vid(root).as_deref(), Some("root"));
    assert_eq!(failed.get(), Some((INVALID_VID, INVALID_VID)));
}

#[test]
fn deinit_cancels_pending_loads() {
    let mut engine = with_importers(engine());
    let called = Rc::new(Cell::new(false));
    let sink = Rc::clone(&called);
    engine
        .load_file_into_new_scene_async("late.glb", "", "", move |_, _| sink.set(true))
        .unwrap();

    engine.deinit();
    assert_eq!(engine.pending_loads(), 0);
    engine.init();
    std::thread::sleep(Duration::from_millis(50));
    engine.poll_loads();

    assert!(!called.get());
    assert!(engine.registry().find_scene_by_name("late").is_none());
}
