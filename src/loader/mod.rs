//! Scene loading.
//!
//! File parsing is delegated to host-registered [`SceneImporter`]s keyed by
//! [`FileType`]. Importers always populate a detached [`SceneStore`]; the
//! store is installed into the [`Registry`] only once the import succeeded,
//! so a failed load never leaves a half-built scene behind.
//!
//! Loaded entities get no wrappers or renderers. They are created when the
//! scene is merged into a host scene.

pub mod jobs;

pub use jobs::{LoadCallback, LoadOutcome, LoadQueue, LoadTicket};

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::core::{EntityAllocator, Vid};
use crate::errors::{Result, VizError};
use crate::registry::Registry;
use crate::scene::SceneStore;

/// Formats dispatched by uppercased file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    Obj,
    Gltf,
    Glb,
    Vrm,
}

impl FileType {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_uppercase().as_str() {
            "OBJ" => Some(Self::Obj),
            "GLTF" => Some(Self::Gltf),
            "GLB" => Some(Self::Glb),
            "VRM" => Some(Self::Vrm),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
            .ok_or_else(|| VizError::UnsupportedFileType(path.display().to_string()))
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Obj => "OBJ",
            Self::Gltf => "GLTF",
            Self::Glb => "GLB",
            Self::Vrm => "VRM",
        };
        f.write_str(name)
    }
}

/// Populates a scene store from a file.
///
/// Implementations run on load worker threads and must not touch the
/// registry. Entity handles come from the store's allocator.
pub trait SceneImporter: Send + Sync {
    /// Imports `path` into `store` and returns the root entity.
    fn import(&self, path: &Path, store: &mut SceneStore) -> Result<Vid>;
}

/// Importer table shared between the engine and its load workers.
#[derive(Clone, Default)]
pub struct ImporterRegistry {
    table: Arc<RwLock<FxHashMap<FileType, Arc<dyn SceneImporter>>>>,
}

impl ImporterRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `importer` for `file_type`, replacing any previous one.
    pub fn register(&self, file_type: FileType, importer: Arc<dyn SceneImporter>) {
        if self.table.write().insert(file_type, importer).is_some() {
            log::info!("Importer for {file_type} replaced");
        }
    }

    #[must_use]
    pub fn get(&self, file_type: FileType) -> Option<Arc<dyn SceneImporter>> {
        self.table.read().get(&file_type).cloned()
    }

    /// Importer for the extension of `path`.
    pub fn resolve(&self, path: &Path) -> Result<Arc<dyn SceneImporter>> {
        let file_type = FileType::from_path(path)?;
        self.get(file_type)
            .ok_or_else(|| VizError::ImporterMissing(file_type.to_string()))
    }
}

/// Scene name to use for `path` when the caller gave none.
pub(crate) fn scene_name_for(path: &Path, scene_name: &str) -> String {
    if !scene_name.is_empty() {
        return scene_name.to_string();
    }
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Runs `importer` into a fresh detached store and names the root.
pub(crate) fn import_detached(
    importer: &dyn SceneImporter,
    allocator: EntityAllocator,
    path: &Path,
    root_name: &str,
) -> Result<(SceneStore, Vid)> {
    let mut store = SceneStore::new(allocator);
    let root = importer.import(path, &mut store)?;
    if !store.contains(root) {
        return Err(VizError::Import(format!(
            "{}: importer returned unknown root {root}",
            path.display()
        )));
    }
    if !root_name.is_empty() {
        store.set_name(root, root_name);
    }
    Ok((store, root))
}

/// Synchronously loads `path` into a new scene. Returns `(scene, root)`.
pub fn load_into_new_scene(
    registry: &mut Registry,
    importers: &ImporterRegistry,
    path: &Path,
    root_name: &str,
    scene_name: &str,
) -> Result<(Vid, Vid)> {
    let importer = importers.resolve(path)?;
    let name = scene_name_for(path, scene_name);
    if registry.find_scene_by_name(&name).is_some() {
        return Err(VizError::DuplicateSceneName(name));
    }

    let started = std::time::Instant::now();
    let (store, root) =
        import_detached(importer.as_ref(), registry.allocator().clone(), path, root_name)?;
    let scene = registry.install_scene(&name, store)?;
    log::info!(
        "Loaded '{}' into scene '{}' in {:.2} ms",
        path.display(),
        name,
        started.elapsed().as_secs_f64() * 1000.0
    );
    Ok((scene, root))
}
