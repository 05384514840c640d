//! Background scene loads.
//!
//! Each request becomes one blocking task on a small tokio runtime. The
//! worker imports into a detached store and reports back over a `flume`
//! channel; nothing touches the registry until the owning thread calls
//! [`LoadQueue::poll`], which installs finished scenes and runs the
//! completion callbacks on that thread.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use slotmap::{SlotMap, new_key_type};
use tokio::runtime::Runtime;

use super::{SceneImporter, import_detached, scene_name_for};
use crate::core::{EntityAllocator, INVALID_VID, Vid};
use crate::errors::{Result, VizError};
use crate::registry::Registry;
use crate::scene::SceneStore;

const LOAD_WORKERS: usize = 2;

fn load_runtime() -> Option<&'static Runtime> {
    static RUNTIME: OnceLock<Option<Runtime>> = OnceLock::new();
    RUNTIME
        .get_or_init(|| {
            tokio::runtime::Builder::new_multi_thread()
                .worker_threads(LOAD_WORKERS)
                .thread_name("vizm-load")
                .build()
                .inspect_err(|e| log::error!("Load runtime unavailable, loading inline: {e}"))
                .ok()
        })
        .as_ref()
}

new_key_type! {
    pub struct LoadJobId;
}

/// Called on the polling thread with `(scene, root)`.
///
/// Both handles are `INVALID_VID` when the load failed.
pub type LoadCallback = Box<dyn FnOnce(Vid, Vid)>;

/// Handle to an outstanding load.
#[derive(Debug, Clone)]
pub struct LoadTicket {
    id: LoadJobId,
    cancelled: Arc<AtomicBool>,
}

impl LoadTicket {
    #[inline]
    #[must_use]
    pub fn id(&self) -> LoadJobId {
        self.id
    }

    /// Requests cancellation. A cancelled job is discarded when it finishes
    /// and its callback never runs.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Result of one finished load, reported by [`LoadQueue::poll`].
#[derive(Debug)]
pub struct LoadOutcome {
    pub id: LoadJobId,
    pub path: PathBuf,
    /// `(scene, root)` on success.
    pub result: Result<(Vid, Vid)>,
}

struct PendingLoad {
    path: PathBuf,
    scene_name: String,
    callback: Option<LoadCallback>,
    cancelled: Arc<AtomicBool>,
    started: Instant,
}

struct Finished {
    id: LoadJobId,
    result: Result<(SceneStore, Vid)>,
}

pub struct LoadQueue {
    jobs: SlotMap<LoadJobId, PendingLoad>,
    tx: flume::Sender<Finished>,
    rx: flume::Receiver<Finished>,
}

impl Default for LoadQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadQueue {
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = flume::unbounded();
        Self {
            jobs: SlotMap::with_key(),
            tx,
            rx,
        }
    }

    /// Starts loading `path` in the background.
    ///
    /// Concurrent requests each get their own job; none is rejected.
    pub fn submit(
        &mut self,
        importer: Arc<dyn SceneImporter>,
        allocator: EntityAllocator,
        path: &Path,
        root_name: &str,
        scene_name: &str,
        callback: Option<LoadCallback>,
    ) -> LoadTicket {
        let cancelled = Arc::new(AtomicBool::new(false));
        let id = self.jobs.insert(PendingLoad {
            path: path.to_path_buf(),
            scene_name: scene_name_for(path, scene_name),
            callback,
            cancelled: Arc::clone(&cancelled),
            started: Instant::now(),
        });

        log::debug!("Load job {id:?} queued for '{}'", path.display());

        let tx = self.tx.clone();
        let flag = Arc::clone(&cancelled);
        let job_path = path.to_path_buf();
        let root_name = root_name.to_string();
        let task = move || {
            let result = if flag.load(Ordering::Acquire) {
                Err(VizError::LoadCancelled)
            } else {
                import_detached(importer.as_ref(), allocator, &job_path, &root_name)
            };
            // The queue may already be gone; nothing left to report to.
            let _ = tx.send(Finished { id, result });
        };

        match load_runtime() {
            Some(rt) => {
                rt.spawn_blocking(task);
            }
            None => task(),
        }

        LoadTicket { id, cancelled }
    }

    /// Number of jobs not yet installed or discarded.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.jobs.len()
    }

    /// Cancels every outstanding job.
    pub fn cancel_all(&mut self) {
        for job in self.jobs.values() {
            job.cancelled.store(true, Ordering::Release);
        }
    }

    /// Installs every finished load without blocking.
    pub fn poll(&mut self, registry: &mut Registry) -> Vec<LoadOutcome> {
        let finished: Vec<Finished> = self.rx.try_iter().collect();
        finished
            .into_iter()
            .filter_map(|f| self.install(registry, f))
            .collect()
    }

    /// Like [`poll`](Self::poll), but first waits up to `timeout` for a job to
    /// finish when none has yet.
    pub fn poll_timeout(&mut self, registry: &mut Registry, timeout: Duration) -> Vec<LoadOutcome> {
        if self.jobs.is_empty() {
            return Vec::new();
        }
        let mut finished = Vec::new();
        if let Ok(first) = self.rx.recv_timeout(timeout) {
            finished.push(first);
        }
        finished.extend(self.rx.try_iter());
        finished
            .into_iter()
            .filter_map(|f| self.install(registry, f))
            .collect()
    }

    fn install(&mut self, registry: &mut Registry, finished: Finished) -> Option<LoadOutcome> {
        let job = self.jobs.remove(finished.id)?;
        if job.cancelled.load(Ordering::Acquire) {
            log::info!("Load of '{}' cancelled", job.path.display());
            return None;
        }

        let result = finished.result.and_then(|(store, root)| {
            registry
                .install_scene(&job.scene_name, store)
                .map(|scene| (scene, root))
        });

        match &result {
            Ok((scene, _)) => log::info!(
                "Loaded '{}' into scene '{}' ({}) in {:.2} ms",
                job.path.display(),
                job.scene_name,
                scene,
                job.started.elapsed().as_secs_f64() * 1000.0
            ),
            Err(e) => log::error!("Load of '{}' failed: {e}", job.path.display()),
        }

        if let Some(callback) = job.callback {
            let (scene, root) = result.as_ref().map_or((INVALID_VID, INVALID_VID), |r| *r);
            callback(scene, root);
        }

        Some(LoadOutcome {
            id: finished.id,
            path: job.path,
            result,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Tree;

    impl SceneImporter for Tree {
        fn import(&self, _path: &Path, store: &mut SceneStore) -> Result<Vid> {
            let root = store.create_node("root")?;
            let cam = store.create_camera("cam")?;
            store.attach(cam, root)?;
            Ok(root)
        }
    }

    fn drain(queue: &mut LoadQueue, reg: &mut Registry) -> Vec<LoadOutcome> {
        let mut out = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(10);
        while queue.pending() > 0 && Instant::now() < deadline {
            out.extend(queue.poll_timeout(reg, Duration::from_millis(50)));
        }
        out
    }

    #[test]
    fn concurrent_loads_each_install_and_call_back() {
        let mut reg = Registry::default();
        let mut queue = LoadQueue::new();
        let calls = Rc::new(Cell::new(0));

        for name in ["a", "b"] {
            let calls = Rc::clone(&calls);
            queue.submit(
                Arc::new(Tree),
                reg.allocator().clone(),
                Path::new("model.glb"),
                "",
                name,
                Some(Box::new(move |scene, root| {
                    assert_ne!(scene, INVALID_VID);
                    assert_ne!(root, INVALID_VID);
                    calls.set(calls.get() + 1);
                })),
            );
        }
        assert_eq!(queue.pending(), 2);

        let outcomes = drain(&mut queue, &mut reg);
        assert_eq!(outcomes.len(), 2);
        assert_eq!(calls.get(), 2);
        assert!(reg.find_scene_by_name("a").is_some());
        assert!(reg.find_scene_by_name("b").is_some());
        assert_eq!(reg.renderer_count(), 0);
    }

    #[test]
    fn cancelled_job_is_discarded() {
        let mut reg = Registry::default();
        let mut queue = LoadQueue::new();
        let ticket = queue.submit(
            Arc::new(Tree),
            reg.allocator().clone(),
            Path::new("model.glb"),
            "",
            "dropped",
            Some(Box::new(|_, _| panic!("callback of a cancelled load"))),
        );
        ticket.cancel();
        assert!(ticket.is_cancelled());

        let outcomes = drain(&mut queue, &mut reg);
        assert!(outcomes.is_empty());
        assert_eq!(queue.pending(), 0);
        assert!(reg.find_scene_by_name("dropped").is_none());
    }
}
