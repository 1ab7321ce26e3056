//! Cache Resolution Coordinator
//!
//! Rebuilds run on a background thread. The rebuild fans out one scoped
//! task per active scene, each re-running the normal loaders against a
//! fresh generation. The fresh generation is published only when every
//! scene fits; otherwise the live caches stay as they are and the
//! resolution error handler is told.

use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use super::{
    default_resolution_error_handler, CacheGeneration, CacheState, CacheStateCell, Completion,
    GlobalCaches, Populator, ResolutionError, ResolutionErrorHandler,
};
use crate::assets::AssetError;
use crate::foundation::time::Stopwatch;
use crate::scene::Scene;

/// Single-flight rebuild coordinator
pub struct CacheResolver {
    caches: Arc<GlobalCaches>,
    state: Arc<CacheStateCell>,
    populator: Populator,
    handler: Arc<RwLock<ResolutionErrorHandler>>,
    max_sprites: usize,
    max_sounds: usize,
    rebuilds_started: AtomicUsize,
    worker: Mutex<Option<JoinHandle<()>>>,
}

/// Everything a rebuild thread needs, moved into it
struct RebuildJob {
    rebuild: usize,
    scenes: Vec<Arc<Scene>>,
    epochs: Vec<u64>,
    caches: Arc<GlobalCaches>,
    state: Arc<CacheStateCell>,
    populator: Populator,
    handler: Arc<RwLock<ResolutionErrorHandler>>,
    max_sprites: usize,
    max_sounds: usize,
}

impl CacheResolver {
    /// Coordinator publishing into `caches`, sizing rebuilt caches to the given capacities
    pub fn new(caches: Arc<GlobalCaches>, populator: Populator, max_sprites: usize, max_sounds: usize) -> Self {
        Self {
            caches,
            state: Arc::new(CacheStateCell::new()),
            populator,
            handler: Arc::new(RwLock::new(default_resolution_error_handler())),
            max_sprites,
            max_sounds,
            rebuilds_started: AtomicUsize::new(0),
            worker: Mutex::new(None),
        }
    }

    /// Current coherency state
    pub fn state(&self) -> CacheState {
        self.state.get()
    }

    /// Record that a loader hit capacity on the live generation
    pub fn signal_exhausted(&self) -> bool {
        let signaled = self.state.signal_exhausted();
        if signaled {
            log::warn!("Live caches exhausted, scheduling rebuild");
        }
        signaled
    }

    /// Allow another rebuild after a failed one
    pub fn retry(&self) -> bool {
        let retried = self.state.retry();
        if retried {
            log::info!("Active demand changed, retrying cache rebuild");
        }
        retried
    }

    /// Number of rebuilds started so far
    pub fn rebuilds_started(&self) -> usize {
        self.rebuilds_started.load(Ordering::Acquire)
    }

    /// Install `handler` for rebuild failures, returning the previous one
    pub fn set_error_handler(&self, handler: ResolutionErrorHandler) -> ResolutionErrorHandler {
        std::mem::replace(&mut *self.handler.write(), handler)
    }

    /// Start a rebuild for `scenes` if the caches are exhausted and no
    /// rebuild is in flight. Returns whether a rebuild started.
    pub fn resolve_if_exhausted(&self, scenes: Vec<Arc<Scene>>) -> bool {
        if !self.state.begin_resolving() {
            return false;
        }

        let rebuild = self.rebuilds_started.fetch_add(1, Ordering::AcqRel) + 1;
        log::info!(
            "Cache rebuild #{rebuild} started for {} active scenes",
            scenes.len()
        );

        let job = RebuildJob {
            rebuild,
            epochs: scenes.iter().map(|scene| scene.epoch()).collect(),
            scenes,
            caches: Arc::clone(&self.caches),
            state: Arc::clone(&self.state),
            populator: self.populator.clone(),
            handler: Arc::clone(&self.handler),
            max_sprites: self.max_sprites,
            max_sounds: self.max_sounds,
        };

        match std::thread::Builder::new()
            .name(format!("cache-rebuild-{rebuild}"))
            .spawn(move || job.run())
        {
            Ok(handle) => {
                *self.worker.lock() = Some(handle);
                true
            }
            Err(err) => {
                log::error!("Could not start cache rebuild #{rebuild}: {err}");
                self.state.abandon();
                false
            }
        }
    }

    /// Block until the most recent rebuild thread has finished
    pub fn wait_idle(&self) {
        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                log::error!("Cache rebuild thread panicked");
            }
        }
    }
}

impl std::fmt::Debug for CacheResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheResolver")
            .field("state", &self.state())
            .field("rebuilds_started", &self.rebuilds_started())
            .field("max_sprites", &self.max_sprites)
            .field("max_sounds", &self.max_sounds)
            .finish_non_exhaustive()
    }
}

impl RebuildJob {
    fn run(self) {
        let stopwatch = Stopwatch::start_new();
        let fresh = CacheGeneration::new(self.max_sprites, self.max_sounds);

        let failure = self.populate_all(&fresh);
        let succeeded = failure.is_none();

        match failure {
            None => {
                self.caches.publish(fresh);
                self.state.finish_resolved();
                log::info!(
                    "Cache rebuild #{} finished in {:.2}ms ({} scenes)",
                    self.rebuild,
                    stopwatch.elapsed_millis(),
                    self.scenes.len()
                );
            }
            Some((scene, source)) => {
                self.state.finish_failed();
                let err = ResolutionError {
                    rebuild: self.rebuild,
                    scene,
                    source,
                };
                log::error!(
                    "Cache rebuild #{} failed after {:.2}ms: {err}",
                    self.rebuild,
                    stopwatch.elapsed_millis()
                );
                let handler = Arc::clone(&*self.handler.read());
                handler(&err);
            }
        }

        let completion = Completion::Rebuilt {
            rebuild: self.rebuild,
            scenes: self.scenes.into_iter().zip(self.epochs).collect(),
            succeeded,
        };
        if self.populator.sender().send(completion).is_err() {
            log::trace!("Rebuild finished after the client shut down");
        }
    }

    /// Populate every scene concurrently; first failure wins
    fn populate_all(&self, fresh: &CacheGeneration) -> Option<(String, AssetError)> {
        std::thread::scope(|scope| {
            let tasks: Vec<_> = self
                .scenes
                .iter()
                .map(|scene| {
                    let populator = &self.populator;
                    (scene, scope.spawn(move || populator.populate(scene, fresh)))
                })
                .collect();

            let mut first = None;
            for (scene, task) in tasks {
                let outcome = task.join().unwrap_or_else(|_| {
                    Err(AssetError::Decode {
                        key: scene.name().to_string(),
                        reason: "population task panicked".to_string(),
                    })
                });
                if let Err(err) = outcome {
                    if first.is_none() {
                        first = Some((scene.name().to_string(), err));
                    }
                }
            }
            first
        })
    }
}
