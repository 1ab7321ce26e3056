//! Per-frame client driver
//!
//! The [`Client`] wires the scene manager, the live cache generation, the
//! cache resolver and the camera readiness system together. Call
//! [`Client::update`] once per tick; it never blocks on asset loading.

use crossbeam::channel::Receiver;
use std::sync::Arc;
use thiserror::Error;

use crate::assets::{self, AssetError, AssetSource, EmbeddedAssetSource, SoundLoader, SpriteLoader};
use crate::cache::{
    CacheResolver, CacheState, Completion, GlobalCaches, Populator, ResolutionErrorHandler,
};
use crate::config::ConfigError;
use crate::core::config::ClientConfig;
use crate::ecs::Entity;
use crate::foundation::time::TickClock;
use crate::readiness::{
    AssignmentReport, Camera, CameraError, CameraRig, CameraSceneAssigner, CameraSceneTracker,
    ReadinessGate,
};
use crate::scene::{Scene, SceneError, SceneManager, ScenePlan, DEFAULT_LOADING_SCENE};

/// Client-level errors
#[derive(Error, Debug)]
pub enum ClientError {
    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Scene registration, transition or plan failure
    #[error("scene error: {0}")]
    Scene(#[from] SceneError),

    /// Asset population failed for a reason other than capacity
    #[error("asset error in scene '{scene}': {source}")]
    Asset {
        /// Scene being populated
        scene: String,
        /// Loader error
        #[source]
        source: AssetError,
    },

    /// Camera request could not be served
    #[error("camera error: {0}")]
    Camera(#[from] CameraError),
}

/// What to draw for one active scene this frame
#[derive(Debug, Clone)]
pub struct Presentation {
    /// Active scene
    pub scene: Arc<Scene>,
    /// Scene to draw in its place: the scene itself or a loading scene
    pub shown: Arc<Scene>,
}

impl Presentation {
    /// Whether a loading scene stands in for the active scene
    pub fn is_loading(&self) -> bool {
        !Arc::ptr_eq(&self.scene, &self.shown)
    }
}

/// Main client struct
///
/// Owns every subsystem and drives them one tick at a time.
pub struct Client {
    config: ClientConfig,
    clock: TickClock,
    scenes: SceneManager,
    caches: Arc<GlobalCaches>,
    resolver: CacheResolver,
    populator: Populator,
    completions: Receiver<Completion>,
    rig: CameraRig,
    tracker: CameraSceneTracker,
    gate: ReadinessGate,
    assigner: CameraSceneAssigner,
    last_assignment: AssignmentReport,
}

impl Client {
    /// Create a client reading asset bytes from `source`
    pub fn new(config: ClientConfig, source: Arc<dyn AssetSource>) -> Result<Self, ClientError> {
        config.validate()?;
        log::info!("Initializing client '{}'...", config.title);

        let cache = &config.cache;
        let clock = TickClock::new();
        let caches = Arc::new(GlobalCaches::new(cache.max_sprites_cached, cache.max_sounds_cached));
        let (sender, completions) = crossbeam::channel::unbounded();
        let populator = Populator::new(
            SpriteLoader::new(Arc::clone(&source)),
            SoundLoader::new(source),
            sender,
        );
        let resolver = CacheResolver::new(
            Arc::clone(&caches),
            populator.clone(),
            cache.max_sprites_cached,
            cache.max_sounds_cached,
        );
        let scenes = SceneManager::new(cache.max_scenes_cached, clock.clone());
        let gate = ReadinessGate::new(&config.loading, clock.clone());
        let assigner = CameraSceneAssigner::new(config.loading.minimum_load_ticks);

        Ok(Self {
            config,
            clock,
            scenes,
            caches,
            resolver,
            populator,
            completions,
            rig: CameraRig::new(),
            tracker: CameraSceneTracker::new(),
            gate,
            assigner,
            last_assignment: AssignmentReport::default(),
        })
    }

    /// Create a client with the asset backend selected by `config.assets.mode`
    pub fn from_config(
        config: ClientConfig,
        embedded: Option<EmbeddedAssetSource>,
    ) -> Result<Self, ClientError> {
        let source = assets::source_for(&config.assets, embedded);
        Self::new(config, source)
    }

    // ========================================================================
    // Frame loop
    // ========================================================================

    /// Advance one tick.
    ///
    /// Runs pending scene plans, consumes background completions, starts
    /// population for unresolved active scenes, kicks off a cache rebuild
    /// when the live caches are exhausted and reassigns cameras. Rebuild
    /// failures go to the resolution error handler, never to the caller.
    pub fn update(&mut self) -> Result<AssignmentReport, ClientError> {
        self.ensure_loading_scene();

        let active = self.scenes.active_scenes();
        for scene in &active {
            scene.execute_plan()?;
        }

        self.drain_completions()?;

        if self.resolver.state() == CacheState::Nominal {
            let generation = self.caches.snapshot();
            for scene in &active {
                if !scene.is_loaded() && scene.try_start_loading() {
                    self.populator.spawn(Arc::clone(scene), generation.clone());
                }
            }
        }

        if self.resolver.state() == CacheState::Exhausted {
            self.resolver.resolve_if_exhausted(active.clone());
        }

        let tick = self.clock.current();
        self.last_assignment = self.assigner.run(&active, &mut self.rig, &mut self.tracker, tick);
        self.clock.advance();
        Ok(self.last_assignment)
    }

    fn ensure_loading_scene(&self) {
        if self.scenes.loading_scenes().is_empty() {
            self.scenes
                .add_loading_scene(Arc::new(Scene::new(DEFAULT_LOADING_SCENE, 0, 0, None)));
        }
    }

    /// Apply every queued completion. The first non-capacity population
    /// error is returned once the queue is empty.
    fn drain_completions(&self) -> Result<(), ClientError> {
        let mut failure = None;
        for completion in self.completions.try_iter() {
            match completion {
                Completion::Populated { scene, epoch, tags, result } => {
                    if let Err(err) = self.apply_population(&scene, epoch, tags, result) {
                        failure.get_or_insert(ClientError::Asset {
                            scene: scene.name().to_string(),
                            source: err,
                        });
                    }
                }
                Completion::Rebuilt { scenes, succeeded, rebuild } => {
                    if succeeded {
                        self.apply_rebuild(&scenes);
                        log::debug!("Applied cache rebuild #{rebuild}");
                    }
                }
            }
        }
        failure.map_or(Ok(()), Err)
    }

    /// Rebuild tasks hold no loading claim, so only `loaded` is touched here
    fn apply_rebuild(&self, scenes: &[(Arc<Scene>, u64)]) {
        for (scene, epoch) in scenes {
            if !self.scenes.is_active(scene) {
                // Left the active set mid-rebuild; drop what the rebuild resolved
                scene.reset_asset_locations();
            } else if scene.epoch() == *epoch {
                scene.mark_loaded();
            }
        }
    }

    /// Consume one population outcome. This is the only place a
    /// population's loading claim is released.
    fn apply_population(
        &self,
        scene: &Arc<Scene>,
        epoch: u64,
        tags: (u32, u32),
        result: Result<(), AssetError>,
    ) -> Result<(), AssetError> {
        if !self.scenes.is_active(scene) {
            // The worker kept resolving after the scene was deactivated
            scene.reset_asset_locations();
            scene.abort_loading();
            return Ok(());
        }
        if epoch != scene.epoch() || tags != self.caches.tags() {
            // Reset since the worker started, or populated a retired generation
            scene.abort_loading();
            return Ok(());
        }

        match result {
            Ok(()) => {
                scene.finish_loading();
                Ok(())
            }
            Err(err) if err.is_capacity_exceeded() => {
                log::warn!("Scene '{}' does not fit the live caches: {err}", scene.name());
                self.resolver.signal_exhausted();
                scene.abort_loading();
                Ok(())
            }
            Err(err) => {
                log::error!("Failed to populate scene '{}': {err}", scene.name());
                scene.abort_loading();
                Err(err)
            }
        }
    }

    /// Block until the in-flight rebuild thread, if any, has finished
    pub fn wait_for_rebuild(&self) {
        self.resolver.wait_idle();
    }

    // ========================================================================
    // Scenes
    // ========================================================================

    /// Register a scene; the first one becomes active immediately
    pub fn register_scene(
        &self,
        name: &str,
        width: u32,
        height: u32,
        plan: Option<ScenePlan>,
    ) -> Result<Arc<Scene>, ClientError> {
        Ok(self.scenes.register_scene(name, width, height, plan)?)
    }

    /// Register a scene shown while active scenes are not ready
    pub fn register_loading_scene(
        &self,
        name: &str,
        width: u32,
        height: u32,
        plan: Option<ScenePlan>,
    ) -> Result<Arc<Scene>, ClientError> {
        Ok(self.scenes.register_loading_scene(name, width, height, plan)?)
    }

    /// Activate `scene`, moving `entities` into it
    pub fn activate_scene(&self, scene: &Arc<Scene>, entities: &[Entity]) -> Result<(), ClientError> {
        Ok(self.scenes.activate_scene(scene, entities)?)
    }

    /// Activate the scene named `name`; returns its registry index
    pub fn activate_scene_by_name(&self, name: &str, entities: &[Entity]) -> Result<usize, ClientError> {
        Ok(self.scenes.activate_scene_by_name(name, entities)?)
    }

    /// Replace the single active scene with `scene`
    pub fn change_scene(&self, scene: &Arc<Scene>, entities: &[Entity]) -> Result<(), ClientError> {
        Ok(self.scenes.change_scene(scene, entities)?)
    }

    /// Replace the single active scene with the one named `name`
    pub fn change_scene_by_name(&self, name: &str, entities: &[Entity]) -> Result<usize, ClientError> {
        Ok(self.scenes.change_scene_by_name(name, entities)?)
    }

    /// Deactivate `scene`. A failed rebuild is retried since demand shrank.
    pub fn deactivate_scene(&self, scene: &Arc<Scene>) -> bool {
        let deactivated = self.scenes.deactivate_scene(scene);
        if deactivated {
            self.resolver.retry();
        }
        deactivated
    }

    /// Deactivate the scene named `name`
    pub fn deactivate_scene_by_name(&self, name: &str) -> Result<bool, ClientError> {
        let (_, scene) = self.scenes.scene_by_name(name)?;
        Ok(self.deactivate_scene(&scene))
    }

    /// Scene manager
    pub const fn scenes(&self) -> &SceneManager {
        &self.scenes
    }

    /// Snapshot of the active scenes
    pub fn active_scenes(&self) -> Vec<Arc<Scene>> {
        self.scenes.active_scenes()
    }

    /// Scene to draw for every active scene this frame.
    ///
    /// The first loading scene stands in for any active scene that is not
    /// ready or has a camera still inside its minimum loading window.
    pub fn presentations(&self) -> Vec<Presentation> {
        let fallback = self.scenes.loading_scenes().into_iter().next();
        self.scenes
            .active_scenes()
            .into_iter()
            .map(|scene| {
                let cameras_ready = self
                    .active_cameras_for(&scene)
                    .iter()
                    .all(|camera| self.gate.ready(camera, &self.tracker));
                let shown = match &fallback {
                    Some(loading) if !(cameras_ready && scene.is_ready()) => Arc::clone(loading),
                    _ => Arc::clone(&scene),
                };
                Presentation { scene, shown }
            })
            .collect()
    }

    // ========================================================================
    // Caches
    // ========================================================================

    /// Live cache generation
    pub fn caches(&self) -> &Arc<GlobalCaches> {
        &self.caches
    }

    /// Coherency state of the live caches
    pub fn cache_state(&self) -> CacheState {
        self.resolver.state()
    }

    /// Number of cache rebuilds started
    pub fn rebuilds_started(&self) -> usize {
        self.resolver.rebuilds_started()
    }

    /// Replace the rebuild failure handler, returning the previous one
    pub fn set_resolution_error_handler(&self, handler: ResolutionErrorHandler) -> ResolutionErrorHandler {
        self.resolver.set_error_handler(handler)
    }

    // ========================================================================
    // Cameras
    // ========================================================================

    /// Activate the first free camera
    pub fn activate_camera(&mut self) -> Result<usize, ClientError> {
        Ok(self.rig.activate_camera()?)
    }

    /// Every camera
    pub fn cameras(&self) -> &[Camera] {
        self.rig.cameras()
    }

    /// Active cameras bound to `scene`
    pub fn active_cameras_for(&self, scene: &Arc<Scene>) -> Vec<Camera> {
        self.tracker
            .cameras_for(scene)
            .into_iter()
            .filter_map(|index| self.rig.camera(index).ok())
            .filter(|camera| camera.is_active())
            .cloned()
            .collect()
    }

    /// Whether camera `index` may show its bound scene
    pub fn camera_ready(&self, index: usize) -> Result<bool, ClientError> {
        let camera = self.rig.camera(index)?;
        Ok(self.gate.ready(camera, &self.tracker))
    }

    /// Camera bindings
    pub const fn camera_tracker(&self) -> &CameraSceneTracker {
        &self.tracker
    }

    /// Outcome of the latest camera assignment pass
    pub const fn last_assignment(&self) -> AssignmentReport {
        self.last_assignment
    }

    // ========================================================================
    // Time
    // ========================================================================

    /// Current tick
    pub fn current_tick(&self) -> u64 {
        self.clock.current()
    }

    /// Client configuration
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("title", &self.config.title)
            .field("tick", &self.current_tick())
            .field("scenes", &self.scenes)
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{AssetKind, SpriteBundle};
    use crate::ecs::{CameraIndex, Components, Storage};
    use std::time::{Duration, Instant};

    fn png() -> Vec<u8> {
        let image = image::RgbaImage::from_pixel(2, 2, image::Rgba([4, 5, 6, 255]));
        let mut cursor = std::io::Cursor::new(Vec::new());
        image.write_to(&mut cursor, image::ImageFormat::Png).unwrap();
        cursor.into_inner()
    }

    fn client(config: ClientConfig) -> Client {
        let archive = EmbeddedAssetSource::new();
        archive.insert(AssetKind::Image, "hero.png", png());
        let client = Client::new(config, Arc::new(archive)).unwrap();
        client.set_resolution_error_handler(Arc::new(|_: &crate::cache::ResolutionError| {}));
        client
    }

    fn hero_plan() -> ScenePlan {
        Box::new(|_, _, storage: &Storage| {
            storage.spawn(
                Components::new()
                    .with_sprites(SpriteBundle::from_paths(["hero.png"])?)
                    .with_camera(CameraIndex(0)),
            );
            Ok(())
        })
    }

    fn update_until(client: &mut Client, done: impl Fn(&Client) -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !done(client) {
            assert!(Instant::now() < deadline, "condition not reached in time");
            client.update().unwrap();
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn test_from_config_reads_embedded_archive() {
        let archive = EmbeddedAssetSource::new();
        archive.insert(AssetKind::Image, "hero.png", png());
        let mut config = ClientConfig::new("embedded");
        config.assets.mode = crate::core::config::AssetMode::Embedded;

        let mut client = Client::from_config(config, Some(archive)).unwrap();
        client.set_resolution_error_handler(Arc::new(|_: &crate::cache::ResolutionError| {}));
        let scene = client.register_scene("one", 8, 8, Some(hero_plan())).unwrap();

        update_until(&mut client, |_| scene.is_ready());
        assert!(client.caches().snapshot().sprites.contains_key("hero.png"));
    }

    #[test]
    fn test_rebuild_outcome_respects_activation() {
        let client = client(ClientConfig::new("test"));
        let kept = client.register_scene("kept", 1, 1, None).unwrap();
        let bounced = client.register_scene("bounced", 1, 1, None).unwrap();
        let dropped = client.register_scene("dropped", 1, 1, None).unwrap();
        client.activate_scene(&bounced, &[]).unwrap();
        client.activate_scene(&dropped, &[]).unwrap();

        let bundle = SpriteBundle::from_paths(["hero.png"]).unwrap();
        dropped.storage().spawn(Components::new().with_sprites(bundle.clone()));
        let epochs: Vec<_> = [&kept, &bounced, &dropped]
            .into_iter()
            .map(|scene| (Arc::clone(scene), scene.epoch()))
            .collect();

        client.deactivate_scene(&bounced);
        client.activate_scene(&bounced, &[]).unwrap();
        client.deactivate_scene(&dropped);
        bundle.blueprints()[0].location.resolve(42, 0);

        client.apply_rebuild(&epochs);
        assert!(kept.is_loaded());
        assert!(!bounced.is_loaded());
        assert!(!dropped.is_loaded());
        assert!(!bundle.blueprints()[0].location.is_resolved());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ClientConfig::new("bad").with_capacities(0, 4);
        let err = Client::new(config, Arc::new(EmbeddedAssetSource::new())).unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn test_update_installs_default_loading_scene() {
        let mut client = client(ClientConfig::new("test"));
        assert!(client.scenes().loading_scenes().is_empty());
        client.update().unwrap();
        let loading = client.scenes().loading_scenes();
        assert_eq!(loading.len(), 1);
        assert_eq!(loading[0].name(), DEFAULT_LOADING_SCENE);
        assert_eq!(client.current_tick(), 1);
    }

    #[test]
    fn test_scene_becomes_ready_and_claims_camera() {
        let mut client = client(ClientConfig::new("test"));
        let scene = client.register_scene("one", 64, 64, Some(hero_plan())).unwrap();

        update_until(&mut client, |_| scene.is_ready());
        assert!(client.caches().snapshot().sprites.contains_key("hero.png"));

        client.update().unwrap();
        assert!(client.cameras()[0].is_active());
        assert_eq!(client.active_cameras_for(&scene).len(), 1);
        assert!(client.camera_ready(0).unwrap());

        let presentations = client.presentations();
        assert_eq!(presentations.len(), 1);
        assert!(!presentations[0].is_loading());
    }

    #[test]
    fn test_unready_scene_presents_loading_scene() {
        let mut client = client(ClientConfig::new("test").with_minimum_load(1000, true));
        let scene = client.register_scene("one", 64, 64, Some(hero_plan())).unwrap();

        update_until(&mut client, |_| scene.is_ready());
        client.update().unwrap();

        let presentations = client.presentations();
        assert!(presentations[0].is_loading());
        assert_eq!(presentations[0].shown.name(), DEFAULT_LOADING_SCENE);
    }

    #[test]
    fn test_missing_asset_is_reported() {
        let mut client = client(ClientConfig::new("test"));
        let scene = client
            .register_scene(
                "broken",
                1,
                1,
                Some(Box::new(|_, _, storage: &Storage| {
                    storage.spawn(Components::new().with_sprites(SpriteBundle::from_paths(["missing.png"])?));
                    Ok(())
                })),
            )
            .unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        let err = loop {
            assert!(Instant::now() < deadline, "population error never surfaced");
            match client.update() {
                Ok(_) => std::thread::sleep(Duration::from_millis(2)),
                Err(err) => break err,
            }
        };
        assert!(matches!(
            err,
            ClientError::Asset { source: AssetError::NotFound(_), .. }
        ));
        assert!(!scene.is_loading());
        assert_eq!(client.cache_state(), CacheState::Nominal);
    }
}
