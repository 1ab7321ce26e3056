//! Scene state

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use super::SceneError;
use crate::ecs::{Query, Storage};

/// Error type returned by scene plans
pub type PlanError = Box<dyn std::error::Error + Send + Sync>;

/// Populates a freshly activated scene; receives width, height and storage
pub type ScenePlan = Box<dyn Fn(u32, u32, &Storage) -> Result<(), PlanError> + Send + Sync>;

/// Isolated world of entities with asset-loading flags.
///
/// `loaded` and `loading` are flipped from background population tasks and
/// read by the frame loop, so they are plain atomics. The `loading` flag is
/// only ever raised through [`try_start_loading`](Self::try_start_loading)
/// and only lowered by whoever consumes that population's completion.
///
/// The epoch counts deactivations. A population started under an older
/// epoch wrote into bundles that have since been reset, so its outcome is
/// discarded.
pub struct Scene {
    name: String,
    width: u32,
    height: u32,
    storage: Storage,
    plan: Option<ScenePlan>,
    plan_executed: AtomicBool,
    loaded: AtomicBool,
    loading: AtomicBool,
    epoch: AtomicU64,
    last_activated_tick: AtomicU64,
    last_selected_tick: AtomicU64,
}

impl Scene {
    /// Create a scene with an empty storage
    pub fn new(name: impl Into<String>, width: u32, height: u32, plan: Option<ScenePlan>) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            storage: Storage::new(),
            plan,
            plan_executed: AtomicBool::new(false),
            loaded: AtomicBool::new(false),
            loading: AtomicBool::new(false),
            epoch: AtomicU64::new(0),
            last_activated_tick: AtomicU64::new(0),
            last_selected_tick: AtomicU64::new(0),
        }
    }

    /// Scene name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Width in world units
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in world units
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Entity storage owned by this scene
    pub const fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Run the plan if it has not run yet. Returns whether it ran.
    pub fn execute_plan(&self) -> Result<bool, SceneError> {
        if self
            .plan_executed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(false);
        }
        let Some(plan) = &self.plan else {
            return Ok(false);
        };

        log::debug!("Executing plan for scene '{}'", self.name);
        plan(self.width, self.height, &self.storage).map_err(|source| SceneError::Plan {
            scene: self.name.clone(),
            source,
        })?;
        Ok(true)
    }

    /// Whether the plan already ran (or there is none to run)
    pub fn plan_executed(&self) -> bool {
        self.plan.is_none() || self.plan_executed.load(Ordering::Acquire)
    }

    /// Claim the right to populate this scene. Succeeds for exactly one
    /// caller until the attempt is finished or aborted.
    pub fn try_start_loading(&self) -> bool {
        self.loading
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Mark assets resolved and end the loading attempt
    pub fn finish_loading(&self) {
        self.loaded.store(true, Ordering::Release);
        self.loading.store(false, Ordering::Release);
    }

    /// End the loading attempt, leaving `loaded` as it is
    pub fn abort_loading(&self) {
        self.loading.store(false, Ordering::Release);
    }

    /// Mark assets resolved without touching a loading claim held elsewhere
    pub fn mark_loaded(&self) {
        self.loaded.store(true, Ordering::Release);
    }

    /// Whether assets were resolved by the last loading attempt
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    /// Whether a loading attempt is in flight
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    /// Loaded and not currently loading
    pub fn is_ready(&self) -> bool {
        self.is_loaded() && !self.is_loading()
    }

    /// Number of times the scene's asset references were reset
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Tick of the last fresh activation
    pub fn last_activated_tick(&self) -> u64 {
        self.last_activated_tick.load(Ordering::Acquire)
    }

    /// Tick of the last activation or re-selection
    pub fn last_selected_tick(&self) -> u64 {
        self.last_selected_tick.load(Ordering::Acquire)
    }

    pub(crate) fn stamp_activated(&self, tick: u64) {
        self.last_activated_tick.store(tick, Ordering::Release);
    }

    pub(crate) fn stamp_selected(&self, tick: u64) {
        self.last_selected_tick.store(tick, Ordering::Release);
    }

    /// Forget every resolved asset slot, mark the scene unloaded and start
    /// a new epoch.
    ///
    /// Used when the scene leaves the active set: a later cache rebuild may
    /// drop its assets, so every reference has to go back to key lookup.
    /// An in-flight population keeps its loading claim.
    pub fn reset_asset_locations(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        let world = self.storage.read();
        for (_, components) in world.query(Query::all().with_sprites()) {
            if let Some(bundle) = &components.sprites {
                bundle.reset_locations();
            }
        }
        for (_, components) in world.query(Query::all().with_sounds()) {
            if let Some(bundle) = &components.sounds {
                bundle.reset_locations();
            }
        }
        drop(world);
        self.loaded.store(false, Ordering::Release);
    }

    /// Non-empty sprite keys referenced by this scene's entities
    pub fn sprite_keys(&self) -> Vec<String> {
        self.storage
            .cursor(Query::all().with_sprites())
            .filter_map(|(_, components)| components.sprites)
            .flat_map(|bundle| bundle.keys().map(str::to_string).collect::<Vec<_>>())
            .collect()
    }

    /// Non-empty sound keys referenced by this scene's entities
    pub fn sound_keys(&self) -> Vec<String> {
        self.storage
            .cursor(Query::all().with_sounds())
            .filter_map(|(_, components)| components.sounds)
            .flat_map(|bundle| bundle.keys().map(str::to_string).collect::<Vec<_>>())
            .collect()
    }
}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("name", &self.name)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("entities", &self.storage.len())
            .field("loaded", &self.is_loaded())
            .field("loading", &self.is_loading())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{SoundBundle, SpriteBundle};
    use crate::ecs::Components;

    #[test]
    fn test_loading_flag_claimed_once() {
        let scene = Scene::new("one", 10, 10, None);
        assert!(scene.try_start_loading());
        assert!(!scene.try_start_loading());
        assert!(!scene.is_ready());

        scene.finish_loading();
        assert!(scene.is_ready());
        assert!(scene.try_start_loading());
        assert!(!scene.is_ready());
    }

    #[test]
    fn test_reset_keeps_in_flight_claim() {
        let scene = Scene::new("busy", 1, 1, None);
        assert!(scene.try_start_loading());
        scene.mark_loaded();

        scene.reset_asset_locations();
        assert!(!scene.is_loaded());
        assert!(scene.is_loading());
        assert!(!scene.try_start_loading());

        scene.abort_loading();
        assert!(scene.try_start_loading());
    }

    #[test]
    fn test_plan_runs_once() {
        let scene = Scene::new(
            "planned",
            32,
            16,
            Some(Box::new(|width, height, storage: &Storage| {
                assert_eq!((width, height), (32, 16));
                storage.spawn(Components::new());
                Ok(())
            })),
        );
        assert!(!scene.plan_executed());
        assert!(scene.execute_plan().unwrap());
        assert!(!scene.execute_plan().unwrap());
        assert!(scene.plan_executed());
        assert_eq!(scene.storage().len(), 1);
    }

    #[test]
    fn test_plan_error_is_reported() {
        let scene = Scene::new(
            "broken",
            1,
            1,
            Some(Box::new(|_, _, _: &Storage| Err("no level data".into()))),
        );
        let err = scene.execute_plan().unwrap_err();
        assert!(matches!(err, SceneError::Plan { ref scene, .. } if scene == "broken"));
    }

    #[test]
    fn test_reset_asset_locations() {
        let scene = Scene::new("s", 1, 1, None);
        let sprites = SpriteBundle::from_paths(["a.png"]).unwrap();
        let sounds = SoundBundle::from_paths(["a.wav"]).unwrap();
        scene
            .storage()
            .spawn(Components::new().with_sprites(sprites.clone()).with_sounds(sounds.clone()));

        sprites.blueprints()[0].location.resolve(3, 0);
        sounds.blueprints()[0].location.resolve(4, 0);
        scene.try_start_loading();
        scene.finish_loading();

        let epoch = scene.epoch();
        scene.reset_asset_locations();
        assert_eq!(scene.epoch(), epoch + 1);
        assert!(!sprites.blueprints()[0].location.is_resolved());
        assert!(!sounds.blueprints()[0].location.is_resolved());
        assert!(!scene.is_loaded());
        assert_eq!(scene.sprite_keys(), vec!["a.png".to_string()]);
        assert_eq!(scene.sound_keys(), vec!["a.wav".to_string()]);
    }
}
