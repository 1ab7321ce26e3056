//! Scene Manager - registry and active-scene lifecycle
//!
//! The manager owns every registered scene (a bounded registry with the
//! same overflow semantics as the asset caches) and the ordered list of
//! active scenes. Activation moves entities into the target scene's storage
//! as one transaction before the target joins the active list.

use parking_lot::RwLock;
use std::sync::Arc;

use super::{Scene, SceneError, ScenePlan};
use crate::ecs::{Entity, Storage, TransferError};
use crate::foundation::collections::BoundedCache;
use crate::foundation::time::TickClock;

#[derive(Default)]
struct SceneLists {
    active: Vec<Arc<Scene>>,
    loading: Vec<Arc<Scene>>,
}

/// Owns the scene registry and the active / loading scene lists
pub struct SceneManager {
    lists: RwLock<SceneLists>,
    registry: BoundedCache<Scene>,
    clock: TickClock,
}

impl SceneManager {
    /// Create a manager holding at most `max_scenes` registered scenes
    pub fn new(max_scenes: usize, clock: TickClock) -> Self {
        log::info!("Scene manager created (registry capacity {max_scenes})");
        Self {
            lists: RwLock::new(SceneLists::default()),
            registry: BoundedCache::new(max_scenes),
            clock,
        }
    }

    /// Scene registry
    pub const fn cache(&self) -> &BoundedCache<Scene> {
        &self.registry
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    /// Snapshot of the active scenes, in order
    pub fn active_scenes(&self) -> Vec<Arc<Scene>> {
        self.lists.read().active.clone()
    }

    /// Active scene at `index`
    pub fn active_scene(&self, index: usize) -> Option<Arc<Scene>> {
        self.lists.read().active.get(index).cloned()
    }

    /// Number of active scenes
    pub fn scene_count(&self) -> usize {
        self.lists.read().active.len()
    }

    /// Whether `scene` is active
    pub fn is_active(&self, scene: &Scene) -> bool {
        self.lists
            .read()
            .active
            .iter()
            .any(|active| std::ptr::eq(Arc::as_ptr(active), scene))
    }

    /// Snapshot of the fallback loading scenes
    pub fn loading_scenes(&self) -> Vec<Arc<Scene>> {
        self.lists.read().loading.clone()
    }

    /// Registered scene named `name`
    pub fn scene_by_name(&self, name: &str) -> Result<(usize, Arc<Scene>), SceneError> {
        let index = self
            .registry
            .get_index(name)
            .ok_or_else(|| SceneError::NotFound(name.to_string()))?;
        Ok((index, self.registry.get_item(index)?))
    }

    /// Registered scene at registry `index`
    pub fn scene_by_index(&self, index: usize) -> Result<Arc<Scene>, SceneError> {
        self.registry
            .get_item(index)
            .map_err(|_| SceneError::NotFound(format!("index {index}")))
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Create and register a scene. The first scene registered while nothing
    /// is active becomes active immediately.
    pub fn register_scene(
        &self,
        name: &str,
        width: u32,
        height: u32,
        plan: Option<ScenePlan>,
    ) -> Result<Arc<Scene>, SceneError> {
        let mut lists = self.lists.write();
        let index = self.registry.register(name, Scene::new(name, width, height, plan))?;
        let scene = self.registry.get_item(index)?;

        if lists.active.is_empty() {
            let tick = self.clock.current();
            scene.stamp_activated(tick);
            scene.stamp_selected(tick);
            lists.active.push(Arc::clone(&scene));
            log::info!("Registered scene '{name}' (slot {index}) and activated it");
        } else {
            log::info!("Registered scene '{name}' (slot {index})");
        }
        Ok(scene)
    }

    /// Create and register a scene shown while active scenes are not ready
    pub fn register_loading_scene(
        &self,
        name: &str,
        width: u32,
        height: u32,
        plan: Option<ScenePlan>,
    ) -> Result<Arc<Scene>, SceneError> {
        let index = self.registry.register(name, Scene::new(name, width, height, plan))?;
        let scene = self.registry.get_item(index)?;
        self.add_loading_scene(Arc::clone(&scene));
        Ok(scene)
    }

    /// Append an unregistered fallback scene
    pub fn add_loading_scene(&self, scene: Arc<Scene>) {
        log::info!("Added loading scene '{}'", scene.name());
        self.lists.write().loading.push(scene);
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Move `entities` into `target` and make it active.
    ///
    /// Each entity leaves whichever registered scene currently owns it. If
    /// `target` is already active only its selection tick is refreshed.
    pub fn activate_scene(&self, target: &Arc<Scene>, entities: &[Entity]) -> Result<(), SceneError> {
        self.transfer_into(target, entities)?;

        let tick = self.clock.current();
        let mut lists = self.lists.write();
        if lists.active.iter().any(|scene| Arc::ptr_eq(scene, target)) {
            target.stamp_selected(tick);
            log::debug!("Scene '{}' already active, reselected", target.name());
            return Ok(());
        }

        target.stamp_activated(tick);
        target.stamp_selected(tick);
        lists.active.push(Arc::clone(target));
        log::info!(
            "Activated scene '{}' ({} active)",
            target.name(),
            lists.active.len()
        );
        Ok(())
    }

    /// Replace the single active scene with `target`, moving `entities`
    /// from the replaced scene.
    ///
    /// Fails with [`SceneError::InvalidTransition`] unless exactly one scene
    /// is active. Does not stamp an activation tick.
    pub fn change_scene(&self, target: &Arc<Scene>, entities: &[Entity]) -> Result<(), SceneError> {
        let mut lists = self.lists.write();
        if lists.active.len() != 1 {
            return Err(SceneError::InvalidTransition {
                active: lists.active.len(),
            });
        }

        let origin = Arc::clone(&lists.active[0]);
        origin.storage().transfer_entities(target.storage(), entities)?;

        target.stamp_selected(self.clock.current());
        if !Arc::ptr_eq(&origin, target) {
            lists.active[0] = Arc::clone(target);
            drop(lists);
            origin.reset_asset_locations();
            log::info!("Changed scene '{}' -> '{}'", origin.name(), target.name());
        }
        Ok(())
    }

    /// Remove `target` from the active list and reset its asset references.
    ///
    /// Order among the remaining scenes is not preserved. Returns whether
    /// the scene was active.
    pub fn deactivate_scene(&self, target: &Arc<Scene>) -> bool {
        let mut lists = self.lists.write();
        let Some(position) = lists.active.iter().position(|scene| Arc::ptr_eq(scene, target)) else {
            return false;
        };
        lists.active.swap_remove(position);
        drop(lists);

        target.reset_asset_locations();
        log::info!("Deactivated scene '{}'", target.name());
        true
    }

    /// Activate the registered scene named `name`; returns its registry index
    pub fn activate_scene_by_name(&self, name: &str, entities: &[Entity]) -> Result<usize, SceneError> {
        let (index, scene) = self.scene_by_name(name)?;
        self.activate_scene(&scene, entities)?;
        Ok(index)
    }

    /// Change to the registered scene named `name`; returns its registry index
    pub fn change_scene_by_name(&self, name: &str, entities: &[Entity]) -> Result<usize, SceneError> {
        let (index, scene) = self.scene_by_name(name)?;
        self.change_scene(&scene, entities)?;
        Ok(index)
    }

    /// Activate the scene at registry `index`
    pub fn activate_scene_by_index(&self, index: usize, entities: &[Entity]) -> Result<(), SceneError> {
        let scene = self.scene_by_index(index)?;
        self.activate_scene(&scene, entities)
    }

    /// Change to the scene at registry `index`
    pub fn change_scene_by_index(&self, index: usize, entities: &[Entity]) -> Result<(), SceneError> {
        let scene = self.scene_by_index(index)?;
        self.change_scene(&scene, entities)
    }

    /// Move every entity into `target` from the registered scene that owns it
    fn transfer_into(&self, target: &Scene, entities: &[Entity]) -> Result<(), SceneError> {
        if entities.is_empty() {
            return Ok(());
        }

        let scenes = self.registry.items();
        let mut moves: Vec<(&Storage, Entity)> = Vec::with_capacity(entities.len());
        for &entity in entities {
            let origin = scenes
                .iter()
                .map(|scene| scene.storage())
                .chain(std::iter::once(target.storage()))
                .find(|storage| storage.contains(entity))
                .ok_or(TransferError::Unowned(entity))?;
            moves.push((origin, entity));
        }

        Storage::transfer_batch(target.storage(), &moves)?;
        Ok(())
    }
}

impl std::fmt::Debug for SceneManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lists = self.lists.read();
        f.debug_struct("SceneManager")
            .field("active", &lists.active.iter().map(|s| s.name()).collect::<Vec<_>>())
            .field("loading", &lists.loading.iter().map(|s| s.name()).collect::<Vec<_>>())
            .field("registered", &self.registry.len())
            .finish()
    }
}
