//! Camera Scene Assignment System
//!
//! Runs once per frame. Cameras follow the `CameraIndex` components of
//! ready scenes; cameras no scene claims are switched off. When nothing is
//! ready, or every active camera is still inside its minimum loading
//! window, the rig falls back to a single full-screen camera so the
//! loading scene has somewhere to draw.

use std::sync::Arc;

use super::{CameraRig, CameraSceneTracker};
use crate::ecs::Query;
use crate::scene::Scene;

/// Outcome of one assignment pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssignmentReport {
    /// Active scenes that were ready this frame
    pub ready_scenes: usize,
    /// Cameras active after unclaimed ones were switched off
    pub active_cameras: usize,
    /// Every active camera is inside its minimum loading window
    pub in_transition: bool,
    /// The rig was reset to camera 0 only
    pub default_state: bool,
}

/// Binds cameras to ready scenes each frame
#[derive(Debug, Clone)]
pub struct CameraSceneAssigner {
    minimum_load_ticks: u64,
}

impl CameraSceneAssigner {
    /// Assigner using the given minimum loading window
    pub const fn new(minimum_load_ticks: u64) -> Self {
        Self { minimum_load_ticks }
    }

    /// Run one assignment pass over `scenes` at `tick`
    pub fn run(
        &self,
        scenes: &[Arc<Scene>],
        rig: &mut CameraRig,
        tracker: &mut CameraSceneTracker,
        tick: u64,
    ) -> AssignmentReport {
        tracker.retain(|record| {
            record
                .scene()
                .is_some_and(|bound| scenes.iter().any(|scene| Arc::ptr_eq(scene, &bound)))
        });

        let ready_scenes = Self::bind_ready_scenes(scenes, rig, tracker, tick);

        for camera in rig.cameras_mut().iter_mut() {
            if !tracker.is_bound(camera.index()) {
                camera.deactivate();
            }
        }

        let active_cameras = rig.active_count();
        let in_transition = self.all_in_transition(rig, tracker, tick, active_cameras);

        let default_state = (ready_scenes == 0 || in_transition) && active_cameras > 0;
        if default_state {
            for camera in rig.cameras_mut().iter_mut() {
                camera.deactivate();
            }
            rig.cameras_mut()[0].activate();
        }

        AssignmentReport {
            ready_scenes,
            active_cameras,
            in_transition,
            default_state,
        }
    }

    fn bind_ready_scenes(
        scenes: &[Arc<Scene>],
        rig: &mut CameraRig,
        tracker: &mut CameraSceneTracker,
        tick: u64,
    ) -> usize {
        let mut ready = 0;
        for scene in scenes.iter().filter(|scene| scene.is_ready()) {
            ready += 1;
            for (entity, components) in scene.storage().cursor(Query::all().with_camera()) {
                let Some(index) = components.camera else {
                    continue;
                };
                match rig.camera_mut(index.0) {
                    Ok(camera) => {
                        if tracker.bind(index.0, scene, tick) {
                            log::debug!("Camera {} bound to scene '{}'", index.0, scene.name());
                        }
                        camera.activate();
                    }
                    Err(err) => log::warn!("{entity} in scene '{}': {err}", scene.name()),
                }
            }
        }
        ready
    }

    fn all_in_transition(
        &self,
        rig: &CameraRig,
        tracker: &CameraSceneTracker,
        tick: u64,
        active_cameras: usize,
    ) -> bool {
        // Bindings stamped on tick 0 never count as transitions
        let transitioning = rig
            .cameras()
            .iter()
            .filter(|camera| camera.is_active())
            .filter_map(|camera| tracker.get(camera.index()))
            .filter(|record| record.tick != 0 && tick.saturating_sub(record.tick) < self.minimum_load_ticks)
            .count();
        active_cameras > 0 && transitioning == active_cameras
    }
}
