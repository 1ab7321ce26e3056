//! Minimum-display-time readiness policy

use super::{Camera, CameraSceneTracker};
use crate::core::config::LoadingSettings;
use crate::foundation::time::TickClock;

/// Decides whether a camera may show its bound scene
#[derive(Debug, Clone)]
pub struct ReadinessGate {
    minimum_load_ticks: u64,
    enforce_min_on_active: bool,
    clock: TickClock,
}

impl ReadinessGate {
    /// Gate applying `settings`, reading time from `clock`
    pub fn new(settings: &LoadingSettings, clock: TickClock) -> Self {
        Self {
            minimum_load_ticks: settings.minimum_load_ticks,
            enforce_min_on_active: settings.enforce_min_on_active,
            clock,
        }
    }

    /// Minimum loading-screen time in ticks
    pub const fn minimum_load_ticks(&self) -> u64 {
        self.minimum_load_ticks
    }

    /// Whether `camera` is past its minimum loading window and active.
    ///
    /// With `enforce_min_on_active` the window restarts whenever the camera
    /// is rebound; otherwise it is measured from the scene's own last
    /// activation, so a scene already past its window is immediately ready
    /// for newly bound cameras. Scene asset readiness is checked by callers.
    pub fn ready(&self, camera: &Camera, tracker: &CameraSceneTracker) -> bool {
        let Some(record) = tracker.get(camera.index()) else {
            return false;
        };
        let cutoff = if self.enforce_min_on_active {
            record.tick
        } else {
            match record.scene() {
                Some(scene) => scene.last_activated_tick(),
                None => return false,
            }
        };
        self.clock.elapsed_since(cutoff) >= self.minimum_load_ticks && camera.is_active()
    }

    /// Whether a binding stamped at `tick` is still inside the minimum window
    pub fn within_minimum(&self, tick: u64) -> bool {
        self.clock.elapsed_since(tick) < self.minimum_load_ticks
    }
}
