//! Camera to scene bindings

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use crate::scene::Scene;

/// Scene a camera is bound to and the tick the binding last changed.
///
/// Holds a weak reference: the tracker never keeps a scene alive.
#[derive(Debug, Clone)]
pub struct CameraSceneRecord {
    /// Bound scene
    pub scene: Weak<Scene>,
    /// Tick of the most recent binding change
    pub tick: u64,
}

impl CameraSceneRecord {
    /// The bound scene, if it still exists
    pub fn scene(&self) -> Option<Arc<Scene>> {
        self.scene.upgrade()
    }

    /// Whether the record points at `scene`
    pub fn is_bound_to(&self, scene: &Arc<Scene>) -> bool {
        std::ptr::eq(self.scene.as_ptr(), Arc::as_ptr(scene))
    }
}

/// Bindings keyed by camera index
#[derive(Debug, Clone, Default)]
pub struct CameraSceneTracker {
    records: HashMap<usize, CameraSceneRecord>,
}

impl CameraSceneTracker {
    /// Empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Binding of camera `index`
    pub fn get(&self, index: usize) -> Option<&CameraSceneRecord> {
        self.records.get(&index)
    }

    /// Whether camera `index` is bound
    pub fn is_bound(&self, index: usize) -> bool {
        self.records.contains_key(&index)
    }

    /// Bind camera `index` to `scene`. The tick is only stamped when the
    /// bound scene actually changes. Returns whether it changed.
    pub fn bind(&mut self, index: usize, scene: &Arc<Scene>, tick: u64) -> bool {
        match self.records.get(&index) {
            Some(record) if record.is_bound_to(scene) => false,
            _ => {
                self.records.insert(
                    index,
                    CameraSceneRecord {
                        scene: Arc::downgrade(scene),
                        tick,
                    },
                );
                true
            }
        }
    }

    /// Remove the binding of camera `index`
    pub fn unbind(&mut self, index: usize) -> Option<CameraSceneRecord> {
        self.records.remove(&index)
    }

    /// Drop bindings whose scene fails `keep`
    pub fn retain(&mut self, mut keep: impl FnMut(&CameraSceneRecord) -> bool) {
        self.records.retain(|_, record| keep(record));
    }

    /// Camera indices bound to `scene`, ascending
    pub fn cameras_for(&self, scene: &Arc<Scene>) -> Vec<usize> {
        let mut indices: Vec<usize> = self
            .records
            .iter()
            .filter(|(_, record)| record.is_bound_to(scene))
            .map(|(index, _)| *index)
            .collect();
        indices.sort_unstable();
        indices
    }
}
