//! Scenes and their activation lifecycle
//!
//! A [`Scene`] is an isolated world of entities plus the flags that track
//! whether its assets are resolved. The [`SceneManager`] owns the registry
//! of scenes and the ordered list of active ones.

pub mod lifecycle;
pub mod scene_manager;

pub use lifecycle::{PlanError, Scene, ScenePlan};
pub use scene_manager::SceneManager;

use crate::assets::AssetError;
use crate::ecs::TransferError;
use crate::foundation::collections::CacheError;

/// Name of the fallback scene installed when no loading scene is registered
pub const DEFAULT_LOADING_SCENE: &str = "default loading scene";

/// Scene management errors
#[derive(thiserror::Error, Debug)]
pub enum SceneError {
    /// `change_scene` needs exactly one active scene
    #[error("change scene requires exactly one active scene, found {active}")]
    InvalidTransition {
        /// Number of active scenes at call time
        active: usize,
    },

    /// Entity storage rejected the transfer; nothing was moved
    #[error("entity transfer failed: {0}")]
    TransferFailure(#[from] TransferError),

    /// No registered scene carries this name or index
    #[error("scene not found: {0}")]
    NotFound(String),

    /// Scene registry is full
    #[error("scene registry error: {0}")]
    Registry(#[from] CacheError),

    /// A scene plan failed while populating the scene
    #[error("plan for scene '{scene}' failed: {source}")]
    Plan {
        /// Scene whose plan failed
        scene: String,
        /// Error returned by the plan
        #[source]
        source: PlanError,
    },

    /// Asset failure surfaced while driving a scene
    #[error("asset error: {0}")]
    Asset(#[from] AssetError),
}
