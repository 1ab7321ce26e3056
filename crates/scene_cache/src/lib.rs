//! # Scene Cache
//!
//! Resource-cache coherency and scene-activation lifecycle for a real-time
//! client with several simultaneously active scenes.
//!
//! ## Features
//!
//! - **Bounded Caches**: Fixed-capacity sprite and sound caches with generation-tagged slots
//! - **Background Population**: Scenes resolve their assets off the frame loop
//! - **Cache Rebuilds**: Exhausted caches are rebuilt with only active demand and swapped atomically
//! - **Scene Transitions**: Transactional entity transfer between scene storages
//! - **Readiness Gate**: Minimum loading-screen time per camera
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scene_cache::prelude::*;
//! use std::sync::Arc;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     scene_cache::foundation::logging::init();
//!
//!     let config = ClientConfig::load_or_default("client.toml")?;
//!     let mut client = Client::from_config(config, None)?;
//!
//!     client.register_scene(
//!         "level one",
//!         640,
//!         480,
//!         Some(Box::new(|_, _, storage: &Storage| {
//!             storage.spawn(
//!                 Components::new()
//!                     .with_sprites(SpriteBundle::from_paths(["hero.png"])?)
//!                     .with_camera(CameraIndex(0)),
//!             );
//!             Ok(())
//!         })),
//!     )?;
//!
//!     loop {
//!         client.update()?;
//!         for presentation in client.presentations() {
//!             // draw presentation.shown
//!         }
//!         std::thread::sleep(client.config().tick_duration());
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod assets;
pub mod cache;
pub mod config;
pub mod core;
pub mod ecs;
pub mod foundation;
pub mod readiness;
pub mod scene;

mod client;

pub use client::{Client, ClientError, Presentation};

/// Common imports for client users
pub mod prelude {
    pub use crate::{
        assets::{AssetError, AssetSource, EmbeddedAssetSource, FileAssetSource, SoundBundle, SpriteBundle},
        cache::{CacheState, ResolutionError, ResolutionErrorHandler},
        config::Config,
        core::config::{AssetMode, ClientConfig},
        ecs::{CameraIndex, Components, Entity, Storage},
        foundation::time::Stopwatch,
        readiness::{AssignmentReport, MAX_SPLIT},
        scene::{Scene, SceneError, ScenePlan},
        Client, ClientError, Presentation,
    };
}
