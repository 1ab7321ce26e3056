//! Swappable pair of live caches

use parking_lot::RwLock;
use std::sync::Arc;

use crate::assets::{self, AssetError, Sound, SoundBundle, Sprite, SpriteBundle};
use crate::foundation::collections::BoundedCache;

/// One internally consistent pair of sprite and sound caches
#[derive(Debug, Clone)]
pub struct CacheGeneration {
    /// Decoded sprites
    pub sprites: Arc<BoundedCache<Sprite>>,
    /// Decoded sounds
    pub sounds: Arc<BoundedCache<Sound>>,
}

impl CacheGeneration {
    /// Fresh, empty generation
    pub fn new(max_sprites: usize, max_sounds: usize) -> Self {
        Self {
            sprites: Arc::new(BoundedCache::new(max_sprites)),
            sounds: Arc::new(BoundedCache::new(max_sounds)),
        }
    }

    /// Generation tags of both caches
    pub fn tags(&self) -> (u32, u32) {
        (self.sprites.generation(), self.sounds.generation())
    }
}

/// Holder of the live [`CacheGeneration`].
///
/// Readers take the read lock; publishing a rebuilt generation takes the
/// write lock only for the swap itself.
#[derive(Debug)]
pub struct GlobalCaches {
    current: RwLock<CacheGeneration>,
}

impl GlobalCaches {
    /// Start with an empty generation
    pub fn new(max_sprites: usize, max_sounds: usize) -> Self {
        Self {
            current: RwLock::new(CacheGeneration::new(max_sprites, max_sounds)),
        }
    }

    /// Handles to the live caches
    pub fn snapshot(&self) -> CacheGeneration {
        self.current.read().clone()
    }

    /// Generation tags of the live caches
    pub fn tags(&self) -> (u32, u32) {
        self.current.read().tags()
    }

    /// Replace both live caches at once, returning the retired generation
    pub fn publish(&self, generation: CacheGeneration) -> CacheGeneration {
        let mut current = self.current.write();
        log::debug!(
            "Publishing cache generation {:?} (replacing {:?})",
            generation.tags(),
            current.tags()
        );
        std::mem::replace(&mut *current, generation)
    }

    /// Sprites of `bundle` from the live generation
    pub fn materialize_sprites(&self, bundle: &SpriteBundle) -> Result<Vec<Arc<Sprite>>, AssetError> {
        let current = self.current.read();
        assets::materialize_sprites(bundle, &current.sprites)
    }

    /// Sounds of `bundle` from the live generation
    pub fn materialize_sounds(&self, bundle: &SoundBundle) -> Result<Vec<Arc<Sound>>, AssetError> {
        let current = self.current.read();
        assets::materialize_sounds(bundle, &current.sounds)
    }

    /// Sound `path` of `bundle` from the live generation
    pub fn materialize_sound(&self, bundle: &SoundBundle, path: &str) -> Result<Arc<Sound>, AssetError> {
        let current = self.current.read();
        assets::materialize_sound(bundle, path, &current.sounds)
    }
}
