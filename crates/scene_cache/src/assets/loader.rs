//! Asset loaders
//!
//! A loader resolves every blueprint of a bundle against the cache it is
//! handed. It keeps no cache of its own, so the same loader populates the
//! live generation during normal frames and a fresh swap generation during
//! a rebuild.

use std::sync::Arc;

use super::{AssetError, AssetKind, AssetSource, Sound, SoundBundle, Sprite, SpriteBundle};
use crate::foundation::collections::{BoundedCache, CacheLocation};

/// Resolve one location against `cache`, decoding through `decode` only
/// when neither the location nor the cache already knows the key.
fn resolve_location<T>(
    location: &CacheLocation,
    cache: &BoundedCache<T>,
    decode: impl FnOnce(&str) -> Result<T, AssetError>,
) -> Result<(), AssetError> {
    if location.is_empty() {
        return Ok(());
    }

    let generation = cache.generation();
    if location.index_in(generation).is_some() {
        return Ok(());
    }

    let key = location.key();
    if let Some(index) = cache.get_index(key) {
        location.resolve(generation, index);
        return Ok(());
    }

    // Fail before paying for the decode.
    if cache.len() >= cache.capacity() {
        return Err(AssetError::CapacityExceeded {
            key: key.to_string(),
            capacity: cache.capacity(),
        });
    }

    let value = decode(key)?;
    let index = cache.register_unique(key, value)?;
    location.resolve(generation, index);
    Ok(())
}

/// Loads image blueprints into a sprite cache
#[derive(Clone)]
pub struct SpriteLoader {
    source: Arc<dyn AssetSource>,
}

impl SpriteLoader {
    /// Loader reading image bytes from `source`
    pub fn new(source: Arc<dyn AssetSource>) -> Self {
        Self { source }
    }

    /// Resolve every sprite of `bundle` in `cache`
    pub fn load(&self, bundle: &SpriteBundle, cache: &BoundedCache<Sprite>) -> Result<(), AssetError> {
        for blueprint in bundle.blueprints() {
            resolve_location(&blueprint.location, cache, |key| {
                let bytes = self.source.read_bytes(AssetKind::Image, key)?;
                Sprite::decode(key, &bytes)
            })?;
        }
        Ok(())
    }
}

/// Loads sound blueprints into a sound cache
#[derive(Clone)]
pub struct SoundLoader {
    source: Arc<dyn AssetSource>,
}

impl SoundLoader {
    /// Loader reading sound bytes from `source`
    pub fn new(source: Arc<dyn AssetSource>) -> Self {
        Self { source }
    }

    /// Resolve every sound of `bundle` in `cache`
    pub fn load(&self, bundle: &SoundBundle, cache: &BoundedCache<Sound>) -> Result<(), AssetError> {
        for blueprint in bundle.blueprints() {
            resolve_location(&blueprint.location, cache, |key| {
                let bytes = self.source.read_bytes(AssetKind::Sound, key)?;
                Sound::decode(key, &bytes, blueprint.player_count)
            })?;
        }
        Ok(())
    }
}
