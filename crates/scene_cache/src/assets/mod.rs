//! Asset references, decoding and cache population
//!
//! Entities reference assets symbolically through bundles of blueprints.
//! Loaders turn those references into decoded [`Sprite`]s and [`Sound`]s
//! registered in a caller-supplied cache, and materialization reads them
//! back out of whichever cache generation is current.

pub mod blueprint;
pub mod loader;
pub mod materialize;
pub mod sound;
pub mod source;
pub mod sprite;

pub use blueprint::{
    SoundBlueprint, SoundBundle, SpriteBlueprint, SpriteBundle, MAX_SOUNDS_PER_BUNDLE,
    MAX_SPRITES_PER_BUNDLE,
};
pub use loader::{SoundLoader, SpriteLoader};
pub use materialize::{materialize_sound, materialize_sounds, materialize_sprites};
pub use sound::{AudioFormat, Sound};
pub use source::{source_for, AssetSource, EmbeddedAssetSource, FileAssetSource};
pub use sprite::{FrameRect, Sprite};

use crate::foundation::collections::CacheError;

/// Kind of asset, used by backends to pick a storage location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    /// Images decoded into [`Sprite`]s
    Image,
    /// Audio decoded into [`Sound`]s
    Sound,
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Image => f.write_str("image"),
            Self::Sound => f.write_str("sound"),
        }
    }
}

/// Asset loading errors
#[derive(thiserror::Error, Debug)]
pub enum AssetError {
    /// The target cache has no free slot left; triggers a cache rebuild
    #[error("cache full: cannot register '{key}' (capacity {capacity})")]
    CapacityExceeded {
        /// Key that did not fit
        key: String,
        /// Capacity of the target cache
        capacity: usize,
    },

    /// Asset key not present in the backend or the bundle
    #[error("asset not found: {0}")]
    NotFound(String),

    /// Backend failed while reading bytes
    #[error("failed to read '{key}': {source}")]
    Io {
        /// Key being read
        key: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Bytes were read but could not be decoded
    #[error("failed to decode '{key}': {reason}")]
    Decode {
        /// Key being decoded
        key: String,
        /// Decoder message
        reason: String,
    },

    /// Recognised container that this client does not decode
    #[error("unsupported format for '{key}': {format}")]
    UnsupportedFormat {
        /// Key being decoded
        key: String,
        /// Detected format name
        format: String,
    },

    /// More blueprints than a bundle can hold
    #[error("bundle holds at most {capacity} entries")]
    BundleFull {
        /// Maximum entries per bundle
        capacity: usize,
    },

    /// Any other cache failure
    #[error("cache error: {0}")]
    Cache(CacheError),
}

impl AssetError {
    /// Whether this error signals cache exhaustion
    pub const fn is_capacity_exceeded(&self) -> bool {
        matches!(self, Self::CapacityExceeded { .. })
    }
}

impl From<CacheError> for AssetError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::CapacityExceeded { key, capacity } => {
                Self::CapacityExceeded { key, capacity }
            }
            other => Self::Cache(other),
        }
    }
}
