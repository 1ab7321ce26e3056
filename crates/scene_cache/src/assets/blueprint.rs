//! Symbolic asset references attached to entities

use std::sync::Arc;

use super::AssetError;
use crate::foundation::collections::CacheLocation;

/// Maximum sprite references per [`SpriteBundle`]
pub const MAX_SPRITES_PER_BUNDLE: usize = 10;

/// Maximum sound references per [`SoundBundle`]
pub const MAX_SOUNDS_PER_BUNDLE: usize = 10;

/// Reference to an image by path
#[derive(Debug, Clone, Default)]
pub struct SpriteBlueprint {
    /// Path key and resolved slot
    pub location: CacheLocation,
}

impl SpriteBlueprint {
    /// Blueprint for the image at `path`
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            location: CacheLocation::new(path),
        }
    }

    /// Image path
    pub fn path(&self) -> &str {
        self.location.key()
    }
}

/// Reference to a sound by path
#[derive(Debug, Clone)]
pub struct SoundBlueprint {
    /// Path key and resolved slot
    pub location: CacheLocation,
    /// Number of voices the decoded sound can play at once
    pub player_count: usize,
}

impl SoundBlueprint {
    /// Blueprint for the sound at `path` with `player_count` voices
    pub fn new(path: impl Into<String>, player_count: usize) -> Self {
        Self {
            location: CacheLocation::new(path),
            player_count: player_count.max(1),
        }
    }

    /// Sound path
    pub fn path(&self) -> &str {
        self.location.key()
    }
}

impl Default for SoundBlueprint {
    fn default() -> Self {
        Self {
            location: CacheLocation::empty(),
            player_count: 1,
        }
    }
}

macro_rules! bundle {
    ($(#[$meta:meta])* $name:ident, $blueprint:ty, $max:expr) => {
        $(#[$meta])*
        ///
        /// Cloning a bundle shares its blueprints, so a clone observes (and
        /// publishes) the same resolved slots.
        #[derive(Debug, Clone)]
        pub struct $name {
            blueprints: Arc<[$blueprint]>,
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    blueprints: Arc::from(Vec::new()),
                }
            }
        }

        impl $name {
            /// Bundle of the given blueprints
            pub fn new(blueprints: impl IntoIterator<Item = $blueprint>) -> Result<Self, AssetError> {
                let blueprints: Vec<$blueprint> = blueprints.into_iter().collect();
                if blueprints.len() > $max {
                    return Err(AssetError::BundleFull { capacity: $max });
                }
                Ok(Self {
                    blueprints: blueprints.into(),
                })
            }

            /// Blueprints in slot order, unused slots included
            pub fn blueprints(&self) -> &[$blueprint] {
                &self.blueprints
            }

            /// Blueprint in slot `index`
            pub fn get(&self, index: usize) -> Option<&$blueprint> {
                self.blueprints.get(index)
            }

            /// Blueprint referencing `path`
            pub fn find(&self, path: &str) -> Option<&$blueprint> {
                self.blueprints
                    .iter()
                    .find(|blueprint| !path.is_empty() && blueprint.location.key() == path)
            }

            /// Non-empty keys referenced by this bundle
            pub fn keys(&self) -> impl Iterator<Item = &str> {
                self.blueprints
                    .iter()
                    .map(|blueprint| blueprint.location.key())
                    .filter(|key| !key.is_empty())
            }

            /// Mark every slot unresolved
            pub fn reset_locations(&self) {
                for blueprint in self.blueprints.iter() {
                    blueprint.location.reset();
                }
            }

            /// Whether every used slot holds an index for `generation`
            pub fn is_resolved_in(&self, generation: u32) -> bool {
                self.blueprints.iter().all(|blueprint| {
                    blueprint.location.is_empty()
                        || blueprint.location.index_in(generation).is_some()
                })
            }
        }
    };
}

bundle!(
    /// Fixed-size set of sprite references carried by one entity
    SpriteBundle,
    SpriteBlueprint,
    MAX_SPRITES_PER_BUNDLE
);

bundle!(
    /// Fixed-size set of sound references carried by one entity
    SoundBundle,
    SoundBlueprint,
    MAX_SOUNDS_PER_BUNDLE
);

impl SpriteBundle {
    /// Bundle referencing `paths` in order
    pub fn from_paths<S: Into<String>>(paths: impl IntoIterator<Item = S>) -> Result<Self, AssetError> {
        Self::new(paths.into_iter().map(SpriteBlueprint::new))
    }
}

impl SoundBundle {
    /// Bundle referencing `paths` in order, one voice each
    pub fn from_paths<S: Into<String>>(paths: impl IntoIterator<Item = S>) -> Result<Self, AssetError> {
        Self::new(paths.into_iter().map(|path| SoundBlueprint::new(path, 1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundle_limit() {
        let paths = (0..=MAX_SPRITES_PER_BUNDLE).map(|i| format!("{i}.png"));
        assert!(matches!(
            SpriteBundle::from_paths(paths),
            Err(AssetError::BundleFull { .. })
        ));
    }

    #[test]
    fn test_keys_skip_unused_slots() {
        let bundle = SpriteBundle::new([
            SpriteBlueprint::new("a.png"),
            SpriteBlueprint::default(),
            SpriteBlueprint::new("b.png"),
        ])
        .unwrap();
        assert_eq!(bundle.keys().collect::<Vec<_>>(), vec!["a.png", "b.png"]);
        assert!(bundle.find("").is_none());
        assert_eq!(bundle.find("b.png").map(SpriteBlueprint::path), Some("b.png"));
    }

    #[test]
    fn test_clones_share_locations() {
        let bundle = SoundBundle::from_paths(["hit.wav"]).unwrap();
        let clone = bundle.clone();

        bundle.blueprints()[0].location.resolve(5, 0);
        assert!(clone.is_resolved_in(5));

        clone.reset_locations();
        assert!(!bundle.blueprints()[0].location.is_resolved());
    }

    #[test]
    fn test_player_count_is_at_least_one() {
        assert_eq!(SoundBlueprint::new("x.wav", 0).player_count, 1);
    }
}
