//! Turn bundles back into decoded assets

use std::sync::Arc;

use super::{AssetError, Sound, SoundBundle, Sprite, SpriteBundle};
use crate::foundation::collections::BoundedCache;

/// Sprites referenced by `bundle`, in slot order, unused slots skipped
pub fn materialize_sprites(
    bundle: &SpriteBundle,
    cache: &BoundedCache<Sprite>,
) -> Result<Vec<Arc<Sprite>>, AssetError> {
    bundle
        .blueprints()
        .iter()
        .filter(|blueprint| !blueprint.location.is_empty())
        .map(|blueprint| cache.get_item32(&blueprint.location).map_err(AssetError::from))
        .collect()
}

/// Sounds referenced by `bundle`, in slot order, unused slots skipped
pub fn materialize_sounds(
    bundle: &SoundBundle,
    cache: &BoundedCache<Sound>,
) -> Result<Vec<Arc<Sound>>, AssetError> {
    bundle
        .blueprints()
        .iter()
        .filter(|blueprint| !blueprint.location.is_empty())
        .map(|blueprint| cache.get_item32(&blueprint.location).map_err(AssetError::from))
        .collect()
}

/// The sound of `bundle` registered under `path`
pub fn materialize_sound(
    bundle: &SoundBundle,
    path: &str,
    cache: &BoundedCache<Sound>,
) -> Result<Arc<Sound>, AssetError> {
    let blueprint = bundle
        .find(path)
        .ok_or_else(|| AssetError::NotFound(format!("sound '{path}' not in bundle")))?;
    Ok(cache.get_item32(&blueprint.location)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::SpriteBlueprint;

    fn sprite(key: &str) -> Sprite {
        Sprite::from_rgba(key, 1, 1, vec![0; 4])
    }

    #[test]
    fn test_materialize_sprites_in_order() {
        let cache = BoundedCache::new(4);
        cache.register("b.png", sprite("b.png")).unwrap();
        cache.register("a.png", sprite("a.png")).unwrap();

        let bundle = SpriteBundle::new([
            SpriteBlueprint::new("a.png"),
            SpriteBlueprint::default(),
            SpriteBlueprint::new("b.png"),
        ])
        .unwrap();

        let sprites = materialize_sprites(&bundle, &cache).unwrap();
        let keys: Vec<_> = sprites.iter().map(|s| s.key().to_string()).collect();
        assert_eq!(keys, vec!["a.png", "b.png"]);
        assert!(bundle.is_resolved_in(cache.generation()));
    }

    #[test]
    fn test_materialize_missing_sprite_fails() {
        let cache = BoundedCache::new(1);
        let bundle = SpriteBundle::from_paths(["gone.png"]).unwrap();
        assert!(matches!(
            materialize_sprites(&bundle, &cache),
            Err(AssetError::Cache(_))
        ));
    }

    #[test]
    fn test_materialize_sound_by_path() {
        let cache: BoundedCache<Sound> = BoundedCache::new(1);
        let bundle = SoundBundle::from_paths(["hit.wav"]).unwrap();

        let err = materialize_sound(&bundle, "miss.wav", &cache).unwrap_err();
        assert!(matches!(err, AssetError::NotFound(_)));
        assert!(materialize_sounds(&bundle, &cache).is_err());
    }
}
