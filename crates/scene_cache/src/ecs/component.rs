//! Components understood by the client

use crate::assets::{SoundBundle, SpriteBundle};

/// Binds an entity to one of the split-screen cameras
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CameraIndex(pub usize);

/// Component set of one entity
#[derive(Debug, Clone, Default)]
pub struct Components {
    /// Sprite references
    pub sprites: Option<SpriteBundle>,
    /// Sound references
    pub sounds: Option<SoundBundle>,
    /// Camera the entity is viewed through
    pub camera: Option<CameraIndex>,
}

impl Components {
    /// Empty component set
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach sprite references
    #[must_use]
    pub fn with_sprites(mut self, bundle: SpriteBundle) -> Self {
        self.sprites = Some(bundle);
        self
    }

    /// Attach sound references
    #[must_use]
    pub fn with_sounds(mut self, bundle: SoundBundle) -> Self {
        self.sounds = Some(bundle);
        self
    }

    /// Attach a camera binding
    #[must_use]
    pub const fn with_camera(mut self, camera: CameraIndex) -> Self {
        self.camera = Some(camera);
        self
    }
}
