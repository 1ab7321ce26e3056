//! Query system for component access

use super::{Components, Entity};

/// Component filter; an entity matches when it carries every requested component
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Query {
    sprites: bool,
    sounds: bool,
    camera: bool,
}

impl Query {
    /// Query matching every entity
    pub const fn all() -> Self {
        Self {
            sprites: false,
            sounds: false,
            camera: false,
        }
    }

    /// Require a sprite bundle
    #[must_use]
    pub const fn with_sprites(mut self) -> Self {
        self.sprites = true;
        self
    }

    /// Require a sound bundle
    #[must_use]
    pub const fn with_sounds(mut self) -> Self {
        self.sounds = true;
        self
    }

    /// Require a camera binding
    #[must_use]
    pub const fn with_camera(mut self) -> Self {
        self.camera = true;
        self
    }

    /// Whether `components` satisfies the query
    pub const fn matches(&self, components: &Components) -> bool {
        (!self.sprites || components.sprites.is_some())
            && (!self.sounds || components.sounds.is_some())
            && (!self.camera || components.camera.is_some())
    }
}

/// Iterator over a snapshot of matching entities.
///
/// The snapshot is taken when the cursor is created, so no storage lock is
/// held while iterating.
#[derive(Debug)]
pub struct Cursor {
    rows: std::vec::IntoIter<(Entity, Components)>,
}

impl Cursor {
    pub(super) fn new(rows: Vec<(Entity, Components)>) -> Self {
        Self {
            rows: rows.into_iter(),
        }
    }
}

impl Iterator for Cursor {
    type Item = (Entity, Components);

    fn next(&mut self) -> Option<Self::Item> {
        self.rows.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

impl ExactSizeIterator for Cursor {}
