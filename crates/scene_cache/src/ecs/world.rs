//! Entity table of one storage

use std::collections::BTreeMap;

use super::{Components, Entity, Query};

/// Entities and their components, iterated in creation order
#[derive(Debug, Default)]
pub struct World {
    entities: BTreeMap<Entity, Components>,
}

impl World {
    /// Create a new world
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new entity
    pub fn spawn(&mut self, components: Components) -> Entity {
        let entity = Entity::allocate();
        self.entities.insert(entity, components);
        entity
    }

    /// Insert an entity that already has an id (used by transfers)
    pub(super) fn adopt(&mut self, entity: Entity, components: Components) {
        self.entities.insert(entity, components);
    }

    /// Remove an entity and return its components
    pub fn remove(&mut self, entity: Entity) -> Option<Components> {
        self.entities.remove(&entity)
    }

    /// Components of `entity`
    pub fn get(&self, entity: Entity) -> Option<&Components> {
        self.entities.get(&entity)
    }

    /// Mutable components of `entity`
    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut Components> {
        self.entities.get_mut(&entity)
    }

    /// Whether `entity` lives here
    pub fn contains(&self, entity: Entity) -> bool {
        self.entities.contains_key(&entity)
    }

    /// Number of entities
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the world has no entities
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entities matching `query`
    pub fn query(&self, query: Query) -> impl Iterator<Item = (Entity, &Components)> + '_ {
        self.entities
            .iter()
            .filter(move |(_, components)| query.matches(components))
            .map(|(entity, components)| (*entity, components))
    }
}
