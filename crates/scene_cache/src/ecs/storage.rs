//! Thread-safe entity storage
//!
//! A [`Storage`] wraps a [`World`] behind a read-write lock. Transfers lock
//! every storage involved in ascending [`StorageId`] order, so two transfers
//! running in opposite directions cannot deadlock, and validate the whole
//! batch before moving anything.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use super::{Components, Cursor, Entity, Query, World};

static NEXT_STORAGE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique storage identifier; also the lock order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorageId(u64);

/// Errors raised while moving entities between storages
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    /// Entity is not in the storage it was expected to leave
    #[error("{entity} is not stored in storage {storage:?}")]
    MissingEntity {
        /// Entity that could not be found
        entity: Entity,
        /// Storage searched
        storage: StorageId,
    },

    /// Same entity listed more than once in a batch
    #[error("{0} appears more than once in the transfer batch")]
    DuplicateEntity(Entity),

    /// No known storage holds the entity
    #[error("{0} is not owned by any known storage")]
    Unowned(Entity),
}

/// Entity container owned by one scene
#[derive(Debug)]
pub struct Storage {
    id: StorageId,
    world: RwLock<World>,
}

impl Default for Storage {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage {
    /// Empty storage with a fresh id
    pub fn new() -> Self {
        Self {
            id: StorageId(NEXT_STORAGE_ID.fetch_add(1, Ordering::Relaxed)),
            world: RwLock::new(World::new()),
        }
    }

    /// Storage identifier
    pub const fn id(&self) -> StorageId {
        self.id
    }

    /// Create an entity with `components`
    pub fn spawn(&self, components: Components) -> Entity {
        self.world.write().spawn(components)
    }

    /// Remove an entity
    pub fn despawn(&self, entity: Entity) -> Option<Components> {
        self.world.write().remove(entity)
    }

    /// Whether `entity` lives here
    pub fn contains(&self, entity: Entity) -> bool {
        self.world.read().contains(entity)
    }

    /// Components of `entity`
    pub fn get(&self, entity: Entity) -> Option<Components> {
        self.world.read().get(entity).cloned()
    }

    /// Number of entities
    pub fn len(&self) -> usize {
        self.world.read().len()
    }

    /// Whether the storage is empty
    pub fn is_empty(&self) -> bool {
        self.world.read().is_empty()
    }

    /// Snapshot cursor over entities matching `query`
    pub fn cursor(&self, query: Query) -> Cursor {
        let world = self.world.read();
        Cursor::new(
            world
                .query(query)
                .map(|(entity, components)| (entity, components.clone()))
                .collect(),
        )
    }

    /// Shared access to the underlying world
    pub fn read(&self) -> RwLockReadGuard<'_, World> {
        self.world.read()
    }

    /// Exclusive access to the underlying world
    pub fn write(&self) -> RwLockWriteGuard<'_, World> {
        self.world.write()
    }

    /// Move `entities` from this storage into `target`
    pub fn transfer_entities(&self, target: &Self, entities: &[Entity]) -> Result<(), TransferError> {
        let moves: Vec<(&Self, Entity)> = entities.iter().map(|&entity| (self, entity)).collect();
        Self::transfer_batch(target, &moves)
    }

    /// Move every `(origin, entity)` pair into `target` as one transaction.
    ///
    /// Either every entity moves or none does. Pairs whose origin already is
    /// `target` are left in place.
    pub fn transfer_batch(target: &Self, moves: &[(&Self, Entity)]) -> Result<(), TransferError> {
        if moves.is_empty() {
            return Ok(());
        }

        let mut seen = HashSet::with_capacity(moves.len());
        for &(_, entity) in moves {
            if !seen.insert(entity) {
                return Err(TransferError::DuplicateEntity(entity));
            }
        }

        let mut involved: Vec<&Self> = moves.iter().map(|&(origin, _)| origin).collect();
        involved.push(target);
        involved.sort_by_key(|storage| storage.id);
        involved.dedup_by_key(|storage| storage.id);

        let mut guards: Vec<(StorageId, RwLockWriteGuard<'_, World>)> = involved
            .iter()
            .map(|storage| (storage.id, storage.world.write()))
            .collect();

        let slot = |id: StorageId| guards.iter().position(|(guard_id, _)| *guard_id == id);

        let mut pending = Vec::with_capacity(moves.len());
        for &(origin, entity) in moves {
            if origin.id == target.id {
                continue;
            }
            let index = slot(origin.id).ok_or(TransferError::MissingEntity {
                entity,
                storage: origin.id,
            })?;
            if !guards[index].1.contains(entity) {
                return Err(TransferError::MissingEntity {
                    entity,
                    storage: origin.id,
                });
            }
            pending.push((index, entity));
        }

        let target_index = slot(target.id).ok_or(TransferError::MissingEntity {
            entity: moves[0].1,
            storage: target.id,
        })?;

        let mut moved = Vec::with_capacity(pending.len());
        for (index, entity) in pending {
            if let Some(components) = guards[index].1.remove(entity) {
                moved.push((entity, components));
            }
        }
        let count = moved.len();
        for (entity, components) in moved {
            guards[target_index].1.adopt(entity, components);
        }

        log::debug!(
            "Transferred {count} entities into storage {:?}",
            target.id
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::CameraIndex;

    #[test]
    fn test_spawn_and_query() {
        let storage = Storage::new();
        let plain = storage.spawn(Components::new());
        let camera = storage.spawn(Components::new().with_camera(CameraIndex(2)));

        assert_eq!(storage.len(), 2);
        assert!(storage.contains(plain));

        let hits: Vec<_> = storage.cursor(Query::all().with_camera()).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, camera);
        assert_eq!(hits[0].1.camera, Some(CameraIndex(2)));
    }

    #[test]
    fn test_transfer_moves_entities() {
        let origin = Storage::new();
        let target = Storage::new();
        let a = origin.spawn(Components::new());
        let b = origin.spawn(Components::new().with_camera(CameraIndex(0)));

        origin.transfer_entities(&target, &[a, b]).unwrap();

        assert!(origin.is_empty());
        assert!(target.contains(a));
        assert_eq!(target.get(b).unwrap().camera, Some(CameraIndex(0)));
    }

    #[test]
    fn test_failed_transfer_moves_nothing() {
        let origin = Storage::new();
        let other = Storage::new();
        let target = Storage::new();
        let present = origin.spawn(Components::new());
        let elsewhere = other.spawn(Components::new());

        let err = origin
            .transfer_entities(&target, &[present, elsewhere])
            .unwrap_err();
        assert_eq!(
            err,
            TransferError::MissingEntity {
                entity: elsewhere,
                storage: origin.id()
            }
        );
        assert!(origin.contains(present));
        assert!(target.is_empty());
    }

    #[test]
    fn test_batch_from_several_origins() {
        let first = Storage::new();
        let second = Storage::new();
        let target = Storage::new();
        let a = first.spawn(Components::new());
        let b = second.spawn(Components::new());
        let c = target.spawn(Components::new());

        Storage::transfer_batch(&target, &[(&second, b), (&first, a), (&target, c)]).unwrap();
        assert_eq!(target.len(), 3);
        assert!(first.is_empty() && second.is_empty());
    }

    #[test]
    fn test_duplicate_entity_rejected() {
        let origin = Storage::new();
        let target = Storage::new();
        let a = origin.spawn(Components::new());

        assert_eq!(
            origin.transfer_entities(&target, &[a, a]).unwrap_err(),
            TransferError::DuplicateEntity(a)
        );
        assert!(origin.contains(a));
    }

    #[test]
    fn test_opposite_transfers_do_not_deadlock() {
        let left = std::sync::Arc::new(Storage::new());
        let right = std::sync::Arc::new(Storage::new());
        let to_right: Vec<_> = (0..50).map(|_| left.spawn(Components::new())).collect();
        let to_left: Vec<_> = (0..50).map(|_| right.spawn(Components::new())).collect();

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for entity in &to_right {
                    left.transfer_entities(&right, &[*entity]).unwrap();
                }
            });
            scope.spawn(|| {
                for entity in &to_left {
                    right.transfer_entities(&left, &[*entity]).unwrap();
                }
            });
        });

        assert_eq!(left.len(), 50);
        assert_eq!(right.len(), 50);
    }
}
