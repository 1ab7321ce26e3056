//! Entity implementation

use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ENTITY_ID: AtomicU64 = AtomicU64::new(1);

/// Entity identifier, unique across every storage in the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity {
    id: u64,
}

impl Entity {
    /// Allocate a fresh entity id
    pub(super) fn allocate() -> Self {
        Self {
            id: NEXT_ENTITY_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Get the entity ID
    pub const fn id(&self) -> u64 {
        self.id
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "entity#{}", self.id)
    }
}
