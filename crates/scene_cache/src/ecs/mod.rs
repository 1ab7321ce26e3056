//! Minimal entity storage
//!
//! Scenes own one [`Storage`] each. The rest of the client treats storages
//! as opaque containers that can spawn entities, answer queries and move
//! entities between each other transactionally.

pub mod component;
pub mod entity;
pub mod query;
pub mod storage;
pub mod world;

pub use component::{CameraIndex, Components};
pub use entity::Entity;
pub use query::{Cursor, Query};
pub use storage::{Storage, StorageId, TransferError};
pub use world::World;
