//! Persistent world data model.
//!
//! Rooms, items and users live in three sled trees managed by [`WorldStore`].
//! At runtime the authoritative copy is the in-memory [`World`], which writes
//! every change back through the store and maintains the derived occupant and
//! entrance indexes.

pub mod errors;
pub mod state;
pub mod storage;
pub mod types;

pub use errors::WorldError;
pub use state::{canonical_world_seed, ItemLocation, World};
pub use storage::{
    Collection, Document, WorldStore, WorldStoreBuilder, DEFAULT_ROOT_ROOM_NAME,
    DEFAULT_ROOT_USER,
};
pub use types::*;
