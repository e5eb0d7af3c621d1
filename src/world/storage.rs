use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::IVec;

use crate::world::errors::WorldError;
use crate::world::state::canonical_world_seed;
use crate::world::types::{
    ItemRecord, RoomId, RoomRecord, UserRecord, ITEM_SCHEMA_VERSION, ROOM_SCHEMA_VERSION,
    USER_SCHEMA_VERSION,
};

const TREE_ROOMS: &str = "rooms";
const TREE_ITEMS: &str = "items";
const TREE_USERS: &str = "users";
const TREE_META: &str = "meta";

const KEY_NEXT_ROOM_ID: &[u8] = b"counters:next_room_id";

pub const DEFAULT_ROOT_ROOM_NAME: &str = "Limbo";
pub const DEFAULT_ROOT_USER: &str = "world";

/// The three keyed collections of the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Rooms,
    Items,
    Users,
}

impl Collection {
    fn tree_name(self) -> &'static str {
        match self {
            Collection::Rooms => TREE_ROOMS,
            Collection::Items => TREE_ITEMS,
            Collection::Users => TREE_USERS,
        }
    }
}

/// A record that can live in one of the store's collections.
pub trait Document: Serialize + DeserializeOwned + Clone {
    const COLLECTION: Collection;
    const ENTITY: &'static str;
    const SCHEMA_VERSION: u8;

    fn key(&self) -> String;
    fn schema_version(&self) -> u8;
    fn set_schema_version(&mut self, version: u8);
}

/// Zero-padded so lexical key order matches numeric order.
fn numeric_key(id: u64) -> String {
    format!("{:020}", id)
}

impl Document for RoomRecord {
    const COLLECTION: Collection = Collection::Rooms;
    const ENTITY: &'static str = "room";
    const SCHEMA_VERSION: u8 = ROOM_SCHEMA_VERSION;

    fn key(&self) -> String {
        numeric_key(self.id)
    }
    fn schema_version(&self) -> u8 {
        self.schema_version
    }
    fn set_schema_version(&mut self, version: u8) {
        self.schema_version = version;
    }
}

impl Document for ItemRecord {
    const COLLECTION: Collection = Collection::Items;
    const ENTITY: &'static str = "item";
    const SCHEMA_VERSION: u8 = ITEM_SCHEMA_VERSION;

    fn key(&self) -> String {
        numeric_key(self.id)
    }
    fn schema_version(&self) -> u8 {
        self.schema_version
    }
    fn set_schema_version(&mut self, version: u8) {
        self.schema_version = version;
    }
}

impl Document for UserRecord {
    const COLLECTION: Collection = Collection::Users;
    const ENTITY: &'static str = "user";
    const SCHEMA_VERSION: u8 = USER_SCHEMA_VERSION;

    fn key(&self) -> String {
        self.name.to_ascii_lowercase()
    }
    fn schema_version(&self) -> u8 {
        self.schema_version
    }
    fn set_schema_version(&mut self, version: u8) {
        self.schema_version = version;
    }
}

/// Helper builder so tests can easily create throwaway stores with custom paths.
pub struct WorldStoreBuilder {
    path: PathBuf,
    ensure_world_seed: bool,
    root_room_name: String,
    root_user: String,
}

impl WorldStoreBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ensure_world_seed: true,
            root_room_name: DEFAULT_ROOT_ROOM_NAME.to_string(),
            root_user: DEFAULT_ROOT_USER.to_string(),
        }
    }

    /// Opt out of seeding the root room and user during initialization (useful for targeted tests).
    pub fn without_world_seed(mut self) -> Self {
        self.ensure_world_seed = false;
        self
    }

    pub fn root_room_name(mut self, name: &str) -> Self {
        self.root_room_name = name.to_string();
        self
    }

    pub fn root_user(mut self, name: &str) -> Self {
        self.root_user = name.to_ascii_lowercase();
        self
    }

    pub fn open(self) -> Result<WorldStore, WorldError> {
        let store = WorldStore::open_unseeded(&self.path)?;
        if self.ensure_world_seed {
            store.seed_world_if_needed(&self.root_room_name, &self.root_user)?;
        }
        Ok(store)
    }
}

/// Sled-backed persistence for rooms, items and users.
pub struct WorldStore {
    _db: sled::Db,
    rooms: sled::Tree,
    items: sled::Tree,
    users: sled::Tree,
    meta: sled::Tree,
}

impl WorldStore {
    /// Open (or create) the store rooted at `path`, seeding the root room and user if empty.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, WorldError> {
        WorldStoreBuilder::new(path.as_ref()).open()
    }

    fn open_unseeded(path: &Path) -> Result<Self, WorldError> {
        std::fs::create_dir_all(path)?;
        let db = sled::open(path)?;
        let rooms = db.open_tree(Collection::Rooms.tree_name())?;
        let items = db.open_tree(Collection::Items.tree_name())?;
        let users = db.open_tree(Collection::Users.tree_name())?;
        let meta = db.open_tree(TREE_META)?;
        debug!("Opened world store at {}", path.display());
        Ok(Self {
            _db: db,
            rooms,
            items,
            users,
            meta,
        })
    }

    fn tree(&self, collection: Collection) -> &sled::Tree {
        match collection {
            Collection::Rooms => &self.rooms,
            Collection::Items => &self.items,
            Collection::Users => &self.users,
        }
    }

    fn serialize<T: Serialize>(value: &T) -> Result<Vec<u8>, WorldError> {
        Ok(bincode::serialize(value)?)
    }

    fn deserialize<T: Document>(bytes: IVec) -> Result<T, WorldError> {
        let record: T = bincode::deserialize(&bytes)?;
        if record.schema_version() != T::SCHEMA_VERSION {
            return Err(WorldError::SchemaMismatch {
                entity: T::ENTITY,
                expected: T::SCHEMA_VERSION,
                found: record.schema_version(),
            });
        }
        Ok(record)
    }

    /// Insert or replace a document under its key.
    pub fn upsert<T: Document>(&self, doc: &T) -> Result<(), WorldError> {
        let tree = self.tree(T::COLLECTION);
        let mut doc = doc.clone();
        doc.set_schema_version(T::SCHEMA_VERSION);
        let bytes = Self::serialize(&doc)?;
        tree.insert(doc.key().as_bytes(), bytes)?;
        tree.flush()?;
        Ok(())
    }

    /// Remove a document by its key. Returns whether anything was removed.
    pub fn delete<T: Document>(&self, doc: &T) -> Result<bool, WorldError> {
        let tree = self.tree(T::COLLECTION);
        let removed = tree.remove(doc.key().as_bytes())?.is_some();
        tree.flush()?;
        Ok(removed)
    }

    pub fn get<T: Document>(&self, key: &str) -> Result<Option<T>, WorldError> {
        let tree = self.tree(T::COLLECTION);
        match tree.get(key.as_bytes())? {
            Some(bytes) => Ok(Some(Self::deserialize(bytes)?)),
            None => Ok(None),
        }
    }

    /// All documents in a collection matching `predicate`, in key order.
    pub fn query<T, F>(&self, predicate: F) -> Result<Vec<T>, WorldError>
    where
        T: Document,
        F: Fn(&T) -> bool,
    {
        let mut out = Vec::new();
        for entry in self.tree(T::COLLECTION).iter() {
            let (_, value) = entry?;
            let doc: T = Self::deserialize(value)?;
            if predicate(&doc) {
                out.push(doc);
            }
        }
        Ok(out)
    }

    pub fn all<T: Document>(&self) -> Result<Vec<T>, WorldError> {
        self.query(|_: &T| true)
    }

    pub fn get_room(&self, id: RoomId) -> Result<RoomRecord, WorldError> {
        self.get(&numeric_key(id))?
            .ok_or_else(|| WorldError::NotFound(format!("room: {}", id)))
    }

    pub fn get_item(&self, id: u64) -> Result<ItemRecord, WorldError> {
        self.get(&numeric_key(id))?
            .ok_or_else(|| WorldError::NotFound(format!("item: {}", id)))
    }

    pub fn get_user(&self, name: &str) -> Result<UserRecord, WorldError> {
        self.get(&name.to_ascii_lowercase())?
            .ok_or_else(|| WorldError::NotFound(format!("user: {}", name)))
    }

    pub fn count(&self, collection: Collection) -> usize {
        self.tree(collection).len()
    }

    /// Issue the next room id. Ids are never reused, even after the highest room is deleted.
    pub fn next_room_id(&self) -> Result<RoomId, WorldError> {
        let stored = match self.meta.get(KEY_NEXT_ROOM_ID)? {
            Some(bytes) => {
                let mut buf = [0u8; 8];
                if bytes.len() == 8 {
                    buf.copy_from_slice(&bytes);
                }
                u64::from_be_bytes(buf)
            }
            None => 0,
        };
        // Never hand out an id at or below an existing room, even if the counter was lost.
        let floor = match self.rooms.last()? {
            Some((_, value)) => Self::deserialize::<RoomRecord>(value)?.id + 1,
            None => 0,
        };
        let id = stored.max(floor);
        self.meta
            .insert(KEY_NEXT_ROOM_ID, (id + 1).to_be_bytes().to_vec())?;
        self.meta.flush()?;
        Ok(id)
    }

    /// Seed room 0 and the sentinel root user when the store has no rooms yet.
    pub fn seed_world_if_needed(
        &self,
        root_room_name: &str,
        root_user: &str,
    ) -> Result<usize, WorldError> {
        if !self.rooms.is_empty() {
            return Ok(0);
        }
        let (room, user) = canonical_world_seed(root_room_name, root_user);
        self.upsert(&room)?;
        self.meta
            .insert(KEY_NEXT_ROOM_ID, (room.id + 1).to_be_bytes().to_vec())?;
        if self.get::<UserRecord>(&user.name)?.is_none() {
            self.upsert(&user)?;
        }
        info!(
            "Seeded empty world with root room '{}' owned by '{}'",
            room.name, user.name
        );
        Ok(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::types::ROOT_ROOM_ID;
    use tempfile::TempDir;

    #[test]
    fn store_round_trip_user() {
        let dir = TempDir::new().expect("tempdir");
        let store = WorldStoreBuilder::new(dir.path()).open().expect("store");
        let mut user = UserRecord::new("Alice", "hash");
        user.inventory.push(7);
        store.upsert(&user).expect("put");
        let fetched = store.get_user("ALICE").expect("get");
        assert_eq!(fetched.name, "alice");
        assert_eq!(fetched.nick, "Alice");
        assert_eq!(fetched.inventory, vec![7]);
        assert_eq!(fetched.schema_version, USER_SCHEMA_VERSION);
    }

    #[test]
    fn seeding_world_only_happens_once() {
        let dir = TempDir::new().expect("tempdir");
        {
            let store = WorldStoreBuilder::new(dir.path())
                .root_room_name("The Void")
                .open()
                .expect("store");
            let root = store.get_room(ROOT_ROOM_ID).expect("room 0");
            assert_eq!(root.name, "The Void");
            assert!(root.owners.is_primary(DEFAULT_ROOT_USER));
            let user = store.get_user(DEFAULT_ROOT_USER).expect("root user");
            assert!(user.wizard);
            assert!(!user.online);
        }

        let store = WorldStoreBuilder::new(dir.path())
            .without_world_seed()
            .open()
            .expect("reopen store");
        let count = store
            .seed_world_if_needed("Elsewhere", "world")
            .expect("seed check");
        assert_eq!(count, 0, "should not reseed when rooms already exist");
        assert_eq!(store.get_room(ROOT_ROOM_ID).unwrap().name, "The Void");
    }

    #[test]
    fn query_filters_and_delete_removes() {
        let dir = TempDir::new().expect("tempdir");
        let store = WorldStoreBuilder::new(dir.path())
            .without_world_seed()
            .open()
            .expect("store");
        for (id, name) in [(1, "Lamp"), (2, "Rope"), (3, "Lantern")] {
            store.upsert(&ItemRecord::new(id, name, "ann")).unwrap();
        }
        let lamps: Vec<ItemRecord> = store
            .query(|i: &ItemRecord| i.name.starts_with('L'))
            .unwrap();
        assert_eq!(lamps.iter().map(|i| i.id).collect::<Vec<_>>(), vec![1, 3]);

        let rope = store.get_item(2).unwrap();
        assert!(store.delete(&rope).unwrap());
        assert!(matches!(store.get_item(2), Err(WorldError::NotFound(_))));
        assert_eq!(store.count(Collection::Items), 2);
    }

    #[test]
    fn room_ids_are_not_reused() {
        let dir = TempDir::new().expect("tempdir");
        let store = WorldStoreBuilder::new(dir.path()).open().expect("store");
        let first = store.next_room_id().unwrap();
        assert_eq!(first, 1);
        let room = RoomRecord::new(first, "Cellar", "ann");
        store.upsert(&room).unwrap();
        store.delete(&room).unwrap();
        assert_eq!(store.next_room_id().unwrap(), 2);
    }
}
