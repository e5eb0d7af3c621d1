//! In-memory world state.
//!
//! The whole world is loaded from the [`WorldStore`] once at startup and every
//! mutation goes through an explicit `upsert_*`/`delete_*` call which writes the
//! record back to the store. Reads hand out clones, so mutating a fetched record
//! has no effect until it is upserted again.
//!
//! `RoomRecord::users` and `RoomRecord::entrances` are derived indexes owned by
//! this type. Upserting a room never replaces them with the caller's copy.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, error, info, warn};

use crate::world::errors::WorldError;
use crate::world::storage::WorldStore;
use crate::world::types::{
    ItemId, ItemRecord, RoomId, RoomRecord, UserRecord, ROOT_ROOM_ID,
};

/// Root room and sentinel wizard account written into an empty store.
pub fn canonical_world_seed(root_room_name: &str, root_user: &str) -> (RoomRecord, UserRecord) {
    let room = RoomRecord::new(ROOT_ROOM_ID, root_room_name, root_user).with_description(
        "A quiet, featureless place. Everything begins here, and everything returns here.",
    );
    let mut user = UserRecord::new(root_user, "");
    user.wizard = true;
    user.online = false;
    user.room = ROOT_ROOM_ID;
    (room, user)
}

/// Where a non-duplified item currently sits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemLocation {
    Room(RoomId),
    Inventory(Vec<String>),
    Container(ItemId),
    Nowhere,
}

pub struct World {
    store: WorldStore,
    rooms: BTreeMap<RoomId, RoomRecord>,
    items: BTreeMap<ItemId, ItemRecord>,
    users: BTreeMap<String, UserRecord>,
    online: BTreeSet<String>,
}

impl World {
    /// Load every collection from the store and rebuild the derived indexes.
    pub fn load(store: WorldStore) -> Result<Self, WorldError> {
        let mut world = Self {
            rooms: store
                .all::<RoomRecord>()?
                .into_iter()
                .map(|r| (r.id, r))
                .collect(),
            items: store
                .all::<ItemRecord>()?
                .into_iter()
                .map(|i| (i.id, i))
                .collect(),
            users: store
                .all::<UserRecord>()?
                .into_iter()
                .map(|u| (u.name.clone(), u))
                .collect(),
            online: BTreeSet::new(),
            store,
        };

        // Nobody is connected right after a restart.
        let stale: Vec<String> = world
            .users
            .values()
            .filter(|u| u.online)
            .map(|u| u.name.clone())
            .collect();
        for name in stale {
            if let Some(user) = world.users.get_mut(&name) {
                user.online = false;
                world.store.upsert(user)?;
            }
        }

        let entrances = world.compute_entrances();
        let ids: Vec<RoomId> = world.rooms.keys().copied().collect();
        for id in ids {
            let fresh = entrances.get(&id).cloned().unwrap_or_default();
            if let Some(room) = world.rooms.get_mut(&id) {
                if room.entrances != fresh || !room.users.is_empty() {
                    room.entrances = fresh;
                    room.users.clear();
                    world.store.upsert(room)?;
                }
            }
        }

        info!(
            "Loaded world: {} rooms, {} items, {} users",
            world.rooms.len(),
            world.items.len(),
            world.users.len()
        );
        Ok(world)
    }

    pub fn store(&self) -> &WorldStore {
        &self.store
    }

    fn compute_entrances(&self) -> BTreeMap<RoomId, BTreeSet<RoomId>> {
        let mut map: BTreeMap<RoomId, BTreeSet<RoomId>> = BTreeMap::new();
        for room in self.rooms.values() {
            for exit in &room.exits {
                if !self.rooms.contains_key(&exit.dest) {
                    error!(
                        "Exit '{}' in room {} leads to missing room {}",
                        exit.name, room.id, exit.dest
                    );
                    continue;
                }
                map.entry(exit.dest).or_default().insert(room.id);
            }
        }
        map
    }

    // ----- reads ---------------------------------------------------------

    pub fn get_room(&self, id: RoomId) -> Option<RoomRecord> {
        self.rooms.get(&id).cloned()
    }

    pub fn get_item(&self, id: ItemId) -> Option<ItemRecord> {
        self.items.get(&id).cloned()
    }

    pub fn get_user(&self, name: &str) -> Option<UserRecord> {
        self.user(name).cloned()
    }

    pub fn get_user_by_nick(&self, nick: &str) -> Option<UserRecord> {
        self.users
            .values()
            .find(|u| u.nick.eq_ignore_ascii_case(nick))
            .cloned()
    }

    pub fn room(&self, id: RoomId) -> Option<&RoomRecord> {
        self.rooms.get(&id)
    }

    pub fn item(&self, id: ItemId) -> Option<&ItemRecord> {
        self.items.get(&id)
    }

    pub fn user(&self, name: &str) -> Option<&UserRecord> {
        self.users.get(&name.to_ascii_lowercase())
    }

    pub fn all_rooms(&self) -> impl Iterator<Item = &RoomRecord> {
        self.rooms.values()
    }

    pub fn all_items(&self) -> impl Iterator<Item = &ItemRecord> {
        self.items.values()
    }

    pub fn all_users(&self) -> impl Iterator<Item = &UserRecord> {
        self.users.values()
    }

    pub fn is_online(&self, name: &str) -> bool {
        self.online.contains(&name.to_ascii_lowercase())
    }

    pub fn online_users(&self) -> impl Iterator<Item = &UserRecord> {
        self.online.iter().filter_map(|n| self.users.get(n))
    }

    /// Whether a nickname or username is already used by someone other than `except`.
    pub fn nick_taken(&self, nick: &str, except: &str) -> bool {
        self.users.values().any(|u| {
            !u.name.eq_ignore_ascii_case(except)
                && (u.nick.eq_ignore_ascii_case(nick) || u.name.eq_ignore_ascii_case(nick))
        })
    }

    /// Whether an item name is already used, ignoring `except`.
    pub fn item_name_taken(&self, name: &str, except: Option<ItemId>) -> bool {
        self.items
            .values()
            .any(|i| Some(i.id) != except && i.name.eq_ignore_ascii_case(name))
    }

    pub fn next_room_id(&self) -> Result<RoomId, WorldError> {
        self.store.next_room_id()
    }

    pub fn next_item_id(&self) -> ItemId {
        self.items.keys().next_back().map(|id| id + 1).unwrap_or(0)
    }

    /// Usernames whose inventory holds `id`.
    pub fn holders(&self, id: ItemId) -> Vec<String> {
        self.users
            .values()
            .filter(|u| u.holds(id))
            .map(|u| u.name.clone())
            .collect()
    }

    pub fn locate_item(&self, id: ItemId) -> ItemLocation {
        if let Some(room) = self.rooms.values().find(|r| r.items.contains(&id)) {
            return ItemLocation::Room(room.id);
        }
        let holders = self.holders(id);
        if !holders.is_empty() {
            return ItemLocation::Inventory(holders);
        }
        if let Some(container) = self
            .items
            .values()
            .find(|i| i.container.items.contains(&id))
        {
            return ItemLocation::Container(container.id);
        }
        ItemLocation::Nowhere
    }

    /// Whether `inner` is `outer` or is nested somewhere inside it.
    pub fn contains_nested(&self, outer: ItemId, inner: ItemId) -> bool {
        if outer == inner {
            return true;
        }
        let mut stack = vec![outer];
        let mut seen = BTreeSet::new();
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            if let Some(item) = self.items.get(&id) {
                for child in &item.container.items {
                    if *child == inner {
                        return true;
                    }
                    stack.push(*child);
                }
            }
        }
        false
    }

    // ----- writes --------------------------------------------------------

    /// Persist a room. Derived fields are kept from the authoritative copy and
    /// the entrance index of every room whose inbound exits changed is updated.
    pub fn upsert_room(&mut self, mut room: RoomRecord) -> Result<(), WorldError> {
        let old_dests: BTreeSet<RoomId> = match self.rooms.get(&room.id) {
            Some(old) => {
                room.users = old.users.clone();
                room.entrances = old.entrances.clone();
                old.exits.iter().map(|e| e.dest).collect()
            }
            None => {
                room.users.clear();
                room.entrances = self
                    .rooms
                    .values()
                    .filter(|r| r.leads_to(room.id))
                    .map(|r| r.id)
                    .collect();
                BTreeSet::new()
            }
        };
        let new_dests: BTreeSet<RoomId> = room.exits.iter().map(|e| e.dest).collect();
        let source = room.id;

        self.store.upsert(&room)?;
        self.rooms.insert(room.id, room);

        for dest in old_dests.difference(&new_dests) {
            self.set_entrance(*dest, source, false)?;
        }
        for dest in new_dests.difference(&old_dests) {
            self.set_entrance(*dest, source, true)?;
        }
        Ok(())
    }

    fn set_entrance(&mut self, dest: RoomId, source: RoomId, present: bool) -> Result<(), WorldError> {
        let Some(room) = self.rooms.get_mut(&dest) else {
            if present {
                error!("Room {} has an exit to missing room {}", source, dest);
            }
            return Ok(());
        };
        let changed = if present {
            room.entrances.insert(source)
        } else {
            room.entrances.remove(&source)
        };
        if changed {
            self.store.upsert(room)?;
        }
        Ok(())
    }

    fn set_occupant(&mut self, room_id: RoomId, name: &str, present: bool) -> Result<(), WorldError> {
        let Some(room) = self.rooms.get_mut(&room_id) else {
            if present {
                error!("User {} is located in missing room {}", name, room_id);
            }
            return Ok(());
        };
        let changed = if present {
            room.users.insert(name.to_string())
        } else {
            room.users.remove(name)
        };
        if changed {
            self.store.upsert(room)?;
        }
        Ok(())
    }

    /// Remove a room record. Exits in other rooms that lead here are the caller's concern.
    pub fn delete_room(&mut self, id: RoomId) -> Result<Option<RoomRecord>, WorldError> {
        let Some(room) = self.rooms.remove(&id) else {
            return Ok(None);
        };
        self.store.delete(&room)?;
        let dests: BTreeSet<RoomId> = room.exits.iter().map(|e| e.dest).collect();
        for dest in dests {
            self.set_entrance(dest, id, false)?;
        }
        if !room.entrances.is_empty() {
            warn!(
                "Deleted room {} still had entrances from {:?}",
                id, room.entrances
            );
        }
        Ok(Some(room))
    }

    pub fn upsert_item(&mut self, item: ItemRecord) -> Result<(), WorldError> {
        self.store.upsert(&item)?;
        self.items.insert(item.id, item);
        Ok(())
    }

    pub fn delete_item(&mut self, id: ItemId) -> Result<Option<ItemRecord>, WorldError> {
        let Some(item) = self.items.remove(&id) else {
            return Ok(None);
        };
        self.store.delete(&item)?;
        Ok(Some(item))
    }

    /// Persist a user. Online state comes from the session registry, and a
    /// changed `room` moves the user between occupant sets when online.
    pub fn upsert_user(&mut self, mut user: UserRecord) -> Result<(), WorldError> {
        user.name = user.name.to_ascii_lowercase();
        user.online = self.online.contains(&user.name);
        let old_room = self.users.get(&user.name).map(|u| u.room);
        let (name, room, online) = (user.name.clone(), user.room, user.online);

        self.store.upsert(&user)?;
        self.users.insert(name.clone(), user);

        if online {
            if let Some(old) = old_room.filter(|old| *old != room) {
                self.set_occupant(old, &name, false)?;
            }
            self.set_occupant(room, &name, true)?;
        }
        Ok(())
    }

    /// Mark a user online or offline and reconcile the occupant set of their room.
    pub fn set_online(&mut self, name: &str, online: bool) -> Result<(), WorldError> {
        let key = name.to_ascii_lowercase();
        let Some(user) = self.users.get_mut(&key) else {
            return Err(WorldError::NotFound(format!("user: {}", name)));
        };
        user.online = online;
        if !online {
            user.posture = None;
        }
        let room = user.room;
        self.store.upsert(user)?;
        if online {
            self.online.insert(key.clone());
        } else {
            self.online.remove(&key);
        }
        debug!("User {} is now {}", key, if online { "online" } else { "offline" });
        self.set_occupant(room, &key, online)
    }

    /// Strip an item id from every room, inventory and container that lists it.
    pub fn remove_item_everywhere(&mut self, id: ItemId) -> Result<(), WorldError> {
        let rooms: Vec<RoomId> = self
            .rooms
            .values()
            .filter(|r| r.items.contains(&id))
            .map(|r| r.id)
            .collect();
        for room_id in rooms {
            if let Some(mut room) = self.get_room(room_id) {
                room.items.retain(|i| *i != id);
                self.upsert_room(room)?;
            }
        }
        for name in self.holders(id) {
            if let Some(mut user) = self.get_user(&name) {
                user.inventory.retain(|i| *i != id);
                self.upsert_user(user)?;
            }
        }
        let containers: Vec<ItemId> = self
            .items
            .values()
            .filter(|i| i.container.items.contains(&id))
            .map(|i| i.id)
            .collect();
        for container_id in containers {
            if let Some(mut container) = self.get_item(container_id) {
                container.container.items.retain(|i| *i != id);
                self.upsert_item(container)?;
            }
        }
        Ok(())
    }

    /// Move an item back into its primary owner's inventory, falling back to the
    /// root room when the primary owner no longer exists. Returns the new holder.
    pub fn return_item(&mut self, id: ItemId) -> Result<Option<String>, WorldError> {
        let Some(item) = self.get_item(id) else {
            return Ok(None);
        };
        self.remove_item_everywhere(id)?;
        let owner = item.owners.primary().and_then(|o| self.get_user(o));
        match owner {
            Some(mut user) => {
                user.inventory.push(id);
                let name = user.name.clone();
                self.upsert_user(user)?;
                Ok(Some(name))
            }
            None => {
                warn!("Item {} has no existing primary owner; returning to root room", id);
                if let Some(mut root) = self.get_room(ROOT_ROOM_ID) {
                    root.items.push(id);
                    self.upsert_room(root)?;
                }
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::storage::WorldStoreBuilder;
    use crate::world::types::Exit;
    use tempfile::TempDir;

    fn world() -> (World, TempDir) {
        let dir = TempDir::new().expect("tempdir");
        let store = WorldStoreBuilder::new(dir.path()).open().expect("store");
        (World::load(store).expect("load"), dir)
    }

    #[test]
    fn fetched_records_are_snapshots() {
        let (world, _dir) = world();
        let mut room = world.get_room(ROOT_ROOM_ID).unwrap();
        room.name = "Changed".into();
        assert_ne!(world.room(ROOT_ROOM_ID).unwrap().name, "Changed");
    }

    #[test]
    fn entrances_follow_exit_changes() {
        let (mut world, _dir) = world();
        let id = world.next_room_id().unwrap();
        world.upsert_room(RoomRecord::new(id, "Cellar", "ann")).unwrap();

        let mut root = world.get_room(ROOT_ROOM_ID).unwrap();
        root.exits.push(Exit::new("trapdoor", id, "ann"));
        world.upsert_room(root).unwrap();
        assert!(world.room(id).unwrap().entrances.contains(&ROOT_ROOM_ID));

        // A stale copy of the cellar must not wipe its entrance index.
        let mut stale = RoomRecord::new(id, "Cellar", "ann");
        stale.description = "Damp.".into();
        world.upsert_room(stale).unwrap();
        assert!(world.room(id).unwrap().entrances.contains(&ROOT_ROOM_ID));

        let mut root = world.get_room(ROOT_ROOM_ID).unwrap();
        root.exits.clear();
        world.upsert_room(root).unwrap();
        assert!(world.room(id).unwrap().entrances.is_empty());
    }

    #[test]
    fn occupants_track_online_users() {
        let (mut world, _dir) = world();
        world.upsert_user(UserRecord::new("ann", "x")).unwrap();
        assert!(world.room(ROOT_ROOM_ID).unwrap().users.is_empty());

        world.set_online("ann", true).unwrap();
        assert!(world.room(ROOT_ROOM_ID).unwrap().users.contains("ann"));

        let id = world.next_room_id().unwrap();
        world.upsert_room(RoomRecord::new(id, "Attic", "ann")).unwrap();
        let mut ann = world.get_user("ann").unwrap();
        ann.room = id;
        world.upsert_user(ann).unwrap();
        assert!(!world.room(ROOT_ROOM_ID).unwrap().users.contains("ann"));
        assert!(world.room(id).unwrap().users.contains("ann"));

        world.set_online("ann", false).unwrap();
        assert!(world.room(id).unwrap().users.is_empty());
        assert!(!world.get_user("ann").unwrap().online);
    }

    #[test]
    fn reload_clears_online_state() {
        let dir = TempDir::new().expect("tempdir");
        {
            let store = WorldStoreBuilder::new(dir.path()).open().unwrap();
            let mut world = World::load(store).unwrap();
            world.upsert_user(UserRecord::new("ann", "x")).unwrap();
            world.set_online("ann", true).unwrap();
        }
        let store = WorldStoreBuilder::new(dir.path()).open().unwrap();
        let world = World::load(store).unwrap();
        assert!(!world.is_online("ann"));
        assert!(!world.get_user("ann").unwrap().online);
        assert!(world.room(ROOT_ROOM_ID).unwrap().users.is_empty());
    }

    #[test]
    fn return_item_goes_to_primary_owner() {
        let (mut world, _dir) = world();
        world.upsert_user(UserRecord::new("ann", "x")).unwrap();
        let id = world.next_item_id();
        world.upsert_item(ItemRecord::new(id, "Lamp", "ann")).unwrap();
        let mut root = world.get_room(ROOT_ROOM_ID).unwrap();
        root.items.push(id);
        world.upsert_room(root).unwrap();

        assert_eq!(world.return_item(id).unwrap(), Some("ann".to_string()));
        assert_eq!(
            world.locate_item(id),
            ItemLocation::Inventory(vec!["ann".to_string()])
        );
    }

    #[test]
    fn nesting_detects_cycles() {
        let (mut world, _dir) = world();
        let mut bag = ItemRecord::new(0, "Bag", "ann");
        bag.container.enabled = true;
        bag.container.items.push(1);
        let mut pouch = ItemRecord::new(1, "Pouch", "ann");
        pouch.container.enabled = true;
        pouch.container.items.push(2);
        world.upsert_item(bag).unwrap();
        world.upsert_item(pouch).unwrap();
        world.upsert_item(ItemRecord::new(2, "Coin", "ann")).unwrap();
        assert!(world.contains_nested(0, 2));
        assert!(!world.contains_nested(2, 0));
    }
}
