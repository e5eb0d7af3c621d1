//! Test utilities & fixtures.
//! Builds an [`Engine`] on a throwaway sled store with cheap password hashing
//! and gives each simulated player an in-process console.

#![allow(dead_code)]

use std::sync::Arc;

use meshmush::config::{Argon2Config, Config};
use meshmush::server::{Console, Credentials, Engine, TransportKind};
use meshmush::world::{RoomId, RoomRecord, UserRecord, World, WorldStore, WorldStoreBuilder};
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;

pub const PASSWORD: &str = "correct-horse";

pub fn test_config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.world.name = "Testworld".to_string();
    config.world.db_path = dir.path().join("world").to_string_lossy().into_owned();
    config.logging.file = None;
    config.logging.security_file = None;
    config.security.login_cooldown_ms = 60_000;
    config.security.argon2 = Some(cheap_argon2());
    config
}

fn cheap_argon2() -> Argon2Config {
    Argon2Config {
        memory_kib: Some(64),
        time_cost: Some(1),
        parallelism: Some(1),
    }
}

pub struct Client {
    pub console: Console,
    rx: UnboundedReceiver<String>,
}

impl Client {
    /// Everything queued for this session since the last drain, one entry per message.
    pub fn drain(&mut self) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            out.push(msg);
        }
        out
    }

    pub fn transcript(&mut self) -> String {
        self.drain().join("\n")
    }
}

pub struct TestWorld {
    pub engine: Engine,
    _dir: TempDir,
}

impl TestWorld {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    pub fn with_config(adjust: impl FnOnce(&mut Config)) -> Self {
        Self::custom(adjust, &[])
    }

    /// Start with pre-registered accounts; `(name, wizard)` pairs share [`PASSWORD`].
    pub fn with_accounts(accounts: &[(&str, bool)]) -> Self {
        Self::custom(|_| {}, accounts)
    }

    pub fn custom(adjust: impl FnOnce(&mut Config), accounts: &[(&str, bool)]) -> Self {
        Self::build(adjust, accounts, |_| {})
    }

    /// Write raw records into the store before the world loads, e.g. to plant
    /// references that no longer resolve.
    pub fn seeded(setup: impl FnOnce(&WorldStore)) -> Self {
        Self::build(|_| {}, &[], setup)
    }

    fn build(
        adjust: impl FnOnce(&mut Config),
        accounts: &[(&str, bool)],
        setup: impl FnOnce(&WorldStore),
    ) -> Self {
        let dir = TempDir::new().expect("tempdir");
        let mut config = test_config(&dir);
        adjust(&mut config);
        let store = WorldStoreBuilder::new(config.world.db_path.clone())
            .root_room_name(&config.world.root_room_name)
            .root_user(&config.world.root_user)
            .open()
            .expect("store");
        let credentials = Credentials::from_config(&config.security);
        for (name, wizard) in accounts {
            let mut user = UserRecord::new(name, &credentials.hash(PASSWORD).expect("hash"));
            user.wizard = *wizard;
            store.upsert(&user).expect("seed user");
        }
        setup(&store);
        let engine = Engine::with_store(config, store).expect("engine");
        Self { engine, _dir: dir }
    }

    /// Hand the engine to a server task. Keep the directory alive for the test's duration.
    pub fn into_shared(self) -> (Arc<Engine>, TempDir) {
        (Arc::new(self.engine), self._dir)
    }

    pub fn client(&self) -> Client {
        let (console, rx) = self.engine.connect(TransportKind::Local).expect("session slot");
        let mut client = Client { console, rx };
        client.drain();
        client
    }

    /// Run one line and return (success, everything this client received).
    pub fn run(&self, client: &mut Client, line: &str) -> (bool, String) {
        let ok = self.engine.execute(&mut client.console, line);
        (ok, client.transcript())
    }

    /// Run a line that must succeed.
    pub fn ok(&self, client: &mut Client, line: &str) -> String {
        let (ok, out) = self.run(client, line);
        assert!(ok, "'{}' failed:\n{}", line, out);
        out
    }

    /// Run a line that must fail.
    pub fn fail(&self, client: &mut Client, line: &str) -> String {
        let (ok, out) = self.run(client, line);
        assert!(!ok, "'{}' unexpectedly succeeded:\n{}", line, out);
        out
    }

    /// Register (if needed) and log in a player, returning a quiet client.
    pub fn player(&self, name: &str) -> Client {
        let mut client = self.client();
        let exists = self.world(|w| w.get_user(name).is_some());
        if !exists {
            self.ok(&mut client, &format!("register {} {}", name, PASSWORD));
        }
        self.ok(&mut client, &format!("login {} {}", name, PASSWORD));
        client.drain();
        client
    }

    pub fn world<R>(&self, f: impl FnOnce(&World) -> R) -> R {
        self.engine.with_world(f)
    }

    pub fn room(&self, id: RoomId) -> Option<RoomRecord> {
        self.world(|w| w.get_room(id))
    }

    pub fn room_named(&self, name: &str) -> RoomRecord {
        self.world(|w| w.all_rooms().find(|r| r.name == name).cloned())
            .unwrap_or_else(|| panic!("no room named {}", name))
    }

    pub fn item_id(&self, name: &str) -> u64 {
        self.world(|w| w.all_items().find(|i| i.name == name).map(|i| i.id))
            .unwrap_or_else(|| panic!("no item named {}", name))
    }

    pub fn user(&self, name: &str) -> UserRecord {
        self.world(|w| w.get_user(name))
            .unwrap_or_else(|| panic!("no user named {}", name))
    }
}

/// An account record whose password is [`PASSWORD`], hashed with the cheap test parameters.
pub fn account(name: &str) -> UserRecord {
    let mut config = Config::default();
    config.security.argon2 = Some(cheap_argon2());
    let credentials = Credentials::from_config(&config.security);
    UserRecord::new(name, &credentials.hash(PASSWORD).expect("hash"))
}

/// Every room's entrance index matches the exits that actually lead into it.
pub fn assert_entrances_consistent(world: &World) {
    for room in world.all_rooms() {
        let expected: std::collections::BTreeSet<RoomId> = world
            .all_rooms()
            .filter(|r| r.exits.iter().any(|e| e.dest == room.id))
            .map(|r| r.id)
            .collect();
        assert_eq!(
            room.entrances, expected,
            "entrances of room {} out of sync",
            room.id
        );
    }
}
