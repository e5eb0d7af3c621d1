//! # Server Module
//!
//! Glue between transports and the command layer.
//!
//! [`Engine`] owns the shared state: the world behind a single mutex, the
//! session [`Router`], the static command [`Registry`], the loaded config and
//! the password hasher. A transport task calls [`Engine::connect`] once,
//! feeds every received line to [`Engine::execute`] and finishes with
//! [`Engine::disconnect`].
//!
//! Every command runs under the world lock from resolution to the last
//! upsert, so concurrent sessions never interleave inside a command. The
//! argon2 work of credential commands is done before the lock is taken.

pub mod console;
pub mod credentials;
pub mod net;
pub mod router;

use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{info, warn};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

pub use console::Console;
pub use credentials::{Credentials, PreparedSecrets};
pub use router::{Router, SessionId, TransportKind};

use crate::commands::handlers::account::sign_out;
use crate::commands::dispatch::carries_credentials;
use crate::commands::{dispatch, CommandContext, Registry};
use crate::server::credentials::password_problem;
use crate::config::Config;
use crate::world::{World, WorldError, WorldStore, WorldStoreBuilder};

pub struct Engine {
    world: Mutex<World>,
    router: Router,
    registry: Registry,
    config: Config,
    credentials: Credentials,
}

impl Engine {
    /// Open (and seed if empty) the store named by the config.
    pub fn open(config: Config) -> Result<Self, WorldError> {
        let store = WorldStoreBuilder::new(config.world.db_path.clone())
            .root_room_name(&config.world.root_room_name)
            .root_user(&config.world.root_user)
            .open()?;
        Self::with_store(config, store)
    }

    pub fn with_store(config: Config, store: WorldStore) -> Result<Self, WorldError> {
        let world = World::load(store)?;
        let registry = Registry::standard();
        info!(
            "World '{}' ready with {} commands",
            config.world.name,
            registry.len()
        );
        Ok(Self {
            world: Mutex::new(world),
            router: Router::new(),
            registry,
            credentials: Credentials::from_config(&config.security),
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    fn lock_world(&self) -> MutexGuard<'_, World> {
        self.world.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Read-only access to the world under its lock.
    pub fn with_world<R>(&self, f: impl FnOnce(&World) -> R) -> R {
        f(&self.lock_world())
    }

    /// Register a new session and greet it. `None` when the server is full.
    pub fn connect(&self, transport: TransportKind) -> Option<(Console, UnboundedReceiver<String>)> {
        if self.router.len() >= self.config.server.max_sessions {
            warn!(
                "Refusing {:?} session: {} sessions already open",
                transport, self.config.server.max_sessions
            );
            return None;
        }
        let (tx, rx) = unbounded_channel();
        let id = self.router.register(transport, tx.clone());
        let console = Console::new(id, transport, tx);
        console.send(format!("Welcome to {}.", self.config.world.name));
        if !self.config.server.greeting.is_empty() {
            console.send(self.config.server.greeting.clone());
        }
        info!("Session {} connected over {:?}", id, transport);
        Some((console, rx))
    }

    /// Run one input line for `console`. Returns whether the command succeeded.
    pub fn execute(&self, console: &mut Console, line: &str) -> bool {
        let prepared = self.prepare_secrets(console, line);
        let mut world = self.lock_world();
        let mut ctx = CommandContext::new(
            console,
            &mut world,
            &self.router,
            &self.registry,
            &self.config,
            &self.credentials,
        )
        .with_prepared(prepared);
        dispatch(&mut ctx, line)
    }

    /// Hash and verify the secrets of a credential command up front, taking
    /// the world lock only to read stored hashes.
    fn prepare_secrets(&self, console: &mut Console, line: &str) -> PreparedSecrets {
        let mut prepared = PreparedSecrets::default();
        let words: Vec<&str> = line.trim().split(' ').filter(|w| !w.is_empty()).collect();
        let Some((first, args)) = words.split_first() else {
            return prepared;
        };
        if !carries_credentials(first) {
            return prepared;
        }
        let creds = &self.credentials;
        let logged_in = console.is_logged_in();
        let cooling = console.cooling_down();
        let result = match (first.to_ascii_lowercase().as_str(), args) {
            ("register", [name, password]) if !logged_in => {
                let free = self.with_world(|w| !w.nick_taken(name, ""));
                if free && password_problem(password).is_none() {
                    creds
                        .prehash(&mut prepared, password)
                        .and_then(|_| creds.prepare_recovery_code(&mut prepared))
                } else {
                    Ok(())
                }
            }
            ("login", [name, password]) if !logged_in && !cooling => {
                let stored = self.with_world(|w| w.user(name).map(|u| u.password_hash.clone()));
                if let Some(stored) = stored {
                    creds.preverify(&mut prepared, &stored, password);
                }
                Ok(())
            }
            ("password", [old, new]) if logged_in => {
                let stored = console
                    .user()
                    .and_then(|u| self.with_world(|w| w.user(u).map(|r| r.password_hash.clone())));
                match stored {
                    Some(stored)
                        if creds.preverify(&mut prepared, &stored, old)
                            && password_problem(new).is_none() =>
                    {
                        creds.prehash(&mut prepared, new)
                    }
                    _ => Ok(()),
                }
            }
            ("recover", [name, code, new]) if !logged_in && !cooling => {
                let stored = self.with_world(|w| w.user(name).and_then(|u| u.recovery_hash.clone()));
                match stored {
                    Some(stored)
                        if creds.preverify(&mut prepared, &stored, code)
                            && password_problem(new).is_none() =>
                    {
                        creds
                            .prehash(&mut prepared, new)
                            .and_then(|_| creds.prepare_recovery_code(&mut prepared))
                    }
                    _ => Ok(()),
                }
            }
            _ => Ok(()),
        };
        if let Err(e) = result {
            warn!("Could not prepare credentials on session {}: {}", console.id(), e);
        }
        prepared
    }

    /// Log the session's user out and forget the session.
    pub fn disconnect(&self, console: &mut Console) {
        let id = console.id();
        {
            let mut world = self.lock_world();
            let mut ctx = CommandContext::new(
                console,
                &mut world,
                &self.router,
                &self.registry,
                &self.config,
                &self.credentials,
            );
            if let Err(e) = sign_out(&mut ctx) {
                warn!("Failed to sign out session {}: {}", id, e);
            }
        }
        self.router.unregister(id);
        info!("Session {} disconnected", id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Argon2Config;
    use crate::world::UserRecord;
    use tempfile::TempDir;

    fn engine() -> (Engine, TempDir) {
        let dir = TempDir::new().expect("tempdir");
        let mut config = Config::default();
        config.world.db_path = dir.path().join("world").to_string_lossy().into_owned();
        config.security.argon2 = Some(Argon2Config {
            memory_kib: Some(64),
            time_cost: Some(1),
            parallelism: Some(1),
        });
        let engine = Engine::open(config).expect("engine");
        (engine, dir)
    }

    #[test]
    fn credential_work_is_prepared_outside_the_world_lock() {
        let (engine, _dir) = engine();
        let (mut console, _rx) = engine.connect(TransportKind::Local).expect("session");

        assert!(engine.prepare_secrets(&mut console, "say hello").is_empty());
        assert!(engine
            .prepare_secrets(&mut console, "register ann short")
            .is_empty());

        let prepared = engine.prepare_secrets(&mut console, "register ann long-enough-pw");
        assert!(!prepared.is_empty());
        assert!(engine.execute(&mut console, "register ann long-enough-pw"));

        let stored = engine.with_world(|w| w.user("ann").map(|u| u.password_hash.clone()));
        let stored = stored.expect("registered");
        let prepared = engine.prepare_secrets(&mut console, "login ann long-enough-pw");
        assert!(engine.credentials.verify_with(&prepared, &stored, "long-enough-pw"));
        assert!(engine.execute(&mut console, "login ann long-enough-pw"));

        // Logged in: login and register have nothing to prepare.
        assert!(engine
            .prepare_secrets(&mut console, "login ann long-enough-pw")
            .is_empty());
        let prepared = engine.prepare_secrets(&mut console, "password long-enough-pw newer-password");
        assert!(!prepared.is_empty());
        assert!(engine.execute(&mut console, "password long-enough-pw newer-password"));
        let user: Option<UserRecord> = engine.with_world(|w| w.get_user("ann"));
        let user = user.expect("user");
        assert!(engine.credentials.verify(&user.password_hash, "newer-password"));
    }
}
