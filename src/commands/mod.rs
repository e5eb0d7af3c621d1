//! Command layer: registry, dispatcher, shared permission/resolution helpers
//! and the handler catalog.
//!
//! A handler receives a [`CommandContext`] holding the caller's console and
//! the locked world, so everything it resolves, mutates and upserts happens
//! under one world lock.

pub mod dispatch;
pub mod handlers;
pub mod helpers;
pub mod registry;
pub mod resolver;

pub use dispatch::dispatch;
pub use registry::{Category, CommandSpec, Handler, Registry};

use crate::config::Config;
use crate::server::credentials::PreparedSecrets;
use crate::server::{Console, Credentials, Router};
use crate::world::{RoomId, UserRecord, World, WorldError};

pub const INTERNAL_ERROR: &str = "An internal error occurred.";

pub struct CommandContext<'a> {
    pub console: &'a mut Console,
    pub world: &'a mut World,
    pub router: &'a Router,
    pub registry: &'a Registry,
    pub config: &'a Config,
    pub credentials: &'a Credentials,
    /// Hashing done before the world lock was taken.
    pub prepared: PreparedSecrets,
    /// The command being executed, once dispatch has matched one.
    pub command: Option<&'a CommandSpec>,
}

impl<'a> CommandContext<'a> {
    pub fn new(
        console: &'a mut Console,
        world: &'a mut World,
        router: &'a Router,
        registry: &'a Registry,
        config: &'a Config,
        credentials: &'a Credentials,
    ) -> Self {
        Self {
            console,
            world,
            router,
            registry,
            config,
            credentials,
            prepared: PreparedSecrets::default(),
            command: None,
        }
    }

    pub fn with_prepared(mut self, prepared: PreparedSecrets) -> Self {
        self.prepared = prepared;
        self
    }

    pub fn send(&self, text: impl Into<String>) {
        self.console.send(text);
    }

    /// Print the usage line of the running command.
    pub fn usage(&self) {
        match self.command {
            Some(spec) => self.send(format!("Usage: {}", spec.usage)),
            None => self.send("Invalid arguments."),
        }
    }

    pub fn command_name(&self) -> &'static str {
        self.command.map(|c| c.name).unwrap_or("<none>")
    }

    pub fn actor_name(&self) -> Option<String> {
        self.console.user().map(str::to_string)
    }

    /// Fresh copy of the acting user's record.
    pub fn actor(&self) -> Option<UserRecord> {
        self.console.user().and_then(|u| self.world.get_user(u))
    }

    pub fn is_wizard(&self) -> bool {
        self.console
            .user()
            .and_then(|u| self.world.user(u))
            .map(|u| u.wizard)
            .unwrap_or(false)
    }

    pub fn hash_secret(&self, secret: &str) -> Result<String, WorldError> {
        self.credentials.hash_with(&self.prepared, secret)
    }

    pub fn verify_secret(&self, stored: &str, secret: &str) -> bool {
        self.credentials.verify_with(&self.prepared, stored, secret)
    }

    /// A new recovery code and its hash.
    pub fn new_recovery_code(&mut self) -> Result<(String, String), WorldError> {
        self.credentials.recovery_code_with(&mut self.prepared)
    }

    pub fn broadcast_room(&self, room: RoomId, text: &str, exclude: Option<&str>) -> usize {
        self.router.broadcast_room(&*self.world, room, text, exclude)
    }

    pub fn tell_user(&self, user: &str, text: &str) -> bool {
        self.router.deliver_to_user(user, text)
    }
}
