//! # Meshmush - a persistent multi-user text world
//!
//! Meshmush is a line-oriented shared world server in the MUSH tradition.
//! Players connect over TCP (or a local console), register an account and
//! then explore, build and reshape the world together: rooms linked by
//! exits, items with ownership and special states, and chat.
//!
//! ## Features
//!
//! - **Persistent World**: Rooms, items and users stored in an embedded sled database, written through on every change.
//! - **Ownership Model**: Ordered owner lists with a primary owner, secondary co-owners and wizard bypass.
//! - **Building Commands**: Create, describe, lock, seal, relink and destroy rooms, exits and items in place.
//! - **Item States**: Duplified, glued, cursed, hidden, chance-listed, container, telekey and book items.
//! - **Security**: Argon2id password hashing, recovery codes, per-session login cooldown and a separate security log.
//! - **Async Transport**: Tokio TCP listener with one task per connection, plus a stdin/stdout console.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use meshmush::config::Config;
//! use meshmush::server::{net, Engine};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let bind = config.server.bind.clone();
//!     let engine = Arc::new(Engine::open(config)?);
//!     net::serve(engine, &bind).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`world`] - Data model, sled-backed store and the in-memory world state
//! - [`commands`] - Command registry, dispatcher, permission helpers and handlers
//! - [`server`] - Sessions, message routing, credentials and transports
//! - [`config`] - Configuration management
//! - [`validation`] - Name and text validation
//! - [`logutil`] - Log sanitising helpers and the security log target
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   Transports    │ ← TCP / console line framing
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │ Engine/Commands │ ← dispatch under one world lock
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │  World + sled   │ ← write-through persistence
//! └─────────────────┘
//! ```

pub mod commands;
pub mod config;
pub mod logutil;
pub mod server;
pub mod validation;
pub mod world;
