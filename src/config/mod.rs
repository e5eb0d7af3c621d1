//! # Configuration Management Module
//!
//! Configuration for the meshmush server, loaded from a TOML file.
//!
//! ## Configuration Structure
//!
//! - [`WorldConfig`] - World identity, root room/user, database path and command limits
//! - [`ServerConfig`] - TCP listener, session limits and greeting
//! - [`LoggingConfig`] - Logging and debugging settings
//! - [`SecurityConfig`] - Login throttling and password hashing parameters
//!
//! ## Usage
//!
//! ```rust,no_run
//! use meshmush::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Create default configuration
//!     Config::create_default("config.toml").await?;
//!
//!     let config = Config::load("config.toml").await?;
//!     println!("World: {}", config.world.name);
//!     println!("Listening on: {}", config.server.bind);
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [world]
//! name = "meshmush"
//! root_room_name = "Limbo"
//! root_user = "world"
//! db_path = "data/world"
//! disabled_commands = ["make room"]
//!
//! [server]
//! bind = "127.0.0.1:4000"
//! ```
//!
//! Only `[world]` is required; every other section falls back to defaults.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::world::{DEFAULT_ROOT_ROOM_NAME, DEFAULT_ROOT_USER};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldConfig {
    pub name: String,
    #[serde(default = "default_root_room_name")]
    pub root_room_name: String,
    /// Sentinel wizard account that owns the root room.
    #[serde(default = "default_root_user")]
    pub root_user: String,
    #[serde(default = "default_db_path")]
    pub db_path: String,
    /// Canonical command names refused to non-wizards.
    #[serde(default)]
    pub disabled_commands: Vec<String>,
    #[serde(default = "default_max_name_length")]
    pub max_name_length: usize,
    #[serde(default = "default_max_description_length")]
    pub max_description_length: usize,
}

fn default_root_room_name() -> String {
    DEFAULT_ROOT_ROOM_NAME.to_string()
}

fn default_root_user() -> String {
    DEFAULT_ROOT_USER.to_string()
}

fn default_db_path() -> String {
    "data/world".to_string()
}

fn default_max_name_length() -> usize {
    64
}

fn default_max_description_length() -> usize {
    2048
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            name: "meshmush".to_string(),
            root_room_name: default_root_room_name(),
            root_user: default_root_user(),
            db_path: default_db_path(),
            disabled_commands: Vec::new(),
            max_name_length: default_max_name_length(),
            max_description_length: default_max_description_length(),
        }
    }
}

impl WorldConfig {
    pub fn is_disabled(&self, command: &str) -> bool {
        self.disabled_commands
            .iter()
            .any(|c| c.trim().eq_ignore_ascii_case(command))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
    /// Longer input lines are rejected before dispatch.
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,
    #[serde(default = "default_greeting")]
    pub greeting: String,
}

fn default_bind() -> String {
    "127.0.0.1:4000".to_string()
}

fn default_max_sessions() -> usize {
    64
}

fn default_max_line_length() -> usize {
    1024
}

fn default_greeting() -> String {
    "Type 'register <name> <password>' or 'login <name> <password>'. 'help' lists commands."
        .to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_sessions: default_max_sessions(),
            max_line_length: default_max_line_length(),
            greeting: default_greeting(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub security_file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
            security_file: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Argon2Config {
    #[serde(default)]
    pub memory_kib: Option<u32>,
    #[serde(default)]
    pub time_cost: Option<u32>,
    #[serde(default)]
    pub parallelism: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Per-session delay after a failed login or recovery attempt.
    #[serde(default = "default_login_cooldown_ms")]
    pub login_cooldown_ms: u64,
    #[serde(default)]
    pub argon2: Option<Argon2Config>,
}

fn default_login_cooldown_ms() -> u64 {
    1000
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            login_cooldown_ms: default_login_cooldown_ms(),
            argon2: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub world: WorldConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub security: SecurityConfig,
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            world: WorldConfig::default(),
            server: ServerConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                file: Some("meshmush.log".to_string()),
                security_file: Some("meshmush-security.log".to_string()),
            },
            security: SecurityConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [world]
            name = "Tiny"
            disabled_commands = ["Make Room"]
            "#,
        )
        .unwrap();
        assert_eq!(config.world.root_room_name, "Limbo");
        assert_eq!(config.world.root_user, "world");
        assert_eq!(config.server.bind, "127.0.0.1:4000");
        assert_eq!(config.security.login_cooldown_ms, 1000);
        assert!(config.world.is_disabled("make room"));
        assert!(!config.world.is_disabled("make item"));
    }

    #[test]
    fn missing_world_section_is_rejected() {
        let result: Result<Config, _> = toml::from_str("[server]\nbind = \"0.0.0.0:1\"\n");
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn default_config_round_trips_through_file() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let path = dir.path().join("config.toml");
        let path = path.to_str().unwrap();
        Config::create_default(path).await.unwrap();
        let loaded = Config::load(path).await.unwrap();
        assert_eq!(loaded.world.name, "meshmush");
        assert_eq!(loaded.logging.file.as_deref(), Some("meshmush.log"));
        assert_eq!(loaded.server.max_line_length, 1024);
    }
}
