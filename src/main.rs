//! Binary entrypoint for the meshmush CLI.
//!
//! Commands:
//! - `start [--bind <addr>]` - run the TCP world server
//! - `repl` - play on stdin/stdout as the only console
//! - `init` - create a starter `config.toml`
//! - `status [--json]` - print world statistics from the database
//! - `passwd <username>` - interactively set a user's password (argon2 hashed)
//!
//! See the library crate docs for module-level details: `meshmush::`.
use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use log::info;

use meshmush::config::Config;
use meshmush::server::credentials::password_problem;
use meshmush::server::{net, Credentials, Engine};
use meshmush::world::{Collection, UserRecord, WorldStoreBuilder};

#[derive(Parser)]
#[command(name = "meshmush")]
#[command(about = "A persistent multi-user text world server")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the world server
    Start {
        /// Listen address, overriding `server.bind`
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Play on this terminal as the only session
    Repl,
    /// Write a default configuration file
    Init,
    /// Show world statistics
    Status {
        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },
    /// Set a user's password, creating the root user's credentials on first use
    Passwd {
        username: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let pre_config = match cli.command {
        Commands::Init => None,
        _ => Config::load(&cli.config).await.ok(),
    };
    init_logging(&pre_config, cli.verbose);

    match cli.command {
        Commands::Start { bind } => {
            let config = match pre_config {
                Some(c) => c,
                None => Config::load(&cli.config).await?,
            };
            info!("Starting meshmush v{}", env!("CARGO_PKG_VERSION"));
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());
            let engine = Arc::new(Engine::open(config)?);
            net::serve(engine, &bind).await?;
        }
        Commands::Repl => {
            let config = match pre_config {
                Some(c) => c,
                None => Config::load(&cli.config).await?,
            };
            let engine = Arc::new(Engine::open(config)?);
            net::run_repl(engine).await?;
        }
        Commands::Init => {
            info!("Initializing new world configuration");
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);
        }
        Commands::Status { json } => {
            let config = match pre_config {
                Some(c) => c,
                None => Config::load(&cli.config).await?,
            };
            let store = WorldStoreBuilder::new(config.world.db_path.clone())
                .root_room_name(&config.world.root_room_name)
                .root_user(&config.world.root_user)
                .open()?;
            let rooms = store.count(Collection::Rooms);
            let items = store.count(Collection::Items);
            let users = store.count(Collection::Users);
            if json {
                let payload = serde_json::json!({
                    "world": config.world.name,
                    "database": config.world.db_path,
                    "rooms": rooms,
                    "items": items,
                    "users": users,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!("=== meshmush Status ===");
                println!("World: {}", config.world.name);
                println!("Database: {}", config.world.db_path);
                println!("Rooms: {}", rooms);
                println!("Items: {}", items);
                println!("Users: {}", users);
            }
        }
        Commands::Passwd { username } => {
            let config = match pre_config {
                Some(c) => c,
                None => Config::load(&cli.config).await?,
            };
            let store = WorldStoreBuilder::new(config.world.db_path.clone())
                .root_room_name(&config.world.root_room_name)
                .root_user(&config.world.root_user)
                .open()?;
            let name = username.to_ascii_lowercase();
            let existing: Option<UserRecord> = store.get(&name)?;
            let mut user = match existing {
                Some(u) => u,
                None if name == config.world.root_user.to_ascii_lowercase() => {
                    let mut u = UserRecord::new(&name, "");
                    u.wizard = true;
                    u
                }
                None => return Err(anyhow!("No such user: {}", username)),
            };
            println!("Setting password for '{}'.", user.name);
            let pass1 = rpassword::prompt_password("New password: ")?;
            if let Some(problem) = password_problem(&pass1) {
                println!("Error: {}", problem);
                return Ok(());
            }
            let pass2 = rpassword::prompt_password("Confirm password: ")?;
            if pass1 != pass2 {
                println!("Error: passwords do not match.");
                return Ok(());
            }
            let credentials = Credentials::from_config(&config.security);
            user.password_hash = credentials.hash(&pass1)?;
            store.upsert(&user)?;
            log::warn!(target: "security", "Password for {} set from the command line", user.name);
            println!("Password updated successfully.");
        }
    }

    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    let configured = config
        .as_ref()
        .and_then(|c| c.logging.level.parse::<log::LevelFilter>().ok())
        .unwrap_or(log::LevelFilter::Info);
    // CLI verbosity overrides config
    let base_level = match verbosity {
        0 => configured,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);
    let file = config.as_ref().and_then(|c| c.logging.file.clone());
    let security_path = config.as_ref().and_then(|c| c.logging.security_file.clone());
    let log_file = file.and_then(|path| {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .ok()
    });

    let write_mutex = log_file.map(|f| std::sync::Arc::new(std::sync::Mutex::new(f)));
    // Without a TTY (service mode) only the log file is written.
    let is_tty = atty::is(atty::Stream::Stdout);
    builder.format(move |fmt, record| {
        let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
        let line = format!("{} [{}] {}", ts, record.level(), record.args());

        if let Some(ref mutex) = write_mutex {
            if let Ok(mut guard) = mutex.lock() {
                let _ = writeln!(guard, "{}", line);
            }
        }

        if record.target() == "security" {
            if let Some(ref sec_path) = security_path {
                if let Ok(mut sf) = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(sec_path)
                {
                    let _ = writeln!(sf, "{}", line);
                }
            }
        }

        if is_tty || write_mutex.is_none() {
            writeln!(fmt, "{}", line)
        } else {
            Ok(())
        }
    });
    let _ = builder.try_init();
}
