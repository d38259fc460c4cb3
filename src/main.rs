//! Binary entrypoint for the mudengine CLI.
//!
//! Commands:
//! - `start` - load the world and run the telnet server until interrupted
//! - `init` - write a starter `config.toml`
//! - `status` - load the world and player store and print a summary
//!
//! See the library crate docs for module-level details: `mudengine::`.
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use mudengine::config::Config;
use mudengine::metrics;
use mudengine::server::{build_game, MudServer};
use mudengine::storage::PlayerStore;

#[derive(Parser)]
#[command(name = "mudengine")]
#[command(about = "A tick-driven multi-user dungeon server")]
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
    /// Start the game server
    Start {
        /// Override the configured bind address (e.g. 0.0.0.0:4000)
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Write a default configuration file
    Init,
    /// Show world and player store statistics
    Status {
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
}

// The world is single-owner state driven from one task; a current-thread runtime is enough.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start { bind } => {
            let mut config = Config::load(&cli.config).await?;
            init_logging(&Some(config.clone()), cli.verbose);
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            info!("Starting mudengine v{}", env!("CARGO_PKG_VERSION"));
            let server = MudServer::new(config)?;
            server.run().await?;
        }
        Commands::Init => {
            init_logging(&None, cli.verbose);
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);
        }
        Commands::Status { json } => {
            let config = Config::load(&cli.config).await?;
            init_logging(&Some(config.clone()), cli.verbose);
            show_status(&config, json)?;
        }
    }

    Ok(())
}

fn show_status(config: &Config, json: bool) -> Result<()> {
    let game = build_game(config)?;
    let store = PlayerStore::open(&config.storage.data_dir)
        .with_context(|| format!("opening player store at {}", config.storage.data_dir))?;
    let players = store.list_player_names()?;
    let world = &game.world;

    if json {
        let payload = serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "bind": config.server.bind,
            "zones": world.zone_ids().len(),
            "rooms": world.room_ids().len(),
            "monsters": world.living_ids().len(),
            "items": world.item_ids().len(),
            "stored_players": players,
            "metrics": metrics::snapshot(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    println!("mudengine v{}", env!("CARGO_PKG_VERSION"));
    println!("  bind:        {}", config.server.bind);
    println!("  tick:        {} ms", config.server.tick_millis);
    println!("  zone dir:    {}", config.world.zone_dir);
    println!("  start room:  {}", config.world.start_room);
    println!(
        "  world:       {} zones, {} rooms, {} monsters, {} items",
        world.zone_ids().len(),
        world.room_ids().len(),
        world.living_ids().len(),
        world.item_ids().len()
    );
    println!("  players:     {} stored", players.len());
    for name in &players {
        println!("    - {}", name);
    }
    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .and_then(|cfg| cfg.logging.level.parse().ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let file = config
        .as_ref()
        .and_then(|cfg| cfg.logging.file.as_ref())
        .and_then(|path| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
        });

    match file {
        Some(f) => {
            let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
            // Foreground runs also echo to the console
            let is_tty = atty::is(atty::Stream::Stdout);
            builder.format(move |fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                let line = format!("{} [{}] {}", ts, record.level(), record.args());
                if let Ok(mut guard) = write_mutex.lock() {
                    let _ = writeln!(guard, "{}", line);
                }
                if is_tty {
                    writeln!(fmt, "{}", line)
                } else {
                    Ok(())
                }
            });
        }
        None => {
            builder.format(|fmt, record| {
                writeln!(
                    fmt,
                    "{} [{}] {}",
                    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
                    record.level(),
                    record.args()
                )
            });
        }
    }
    let _ = builder.try_init();
}
