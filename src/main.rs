use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use trawl::commands::{self, App};
use trawl::config::Config;
use trawl::storage::Database;

/// Get the config directory path (~/.config/trawl/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("trawl"))
}

#[derive(Parser, Debug)]
#[command(name = "trawl", about = "Multi-user RSS aggregator with scheduled polling")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a user and log in as them
    Register { name: String },
    /// Switch the current user
    Login { name: String },
    /// Delete all users (and, by cascade, all feeds and posts)
    Reset,
    /// List registered users
    Users,
    /// Run the aggregation scheduler (e.g. `trawl agg 1m`)
    Agg { interval: String },
    /// Register a feed and follow it
    Addfeed { name: String, url: String },
    /// List all registered feeds
    Feeds,
    /// Follow an already-registered feed
    Follow { url: String },
    /// Stop following a feed
    Unfollow { url: String },
    /// List the feeds the current user follows
    Following,
    /// Show recent posts from followed feeds
    Browse {
        #[arg(default_value_t = 2)]
        limit: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config_dir = get_config_dir()?;
    let config_path = config_dir.join("config.json");
    let config = Config::load(&config_path).context("failed to load config")?;

    let db_path = config
        .db_path
        .clone()
        .unwrap_or_else(|| config_dir.join("trawl.db"));
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create config directory")?;
    }
    let db_path_str = db_path
        .to_str()
        .context("invalid UTF-8 in database path")?;
    let db = Database::open(db_path_str)
        .await
        .context("failed to open database")?;

    let mut app = App {
        db,
        config,
        config_path,
    };

    match cli.command {
        Command::Register { name } => commands::register(&mut app, &name).await,
        Command::Login { name } => commands::login(&mut app, &name).await,
        Command::Reset => commands::reset(&app).await,
        Command::Users => commands::users(&app).await,
        Command::Agg { interval } => commands::agg(&app, &interval).await,
        Command::Addfeed { name, url } => commands::add_feed(&app, &name, &url).await,
        Command::Feeds => commands::feeds(&app).await,
        Command::Follow { url } => commands::follow(&app, &url).await,
        Command::Unfollow { url } => commands::unfollow(&app, &url).await,
        Command::Following => commands::following(&app).await,
        Command::Browse { limit } => commands::browse(&app, limit).await,
    }
}
