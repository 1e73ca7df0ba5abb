//! Command handlers: the thin CRUD surface around the aggregator core.
//!
//! Every handler receives an explicit [`App`] context (database handle +
//! loaded config) rather than reaching for globals. Store errors surface
//! as recoverable command errors; only the aggregator's interval parse is
//! fatal, and only before the scheduler starts.

use anyhow::{bail, Context, Result};
use std::path::PathBuf;

use crate::aggregator;
use crate::config::Config;
use crate::feed::build_client;
use crate::storage::{Database, StoreError, User};

/// Everything a command handler needs: the open database, the loaded
/// config, and where to write the config back.
pub struct App {
    pub db: Database,
    pub config: Config,
    pub config_path: PathBuf,
}

impl App {
    /// Resolve the logged-in user, or fail with a hint.
    async fn require_user(&self) -> Result<User> {
        let name = self
            .config
            .current_user
            .as_deref()
            .context("no user is logged in; run `trawl login <name>` first")?;
        self.db
            .get_user_by_name(name)
            .await
            .with_context(|| format!("current user {:?} no longer exists", name))
    }

    fn set_current_user(&mut self, name: &str) -> Result<()> {
        self.config.current_user = Some(name.to_string());
        self.config
            .save(&self.config_path)
            .context("failed to save config")?;
        Ok(())
    }
}

pub async fn register(app: &mut App, name: &str) -> Result<()> {
    let user = match app.db.create_user(name).await {
        Ok(user) => user,
        Err(StoreError::Duplicate) => bail!("user {:?} already exists", name),
        Err(e) => return Err(e).context("failed to create user"),
    };

    app.set_current_user(&user.name)?;
    println!("User has been created: {}", user.name);
    Ok(())
}

pub async fn login(app: &mut App, name: &str) -> Result<()> {
    let user = match app.db.get_user_by_name(name).await {
        Ok(user) => user,
        Err(StoreError::NotFound) => bail!("unknown user {:?}; run `trawl register {}`", name, name),
        Err(e) => return Err(e).context("failed to look up user"),
    };

    app.set_current_user(&user.name)?;
    println!("User has been set: {}", user.name);
    Ok(())
}

pub async fn reset(app: &App) -> Result<()> {
    app.db.reset_users().await.context("failed to reset users")?;
    println!("User table has been reset");
    Ok(())
}

pub async fn users(app: &App) -> Result<()> {
    let users = app.db.list_users().await.context("failed to list users")?;
    for user in users {
        if app.config.current_user.as_deref() == Some(user.name.as_str()) {
            println!("* {} (current)", user.name);
        } else {
            println!("* {}", user.name);
        }
    }
    Ok(())
}

/// Register a feed and immediately follow it.
pub async fn add_feed(app: &App, name: &str, url: &str) -> Result<()> {
    let user = app.require_user().await?;

    let feed = match app.db.create_feed(name, url, user.id).await {
        Ok(feed) => feed,
        Err(StoreError::Duplicate) => bail!("a feed with URL {:?} is already registered", url),
        Err(e) => return Err(e).context("failed to add feed"),
    };
    println!("Feed has been added: {}", feed.name);

    app.db
        .create_follow(user.id, feed.id)
        .await
        .context("failed to follow new feed")?;
    println!("User {} is now following feed '{}'", user.name, feed.name);
    Ok(())
}

pub async fn feeds(app: &App) -> Result<()> {
    let feeds = app
        .db
        .list_feeds_with_owners()
        .await
        .context("failed to list feeds")?;
    for feed in feeds {
        println!("[{}] '{}' at {}", feed.owner, feed.name, feed.url);
    }
    Ok(())
}

pub async fn follow(app: &App, url: &str) -> Result<()> {
    let user = app.require_user().await?;
    let feed = match app.db.get_feed_by_url(url).await {
        Ok(feed) => feed,
        Err(StoreError::NotFound) => bail!("no registered feed with URL {:?}", url),
        Err(e) => return Err(e).context("failed to look up feed"),
    };

    match app.db.create_follow(user.id, feed.id).await {
        Ok(_) => {
            println!("User {} is now following feed '{}'", user.name, feed.name);
            Ok(())
        }
        Err(StoreError::Duplicate) => bail!("already following '{}'", feed.name),
        Err(e) => Err(e).context("failed to follow feed"),
    }
}

pub async fn following(app: &App) -> Result<()> {
    let user = app.require_user().await?;
    let names = app
        .db
        .follows_for_user(user.id)
        .await
        .context("failed to list follows")?;
    for name in names {
        println!("Following '{}'", name);
    }
    Ok(())
}

pub async fn unfollow(app: &App, url: &str) -> Result<()> {
    let user = app.require_user().await?;
    match app.db.delete_follow(user.id, url).await {
        Ok(()) => {
            println!("Feed {} was unfollowed", url);
            Ok(())
        }
        Err(StoreError::NotFound) => bail!("not following any feed with URL {:?}", url),
        Err(e) => Err(e).context("failed to unfollow feed"),
    }
}

pub async fn browse(app: &App, limit: i64) -> Result<()> {
    let user = app.require_user().await?;
    let posts = app
        .db
        .posts_for_user(user.id, limit)
        .await
        .context("failed to load posts")?;

    for post in posts {
        let published = chrono::DateTime::from_timestamp(post.published_at, 0)
            .map(|dt| dt.to_rfc2822())
            .unwrap_or_else(|| post.published_at.to_string());
        println!("Published at {}", published);
        println!("Post '{}' <{}>", post.title, post.url);
        if let Some(description) = &post.description {
            println!("Description: {}", description);
        }
    }
    Ok(())
}

/// Start the aggregation scheduler. Never returns under normal operation.
///
/// An unparsable interval is a startup error: the process exits nonzero
/// before the first cycle runs.
pub async fn agg(app: &App, interval: &str) -> Result<()> {
    let every = aggregator::parse_interval(interval)?;
    let client = build_client().context("failed to build HTTP client")?;

    aggregator::run(&app.db, &client, every).await;
    unreachable!("aggregator loop only ends with the process");
}
