use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Storage-layer errors.
///
/// `Duplicate` is a first-class outcome, not a failure: the ingestion
/// pipeline relies on the unique constraint on `posts.url` to skip entries
/// it has already seen, possibly via a different feed carrying the same link.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Insert hit a uniqueness constraint (row already exists)
    #[error("row already exists")]
    Duplicate,

    /// Lookup matched no rows
    #[error("not found")]
    NotFound,

    /// Migration failed
    #[error("database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Classify a sqlx error, surfacing unique-constraint conflicts as
    /// `Duplicate`. Uses the driver's own classification rather than
    /// string matching on error messages.
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.is_unique_violation() {
                return StoreError::Duplicate;
            }
        }
        StoreError::Database(err)
    }
}

// ============================================================================
// Data Structures
// ============================================================================

/// A registered account. `name` is unique system-wide.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A registered syndication source.
///
/// `last_fetched_at` is NULL until the scheduler first selects the feed;
/// it is the freshness watermark that drives round-robin polling.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Feed {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub user_id: i64,
    pub created_at: i64,
    pub updated_at: i64,
    pub last_fetched_at: Option<i64>,
}

/// Join row recording that a user follows a feed.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FeedFollow {
    pub id: i64,
    pub user_id: i64,
    pub feed_id: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A persisted, deduplicated feed entry. `url` is the uniqueness key.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub published_at: i64,
    pub feed_id: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Fields for a post insert, produced by the ingestion pipeline once an
/// item's publish date has been validated.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub published_at: i64,
    pub feed_id: i64,
}

/// Feed listing row with the owning user's name (for the `feeds` command).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FeedWithOwner {
    pub name: String,
    pub url: String,
    pub owner: String,
}
