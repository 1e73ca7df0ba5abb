//! Feed aggregation: the scheduler and its per-tick ingestion cycle.
//!
//! One cycle: pick the least-recently-polled feed, advance its watermark,
//! fetch and decode it, then insert each entry — silently skipping URLs a
//! previous cycle already ingested. The scheduler drives cycles strictly
//! serially, forever; a bad feed costs one cycle, never the process.

use std::time::Duration;
use thiserror::Error;
use tokio::time::MissedTickBehavior;

use crate::feed::{fetch_feed, FetchError};
use crate::storage::{Database, NewPost, StoreError};

// ============================================================================
// Error Types
// ============================================================================

/// Why an ingestion cycle produced nothing further.
///
/// All variants are caught at the scheduler boundary, logged, and dropped;
/// none of them is ever fatal.
#[derive(Debug, Error)]
pub enum CycleError {
    /// Network retrieval or payload decode failed
    #[error("fetching {feed}: {source}")]
    Fetch {
        feed: String,
        source: FetchError,
    },
    /// An item's publish date did not match the expected format.
    /// Aborts the whole cycle: a feed with one malformed date is treated
    /// like a malformed feed, not patched around item by item.
    #[error("bad publish date {value:?} in {feed}: {source}")]
    DateParse {
        feed: String,
        value: String,
        source: chrono::ParseError,
    },
    /// Persistence failed for a reason other than the expected
    /// duplicate-URL conflict
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Bad `--agg` interval string. Fatal at startup, before the scheduler
/// ever runs.
#[derive(Debug, Error)]
#[error("invalid interval {0:?}: expected forms like \"30s\", \"1m\", \"1h30m\"")]
pub struct IntervalParseError(String);

// ============================================================================
// One Cycle
// ============================================================================

/// What a successful cycle did.
#[derive(Debug, Default)]
pub struct CycleSummary {
    /// URL of the feed this cycle polled; `None` when the store was empty
    pub feed_url: Option<String>,
    /// Newly ingested posts
    pub inserted: usize,
    /// Items skipped because their URL was already ingested
    pub duplicates: usize,
}

/// Run one select-fetch-ingest pass over exactly one feed.
///
/// The watermark is advanced *before* the network call, so a feed whose
/// fetch fails rotates to the back of the queue instead of being retried
/// ahead of healthy feeds. An empty feed table is a no-op, not an error.
pub async fn run_cycle(
    db: &Database,
    client: &reqwest::Client,
) -> Result<CycleSummary, CycleError> {
    let Some(feed) = db.next_feed_to_fetch().await? else {
        tracing::info!("no feeds registered, nothing to collect");
        return Ok(CycleSummary::default());
    };

    db.mark_feed_fetched(feed.id).await?;

    tracing::debug!(feed = %feed.url, "collecting feed");
    let parsed = fetch_feed(client, &feed.url)
        .await
        .map_err(|source| CycleError::Fetch {
            feed: feed.url.clone(),
            source,
        })?;

    // Validate every publish date before inserting anything: one malformed
    // item must not leave a partially ingested cycle behind.
    let mut pending = Vec::with_capacity(parsed.items.len());
    for item in parsed.items {
        let published_at =
            parse_published(&item.pub_date).map_err(|source| CycleError::DateParse {
                feed: feed.url.clone(),
                value: item.pub_date.clone(),
                source,
            })?;
        pending.push(NewPost {
            title: item.title,
            url: item.link,
            description: item.description,
            published_at,
            feed_id: feed.id,
        });
    }

    let mut inserted = 0;
    let mut duplicates = 0;
    for post in pending {
        match db.insert_post(&post).await {
            Ok(saved) => {
                inserted += 1;
                tracing::info!(feed = %feed.url, title = %saved.title, url = %saved.url, "ingested post");
            }
            // Expected steady state: this link was ingested by an earlier
            // cycle, possibly via a different feed.
            Err(StoreError::Duplicate) => {
                duplicates += 1;
                tracing::debug!(url = %post.url, "already ingested, skipping");
            }
            Err(e) => return Err(CycleError::Store(e)),
        }
    }

    Ok(CycleSummary {
        feed_url: Some(feed.url),
        inserted,
        duplicates,
    })
}

/// Parse an item's publish date with the fixed expected format (RFC 2822,
/// e.g. `Mon, 02 Jan 2006 15:04:05 -0700`).
fn parse_published(value: &str) -> Result<i64, chrono::ParseError> {
    chrono::DateTime::parse_from_rfc2822(value).map(|dt| dt.timestamp())
}

// ============================================================================
// Scheduler
// ============================================================================

/// Drive ingestion cycles at a fixed interval, forever.
///
/// Cycles never overlap: each tick awaits its cycle to completion, and a
/// long cycle simply delays the next tick (`MissedTickBehavior::Delay`, no
/// catch-up bursts). The first cycle fires immediately. Cycle errors are
/// logged and swallowed; the only way out of this loop is process exit.
pub async fn run(db: &Database, client: &reqwest::Client, every: Duration) {
    tracing::info!(interval_secs = every.as_secs_f64(), "collecting feeds");

    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        match run_cycle(db, client).await {
            Ok(summary) => {
                if let Some(feed) = summary.feed_url {
                    tracing::info!(
                        feed = %feed,
                        inserted = summary.inserted,
                        duplicates = summary.duplicates,
                        "cycle complete"
                    );
                }
            }
            Err(e) => tracing::error!(error = %e, "cycle failed"),
        }
    }
}

/// Parse a human-entered polling interval such as `"30s"`, `"1m"` or
/// `"1h30m"`. Compound values sum; the result must be positive.
pub fn parse_interval(input: &str) -> Result<Duration, IntervalParseError> {
    let err = || IntervalParseError(input.to_string());
    let mut rest = input.trim();
    if rest.is_empty() {
        return Err(err());
    }

    let mut total = Duration::ZERO;
    while !rest.is_empty() {
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(err)?; // trailing number without a unit
        if digits_end == 0 {
            return Err(err());
        }
        let value: u64 = rest[..digits_end].parse().map_err(|_| err())?;
        rest = &rest[digits_end..];

        let (unit_len, span) = if rest.starts_with("ms") {
            (2, Duration::from_millis(value))
        } else if rest.starts_with('s') {
            (1, Duration::from_secs(value))
        } else if rest.starts_with('m') {
            (1, Duration::from_secs(value * 60))
        } else if rest.starts_with('h') {
            (1, Duration::from_secs(value * 3600))
        } else {
            return Err(err());
        };
        total += span;
        rest = &rest[unit_len..];
    }

    if total.is_zero() {
        return Err(err());
    }
    Ok(total)
}
