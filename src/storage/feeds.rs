use super::schema::{now_ts, Database};
use super::types::{Feed, FeedWithOwner, StoreError};

impl Database {
    // ========================================================================
    // Feed Operations
    // ========================================================================

    /// Register a feed. `url` is unique; re-adding an existing URL returns
    /// `StoreError::Duplicate`.
    pub async fn create_feed(
        &self,
        name: &str,
        url: &str,
        user_id: i64,
    ) -> Result<Feed, StoreError> {
        let now = now_ts();
        let feed = sqlx::query_as::<_, Feed>(
            r#"
            INSERT INTO feeds (name, url, user_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id, name, url, user_id, created_at, updated_at, last_fetched_at
        "#,
        )
        .bind(name)
        .bind(url)
        .bind(user_id)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;

        Ok(feed)
    }

    /// Look up a feed by its source URL.
    pub async fn get_feed_by_url(&self, url: &str) -> Result<Feed, StoreError> {
        sqlx::query_as::<_, Feed>(
            r#"
            SELECT id, name, url, user_id, created_at, updated_at, last_fetched_at
            FROM feeds WHERE url = ?
        "#,
        )
        .bind(url)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)
    }

    /// All registered feeds with the name of the user who added them.
    pub async fn list_feeds_with_owners(&self) -> Result<Vec<FeedWithOwner>, StoreError> {
        let feeds = sqlx::query_as::<_, FeedWithOwner>(
            r#"
            SELECT f.name AS name, f.url AS url, u.name AS owner
            FROM feeds f
            JOIN users u ON u.id = f.user_id
            ORDER BY f.id
        "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(feeds)
    }

    /// The feed whose turn it is: oldest `last_fetched_at`, with
    /// never-fetched feeds (NULL watermark) first and ties broken by id.
    /// Returns `None` when no feeds are registered.
    ///
    /// Repeatedly selecting and marking realizes round-robin coverage of
    /// every feed over time.
    pub async fn next_feed_to_fetch(&self) -> Result<Option<Feed>, StoreError> {
        let feed = sqlx::query_as::<_, Feed>(
            r#"
            SELECT id, name, url, user_id, created_at, updated_at, last_fetched_at
            FROM feeds
            ORDER BY last_fetched_at IS NOT NULL, last_fetched_at ASC, id ASC
            LIMIT 1
        "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(feed)
    }

    /// Advance a feed's freshness watermark to now.
    ///
    /// The pipeline calls this before the network fetch, so a feed whose
    /// fetch fails still rotates to the back of the queue.
    /// `NotFound` when no feed has the given id.
    pub async fn mark_feed_fetched(&self, feed_id: i64) -> Result<(), StoreError> {
        let now = now_ts();
        let result = sqlx::query("UPDATE feeds SET last_fetched_at = ?, updated_at = ? WHERE id = ?")
            .bind(now)
            .bind(now)
            .bind(feed_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::{Database, StoreError};

    async fn test_db() -> Database {
        Database::open(":memory:").await.unwrap()
    }

    async fn seed_user(db: &Database) -> i64 {
        db.create_user("alice").await.unwrap().id
    }

    #[tokio::test]
    async fn test_create_and_get_feed() {
        let db = test_db().await;
        let user_id = seed_user(&db).await;

        let feed = db
            .create_feed("Example", "https://example.com/rss", user_id)
            .await
            .unwrap();
        assert!(feed.last_fetched_at.is_none());

        let fetched = db.get_feed_by_url("https://example.com/rss").await.unwrap();
        assert_eq!(fetched.id, feed.id);
        assert_eq!(fetched.name, "Example");
    }

    #[tokio::test]
    async fn test_duplicate_url_rejected() {
        let db = test_db().await;
        let user_id = seed_user(&db).await;
        db.create_feed("A", "https://example.com/rss", user_id)
            .await
            .unwrap();

        assert!(matches!(
            db.create_feed("B", "https://example.com/rss", user_id).await,
            Err(StoreError::Duplicate)
        ));
    }

    #[tokio::test]
    async fn test_next_feed_empty_store() {
        let db = test_db().await;
        assert!(db.next_feed_to_fetch().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_next_feed_prefers_never_fetched() {
        let db = test_db().await;
        let user_id = seed_user(&db).await;
        let a = db
            .create_feed("A", "https://a.example.com/rss", user_id)
            .await
            .unwrap();
        let b = db
            .create_feed("B", "https://b.example.com/rss", user_id)
            .await
            .unwrap();

        // Mark A fetched; B (never fetched) must come first
        db.mark_feed_fetched(a.id).await.unwrap();
        let next = db.next_feed_to_fetch().await.unwrap().unwrap();
        assert_eq!(next.id, b.id);
    }

    #[tokio::test]
    async fn test_next_feed_tie_break_by_id() {
        let db = test_db().await;
        let user_id = seed_user(&db).await;
        let a = db
            .create_feed("A", "https://a.example.com/rss", user_id)
            .await
            .unwrap();
        db.create_feed("B", "https://b.example.com/rss", user_id)
            .await
            .unwrap();

        // Both NULL: lowest id wins, deterministically
        let next = db.next_feed_to_fetch().await.unwrap().unwrap();
        assert_eq!(next.id, a.id);
        let again = db.next_feed_to_fetch().await.unwrap().unwrap();
        assert_eq!(again.id, a.id);
    }

    #[tokio::test]
    async fn test_round_robin_rotation() {
        let db = test_db().await;
        let user_id = seed_user(&db).await;
        let mut ids = Vec::new();
        for i in 0..3 {
            let feed = db
                .create_feed(
                    &format!("Feed {}", i),
                    &format!("https://feed{}.example.com/rss", i),
                    user_id,
                )
                .await
                .unwrap();
            ids.push(feed.id);
        }

        // Selecting and marking three times visits each feed exactly once
        let mut visited = Vec::new();
        for _ in 0..3 {
            let feed = db.next_feed_to_fetch().await.unwrap().unwrap();
            db.mark_feed_fetched(feed.id).await.unwrap();
            visited.push(feed.id);
        }
        let mut sorted = visited.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, ids);
    }

    #[tokio::test]
    async fn test_mark_fetched_sets_watermark() {
        let db = test_db().await;
        let user_id = seed_user(&db).await;
        let feed = db
            .create_feed("A", "https://a.example.com/rss", user_id)
            .await
            .unwrap();

        db.mark_feed_fetched(feed.id).await.unwrap();

        let marked = db.get_feed_by_url("https://a.example.com/rss").await.unwrap();
        assert!(marked.last_fetched_at.is_some());
        assert!(marked.updated_at >= feed.updated_at);
    }

    #[tokio::test]
    async fn test_mark_fetched_unknown_feed() {
        let db = test_db().await;
        assert!(matches!(
            db.mark_feed_fetched(42).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_list_feeds_with_owners() {
        let db = test_db().await;
        let user_id = seed_user(&db).await;
        db.create_feed("Example", "https://example.com/rss", user_id)
            .await
            .unwrap();

        let feeds = db.list_feeds_with_owners().await.unwrap();
        assert_eq!(feeds.len(), 1);
        assert_eq!(feeds[0].owner, "alice");
        assert_eq!(feeds[0].url, "https://example.com/rss");
    }
}
