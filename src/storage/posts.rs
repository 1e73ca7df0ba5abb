use super::schema::{now_ts, Database};
use super::types::{NewPost, Post, StoreError};

impl Database {
    // ========================================================================
    // Post Operations
    // ========================================================================

    /// Insert one post.
    ///
    /// A conflict on the `posts.url` unique constraint comes back as
    /// `StoreError::Duplicate` — the caller's signal that the entry was
    /// already ingested by an earlier cycle (possibly via a different feed
    /// carrying the same link). Every other failure is a real store error.
    pub async fn insert_post(&self, post: &NewPost) -> Result<Post, StoreError> {
        let now = now_ts();
        let inserted = sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (title, url, description, published_at, feed_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING id, title, url, description, published_at, feed_id, created_at, updated_at
        "#,
        )
        .bind(&post.title)
        .bind(&post.url)
        .bind(&post.description)
        .bind(post.published_at)
        .bind(post.feed_id)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;

        Ok(inserted)
    }

    /// Posts from the feeds a user follows, newest published first.
    pub async fn posts_for_user(&self, user_id: i64, limit: i64) -> Result<Vec<Post>, StoreError> {
        let posts = sqlx::query_as::<_, Post>(
            r#"
            SELECT p.id, p.title, p.url, p.description, p.published_at,
                   p.feed_id, p.created_at, p.updated_at
            FROM posts p
            JOIN feed_follows ff ON ff.feed_id = p.feed_id
            WHERE ff.user_id = ?
            ORDER BY p.published_at DESC
            LIMIT ?
        "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(posts)
    }

    /// Total post count (test and diagnostic helper).
    pub async fn count_posts(&self) -> Result<i64, StoreError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM posts")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::{Database, NewPost, StoreError};

    async fn test_db() -> Database {
        Database::open(":memory:").await.unwrap()
    }

    async fn seed_feed(db: &Database) -> i64 {
        let user = db.create_user("alice").await.unwrap();
        db.create_feed("Example", "https://example.com/rss", user.id)
            .await
            .unwrap()
            .id
    }

    fn test_post(feed_id: i64, url: &str) -> NewPost {
        NewPost {
            title: "A post".to_string(),
            url: url.to_string(),
            description: Some("summary".to_string()),
            published_at: 1700000000,
            feed_id,
        }
    }

    #[tokio::test]
    async fn test_insert_post() {
        let db = test_db().await;
        let feed_id = seed_feed(&db).await;

        let post = db
            .insert_post(&test_post(feed_id, "https://example.com/p/1"))
            .await
            .unwrap();
        assert!(post.id > 0);
        assert_eq!(post.url, "https://example.com/p/1");
        assert_eq!(db.count_posts().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_url_is_distinguishable() {
        let db = test_db().await;
        let feed_id = seed_feed(&db).await;

        db.insert_post(&test_post(feed_id, "https://example.com/p/1"))
            .await
            .unwrap();

        match db
            .insert_post(&test_post(feed_id, "https://example.com/p/1"))
            .await
        {
            Err(StoreError::Duplicate) => {}
            other => panic!("expected Duplicate, got {:?}", other.map(|p| p.id)),
        }
        assert_eq!(db.count_posts().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_across_feeds() {
        let db = test_db().await;
        let user = db.create_user("alice").await.unwrap();
        let a = db
            .create_feed("A", "https://a.example.com/rss", user.id)
            .await
            .unwrap();
        let b = db
            .create_feed("B", "https://b.example.com/rss", user.id)
            .await
            .unwrap();

        // Same link syndicated by two feeds: one row system-wide
        db.insert_post(&test_post(a.id, "https://example.com/shared"))
            .await
            .unwrap();
        assert!(matches!(
            db.insert_post(&test_post(b.id, "https://example.com/shared"))
                .await,
            Err(StoreError::Duplicate)
        ));
    }

    #[tokio::test]
    async fn test_posts_for_user_respects_follows_and_limit() {
        let db = test_db().await;
        let alice = db.create_user("alice").await.unwrap();
        let bob = db.create_user("bob").await.unwrap();
        let followed = db
            .create_feed("Followed", "https://a.example.com/rss", alice.id)
            .await
            .unwrap();
        let other = db
            .create_feed("Other", "https://b.example.com/rss", alice.id)
            .await
            .unwrap();
        db.create_follow(alice.id, followed.id).await.unwrap();

        for i in 0..3 {
            let mut post = test_post(followed.id, &format!("https://a.example.com/p/{}", i));
            post.published_at = 1700000000 + i;
            db.insert_post(&post).await.unwrap();
        }
        db.insert_post(&test_post(other.id, "https://b.example.com/p/0"))
            .await
            .unwrap();

        let posts = db.posts_for_user(alice.id, 2).await.unwrap();
        assert_eq!(posts.len(), 2);
        // Newest published first, only from followed feeds
        assert_eq!(posts[0].url, "https://a.example.com/p/2");
        assert_eq!(posts[1].url, "https://a.example.com/p/1");

        assert!(db.posts_for_user(bob.id, 10).await.unwrap().is_empty());
    }
}
