//! Tree types and repository for genmedia.

use chrono::{DateTime, Utc};

use super::DbPool;
use crate::media::sanitize_folder;
use crate::{MediaError, Result};

/// Media directory used when a tree does not configure one.
pub const DEFAULT_MEDIA_DIRECTORY: &str = "media/";

/// A genealogy tree and the location of its media files.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Tree {
    /// Unique tree ID.
    pub id: i64,
    /// Tree name.
    pub name: String,
    /// Media directory inside the data directory, always ending in `/`
    /// (empty when media lives at the data root).
    pub media_directory: String,
    /// When the tree was created (stored as UTC text by SQLite).
    pub created_at: DateTime<Utc>,
}

/// Data for creating a new tree.
#[derive(Debug, Clone)]
pub struct NewTree {
    /// Tree name.
    pub name: String,
    /// Media directory inside the data directory.
    pub media_directory: String,
}

impl NewTree {
    /// Create a new NewTree using the default media directory.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            media_directory: DEFAULT_MEDIA_DIRECTORY.to_string(),
        }
    }

    /// Set the media directory.
    pub fn with_media_directory(mut self, media_directory: impl Into<String>) -> Self {
        self.media_directory = media_directory.into();
        self
    }
}

/// Repository for tree operations.
pub struct TreeRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> TreeRepository<'a> {
    /// Create a new TreeRepository with the given database pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a new tree.
    ///
    /// The media directory is normalized to a safe folder ending in `/`.
    pub async fn create(&self, tree: &NewTree) -> Result<Tree> {
        let media_directory = sanitize_folder(&tree.media_directory).as_folder();

        let result = sqlx::query("INSERT INTO trees (name, media_directory) VALUES (?, ?)")
            .bind(&tree.name)
            .bind(&media_directory)
            .execute(self.pool)
            .await?;

        let id = result.last_insert_rowid();
        self.get_by_id(id)
            .await?
            .ok_or_else(|| MediaError::NotFound("tree".to_string()))
    }

    /// Get a tree by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Tree>> {
        let tree = sqlx::query_as::<_, Tree>(
            "SELECT id, name, media_directory, created_at FROM trees WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(tree)
    }

    /// Get a tree by name.
    pub async fn get_by_name(&self, name: &str) -> Result<Option<Tree>> {
        let tree = sqlx::query_as::<_, Tree>(
            "SELECT id, name, media_directory, created_at FROM trees WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(self.pool)
        .await?;

        Ok(tree)
    }

    /// List all trees ordered by ID.
    pub async fn list(&self) -> Result<Vec<Tree>> {
        let trees = sqlx::query_as::<_, Tree>(
            "SELECT id, name, media_directory, created_at FROM trees ORDER BY id",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(trees)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    async fn setup_db() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn test_create_tree_with_default_media_directory() {
        let db = setup_db().await;
        let repo = TreeRepository::new(db.pool());

        let tree = repo.create(&NewTree::new("royals")).await.unwrap();

        assert_eq!(tree.name, "royals");
        assert_eq!(tree.media_directory, "media/");

        let age = Utc::now() - tree.created_at;
        assert!(age < chrono::Duration::minutes(5));
    }

    #[tokio::test]
    async fn test_create_normalizes_media_directory() {
        let db = setup_db().await;
        let repo = TreeRepository::new(db.pool());

        let tree = repo
            .create(&NewTree::new("smith").with_media_directory("\\smith\\media"))
            .await
            .unwrap();
        assert_eq!(tree.media_directory, "smith/media/");

        let tree = repo
            .create(&NewTree::new("escape").with_media_directory("../../etc"))
            .await
            .unwrap();
        assert_eq!(tree.media_directory, "");
    }

    #[tokio::test]
    async fn test_get_by_id_and_name() {
        let db = setup_db().await;
        let repo = TreeRepository::new(db.pool());

        let created = repo.create(&NewTree::new("jones")).await.unwrap();

        let by_id = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(by_id.name, "jones");

        let by_name = repo.get_by_name("jones").await.unwrap().unwrap();
        assert_eq!(by_name.id, created.id);

        assert!(repo.get_by_id(9999).await.unwrap().is_none());
        assert!(repo.get_by_name("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected() {
        let db = setup_db().await;
        let repo = TreeRepository::new(db.pool());

        repo.create(&NewTree::new("dup")).await.unwrap();
        let result = repo.create(&NewTree::new("dup")).await;

        assert!(matches!(result, Err(MediaError::Database(_))));
    }

    #[tokio::test]
    async fn test_list_trees() {
        let db = setup_db().await;
        let repo = TreeRepository::new(db.pool());

        repo.create(&NewTree::new("first")).await.unwrap();
        repo.create(&NewTree::new("second")).await.unwrap();

        let trees = repo.list().await.unwrap();
        assert_eq!(trees.len(), 2);
        assert_eq!(trees[0].name, "first");
        assert_eq!(trees[1].name, "second");
    }
}
