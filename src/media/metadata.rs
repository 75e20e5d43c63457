//! Media file references and the metadata store seam.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::QueryBuilder;

use crate::db::DbPool;
use crate::{MediaError, Result};

/// Read access to the recorded media references.
///
/// References are stored relative to their tree's media directory; remote
/// media is recorded as a full URL.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// References recorded for one tree, skipping any that start with one of
    /// `exclude_prefixes`. Sorted.
    async fn select_paths(&self, tree_id: i64, exclude_prefixes: &[&str]) -> Result<Vec<String>>;

    /// References of every tree, each prefixed with its tree's media
    /// directory, skipping any whose reference starts with one of
    /// `exclude_prefixes`. Sorted.
    async fn select_rooted_paths(&self, exclude_prefixes: &[&str]) -> Result<Vec<String>>;

    /// Distinct media directories of all trees. Sorted.
    async fn media_roots(&self) -> Result<Vec<String>>;
}

/// A media file reference recorded for a tree.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MediaFile {
    /// Unique ID.
    pub id: i64,
    /// Tree this reference belongs to.
    pub tree_id: i64,
    /// Path relative to the tree's media directory, or a URL.
    pub file_ref: String,
    /// Format (e.g. "jpeg").
    pub format: String,
    /// Source media type (e.g. "photo").
    pub media_type: String,
    /// Descriptive title.
    pub title: String,
    /// When the reference was recorded.
    pub created_at: DateTime<Utc>,
}

/// Data for recording a new media file reference.
#[derive(Debug, Clone)]
pub struct NewMediaFile {
    /// Tree this reference belongs to.
    pub tree_id: i64,
    /// Path returned by the ingester.
    pub file_ref: String,
    /// Format.
    pub format: String,
    /// Source media type.
    pub media_type: String,
    /// Descriptive title.
    pub title: String,
}

impl NewMediaFile {
    /// Create a new NewMediaFile.
    pub fn new(tree_id: i64, file_ref: impl Into<String>) -> Self {
        Self {
            tree_id,
            file_ref: file_ref.into(),
            format: String::new(),
            media_type: String::new(),
            title: String::new(),
        }
    }

    /// Set the format.
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    /// Set the source media type.
    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = media_type.into();
        self
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}

/// Escape `%`, `_` and `\` for a LIKE pattern using `ESCAPE '\'`.
fn like_prefix(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Repository for media file references.
pub struct MediaFileRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> MediaFileRepository<'a> {
    /// Create a new MediaFileRepository with the given database pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Record a new media file reference.
    pub async fn create(&self, file: &NewMediaFile) -> Result<MediaFile> {
        let result = sqlx::query(
            "INSERT INTO media_files (tree_id, file_ref, format, media_type, title)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(file.tree_id)
        .bind(&file.file_ref)
        .bind(&file.format)
        .bind(&file.media_type)
        .bind(&file.title)
        .execute(self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.get_by_id(id)
            .await?
            .ok_or_else(|| MediaError::NotFound("media file".to_string()))
    }

    /// Get a media file reference by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<MediaFile>> {
        let file = sqlx::query_as::<_, MediaFile>(
            "SELECT id, tree_id, file_ref, format, media_type, title, created_at
             FROM media_files WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(file)
    }

    /// List the references of a tree.
    pub async fn list_by_tree(&self, tree_id: i64) -> Result<Vec<MediaFile>> {
        let files = sqlx::query_as::<_, MediaFile>(
            "SELECT id, tree_id, file_ref, format, media_type, title, created_at
             FROM media_files WHERE tree_id = ? ORDER BY file_ref, id",
        )
        .bind(tree_id)
        .fetch_all(self.pool)
        .await?;

        Ok(files)
    }

    /// Delete a media file reference by ID.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM media_files WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl<'a> MetadataStore for MediaFileRepository<'a> {
    async fn select_paths(&self, tree_id: i64, exclude_prefixes: &[&str]) -> Result<Vec<String>> {
        let mut query: QueryBuilder<sqlx::Sqlite> =
            QueryBuilder::new("SELECT file_ref FROM media_files WHERE tree_id = ");
        query.push_bind(tree_id);

        for prefix in exclude_prefixes {
            query.push(" AND file_ref NOT LIKE ");
            query.push_bind(like_prefix(prefix));
            query.push(" ESCAPE '\\'");
        }
        query.push(" ORDER BY file_ref");

        let paths = query
            .build_query_scalar::<String>()
            .fetch_all(self.pool)
            .await?;

        Ok(paths)
    }

    async fn select_rooted_paths(&self, exclude_prefixes: &[&str]) -> Result<Vec<String>> {
        let mut query: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new(
            "SELECT t.media_directory || m.file_ref AS path
             FROM media_files m JOIN trees t ON t.id = m.tree_id WHERE 1 = 1",
        );

        for prefix in exclude_prefixes {
            query.push(" AND m.file_ref NOT LIKE ");
            query.push_bind(like_prefix(prefix));
            query.push(" ESCAPE '\\'");
        }
        query.push(" ORDER BY path");

        let paths = query
            .build_query_scalar::<String>()
            .fetch_all(self.pool)
            .await?;

        Ok(paths)
    }

    async fn media_roots(&self) -> Result<Vec<String>> {
        let roots: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT media_directory FROM trees ORDER BY media_directory")
                .fetch_all(self.pool)
                .await?;

        Ok(roots)
    }
}

/// In-memory metadata store for testing.
#[derive(Debug, Default)]
pub struct MemoryMetadata {
    trees: RwLock<BTreeMap<i64, String>>,
    references: RwLock<Vec<(i64, String)>>,
    unavailable: AtomicBool,
}

impl MemoryMetadata {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tree with its media directory (e.g. "media/").
    pub fn add_tree(&self, tree_id: i64, media_directory: impl Into<String>) {
        if let Ok(mut trees) = self.trees.write() {
            trees.insert(tree_id, media_directory.into());
        }
    }

    /// Record a reference for a tree.
    pub fn add_reference(&self, tree_id: i64, file_ref: impl Into<String>) {
        if let Ok(mut references) = self.references.write() {
            references.push((tree_id, file_ref.into()));
        }
    }

    /// Make every following query fail.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(MediaError::Database("metadata store unavailable".to_string()));
        }
        Ok(())
    }

    fn poisoned() -> MediaError {
        MediaError::Database("lock poisoned".to_string())
    }
}

fn is_excluded(reference: &str, exclude_prefixes: &[&str]) -> bool {
    exclude_prefixes
        .iter()
        .any(|prefix| reference.starts_with(prefix))
}

#[async_trait]
impl MetadataStore for MemoryMetadata {
    async fn select_paths(&self, tree_id: i64, exclude_prefixes: &[&str]) -> Result<Vec<String>> {
        self.check_available()?;
        let references = self.references.read().map_err(|_| Self::poisoned())?;

        let mut paths: Vec<String> = references
            .iter()
            .filter(|(id, reference)| *id == tree_id && !is_excluded(reference, exclude_prefixes))
            .map(|(_, reference)| reference.clone())
            .collect();
        paths.sort();

        Ok(paths)
    }

    async fn select_rooted_paths(&self, exclude_prefixes: &[&str]) -> Result<Vec<String>> {
        self.check_available()?;
        let trees = self.trees.read().map_err(|_| Self::poisoned())?;
        let references = self.references.read().map_err(|_| Self::poisoned())?;

        let mut paths: Vec<String> = references
            .iter()
            .filter(|(_, reference)| !is_excluded(reference, exclude_prefixes))
            .filter_map(|(id, reference)| {
                trees
                    .get(id)
                    .map(|directory| format!("{directory}{reference}"))
            })
            .collect();
        paths.sort();

        Ok(paths)
    }

    async fn media_roots(&self) -> Result<Vec<String>> {
        self.check_available()?;
        let trees = self.trees.read().map_err(|_| Self::poisoned())?;

        let mut roots: Vec<String> = trees.values().cloned().collect();
        roots.sort();
        roots.dedup();

        Ok(roots)
    }
}
