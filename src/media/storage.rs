//! Storage backends for media files.
//!
//! The media code only needs three capabilities from a backend: listing,
//! existence checks and stream writes. [`LocalStorage`] keeps files in a
//! directory on disk, [`MemoryStorage`] keeps them in memory for tests, and
//! [`StorageRoot`] scopes any backend to one tree's media directory.
//!
//! All paths are relative, `/` separated and never start with a separator.

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::db::Tree;
use crate::{MediaError, Result};

/// Suffix of the temporary file an upload is streamed into before it is
/// renamed into place. Listings never report these files.
const PARTIAL_SUFFIX: &str = ".genmedia-partial";

/// Kind of a listed storage entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A regular file.
    File,
    /// A directory.
    Directory,
}

/// A file or directory reported by [`StorageBackend::list_entries`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEntry {
    /// Path relative to the backend root.
    pub path: String,
    /// Whether the entry is a file or a directory.
    pub kind: EntryKind,
}

impl StorageEntry {
    /// Create a file entry.
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::File,
        }
    }

    /// Create a directory entry.
    pub fn directory(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::Directory,
        }
    }

    /// Whether this entry is a file.
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    /// Whether this entry is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Storage capabilities used by the media code.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// List the entries below `path` (`""` for the root).
    ///
    /// With `recursive` false only the immediate children are returned.
    /// Paths in the result are relative to the backend root, not to `path`.
    /// A directory that does not exist lists as empty.
    async fn list_entries(&self, path: &str, recursive: bool) -> Result<Vec<StorageEntry>>;

    /// Check whether a file exists at `path`.
    async fn exists(&self, path: &str) -> Result<bool>;

    /// Write everything `reader` yields to `path`, replacing any existing file.
    ///
    /// Either the whole stream is stored or nothing is.
    /// Returns the number of bytes written.
    async fn write_stream(
        &self,
        path: &str,
        reader: &mut (dyn AsyncRead + Unpin + Send),
    ) -> Result<u64>;
}

fn trim_separators(path: &str) -> &str {
    path.trim_matches('/')
}

// ============================================================================
// Local filesystem
// ============================================================================

/// Media storage in a directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    /// Base directory for file storage.
    base_path: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage with the given base path.
    ///
    /// The base directory will be created if it doesn't exist.
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        std::fs::create_dir_all(&base_path)?;

        Ok(Self { base_path })
    }

    /// Get the base path of this storage.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Resolve a storage path below the base directory.
    ///
    /// Paths that try to climb out of the base directory are rejected.
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let mut resolved = self.base_path.clone();

        for segment in path.replace('\\', "/").split('/') {
            match segment {
                "" | "." => continue,
                ".." => return Err(MediaError::InvalidPath(path.to_string())),
                _ => {
                    let mut components = Path::new(segment).components();
                    match (components.next(), components.next()) {
                        (Some(Component::Normal(_)), None) => resolved.push(segment),
                        _ => return Err(MediaError::InvalidPath(path.to_string())),
                    }
                }
            }
        }

        Ok(resolved)
    }

    /// Convert an absolute path found under the base directory back to a storage path.
    fn relative(base: &Path, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(base).ok()?;
        let segments: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(segments.join("/"))
    }
}

#[async_trait]
impl StorageBackend for LocalStorage {
    async fn list_entries(&self, path: &str, recursive: bool) -> Result<Vec<StorageEntry>> {
        let dir = self.resolve(path)?;
        let base = self.base_path.clone();

        tokio::task::spawn_blocking(move || -> Result<Vec<StorageEntry>> {
            if !dir.is_dir() {
                return Ok(Vec::new());
            }

            let mut walker = WalkDir::new(&dir).min_depth(1);
            if !recursive {
                walker = walker.max_depth(1);
            }

            let mut entries = Vec::new();
            for entry in walker {
                let entry = entry.map_err(|e| MediaError::Storage(e.to_string()))?;
                let file_type = entry.file_type();

                let kind = if file_type.is_dir() {
                    EntryKind::Directory
                } else if file_type.is_file() {
                    if entry.file_name().to_string_lossy().ends_with(PARTIAL_SUFFIX) {
                        continue;
                    }
                    EntryKind::File
                } else {
                    continue;
                };

                if let Some(path) = Self::relative(&base, entry.path()) {
                    entries.push(StorageEntry { path, kind });
                }
            }

            entries.sort_by(|a, b| a.path.cmp(&b.path));
            Ok(entries)
        })
        .await
        .map_err(|e| MediaError::Storage(e.to_string()))?
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        // Nothing outside the base directory exists as far as callers are concerned.
        let Ok(resolved) = self.resolve(path) else {
            return Ok(false);
        };

        match fs::metadata(&resolved).await {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_stream(
        &self,
        path: &str,
        reader: &mut (dyn AsyncRead + Unpin + Send),
    ) -> Result<u64> {
        let target = self.resolve(path)?;
        if target == self.base_path {
            return Err(MediaError::InvalidPath(path.to_string()));
        }

        let parent = target
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.base_path.clone());
        fs::create_dir_all(&parent).await?;

        let partial = parent.join(format!(".{}{PARTIAL_SUFFIX}", Uuid::new_v4()));

        let result: io::Result<u64> = async {
            let mut file = fs::File::create(&partial).await?;
            let written = tokio::io::copy(reader, &mut file).await?;
            file.flush().await?;
            file.sync_all().await?;
            drop(file);
            fs::rename(&partial, &target).await?;
            Ok(written)
        }
        .await;

        if result.is_err() {
            let _ = fs::remove_file(&partial).await;
        }

        Ok(result?)
    }
}

// ============================================================================
// In-memory storage
// ============================================================================

/// In-memory storage backend for testing.
///
/// Thread-safe via `RwLock`. Failures can be injected for listing and writing.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    files: RwLock<BTreeMap<String, Vec<u8>>>,
    directories: RwLock<BTreeSet<String>>,
    fail_writes: AtomicBool,
    fail_listing: AtomicBool,
}

impl MemoryStorage {
    /// Create a new empty memory storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a file directly, bypassing the write path.
    pub fn insert_file(&self, path: &str, content: impl Into<Vec<u8>>) {
        if let Ok(mut files) = self.files.write() {
            files.insert(trim_separators(path).to_string(), content.into());
        }
    }

    /// Create an empty directory.
    pub fn create_dir(&self, path: &str) {
        if let Ok(mut directories) = self.directories.write() {
            directories.insert(trim_separators(path).to_string());
        }
    }

    /// Read back a stored file.
    pub fn read(&self, path: &str) -> Option<Vec<u8>> {
        self.files
            .read()
            .ok()?
            .get(trim_separators(path))
            .cloned()
    }

    /// Number of stored files.
    pub fn file_count(&self) -> usize {
        self.files.read().map(|files| files.len()).unwrap_or(0)
    }

    /// Make every following write fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every following listing fail.
    pub fn set_fail_listing(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }

    fn poisoned() -> MediaError {
        MediaError::Storage("lock poisoned".to_string())
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn list_entries(&self, path: &str, recursive: bool) -> Result<Vec<StorageEntry>> {
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(MediaError::Storage("listing unavailable".to_string()));
        }

        let files = self.files.read().map_err(|_| Self::poisoned())?;
        let explicit = self.directories.read().map_err(|_| Self::poisoned())?;

        // Directories that only exist as parents of stored files
        let mut directories: BTreeSet<String> = explicit.clone();
        for file in files.keys() {
            let mut end = file.len();
            while let Some(pos) = file[..end].rfind('/') {
                directories.insert(file[..pos].to_string());
                end = pos;
            }
        }

        let base = trim_separators(path);
        let prefix = if base.is_empty() {
            String::new()
        } else {
            format!("{base}/")
        };
        let in_scope = |candidate: &str| match candidate.strip_prefix(prefix.as_str()) {
            Some(rest) => !rest.is_empty() && (recursive || !rest.contains('/')),
            None => false,
        };

        let mut entries: Vec<StorageEntry> = directories
            .iter()
            .filter(|d| in_scope(d.as_str()))
            .map(|d| StorageEntry::directory(d.as_str()))
            .chain(
                files
                    .keys()
                    .filter(|f| in_scope(f.as_str()))
                    .map(|f| StorageEntry::file(f.as_str())),
            )
            .collect();

        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let files = self.files.read().map_err(|_| Self::poisoned())?;
        Ok(files.contains_key(trim_separators(path)))
    }

    async fn write_stream(
        &self,
        path: &str,
        reader: &mut (dyn AsyncRead + Unpin + Send),
    ) -> Result<u64> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(MediaError::Storage("write rejected".to_string()));
        }

        let mut content = Vec::new();
        reader.read_to_end(&mut content).await?;
        let written = content.len() as u64;

        let mut files = self.files.write().map_err(|_| Self::poisoned())?;
        files.insert(trim_separators(path).to_string(), content);

        Ok(written)
    }
}

// ============================================================================
// Tree scoped view
// ============================================================================

/// One tree's media directory inside a storage backend.
///
/// Paths given to and returned from a `StorageRoot` are relative to the
/// media directory.
#[derive(Debug)]
pub struct StorageRoot<'a, S: ?Sized> {
    backend: &'a S,
    prefix: String,
}

impl<'a, S: StorageBackend + ?Sized> StorageRoot<'a, S> {
    /// Scope `backend` to `directory`.
    pub fn new(backend: &'a S, directory: &str) -> Self {
        Self {
            backend,
            prefix: super::sanitize_folder(directory).as_folder(),
        }
    }

    /// Scope `backend` to the media directory of `tree`.
    pub fn for_tree(backend: &'a S, tree: &Tree) -> Self {
        Self::new(backend, &tree.media_directory)
    }

    /// The media directory, ending in `/` (empty for the backend root).
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn full_path(&self, path: &str) -> String {
        format!("{}{}", self.prefix, trim_separators(path))
    }
}

#[async_trait]
impl<'a, S: StorageBackend + ?Sized> StorageBackend for StorageRoot<'a, S> {
    async fn list_entries(&self, path: &str, recursive: bool) -> Result<Vec<StorageEntry>> {
        let entries = self
            .backend
            .list_entries(&self.full_path(path), recursive)
            .await?;

        Ok(entries
            .into_iter()
            .filter_map(|entry| {
                let path = entry.path.strip_prefix(self.prefix.as_str())?.to_string();
                Some(StorageEntry { path, ..entry })
            })
            .filter(|entry| !entry.path.is_empty())
            .collect())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        self.backend.exists(&self.full_path(path)).await
    }

    async fn write_stream(
        &self,
        path: &str,
        reader: &mut (dyn AsyncRead + Unpin + Send),
    ) -> Result<u64> {
        self.backend
            .write_stream(&self.full_path(path), reader)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn setup_local() -> (TempDir, LocalStorage) {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path()).unwrap();
        (temp_dir, storage)
    }

    async fn write(storage: &dyn StorageBackend, path: &str, content: &[u8]) -> u64 {
        let mut reader = Cursor::new(content.to_vec());
        storage.write_stream(path, &mut reader).await.unwrap()
    }

    fn paths(entries: &[StorageEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.path.as_str()).collect()
    }

    #[test]
    fn test_new_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let storage_path = temp_dir.path().join("data");

        assert!(!storage_path.exists());

        let storage = LocalStorage::new(&storage_path).unwrap();

        assert!(storage_path.exists());
        assert_eq!(storage.base_path(), storage_path);
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let (_temp_dir, storage) = setup_local();

        assert!(storage.resolve("a/b.jpg").is_ok());
        assert!(storage.resolve("/a/b.jpg").is_ok());
        assert!(matches!(
            storage.resolve("../outside.jpg"),
            Err(MediaError::InvalidPath(_))
        ));
        assert!(matches!(
            storage.resolve("a\\..\\..\\outside.jpg"),
            Err(MediaError::InvalidPath(_))
        ));
    }

    #[tokio::test]
    async fn test_local_write_and_exists() {
        let (_temp_dir, storage) = setup_local();

        let written = write(&storage, "media/family/photo.jpg", b"jpeg bytes").await;

        assert_eq!(written, 10);
        assert!(storage.exists("media/family/photo.jpg").await.unwrap());
        assert!(!storage.exists("media/family").await.unwrap());
        assert!(!storage.exists("media/missing.jpg").await.unwrap());
        assert!(!storage.exists("../escape.jpg").await.unwrap());

        let on_disk = std::fs::read(storage.base_path().join("media/family/photo.jpg")).unwrap();
        assert_eq!(on_disk, b"jpeg bytes");
    }

    #[tokio::test]
    async fn test_local_write_replaces_and_leaves_no_partial_files() {
        let (_temp_dir, storage) = setup_local();

        write(&storage, "a.txt", b"first").await;
        write(&storage, "a.txt", b"second").await;

        let entries = storage.list_entries("", true).await.unwrap();
        assert_eq!(paths(&entries), vec!["a.txt"]);
        assert_eq!(std::fs::read(storage.base_path().join("a.txt")).unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_local_write_rejects_traversal() {
        let (_temp_dir, storage) = setup_local();

        let mut reader = Cursor::new(b"data".to_vec());
        let result = storage.write_stream("../escape.txt", &mut reader).await;

        assert!(matches!(result, Err(MediaError::InvalidPath(_))));
    }

    #[tokio::test]
    async fn test_local_list_entries() {
        let (_temp_dir, storage) = setup_local();

        write(&storage, "media/a.jpg", b"a").await;
        write(&storage, "media/family/b.jpg", b"b").await;
        std::fs::create_dir_all(storage.base_path().join("media/empty")).unwrap();

        let deep = storage.list_entries("media", true).await.unwrap();
        assert_eq!(
            paths(&deep),
            vec!["media/a.jpg", "media/empty", "media/family", "media/family/b.jpg"]
        );
        assert!(deep[0].is_file());
        assert!(deep[1].is_dir());

        let shallow = storage.list_entries("media/", false).await.unwrap();
        assert_eq!(paths(&shallow), vec!["media/a.jpg", "media/empty", "media/family"]);
    }

    #[tokio::test]
    async fn test_local_list_missing_directory_is_empty() {
        let (_temp_dir, storage) = setup_local();

        let entries = storage.list_entries("nowhere", true).await.unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_memory_storage_listing() {
        let storage = MemoryStorage::new();
        storage.insert_file("media/a.jpg", b"a".to_vec());
        storage.insert_file("media/family/b.jpg", b"b".to_vec());
        storage.create_dir("media/empty");

        let deep = storage.list_entries("media", true).await.unwrap();
        assert_eq!(
            paths(&deep),
            vec!["media/a.jpg", "media/empty", "media/family", "media/family/b.jpg"]
        );

        let root = storage.list_entries("", false).await.unwrap();
        assert_eq!(paths(&root), vec!["media"]);
        assert!(root[0].is_dir());
    }

    #[tokio::test]
    async fn test_memory_storage_failures() {
        let storage = MemoryStorage::new();

        storage.set_fail_writes(true);
        let mut reader = Cursor::new(b"data".to_vec());
        assert!(storage.write_stream("a.txt", &mut reader).await.is_err());
        assert_eq!(storage.file_count(), 0);

        storage.set_fail_listing(true);
        assert!(storage.list_entries("", true).await.is_err());
    }

    #[tokio::test]
    async fn test_storage_root_scopes_paths() {
        let storage = MemoryStorage::new();
        storage.insert_file("media/a.jpg", b"a".to_vec());
        storage.insert_file("media/family/b.jpg", b"b".to_vec());
        storage.insert_file("other/c.jpg", b"c".to_vec());

        let root = StorageRoot::new(&storage, "\\media\\");
        assert_eq!(root.prefix(), "media/");

        let entries = root.list_entries("", true).await.unwrap();
        assert_eq!(paths(&entries), vec!["a.jpg", "family", "family/b.jpg"]);

        assert!(root.exists("family/b.jpg").await.unwrap());
        assert!(!root.exists("c.jpg").await.unwrap());

        write(&root, "new.jpg", b"new").await;
        assert_eq!(storage.read("media/new.jpg"), Some(b"new".to_vec()));
    }

    #[tokio::test]
    async fn test_storage_root_over_local_storage() {
        let (_temp_dir, storage) = setup_local();
        let root = StorageRoot::new(&storage, "media/");

        write(&root, "family/a.jpg", b"a").await;

        assert!(storage.exists("media/family/a.jpg").await.unwrap());
        let entries = root.list_entries("family", false).await.unwrap();
        assert_eq!(paths(&entries), vec!["family/a.jpg"]);
    }
}
