//! Media file management for genmedia.
//!
//! This module provides:
//! - Upload size limits parsed from human readable values
//! - Safe folder and file names for uploads
//! - Content addressed names for automatically named uploads
//! - Reconciliation of files on disk with recorded references
//! - GEDCOM `FILE` records for stored media

mod content;
mod fragment;
mod ingest;
mod legacy;
mod metadata;
mod path;
mod reconcile;
mod size;
mod storage;

pub use content::{content_name, content_name_from_reader};
pub use fragment::{build_fragment, EXTENSION_TO_FORM};
pub use ingest::{MediaIngester, UploadSource, UploadStatus, UploadedFile};
pub use legacy::{is_reserved, RESERVED_FOLDERS};
pub use metadata::{MediaFile, MediaFileRepository, MemoryMetadata, MetadataStore, NewMediaFile};
pub use path::{sanitize_filename, sanitize_folder, AssetPath};
pub use reconcile::StorageReconciler;
pub use size::{effective_max_upload, max_upload_kb, parse_size};
pub use storage::{
    EntryKind, LocalStorage, MemoryStorage, StorageBackend, StorageEntry, StorageRoot,
};

/// Reference prefixes of media that lives outside the storage backend.
pub const REMOTE_PREFIXES: &[&str] = &["http://", "https://"];

/// Check whether a recorded reference points at remote media.
pub fn is_remote(reference: &str) -> bool {
    REMOTE_PREFIXES
        .iter()
        .any(|prefix| reference.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_remote() {
        assert!(is_remote("http://example.com/a.jpg"));
        assert!(is_remote("https://example.com/a.jpg"));
        assert!(!is_remote("photos/http.jpg"));
        assert!(!is_remote("ftp://example.com/a.jpg"));
    }
}
