//! genmedia - media file management for genealogy trees.
//!
//! Stores uploaded media for a tree, names anonymous uploads by content hash,
//! reconciles files on disk with the references recorded in the database and
//! builds the GEDCOM `FILE` record for a stored file.

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod media;

pub use config::Config;
pub use db::{Database, DbPool, NewTree, Tree, TreeRepository};
pub use error::{MediaError, Result};
pub use media::{
    build_fragment, content_name, effective_max_upload, is_reserved, parse_size,
    sanitize_filename, sanitize_folder, AssetPath, LocalStorage, MediaFile, MediaFileRepository,
    MediaIngester, MetadataStore, NewMediaFile, StorageBackend, StorageReconciler, StorageRoot,
    UploadSource, UploadStatus, UploadedFile,
};
