//! Reconciliation of stored media with recorded references.

use std::collections::{BTreeSet, HashSet};

use futures::future::try_join_all;
use tracing::debug;

use super::legacy::is_reserved;
use super::metadata::MetadataStore;
use super::path::sanitize_folder;
use super::storage::{StorageBackend, StorageRoot};
use super::{is_remote, REMOTE_PREFIXES};
use crate::db::Tree;
use crate::{MediaError, Result};

/// Compares what is on disk with what the metadata store references.
///
/// Every call recomputes its result; nothing is cached and nothing is written.
pub struct StorageReconciler<'a, S: ?Sized, M: ?Sized> {
    storage: &'a S,
    metadata: &'a M,
}

impl<'a, S, M> StorageReconciler<'a, S, M>
where
    S: StorageBackend + ?Sized,
    M: MetadataStore + ?Sized,
{
    /// Create a reconciler over the whole storage backend and the metadata store.
    pub fn new(storage: &'a S, metadata: &'a M) -> Self {
        Self { storage, metadata }
    }

    /// Files below `folder` of `root`, excluding reserved folders. Sorted.
    pub async fn all_files_on_disk<R>(
        &self,
        root: &R,
        folder: &str,
        include_subfolders: bool,
    ) -> Result<Vec<String>>
    where
        R: StorageBackend + ?Sized,
    {
        let folder = sanitize_folder(folder).as_folder();
        let entries = root
            .list_entries(&folder, include_subfolders)
            .await
            .map_err(unavailable)?;

        let mut files: Vec<String> = entries
            .into_iter()
            .filter(|entry| entry.is_file() && !is_reserved(&entry.path))
            .map(|entry| entry.path)
            .collect();
        files.sort();
        files.dedup();

        Ok(files)
    }

    /// Files in the tree's media directory that no reference points at.
    ///
    /// Paths are relative to the media directory.
    pub async fn unused_files(&self, tree: &Tree) -> Result<Vec<String>> {
        let root = StorageRoot::for_tree(self.storage, tree);
        let on_disk = self.all_files_on_disk(&root, "", true).await?;

        let referenced: HashSet<String> = self
            .metadata
            .select_paths(tree.id, REMOTE_PREFIXES)
            .await
            .map_err(unavailable)?
            .into_iter()
            .collect();

        let unused: Vec<String> = on_disk
            .into_iter()
            .filter(|path| !is_remote(path) && !referenced.contains(path))
            .collect();

        debug!(
            tree = %tree.name,
            referenced = referenced.len(),
            unused = unused.len(),
            "Reconciled media directory"
        );

        Ok(unused)
    }

    /// Every media folder known to storage or metadata, each ending in `/`.
    ///
    /// Includes the media roots, the non-reserved directories below them and
    /// the parent folders of referenced files.
    pub async fn all_media_folders(&self) -> Result<BTreeSet<String>> {
        let roots: Vec<String> = self
            .metadata
            .media_roots()
            .await
            .map_err(unavailable)?
            .iter()
            .map(|root| sanitize_folder(root).as_folder())
            .collect();

        let listings = try_join_all(roots.iter().map(|root| async move {
            self.storage
                .list_entries(root, true)
                .await
                .map_err(unavailable)
        }))
        .await?;

        let mut folders: BTreeSet<String> = roots
            .iter()
            .filter(|root| !root.is_empty())
            .cloned()
            .collect();

        for entry in listings.into_iter().flatten() {
            if entry.is_dir() && !is_reserved(&entry.path) {
                folders.insert(format!("{}/", entry.path));
            }
        }

        let referenced = self
            .metadata
            .select_rooted_paths(REMOTE_PREFIXES)
            .await
            .map_err(unavailable)?;

        for path in &referenced {
            if let Some((parent, _)) = path.rsplit_once('/') {
                if !parent.is_empty() && !is_reserved(parent) {
                    folders.insert(format!("{parent}/"));
                }
            }
        }

        debug!(
            roots = roots.len(),
            folders = folders.len(),
            "Collected media folders"
        );

        Ok(folders)
    }

    /// Referenced files below `prefix`, each prefixed with its media directory.
    ///
    /// Consults only the metadata store. With `include_subfolders` false,
    /// files in folders below `prefix` are left out.
    pub async fn all_referenced_paths(
        &self,
        prefix: &str,
        include_subfolders: bool,
    ) -> Result<Vec<String>> {
        let rooted = self
            .metadata
            .select_rooted_paths(REMOTE_PREFIXES)
            .await
            .map_err(unavailable)?;

        let mut paths: Vec<String> = rooted
            .into_iter()
            .filter(|path| match path.strip_prefix(prefix) {
                Some(rest) => include_subfolders || !rest.contains('/'),
                None => false,
            })
            .collect();
        paths.sort();
        paths.dedup();

        Ok(paths)
    }
}

fn unavailable(err: MediaError) -> MediaError {
    match err {
        MediaError::StorageUnavailable(_) => err,
        other => MediaError::StorageUnavailable(other.to_string()),
    }
}
