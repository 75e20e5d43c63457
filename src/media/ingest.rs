//! Upload ingestion.
//!
//! Resolves where a new media object goes and writes it to a tree's storage.
//! Remote URLs and already stored files are accepted without writing anything.

use std::fmt;

use tracing::{debug, info, warn};
use url::Url;

use super::content::content_name;
use super::legacy::is_reserved;
use super::path::{sanitize_filename, sanitize_folder};
use super::storage::StorageBackend;
use crate::{MediaError, Result};

/// Transfer status reported by the upload transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadStatus {
    /// The file arrived intact.
    #[default]
    Ok,
    /// The file exceeded the server's upload ceiling.
    ExceedsServerLimit,
    /// The file exceeded the limit declared by the form.
    ExceedsFormLimit,
    /// Only part of the file arrived.
    Partial,
    /// No file was sent.
    NoFile,
    /// The server had no temporary directory to receive the file.
    MissingTempDir,
    /// The server could not store the received file.
    CantWrite,
    /// The transfer was stopped by a server extension.
    Blocked,
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            UploadStatus::Ok => "file uploaded",
            UploadStatus::ExceedsServerLimit => "file exceeds the server upload limit",
            UploadStatus::ExceedsFormLimit => "file exceeds the form upload limit",
            UploadStatus::Partial => "file was only partially uploaded",
            UploadStatus::NoFile => "no file was uploaded",
            UploadStatus::MissingTempDir => "missing temporary folder",
            UploadStatus::CantWrite => "failed to write file to disk",
            UploadStatus::Blocked => "upload stopped by an extension",
        };
        f.write_str(text)
    }
}

/// A file attached to an upload request.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Name of the file on the client, possibly with a client side directory.
    pub client_filename: String,
    /// The payload.
    pub content: Vec<u8>,
    /// Transfer status.
    pub status: UploadStatus,
}

impl UploadedFile {
    /// A successfully transferred file.
    pub fn new(client_filename: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            client_filename: client_filename.into(),
            content: content.into(),
            status: UploadStatus::Ok,
        }
    }

    /// Set the transfer status.
    pub fn with_status(mut self, status: UploadStatus) -> Self {
        self.status = status;
        self
    }
}

/// Where the media for a new record comes from.
#[derive(Debug, Clone)]
pub enum UploadSource {
    /// Media hosted elsewhere, referenced by URL.
    Remote { url: String },
    /// A file already in the tree's storage that nothing references yet.
    Unused { path: String },
    /// A freshly uploaded file.
    Upload {
        file: Option<UploadedFile>,
        /// Target folder below the media directory.
        folder: String,
        /// Replacement file name; ignored when it contains a directory.
        new_name: String,
        /// Name the file after its content instead.
        auto_name: bool,
    },
}

/// Stores new media in one tree's storage.
pub struct MediaIngester<'a, S: ?Sized> {
    storage: &'a S,
    max_file_size: Option<u64>,
}

impl<'a, S: StorageBackend + ?Sized> MediaIngester<'a, S> {
    /// Create an ingester writing to `storage`, usually a tree's `StorageRoot`.
    pub fn new(storage: &'a S) -> Self {
        Self {
            storage,
            max_file_size: None,
        }
    }

    /// Refuse uploads larger than `bytes`. Zero disables the check.
    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = (bytes > 0).then_some(bytes);
        self
    }

    /// Resolve `source` to the reference to record, writing uploads to storage.
    pub async fn ingest(&self, source: UploadSource) -> Result<String> {
        match source {
            UploadSource::Remote { url } => self.ingest_remote(url),
            UploadSource::Unused { path } => self.ingest_unused(path).await,
            UploadSource::Upload {
                file,
                folder,
                new_name,
                auto_name,
            } => {
                self.ingest_upload(file, &folder, &new_name, auto_name)
                    .await
            }
        }
    }

    /// The URL is returned exactly as given; surrounding whitespace makes it invalid.
    fn ingest_remote(&self, url: String) -> Result<String> {
        if url.trim() != url || !url.contains("://") || Url::parse(&url).is_err() {
            warn!(url = %url, "Rejected remote media reference");
            return Err(MediaError::InvalidReference(url));
        }

        info!(url = %url, "Linked remote media");
        Ok(url)
    }

    /// Returns the path in canonical form, as the storage listings report it.
    async fn ingest_unused(&self, path: String) -> Result<String> {
        let Some(canonical) = canonical_path(&path) else {
            warn!(path = %path, "Rejected unused media path");
            return Err(MediaError::NotFound(path));
        };

        let exists = self
            .storage
            .exists(&canonical)
            .await
            .map_err(|e| MediaError::StorageUnavailable(e.to_string()))?;

        if !exists {
            warn!(path = %canonical, "Unused media file is missing");
            return Err(MediaError::NotFound(canonical));
        }

        info!(path = %canonical, "Linked unused media file");
        Ok(canonical)
    }

    async fn ingest_upload(
        &self,
        file: Option<UploadedFile>,
        folder: &str,
        new_name: &str,
        auto_name: bool,
    ) -> Result<String> {
        let file = file
            .ok_or_else(|| MediaError::NoFileTransmitted(UploadStatus::NoFile.to_string()))?;

        if file.status != UploadStatus::Ok {
            warn!(status = ?file.status, client_filename = %file.client_filename, "Upload failed in transfer");
            return Err(MediaError::NoFileTransmitted(file.status.to_string()));
        }

        if let Some(max) = self.max_file_size {
            if file.content.len() as u64 > max {
                warn!(size = file.content.len(), max, "Upload too large");
                return Err(MediaError::NoFileTransmitted(
                    UploadStatus::ExceedsServerLimit.to_string(),
                ));
            }
        }

        let filename = sanitize_filename(new_name, &file.client_filename);
        let folder = sanitize_folder(folder);

        let path = if auto_name || filename.is_empty() {
            content_name(&file.content, &file.client_filename)
        } else {
            let requested = folder.join(&filename);
            let taken = self
                .storage
                .exists(&requested)
                .await
                .map_err(|e| MediaError::StorageUnavailable(e.to_string()))?;

            if taken {
                debug!(requested = %requested, "Target exists, naming upload by content");
                content_name(&file.content, &file.client_filename)
            } else {
                requested
            }
        };

        let mut reader = file.content.as_slice();
        match self.storage.write_stream(&path, &mut reader).await {
            Ok(written) => {
                info!(path = %path, bytes = written, "Stored uploaded media");
                Ok(path)
            }
            Err(e) => {
                warn!(path = %path, error = %e, "Failed to store uploaded media");
                Err(MediaError::WriteFailed(e.to_string()))
            }
        }
    }
}

/// `/` separated form of a stored file path, or `None` when it climbs with
/// `..`, names nothing, or lies in a reserved folder.
fn canonical_path(path: &str) -> Option<String> {
    let normalized = path.replace('\\', "/");
    let mut segments = Vec::new();

    for segment in normalized.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return None,
            _ => segments.push(segment),
        }
    }

    let canonical = segments.join("/");
    (!canonical.is_empty() && !is_reserved(&canonical)).then_some(canonical)
}
