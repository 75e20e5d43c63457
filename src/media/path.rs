//! Safe relative paths for uploaded media.

use std::fmt;

/// A normalized path relative to a storage root.
///
/// Segments never contain `/` or `\`, and are never empty, `.` or `..`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct AssetPath {
    segments: Vec<String>,
}

impl AssetPath {
    /// The storage root itself.
    pub fn root() -> Self {
        Self::default()
    }

    /// Whether this is the storage root.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// The path segments in order.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The path as a folder prefix: `a/b/`, or the empty string for the root.
    pub fn as_folder(&self) -> String {
        if self.is_root() {
            String::new()
        } else {
            format!("{self}/")
        }
    }

    /// Append a file name to this folder.
    ///
    /// The name must already be a single safe segment (see [`sanitize_filename`]).
    pub fn join(&self, file_name: &str) -> String {
        format!("{}{file_name}", self.as_folder())
    }
}

impl fmt::Display for AssetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

/// Normalize a user supplied folder into a safe relative path.
///
/// Backslashes become forward slashes and empty or `.` segments are dropped.
/// Input that tries to climb with `..` collapses to the root.
pub fn sanitize_folder(raw: &str) -> AssetPath {
    let normalized = raw.replace('\\', "/");
    let mut segments = Vec::new();

    for segment in normalized.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return AssetPath::root(),
            _ => segments.push(segment.to_string()),
        }
    }

    AssetPath { segments }
}

/// Choose the stored file name for an upload.
///
/// A non-empty `raw_path` without any directory component overrides the
/// client's file name. Otherwise the last component of `client_filename` is
/// used. The result is empty when neither yields a usable name.
pub fn sanitize_filename(raw_path: &str, client_filename: &str) -> String {
    let raw_path = raw_path.replace('\\', "/");
    if !raw_path.is_empty() && !raw_path.contains('/') && is_usable_name(&raw_path) {
        return raw_path;
    }

    let client_filename = client_filename.replace('\\', "/");
    let base_name = client_filename.rsplit('/').next().unwrap_or_default();
    if is_usable_name(base_name) {
        base_name.to_string()
    } else {
        String::new()
    }
}

fn is_usable_name(name: &str) -> bool {
    !name.trim().is_empty() && name != "." && name != ".."
}
