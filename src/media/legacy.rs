//! Folders created by earlier generations of the media store.
//!
//! Thumbnails and watermarked copies used to live next to the originals.
//! They are kept on disk but never shown in any listing.

/// Names of the reserved housekeeping folders.
pub const RESERVED_FOLDERS: &[&str] = &["thumbs", "watermarks"];

/// Check whether a storage path lies in (or is) a reserved folder.
///
/// Matches the name as a whole path segment only, so `thumbsup/` is not reserved.
pub fn is_reserved(path: &str) -> bool {
    RESERVED_FOLDERS.iter().any(|name| {
        path == *name
            || path.starts_with(&format!("{name}/"))
            || path.contains(&format!("/{name}/"))
            || path.ends_with(&format!("/{name}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_prefix() {
        assert!(is_reserved("thumbs/foo.jpg"));
        assert!(is_reserved("watermarks/foo.jpg"));
    }

    #[test]
    fn test_reserved_inner_segment() {
        assert!(is_reserved("a/thumbs/foo.jpg"));
        assert!(is_reserved("media/family/watermarks/foo.jpg"));
    }

    #[test]
    fn test_reserved_suffix() {
        assert!(is_reserved("a/watermarks"));
        assert!(is_reserved("media/thumbs"));
        assert!(is_reserved("thumbs"));
    }

    #[test]
    fn test_not_reserved() {
        assert!(!is_reserved("thumbsup/foo.jpg"));
        assert!(!is_reserved("a/mythumbs/foo.jpg"));
        assert!(!is_reserved("a/thumbs.jpg"));
        assert!(!is_reserved("watermarks.txt"));
        assert!(!is_reserved(""));
    }
}
