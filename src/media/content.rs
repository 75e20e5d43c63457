//! Content addressed file names.
//!
//! Automatically named uploads are stored as `{sha256}.{extension}`, so the
//! same bytes always land on the same name and are stored only once.

use sha2::{Digest, Sha256};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::Result;

const CHUNK_SIZE: usize = 64 * 1024;

/// Name a payload after the SHA-256 digest of its bytes.
///
/// The extension is taken from the client's file name and lowercased.
pub fn content_name(content: &[u8], client_filename: &str) -> String {
    let digest = Sha256::digest(content);
    with_extension(format!("{digest:x}"), client_filename)
}

/// Same as [`content_name`], hashing a stream incrementally.
pub async fn content_name_from_reader<R>(reader: &mut R, client_filename: &str) -> Result<String>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        let n = reader.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(with_extension(
        format!("{:x}", hasher.finalize()),
        client_filename,
    ))
}

fn with_extension(digest: String, client_filename: &str) -> String {
    match extension(client_filename) {
        Some(ext) => format!("{digest}.{ext}"),
        None => digest,
    }
}

/// Lowercase extension of a client file name, if it has one.
///
/// Everything after the last dot of the base name counts, so `.jpg` has the
/// extension `jpg`.
fn extension(client_filename: &str) -> Option<String> {
    let client_filename = client_filename.replace('\\', "/");
    let base_name = client_filename.rsplit('/').next().unwrap_or_default();
    base_name
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty())
        .map(str::to_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_content_same_name() {
        let a = content_name(b"family portrait", "one.jpg");
        let b = content_name(b"family portrait", "two.jpg");

        assert_eq!(a, b);
    }

    #[test]
    fn test_different_content_different_name() {
        let a = content_name(b"family portrait", "photo.jpg");
        let b = content_name(b"family portrait!", "photo.jpg");

        assert_ne!(a, b);
    }

    #[test]
    fn test_known_digest() {
        assert_eq!(
            content_name(b"abc", "x.txt"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad.txt"
        );
    }

    #[test]
    fn test_extension_is_lowercased() {
        let name = content_name(b"data", "SCAN.TIF");
        assert!(name.ends_with(".tif"));
    }

    #[test]
    fn test_missing_extension() {
        let name = content_name(b"data", "README");
        assert_eq!(name.len(), 64);
        assert!(!name.contains('.'));

        assert_eq!(extension(".jpg"), Some("jpg".to_string()));
        assert_eq!(extension("archive."), None);
        assert_eq!(extension("dir.d/file"), None);
        assert_eq!(extension("archive.tar.gz"), Some("gz".to_string()));
        assert_eq!(extension("C:\\scans\\page.PNG"), Some("png".to_string()));
    }

    #[test]
    fn test_dotfile_name_is_an_extension() {
        let name = content_name(b"data", ".JPG");
        assert_eq!(name, format!("{}.jpg", content_name(b"data", "")));
    }

    #[tokio::test]
    async fn test_reader_matches_bytes() {
        let content: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let mut reader = std::io::Cursor::new(content.clone());

        let streamed = content_name_from_reader(&mut reader, "big.bin")
            .await
            .unwrap();

        assert_eq!(streamed, content_name(&content, "big.bin"));
    }
}
