//! Concurrency tests for genmedia.
//!
//! Uploads of identical content race for the same content name; the loser
//! simply replaces identical bytes.

use std::sync::Arc;

use genmedia::media::content_name;
use genmedia::{LocalStorage, MediaIngester, StorageBackend, UploadSource, UploadedFile};
use tempfile::TempDir;

#[tokio::test]
async fn test_concurrent_auto_named_uploads() {
    let temp_dir = TempDir::new().unwrap();
    let storage = Arc::new(LocalStorage::new(temp_dir.path()).unwrap());

    const NUM_UPLOADS: usize = 10;
    let content: Vec<u8> = (0..100_000u32).map(|i| (i % 199) as u8).collect();

    let mut handles = Vec::new();
    for i in 0..NUM_UPLOADS {
        let storage = Arc::clone(&storage);
        let content = content.clone();
        handles.push(tokio::spawn(async move {
            MediaIngester::new(storage.as_ref())
                .ingest(UploadSource::Upload {
                    file: Some(UploadedFile::new(format!("copy{i}.jpg"), content)),
                    folder: String::new(),
                    new_name: String::new(),
                    auto_name: true,
                })
                .await
        }));
    }

    let expected = content_name(&content, "photo.jpg");
    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), expected);
    }

    let entries = storage.list_entries("", true).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].path, expected);
    assert_eq!(std::fs::read(temp_dir.path().join(&expected)).unwrap(), content);
}
