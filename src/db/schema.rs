//! Database schema and migrations for genmedia.
//!
//! This module contains all database migrations that will be applied
//! sequentially when the database is first opened or upgraded.

/// Database migrations.
///
/// Each migration is a SQL script that will be executed in order.
/// The schema_version table tracks which migrations have been applied.
pub const MIGRATIONS: &[&str] = &[
    // v1: Trees, each with its own media directory inside the data directory
    r#"
CREATE TABLE trees (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    name            TEXT NOT NULL UNIQUE,
    media_directory TEXT NOT NULL DEFAULT 'media/',
    created_at      TEXT NOT NULL DEFAULT (datetime('now'))
);
"#,
    // v2: Media file references recorded for a tree
    r#"
CREATE TABLE media_files (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    tree_id     INTEGER NOT NULL REFERENCES trees(id) ON DELETE CASCADE,
    file_ref    TEXT NOT NULL,           -- relative to the media directory, or a URL
    format      TEXT NOT NULL DEFAULT '',
    media_type  TEXT NOT NULL DEFAULT '',
    title       TEXT NOT NULL DEFAULT '',
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_media_files_tree ON media_files(tree_id);
CREATE INDEX idx_media_files_file_ref ON media_files(file_ref);
"#,
];
