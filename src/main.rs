use tracing::{error, info};

use genmedia::{
    Config, Database, LocalStorage, MediaFileRepository, StorageReconciler, TreeRepository,
};

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    // Load configuration
    let config = match Config::load_with_env(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {config_path}: {e}");
            eprintln!("Using default configuration.");
            Config::default()
        }
    };

    // Initialize logging
    if let Err(e) = genmedia::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        genmedia::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = config.validate() {
        error!("{e}");
        std::process::exit(1);
    }

    if let Err(e) = audit(&config).await {
        error!("Media audit failed: {e}");
        std::process::exit(1);
    }
}

/// Print the unused files of every tree, then every known media folder.
async fn audit(config: &Config) -> genmedia::Result<()> {
    let db = Database::open(&config.database.path).await?;
    let storage = LocalStorage::new(&config.media.data_path)?;
    let metadata = MediaFileRepository::new(db.pool());
    let reconciler = StorageReconciler::new(&storage, &metadata);

    info!(
        "Auditing media under {} (upload limit {} bytes)",
        storage.base_path().display(),
        config.media.max_upload_bytes()
    );

    for tree in TreeRepository::new(db.pool()).list().await? {
        let unused = reconciler.unused_files(&tree).await?;
        println!(
            "{} (created {}, {} unused)",
            tree.name,
            tree.created_at.format("%Y-%m-%d"),
            unused.len()
        );
        for file in unused {
            println!("  {file}");
        }
    }

    println!("Media folders:");
    for folder in reconciler.all_media_folders().await? {
        println!("  {folder}");
    }

    Ok(())
}
