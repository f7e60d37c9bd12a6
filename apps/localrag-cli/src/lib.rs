use localrag_answer::{build_from_settings, BuildReport};
use localrag_core::config::Settings;
use localrag_embed::embedder_from_settings;
use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins; otherwise `info`, or `debug` with `--verbose`.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_target(false)
        .init();
}

/// Build the collection for the active backend and print a summary.
pub async fn run_build(settings: &Settings) -> anyhow::Result<BuildReport> {
    let embedder = embedder_from_settings(settings)?;
    println!("localrag indexer\n================");
    println!("Data directory: {}", settings.data_path().display());
    println!("Embedder: {}", embedder.embedder_id());

    let report = build_from_settings(settings, embedder.as_ref()).await?;
    match &report.index_dir {
        Some(dir) => {
            println!("📊 Loaded {} documents into {} chunks", report.documents, report.chunks);
            println!("✅ Index written to {}", dir.display());
        }
        None => println!("⚠️  No documents to index in {}; nothing written", settings.data_path().display()),
    }
    Ok(report)
}
