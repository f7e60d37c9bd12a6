use std::env;

use localrag_cli::{init_tracing, run_build};
use localrag_core::config::Settings;

/// `localrag-indexer [DATA_DIR]`: the positional argument overrides `data_dir`.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing(false);
    let mut settings = Settings::load().map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;
    if let Some(dir) = env::args().skip(1).find(|a| !a.starts_with('-')) {
        settings.data_dir = dir;
    }
    run_build(&settings).await?;
    Ok(())
}
