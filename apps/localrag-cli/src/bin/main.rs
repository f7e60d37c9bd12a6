//! localrag: build a local document index and ask questions against it.
//!
//! Usage:
//!   localrag build                      # index `data_dir` for the active backend
//!   localrag ask "What is X?" --k 3     # answer with retrieved sources
//!   localrag health                     # {"status":"ok"}

use anyhow::Result;
use clap::{Parser, Subcommand};
use localrag_answer::service_from_settings;
use localrag_cli::{init_tracing, run_build};
use localrag_core::config::Settings;
use localrag_core::types::{ChatQuery, Health};

#[derive(Parser)]
#[command(name = "localrag", version, about = "Local retrieval-augmented question answering")]
struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load, chunk and embed `data_dir` into the active collection
    Build,
    /// Answer a question from the indexed documents
    Ask {
        query: String,
        /// Neighbours to retrieve; zero or negative uses `k_neighbors`
        #[arg(long, allow_negative_numbers = true)]
        k: Option<i64>,
    },
    /// Print the service health document
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Health => println!("{}", serde_json::to_string(&Health::ok())?),
        Command::Build => {
            let settings = Settings::load()?;
            run_build(&settings).await?;
        }
        Command::Ask { query, k } => {
            let settings = Settings::load()?;
            let service = service_from_settings(&settings).await?;
            let answer = service.chat(&ChatQuery { query, k }).await?;
            println!("{}", answer.answer);
            if !answer.sources.is_empty() {
                println!("\nSources:");
                for source in &answer.sources {
                    println!("  - {source}");
                }
            }
        }
    }
    Ok(())
}
