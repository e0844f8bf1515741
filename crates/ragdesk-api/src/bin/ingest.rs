//! Bulk-load documents into a knowledge base without going through HTTP.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use ragdesk_api::{bootstrap, Config};
use ragdesk_persist::KnowledgeBase;
use ragdesk_retrieval::Ingestor;

#[derive(Debug, Parser)]
#[command(name = "ragdesk-ingest", version, about = "Load documents into a ragdesk knowledge base")]
struct Cli {
    /// Directory walked recursively; unsupported files are skipped
    #[arg(short, long, env = "RAGDESK_INGEST_DIR")]
    dir: Option<PathBuf>,

    /// Individual files to load
    #[arg(value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Web page to fetch into the default knowledge base; repeatable
    #[arg(long = "url", value_name = "URL")]
    urls: Vec<String>,

    /// Also fetch every page listed under `storage.web_urls`
    #[arg(long)]
    web: bool,

    /// Load the files into this user's knowledge base instead of the default one
    #[arg(short, long)]
    user_id: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = Config::load()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;
    bootstrap::init_logging(&config);

    let mut urls = cli.urls.clone();
    if cli.web {
        urls.extend(config.storage.web_urls.iter().cloned());
    }

    if cli.dir.is_none() && cli.files.is_empty() && urls.is_empty() {
        anyhow::bail!("Nothing to ingest: pass --dir, --url, --web and/or one or more files");
    }
    if (cli.dir.is_some() || !urls.is_empty()) && cli.user_id.is_some() {
        anyhow::bail!(
            "--dir, --url and --web load into the default knowledge base; pass files to use --user-id"
        );
    }

    let clients = bootstrap::provider_clients(&config)?;
    let persist = bootstrap::connect_store(&config).await?;
    let ingestor = Ingestor::new(clients.embeddings, persist, config.ingest_config());

    let kb = match cli.user_id {
        Some(user_id) => KnowledgeBase::user(user_id),
        None => KnowledgeBase::Default,
    };

    let mut failures = 0usize;

    for path in &cli.files {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        match ingestor.ingest(&kb, &filename, &bytes).await {
            Ok(file) => println!("ingested {} ({} chunks) into {}", file.filename, file.chunk_count, kb),
            Err(e) => {
                failures += 1;
                eprintln!("failed {}: {}", path.display(), e);
            }
        }
    }

    if let Some(dir) = &cli.dir {
        let report = ingestor.ingest_directory(dir).await?;
        for file in &report.ingested {
            println!("ingested {} ({} chunks) into {}", file.filename, file.chunk_count, kb);
        }
        for (path, reason) in &report.failed {
            eprintln!("failed {}: {}", path.display(), reason);
        }
        failures += report.failed.len();
    }

    if !urls.is_empty() {
        let report = ingestor.ingest_urls(&urls).await;
        for file in &report.ingested {
            println!("ingested {} ({} chunks) into {}", file.filename, file.chunk_count, kb);
        }
        for (url, reason) in &report.failed {
            eprintln!("failed {}: {}", url, reason);
        }
        failures += report.failed.len();
    }

    if failures > 0 {
        anyhow::bail!("{} source(s) failed to ingest", failures);
    }
    Ok(())
}
