//! `metasearch` command-line entry point.
//!
//! Tracing output goes to stderr so that stdout carries only results.

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("metasearch=info,metasearch_core=info")),
        )
        .init();

    let args = metasearch::cli::Args::parse();
    metasearch::cli::run(args).await.map_err(|e| {
        tracing::error!(error = %e, "metasearch exited with error");
        anyhow::anyhow!("metasearch failed: {e}")
    })
}
