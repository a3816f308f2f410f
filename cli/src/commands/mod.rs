//! Subcommand implementations. Each prints JSON on stdout.

pub mod get_post;
pub mod list_posts;
pub mod resolve_preview;

use std::time::Duration;

use anyhow::{Context, Result};
use spacetraveling_shared::cms::{CmsClient, CmsConfig};

use crate::cli::{Cli, Commands};

/// Build a CMS client from the global flags and run the subcommand.
pub async fn run(cli: Cli) -> Result<()> {
    let client = cms_client(&cli)?;

    match cli.command {
        Commands::ListPosts {
            page_size,
            max_pages,
        } => list_posts::run(&client, page_size, max_pages).await,
        Commands::GetPost {
            uid,
            reference,
        } => get_post::run(&client, &uid, reference.as_deref()).await,
        Commands::ResolvePreview {
            token,
            document_id,
        } => resolve_preview::run(&client, &token, &document_id).await,
    }
}

fn cms_client(cli: &Cli) -> Result<CmsClient> {
    let endpoint = cli
        .endpoint
        .as_deref()
        .map(str::trim)
        .filter(|endpoint| !endpoint.is_empty())
        .context("missing content API endpoint: pass --endpoint or set PRISMIC_API_ENDPOINT")?;

    CmsClient::new(CmsConfig {
        endpoint: endpoint.to_string(),
        access_token: cli.access_token.clone().filter(|token| !token.trim().is_empty()),
        timeout: Duration::from_secs(cli.timeout_seconds.max(1)),
    })
    .with_context(|| format!("invalid content API endpoint: {endpoint}"))
}
