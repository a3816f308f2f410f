//! Command-line definition.

use clap::{Parser, Subcommand};

/// Top-level arguments.
#[derive(Parser)]
#[command(name = "st-cli", version, about = "Spacetraveling content CLI")]
pub struct Cli {
    /// Content API endpoint, e.g. `https://spacetraveling.cdn.prismic.io/api/v2`.
    #[arg(long, env = "PRISMIC_API_ENDPOINT", global = true)]
    pub endpoint: Option<String>,
    /// Access token for private repositories.
    #[arg(long, env = "PRISMIC_ACCESS_TOKEN", global = true, hide_env_values = true)]
    pub access_token: Option<String>,
    /// HTTP timeout for content API requests, in seconds.
    #[arg(long, env = "CMS_HTTP_TIMEOUT_SECONDS", default_value_t = 10, global = true)]
    pub timeout_seconds: u64,
    /// What to do.
    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// List published posts, following `next_page` cursors.
    ListPosts {
        /// Posts requested per page.
        #[arg(long, default_value_t = 20)]
        page_size: u32,
        /// Stop after this many pages (the first page included).
        #[arg(long)]
        max_pages: Option<usize>,
    },
    /// Show a single post with its reading time and neighbours.
    GetPost {
        /// Post uid (the slug in `/post/{uid}`).
        uid: String,
        /// Content ref to read from instead of the master ref.
        #[arg(long = "ref")]
        reference: Option<String>,
    },
    /// Resolve a preview token and document id to the page to open.
    ResolvePreview {
        /// Preview token handed out by the CMS.
        #[arg(long)]
        token: String,
        /// Id of the previewed document.
        #[arg(long)]
        document_id: String,
    },
}
