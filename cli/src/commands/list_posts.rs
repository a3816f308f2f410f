//! `list-posts`

use anyhow::Result;
use spacetraveling_shared::cms::CmsClient;

use crate::utils::{collect_posts, print_json};

/// Print every collected post as one page.
pub async fn run(client: &CmsClient, page_size: u32, max_pages: Option<usize>) -> Result<()> {
    let page = collect_posts(client, page_size, max_pages).await?;
    print_json(&page)
}
