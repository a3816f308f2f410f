//! `get-post`

use anyhow::{bail, Result};
use spacetraveling_shared::cms::{CmsClient, CmsError};

use crate::utils::{post_report, print_json};

/// Print a post report with reading time and neighbours.
pub async fn run(client: &CmsClient, uid: &str, reference: Option<&str>) -> Result<()> {
    let post = match client.get_post_by_uid(uid, reference).await {
        Ok(post) => post,
        Err(CmsError::NotFound(_)) => bail!("post not found: {uid}"),
        Err(err) => return Err(err.into()),
    };
    let adjacent = client.adjacent_posts(&post.id, reference).await?;
    print_json(&post_report(&post, adjacent))
}
