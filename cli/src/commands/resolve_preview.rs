//! `resolve-preview`

use anyhow::{bail, Result};
use serde::Serialize;
use spacetraveling_shared::cms::{CmsClient, CmsError};

use crate::utils::print_json;

#[derive(Serialize)]
struct PreviewResolution {
    redirect: String,
}

/// Print the page a preview session should open.
pub async fn run(client: &CmsClient, token: &str, document_id: &str) -> Result<()> {
    match client.resolve_preview(token, document_id).await {
        Ok(redirect) => print_json(&PreviewResolution {
            redirect,
        }),
        Err(CmsError::InvalidToken) => bail!("invalid token"),
        Err(err) => Err(err.into()),
    }
}
