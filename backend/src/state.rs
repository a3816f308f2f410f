use std::sync::Arc;

use anyhow::{Context, Result};
use spacetraveling_shared::cms::CmsClient;

use crate::{
    comments::CommentsEmbed, config::AppConfig, page_cache::PageCache,
    preview::PreviewCookieSigner,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub cms: CmsClient,
    pub preview_signer: PreviewCookieSigner,
    /// Rendered published pages.
    pub page_cache: PageCache,
    pub comments: Option<CommentsEmbed>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self> {
        let cms = CmsClient::new(config.cms_config()).context("failed to build CMS client")?;
        let preview_signer =
            PreviewCookieSigner::new(&config.preview_cookie_secret, config.cookie_secure);
        let page_cache = PageCache::new(config.page_cache_capacity, config.page_revalidate);
        let comments = CommentsEmbed::from_repo_setting(config.utterances_repo.as_deref());

        Ok(Self {
            config: Arc::new(config),
            cms,
            preview_signer,
            page_cache,
            comments,
        })
    }
}
