//! Incremental "load more" pagination over post summaries.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    cms::{CmsClient, CmsError},
    PostPage, PostSummary,
};

/// Why a page could not be appended.
#[derive(Debug, thiserror::Error)]
pub enum PaginationError {
    /// The request failed; retrying may help.
    #[error("failed to load the next page: {0}")]
    Network(String),

    /// The page came back but could not be decoded.
    #[error("next page has an unexpected shape: {0}")]
    Parse(String),
}

impl From<CmsError> for PaginationError {
    fn from(err: CmsError) -> Self {
        match err {
            CmsError::Parse {
                ..
            } => Self::Parse(err.to_string()),
            other => Self::Network(other.to_string()),
        }
    }
}

/// Something that can turn a cursor into the next page of posts.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Load the page behind `cursor`.
    async fn fetch_page(&self, cursor: &str) -> Result<PostPage, PaginationError>;
}

#[async_trait]
impl PageSource for CmsClient {
    async fn fetch_page(&self, cursor: &str) -> Result<PostPage, PaginationError> {
        Ok(CmsClient::fetch_page(self, cursor).await?)
    }
}

/// Result of a single [`Paginator::load_more`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A page was fetched and this many summaries were appended.
    Appended(usize),
    /// No cursor left; nothing was fetched.
    Exhausted,
    /// Another load was still pending; nothing was fetched.
    InFlight,
}

#[derive(Debug)]
struct PaginatorState {
    posts: Vec<PostSummary>,
    next_page: Option<String>,
}

/// Ordered, append-only list of summaries plus the cursor of the next page.
pub struct Paginator<S> {
    source: S,
    state: RwLock<PaginatorState>,
    in_flight: AtomicBool,
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn normalize_cursor(cursor: Option<String>) -> Option<String> {
    cursor.filter(|value| !value.trim().is_empty())
}

impl<S: PageSource> Paginator<S> {
    /// Start from an already loaded first page.
    pub fn new(source: S, initial: PostPage) -> Self {
        Self {
            source,
            state: RwLock::new(PaginatorState {
                posts: initial.results,
                next_page: normalize_cursor(initial.next_page),
            }),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Fetch the page behind the current cursor and append it.
    ///
    /// On failure the list and cursor are left as they were, so the call can
    /// simply be retried.
    pub async fn load_more(&self) -> Result<LoadOutcome, PaginationError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return Ok(LoadOutcome::InFlight);
        }
        let _guard = InFlightGuard(&self.in_flight);

        let Some(cursor) = self.state.read().await.next_page.clone() else {
            return Ok(LoadOutcome::Exhausted);
        };

        let page = self.source.fetch_page(&cursor).await?;
        let appended = page.results.len();

        let mut state = self.state.write().await;
        state.posts.extend(page.results);
        state.next_page = normalize_cursor(page.next_page);
        tracing::debug!(appended, total = state.posts.len(), "loaded next page of posts");

        Ok(LoadOutcome::Appended(appended))
    }

    /// Keep loading until the cursor runs out or `max_pages` extra pages were
    /// fetched. Returns how many pages were fetched.
    pub async fn load_all(&self, max_pages: Option<usize>) -> Result<usize, PaginationError> {
        let mut pages = 0;
        while max_pages.map_or(true, |limit| pages < limit) {
            match self.load_more().await? {
                LoadOutcome::Appended(_) => pages += 1,
                LoadOutcome::Exhausted | LoadOutcome::InFlight => break,
            }
        }
        Ok(pages)
    }

    /// Whether a cursor is left to follow.
    pub async fn has_more(&self) -> bool {
        self.state.read().await.next_page.is_some()
    }

    /// Summaries loaded so far.
    pub async fn len(&self) -> usize {
        self.state.read().await.posts.len()
    }

    /// True before any summary was loaded.
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.posts.is_empty()
    }

    /// Everything loaded so far together with the current cursor.
    pub async fn snapshot(&self) -> PostPage {
        let state = self.state.read().await;
        PostPage {
            results: state.posts.clone(),
            next_page: state.next_page.clone(),
        }
    }

    /// Consume the paginator, keeping the loaded posts and cursor.
    pub fn into_page(self) -> PostPage {
        let state = self.state.into_inner();
        PostPage {
            results: state.posts,
            next_page: state.next_page,
        }
    }
}
