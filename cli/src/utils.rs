//! Helpers shared by the subcommands.

use anyhow::Result;
use serde::Serialize;
use spacetraveling_shared::{
    cms::CmsClient,
    date_format::{format_optional_post_date, format_post_date},
    pagination::{PageSource, Paginator},
    AdjacentPosts, PostDetail, PostNavigation, PostPage,
};

/// Pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Load the first page of posts and keep following cursors until they run
/// out or `max_pages` pages (the first one included) were read.
pub async fn collect_posts(
    client: &CmsClient,
    page_size: u32,
    max_pages: Option<usize>,
) -> Result<PostPage> {
    let first = client.query_posts(page_size.max(1), None).await?;
    follow_cursors(client.clone(), first, max_pages).await
}

/// Follow cursors from `first`. `max_pages` counts the first page.
pub async fn follow_cursors<S: PageSource>(
    source: S,
    first: PostPage,
    max_pages: Option<usize>,
) -> Result<PostPage> {
    let paginator = Paginator::new(source, first);
    let extra_pages = max_pages.map(|pages| pages.saturating_sub(1));
    let loaded = paginator.load_all(extra_pages).await?;
    tracing::info!(pages = loaded + 1, posts = paginator.len().await, "collected posts");
    Ok(paginator.into_page())
}

/// What `get-post` prints.
#[derive(Debug, Serialize)]
pub struct PostReport {
    /// Post slug.
    pub uid: String,
    /// Post title.
    pub title: String,
    /// Post subtitle.
    pub subtitle: String,
    /// Author name.
    pub author: String,
    /// Banner image URL.
    pub banner_url: Option<String>,
    /// pt-BR date, empty when unpublished.
    pub first_publication_date: String,
    /// pt-BR date of the last edit.
    pub edited_at: Option<String>,
    /// Estimated minutes.
    pub reading_time_minutes: u32,
    /// Estimate as displayed, e.g. `4 min`.
    pub reading_time: String,
    /// Number of body sections.
    pub sections: usize,
    /// Next older post.
    pub previous: Option<PostNavigation>,
    /// Next newer post.
    pub next: Option<PostNavigation>,
}

/// Flatten a post and its neighbours for display.
pub fn post_report(post: &PostDetail, adjacent: AdjacentPosts) -> PostReport {
    let minutes = post.reading_time();
    PostReport {
        uid: post.uid.clone(),
        title: post.title.clone(),
        subtitle: post.subtitle.clone(),
        author: post.author.clone(),
        banner_url: post.banner_url.clone(),
        first_publication_date: format_optional_post_date(post.first_publication_date.as_ref()),
        edited_at: post.last_publication_date.as_ref().map(format_post_date),
        reading_time_minutes: minutes,
        reading_time: format!("{minutes} min"),
        sections: post.content.len(),
        previous: adjacent.previous,
        next: adjacent.next,
    }
}
