//! Data model and content-source plumbing shared by the Spacetraveling
//! server and CLI.

pub mod cms;
pub mod date_format;
pub mod pagination;
pub mod reading_time;
pub mod rich_text;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use rich_text::RichTextBlock;

/// A post as listed on the home page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSummary {
    /// Slug used in `/post/{uid}`.
    pub uid: String,
    /// `None` for documents that were never published.
    pub first_publication_date: Option<DateTime<Utc>>,
    /// Post title.
    pub title: String,
    /// One-line teaser under the title.
    pub subtitle: String,
    /// Author display name.
    pub author: String,
}

/// A full post with its body sections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostDetail {
    /// CMS document id, used to look up neighbouring posts.
    pub id: String,
    /// Slug used in `/post/{uid}`.
    pub uid: String,
    /// First publication, shown next to the author.
    pub first_publication_date: Option<DateTime<Utc>>,
    /// Latest edit, shown as "editado em" when it differs from the first one.
    pub last_publication_date: Option<DateTime<Utc>>,
    /// Post title.
    pub title: String,
    /// One-line teaser under the title.
    pub subtitle: String,
    /// Banner image, absent when the document has none.
    pub banner_url: Option<String>,
    /// Author display name.
    pub author: String,
    /// Body sections in document order.
    pub content: Vec<PostSection>,
}

impl PostDetail {
    /// Estimated reading time in whole minutes.
    pub fn reading_time(&self) -> u32 {
        reading_time::estimate_reading_time(&self.content)
    }
}

/// One `{ heading, body }` group of a post body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSection {
    /// Plain-text heading, empty when the section has none.
    #[serde(default)]
    pub heading: String,
    /// Rich-text blocks under the heading.
    #[serde(default)]
    pub body: Vec<RichTextBlock>,
}

/// A page of post summaries plus the cursor of the following page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostPage {
    /// Posts in CMS order.
    pub results: Vec<PostSummary>,
    /// URL of the next page, `None` on the last one.
    pub next_page: Option<String>,
}

/// Link to a neighbouring post on the detail page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostNavigation {
    /// Target post uid.
    pub slug: String,
    /// Target post title.
    pub title: String,
}

/// Previous/next links shown under a post.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdjacentPosts {
    /// The next older post.
    pub previous: Option<PostNavigation>,
    /// The next newer post.
    pub next: Option<PostNavigation>,
}
