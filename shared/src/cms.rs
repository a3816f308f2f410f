//! Client for the headless CMS (Prismic REST API v2 shape).
//!
//! Responses are decoded into explicit schemas. Anything that does not match
//! fails with [`CmsError::Parse`] instead of being passed through loosely.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use tokio::sync::RwLock;
use url::Url;

use crate::{
    date_format::parse_cms_timestamp, AdjacentPosts, PostDetail, PostNavigation, PostPage,
    PostSection, PostSummary, RichTextBlock,
};

/// Document type holding blog posts.
pub const POST_TYPE: &str = "post";
/// Field projection used by list queries.
pub const POST_SUMMARY_FIELDS: &[&str] = &["post.title", "post.subtitle", "post.author", "post.banner"];
const MASTER_REF_TTL: Duration = Duration::from_secs(5);

/// Failures talking to the CMS.
#[derive(Debug, thiserror::Error)]
pub enum CmsError {
    /// The configured endpoint is not an absolute URL.
    #[error("invalid CMS endpoint: {0}")]
    InvalidEndpoint(String),

    /// Transport failure or timeout.
    #[error("CMS request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-2xx answer.
    #[error("CMS responded with status {status} for {url}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Request URL with the access token redacted.
        url: String,
    },

    /// The body did not match the expected schema.
    #[error("unexpected CMS response shape ({context}): {message}")]
    Parse {
        /// What was being decoded.
        context: String,
        /// Decoder message.
        message: String,
    },

    /// The preview token was rejected or resolved to nothing.
    #[error("invalid preview token")]
    InvalidToken,

    /// No post with this uid.
    #[error("document not found: {0}")]
    NotFound(String),

    /// A cursor pointing somewhere other than the CMS.
    #[error("pagination cursor is not on the CMS origin: {0}")]
    InvalidCursor(String),
}

impl CmsError {
    fn parse(context: impl Into<String>, message: impl ToString) -> Self {
        Self::Parse {
            context: context.into(),
            message: message.to_string(),
        }
    }
}

/// Connection settings for [`CmsClient`].
#[derive(Debug, Clone)]
pub struct CmsConfig {
    /// API root, e.g. `https://spacetraveling.cdn.prismic.io/api/v2`.
    pub endpoint: String,
    /// Token for private repositories. Never leaves the server.
    pub access_token: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

// ---------------------------------------------------------------------------
// Wire schema
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ApiMetadata {
    refs: Vec<ApiRef>,
}

#[derive(Debug, Deserialize)]
struct ApiRef {
    #[serde(rename = "ref")]
    reference: String,
    #[serde(rename = "isMasterRef", default)]
    is_master_ref: bool,
}

/// One page of `documents/search`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    /// 1-based page number.
    #[serde(default)]
    pub page: u32,
    /// Requested page size.
    #[serde(default)]
    pub results_per_page: u32,
    /// Matches across all pages.
    #[serde(default)]
    pub total_results_size: u32,
    /// Number of pages.
    #[serde(default)]
    pub total_pages: u32,
    /// Absolute URL of the next page.
    #[serde(default)]
    pub next_page: Option<String>,
    /// Absolute URL of the previous page.
    #[serde(default)]
    pub prev_page: Option<String>,
    /// Documents on this page.
    pub results: Vec<CmsDocument>,
}

/// A raw CMS document. `data` is decoded per document type.
#[derive(Debug, Clone, Deserialize)]
pub struct CmsDocument {
    /// Stable document id.
    pub id: String,
    /// Human-readable slug, only on types that define one.
    #[serde(default)]
    pub uid: Option<String>,
    /// Custom type name, `post` for blog posts.
    #[serde(rename = "type")]
    pub kind: String,
    /// ISO timestamp as sent by the CMS.
    #[serde(default)]
    pub first_publication_date: Option<String>,
    /// ISO timestamp as sent by the CMS.
    #[serde(default)]
    pub last_publication_date: Option<String>,
    /// Type-specific fields.
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Deserialize)]
struct SummaryFields {
    title: String,
    #[serde(default)]
    subtitle: Option<String>,
    #[serde(default)]
    author: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DetailFields {
    title: String,
    #[serde(default)]
    subtitle: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    banner: Option<ImageField>,
    #[serde(default)]
    content: Vec<ContentGroup>,
}

#[derive(Debug, Deserialize)]
struct NavigationFields {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ImageField {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentGroup {
    #[serde(default)]
    heading: Option<String>,
    #[serde(default)]
    body: Vec<RichTextBlock>,
}

impl CmsDocument {
    fn post_fields<T: DeserializeOwned>(&self) -> Result<T, CmsError> {
        serde_json::from_value(self.data.clone())
            .map_err(|err| CmsError::parse(format!("document {} data", self.id), err))
    }

    fn require_uid(&self) -> Result<String, CmsError> {
        self.uid
            .clone()
            .filter(|uid| !uid.is_empty())
            .ok_or_else(|| CmsError::parse(format!("document {}", self.id), "missing uid"))
    }

    /// Decode a post for the list page.
    pub fn to_summary(&self) -> Result<PostSummary, CmsError> {
        let fields: SummaryFields = self.post_fields()?;
        Ok(PostSummary {
            uid: self.require_uid()?,
            first_publication_date: self
                .first_publication_date
                .as_deref()
                .and_then(parse_cms_timestamp),
            title: fields.title,
            subtitle: fields.subtitle.unwrap_or_default(),
            author: fields.author.unwrap_or_default(),
        })
    }

    /// Decode a post with its full body.
    pub fn to_detail(&self) -> Result<PostDetail, CmsError> {
        let fields: DetailFields = self.post_fields()?;
        Ok(PostDetail {
            id: self.id.clone(),
            uid: self.require_uid()?,
            first_publication_date: self
                .first_publication_date
                .as_deref()
                .and_then(parse_cms_timestamp),
            last_publication_date: self
                .last_publication_date
                .as_deref()
                .and_then(parse_cms_timestamp),
            title: fields.title,
            subtitle: fields.subtitle.unwrap_or_default(),
            banner_url: fields.banner.and_then(|banner| banner.url),
            author: fields.author.unwrap_or_default(),
            content: fields
                .content
                .into_iter()
                .map(|group| PostSection {
                    heading: group.heading.unwrap_or_default(),
                    body: group.body,
                })
                .collect(),
        })
    }

    fn to_navigation(&self) -> Result<PostNavigation, CmsError> {
        let fields: NavigationFields = self.post_fields()?;
        Ok(PostNavigation {
            slug: self.require_uid()?,
            title: fields.title,
        })
    }
}

impl SearchResponse {
    /// Decode every result as a summary. The cursor keeps its CMS URL but
    /// loses the access token.
    pub fn into_post_page(self) -> Result<PostPage, CmsError> {
        let results = self
            .results
            .iter()
            .map(CmsDocument::to_summary)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PostPage {
            results,
            next_page: self
                .next_page
                .filter(|cursor| !cursor.is_empty())
                .map(strip_access_token),
        })
    }
}

/// Route of a document on this site.
pub fn resolve_link(document: &CmsDocument) -> String {
    match document.uid.as_deref() {
        Some(uid) if document.kind == POST_TYPE && !uid.is_empty() => {
            format!("/post/{}", urlencode_path_segment(uid))
        },
        _ => "/".to_string(),
    }
}

fn urlencode_path_segment(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

// ---------------------------------------------------------------------------
// Query builder
// ---------------------------------------------------------------------------

/// Parameters of a `documents/search` call.
#[derive(Debug, Clone, Default)]
pub struct DocumentQuery {
    predicates: Vec<String>,
    page_size: Option<u32>,
    fetch: Vec<String>,
    orderings: Option<String>,
    after: Option<String>,
    reference: Option<String>,
}

impl DocumentQuery {
    /// `at(path, "value")` predicate.
    pub fn at(path: &str, value: &str) -> Self {
        Self::default().and_at(path, value)
    }

    /// Add another `at` predicate; all predicates must match.
    pub fn and_at(mut self, path: &str, value: &str) -> Self {
        let value = serde_json::to_string(value).unwrap_or_else(|_| format!("\"{value}\""));
        self.predicates.push(format!("[at({path},{value})]"));
        self
    }

    /// Results per page, at least 1.
    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size.max(1));
        self
    }

    /// Restrict `data` to these `type.field` paths.
    pub fn fetch(mut self, fields: &[&str]) -> Self {
        self.fetch = fields.iter().map(|field| field.to_string()).collect();
        self
    }

    /// Raw `orderings` value, e.g. `[document.first_publication_date desc]`.
    pub fn orderings(mut self, orderings: &str) -> Self {
        self.orderings = Some(orderings.to_string());
        self
    }

    /// Start after this document id in the given ordering.
    pub fn after(mut self, document_id: &str) -> Self {
        self.after = Some(document_id.to_string());
        self
    }

    /// Pin the query to a ref (a preview token). Without one the master ref
    /// is used.
    pub fn reference(mut self, reference: Option<&str>) -> Self {
        self.reference = reference.map(str::to_string);
        self
    }

    fn q(&self) -> String {
        format!("[{}]", self.predicates.concat())
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Cheaply cloneable CMS client. Clones share the HTTP pool and the cached
/// master ref.
#[derive(Clone)]
pub struct CmsClient {
    inner: Arc<CmsClientInner>,
}

struct CmsClientInner {
    endpoint: Url,
    search_url: Url,
    access_token: Option<String>,
    client: reqwest::Client,
    master_ref: RwLock<Option<(String, Instant)>>,
}

impl CmsClient {
    /// Validate the endpoint and build the HTTP client.
    pub fn new(config: CmsConfig) -> Result<Self, CmsError> {
        let endpoint = Url::parse(config.endpoint.trim())
            .map_err(|err| CmsError::InvalidEndpoint(format!("{}: {err}", config.endpoint)))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(CmsError::InvalidEndpoint(config.endpoint));
        }

        let mut search_url = endpoint.clone();
        search_url
            .path_segments_mut()
            .map_err(|_| CmsError::InvalidEndpoint(config.endpoint.clone()))?
            .pop_if_empty()
            .extend(["documents", "search"]);

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(CmsClientInner {
                endpoint,
                search_url,
                access_token: config.access_token.filter(|token| !token.trim().is_empty()),
                client,
                master_ref: RwLock::new(None),
            }),
        })
    }

    /// The configured API root.
    pub fn endpoint(&self) -> &Url {
        &self.inner.endpoint
    }

    /// Whether `cursor` points at the same origin as the API endpoint.
    pub fn is_cursor_on_origin(&self, cursor: &str) -> bool {
        Url::parse(cursor)
            .map(|url| url.origin() == self.inner.endpoint.origin())
            .unwrap_or(false)
    }

    /// Current master ref, cached for a few seconds.
    pub async fn master_ref(&self) -> Result<String, CmsError> {
        if let Some((reference, fetched_at)) = self.inner.master_ref.read().await.as_ref() {
            if fetched_at.elapsed() < MASTER_REF_TTL {
                return Ok(reference.clone());
            }
        }

        let mut url = self.inner.endpoint.clone();
        self.append_access_token(&mut url);
        let metadata: ApiMetadata = self.get_json(url, "api metadata").await?;
        let reference = metadata
            .refs
            .into_iter()
            .find(|item| item.is_master_ref)
            .map(|item| item.reference)
            .ok_or_else(|| CmsError::parse("api metadata", "no master ref"))?;

        *self.inner.master_ref.write().await = Some((reference.clone(), Instant::now()));
        Ok(reference)
    }

    /// Run a search against the query's ref, or the master ref.
    pub async fn query(&self, query: &DocumentQuery) -> Result<SearchResponse, CmsError> {
        let reference = match query.reference.as_deref() {
            Some(reference) => reference.to_string(),
            None => self.master_ref().await?,
        };

        let mut url = self.inner.search_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("ref", &reference);
            pairs.append_pair("q", &query.q());
            if let Some(page_size) = query.page_size {
                pairs.append_pair("pageSize", &page_size.to_string());
            }
            if !query.fetch.is_empty() {
                pairs.append_pair("fetch", &query.fetch.join(","));
            }
            if let Some(orderings) = query.orderings.as_deref() {
                pairs.append_pair("orderings", orderings);
            }
            if let Some(after) = query.after.as_deref() {
                pairs.append_pair("after", after);
            }
        }
        self.append_access_token(&mut url);

        self.get_json(url, "documents/search").await
    }

    /// First page of posts for the home page.
    pub async fn query_posts(
        &self,
        page_size: u32,
        reference: Option<&str>,
    ) -> Result<PostPage, CmsError> {
        let query = DocumentQuery::at("document.type", POST_TYPE)
            .fetch(POST_SUMMARY_FIELDS)
            .page_size(page_size)
            .reference(reference);
        self.query(&query).await?.into_post_page()
    }

    /// Follow a `next_page` cursor returned by an earlier query.
    pub async fn fetch_page(&self, cursor: &str) -> Result<PostPage, CmsError> {
        if !self.is_cursor_on_origin(cursor) {
            return Err(CmsError::InvalidCursor(cursor.to_string()));
        }
        let mut url =
            Url::parse(cursor).map_err(|_| CmsError::InvalidCursor(cursor.to_string()))?;
        if !url.query_pairs().any(|(key, _)| key == "access_token") {
            self.append_access_token(&mut url);
        }
        let response: SearchResponse = self.get_json(url, "next page").await?;
        response.into_post_page()
    }

    /// A single post by slug; [`CmsError::NotFound`] when there is none.
    pub async fn get_post_by_uid(
        &self,
        uid: &str,
        reference: Option<&str>,
    ) -> Result<PostDetail, CmsError> {
        let query = DocumentQuery::at("document.type", POST_TYPE)
            .and_at(&format!("my.{POST_TYPE}.uid"), uid)
            .page_size(1)
            .reference(reference);
        let response = self.query(&query).await?;
        match response.results.first() {
            Some(document) => document.to_detail(),
            None => Err(CmsError::NotFound(uid.to_string())),
        }
    }

    /// Older and newer neighbours of a post by first publication date.
    pub async fn adjacent_posts(
        &self,
        document_id: &str,
        reference: Option<&str>,
    ) -> Result<AdjacentPosts, CmsError> {
        let neighbour = |orderings: &'static str| {
            DocumentQuery::at("document.type", POST_TYPE)
                .fetch(&["post.title"])
                .page_size(1)
                .orderings(orderings)
                .after(document_id)
                .reference(reference)
        };
        let older = neighbour("[document.first_publication_date desc]");
        let newer = neighbour("[document.first_publication_date]");

        let (older, newer) = tokio::try_join!(self.query(&older), self.query(&newer))?;

        Ok(AdjacentPosts {
            previous: older
                .results
                .first()
                .map(CmsDocument::to_navigation)
                .transpose()?,
            next: newer
                .results
                .first()
                .map(CmsDocument::to_navigation)
                .transpose()?,
        })
    }

    /// Resolve a preview token and document id to the page that shows the
    /// previewed revision.
    pub async fn resolve_preview(&self, token: &str, document_id: &str) -> Result<String, CmsError> {
        let token = token.trim();
        let document_id = document_id.trim();
        if token.is_empty() || document_id.is_empty() {
            return Err(CmsError::InvalidToken);
        }

        let query = DocumentQuery::at("document.id", document_id)
            .page_size(1)
            .reference(Some(token));
        let response = match self.query(&query).await {
            Ok(response) => response,
            Err(CmsError::Status {
                status,
                url,
            }) => {
                tracing::warn!(status, %url, "preview token rejected by CMS");
                return Err(CmsError::InvalidToken);
            },
            Err(err) => return Err(err),
        };

        Ok(response
            .results
            .first()
            .map(resolve_link)
            .unwrap_or_else(|| "/".to_string()))
    }

    fn append_access_token(&self, url: &mut Url) {
        if let Some(token) = self.inner.access_token.as_deref() {
            url.query_pairs_mut().append_pair("access_token", token);
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, context: &str) -> Result<T, CmsError> {
        tracing::debug!(%url, "cms request");
        let response = self.inner.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CmsError::Status {
                status: status.as_u16(),
                url: redact_access_token(&url),
            });
        }
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|err| CmsError::parse(context, err))
    }
}

/// Cursors are handed to browsers, so the server-side token is removed.
/// [`CmsClient::fetch_page`] adds it back when the cursor is followed.
fn strip_access_token(cursor: String) -> String {
    let Ok(mut url) = Url::parse(&cursor) else {
        return cursor;
    };
    if !url.query_pairs().any(|(key, _)| key == "access_token") {
        return cursor;
    }
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "access_token")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    if pairs.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(pairs);
    }
    url.to_string()
}

fn redact_access_token(url: &Url) -> String {
    let mut redacted = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(key, value)| {
            if key == "access_token" {
                (key.into_owned(), "***".to_string())
            } else {
                (key.into_owned(), value.into_owned())
            }
        })
        .collect();
    if pairs.is_empty() {
        return redacted.to_string();
    }
    redacted.query_pairs_mut().clear().extend_pairs(pairs);
    redacted.to_string()
}
