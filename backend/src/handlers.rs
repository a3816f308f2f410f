use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use spacetraveling_shared::{
    pagination::Paginator, rich_text::escape_html, AdjacentPosts, PostPage,
};

use crate::{
    error::{ApiError, PageError},
    preview::PreviewMode,
    render::{self, PageContext},
    state::AppState,
};

/// Page size used when walking every post for the sitemap.
const SITEMAP_PAGE_SIZE: u32 = 100;
const SITEMAP_MAX_PAGES: usize = 50;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct CursorQuery {
    #[serde(default)]
    pub cursor: Option<String>,
}

fn page_context<'a>(
    state: &'a AppState,
    preview: &'a PreviewMode,
    current_path: &'a str,
) -> PageContext<'a> {
    PageContext {
        toolbar_repository: Some(state.config.prismic_repository.as_str()),
        preview,
        current_path,
    }
}

fn html_response(html: &str, preview: &PreviewMode) -> Response {
    let cache_control = if preview.is_previewing() {
        "private, no-store"
    } else {
        "public, max-age=0, must-revalidate"
    };
    (
        StatusCode::OK,
        [(header::CACHE_CONTROL, cache_control)],
        Html(html.to_string()),
    )
        .into_response()
}

fn cached(state: &AppState, preview: &PreviewMode, path: &str) -> Option<Arc<str>> {
    if preview.is_previewing() {
        return None;
    }
    let html = state.page_cache.get(path)?;
    tracing::debug!(path, "page cache hit");
    Some(html)
}

fn remember(state: &AppState, preview: &PreviewMode, path: &str, html: &str) {
    if !preview.is_previewing() {
        state.page_cache.insert(path, html);
    }
}

/// GET /
pub async fn home(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, PageError> {
    let preview = state.preview_signer.preview_mode(&headers);
    if let Some(html) = cached(&state, &preview, "/") {
        return Ok(html_response(&html, &preview));
    }

    let page = state
        .cms
        .query_posts(state.config.posts_page_size, preview.reference())
        .await
        .map_err(|err| PageError::from(err).in_mode(&preview, "/"))?;
    tracing::debug!(posts = page.results.len(), has_more = page.next_page.is_some(), "home page loaded");

    let html = render::home_page(&page_context(&state, &preview, "/"), &page);
    remember(&state, &preview, "/", &html);
    Ok(html_response(&html, &preview))
}

/// GET /post/:slug
pub async fn post_page(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    headers: HeaderMap,
) -> Result<Response, PageError> {
    let preview = state.preview_signer.preview_mode(&headers);
    let path = format!("/post/{}", urlencoding::encode(&slug));
    if let Some(html) = cached(&state, &preview, &path) {
        return Ok(html_response(&html, &preview));
    }

    let post = state
        .cms
        .get_post_by_uid(&slug, preview.reference())
        .await
        .map_err(|err| PageError::from(err).in_mode(&preview, &path))?;
    let adjacent = match state.cms.adjacent_posts(&post.id, preview.reference()).await {
        Ok(adjacent) => adjacent,
        Err(err) => {
            tracing::warn!(uid = %post.uid, error = %err, "failed to load adjacent posts");
            AdjacentPosts::default()
        },
    };

    let html = render::post_page(
        &page_context(&state, &preview, &path),
        &post,
        &adjacent,
        state.comments.as_ref(),
    );
    remember(&state, &preview, &path, &html);
    Ok(html_response(&html, &preview))
}

/// GET /api/posts?cursor=
///
/// Follows a `next_page` cursor for the "load more" button.
pub async fn list_posts_page(
    State(state): State<AppState>,
    Query(query): Query<CursorQuery>,
) -> Result<Json<PostPage>, ApiError> {
    let cursor = query
        .cursor
        .as_deref()
        .map(str::trim)
        .filter(|cursor| !cursor.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing cursor".to_string()))?;

    let page = state.cms.fetch_page(cursor).await?;
    Ok(Json(page))
}

/// GET /sitemap.xml
pub async fn sitemap_xml(State(state): State<AppState>) -> Response {
    let posts = match collect_published_posts(&state).await {
        Ok(page) => page.results,
        Err(err) => {
            tracing::warn!("sitemap: failed to list posts: {}", err);
            return (StatusCode::BAD_GATEWAY, "Failed to generate sitemap").into_response();
        },
    };

    let base = site_base(&state);
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
"#,
    );

    xml.push_str(&format!(
        "  <url>\n    <loc>{}/</loc>\n    <changefreq>daily</changefreq>\n  </url>\n",
        escape_html(base)
    ));

    for post in &posts {
        let loc = format!("{}/post/{}", base, urlencoding::encode(&post.uid));
        let lastmod = post
            .first_publication_date
            .map(|date| format!("\n    <lastmod>{}</lastmod>", date.format("%Y-%m-%d")))
            .unwrap_or_default();
        xml.push_str(&format!("  <url>\n    <loc>{}</loc>{}\n  </url>\n", escape_html(&loc), lastmod));
    }

    xml.push_str("</urlset>\n");

    (StatusCode::OK, [(header::CONTENT_TYPE, "application/xml; charset=utf-8")], xml)
        .into_response()
}

async fn collect_published_posts(state: &AppState) -> anyhow::Result<PostPage> {
    let first = state.cms.query_posts(SITEMAP_PAGE_SIZE, None).await?;
    let paginator = Paginator::new(state.cms.clone(), first);
    let loaded = paginator.load_all(Some(SITEMAP_MAX_PAGES)).await?;
    if paginator.has_more().await {
        tracing::warn!(pages = loaded, "sitemap truncated at page limit");
    }
    Ok(paginator.into_page())
}

/// GET /robots.txt
pub async fn robots_txt(State(state): State<AppState>) -> Response {
    let body = format!("User-agent: *\nAllow: /\n\nSitemap: {}/sitemap.xml\n", site_base(&state));
    (StatusCode::OK, [(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response()
}

fn site_base(state: &AppState) -> &str {
    state.config.site_base_url.trim_end_matches('/')
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
    })
}
