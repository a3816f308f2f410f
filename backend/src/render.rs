//! Server-side HTML for the blog pages.

use spacetraveling_shared::{
    date_format::format_optional_post_date,
    rich_text::{as_html, escape_attr, escape_html},
    AdjacentPosts, PostDetail, PostPage, PostSummary,
};

use crate::{comments::CommentsEmbed, preview::PreviewMode};

const SITE_NAME: &str = "Spacetraveling";

const BASE_CSS: &str = r#"
:root { --white: #fff; --info: #bbbbbb; --highlight: #ff57b2; --background: #1a1d23; --body: #d7d7d7; --heading: #f8f8f8; }
* { margin: 0; padding: 0; box-sizing: border-box; }
body { background: var(--background); color: var(--body); font-family: 'Inter', sans-serif; }
a { color: inherit; text-decoration: none; }
.sr-only { position: absolute; width: 1px; height: 1px; overflow: hidden; clip: rect(0, 0, 0, 0); }
.container { max-width: 1120px; margin: 0 auto; padding: 0 2rem; }
.header { max-width: 700px; margin: 0 auto; padding: 5rem 0 3rem; }
.main-content { max-width: 700px; margin: 0 auto; padding-bottom: 5rem; }
.post { display: block; margin-bottom: 3rem; }
.post h3 { color: var(--heading); font-size: 1.75rem; }
.post p { margin: 0.5rem 0 1.5rem; }
.post-metadata, .post-header-metadata { display: flex; gap: 1.5rem; color: var(--info); font-size: 0.875rem; }
.post-metadata svg, .post-header-metadata svg { margin-right: 0.5rem; vertical-align: middle; }
.load-more { background: none; border: 0; color: var(--highlight); font-size: 1.125rem; font-weight: 600; cursor: pointer; }
.load-more:disabled { opacity: 0.6; cursor: progress; }
.hero-image img { width: 100%; max-height: 400px; object-fit: cover; }
.post-content header h1 { color: var(--heading); font-size: 3rem; margin: 5rem 0 1.5rem; }
.post-content .edited { display: block; margin-top: 1rem; font-style: italic; color: var(--info); font-size: 0.875rem; }
.post-content section { margin-top: 4rem; line-height: 1.8; }
.post-content section h2 { color: var(--heading); margin-bottom: 2rem; }
.post-content section p + p { margin-top: 1.5rem; }
.post-navigation { display: flex; justify-content: space-between; margin: 4rem 0 3rem; padding-top: 3rem; border-top: 1px solid #383f49; }
.post-navigation a { display: flex; flex-direction: column; color: var(--highlight); }
.post-navigation a span { color: var(--heading); }
.post-navigation a.next { margin-left: auto; text-align: right; }
.quit-preview { margin-top: 3rem; }
.quit-preview a { display: block; padding: 1rem; border-radius: 8px; background: #253455; color: var(--white); text-align: center; }
.error-page { max-width: 700px; margin: 0 auto; padding: 5rem 0; }
"#;

const ICON_CALENDAR: &str = r#"<svg width="20" height="20" viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2"><rect x="3" y="4" width="18" height="18" rx="2" ry="2"/><line x1="16" y1="2" x2="16" y2="6"/><line x1="8" y1="2" x2="8" y2="6"/><line x1="3" y1="10" x2="21" y2="10"/></svg>"#;
const ICON_USER: &str = r#"<svg width="20" height="20" viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2"><path d="M20 21v-2a4 4 0 0 0-4-4H8a4 4 0 0 0-4 4v2"/><circle cx="12" cy="7" r="4"/></svg>"#;
const ICON_CLOCK: &str = r#"<svg width="20" height="20" viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2"><circle cx="12" cy="12" r="10"/><polyline points="12 6 12 12 16 14"/></svg>"#;

/// Client side of "load more": one request at a time, the button disappears
/// once the cursor runs out and turns into a retry on failure.
const LOAD_MORE_SCRIPT: &str = r#"
(function () {
  var button = document.querySelector('button.load-more');
  var list = document.querySelector('section.posts');
  if (!button || !list) return;
  var months = ['jan', 'fev', 'mar', 'abr', 'mai', 'jun', 'jul', 'ago', 'set', 'out', 'nov', 'dez'];
  function formatDate(value) {
    if (!value) return '';
    var date = new Date(value);
    if (isNaN(date.getTime())) return '';
    var day = String(date.getUTCDate()).padStart(2, '0');
    return day + ' ' + months[date.getUTCMonth()] + ' ' + date.getUTCFullYear();
  }
  function el(tag, className, text) {
    var node = document.createElement(tag);
    if (className) node.className = className;
    if (text) node.textContent = text;
    return node;
  }
  function card(post) {
    var link = el('a', 'post');
    link.href = '/post/' + encodeURIComponent(post.uid);
    link.appendChild(el('h3', null, post.title));
    link.appendChild(el('p', null, post.subtitle));
    var meta = el('div', 'post-metadata');
    meta.appendChild(el('time', null, formatDate(post.first_publication_date)));
    meta.appendChild(el('span', null, post.author));
    link.appendChild(meta);
    return link;
  }
  button.addEventListener('click', function () {
    var cursor = button.getAttribute('data-next-page');
    if (!cursor || button.disabled) return;
    button.disabled = true;
    fetch('/api/posts?cursor=' + encodeURIComponent(cursor))
      .then(function (response) {
        if (!response.ok) throw new Error('HTTP ' + response.status);
        return response.json();
      })
      .then(function (page) {
        page.results.forEach(function (post) { list.appendChild(card(post)); });
        if (page.next_page) {
          button.setAttribute('data-next-page', page.next_page);
          button.textContent = 'Carregar mais posts';
          button.disabled = false;
        } else {
          button.remove();
        }
      })
      .catch(function () {
        button.textContent = 'Falha ao carregar. Tentar novamente';
        button.disabled = false;
      });
  });
})();
"#;

/// Per-request rendering inputs shared by every page.
pub struct PageContext<'a> {
    pub toolbar_repository: Option<&'a str>,
    pub preview: &'a PreviewMode,
    /// Path of the page being rendered, used to return here after leaving
    /// preview mode.
    pub current_path: &'a str,
}

fn layout(title: &str, toolbar_repository: Option<&str>, body: &str) -> String {
    let toolbar = toolbar_repository
        .map(|repo| {
            format!(
                r#"<script async defer src="//static.cdn.prismic.io/prismic.js?repo={}&amp;new=true"></script>"#,
                escape_attr(&urlencoding::encode(repo))
            )
        })
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="pt-BR">
<head>
<meta charset="utf-8" />
<meta name="viewport" content="width=device-width, initial-scale=1" />
<title>{title}</title>
<link rel="preconnect" href="https://fonts.googleapis.com" />
<link rel="preconnect" href="https://fonts.gstatic.com" crossorigin="true" />
<link href="https://fonts.googleapis.com/css2?family=Inter:wght@400;600;700&amp;display=swap" rel="stylesheet" />
{toolbar}
<style>{css}</style>
</head>
<body>
{header}
{body}
</body>
</html>"#,
        title = escape_html(title),
        toolbar = toolbar,
        css = BASE_CSS,
        header = site_header(),
        body = body,
    )
}

fn site_header() -> String {
    r#"<div class="container"><header class="header"><a href="/"><img src="/Logo.svg" alt="logo" width="239" height="27" /></a></header></div>"#
        .to_string()
}

fn exit_preview_link(current_path: &str) -> String {
    format!(
        r#"<aside class="quit-preview"><a href="/api/exit-preview?currentUrl={}">Sair do modo preview</a></aside>"#,
        escape_attr(&urlencoding::encode(current_path))
    )
}

fn preview_banner(ctx: &PageContext<'_>) -> String {
    if !ctx.preview.is_previewing() {
        return String::new();
    }
    exit_preview_link(ctx.current_path)
}

fn post_card(post: &PostSummary) -> String {
    format!(
        r#"<a class="post" href="/post/{uid}"><h3>{title}</h3><p>{subtitle}</p><div class="post-metadata"><time>{calendar}{date}</time><span>{user}{author}</span></div></a>"#,
        uid = escape_attr(&urlencoding::encode(&post.uid)),
        title = escape_html(&post.title),
        subtitle = escape_html(&post.subtitle),
        calendar = ICON_CALENDAR,
        date = escape_html(&format_optional_post_date(post.first_publication_date.as_ref())),
        user = ICON_USER,
        author = escape_html(&post.author),
    )
}

/// GET / body.
pub fn home_page(ctx: &PageContext<'_>, page: &PostPage) -> String {
    let cards: String = page.results.iter().map(post_card).collect();
    let load_more = page
        .next_page
        .as_deref()
        .map(|cursor| {
            format!(
                r#"<button type="button" class="load-more" data-next-page="{}">Carregar mais posts</button>"#,
                escape_attr(cursor)
            )
        })
        .unwrap_or_default();

    let body = format!(
        r#"<main role="main" class="main-content">
<section class="posts"><h1 class="sr-only">Posts</h1>{cards}</section>
{load_more}
{preview}
</main>
<script>{script}</script>"#,
        cards = cards,
        load_more = load_more,
        preview = preview_banner(ctx),
        script = LOAD_MORE_SCRIPT,
    );
    layout(SITE_NAME, ctx.toolbar_repository, &body)
}

fn navigation(adjacent: &AdjacentPosts) -> String {
    let link = |slug: &str, title: &str, label: &str, class: &str| {
        format!(
            r#"<a class="{class}" href="/post/{slug}"><span>{title}</span>{label}</a>"#,
            class = class,
            slug = escape_attr(&urlencoding::encode(slug)),
            title = escape_html(title),
            label = label,
        )
    };
    let previous = adjacent
        .previous
        .as_ref()
        .map(|post| link(&post.slug, &post.title, "Post anterior", "previous"))
        .unwrap_or_default();
    let next = adjacent
        .next
        .as_ref()
        .map(|post| link(&post.slug, &post.title, "Próximo post", "next"))
        .unwrap_or_default();
    format!(r#"<nav class="post-navigation">{previous}{next}</nav>"#)
}

/// GET /post/{slug} body.
pub fn post_page(
    ctx: &PageContext<'_>,
    post: &PostDetail,
    adjacent: &AdjacentPosts,
    comments: Option<&CommentsEmbed>,
) -> String {
    let banner = post
        .banner_url
        .as_deref()
        .filter(|url| !url.is_empty())
        .map(|url| {
            format!(r#"<div class="hero-image"><img src="{}" alt="Hero" /></div>"#, escape_attr(url))
        })
        .unwrap_or_default();

    let sections: String = post
        .content
        .iter()
        .map(|section| {
            format!(
                "<section><h2>{}</h2><div>{}</div></section>",
                escape_html(&section.heading),
                as_html(&section.body)
            )
        })
        .collect();

    let edited = post
        .last_publication_date
        .as_ref()
        .map(|date| {
            format!(
                r#"<span class="edited">* editado em {}</span>"#,
                escape_html(&format_optional_post_date(Some(date)))
            )
        })
        .unwrap_or_default();

    let body = format!(
        r#"<main class="main-content">
<article class="post-content">
{banner}
<header>
<h1>{title}</h1>
<div class="post-header-metadata"><time>{calendar}{date}</time><span>{user}{author}</span><span>{clock}{reading_time} min</span></div>
{edited}
</header>
{sections}
</article>
{navigation}
{comments}
{preview}
</main>"#,
        banner = banner,
        title = escape_html(&post.title),
        calendar = ICON_CALENDAR,
        date = escape_html(&format_optional_post_date(post.first_publication_date.as_ref())),
        user = ICON_USER,
        author = escape_html(&post.author),
        clock = ICON_CLOCK,
        reading_time = post.reading_time(),
        edited = edited,
        sections = sections,
        navigation = navigation(adjacent),
        comments = comments.map(CommentsEmbed::render).unwrap_or_default(),
        preview = preview_banner(ctx),
    );

    layout(&format!("{SITE_NAME} | {}", post.title), ctx.toolbar_repository, &body)
}

/// Shown for slugs the CMS does not know (yet).
pub fn fallback_page() -> String {
    layout(
        SITE_NAME,
        None,
        r#"<main class="main-content"><div>Carregando...</div><p><a href="/">Voltar para a página inicial</a></p></main>"#,
    )
}

/// `exit_preview_path` adds the exit-preview link, so a stale preview ref
/// does not trap the visitor on this page.
pub fn error_page(message: &str, exit_preview_path: Option<&str>) -> String {
    let body = format!(
        r#"<main class="error-page"><h1>Algo deu errado</h1><p>{}</p><p><a href="/">Voltar para a página inicial</a></p>{}</main>"#,
        escape_html(message),
        exit_preview_path.map(exit_preview_link).unwrap_or_default()
    );
    layout(SITE_NAME, None, &body)
}

/// Client-side redirect issued after entering preview mode: a meta refresh
/// with a script fallback.
pub fn redirect_document(url: &str) -> String {
    let script_url = serde_json::to_string(url)
        .unwrap_or_else(|_| "\"/\"".to_string())
        .replace('<', "\\u003c");
    format!(
        r#"<!DOCTYPE html><html><head><meta http-equiv="Refresh" content="0; url={attr}" />
<script>window.location.href = {script}</script>
</head></html>"#,
        attr = escape_attr(url),
        script = script_url,
    )
}
