//! CMS rich-text blocks and their plain-text / HTML renderings.
//!
//! Span offsets count UTF-16 code units of the block text, the way the CMS
//! editor measures them. Spans that overlap without nesting are closed and
//! reopened so the emitted HTML is always well formed.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Block type as named by the CMS.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockKind {
    /// `<p>`
    #[default]
    Paragraph,
    /// `<h1>`
    Heading1,
    /// `<h2>`
    Heading2,
    /// `<h3>`
    Heading3,
    /// `<h4>`
    Heading4,
    /// `<h5>`
    Heading5,
    /// `<h6>`
    Heading6,
    /// `<pre>`, spans ignored.
    Preformatted,
    /// Item of a `<ul>`.
    ListItem,
    /// Item of an `<ol>`.
    OListItem,
    /// Picture with `url` and `alt`.
    Image,
    /// oEmbed payload.
    Embed,
    /// Any type this renderer does not know; rendered as a paragraph.
    #[serde(other)]
    Unknown,
}

/// One block of a rich-text field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichTextBlock {
    /// Block type.
    #[serde(rename = "type", default)]
    pub kind: BlockKind,
    /// Unformatted text of the block.
    #[serde(default)]
    pub text: String,
    /// Inline formatting over `text`.
    #[serde(default)]
    pub spans: Vec<RichTextSpan>,
    /// Image source for `image` blocks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Alternative text for `image` blocks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    /// Provider payload for `embed` blocks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oembed: Option<Value>,
}

impl RichTextBlock {
    /// Unformatted paragraph.
    pub fn paragraph(text: &str) -> Self {
        Self {
            kind: BlockKind::Paragraph,
            text: text.to_string(),
            spans: Vec::new(),
            url: None,
            alt: None,
            oembed: None,
        }
    }
}

/// Inline formatting kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpanKind {
    /// `<strong>`
    Strong,
    /// `<em>`
    Em,
    /// `<a>` with the URL from `data`.
    Hyperlink,
    /// Unsupported label; the text is kept, the markup dropped.
    #[serde(other)]
    Unknown,
}

/// Formatting over `[start, end)` of the block text, in UTF-16 units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichTextSpan {
    /// First covered unit.
    pub start: usize,
    /// One past the last covered unit.
    pub end: usize,
    /// Formatting kind.
    #[serde(rename = "type")]
    pub kind: SpanKind,
    /// Link target for hyperlinks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<SpanData>,
}

/// Hyperlink payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpanData {
    /// Link URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// `_blank` and friends.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

/// Escape text content.
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Escape a double- or single-quoted attribute value.
pub fn escape_attr(s: &str) -> String {
    escape_html(s).replace('"', "&quot;").replace('\'', "&#39;")
}

/// Block texts joined with a single space.
pub fn as_text(blocks: &[RichTextBlock]) -> String {
    blocks
        .iter()
        .map(|block| block.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// HTML for a rich-text field. Consecutive list items share one list.
pub fn as_html(blocks: &[RichTextBlock]) -> String {
    let mut html = String::new();
    let mut open_list: Option<BlockKind> = None;

    for block in blocks {
        let list_kind = match block.kind {
            BlockKind::ListItem | BlockKind::OListItem => Some(block.kind),
            _ => None,
        };
        if open_list != list_kind {
            if let Some(kind) = open_list.take() {
                html.push_str(list_close_tag(kind));
            }
            if let Some(kind) = list_kind {
                html.push_str(list_open_tag(kind));
                open_list = Some(kind);
            }
        }
        html.push_str(&render_block(block));
    }
    if let Some(kind) = open_list {
        html.push_str(list_close_tag(kind));
    }

    html
}

fn list_open_tag(kind: BlockKind) -> &'static str {
    if kind == BlockKind::OListItem {
        "<ol>"
    } else {
        "<ul>"
    }
}

fn list_close_tag(kind: BlockKind) -> &'static str {
    if kind == BlockKind::OListItem {
        "</ol>"
    } else {
        "</ul>"
    }
}

fn render_block(block: &RichTextBlock) -> String {
    let inner = || render_spans(&block.text, &block.spans);
    match block.kind {
        BlockKind::Heading1 => format!("<h1>{}</h1>", inner()),
        BlockKind::Heading2 => format!("<h2>{}</h2>", inner()),
        BlockKind::Heading3 => format!("<h3>{}</h3>", inner()),
        BlockKind::Heading4 => format!("<h4>{}</h4>", inner()),
        BlockKind::Heading5 => format!("<h5>{}</h5>", inner()),
        BlockKind::Heading6 => format!("<h6>{}</h6>", inner()),
        BlockKind::Preformatted => format!("<pre>{}</pre>", inner()),
        BlockKind::ListItem | BlockKind::OListItem => format!("<li>{}</li>", inner()),
        BlockKind::Image => {
            let src = block.url.as_deref().unwrap_or_default();
            let alt = block.alt.as_deref().unwrap_or_default();
            format!(
                r#"<p class="block-img"><img src="{}" alt="{}" /></p>"#,
                escape_attr(src),
                escape_attr(alt)
            )
        },
        BlockKind::Embed => render_embed(block),
        BlockKind::Paragraph | BlockKind::Unknown => format!("<p>{}</p>", inner()),
    }
}

fn render_embed(block: &RichTextBlock) -> String {
    let Some(oembed) = block.oembed.as_ref() else {
        return String::new();
    };
    let field = |name: &str| oembed.get(name).and_then(Value::as_str).unwrap_or_default();
    // Provider markup is trusted as-is, the same way the CMS toolbar renders it.
    format!(
        r#"<div data-oembed="{}" data-oembed-type="{}" data-oembed-provider="{}">{}</div>"#,
        escape_attr(field("embed_url")),
        escape_attr(field("type")),
        escape_attr(field("provider_name")),
        field("html"),
    )
}

fn open_tag(span: &RichTextSpan) -> String {
    match span.kind {
        SpanKind::Strong => "<strong>".to_string(),
        SpanKind::Em => "<em>".to_string(),
        SpanKind::Hyperlink => {
            let data = span.data.clone().unwrap_or_default();
            let href = data.url.unwrap_or_default();
            match data.target {
                Some(target) => format!(
                    r#"<a href="{}" target="{}" rel="noopener">"#,
                    escape_attr(&href),
                    escape_attr(&target)
                ),
                None => format!(r#"<a href="{}">"#, escape_attr(&href)),
            }
        },
        SpanKind::Unknown => String::new(),
    }
}

fn close_tag(span: &RichTextSpan) -> &'static str {
    match span.kind {
        SpanKind::Strong => "</strong>",
        SpanKind::Em => "</em>",
        SpanKind::Hyperlink => "</a>",
        SpanKind::Unknown => "",
    }
}

fn push_escaped_char(out: &mut String, ch: char) {
    match ch {
        '&' => out.push_str("&amp;"),
        '<' => out.push_str("&lt;"),
        '>' => out.push_str("&gt;"),
        '\n' => out.push_str("<br />"),
        other => out.push(other),
    }
}

/// Closes every span that ended at `pos`, reopening the ones still running
/// underneath so tags stay balanced.
fn close_finished<'a>(out: &mut String, stack: &mut Vec<&'a RichTextSpan>, pos: usize) {
    if !stack.iter().any(|span| span.end <= pos) {
        return;
    }
    let mut reopen = Vec::new();
    while let Some(top) = stack.pop() {
        out.push_str(close_tag(top));
        if top.end > pos {
            reopen.push(top);
        }
        if !stack.iter().any(|span| span.end <= pos) {
            break;
        }
    }
    for span in reopen.into_iter().rev() {
        out.push_str(&open_tag(span));
        stack.push(span);
    }
}

fn render_spans(text: &str, spans: &[RichTextSpan]) -> String {
    let mut spans: Vec<&RichTextSpan> = spans
        .iter()
        .filter(|span| span.start < span.end && span.kind != SpanKind::Unknown)
        .collect();
    // Outer spans first when two start at the same offset.
    spans.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut out = String::with_capacity(text.len());
    let mut stack: Vec<&RichTextSpan> = Vec::new();
    let mut next = 0;
    // UTF-16 offset of the current character.
    let mut pos = 0;

    for ch in text.chars() {
        close_finished(&mut out, &mut stack, pos);

        // `<=` picks up spans whose start falls inside a surrogate pair.
        while next < spans.len() && spans[next].start <= pos {
            if spans[next].end > pos {
                out.push_str(&open_tag(spans[next]));
                stack.push(spans[next]);
            }
            next += 1;
        }

        push_escaped_char(&mut out, ch);
        pos += ch.len_utf16();
    }

    close_finished(&mut out, &mut stack, pos);
    while let Some(top) = stack.pop() {
        out.push_str(close_tag(top));
    }

    out
}
