//! Third-party comments widget mounted under a post.
//!
//! The widget is a one-way embed: the script tag loads an external client
//! which renders the thread itself, nothing flows back into this server.

use spacetraveling_shared::rich_text::escape_attr;

pub const UTTERANCES_CLIENT_URL: &str = "https://utteranc.es/client.js";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentsEmbed {
    /// `owner/name` of the repository holding the comment issues.
    pub repo: String,
    pub issue_term: String,
    pub label: String,
    pub theme: String,
}

impl CommentsEmbed {
    pub fn for_repo(repo: &str) -> Self {
        Self {
            repo: repo.to_string(),
            issue_term: "pathname".to_string(),
            label: "comment :speech_balloon:".to_string(),
            theme: "photon-dark".to_string(),
        }
    }

    pub fn from_repo_setting(repo: Option<&str>) -> Option<Self> {
        match repo.map(str::trim).filter(|repo| !repo.is_empty()) {
            Some(repo) => Some(Self::for_repo(repo)),
            None => {
                tracing::debug!("UTTERANCES_REPO not set; comments are disabled");
                None
            },
        }
    }

    pub fn render(&self) -> String {
        format!(
            r#"<section id="utterances-comments" style="width: 100%"><script src="{src}" repo="{repo}" issue-term="{issue_term}" label="{label}" theme="{theme}" crossorigin="anonymous" async></script></section>"#,
            src = UTTERANCES_CLIENT_URL,
            repo = escape_attr(&self.repo),
            issue_term = escape_attr(&self.issue_term),
            label = escape_attr(&self.label),
            theme = escape_attr(&self.theme),
        )
    }
}
