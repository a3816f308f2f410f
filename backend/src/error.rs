use axum::{
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
};
use serde::Serialize;
use spacetraveling_shared::cms::CmsError;

use crate::{preview::PreviewMode, render};

const UNAVAILABLE_MESSAGE: &str =
    "Não foi possível carregar o conteúdo. Tente novamente em instantes.";

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Errors of the JSON endpoints under `/api`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid token")]
    InvalidToken,

    #[error("{0}")]
    BadRequest(String),

    #[error("Not found")]
    NotFound,

    #[error("Content source unavailable")]
    Upstream(#[source] CmsError),
}

impl From<CmsError> for ApiError {
    fn from(err: CmsError) -> Self {
        match err {
            CmsError::InvalidToken => Self::InvalidToken,
            CmsError::InvalidCursor(_) => Self::BadRequest("Invalid cursor".to_string()),
            CmsError::NotFound(_) => Self::NotFound,
            other => Self::Upstream(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::InvalidToken => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Upstream(err) => {
                tracing::error!(error = %err, "content source request failed");
                StatusCode::BAD_GATEWAY
            },
        };
        (
            status,
            Json(MessageResponse {
                message: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// Errors of the HTML page routes.
#[derive(Debug, thiserror::Error)]
pub enum PageError {
    /// Unknown slug. Shown as the fallback page, not as a failure.
    #[error("post not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Cms(CmsError),

    /// The CMS failed a request pinned to a preview ref, usually because the
    /// ref expired. The error page keeps the way out of preview mode.
    #[error("preview content unavailable for {current_path}: {source}")]
    Preview { current_path: String, source: CmsError },
}

impl PageError {
    /// Attach the preview state of the request that failed.
    pub fn in_mode(self, preview: &PreviewMode, current_path: &str) -> Self {
        match self {
            Self::Cms(source) if preview.is_previewing() => Self::Preview {
                current_path: current_path.to_string(),
                source,
            },
            other => other,
        }
    }
}

impl From<CmsError> for PageError {
    fn from(err: CmsError) -> Self {
        match err {
            CmsError::NotFound(uid) => Self::NotFound(uid),
            other => Self::Cms(other),
        }
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        match self {
            Self::NotFound(uid) => {
                tracing::info!(uid = %uid, "post not found; serving fallback page");
                (StatusCode::NOT_FOUND, Html(render::fallback_page())).into_response()
            },
            Self::Cms(err) => {
                tracing::error!(error = %err, "failed to render page");
                (StatusCode::BAD_GATEWAY, Html(render::error_page(UNAVAILABLE_MESSAGE, None)))
                    .into_response()
            },
            Self::Preview {
                current_path,
                source,
            } => {
                tracing::warn!(error = %source, path = %current_path, "preview content unavailable");
                (
                    StatusCode::BAD_GATEWAY,
                    [(header::CACHE_CONTROL, "private, no-store")],
                    Html(render::error_page(UNAVAILABLE_MESSAGE, Some(&current_path))),
                )
                    .into_response()
            },
        }
    }
}
