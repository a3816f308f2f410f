//! Preview mode: a signed `ref` cookie pins CMS queries to an unpublished
//! revision. Requests are `Previewing` only while a cookie with a valid
//! signature is present.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use crate::{error::ApiError, render, state::AppState};

pub const PREVIEW_COOKIE_NAME: &str = "ref";

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewMode {
    Normal,
    Previewing { reference: String },
}

impl PreviewMode {
    pub fn reference(&self) -> Option<&str> {
        match self {
            Self::Normal => None,
            Self::Previewing {
                reference,
            } => Some(reference),
        }
    }

    pub fn is_previewing(&self) -> bool {
        matches!(self, Self::Previewing { .. })
    }
}

#[derive(Clone)]
pub struct PreviewCookieSigner {
    secret: Arc<[u8]>,
    secure: bool,
}

impl PreviewCookieSigner {
    pub fn new(secret: &[u8], secure: bool) -> Self {
        Self {
            secret: Arc::from(secret),
            secure,
        }
    }

    fn mac(&self, payload: &str) -> HmacSha256 {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts keys of any length");
        mac.update(PREVIEW_COOKIE_NAME.as_bytes());
        mac.update(b"=");
        mac.update(payload.as_bytes());
        mac
    }

    /// `base64url(reference).hex(hmac)`
    pub fn sign(&self, reference: &str) -> String {
        let payload = URL_SAFE_NO_PAD.encode(reference.as_bytes());
        let signature = hex::encode(self.mac(&payload).finalize().into_bytes());
        format!("{payload}.{signature}")
    }

    /// Returns the reference when the signature checks out.
    pub fn verify(&self, value: &str) -> Option<String> {
        let (payload, signature) = value.split_once('.')?;
        let signature = hex::decode(signature).ok()?;
        self.mac(payload).verify_slice(&signature).ok()?;
        let reference = URL_SAFE_NO_PAD.decode(payload).ok()?;
        String::from_utf8(reference)
            .ok()
            .filter(|reference| !reference.is_empty())
    }

    pub fn set_cookie(&self, reference: &str) -> String {
        let mut cookie = format!(
            "{PREVIEW_COOKIE_NAME}={}; Path=/; HttpOnly; SameSite=Lax",
            self.sign(reference)
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    pub fn clear_cookie(&self) -> String {
        let mut cookie = format!(
            "{PREVIEW_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0; Expires=Thu, 01 \
             Jan 1970 00:00:00 GMT"
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    pub fn preview_mode(&self, headers: &HeaderMap) -> PreviewMode {
        let Some(value) = cookie_value(headers, PREVIEW_COOKIE_NAME) else {
            return PreviewMode::Normal;
        };
        match self.verify(&value) {
            Some(reference) => PreviewMode::Previewing {
                reference,
            },
            None => {
                tracing::debug!("ignoring preview cookie with a bad signature");
                PreviewMode::Normal
            },
        }
    }
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().to_string())
}

/// Only same-site absolute paths are followed; anything else goes home.
pub fn safe_redirect_target(candidate: Option<&str>) -> String {
    candidate
        .map(str::trim)
        .filter(|value| value.starts_with('/') && !value.starts_with("//"))
        .filter(|value| value.chars().all(|ch| ch.is_ascii_graphic()) && !value.contains('\\'))
        .map(str::to_string)
        .unwrap_or_else(|| "/".to_string())
}

#[derive(Debug, Deserialize)]
pub struct PreviewQuery {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default, rename = "documentId")]
    pub document_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExitPreviewQuery {
    #[serde(default, rename = "currentUrl")]
    pub current_url: Option<String>,
}

/// GET /api/preview?token=&documentId=
pub async fn enter_preview(
    State(state): State<AppState>,
    Query(query): Query<PreviewQuery>,
) -> Result<Response, ApiError> {
    let token = query.token.unwrap_or_default();
    let document_id = query.document_id.unwrap_or_default();

    let redirect_url = state.cms.resolve_preview(&token, &document_id).await?;
    tracing::info!(document_id = %document_id, redirect = %redirect_url, "entering preview mode");

    Ok((
        StatusCode::OK,
        [
            (header::SET_COOKIE, state.preview_signer.set_cookie(token.trim())),
            (header::CONTENT_TYPE, "text/html; charset=utf-8".to_string()),
        ],
        render::redirect_document(&redirect_url),
    )
        .into_response())
}

/// GET /api/exit-preview?currentUrl=
pub async fn exit_preview(
    State(state): State<AppState>,
    Query(query): Query<ExitPreviewQuery>,
) -> Response {
    let location = safe_redirect_target(query.current_url.as_deref());
    tracing::info!(location = %location, "leaving preview mode");
    (
        StatusCode::TEMPORARY_REDIRECT,
        [
            (header::LOCATION, location),
            (header::SET_COOKIE, state.preview_signer.clear_cookie()),
        ],
    )
        .into_response()
}
