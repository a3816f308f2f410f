use std::{env, path::PathBuf, str::FromStr, time::Duration};

use anyhow::{bail, Result};
use rand::RngCore;
use spacetraveling_shared::cms::CmsConfig;

const DEFAULT_PRISMIC_REPOSITORY: &str = "spacetraveling";
const DEFAULT_SITE_BASE_URL: &str = "http://localhost:3000";
const MIN_COOKIE_SECRET_LEN: usize = 32;

#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub port: u16,
    pub cms_endpoint: String,
    pub cms_access_token: Option<String>,
    pub cms_timeout: Duration,
    /// Repository name used by the CMS toolbar script.
    pub prismic_repository: String,
    pub posts_page_size: u32,
    pub preview_cookie_secret: Vec<u8>,
    pub cookie_secure: bool,
    pub utterances_repo: Option<String>,
    pub site_base_url: String,
    pub public_dir: PathBuf,
    pub page_cache_capacity: usize,
    pub page_revalidate: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let Some(cms_endpoint) = env_string("PRISMIC_API_ENDPOINT") else {
            bail!("PRISMIC_API_ENDPOINT is required (e.g. https://<repo>.cdn.prismic.io/api/v2)");
        };
        let site_base_url = env_string("SITE_BASE_URL")
            .map(|value| value.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_SITE_BASE_URL.to_string());
        let cookie_secure = parse_bool_env("PREVIEW_COOKIE_SECURE", site_base_url.starts_with("https://"));

        let preview_cookie_secret = match env_string("PREVIEW_COOKIE_SECRET") {
            Some(secret) => {
                if secret.len() < MIN_COOKIE_SECRET_LEN {
                    tracing::warn!(
                        "PREVIEW_COOKIE_SECRET is shorter than {MIN_COOKIE_SECRET_LEN} bytes"
                    );
                }
                secret.into_bytes()
            },
            None => {
                tracing::warn!(
                    "PREVIEW_COOKIE_SECRET not set; preview cookies will not survive a restart"
                );
                let mut secret = vec![0u8; MIN_COOKIE_SECRET_LEN];
                rand::thread_rng().fill_bytes(&mut secret);
                secret
            },
        };

        Ok(Self {
            bind_addr: env_string("BIND_ADDR").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: env_parse("PORT", 3000),
            cms_endpoint,
            cms_access_token: env_string("PRISMIC_ACCESS_TOKEN"),
            cms_timeout: Duration::from_secs(env_parse::<u64>("CMS_HTTP_TIMEOUT_SECONDS", 10).max(1)),
            prismic_repository: env_string("PRISMIC_REPOSITORY")
                .unwrap_or_else(|| DEFAULT_PRISMIC_REPOSITORY.to_string()),
            posts_page_size: env_parse::<u32>("POSTS_PAGE_SIZE", 1).max(1),
            preview_cookie_secret,
            cookie_secure,
            utterances_repo: env_string("UTTERANCES_REPO"),
            site_base_url,
            public_dir: env_string("PUBLIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("public")),
            page_cache_capacity: env_parse("PAGE_CACHE_CAPACITY", 128),
            page_revalidate: Duration::from_secs(env_parse("PAGE_REVALIDATE_SECONDS", 60)),
        })
    }

    pub fn cms_config(&self) -> CmsConfig {
        CmsConfig {
            endpoint: self.cms_endpoint.clone(),
            access_token: self.cms_access_token.clone(),
            timeout: self.cms_timeout,
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    /// Configuration pointing at a test CMS, with caching disabled.
    #[cfg(test)]
    pub fn for_tests(cms_endpoint: &str) -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            port: 0,
            cms_endpoint: cms_endpoint.to_string(),
            cms_access_token: None,
            cms_timeout: Duration::from_secs(5),
            prismic_repository: DEFAULT_PRISMIC_REPOSITORY.to_string(),
            posts_page_size: 1,
            preview_cookie_secret: b"test-secret-test-secret-test-secret".to_vec(),
            cookie_secure: false,
            utterances_repo: Some("rocketseat/spacetraveling".to_string()),
            site_base_url: "https://blog.example.com".to_string(),
            public_dir: PathBuf::from("public"),
            page_cache_capacity: 16,
            page_revalidate: Duration::ZERO,
        }
    }
}

fn env_string(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_parse<T: FromStr>(name: &str, default: T) -> T {
    env_string(name)
        .and_then(|value| value.parse::<T>().ok())
        .unwrap_or(default)
}

fn parse_bool_env(name: &str, default: bool) -> bool {
    env_string(name)
        .map(|value| parse_bool(&value, default))
        .unwrap_or(default)
}

fn parse_bool(value: &str, default: bool) -> bool {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}
