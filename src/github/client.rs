use crate::error::ExtractionError;
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, RETRY_AFTER};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;

type Result<T> = std::result::Result<T, ExtractionError>;

pub const TOKEN_ENV: &str = "TOKEN";
pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const API_MEDIA_TYPE: &str = "application/vnd.github.v3+json";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_RETRIES: u32 = 3;

const MAX_RATE_LIMIT_WAIT: Duration = Duration::from_secs(60);
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub token: String,
    pub timeout: Duration,
    pub max_retries: u32,
}

impl ClientConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            token: token.into(),
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Reads the bearer token from the `TOKEN` environment variable.
    pub fn from_env() -> Result<Self> {
        match std::env::var(TOKEN_ENV) {
            Ok(token) if !token.trim().is_empty() => Ok(Self::new(token.trim())),
            _ => Err(ExtractionError::MissingToken(TOKEN_ENV)),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

/// Blocking HTTP client carrying the credentials and response policy shared
/// by every platform request.
pub struct ApiClient {
    http: Client,
    config: ClientConfig,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = Client::builder()
            .default_headers(default_headers(&config.token)?)
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()
            .map_err(|source| ExtractionError::Transport {
                url: config.base_url.clone(),
                source,
            })?;

        Ok(Self { http, config })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// GET `path` (relative to the base URL) and decode the JSON body.
    ///
    /// Rate-limited responses are retried up to `max_retries` times; every
    /// other non-200 status fails immediately.
    pub fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = format!("{}{}", self.config.base_url, path);
        let mut attempt = 0u32;

        loop {
            log::debug!("GET {url} {query:?} (attempt {})", attempt + 1);
            let response = self
                .http
                .get(&url)
                .query(query)
                .send()
                .map_err(|source| ExtractionError::Transport {
                    url: url.clone(),
                    source,
                })?;

            match validate_response(response, &url, attempt, self.config.max_retries) {
                Ok(response) => {
                    let body = response.text().map_err(|source| ExtractionError::Transport {
                        url: url.clone(),
                        source,
                    })?;
                    return serde_json::from_str(&body)
                        .map_err(|err| ExtractionError::malformed(url.clone(), err));
                }
                Err(Validation::Retry(wait)) => {
                    log::warn!(
                        "rate limited by {url}, retrying in {}",
                        humantime::format_duration(wait)
                    );
                    std::thread::sleep(wait);
                    attempt += 1;
                }
                Err(Validation::Failed(err)) => return Err(err),
            }
        }
    }
}

enum Validation {
    Retry(Duration),
    Failed(ExtractionError),
}

fn validate_response(response: Response, url: &str, attempt: u32, max_retries: u32) -> std::result::Result<Response, Validation> {
    let status = response.status();
    if status == StatusCode::OK {
        return Ok(response);
    }

    let now = chrono::Utc::now().timestamp();
    match rate_limit_wait(status, response.headers(), attempt, now) {
        Some(wait) if attempt < max_retries => Err(Validation::Retry(wait)),
        Some(_) => Err(Validation::Failed(ExtractionError::RateLimited {
            status: status.as_u16(),
            url: url.to_string(),
        })),
        None => Err(Validation::Failed(ExtractionError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        })),
    }
}

pub fn default_headers(token: &str) -> Result<HeaderMap> {
    let mut auth =
        HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| ExtractionError::InvalidToken)?;
    auth.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, auth);
    headers.insert(ACCEPT, HeaderValue::from_static(API_MEDIA_TYPE));
    Ok(headers)
}

/// How long to wait before retrying, or `None` if the response is not a
/// throttling response.
///
/// 429 is always throttling; 403 only when the quota headers say so.
pub fn rate_limit_wait(status: StatusCode, headers: &HeaderMap, attempt: u32, now_epoch: i64) -> Option<Duration> {
    let remaining_exhausted = header_str(headers, "x-ratelimit-remaining") == Some("0");
    let has_retry_after = headers.contains_key(RETRY_AFTER);
    let limited = status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN && (remaining_exhausted || has_retry_after));
    if !limited {
        return None;
    }

    let wait = header_str(headers, RETRY_AFTER.as_str())
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
        .or_else(|| {
            header_str(headers, "x-ratelimit-reset")
                .and_then(|v| v.parse::<i64>().ok())
                .map(|reset| Duration::from_secs((reset - now_epoch).max(0) as u64))
        })
        .unwrap_or_else(|| Duration::from_secs(1u64 << attempt.min(6)));

    Some(wait.min(MAX_RATE_LIMIT_WAIT))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim)
}
