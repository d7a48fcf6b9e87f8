use std::time::Duration;

use bytes::BytesMut;
use futures_util::StreamExt;
use reqwest::header::{
    HeaderMap, HeaderName, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, ETAG, IF_MODIFIED_SINCE,
    IF_NONE_MATCH, LAST_MODIFIED,
};
use reqwest::{StatusCode, Url};
use watch_core::Validators;
use watch_logging::{watch_debug, watch_warn};

use crate::decode::decode_body;
use crate::{FailureKind, FetchError, FetchResult};

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    /// Pause after each failed attempt; its length is the attempt budget.
    pub backoffs: Vec<Duration>,
    pub user_agent: String,
    pub accept: String,
    pub accept_language: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            redirect_limit: 5,
            max_bytes: 5 * 1024 * 1024,
            backoffs: vec![
                Duration::ZERO,
                Duration::from_secs(2),
                Duration::from_secs(4),
            ],
            user_agent: concat!(
                "Mozilla/5.0 (compatible; PageWatch/",
                env!("CARGO_PKG_VERSION"),
                ")"
            )
            .to_string(),
            accept: "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"
                .to_string(),
            accept_language: "it-IT,it;q=0.9,en-US;q=0.8,en;q=0.7".to_string(),
        }
    }
}

#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// Conditional GET. Fails only after the whole retry budget is spent.
    async fn fetch(&self, url: &str, validators: &Validators) -> Result<FetchResult, FetchError>;
}

#[derive(Debug, Clone, Default)]
pub struct ReqwestFetcher {
    settings: FetchSettings,
}

impl ReqwestFetcher {
    pub fn new(settings: FetchSettings) -> Self {
        Self { settings }
    }

    fn build_client(&self) -> Result<reqwest::Client, FetchError> {
        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .redirect(reqwest::redirect::Policy::limited(
                self.settings.redirect_limit,
            ))
            .user_agent(self.settings.user_agent.clone())
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))
    }

    async fn attempt(
        &self,
        client: &reqwest::Client,
        url: &Url,
        validators: &Validators,
    ) -> Result<FetchResult, FetchError> {
        let mut request = client
            .get(url.clone())
            .header(ACCEPT, self.settings.accept.as_str())
            .header(ACCEPT_LANGUAGE, self.settings.accept_language.as_str());
        if let Some(etag) = validators.etag.as_deref() {
            request = request.header(IF_NONE_MATCH, etag);
        }
        if let Some(last_modified) = validators.last_modified.as_deref() {
            request = request.header(IF_MODIFIED_SINCE, last_modified);
        }

        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        let fresh = response_validators(response.headers());

        if status == StatusCode::NOT_MODIFIED {
            return Ok(FetchResult::not_modified(fresh));
        }
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        if let Some(content_len) = response.content_length() {
            if content_len > self.settings.max_bytes {
                return Err(self.too_large(Some(content_len)));
            }
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let mut bytes = BytesMut::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > self.settings.max_bytes {
                return Err(self.too_large(Some(next_len)));
            }
            bytes.extend_from_slice(&chunk);
        }

        let decoded = decode_body(&bytes, content_type.as_deref());
        if decoded.had_errors {
            watch_warn!(
                "Body of {} had malformed {} sequences; replaced",
                url,
                decoded.encoding_label
            );
        }
        watch_debug!(
            "Fetched {} bytes ({}) from {}",
            bytes.len(),
            decoded.encoding_label,
            url
        );
        Ok(FetchResult::fetched(decoded.text, fresh))
    }

    fn too_large(&self, actual: Option<u64>) -> FetchError {
        FetchError::new(
            FailureKind::TooLarge {
                max_bytes: self.settings.max_bytes,
                actual,
            },
            "response too large",
        )
    }
}

#[async_trait::async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str, validators: &Validators) -> Result<FetchResult, FetchError> {
        let parsed = Url::parse(url)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
        let client = self.build_client()?;

        let budget = self.settings.backoffs.len().max(1) as u32;

        let mut last_error = None;
        for attempt in 1..=budget {
            match self.attempt(&client, &parsed, validators).await {
                Ok(result) => return Ok(result),
                Err(err) => {
                    watch_warn!("Fetch attempt {}/{} failed: {}", attempt, budget, err);
                    let retryable = err.kind.is_retryable();
                    last_error = Some(err.exhausted(attempt));
                    if !retryable {
                        break;
                    }
                }
            }
            if attempt < budget {
                if let Some(pause) = self.settings.backoffs.get(attempt as usize - 1) {
                    if !pause.is_zero() {
                        tokio::time::sleep(*pause).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            FetchError::new(FailureKind::Network, "no fetch attempt was made")
        }))
    }
}

fn response_validators(headers: &HeaderMap) -> Validators {
    let value = |name: HeaderName| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };
    Validators::new(value(ETAG), value(LAST_MODIFIED))
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}
