use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use futures::StreamExt;
use reqwest::{Client as ReqwestClient, RequestBuilder, Response};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::{CrawlerConfig, CrawlerError, RateLimiter, Result};

/// One HTTP exchange. Any status code lands here, including 4xx/5xx; only
/// transport failures are errors.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: Url,
    pub status: u16,
    pub body: String,
    pub byte_size: usize,
    pub fetched_at: DateTime<Utc>,
}

impl FetchedPage {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Per-call overrides for `HttpClient::fetch_with`.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub timeout: Option<Duration>,
    pub headers: Vec<(String, String)>,
}

#[derive(Debug)]
pub struct HttpClient {
    client: ReqwestClient,
    config: Arc<CrawlerConfig>,
    limiter: Arc<RateLimiter>,
}

impl HttpClient {
    pub fn new(config: Arc<CrawlerConfig>, limiter: Arc<RateLimiter>) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();

        for (key, value) in &config.headers {
            headers.insert(
                reqwest::header::HeaderName::from_bytes(key.as_bytes())
                    .map_err(|e| CrawlerError::InvalidConfig(e.to_string()))?,
                reqwest::header::HeaderValue::from_str(value)
                    .map_err(|e| CrawlerError::InvalidConfig(e.to_string()))?,
            );
        }

        let client = ReqwestClient::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects as usize))
            .build()?;

        Ok(Self { client, config, limiter })
    }

    pub fn config(&self) -> &CrawlerConfig {
        &self.config
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub async fn fetch(&self, url: &Url) -> Result<FetchedPage> {
        let request = self.client.get(url.as_str());
        self.send(request, url, self.config.timeout).await
    }

    pub async fn fetch_with(&self, url: &Url, options: &FetchOptions) -> Result<FetchedPage> {
        let timeout = options.timeout.unwrap_or(self.config.timeout);
        let mut request = self.client.get(url.as_str()).timeout(timeout);

        for (key, value) in &options.headers {
            request = request.header(key.as_str(), value.as_str());
        }

        self.send(request, url, timeout).await
    }

    async fn send(&self, request: RequestBuilder, url: &Url, timeout: Duration) -> Result<FetchedPage> {
        self.limiter.until_ready().await;

        debug!("Fetching URL: {}", url);

        let response = request
            .send()
            .await
            .map_err(|e| transport_error(e, timeout))?;
        let status = response.status().as_u16();

        if let Some(content_length) = response.content_length() {
            if content_length > self.config.max_content_size as u64 {
                return Err(CrawlerError::ContentTooLarge {
                    size: content_length as usize,
                    max: self.config.max_content_size,
                });
            }
        }

        let bytes = self.stream_limited(response, timeout).await?;
        let body = String::from_utf8_lossy(&bytes).into_owned();

        debug!("Fetched {} bytes from {} (status {})", bytes.len(), url, status);

        Ok(FetchedPage {
            url: url.clone(),
            status,
            byte_size: bytes.len(),
            body,
            fetched_at: Utc::now(),
        })
    }

    async fn stream_limited(&self, response: Response, timeout: Duration) -> Result<Bytes> {
        let mut bytes = BytesMut::new();
        let mut stream = response.bytes_stream();
        let max_size = self.config.max_content_size;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| transport_error(e, timeout))?;

            if bytes.len() + chunk.len() > max_size {
                return Err(CrawlerError::ContentTooLarge {
                    size: bytes.len() + chunk.len(),
                    max: max_size,
                });
            }

            bytes.extend_from_slice(&chunk);
        }

        Ok(bytes.freeze())
    }
}

fn transport_error(error: reqwest::Error, timeout: Duration) -> CrawlerError {
    if error.is_timeout() {
        CrawlerError::Timeout(timeout.as_secs())
    } else {
        CrawlerError::Http(error)
    }
}
