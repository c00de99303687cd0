use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; WebsiteContentPipeline/1.0)";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    pub user_agent: String,
    pub timeout: Duration,
    pub max_redirects: u32,
    pub max_content_size: usize,
    pub rate_limit: RateLimitConfig,
    pub headers: Vec<(String, String)>,
}

/// Global request ceiling: at most `max_requests` per `window`, shared by
/// every fetch in the process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window: Duration,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(12),
            max_redirects: 10,
            max_content_size: 10 * 1024 * 1024, // 10MB
            rate_limit: RateLimitConfig::default(),
            headers: vec![
                ("Accept".to_string(), "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".to_string()),
                ("Accept-Language".to_string(), "en-US,en;q=0.5".to_string()),
            ],
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 60,
            window: Duration::from_secs(60),
        }
    }
}

impl RateLimitConfig {
    pub fn per_minute(max_requests: u32) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(60),
        }
    }
}

impl CrawlerConfig {
    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_header(mut self, key: String, value: String) -> Self {
        self.headers.push((key, value));
        self
    }

    pub fn with_rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.rate_limit = rate_limit;
        self
    }
}

/// Per-site discovery limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlOptions {
    pub max_case_studies: usize,
    pub max_internal_pages: usize,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            max_case_studies: 3,
            max_internal_pages: 4,
        }
    }
}

impl CrawlOptions {
    pub fn homepage_only() -> Self {
        Self {
            max_case_studies: 0,
            max_internal_pages: 0,
        }
    }

    pub fn with_max_case_studies(mut self, max: usize) -> Self {
        self.max_case_studies = max;
        self
    }

    pub fn with_max_internal_pages(mut self, max: usize) -> Self {
        self.max_internal_pages = max;
        self
    }
}
