use crawler::{CrawlOptions, CrawlerConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use storage::ArtifactKey;
use url::Url;

use crate::{PipelineError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub data_dir: PathBuf,
    pub sites_file: PathBuf,
    pub max_concurrent_sites: usize,
    pub max_retries: u32,
    pub retry_delay: Duration,
    /// Homepage text shorter than this falls back to the largest content block.
    pub min_homepage_text: usize,
    pub crawler: CrawlerConfig,
    pub crawl: CrawlOptions,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            sites_file: PathBuf::from("./config/websites.yaml"),
            max_concurrent_sites: 4,
            max_retries: 2,
            retry_delay: Duration::from_secs(30),
            min_homepage_text: 300,
            crawler: CrawlerConfig::default(),
            crawl: CrawlOptions::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Unset or unparsable values keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(dir) = lookup("PIPELINE_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }

        if let Some(file) = lookup("PIPELINE_SITES_FILE") {
            config.sites_file = PathBuf::from(file);
        }

        if let Some(n) = parsed(&lookup, "PIPELINE_CONCURRENCY") {
            config.max_concurrent_sites = n;
        }

        if let Some(n) = parsed(&lookup, "PIPELINE_MAX_RETRIES") {
            config.max_retries = n;
        }

        if let Some(secs) = parsed(&lookup, "PIPELINE_RETRY_DELAY_SECS") {
            config.retry_delay = Duration::from_secs(secs);
        }

        if let Some(n) = parsed(&lookup, "PIPELINE_MIN_HOMEPAGE_TEXT") {
            config.min_homepage_text = n;
        }

        if let Some(n) = parsed(&lookup, "PIPELINE_MAX_CASE_STUDIES") {
            config.crawl.max_case_studies = n;
        }

        if let Some(n) = parsed(&lookup, "PIPELINE_MAX_INTERNAL_PAGES") {
            config.crawl.max_internal_pages = n;
        }

        if let Some(secs) = parsed(&lookup, "PIPELINE_TIMEOUT_SECS") {
            config.crawler.timeout = Duration::from_secs(secs);
        }

        if let Some(n) = parsed(&lookup, "PIPELINE_RATE_LIMIT") {
            config.crawler.rate_limit.max_requests = n;
        }

        if let Some(secs) = parsed(&lookup, "PIPELINE_RATE_WINDOW_SECS") {
            config.crawler.rate_limit.window = Duration::from_secs(secs);
        }

        if let Some(agent) = lookup("PIPELINE_USER_AGENT") {
            config.crawler.user_agent = agent;
        }

        config
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_sites_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.sites_file = file.into();
        self
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    lookup(name).and_then(|value| value.trim().parse().ok())
}

/// One configured target: the URL as written in the site list, its parsed
/// form and the key its artifacts are stored under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    pub website: String,
    pub url: Url,
    pub key: ArtifactKey,
}

impl Site {
    pub fn parse(website: &str) -> Result<Self> {
        let website = website.trim();
        let invalid = |reason: String| PipelineError::InvalidSite {
            url: website.to_string(),
            reason,
        };

        let url = Url::parse(website).map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme {}", url.scheme())));
        }
        let key = ArtifactKey::from_url(&url).map_err(|e| invalid(e.to_string()))?;

        Ok(Self {
            website: website.to_string(),
            url,
            key,
        })
    }
}

#[derive(Debug, Deserialize)]
struct SiteList {
    #[serde(default)]
    websites: Vec<String>,
}

/// Reads `{ websites: [url, ...] }`. Order is kept and duplicates are not
/// removed.
pub fn load_sites(path: impl AsRef<Path>) -> Result<Vec<Site>> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    parse_sites(&contents)
}

pub fn parse_sites(yaml: &str) -> Result<Vec<Site>> {
    if yaml.trim().is_empty() {
        return Ok(Vec::new());
    }

    let list: SiteList = serde_yaml::from_str(yaml)?;
    list.websites
        .iter()
        .map(|website| Site::parse(website))
        .collect()
}
