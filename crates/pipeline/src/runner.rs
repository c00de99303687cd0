use chrono::{DateTime, Utc};
use crawler::{RateLimiter, SectionExtractor, SiteCrawler};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use storage::{ArtifactKey, ArtifactStore, FsArtifactStore, Summary};
use tracing::{info, warn};

use crate::stages::{
    aggregate_sites, extract_site, record_crawl, transform_site, CrawlOutput, ExtractOutput,
    TransformOutput,
};
use crate::{PipelineConfig, Result, Site, StageReport};

#[derive(Debug, Clone)]
pub struct RunnerOptions {
    pub max_concurrent_sites: usize,
    /// Extra attempts for a stage that ended `failed`.
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            max_concurrent_sites: 4,
            max_retries: 2,
            retry_delay: Duration::from_secs(30),
        }
    }
}

impl From<&PipelineConfig> for RunnerOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            max_concurrent_sites: config.max_concurrent_sites.max(1),
            max_retries: config.max_retries,
            retry_delay: config.retry_delay,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteReport {
    pub website: String,
    pub domain: ArtifactKey,
    pub crawl: StageReport<CrawlOutput>,
    pub extract: StageReport<ExtractOutput>,
    pub transform: StageReport<TransformOutput>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_at: DateTime<Utc>,
    pub sites: Vec<SiteReport>,
    pub aggregate: StageReport<Summary>,
}

/// Drives crawl, extract and transform for every site, then aggregates once.
///
/// Sites run concurrently and share the crawler's rate limiter. A stage that
/// ends `failed` is retried; every other status is final.
pub struct PipelineRunner {
    crawler: SiteCrawler,
    extractor: SectionExtractor,
    store: Arc<dyn ArtifactStore>,
    options: RunnerOptions,
}

impl PipelineRunner {
    pub fn new(crawler: SiteCrawler, store: Arc<dyn ArtifactStore>, options: RunnerOptions) -> Self {
        Self {
            crawler,
            extractor: SectionExtractor::new(),
            store,
            options,
        }
    }

    /// File-backed runner with one process-wide limiter.
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        let limiter = Arc::new(RateLimiter::new(config.crawler.rate_limit.clone())?);
        let crawler = SiteCrawler::from_config(config.crawler.clone(), config.crawl.clone(), limiter)?;
        let store: Arc<dyn ArtifactStore> = Arc::new(FsArtifactStore::new(&config.data_dir)?);

        let extractor = SectionExtractor::new().with_min_homepage_text(config.min_homepage_text);

        Ok(Self::new(crawler, store, RunnerOptions::from(config)).with_extractor(extractor))
    }

    pub fn with_extractor(mut self, extractor: SectionExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn store(&self) -> &Arc<dyn ArtifactStore> {
        &self.store
    }

    async fn with_retries<T, F, Fut>(&self, stage: &str, target: &str, mut attempt: F) -> StageReport<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = StageReport<T>>,
    {
        let mut tries = 0;
        loop {
            let report = attempt().await;
            if !report.is_failed() || tries >= self.options.max_retries {
                return report;
            }
            tries += 1;
            warn!(
                "[{}] {} failed ({}), retry {}/{}",
                target,
                stage,
                report.detail.as_deref().unwrap_or("no detail"),
                tries,
                self.options.max_retries
            );
            tokio::time::sleep(self.options.retry_delay).await;
        }
    }

    /// Runs a synchronous stage on the blocking pool.
    async fn blocking<T, F>(f: F) -> StageReport<T>
    where
        T: Send + 'static,
        F: FnOnce() -> StageReport<T> + Send + 'static,
    {
        match tokio::task::spawn_blocking(f).await {
            Ok(report) => report,
            Err(e) => StageReport::aborted(format!("stage task failed: {}", e)),
        }
    }

    /// Fetches over the network, then persists on the blocking pool.
    pub async fn crawl(&self, site: &Site, run_at: DateTime<Utc>) -> StageReport<CrawlOutput> {
        self.with_retries("crawl", site.key.as_str(), || async move {
            let crawl = self.crawler.crawl(&site.url).await;
            let store = self.store.clone();
            let site = site.clone();
            Self::blocking(move || record_crawl(store.as_ref(), &site, crawl, run_at)).await
        })
        .await
    }

    pub async fn extract(&self, site: &Site, run_at: DateTime<Utc>) -> StageReport<ExtractOutput> {
        self.with_retries("extract", site.key.as_str(), || {
            let extractor = self.extractor.clone();
            let store = self.store.clone();
            let site = site.clone();
            Self::blocking(move || extract_site(&extractor, store.as_ref(), &site, run_at))
        })
        .await
    }

    pub async fn transform(&self, site: &Site, run_at: DateTime<Utc>) -> StageReport<TransformOutput> {
        self.with_retries("transform", site.key.as_str(), || {
            let store = self.store.clone();
            let site = site.clone();
            Self::blocking(move || transform_site(store.as_ref(), &site, run_at))
        })
        .await
    }

    pub async fn aggregate(&self, sites: &[Site], run_at: DateTime<Utc>) -> StageReport<Summary> {
        self.with_retries("aggregate", "all", || {
            let store = self.store.clone();
            let sites = sites.to_vec();
            Self::blocking(move || aggregate_sites(store.as_ref(), &sites, run_at))
        })
        .await
    }

    /// Crawl, extract and transform one site. Later stages still run after a
    /// failed crawl so they can clear stale artifacts.
    pub async fn run_site(&self, site: &Site, run_at: DateTime<Utc>) -> SiteReport {
        let crawl = self.crawl(site, run_at).await;
        let extract = self.extract(site, run_at).await;
        let transform = self.transform(site, run_at).await;

        info!(
            "[{}] Site finished | crawl: {} | extract: {} | transform: {}",
            site.key, crawl.status, extract.status, transform.status
        );

        SiteReport {
            website: site.website.clone(),
            domain: site.key.clone(),
            crawl,
            extract,
            transform,
        }
    }

    pub async fn run(&self, sites: &[Site], run_at: DateTime<Utc>) -> RunReport {
        info!(
            "Starting pipeline run {} for {} sites",
            run_at.to_rfc3339(),
            sites.len()
        );

        let mut reports: Vec<(usize, SiteReport)> = stream::iter(sites.iter().enumerate())
            .map(|(index, site)| async move { (index, self.run_site(site, run_at).await) })
            .buffer_unordered(self.options.max_concurrent_sites.max(1))
            .collect()
            .await;
        reports.sort_by_key(|(index, _)| *index);

        // Every site is terminal here
        let aggregate = self.aggregate(sites, run_at).await;

        RunReport {
            run_at,
            sites: reports.into_iter().map(|(_, report)| report).collect(),
            aggregate,
        }
    }
}
