use std::sync::Arc;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::{
    CrawlOptions, CrawlerConfig, CrawlerError, FetchedPage, HttpClient, LinkClassifier, RateLimiter,
    Result,
};

/// Where a single site's crawl ended up.
#[derive(Debug)]
pub enum SiteCrawl {
    /// Homepage returned 200; case studies are the ones that came back 200,
    /// in candidate order.
    Complete {
        homepage: FetchedPage,
        case_studies: Vec<FetchedPage>,
        internal_candidates: Vec<Url>,
    },
    /// Homepage answered with a non-200 status. Discovery was skipped.
    HomepageStatus { homepage: FetchedPage },
    /// Homepage could not be fetched at all.
    HomepageUnreachable { error: CrawlerError },
    /// Homepage fetched but link discovery failed.
    DiscoveryFailed {
        homepage: FetchedPage,
        error: CrawlerError,
    },
}

impl SiteCrawl {
    pub fn homepage(&self) -> Option<&FetchedPage> {
        match self {
            SiteCrawl::Complete { homepage, .. }
            | SiteCrawl::HomepageStatus { homepage }
            | SiteCrawl::DiscoveryFailed { homepage, .. } => Some(homepage),
            SiteCrawl::HomepageUnreachable { .. } => None,
        }
    }

    pub fn case_studies(&self) -> &[FetchedPage] {
        match self {
            SiteCrawl::Complete { case_studies, .. } => case_studies,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone)]
pub struct SiteCrawler {
    client: Arc<HttpClient>,
    classifier: LinkClassifier,
    options: CrawlOptions,
}

impl SiteCrawler {
    pub fn new(client: Arc<HttpClient>, options: CrawlOptions) -> Self {
        Self {
            client,
            classifier: LinkClassifier::from_options(&options),
            options,
        }
    }

    /// Builds the client around an existing (shared) limiter.
    pub fn from_config(
        config: CrawlerConfig,
        options: CrawlOptions,
        limiter: Arc<RateLimiter>,
    ) -> Result<Self> {
        let client = Arc::new(HttpClient::new(Arc::new(config), limiter)?);
        Ok(Self::new(client, options))
    }

    pub fn client(&self) -> &Arc<HttpClient> {
        &self.client
    }

    pub fn options(&self) -> &CrawlOptions {
        &self.options
    }

    /// Homepage, then up to `max_case_studies` discovered case-study pages.
    /// Case-study failures are logged and skipped; they never fail the site.
    pub async fn crawl(&self, url: &Url) -> SiteCrawl {
        let site = url.host_str().unwrap_or(url.as_str()).to_string();
        info!("[{}] Starting crawl → {}", site, url);

        let homepage = match self.client.fetch(url).await {
            Ok(page) => page,
            Err(error) => {
                error!("[{}] Failed to fetch homepage: {}", site, error);
                return SiteCrawl::HomepageUnreachable { error };
            }
        };

        if !homepage.is_ok() {
            warn!("[{}] Homepage returned status {}", site, homepage.status);
            return SiteCrawl::HomepageStatus { homepage };
        }

        debug!("[{}] Homepage fetched ({} bytes)", site, homepage.byte_size);

        let candidates = match self.classifier.classify(&homepage.body, url) {
            Ok(candidates) => candidates,
            Err(error) => {
                error!("[{}] Link discovery failed: {}", site, error);
                return SiteCrawl::DiscoveryFailed { homepage, error };
            }
        };

        let mut case_studies = Vec::new();
        for candidate in candidates
            .case_studies
            .iter()
            .take(self.options.max_case_studies)
        {
            match self.client.fetch(candidate).await {
                Ok(page) if page.is_ok() => {
                    debug!("[{}] Fetched case study {}: {}", site, case_studies.len() + 1, candidate);
                    case_studies.push(page);
                }
                Ok(page) => {
                    warn!("[{}] Case study {} returned status {}", site, candidate, page.status);
                }
                Err(error) => {
                    warn!("[{}] Failed case study {}: {}", site, candidate, error);
                }
            }
        }

        info!(
            "[{}] Crawl finished | case studies: {} | internal candidates: {}",
            site,
            case_studies.len(),
            candidates.internal.len()
        );

        SiteCrawl::Complete {
            homepage,
            case_studies,
            internal_candidates: candidates.internal,
        }
    }
}
