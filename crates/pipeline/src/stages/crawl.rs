use chrono::{DateTime, Utc};
use crawler::{FetchedPage, SiteCrawl};
use serde::{Deserialize, Serialize};
use storage::{
    case_study_page_id, ArtifactKey, ArtifactStore, CrawlMetadata, PageEntry, RawPageSet,
    HOMEPAGE_PAGE_ID,
};
use tracing::{error, info, warn};

use crate::{Reason, Site, StageReport};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlOutput {
    pub artifact: ArtifactKey,
    pub case_studies_found: usize,
    pub internal_candidates: Vec<String>,
}

fn page_entry(page: &FetchedPage, size_bytes: usize) -> PageEntry {
    PageEntry::Fetched {
        url: page.url.to_string(),
        status: page.status,
        size_bytes,
        timestamp: page.fetched_at,
    }
}

/// Builds the raw artifact for a crawl that reached the homepage. A non-200
/// homepage keeps its status in the metadata but stores no body.
fn raw_page_set(
    site: &Site,
    homepage: &FetchedPage,
    case_studies: &[FetchedPage],
    run_at: DateTime<Utc>,
) -> RawPageSet {
    let (body, size_bytes) = if homepage.is_ok() {
        (homepage.body.clone(), homepage.byte_size)
    } else {
        (String::new(), 0)
    };

    let mut metadata = CrawlMetadata::new(&site.website, site.key.clone(), run_at);
    metadata
        .pages
        .insert(HOMEPAGE_PAGE_ID.to_string(), page_entry(homepage, size_bytes));
    for (index, page) in case_studies.iter().enumerate() {
        metadata
            .pages
            .insert(case_study_page_id(index + 1), page_entry(page, page.byte_size));
    }

    RawPageSet {
        homepage: body,
        case_studies: case_studies.iter().map(|page| page.body.clone()).collect(),
        metadata,
    }
}

/// Homepage never arrived: only the failure is kept, so a previous run's
/// pages cannot feed this run's extraction.
fn record_unreachable(
    store: &dyn ArtifactStore,
    site: &Site,
    error: String,
    run_at: DateTime<Utc>,
) -> StageReport<CrawlOutput> {
    let mut metadata = CrawlMetadata::new(&site.website, site.key.clone(), run_at);
    metadata
        .pages
        .insert(HOMEPAGE_PAGE_ID.to_string(), PageEntry::failed(error.clone()));

    if let Err(e) = store.save_metadata(&site.key, &metadata) {
        error!("[{}] Failed to record crawl failure: {}", site.key, e);
        return StageReport::failed(Reason::StorageError, e.to_string());
    }

    StageReport::failed(Reason::HomepageFetchError, error)
}

/// Replaces the site's raw artifact with the result of `crawl`. Blocks on the
/// store; run it off the async executor.
pub fn record_crawl(
    store: &dyn ArtifactStore,
    site: &Site,
    crawl: SiteCrawl,
    run_at: DateTime<Utc>,
) -> StageReport<CrawlOutput> {
    let raw = match &crawl {
        SiteCrawl::HomepageUnreachable { error } => {
            return record_unreachable(store, site, error.to_string(), run_at);
        }
        SiteCrawl::Complete {
            homepage,
            case_studies,
            ..
        } => raw_page_set(site, homepage, case_studies, run_at),
        SiteCrawl::HomepageStatus { homepage } | SiteCrawl::DiscoveryFailed { homepage, .. } => {
            raw_page_set(site, homepage, &[], run_at)
        }
    };

    if let Err(e) = store.save_raw(&site.key, &raw) {
        error!("[{}] Failed to save raw pages: {}", site.key, e);
        return StageReport::failed(Reason::StorageError, e.to_string());
    }

    let mut output = CrawlOutput {
        artifact: site.key.clone(),
        case_studies_found: raw.case_studies.len(),
        internal_candidates: Vec::new(),
    };

    match crawl {
        SiteCrawl::Complete {
            internal_candidates,
            ..
        } => {
            info!(
                "[{}] Crawl stage complete | case studies: {}",
                site.key, output.case_studies_found
            );
            output.internal_candidates = internal_candidates.iter().map(|url| url.to_string()).collect();
            StageReport::success(output)
        }
        SiteCrawl::HomepageStatus { homepage } => {
            warn!("[{}] Crawl partial: homepage status {}", site.key, homepage.status);
            StageReport::partial(Reason::HomepageStatus, output)
                .with_detail(format!("homepage returned status {}", homepage.status))
        }
        SiteCrawl::DiscoveryFailed { error, .. } => {
            warn!("[{}] Crawl partial: discovery failed: {}", site.key, error);
            StageReport::partial(Reason::ParsingError, output).with_detail(error.to_string())
        }
        SiteCrawl::HomepageUnreachable { error } => {
            StageReport::failed(Reason::HomepageFetchError, error.to_string())
        }
    }
}
