use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storage::{ArtifactKey, ArtifactStore, CrawlMetadata, ExtractedSections, Record};
use tracing::{error, info, warn};

use crate::{Reason, Site, StageReport};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformOutput {
    pub artifact: ArtifactKey,
    pub records_count: usize,
    pub is_active: bool,
}

/// Active means the homepage answered 200 and some section has text.
pub fn is_active(metadata: &CrawlMetadata, sections: &ExtractedSections) -> bool {
    metadata.homepage_status() == 200 && sections.has_content()
}

/// One record per section, empty ones included, all sharing the site's
/// active flag and the run timestamp.
pub fn build_records(
    website: &str,
    metadata: &CrawlMetadata,
    sections: &ExtractedSections,
    run_at: DateTime<Utc>,
) -> Vec<Record> {
    let active = is_active(metadata, sections);

    sections
        .sections
        .iter()
        .map(|(section, content)| Record {
            website: website.to_string(),
            section: *section,
            content: content.clone(),
            crawl_timestamp: run_at,
            is_active: active,
        })
        .collect()
}

fn skip(store: &dyn ArtifactStore, site: &Site, reason: Reason) -> StageReport<TransformOutput> {
    if let Err(e) = store.remove_records(&site.key) {
        error!("[{}] Failed to clear stale records: {}", site.key, e);
        return StageReport::failed(Reason::StorageError, e.to_string());
    }
    StageReport::skipped(reason)
}

pub fn transform_site(
    store: &dyn ArtifactStore,
    site: &Site,
    run_at: DateTime<Utc>,
) -> StageReport<TransformOutput> {
    let metadata = match store.load_metadata(&site.key) {
        Ok(Some(metadata)) => metadata,
        Ok(None) => {
            warn!("[{}] No crawl metadata, skipping transform", site.key);
            return skip(store, site, Reason::NoRawData);
        }
        Err(e) => return StageReport::failed(Reason::StorageError, e.to_string()),
    };

    let sections = match store.load_sections(&site.key) {
        Ok(Some(sections)) => sections,
        Ok(None) => {
            warn!("[{}] No extracted sections, skipping transform", site.key);
            return skip(store, site, Reason::MissingInputs);
        }
        Err(e) => return StageReport::failed(Reason::StorageError, e.to_string()),
    };

    let records = build_records(&site.website, &metadata, &sections, run_at);
    let active = records.first().map_or(false, |record| record.is_active);

    if let Err(e) = store.save_records(&site.key, &records) {
        error!("[{}] Failed to save records: {}", site.key, e);
        return StageReport::failed(Reason::StorageError, e.to_string());
    }

    info!(
        "[{}] Transformed {} records | isActive: {}",
        site.key,
        records.len(),
        active
    );

    StageReport::success(TransformOutput {
        artifact: site.key.clone(),
        records_count: records.len(),
        is_active: active,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use storage::{PageEntry, Section, SectionMap, HOMEPAGE_PAGE_ID};

    fn run_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
    }

    fn metadata(status: Option<u16>) -> CrawlMetadata {
        let key = ArtifactKey::new("example.com").unwrap();
        let mut metadata = CrawlMetadata::new("https://example.com", key, run_at());
        if let Some(status) = status {
            metadata.pages.insert(
                HOMEPAGE_PAGE_ID.to_string(),
                PageEntry::Fetched {
                    url: "https://example.com/".to_string(),
                    status,
                    size_bytes: 0,
                    timestamp: run_at(),
                },
            );
        }
        metadata
    }

    fn sections(pairs: &[(Section, &str)]) -> ExtractedSections {
        let map: SectionMap = pairs
            .iter()
            .map(|(section, text)| (*section, text.to_string()))
            .collect();
        ExtractedSections {
            website: "https://example.com".to_string(),
            domain: ArtifactKey::new("example.com").unwrap(),
            extracted_at: run_at(),
            sections: map,
        }
    }

    #[test]
    fn test_one_record_per_section_with_shared_flag() {
        let sections = sections(&[
            (Section::Homepage, "Welcome"),
            (Section::Navbar, ""),
            (Section::Footer, "Legal"),
            (Section::CaseStudy, ""),
        ]);
        let records = build_records("https://example.com", &metadata(Some(200)), &sections, run_at());

        assert_eq!(records.len(), 4);
        assert!(records.iter().all(|record| record.is_active));
        assert!(records.iter().all(|record| record.crawl_timestamp == run_at()));
        assert_eq!(records[1].section, Section::Navbar);
        assert_eq!(records[1].content, "");
    }

    #[test]
    fn test_inactive_on_bad_status_or_no_content() {
        let full = sections(&[(Section::Homepage, "Welcome")]);
        let empty = sections(&[(Section::Homepage, "")]);

        assert!(!is_active(&metadata(Some(404)), &full));
        assert!(!is_active(&metadata(Some(200)), &empty));
        // Missing homepage entry reads as 500
        assert!(!is_active(&metadata(None), &full));
        assert!(is_active(&metadata(Some(200)), &full));
    }
}
