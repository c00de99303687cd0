use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use storage::{ArtifactStore, Record, Section, SectionStats, Summary};
use tracing::{error, info, warn};

use crate::{Reason, Site, StageReport};

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn section_stats(lengths: &[usize]) -> Option<SectionStats> {
    let min = *lengths.iter().min()?;
    let max = *lengths.iter().max()?;
    let total: usize = lengths.iter().sum();

    Some(SectionStats {
        min,
        max,
        avg: round2(total as f64 / lengths.len() as f64),
        count: lengths.len(),
    })
}

/// Summary over each configured site's record list, in site-list order.
///
/// Section statistics take every list as given, so a site listed twice adds
/// its records twice. Site counts are keyed by website and count it once.
/// `None` when there is nothing to summarize.
pub fn summarize(sites: &[Vec<Record>], run_at: DateTime<Utc>) -> Option<Summary> {
    let mut active_by_site: BTreeMap<&str, bool> = BTreeMap::new();
    for first in sites.iter().filter_map(|records| records.first()) {
        active_by_site.insert(&first.website, first.is_active);
    }
    if active_by_site.is_empty() {
        return None;
    }

    let total_websites_processed = active_by_site.len();
    let active_websites = active_by_site.values().filter(|active| **active).count();

    let mut lengths: BTreeMap<Section, Vec<usize>> = BTreeMap::new();
    let mut num_websites_with_case_studies = 0;

    for record in sites.iter().flatten() {
        if record.content.is_empty() {
            continue;
        }
        if record.section == Section::CaseStudy {
            num_websites_with_case_studies += 1;
        }
        lengths
            .entry(record.section)
            .or_default()
            .push(record.content.chars().count());
    }

    let content_length_stats = lengths
        .iter()
        .filter_map(|(section, lengths)| Some((*section, section_stats(lengths)?)))
        .collect();

    Some(Summary {
        total_websites_processed,
        num_websites_with_case_studies,
        active_websites,
        inactive_websites: total_websites_processed - active_websites,
        content_length_stats,
        aggregation_timestamp: run_at,
    })
}

/// Fan-in over every configured site's records, duplicates included.
pub fn aggregate_sites(
    store: &dyn ArtifactStore,
    sites: &[Site],
    run_at: DateTime<Utc>,
) -> StageReport<Summary> {
    let mut per_site = Vec::with_capacity(sites.len());

    for site in sites {
        match store.load_records(&site.key) {
            Ok(Some(records)) => per_site.push(records),
            Ok(None) => {}
            Err(e) => {
                error!("[{}] Failed to load records: {}", site.key, e);
                return StageReport::failed(Reason::StorageError, e.to_string());
            }
        }
    }

    let Some(summary) = summarize(&per_site, run_at) else {
        warn!("No processed records found for aggregation");
        return StageReport::skipped(Reason::NoData);
    };

    if let Err(e) = store.save_summary(&summary) {
        error!("Failed to save summary: {}", e);
        return StageReport::failed(Reason::StorageError, e.to_string());
    }

    info!(
        "Aggregation complete | sites: {} | active: {} | with case studies: {}",
        summary.total_websites_processed,
        summary.active_websites,
        summary.num_websites_with_case_studies
    );

    StageReport::success(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use storage::MemoryArtifactStore;

    fn run_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
    }

    fn record(site: usize, section: Section, content: &str, is_active: bool) -> Record {
        Record {
            website: format!("https://site{}.example", site),
            section,
            content: content.to_string(),
            crawl_timestamp: run_at(),
            is_active,
        }
    }

    #[test]
    fn test_homepage_stats_over_three_sites() {
        let sites = vec![
            vec![record(1, Section::Homepage, &"a".repeat(100), true)],
            vec![record(2, Section::Homepage, &"b".repeat(200), true)],
            vec![record(3, Section::Homepage, &"c".repeat(300), false)],
        ];

        let summary = summarize(&sites, run_at()).unwrap();
        assert_eq!(
            summary.content_length_stats[&Section::Homepage],
            SectionStats {
                min: 100,
                max: 300,
                avg: 200.0,
                count: 3
            }
        );
        assert_eq!(summary.total_websites_processed, 3);
        assert_eq!(summary.active_websites, 2);
        assert_eq!(summary.inactive_websites, 1);
        assert_eq!(summary.aggregation_timestamp, run_at());
    }

    #[test]
    fn test_empty_content_excluded_from_stats() {
        let sites = vec![
            vec![
                record(1, Section::Homepage, "Welcome", true),
                record(1, Section::Navbar, "", true),
                record(1, Section::CaseStudy, "", true),
            ],
            vec![
                record(2, Section::Homepage, "Hi", true),
                record(2, Section::CaseStudy, "Story", true),
            ],
        ];

        let summary = summarize(&sites, run_at()).unwrap();
        assert_eq!(summary.num_websites_with_case_studies, 1);
        assert!(!summary.content_length_stats.contains_key(&Section::Navbar));
        assert_eq!(summary.content_length_stats[&Section::CaseStudy].count, 1);
        assert_eq!(summary.content_length_stats[&Section::Homepage].min, 2);
    }

    #[test]
    fn test_average_rounds_to_two_decimals() {
        let sites = vec![
            vec![record(1, Section::Footer, "a", false)],
            vec![record(2, Section::Footer, "ab", false)],
            vec![record(3, Section::Footer, "ab", false)],
        ];

        let summary = summarize(&sites, run_at()).unwrap();
        assert_eq!(summary.content_length_stats[&Section::Footer].avg, 1.67);
    }

    #[test]
    fn test_lengths_count_characters() {
        let sites = vec![vec![record(1, Section::Homepage, "héllo", true)]];
        let summary = summarize(&sites, run_at()).unwrap();
        assert_eq!(summary.content_length_stats[&Section::Homepage].max, 5);
    }

    #[test]
    fn test_nothing_to_summarize() {
        assert!(summarize(&[], run_at()).is_none());
        assert!(summarize(&[Vec::new(), Vec::new()], run_at()).is_none());
    }

    #[test]
    fn test_active_plus_inactive_is_total() {
        let sites: Vec<Vec<Record>> = (0..7)
            .map(|i| vec![record(i, Section::Homepage, "x", i % 3 == 0)])
            .collect();
        let summary = summarize(&sites, run_at()).unwrap();
        assert_eq!(summary.total_websites_processed, 7);
        assert_eq!(
            summary.active_websites + summary.inactive_websites,
            summary.total_websites_processed
        );
    }

    #[test]
    fn test_duplicated_site_counts_records_twice() {
        let store = MemoryArtifactStore::new();
        let twice = Site::parse("https://site1.example").unwrap();
        let once = Site::parse("https://site2.example").unwrap();

        store
            .save_records(
                &twice.key,
                &[
                    record(1, Section::Homepage, "abcd", true),
                    record(1, Section::CaseStudy, "story", true),
                ],
            )
            .unwrap();
        store
            .save_records(&once.key, &[record(2, Section::Homepage, "ab", false)])
            .unwrap();

        let sites = vec![twice.clone(), once, twice];
        let summary = aggregate_sites(&store, &sites, run_at()).output.unwrap();

        assert_eq!(summary.content_length_stats[&Section::Homepage].count, 3);
        assert_eq!(summary.content_length_stats[&Section::Homepage].avg, 3.33);
        assert_eq!(summary.content_length_stats[&Section::CaseStudy].count, 2);
        assert_eq!(summary.num_websites_with_case_studies, 2);

        assert_eq!(summary.total_websites_processed, 2);
        assert_eq!(summary.active_websites, 1);
        assert_eq!(summary.inactive_websites, 1);
    }
}
