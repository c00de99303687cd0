use chrono::{DateTime, TimeZone, Utc};
use std::collections::BTreeMap;
use std::fs;
use storage::{
    case_study_page_id, ArtifactKey, ArtifactStore, CrawlMetadata, ExtractedSections,
    FsArtifactStore, MemoryArtifactStore, PageEntry, RawPageSet, Record, Section, SectionStats,
    Summary, HOMEPAGE_PAGE_ID,
};
use tempfile::tempdir;

fn run_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap()
}

fn key() -> ArtifactKey {
    ArtifactKey::new("example.com").unwrap()
}

fn raw_set(case_studies: usize) -> RawPageSet {
    let mut metadata = CrawlMetadata::new("https://example.com", key(), run_at());
    metadata.pages.insert(
        HOMEPAGE_PAGE_ID.to_string(),
        PageEntry::Fetched {
            url: "https://example.com/".to_string(),
            status: 200,
            size_bytes: 27,
            timestamp: run_at(),
        },
    );

    let mut bodies = Vec::new();
    for n in 1..=case_studies {
        let body = format!("<main>Story {}</main>", n);
        metadata.pages.insert(
            case_study_page_id(n),
            PageEntry::Fetched {
                url: format!("https://example.com/case-studies/{}", n),
                status: 200,
                size_bytes: body.len(),
                timestamp: run_at(),
            },
        );
        bodies.push(body);
    }

    RawPageSet {
        homepage: "<html><body>Hi</body></html>".to_string(),
        case_studies: bodies,
        metadata,
    }
}

fn sections() -> ExtractedSections {
    let mut map = BTreeMap::new();
    map.insert(Section::Homepage, "Welcome".to_string());
    map.insert(Section::Navbar, String::new());
    map.insert(Section::CaseStudy, "Story 1 Story 2".to_string());
    ExtractedSections {
        website: "https://example.com".to_string(),
        domain: key(),
        extracted_at: run_at(),
        sections: map,
    }
}

fn records() -> Vec<Record> {
    [Section::Homepage, Section::CaseStudy]
        .into_iter()
        .map(|section| Record {
            website: "https://example.com".to_string(),
            section,
            content: format!("{} text", section),
            crawl_timestamp: run_at(),
            is_active: true,
        })
        .collect()
}

fn summary() -> Summary {
    let mut stats = BTreeMap::new();
    stats.insert(
        Section::Homepage,
        SectionStats {
            min: 100,
            max: 300,
            avg: 200.0,
            count: 3,
        },
    );
    Summary {
        total_websites_processed: 3,
        num_websites_with_case_studies: 2,
        active_websites: 2,
        inactive_websites: 1,
        content_length_stats: stats,
        aggregation_timestamp: run_at(),
    }
}

fn exercise_round_trips(store: &dyn ArtifactStore) {
    let key = key();

    assert!(store.load_raw(&key).unwrap().is_none());
    assert!(store.load_sections(&key).unwrap().is_none());
    assert!(store.load_records(&key).unwrap().is_none());
    assert!(store.load_summary().unwrap().is_none());

    let raw = raw_set(2);
    store.save_raw(&key, &raw).unwrap();
    assert_eq!(store.load_raw(&key).unwrap(), Some(raw.clone()));
    assert_eq!(store.load_metadata(&key).unwrap(), Some(raw.metadata));

    store.save_sections(&key, &sections()).unwrap();
    assert_eq!(store.load_sections(&key).unwrap(), Some(sections()));

    store.save_records(&key, &records()).unwrap();
    assert_eq!(store.load_records(&key).unwrap(), Some(records()));

    store.save_summary(&summary()).unwrap();
    assert_eq!(store.load_summary().unwrap(), Some(summary()));

    store.remove_raw(&key).unwrap();
    store.remove_sections(&key).unwrap();
    store.remove_records(&key).unwrap();
    assert!(store.load_raw(&key).unwrap().is_none());
    assert!(store.load_metadata(&key).unwrap().is_none());
    assert!(store.load_sections(&key).unwrap().is_none());
    assert!(store.load_records(&key).unwrap().is_none());

    // Removing twice is fine
    store.remove_raw(&key).unwrap();
    store.remove_records(&key).unwrap();
}

fn unreachable_metadata() -> CrawlMetadata {
    let mut metadata = CrawlMetadata::new("https://example.com", key(), run_at());
    metadata.pages.insert(
        HOMEPAGE_PAGE_ID.to_string(),
        PageEntry::failed("connection refused"),
    );
    metadata
}

fn exercise_metadata_only(store: &dyn ArtifactStore) {
    let key = key();

    store.save_raw(&key, &raw_set(2)).unwrap();
    store.save_metadata(&key, &unreachable_metadata()).unwrap();

    // Old pages are gone, the failure stays readable
    assert!(store.load_raw(&key).unwrap().is_none());
    let metadata = store.load_metadata(&key).unwrap().unwrap();
    assert_eq!(metadata, unreachable_metadata());
    assert_eq!(metadata.homepage_status(), 0);

    // A later successful crawl replaces it
    store.save_raw(&key, &raw_set(1)).unwrap();
    assert_eq!(store.load_raw(&key).unwrap(), Some(raw_set(1)));

    store.save_metadata(&key, &unreachable_metadata()).unwrap();
    store.remove_raw(&key).unwrap();
    assert!(store.load_metadata(&key).unwrap().is_none());
}

#[test]
fn test_fs_store_round_trips_all_artifacts() {
    let dir = tempdir().unwrap();
    let store = FsArtifactStore::new(dir.path()).unwrap();
    exercise_round_trips(&store);
}

#[test]
fn test_memory_store_round_trips_all_artifacts() {
    let store = MemoryArtifactStore::new();
    exercise_round_trips(&store);
}

#[test]
fn test_fs_store_metadata_only_crawl() {
    let dir = tempdir().unwrap();
    let store = FsArtifactStore::new(dir.path()).unwrap();
    exercise_metadata_only(&store);

    store.save_metadata(&key(), &unreachable_metadata()).unwrap();
    let site_dir = dir.path().join("raw/example.com");
    assert!(site_dir.join("metadata.json").is_file());
    assert!(!site_dir.join("homepage.html").exists());
    assert!(!site_dir.join("case_study_01.html").exists());

    let metadata_json = fs::read_to_string(site_dir.join("metadata.json")).unwrap();
    assert!(metadata_json.contains("\"status\": 0"));
    assert!(metadata_json.contains("\"error\": \"connection refused\""));
}

#[test]
fn test_memory_store_metadata_only_crawl() {
    let store = MemoryArtifactStore::new();
    exercise_metadata_only(&store);
}

#[test]
fn test_fs_store_layout() {
    let dir = tempdir().unwrap();
    let store = FsArtifactStore::new(dir.path()).unwrap();
    let key = key();

    store.save_raw(&key, &raw_set(2)).unwrap();
    store.save_sections(&key, &sections()).unwrap();
    store.save_records(&key, &records()).unwrap();
    store.save_summary(&summary()).unwrap();

    let root = dir.path();
    assert!(root.join("raw/example.com/homepage.html").is_file());
    assert!(root.join("raw/example.com/case_study_01.html").is_file());
    assert!(root.join("raw/example.com/case_study_02.html").is_file());
    assert!(root.join("raw/example.com/metadata.json").is_file());
    assert!(root.join("extracted/example.com.json").is_file());
    assert!(root.join("processed/example.com.json").is_file());
    assert!(root.join("metrics/summary.json").is_file());

    // No temp files left behind
    let leftovers: Vec<_> = fs::read_dir(root.join("raw/example.com"))
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());

    let records_json = fs::read_to_string(root.join("processed/example.com.json")).unwrap();
    assert!(records_json.contains("\"isActive\": true"));
    let metadata_json = fs::read_to_string(root.join("raw/example.com/metadata.json")).unwrap();
    assert!(metadata_json.contains("\"crawl_timestamp\": \"2024-05-01T09:30:00Z\""));
}

#[test]
fn test_fs_store_resave_drops_stale_case_studies() {
    let dir = tempdir().unwrap();
    let store = FsArtifactStore::new(dir.path()).unwrap();
    let key = key();

    store.save_raw(&key, &raw_set(3)).unwrap();
    store.save_raw(&key, &raw_set(1)).unwrap();

    let loaded = store.load_raw(&key).unwrap().unwrap();
    assert_eq!(loaded.case_studies.len(), 1);
    assert!(!dir.path().join("raw/example.com/case_study_02.html").exists());
}

#[test]
fn test_fs_store_stops_at_first_case_study_gap() {
    let dir = tempdir().unwrap();
    let store = FsArtifactStore::new(dir.path()).unwrap();
    let key = key();

    store.save_raw(&key, &raw_set(3)).unwrap();
    fs::remove_file(dir.path().join("raw/example.com/case_study_02.html")).unwrap();

    let loaded = store.load_raw(&key).unwrap().unwrap();
    assert_eq!(loaded.case_studies, vec!["<main>Story 1</main>".to_string()]);
}

#[test]
fn test_fs_store_without_metadata_reads_as_absent() {
    let dir = tempdir().unwrap();
    let store = FsArtifactStore::new(dir.path()).unwrap();
    let key = key();

    // Interrupted crawl: bodies on disk, metadata never written
    let site_dir = dir.path().join("raw/example.com");
    fs::create_dir_all(&site_dir).unwrap();
    fs::write(site_dir.join("homepage.html"), "<html></html>").unwrap();

    assert!(store.load_raw(&key).unwrap().is_none());
    assert!(store.load_metadata(&key).unwrap().is_none());
}

#[test]
fn test_fs_store_rejects_file_root() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("not-a-dir");
    fs::write(&file, "x").unwrap();

    assert!(FsArtifactStore::new(&file).is_err());
}
