use serde::{de::DeserializeOwned, Serialize};
use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};
use tracing::{debug, info};

use crate::{
    case_study_page_id, ArtifactKey, ArtifactStore, CrawlMetadata, ExtractedSections,
    RawPageSet, Record, Result, StorageError, Summary,
};

const RAW_DIR: &str = "raw";
const EXTRACTED_DIR: &str = "extracted";
const PROCESSED_DIR: &str = "processed";
const METRICS_DIR: &str = "metrics";

const HOMEPAGE_FILE: &str = "homepage.html";
const METADATA_FILE: &str = "metadata.json";
const SUMMARY_FILE: &str = "summary.json";

/// Directory-backed store:
///
/// ```text
/// raw/<domain>/homepage.html
/// raw/<domain>/case_study_NN.html
/// raw/<domain>/metadata.json
/// extracted/<domain>.json
/// processed/<domain>.json
/// metrics/summary.json
/// ```
///
/// Files are written to a temporary sibling and renamed into place. The raw
/// set's `metadata.json` goes last, so a crawl interrupted mid-save reads
/// back as absent. A directory holding only `metadata.json` records a crawl
/// whose homepage never arrived.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if root.exists() && !root.is_dir() {
            return Err(StorageError::InvalidPath(root.display().to_string()));
        }

        for dir in [RAW_DIR, EXTRACTED_DIR, PROCESSED_DIR, METRICS_DIR] {
            fs::create_dir_all(root.join(dir))?;
        }

        info!("Artifact store initialized at {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn raw_dir(&self, key: &ArtifactKey) -> PathBuf {
        self.root.join(RAW_DIR).join(key.as_str())
    }

    fn sections_path(&self, key: &ArtifactKey) -> PathBuf {
        self.root
            .join(EXTRACTED_DIR)
            .join(format!("{}.json", key.as_str()))
    }

    fn records_path(&self, key: &ArtifactKey) -> PathBuf {
        self.root
            .join(PROCESSED_DIR)
            .join(format!("{}.json", key.as_str()))
    }

    fn summary_path(&self) -> PathBuf {
        self.root.join(METRICS_DIR).join(SUMMARY_FILE)
    }
}

fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| StorageError::InvalidPath(path.display().to_string()))?;
    fs::create_dir_all(parent)?;

    let file_name = path
        .file_name()
        .ok_or_else(|| StorageError::InvalidPath(path.display().to_string()))?;
    let mut tmp_name = file_name.to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = parent.join(tmp_name);

    let mut file = fs::File::create(&tmp_path)?;
    file.write_all(contents)?;
    file.sync_all()?;
    drop(file);

    fs::rename(&tmp_path, path)?;
    Ok(())
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    write_atomic(path, &bytes)
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match read_optional(path)? {
        Some(contents) => Ok(Some(serde_json::from_str(&contents)?)),
        None => Ok(None),
    }
}

fn remove_file_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn remove_dir_if_exists(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

impl ArtifactStore for FsArtifactStore {
    fn save_raw(&self, key: &ArtifactKey, raw: &RawPageSet) -> Result<()> {
        let dir = self.raw_dir(key);

        // Previous run may have had more case studies
        remove_dir_if_exists(&dir)?;
        fs::create_dir_all(&dir)?;

        write_atomic(&dir.join(HOMEPAGE_FILE), raw.homepage.as_bytes())?;
        for (index, body) in raw.case_studies.iter().enumerate() {
            let file = format!("{}.html", case_study_page_id(index + 1));
            write_atomic(&dir.join(file), body.as_bytes())?;
        }
        write_json(&dir.join(METADATA_FILE), &raw.metadata)?;

        debug!(
            "[{}] Saved raw pages (case studies: {})",
            key,
            raw.case_studies.len()
        );
        Ok(())
    }

    fn save_metadata(&self, key: &ArtifactKey, metadata: &CrawlMetadata) -> Result<()> {
        let dir = self.raw_dir(key);

        remove_dir_if_exists(&dir)?;
        fs::create_dir_all(&dir)?;
        write_json(&dir.join(METADATA_FILE), metadata)?;

        debug!("[{}] Saved crawl metadata without pages", key);
        Ok(())
    }

    fn load_raw(&self, key: &ArtifactKey) -> Result<Option<RawPageSet>> {
        let dir = self.raw_dir(key);

        let Some(metadata) = read_json::<CrawlMetadata>(&dir.join(METADATA_FILE))? else {
            return Ok(None);
        };

        let Some(homepage) = read_optional(&dir.join(HOMEPAGE_FILE))? else {
            return Ok(None);
        };

        // Stop at the first gap
        let mut case_studies = Vec::new();
        loop {
            let file = format!("{}.html", case_study_page_id(case_studies.len() + 1));
            match read_optional(&dir.join(file))? {
                Some(body) => case_studies.push(body),
                None => break,
            }
        }

        Ok(Some(RawPageSet {
            homepage,
            case_studies,
            metadata,
        }))
    }

    fn load_metadata(&self, key: &ArtifactKey) -> Result<Option<CrawlMetadata>> {
        read_json(&self.raw_dir(key).join(METADATA_FILE))
    }

    fn remove_raw(&self, key: &ArtifactKey) -> Result<()> {
        remove_dir_if_exists(&self.raw_dir(key))
    }

    fn save_sections(&self, key: &ArtifactKey, sections: &ExtractedSections) -> Result<()> {
        write_json(&self.sections_path(key), sections)
    }

    fn load_sections(&self, key: &ArtifactKey) -> Result<Option<ExtractedSections>> {
        read_json(&self.sections_path(key))
    }

    fn remove_sections(&self, key: &ArtifactKey) -> Result<()> {
        remove_file_if_exists(&self.sections_path(key))
    }

    fn save_records(&self, key: &ArtifactKey, records: &[Record]) -> Result<()> {
        write_json(&self.records_path(key), records)
    }

    fn load_records(&self, key: &ArtifactKey) -> Result<Option<Vec<Record>>> {
        read_json(&self.records_path(key))
    }

    fn remove_records(&self, key: &ArtifactKey) -> Result<()> {
        remove_file_if_exists(&self.records_path(key))
    }

    fn save_summary(&self, summary: &Summary) -> Result<()> {
        write_json(&self.summary_path(), summary)
    }

    fn load_summary(&self) -> Result<Option<Summary>> {
        read_json(&self.summary_path())
    }
}
