use crate::{ArtifactKey, CrawlMetadata, ExtractedSections, RawPageSet, Record, Result, Summary};

/// Persistence for the pipeline's per-site artifacts and the run summary.
///
/// Every `save_*` fully replaces what was stored under the key before.
/// `load_*` returns `Ok(None)` when the artifact is absent; `remove_*` on an
/// absent artifact is a no-op.
pub trait ArtifactStore: Send + Sync {
    fn save_raw(&self, key: &ArtifactKey, raw: &RawPageSet) -> Result<()>;
    /// Replaces the raw set with metadata alone, for a crawl that fetched no
    /// pages. `load_raw` then returns `None` while `load_metadata` still
    /// reports the failure.
    fn save_metadata(&self, key: &ArtifactKey, metadata: &CrawlMetadata) -> Result<()>;
    fn load_raw(&self, key: &ArtifactKey) -> Result<Option<RawPageSet>>;
    /// Metadata only, without reading any page bodies.
    fn load_metadata(&self, key: &ArtifactKey) -> Result<Option<CrawlMetadata>>;
    fn remove_raw(&self, key: &ArtifactKey) -> Result<()>;

    fn save_sections(&self, key: &ArtifactKey, sections: &ExtractedSections) -> Result<()>;
    fn load_sections(&self, key: &ArtifactKey) -> Result<Option<ExtractedSections>>;
    fn remove_sections(&self, key: &ArtifactKey) -> Result<()>;

    fn save_records(&self, key: &ArtifactKey, records: &[Record]) -> Result<()>;
    fn load_records(&self, key: &ArtifactKey) -> Result<Option<Vec<Record>>>;
    fn remove_records(&self, key: &ArtifactKey) -> Result<()>;

    fn save_summary(&self, summary: &Summary) -> Result<()>;
    fn load_summary(&self) -> Result<Option<Summary>>;
}
