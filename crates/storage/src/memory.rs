use std::{
    collections::HashMap,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::{
    ArtifactKey, ArtifactStore, CrawlMetadata, ExtractedSections, RawPageSet, Record, Result,
    StorageError, Summary,
};

#[derive(Debug, Default)]
struct Artifacts {
    raw: HashMap<ArtifactKey, RawPageSet>,
    metadata: HashMap<ArtifactKey, CrawlMetadata>,
    sections: HashMap<ArtifactKey, ExtractedSections>,
    records: HashMap<ArtifactKey, Vec<Record>>,
    summary: Option<Summary>,
}

/// In-process store for tests and dry runs. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    inner: RwLock<Artifacts>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Artifacts>> {
        self.inner
            .read()
            .map_err(|e| StorageError::Poisoned(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Artifacts>> {
        self.inner
            .write()
            .map_err(|e| StorageError::Poisoned(e.to_string()))
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn save_raw(&self, key: &ArtifactKey, raw: &RawPageSet) -> Result<()> {
        let mut artifacts = self.write()?;
        artifacts.metadata.insert(key.clone(), raw.metadata.clone());
        artifacts.raw.insert(key.clone(), raw.clone());
        Ok(())
    }

    fn save_metadata(&self, key: &ArtifactKey, metadata: &CrawlMetadata) -> Result<()> {
        let mut artifacts = self.write()?;
        artifacts.raw.remove(key);
        artifacts.metadata.insert(key.clone(), metadata.clone());
        Ok(())
    }

    fn load_raw(&self, key: &ArtifactKey) -> Result<Option<RawPageSet>> {
        Ok(self.read()?.raw.get(key).cloned())
    }

    fn load_metadata(&self, key: &ArtifactKey) -> Result<Option<CrawlMetadata>> {
        Ok(self.read()?.metadata.get(key).cloned())
    }

    fn remove_raw(&self, key: &ArtifactKey) -> Result<()> {
        let mut artifacts = self.write()?;
        artifacts.raw.remove(key);
        artifacts.metadata.remove(key);
        Ok(())
    }

    fn save_sections(&self, key: &ArtifactKey, sections: &ExtractedSections) -> Result<()> {
        self.write()?.sections.insert(key.clone(), sections.clone());
        Ok(())
    }

    fn load_sections(&self, key: &ArtifactKey) -> Result<Option<ExtractedSections>> {
        Ok(self.read()?.sections.get(key).cloned())
    }

    fn remove_sections(&self, key: &ArtifactKey) -> Result<()> {
        self.write()?.sections.remove(key);
        Ok(())
    }

    fn save_records(&self, key: &ArtifactKey, records: &[Record]) -> Result<()> {
        self.write()?.records.insert(key.clone(), records.to_vec());
        Ok(())
    }

    fn load_records(&self, key: &ArtifactKey) -> Result<Option<Vec<Record>>> {
        Ok(self.read()?.records.get(key).cloned())
    }

    fn remove_records(&self, key: &ArtifactKey) -> Result<()> {
        self.write()?.records.remove(key);
        Ok(())
    }

    fn save_summary(&self, summary: &Summary) -> Result<()> {
        self.write()?.summary = Some(summary.clone());
        Ok(())
    }

    fn load_summary(&self) -> Result<Option<Summary>> {
        Ok(self.read()?.summary.clone())
    }
}
