use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use url::Url;

use crate::{Result, StorageError};

pub const HOMEPAGE_PAGE_ID: &str = "homepage";

/// `case_study_01`, `case_study_02`, ... (1-based).
pub fn case_study_page_id(index: usize) -> String {
    format!("case_study_{:02}", index)
}

/// Storage key for every per-site artifact: the site's `host[:port]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactKey(String);

impl ArtifactKey {
    pub fn new(domain: impl Into<String>) -> Result<Self> {
        let domain = domain.into();
        if domain.is_empty()
            || domain == "."
            || domain == ".."
            || domain.contains(['/', '\\'])
            || domain.chars().any(char::is_control)
        {
            return Err(StorageError::InvalidKey(domain));
        }
        Ok(Self(domain))
    }

    pub fn from_url(url: &Url) -> Result<Self> {
        let host = url
            .host_str()
            .ok_or_else(|| StorageError::InvalidKey(url.to_string()))?;
        match url.port() {
            Some(port) => Self::new(format!("{}:{}", host, port)),
            None => Self::new(host),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One entry of the crawl metadata: either a fetched page (any status) or a
/// transport failure recorded with status 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PageEntry {
    Fetched {
        url: String,
        status: u16,
        size_bytes: usize,
        timestamp: DateTime<Utc>,
    },
    Failed {
        status: u16,
        error: String,
    },
}

impl PageEntry {
    pub fn failed(error: impl Into<String>) -> Self {
        PageEntry::Failed {
            status: 0,
            error: error.into(),
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            PageEntry::Fetched { status, .. } | PageEntry::Failed { status, .. } => *status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlMetadata {
    pub website: String,
    pub domain: ArtifactKey,
    pub crawl_timestamp: DateTime<Utc>,
    pub pages: BTreeMap<String, PageEntry>,
}

impl CrawlMetadata {
    pub fn new(website: impl Into<String>, domain: ArtifactKey, crawl_timestamp: DateTime<Utc>) -> Self {
        Self {
            website: website.into(),
            domain,
            crawl_timestamp,
            pages: BTreeMap::new(),
        }
    }

    /// Homepage status; a missing entry reads as 500.
    pub fn homepage_status(&self) -> u16 {
        self.pages
            .get(HOMEPAGE_PAGE_ID)
            .map(PageEntry::status)
            .unwrap_or(500)
    }
}

/// Everything the crawl stage persists for one site.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPageSet {
    pub homepage: String,
    pub case_studies: Vec<String>,
    pub metadata: CrawlMetadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Homepage,
    Navbar,
    Footer,
    CaseStudy,
}

impl Section {
    pub const ALL: [Section; 4] = [
        Section::Homepage,
        Section::Navbar,
        Section::Footer,
        Section::CaseStudy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Homepage => "homepage",
            Section::Navbar => "navbar",
            Section::Footer => "footer",
            Section::CaseStudy => "case_study",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type SectionMap = BTreeMap<Section, String>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedSections {
    pub website: String,
    pub domain: ArtifactKey,
    pub extracted_at: DateTime<Utc>,
    pub sections: SectionMap,
}

impl ExtractedSections {
    pub fn has_content(&self) -> bool {
        self.sections.values().any(|text| !text.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub website: String,
    pub section: Section,
    pub content: String,
    pub crawl_timestamp: DateTime<Utc>,
    #[serde(rename = "isActive")]
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionStats {
    pub min: usize,
    pub max: usize,
    pub avg: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_websites_processed: usize,
    pub num_websites_with_case_studies: usize,
    pub active_websites: usize,
    pub inactive_websites: usize,
    pub content_length_stats: BTreeMap<Section, SectionStats>,
    pub aggregation_timestamp: DateTime<Utc>,
}
