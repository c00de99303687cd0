//! The four pipeline stages. Each one reads the previous stage's artifact from
//! an [`storage::ArtifactStore`], fully replaces its own, and reports through
//! a [`crate::StageReport`] instead of returning errors.

pub mod aggregate;
pub mod crawl;
pub mod extract;
pub mod transform;

pub use aggregate::{aggregate_sites, summarize};
pub use crawl::{record_crawl, CrawlOutput};
pub use extract::{extract_site, ExtractOutput};
pub use transform::{transform_site, TransformOutput};
