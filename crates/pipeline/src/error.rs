use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Crawler error: {0}")]
    Crawler(#[from] crawler::CrawlerError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Site list error: {0}")]
    SiteList(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid site URL {url}: {reason}")]
    InvalidSite { url: String, reason: String },
}

pub type Result<T> = std::result::Result<T, PipelineError>;
