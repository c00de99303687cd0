use crawler::{
    CrawlOptions, CrawlerConfig, RateLimitConfig, RateLimiter, SectionExtractor, SectionKind,
    SiteCrawl, SiteCrawler,
};
use std::sync::Arc;
use url::Url;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let target = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "https://example.com".to_string());
    let url = Url::parse(&target)?;

    let config = CrawlerConfig::default().with_rate_limit(RateLimitConfig::per_minute(30));
    let limiter = Arc::new(RateLimiter::new(config.rate_limit.clone())?);
    let crawler = SiteCrawler::from_config(config, CrawlOptions::default(), limiter)?;

    let crawl = crawler.crawl(&url).await;
    let extractor = SectionExtractor::new();

    match &crawl {
        SiteCrawl::HomepageUnreachable { error } => {
            println!("Homepage unreachable: {}", error);
            return Ok(());
        }
        SiteCrawl::HomepageStatus { homepage } => {
            println!("Homepage returned status {}", homepage.status);
            return Ok(());
        }
        SiteCrawl::DiscoveryFailed { error, .. } => {
            println!("Link discovery failed: {}", error);
        }
        SiteCrawl::Complete {
            internal_candidates,
            ..
        } => {
            println!("Internal candidates: {}", internal_candidates.len());
        }
    }

    if let Some(homepage) = crawl.homepage() {
        for kind in [SectionKind::Homepage, SectionKind::Navbar, SectionKind::Footer] {
            let text = extractor.extract(&homepage.body, kind);
            println!("[{}] {} chars", kind, text.chars().count());
        }
    }

    for (index, page) in crawl.case_studies().iter().enumerate() {
        let text = extractor.extract(&page.body, SectionKind::CaseStudy);
        println!("[case study {}] {} | {} chars", index + 1, page.url, text.chars().count());
    }

    Ok(())
}
