use scraper::{Html, Selector};
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

use crate::{CrawlOptions, CrawlerError, Result};

static ANCHOR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("static selector"));

/// Substrings of a lowercased href that mark a customer-story page.
pub const CASE_STUDY_KEYWORDS: &[&str] = &[
    "case-study",
    "case-studies",
    "success-story",
    "success-stories",
    "customer-story",
    "customer-stories",
    "case",
    "stories",
    "/clients/",
    "/work/",
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkCandidates {
    pub case_studies: Vec<Url>,
    pub internal: Vec<Url>,
}

#[derive(Debug, Clone)]
pub struct LinkClassifier {
    max_case_studies: usize,
    max_internal: usize,
}

impl LinkClassifier {
    pub fn new(max_case_studies: usize, max_internal: usize) -> Self {
        Self {
            max_case_studies,
            max_internal,
        }
    }

    pub fn from_options(options: &CrawlOptions) -> Self {
        Self::new(options.max_case_studies, options.max_internal_pages)
    }

    /// Splits the page's anchors into case-study candidates and generic
    /// internal pages, both in document order and free of duplicates.
    pub fn classify(&self, html: &str, base_url: &Url) -> Result<LinkCandidates> {
        if base_url.cannot_be_a_base() {
            return Err(CrawlerError::ParseError(format!(
                "cannot resolve links against {}",
                base_url
            )));
        }

        let document = Html::parse_document(html);
        let base = base_url.as_str();
        let mut candidates = LinkCandidates::default();

        for anchor in document.select(&ANCHOR_SELECTOR) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            let href = href.trim();
            let lower_href = href.to_lowercase();

            if href.starts_with('#') || lower_href.starts_with("javascript:") {
                continue;
            }

            let resolved = match base_url.join(href) {
                Ok(url) => url,
                Err(e) => {
                    debug!("Skipping unresolvable href {:?}: {}", href, e);
                    continue;
                }
            };

            if !matches!(resolved.scheme(), "http" | "https") {
                continue;
            }

            if is_case_study_href(&lower_href) {
                push_capped(&mut candidates.case_studies, resolved, self.max_case_studies);
            } else if resolved.as_str().starts_with(base) && resolved.as_str() != base {
                push_capped(&mut candidates.internal, resolved, self.max_internal);
            }
        }

        debug!(
            "Found {} case-study candidates and {} internal pages on {}",
            candidates.case_studies.len(),
            candidates.internal.len(),
            base_url
        );

        Ok(candidates)
    }
}

pub fn is_case_study_href(lower_href: &str) -> bool {
    CASE_STUDY_KEYWORDS
        .iter()
        .any(|keyword| lower_href.contains(keyword))
}

fn push_capped(list: &mut Vec<Url>, url: Url, cap: usize) {
    if list.len() < cap && !list.contains(&url) {
        list.push(url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com").unwrap()
    }

    #[test]
    fn test_case_study_and_internal_split() {
        let html = r#"
            <a href="/case-studies/acme">Acme</a>
            <a href="/blog/post-1">Post</a>
        "#;

        let candidates = LinkClassifier::new(3, 4).classify(html, &base()).unwrap();

        assert_eq!(
            candidates.case_studies,
            vec![Url::parse("https://example.com/case-studies/acme").unwrap()]
        );
        assert_eq!(
            candidates.internal,
            vec![Url::parse("https://example.com/blog/post-1").unwrap()]
        );
    }

    #[test]
    fn test_skips_fragments_javascript_and_other_schemes() {
        let html = r##"
            <a href="#top">Top</a>
            <a href="javascript:void(0)">Menu</a>
            <a href="JavaScript:openCase()">Case</a>
            <a href="mailto:sales@example.com">Mail</a>
            <a href="tel:+123">Call</a>
            <a href="/about">About</a>
        "##;

        let candidates = LinkClassifier::new(3, 4).classify(html, &base()).unwrap();

        assert!(candidates.case_studies.is_empty());
        assert_eq!(candidates.internal.len(), 1);
        assert_eq!(candidates.internal[0].path(), "/about");
    }

    #[test]
    fn test_case_study_never_internal() {
        let html = r#"
            <a href="https://example.com/case-study/one">One</a>
            <a href="/Case-Study/Two">Two</a>
        "#;

        let candidates = LinkClassifier::new(1, 10).classify(html, &base()).unwrap();

        // Cap reached after the first one; the second is still not internal.
        assert_eq!(candidates.case_studies.len(), 1);
        assert!(candidates.internal.is_empty());
    }

    #[test]
    fn test_deduplicates_and_preserves_order() {
        let html = r#"
            <a href="/stories/b">B</a>
            <a href="/stories/a">A</a>
            <a href="https://example.com/stories/b">B again</a>
            <a href="/pricing">Pricing</a>
            <a href="/pricing">Pricing again</a>
        "#;

        let candidates = LinkClassifier::new(5, 5).classify(html, &base()).unwrap();

        let paths: Vec<_> = candidates.case_studies.iter().map(|u| u.path().to_string()).collect();
        assert_eq!(paths, vec!["/stories/b", "/stories/a"]);
        assert_eq!(candidates.internal.len(), 1);
    }

    #[test]
    fn test_internal_requires_base_prefix_and_cap() {
        let html = r#"
            <a href="/">Home</a>
            <a href="https://other.com/about">External</a>
            <a href="/a">A</a>
            <a href="/b">B</a>
            <a href="/c">C</a>
        "#;

        let candidates = LinkClassifier::new(3, 2).classify(html, &base()).unwrap();

        let paths: Vec<_> = candidates.internal.iter().map(|u| u.path().to_string()).collect();
        assert_eq!(paths, vec!["/a", "/b"]);
    }

    #[test]
    fn test_cannot_be_a_base_is_parse_error() {
        let base = Url::parse("mailto:someone@example.com").unwrap();
        let result = LinkClassifier::new(3, 4).classify("<a href='/x'>x</a>", &base);
        assert!(matches!(result, Err(CrawlerError::ParseError(_))));
    }
}
