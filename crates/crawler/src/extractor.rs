use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

use crate::{HtmlDocument, NodeRef};

static NAVBAR_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)nav|menu|header-nav|topbar|main-menu|navbar|navigation").expect("static regex"),
        Regex::new(r"(?i)site-header|global-nav|primary-nav").expect("static regex"),
    ]
});

static FOOTER_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![Regex::new(r"(?i)footer|site-footer|bottom|copyright|legal-links").expect("static regex")]
});

static CONTENT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)content|main|article").expect("static regex"));

/// Zero-width and other invisible code points dropped by `clean_text`.
const INVISIBLE_CHARS: &[char] = &['\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{FEFF}'];

const LANDMARK_TAGS: &[&str] = &["nav", "header", "footer"];
const CASE_STUDY_NOISE_TAGS: &[&str] = &["nav", "header", "footer", "aside", "form"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Homepage,
    Navbar,
    Footer,
    CaseStudy,
}

impl SectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKind::Homepage => "homepage",
            SectionKind::Navbar => "navbar",
            SectionKind::Footer => "footer",
            SectionKind::CaseStudy => "case_study",
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pulls one kind of section out of a page with layered DOM heuristics:
/// semantic tag first, then class/id patterns, then a largest-block fallback.
#[derive(Debug, Clone)]
pub struct SectionExtractor {
    min_homepage_text: usize,
}

impl Default for SectionExtractor {
    fn default() -> Self {
        Self {
            min_homepage_text: 300,
        }
    }
}

impl SectionExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Below this many characters the homepage text is replaced by the
    /// largest content-classed block, when there is one.
    pub fn with_min_homepage_text(mut self, chars: usize) -> Self {
        self.min_homepage_text = chars;
        self
    }

    pub fn extract(&self, html: &str, kind: SectionKind) -> String {
        if html.trim().is_empty() {
            return String::new();
        }

        let document = HtmlDocument::parse(html);
        document.strip_noise();

        let text = match kind {
            SectionKind::Navbar => by_landmark_or_patterns(&document, "nav", &NAVBAR_PATTERNS),
            SectionKind::Footer => by_landmark_or_patterns(&document, "footer", &FOOTER_PATTERNS),
            SectionKind::Homepage => self.homepage(&document),
            SectionKind::CaseStudy => case_study(&document),
        };

        clean_text(&text)
    }

    fn homepage(&self, document: &HtmlDocument) -> String {
        let root = document.root();

        let mut text = root
            .find_first(|node| node.is_tag("main"))
            .map(|main| main.text())
            .unwrap_or_default();

        if text.is_empty() {
            if let Some(body) = document.body() {
                body.remove_all(|node| node.tag().is_some_and(|tag| LANDMARK_TAGS.contains(&tag)));
                text = body.text();
            }
        }

        if text.chars().count() < self.min_homepage_text {
            if let Some(body) = document.body() {
                let largest = largest_text(body.find_all(|node| class_matches(node, &CONTENT_PATTERN)));
                if let Some(largest) = largest.filter(|candidate| !candidate.is_empty()) {
                    text = largest;
                }
            }
        }

        text
    }
}

fn by_landmark_or_patterns(document: &HtmlDocument, landmark: &str, patterns: &[Regex]) -> String {
    let root = document.root();

    if let Some(node) = root.find_first(|node| node.is_tag(landmark)) {
        let text = node.text();
        if !text.is_empty() {
            return text;
        }
    }

    for pattern in patterns {
        let candidate = root
            .find_first(|node| class_matches(node, pattern))
            .or_else(|| root.find_first(|node| id_matches(node, pattern)));

        if let Some(node) = candidate {
            let text = node.text();
            if !text.is_empty() {
                return text;
            }
        }
    }

    String::new()
}

fn case_study(document: &HtmlDocument) -> String {
    let root = document.root();

    let container = root
        .find_first(|node| node.is_tag("main"))
        .or_else(|| root.find_first(|node| node.is_tag("article")))
        .or_else(|| document.body());

    match container {
        Some(container) => {
            container.remove_all(|node| node.tag().is_some_and(|tag| CASE_STUDY_NOISE_TAGS.contains(&tag)));
            container.text()
        }
        None => root.text(),
    }
}

/// Longest text among the nodes; the first one wins ties.
fn largest_text(nodes: Vec<NodeRef>) -> Option<String> {
    let mut best: Option<(usize, String)> = None;

    for node in nodes {
        let text = node.text();
        let len = text.chars().count();
        if best.as_ref().map_or(true, |(best_len, _)| len > *best_len) {
            best = Some((len, text));
        }
    }

    best.map(|(_, text)| text)
}

fn class_matches(node: &NodeRef, pattern: &Regex) -> bool {
    node.classes().iter().any(|class| pattern.is_match(class))
}

fn id_matches(node: &NodeRef, pattern: &Regex) -> bool {
    node.id().is_some_and(|id| pattern.is_match(&id))
}

/// Strips invisible characters, collapses whitespace runs to one space and
/// trims. `clean_text(clean_text(s)) == clean_text(s)`.
pub fn clean_text(text: &str) -> String {
    let visible: String = text.chars().filter(|c| !INVISIBLE_CHARS.contains(c)).collect();
    visible.split_whitespace().collect::<Vec<_>>().join(" ")
}
