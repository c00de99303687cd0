use chrono::{DateTime, Utc};
use crawler::{SectionExtractor, SectionKind};
use serde::{Deserialize, Serialize};
use storage::{ArtifactKey, ArtifactStore, ExtractedSections, Section, SectionMap, StorageError};
use tracing::{debug, error, info, warn};

use crate::{Reason, Site, StageReport};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractOutput {
    pub artifact: ArtifactKey,
    pub sections: Vec<Section>,
}

fn section_kind(section: Section) -> SectionKind {
    match section {
        Section::Homepage => SectionKind::Homepage,
        Section::Navbar => SectionKind::Navbar,
        Section::Footer => SectionKind::Footer,
        Section::CaseStudy => SectionKind::CaseStudy,
    }
}

/// Section texts for one site's raw pages.
///
/// Navbar and footer are only looked for when the homepage produced text.
/// `case_study` is present whenever there is at least one case-study page,
/// even if every page came out empty.
pub fn extract_sections(
    extractor: &SectionExtractor,
    homepage: &str,
    case_studies: &[String],
) -> SectionMap {
    let mut sections = SectionMap::new();

    let homepage_text = extractor.extract(homepage, section_kind(Section::Homepage));
    let has_homepage_text = !homepage_text.is_empty();
    sections.insert(Section::Homepage, homepage_text);

    if has_homepage_text {
        for section in [Section::Navbar, Section::Footer] {
            sections.insert(section, extractor.extract(homepage, section_kind(section)));
        }
    }

    if !case_studies.is_empty() {
        let text = case_studies
            .iter()
            .map(|body| extractor.extract(body, section_kind(Section::CaseStudy)))
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        sections.insert(Section::CaseStudy, text);
    }

    sections
}

/// No fresh sections this run; the previous run's must not reach transform.
fn fail_and_clear(store: &dyn ArtifactStore, site: &Site, cause: StorageError) -> StageReport<ExtractOutput> {
    if let Err(e) = store.remove_sections(&site.key) {
        error!("[{}] Failed to clear stale sections: {}", site.key, e);
    }
    StageReport::failed(Reason::StorageError, cause.to_string())
}

pub fn extract_site(
    extractor: &SectionExtractor,
    store: &dyn ArtifactStore,
    site: &Site,
    run_at: DateTime<Utc>,
) -> StageReport<ExtractOutput> {
    let raw = match store.load_raw(&site.key) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            warn!("[{}] No raw pages, skipping extraction", site.key);
            if let Err(e) = store.remove_sections(&site.key) {
                error!("[{}] Failed to clear stale sections: {}", site.key, e);
                return StageReport::failed(Reason::StorageError, e.to_string());
            }
            return StageReport::skipped(Reason::NoRawData);
        }
        Err(e) => {
            error!("[{}] Failed to load raw pages: {}", site.key, e);
            return fail_and_clear(store, site, e);
        }
    };

    debug!(
        "[{}] Extracting homepage and {} case studies",
        site.key,
        raw.case_studies.len()
    );
    let sections = extract_sections(extractor, &raw.homepage, &raw.case_studies);

    let extracted = ExtractedSections {
        website: site.website.clone(),
        domain: site.key.clone(),
        extracted_at: run_at,
        sections,
    };
    if let Err(e) = store.save_sections(&site.key, &extracted) {
        error!("[{}] Failed to save sections: {}", site.key, e);
        return fail_and_clear(store, site, e);
    }

    let keys: Vec<Section> = extracted.sections.keys().copied().collect();
    info!(
        "[{}] Extracted sections: {}",
        site.key,
        keys.iter().map(Section::as_str).collect::<Vec<_>>().join(", ")
    );

    StageReport::success(ExtractOutput {
        artifact: site.key.clone(),
        sections: keys,
    })
}
