use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use anyhow::Result;
use copydesk_common::{load_templates, ClaimType, PublicationTemplate, SectionSpec};
use tracing::info;

/// Lookup of publication-type structural contracts, hot-reloadable like the
/// vertical registry.
pub struct TemplateRegistry {
    templates: RwLock<HashMap<String, PublicationTemplate>>,
}

impl TemplateRegistry {
    pub fn new(templates: Vec<PublicationTemplate>) -> Self {
        Self {
            templates: RwLock::new(index(templates)),
        }
    }

    pub fn lookup(&self, publication_type: &str) -> Option<PublicationTemplate> {
        self.templates
            .read()
            .expect("template registry lock poisoned")
            .get(publication_type)
            .cloned()
    }

    pub fn replace(&self, templates: Vec<PublicationTemplate>) {
        let mut map = self
            .templates
            .write()
            .expect("template registry lock poisoned");
        *map = index(templates);
        info!(templates = map.len(), "Publication templates replaced");
    }

    pub fn reload_from(&self, path: &Path) -> Result<usize> {
        let templates = load_templates(path)?;
        let count = templates.len();
        self.replace(templates);
        Ok(count)
    }
}

fn index(templates: Vec<PublicationTemplate>) -> HashMap<String, PublicationTemplate> {
    templates
        .into_iter()
        .map(|t| (t.publication_type.clone(), t))
        .collect()
}

fn section(
    id: &str,
    title: &str,
    required: bool,
    min_words: u32,
    max_words: u32,
    allowed_claim_types: Vec<ClaimType>,
) -> SectionSpec {
    SectionSpec {
        id: id.to_string(),
        title: title.to_string(),
        required,
        min_words,
        max_words,
        allowed_claim_types,
    }
}

/// Generation artifacts that must never reach a published draft.
fn default_forbidden_phrases() -> Vec<String> {
    [
        "lorem ipsum",
        "as a language model",
        "as an ai",
        "[citation needed]",
        "[placeholder]",
        "insert text here",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// The five reference archetypes, from short brief to comprehensive dossier.
/// The validator is generic over any template; these are just the shipped set.
pub fn reference_templates() -> Vec<PublicationTemplate> {
    use ClaimType::*;

    vec![
        PublicationTemplate {
            publication_type: "brief".to_string(),
            sections: vec![
                section("summary", "Summary", true, 50, 150, vec![Fact, Statistic]),
                section("key-points", "Key points", true, 100, 300, vec![Fact, Statistic, Quote]),
                section("context", "Context", false, 50, 200, vec![]),
            ],
            total_min_words: 300,
            total_max_words: 600,
            min_sources: 2,
            forbidden_phrases: default_forbidden_phrases(),
        },
        PublicationTemplate {
            publication_type: "update".to_string(),
            sections: vec![
                section("summary", "Summary", true, 50, 150, vec![Fact, Statistic]),
                section("developments", "What changed", true, 150, 400, vec![Fact, Statistic, Quote]),
                section("reaction", "Reaction", false, 50, 250, vec![Quote, Fact]),
                section("next", "What to watch", true, 50, 200, vec![Forecast, Fact]),
            ],
            total_min_words: 400,
            total_max_words: 900,
            min_sources: 3,
            forbidden_phrases: default_forbidden_phrases(),
        },
        PublicationTemplate {
            publication_type: "analysis".to_string(),
            sections: vec![
                section("summary", "Summary", true, 80, 200, vec![Fact, Statistic]),
                section("background", "Background", true, 200, 500, vec![Fact, Statistic, Quote]),
                section("analysis", "Analysis", true, 300, 700, vec![Analysis, Fact, Statistic]),
                section("outlook", "Outlook", true, 100, 300, vec![Forecast, Analysis]),
                section("methodology", "Sources and method", false, 50, 200, vec![]),
            ],
            total_min_words: 900,
            total_max_words: 1800,
            min_sources: 6,
            forbidden_phrases: default_forbidden_phrases(),
        },
        PublicationTemplate {
            publication_type: "investigation".to_string(),
            sections: vec![
                section("summary", "Summary", true, 100, 250, vec![Fact, Statistic]),
                section("findings", "Findings", true, 400, 1000, vec![Fact, Statistic, Quote]),
                section("evidence", "Evidence", true, 300, 800, vec![Fact, Statistic]),
                section("responses", "Responses", true, 100, 400, vec![Quote, Fact]),
                section("implications", "Implications", true, 150, 500, vec![Analysis, Forecast]),
                section("methodology", "Sources and method", false, 50, 300, vec![]),
            ],
            total_min_words: 1500,
            total_max_words: 3000,
            min_sources: 10,
            forbidden_phrases: default_forbidden_phrases(),
        },
        PublicationTemplate {
            publication_type: "dossier".to_string(),
            sections: vec![
                section("executive-summary", "Executive summary", true, 150, 400, vec![Fact, Statistic]),
                section("background", "Background", true, 300, 800, vec![Fact, Statistic, Quote]),
                section("timeline", "Timeline", true, 200, 600, vec![Fact]),
                section("key-findings", "Key findings", true, 400, 1000, vec![Fact, Statistic]),
                section("stakeholders", "Stakeholders", true, 200, 600, vec![Fact, Quote]),
                section("implications", "Implications", true, 250, 700, vec![Analysis, Forecast]),
                section("outlook", "Outlook", true, 150, 500, vec![Forecast, Analysis]),
                section("appendix", "Appendix", false, 50, 400, vec![]),
            ],
            total_min_words: 2500,
            total_max_words: 5000,
            min_sources: 15,
            forbidden_phrases: default_forbidden_phrases(),
        },
    ]
}
