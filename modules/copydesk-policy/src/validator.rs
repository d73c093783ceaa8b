use std::fmt;

use copydesk_common::{ClaimType, Draft, PublicationTemplate};
use regex::RegexSetBuilder;
use serde::Serialize;
use tracing::warn;

/// A single structural violation. Machine-readable; `Display` renders the
/// human-readable reason recorded on the decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Violation {
    MissingSection {
        section_id: String,
    },
    UnknownSection {
        section_id: String,
    },
    SectionTooShort {
        section_id: String,
        words: u32,
        min_words: u32,
    },
    SectionTooLong {
        section_id: String,
        words: u32,
        max_words: u32,
    },
    DisallowedClaimType {
        section_id: String,
        claim_type: ClaimType,
    },
    TotalTooShort {
        words: u32,
        min_words: u32,
    },
    TotalTooLong {
        words: u32,
        max_words: u32,
    },
    InsufficientSources {
        have: usize,
        need: usize,
    },
    ForbiddenPhrase {
        phrase: String,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::MissingSection { section_id } => {
                write!(f, "required section '{section_id}' is missing")
            }
            Violation::UnknownSection { section_id } => {
                write!(f, "section '{section_id}' is not part of the template")
            }
            Violation::SectionTooShort {
                section_id,
                words,
                min_words,
            } => write!(
                f,
                "section '{section_id}' too short ({words} < {min_words} words)"
            ),
            Violation::SectionTooLong {
                section_id,
                words,
                max_words,
            } => write!(
                f,
                "section '{section_id}' too long ({words} > {max_words} words)"
            ),
            Violation::DisallowedClaimType {
                section_id,
                claim_type,
            } => write!(
                f,
                "claim type {claim_type:?} not allowed in section '{section_id}'"
            ),
            Violation::TotalTooShort { words, min_words } => {
                write!(f, "draft too short ({words} < {min_words} words)")
            }
            Violation::TotalTooLong { words, max_words } => {
                write!(f, "draft too long ({words} > {max_words} words)")
            }
            Violation::InsufficientSources { have, need } => {
                write!(f, "insufficient sources ({have} < {need})")
            }
            Violation::ForbiddenPhrase { phrase } => {
                write!(f, "forbidden phrase present: \"{phrase}\"")
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub passed: bool,
    pub violations: Vec<Violation>,
}

/// Validates draft structure against a publication-type contract. Every check
/// runs — the report carries all violations, not just the first.
pub struct TemplateValidator;

impl TemplateValidator {
    pub fn validate(draft: &Draft, template: &PublicationTemplate) -> ValidationReport {
        let mut violations = Vec::new();

        // Section presence, bounds, and claim types.
        for spec in &template.sections {
            let found = draft.sections.iter().find(|s| s.section_id == spec.id);
            let section = match found {
                Some(s) => s,
                None => {
                    if spec.required {
                        violations.push(Violation::MissingSection {
                            section_id: spec.id.clone(),
                        });
                    }
                    continue;
                }
            };

            if section.word_count < spec.min_words {
                violations.push(Violation::SectionTooShort {
                    section_id: spec.id.clone(),
                    words: section.word_count,
                    min_words: spec.min_words,
                });
            }
            if section.word_count > spec.max_words {
                violations.push(Violation::SectionTooLong {
                    section_id: spec.id.clone(),
                    words: section.word_count,
                    max_words: spec.max_words,
                });
            }

            if !spec.allowed_claim_types.is_empty() {
                for claim in &section.claims {
                    if !spec.allowed_claim_types.contains(&claim.claim_type) {
                        violations.push(Violation::DisallowedClaimType {
                            section_id: spec.id.clone(),
                            claim_type: claim.claim_type,
                        });
                    }
                }
            }
        }

        // Sections the template does not know about.
        for section in &draft.sections {
            if !template.sections.iter().any(|s| s.id == section.section_id) {
                violations.push(Violation::UnknownSection {
                    section_id: section.section_id.clone(),
                });
            }
        }

        // Total word count.
        let total = draft.total_word_count();
        if total < template.total_min_words {
            violations.push(Violation::TotalTooShort {
                words: total,
                min_words: template.total_min_words,
            });
        }
        if total > template.total_max_words {
            violations.push(Violation::TotalTooLong {
                words: total,
                max_words: template.total_max_words,
            });
        }

        // Source floor.
        if draft.source_ids.len() < template.min_sources {
            violations.push(Violation::InsufficientSources {
                have: draft.source_ids.len(),
                need: template.min_sources,
            });
        }

        // Forbidden phrases: case-insensitive substring scan over the whole
        // rendered draft.
        if !template.forbidden_phrases.is_empty() {
            let patterns: Vec<String> = template
                .forbidden_phrases
                .iter()
                .map(|p| regex::escape(p))
                .collect();
            match RegexSetBuilder::new(&patterns).case_insensitive(true).build() {
                Ok(set) => {
                    let text = draft.rendered_text();
                    for idx in set.matches(&text) {
                        violations.push(Violation::ForbiddenPhrase {
                            phrase: template.forbidden_phrases[idx].clone(),
                        });
                    }
                }
                Err(e) => {
                    // Escaped literals should always compile; if not, fail the
                    // check loudly rather than silently skipping it.
                    warn!(error = %e, "Forbidden-phrase set failed to compile");
                    violations.push(Violation::ForbiddenPhrase {
                        phrase: "<unscannable forbidden-phrase set>".to_string(),
                    });
                }
            }
        }

        ValidationReport {
            passed: violations.is_empty(),
            violations,
        }
    }
}
