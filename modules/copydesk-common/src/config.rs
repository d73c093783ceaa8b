use std::path::Path;

use anyhow::{Context, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::types::ClaimType;

// --- Verticals ---

/// Quality floors a draft must clear before cadence is even considered.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct QualityThresholds {
    pub min_trust_score: f64,
    pub min_novelty_score: f64,
    pub min_impact_score: f64,
    pub min_sources: usize,
}

/// Event-triggered relaxation of the weekly cap.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct BurstConfig {
    /// Event tag that opens the window, e.g. "ecb-rate-decision".
    pub trigger: String,
    pub max_extra_per_day: u32,
    pub duration_hours: i64,
}

/// Per-channel editorial policy. Pure data — supplied from TOML, reloadable
/// without restarting the evaluating process.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct VerticalConfig {
    pub slug: String,
    pub max_publications_per_week: u32,
    pub allowed_types: Vec<String>,
    pub thresholds: QualityThresholds,
    pub cooldown_hours: i64,
    #[serde(default)]
    pub burst: Option<BurstConfig>,
}

// --- Publication templates ---

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SectionSpec {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub required: bool,
    pub min_words: u32,
    pub max_words: u32,
    /// Empty means any claim type is acceptable in this section.
    #[serde(default)]
    pub allowed_claim_types: Vec<ClaimType>,
}

/// Structural contract for one publication type.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct PublicationTemplate {
    pub publication_type: String,
    pub sections: Vec<SectionSpec>,
    pub total_min_words: u32,
    pub total_max_words: u32,
    pub min_sources: usize,
    #[serde(default)]
    pub forbidden_phrases: Vec<String>,
}

// --- File loading ---

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerticalsFile {
    pub verticals: Vec<VerticalConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplatesFile {
    pub templates: Vec<PublicationTemplate>,
}

/// Load vertical policies from a TOML file.
pub fn load_verticals(path: &Path) -> Result<Vec<VerticalConfig>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read verticals file: {}", path.display()))?;
    let file: VerticalsFile = toml::from_str(&content)
        .with_context(|| format!("Failed to parse verticals file: {}", path.display()))?;
    Ok(file.verticals)
}

/// Load publication templates from a TOML file.
pub fn load_templates(path: &Path) -> Result<Vec<PublicationTemplate>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read templates file: {}", path.display()))?;
    let file: TemplatesFile = toml::from_str(&content)
        .with_context(|| format!("Failed to parse templates file: {}", path.display()))?;
    Ok(file.templates)
}
