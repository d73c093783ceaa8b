use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use anyhow::Result;
use copydesk_common::{load_verticals, BurstConfig, QualityThresholds, VerticalConfig};
use tracing::info;

/// Lookup of per-channel editorial policy. Pure configuration — an unknown
/// vertical is a caller error, not a scoring failure. The map can be swapped
/// at runtime (`reload_from`) without restarting the evaluating process.
pub struct VerticalPolicyRegistry {
    verticals: RwLock<HashMap<String, VerticalConfig>>,
}

impl VerticalPolicyRegistry {
    pub fn new(configs: Vec<VerticalConfig>) -> Self {
        Self {
            verticals: RwLock::new(index(configs)),
        }
    }

    pub fn lookup(&self, slug: &str) -> Option<VerticalConfig> {
        self.verticals
            .read()
            .expect("vertical registry lock poisoned")
            .get(slug)
            .cloned()
    }

    pub fn slugs(&self) -> Vec<String> {
        let mut slugs: Vec<String> = self
            .verticals
            .read()
            .expect("vertical registry lock poisoned")
            .keys()
            .cloned()
            .collect();
        slugs.sort();
        slugs
    }

    /// Replace the whole policy set atomically.
    pub fn replace(&self, configs: Vec<VerticalConfig>) {
        let mut map = self
            .verticals
            .write()
            .expect("vertical registry lock poisoned");
        *map = index(configs);
        info!(verticals = map.len(), "Vertical policies replaced");
    }

    /// Hot-reload policies from a TOML file. On parse failure the previous
    /// policy set stays in effect.
    pub fn reload_from(&self, path: &Path) -> Result<usize> {
        let configs = load_verticals(path)?;
        let count = configs.len();
        self.replace(configs);
        Ok(count)
    }
}

fn index(configs: Vec<VerticalConfig>) -> HashMap<String, VerticalConfig> {
    configs.into_iter().map(|c| (c.slug.clone(), c)).collect()
}

/// Reference vertical set used by the CLI default config and tests.
pub fn reference_verticals() -> Vec<VerticalConfig> {
    vec![
        VerticalConfig {
            slug: "eu-policy".to_string(),
            max_publications_per_week: 5,
            allowed_types: vec![
                "brief".to_string(),
                "update".to_string(),
                "analysis".to_string(),
                "dossier".to_string(),
            ],
            thresholds: QualityThresholds {
                min_trust_score: 75.0,
                min_novelty_score: 50.0,
                min_impact_score: 50.0,
                min_sources: 5,
            },
            cooldown_hours: 6,
            burst: Some(BurstConfig {
                trigger: "eu-summit".to_string(),
                max_extra_per_day: 2,
                duration_hours: 48,
            }),
        },
        VerticalConfig {
            slug: "markets".to_string(),
            max_publications_per_week: 10,
            allowed_types: vec!["brief".to_string(), "update".to_string()],
            thresholds: QualityThresholds {
                min_trust_score: 70.0,
                min_novelty_score: 40.0,
                min_impact_score: 55.0,
                min_sources: 3,
            },
            cooldown_hours: 2,
            burst: Some(BurstConfig {
                trigger: "rate-decision".to_string(),
                max_extra_per_day: 3,
                duration_hours: 24,
            }),
        },
        VerticalConfig {
            slug: "climate-research".to_string(),
            max_publications_per_week: 3,
            allowed_types: vec![
                "analysis".to_string(),
                "investigation".to_string(),
                "dossier".to_string(),
            ],
            thresholds: QualityThresholds {
                min_trust_score: 80.0,
                min_novelty_score: 60.0,
                min_impact_score: 60.0,
                min_sources: 8,
            },
            cooldown_hours: 24,
            burst: None,
        },
    ]
}
