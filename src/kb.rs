//! # Knowledge Base
//!
//! Static country/feature data, loaded once at startup and shared read-only
//! for the lifetime of the process.
//!
//! - Loads from JSON: country list, feature → per-country weights, and a
//!   category → feature-id grouping the UI renders from.
//! - Path comes from `KNOWLEDGE_BASE_PATH`, default
//!   `config/knowledge_base.json`.
//! - A missing or malformed file fails startup; the service must not answer
//!   predictions without its data.
//! - After load nothing mutates these structures; handlers share one
//!   `Arc<KnowledgeBase>` snapshot, so no locking is needed.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use tracing::warn;

// --- env defaults & names ---
pub const DEFAULT_KNOWLEDGE_BASE_PATH: &str = "config/knowledge_base.json";
pub const ENV_KNOWLEDGE_BASE_PATH: &str = "KNOWLEDGE_BASE_PATH";

/// A selectable descriptive attribute ("flag has red", "speaks Portuguese")
/// with per-country relevance weights. Countries absent from `weights` weigh
/// zero for this feature.
#[derive(Debug, Clone, Deserialize)]
pub struct Feature {
    pub weights: BTreeMap<String, f64>,
}

/// The immutable aggregate every request reads from.
///
/// `BTreeMap` keeps iteration deterministic end to end; the prediction
/// tie-break depends on reproducible accumulator insertion order.
#[derive(Debug, Clone, Deserialize)]
pub struct KnowledgeBase {
    /// Canonical country list. Ranking ties resolve in this order.
    pub countries: Vec<String>,
    /// Feature id → weight table.
    pub features: BTreeMap<String, Feature>,
    /// Category name → feature ids, presentation only (never scored).
    pub categories: BTreeMap<String, Vec<String>>,
}

impl KnowledgeBase {
    /// Load from a JSON file. Uses KNOWLEDGE_BASE_PATH or defaults to
    /// "config/knowledge_base.json".
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var(ENV_KNOWLEDGE_BASE_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_KNOWLEDGE_BASE_PATH));

        let content = fs::read_to_string(&path).map_err(|e| {
            anyhow::anyhow!(
                "Failed to read knowledge base at {}: {}",
                path.display(),
                e
            )
        })?;

        Self::from_json_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid knowledge base at {}: {}", path.display(), e))
    }

    /// Parse from a JSON string.
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let kb: KnowledgeBase = serde_json::from_str(json)?;
        if kb.countries.is_empty() {
            anyhow::bail!("country list is empty");
        }
        kb.warn_on_inconsistencies();
        Ok(kb)
    }

    /// Look up a feature by id. Absent ids are a client-leniency case, not an
    /// error, so this returns an `Option` instead of failing.
    pub fn feature(&self, id: &str) -> Option<&Feature> {
        self.features.get(id)
    }

    /// Non-fatal shape diagnostics, logged once at load time.
    fn warn_on_inconsistencies(&self) {
        for (category, ids) in &self.categories {
            for id in ids {
                if !self.features.contains_key(id) {
                    warn!(%category, feature = %id, "category references unknown feature id");
                }
            }
        }
        for (id, feature) in &self.features {
            for (country, w) in &feature.weights {
                if *w < 0.0 {
                    warn!(feature = %id, %country, weight = *w, "negative feature weight");
                }
                if !self.countries.iter().any(|c| c == country) {
                    warn!(feature = %id, %country, "weight names a country outside the canonical list");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "countries": ["Brazil", "Japan"],
        "features": {
            "speaks_portuguese": { "weights": { "Brazil": 3.0 } }
        },
        "categories": {
            "Language": ["speaks_portuguese"]
        }
    }"#;

    #[test]
    fn parses_minimal_knowledge_base() {
        let kb = KnowledgeBase::from_json_str(MINIMAL).expect("parse");
        assert_eq!(kb.countries, vec!["Brazil", "Japan"]);
        assert_eq!(kb.features.len(), 1);
        assert_eq!(kb.categories["Language"], vec!["speaks_portuguese"]);
    }

    #[test]
    fn feature_lookup_is_optional() {
        let kb = KnowledgeBase::from_json_str(MINIMAL).expect("parse");
        assert!(kb.feature("speaks_portuguese").is_some());
        assert!(kb.feature("does_not_exist").is_none());
    }

    #[test]
    fn rejects_empty_country_list() {
        let json = r#"{ "countries": [], "features": {}, "categories": {} }"#;
        let err = KnowledgeBase::from_json_str(json).unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(KnowledgeBase::from_json_str("{ not json").is_err());
    }

    #[test]
    fn ignores_unknown_feature_fields() {
        // Extra metadata on a feature (labels etc.) must not break loading.
        let json = r#"{
            "countries": ["Brazil"],
            "features": {
                "f": { "weights": { "Brazil": 1.0 }, "label": "Flag is green" }
            },
            "categories": {}
        }"#;
        let kb = KnowledgeBase::from_json_str(json).expect("parse");
        assert_eq!(kb.features["f"].weights["Brazil"], 1.0);
    }
}
