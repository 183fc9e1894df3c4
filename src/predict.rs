//! # Prediction Engine
//! Pure, testable logic that maps a feature selection → ranked country
//! probabilities plus a weight-based explanation for the top pick.
//! No I/O, suitable for unit tests and offline evaluation.
//!
//! Policy: unknown feature ids contribute nothing and are skipped; an empty
//! selection or a selection with no positive aggregate signal is rejected.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use tracing::debug;

use crate::kb::KnowledgeBase;

/// Maximum number of ranked countries returned to the client.
pub const TOP_K: usize = 10;

/// Client-correctable rejections. The HTTP layer maps these onto 400/422.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PredictError {
    /// Nothing was selected; there is nothing to score.
    #[error("select at least one feature")]
    EmptySelection,
    /// The selection resolved to no positive weight toward any country.
    /// Broadening the selection is the fix.
    #[error("the selected features carry no signal for any country")]
    NoSignal,
}

/// One ranked entry: raw accumulated score plus its share of the total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryResult {
    pub country: String,
    pub probability: f64,
    pub score: f64,
}

/// Full prediction output: ranked countries (at most [`TOP_K`]) and the
/// per-feature weights that argued for the top-ranked one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub top_countries: Vec<CountryResult>,
    pub top_country_explanation: BTreeMap<String, f64>,
}

/// Score `selected` against the knowledge base.
///
/// Probabilities are normalized over the *full* accumulator before
/// truncation, so they sum to 1.0 across all countries even though only the
/// top [`TOP_K`] are returned. Ties keep accumulator insertion order (the
/// canonical country-list order), which makes ranking deterministic.
pub fn predict(kb: &KnowledgeBase, selected: &[String]) -> Result<Prediction, PredictError> {
    if selected.is_empty() {
        return Err(PredictError::EmptySelection);
    }

    // Every known country starts at zero so countries no selected feature
    // mentions still rank (at probability 0.0).
    let mut order: Vec<String> = kb.countries.clone();
    let mut scores: HashMap<String, f64> = order.iter().map(|c| (c.clone(), 0.0)).collect();

    for id in selected {
        let Some(feature) = kb.feature(id) else {
            // Leniency policy: unknown ids are skipped, never an error.
            debug!(feature = %id, "ignoring unknown feature id");
            continue;
        };
        for (country, w) in &feature.weights {
            match scores.get_mut(country) {
                Some(score) => *score += w,
                None => {
                    // Weight table names a country outside the canonical
                    // list; rank it anyway, after the canonical ones.
                    order.push(country.clone());
                    scores.insert(country.clone(), *w);
                }
            }
        }
    }

    let total: f64 = scores.values().sum();
    if total <= 0.0 {
        return Err(PredictError::NoSignal);
    }

    let mut ranked: Vec<CountryResult> = order
        .iter()
        .map(|country| {
            let score = scores[country];
            CountryResult {
                country: country.clone(),
                probability: score / total,
                score,
            }
        })
        .collect();

    // Stable sort: equal probabilities retain country-list order.
    ranked.sort_by(|a, b| b.probability.total_cmp(&a.probability));
    ranked.truncate(TOP_K);

    // Explanation covers the top-ranked country only: which of the selected
    // features pulled toward it, and how hard. Zero weights say nothing, so
    // they are filtered; duplicate selections collapse to one entry.
    let mut explanation = BTreeMap::new();
    if let Some(top) = ranked.first() {
        for id in selected {
            let Some(feature) = kb.feature(id) else {
                continue;
            };
            if let Some(&w) = feature.weights.get(&top.country) {
                if w != 0.0 {
                    explanation.insert(id.clone(), w);
                }
            }
        }
    }

    Ok(Prediction {
        top_countries: ranked,
        top_country_explanation: explanation,
    })
}
