use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Rubric the judge grades against, keyed `score1_description`..`score5_description`.
/// Every level is phrased relative to the reference answer.
pub const DEFAULT_WITH_REFERENCE_RUBRICS: [(&str, &str); 5] = [
    (
        "score1_description",
        "The response is entirely incorrect, irrelevant, or does not align with the reference in any meaningful way.",
    ),
    (
        "score2_description",
        "The response partially matches the reference but contains major errors, significant omissions, or irrelevant information.",
    ),
    (
        "score3_description",
        "The response aligns with the reference overall but lacks sufficient detail, clarity, or contains minor inaccuracies.",
    ),
    (
        "score4_description",
        "The response is mostly accurate, aligns closely with the reference, and contains only minor issues or omissions.",
    ),
    (
        "score5_description",
        "The response is fully accurate, completely aligns with the reference, and is clear, thorough, and detailed.",
    ),
];

/// Rubric-based scorer: the judge picks the score level whose description fits best
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RubricsScore {
    pub name: String,
    pub rubrics: BTreeMap<String, String>,
}

impl RubricsScore {
    pub fn new(rubrics: BTreeMap<String, String>) -> Self {
        Self {
            name: "domain_specific_rubrics".to_string(),
            rubrics,
        }
    }

    /// Whether the rubric descriptions grade against a reference answer
    pub fn uses_reference(&self) -> bool {
        self.rubrics
            .values()
            .any(|description| description.contains("reference"))
    }
}

impl Default for RubricsScore {
    fn default() -> Self {
        Self::new(
            DEFAULT_WITH_REFERENCE_RUBRICS
                .iter()
                .map(|(level, description)| (level.to_string(), description.to_string()))
                .collect(),
        )
    }
}

/// A metric the scoring engine computes per sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Metric {
    RubricsScore(RubricsScore),
}

impl Metric {
    pub fn name(&self) -> &str {
        match self {
            Metric::RubricsScore(metric) => &metric.name,
        }
    }

    pub fn uses_reference(&self) -> bool {
        match self {
            Metric::RubricsScore(metric) => metric.uses_reference(),
        }
    }
}

/// The default metric set: a single reference-aware rubric scorer
pub fn default_metrics() -> Vec<Metric> {
    vec![Metric::RubricsScore(RubricsScore::default())]
}
