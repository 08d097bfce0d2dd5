use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// A single question/answer pair to be graded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// The question asked of the model
    pub user_input: String,
    /// The model's answer, absent when it still has to be generated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    /// The golden answer
    pub reference: String,
}

impl Sample {
    pub fn new(user_input: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            user_input: user_input.into(),
            response: None,
            reference: reference.into(),
        }
    }

    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.response = Some(response.into());
        self
    }

    /// The response, unless it is absent or blank
    pub fn answer(&self) -> Option<&str> {
        self.response.as_deref().filter(|response| !response.trim().is_empty())
    }
}

/// A fully populated sample in the shape the scoring engine consumes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub user_input: String,
    pub response: String,
    pub reference: String,
}

/// Scores awarded to a single record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleScore {
    pub user_input: String,
    pub response: String,
    pub reference: String,
    /// Score per metric name
    pub scores: HashMap<String, f64>,
}

/// Statistics calculated across all scored samples
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Statistics {
    /// Mean score for each metric
    pub mean: HashMap<String, f64>,
    /// Median score for each metric
    pub median: HashMap<String, f64>,
    /// Mode score for each metric (most frequent score)
    pub mode: HashMap<String, f64>,
}

/// Aggregated outcome of an evaluation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// Per-sample scores, in dataset order
    pub samples: Vec<SampleScore>,
    /// Summary statistics per metric
    pub summary: Statistics,
}

impl EvaluationResult {
    /// Pair each record with its scores and summarize them.
    ///
    /// `scores` is matched to `records` by position; a record without a
    /// counterpart gets an empty score map.
    pub fn from_scores(records: Vec<EvaluationRecord>, scores: Vec<HashMap<String, f64>>) -> Self {
        let mut scores = scores.into_iter();
        let samples: Vec<SampleScore> = records
            .into_iter()
            .map(|record| SampleScore {
                user_input: record.user_input,
                response: record.response,
                reference: record.reference,
                scores: scores.next().unwrap_or_default(),
            })
            .collect();

        let summary = Statistics::from_samples(&samples);
        Self { samples, summary }
    }

    /// Metric names present in any sample, sorted
    pub fn metric_names(&self) -> Vec<String> {
        self.samples
            .iter()
            .flat_map(|s| s.scores.keys().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

impl Statistics {
    /// Calculate statistics for every metric that appears in `samples`
    pub fn from_samples(samples: &[SampleScore]) -> Self {
        let metrics: BTreeSet<&String> = samples.iter().flat_map(|s| s.scores.keys()).collect();

        let mut mean = HashMap::new();
        let mut median = HashMap::new();
        let mut mode = HashMap::new();

        for metric in metrics {
            let scores = collect_metric_scores(samples, metric);

            if scores.is_empty() {
                mean.insert(metric.clone(), 0.0);
                median.insert(metric.clone(), 0.0);
                mode.insert(metric.clone(), 0.0);
                continue;
            }

            mean.insert(metric.clone(), calculate_mean(&scores));
            median.insert(metric.clone(), calculate_median(&scores));
            mode.insert(metric.clone(), calculate_mode(&scores));
        }

        Self { mean, median, mode }
    }
}

/// Collect the finite scores recorded for one metric
fn collect_metric_scores(samples: &[SampleScore], metric: &str) -> Vec<f64> {
    samples
        .iter()
        .filter_map(|s| s.scores.get(metric))
        .copied()
        .filter(|score| score.is_finite())
        .collect()
}

fn calculate_mean(scores: &[f64]) -> f64 {
    let sum: f64 = scores.iter().sum();
    sum / scores.len() as f64
}

fn calculate_median(scores: &[f64]) -> f64 {
    let mut sorted = scores.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Most frequent score after rounding to one decimal place.
/// Ties resolve to the smallest value.
fn calculate_mode(scores: &[f64]) -> f64 {
    let mut frequency: HashMap<i64, usize> = HashMap::new();

    for &score in scores {
        *frequency.entry((score * 10.0).round() as i64).or_insert(0) += 1;
    }

    frequency
        .into_iter()
        .max_by(|(a_value, a_count), (b_value, b_count)| {
            a_count.cmp(b_count).then(b_value.cmp(a_value))
        })
        .map(|(tenths, _)| tenths as f64 / 10.0)
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(question: &str) -> EvaluationRecord {
        EvaluationRecord {
            user_input: question.to_string(),
            response: format!("answer to {question}"),
            reference: format!("reference for {question}"),
        }
    }

    fn scored(values: &[f64]) -> EvaluationResult {
        let records = values.iter().enumerate().map(|(i, _)| record(&format!("q{i}"))).collect();
        let scores = values
            .iter()
            .map(|v| HashMap::from([("rubric".to_string(), *v)]))
            .collect();
        EvaluationResult::from_scores(records, scores)
    }

    #[test]
    fn test_sample_deserializes_without_response() {
        let sample: Sample =
            serde_json::from_str(r#"{"user_input": "What is 2+2?", "reference": "4"}"#).unwrap();
        assert_eq!(sample, Sample::new("What is 2+2?", "4"));
    }

    #[test]
    fn test_sample_requires_reference() {
        let result: Result<Sample, _> = serde_json::from_str(r#"{"user_input": "What is 2+2?"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_from_scores_keeps_record_order() {
        let result = scored(&[4.0, 2.0, 5.0]);
        let questions: Vec<_> = result.samples.iter().map(|s| s.user_input.as_str()).collect();
        assert_eq!(questions, vec!["q0", "q1", "q2"]);
        assert_eq!(result.samples[1].scores.get("rubric"), Some(&2.0));
    }

    #[test]
    fn test_from_scores_missing_scores_are_empty() {
        let result = EvaluationResult::from_scores(vec![record("a"), record("b")], vec![]);
        assert_eq!(result.samples.len(), 2);
        assert!(result.samples.iter().all(|s| s.scores.is_empty()));
        assert!(result.summary.mean.is_empty());
    }

    #[test]
    fn test_statistics_odd_count() {
        let result = scored(&[4.0, 3.0, 4.0]);
        let mean = result.summary.mean["rubric"];
        assert!((mean - 11.0 / 3.0).abs() < 1e-9);
        assert_eq!(result.summary.median["rubric"], 4.0);
        assert_eq!(result.summary.mode["rubric"], 4.0);
    }

    #[test]
    fn test_statistics_even_count() {
        let result = scored(&[1.0, 2.0, 4.0, 5.0]);
        assert!((result.summary.mean["rubric"] - 3.0).abs() < 1e-9);
        assert!((result.summary.median["rubric"] - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_statistics_skip_non_finite_scores() {
        let result = scored(&[f64::NAN, 5.0]);
        assert_eq!(result.summary.mean["rubric"], 5.0);
        assert_eq!(result.summary.median["rubric"], 5.0);
    }

    #[test]
    fn test_statistics_all_non_finite_reports_zero() {
        let result = scored(&[f64::NAN]);
        assert_eq!(result.summary.mean["rubric"], 0.0);
        assert_eq!(result.summary.median["rubric"], 0.0);
        assert_eq!(result.summary.mode["rubric"], 0.0);
    }

    #[test]
    fn test_mode_rounds_to_one_decimal() {
        assert_eq!(calculate_mode(&[0.75, 0.8, 0.8, 0.9]), 0.8);
        assert_eq!(calculate_mode(&[2.0, 3.0]), 2.0);
    }

    #[test]
    fn test_metric_names_sorted() {
        let records = vec![record("a")];
        let scores = vec![HashMap::from([("zeta".to_string(), 1.0), ("alpha".to_string(), 2.0)])];
        let result = EvaluationResult::from_scores(records, scores);
        assert_eq!(result.metric_names(), vec!["alpha", "zeta"]);
    }
}
