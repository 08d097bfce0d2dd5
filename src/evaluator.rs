use crate::config::ModelConfig;
use crate::dataset::IntoDataset;
use crate::error::{EvalError, Result};
use crate::generation::{AnswerGenerator, ChatCompletionClient};
use crate::metrics::{Metric, default_metrics};
use crate::models::EvaluationResult;
use crate::policy::RunPolicy;
use crate::scoring::{DEFAULT_JUDGE_MODEL, SCORING_BATCH_SIZE, ScoringEngine, ScoringRequest};
use std::sync::Arc;

/// Per-call settings. Anything left unset falls back to the evaluator's defaults.
#[derive(Clone, Default)]
pub struct RunOptions {
    pub student_model: Option<ModelConfig>,
    pub run_policy: Option<RunPolicy>,
    pub inference_client: Option<Arc<dyn ChatCompletionClient>>,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn student_model(mut self, student_model: ModelConfig) -> Self {
        self.student_model = Some(student_model);
        self
    }

    pub fn run_policy(mut self, run_policy: RunPolicy) -> Self {
        self.run_policy = Some(run_policy);
        self
    }

    pub fn inference_client(mut self, client: Arc<dyn ChatCompletionClient>) -> Self {
        self.inference_client = Some(client);
        self
    }
}

/// Grades candidate answers against golden answers with a rubric-scoring judge.
///
/// When a student model is configured, its answers are always regenerated,
/// replacing any responses already present in the dataset.
pub struct RubricEvaluator {
    scoring_engine: Arc<dyn ScoringEngine>,
    defaults: RunOptions,
    metrics: Vec<Metric>,
    generation_concurrency: usize,
}

impl RubricEvaluator {
    pub fn new(scoring_engine: Arc<dyn ScoringEngine>) -> Self {
        Self {
            scoring_engine,
            defaults: RunOptions::default(),
            metrics: default_metrics(),
            generation_concurrency: 1,
        }
    }

    pub fn with_student_model(mut self, student_model: ModelConfig) -> Self {
        self.defaults.student_model = Some(student_model);
        self
    }

    pub fn with_run_policy(mut self, run_policy: RunPolicy) -> Self {
        self.defaults.run_policy = Some(run_policy);
        self
    }

    pub fn with_inference_client(mut self, client: Arc<dyn ChatCompletionClient>) -> Self {
        self.defaults.inference_client = Some(client);
        self
    }

    /// Replace the default single rubric metric
    pub fn with_metrics(mut self, metrics: Vec<Metric>) -> Self {
        for metric in metrics.iter().filter(|metric| !metric.uses_reference()) {
            tracing::warn!(metric = metric.name(), "metric does not grade against the reference answer");
        }
        self.metrics = metrics;
        self
    }

    pub fn with_generation_concurrency(mut self, concurrency: usize) -> Result<Self> {
        if concurrency == 0 {
            return Err(EvalError::InvalidConcurrency);
        }
        self.generation_concurrency = concurrency;
        Ok(self)
    }

    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    /// Evaluate `dataset`, generating answers first when needed.
    ///
    /// `dataset` may be a list of samples, a JSONL path, or an untyped JSON
    /// value; unsupported input fails before any request is made.
    pub async fn run(&self, dataset: impl IntoDataset, options: RunOptions) -> Result<EvaluationResult> {
        let student_model = options.student_model.or_else(|| self.defaults.student_model.clone());
        let run_policy = options.run_policy.or(self.defaults.run_policy);
        let inference_client = options
            .inference_client
            .or_else(|| self.defaults.inference_client.clone());

        let mut dataset = dataset.into_dataset()?;
        if dataset.is_empty() {
            tracing::warn!("dataset has no samples");
        } else {
            tracing::debug!(samples = dataset.len(), "dataset normalized");
        }

        let needs_generation = !dataset.has_responses();
        if needs_generation && student_model.is_none() {
            return Err(EvalError::MissingGenerationConfig);
        }

        if let Some(student_model) = &student_model {
            let client = inference_client.as_deref().ok_or(EvalError::MissingInferenceClient)?;
            tracing::info!(
                model = student_model.model_name(),
                samples = dataset.len(),
                "generating answers from student model"
            );
            dataset = AnswerGenerator::new(client, student_model)
                .with_concurrency(self.generation_concurrency)?
                .generate(&dataset)
                .await?;
        }

        let run_policy = RunPolicy::resolve(run_policy);
        tracing::debug!(?run_policy, "run policy configured");

        let request = ScoringRequest {
            dataset: dataset.to_records()?,
            judge_model: DEFAULT_JUDGE_MODEL.to_string(),
            metrics: self.metrics.clone(),
            run_policy,
            batch_size: SCORING_BATCH_SIZE,
            show_progress: true,
        };

        tracing::info!(samples = request.dataset.len(), judge = DEFAULT_JUDGE_MODEL, "scoring");
        let result = self
            .scoring_engine
            .evaluate(request)
            .await
            .map_err(EvalError::ScoringEngine)?;

        tracing::info!(samples = result.samples.len(), "evaluation done");
        Ok(result)
    }
}
