use crate::metrics::Metric;
use crate::models::{EvaluationRecord, EvaluationResult};
use crate::policy::RunPolicy;
use anyhow::{Context, anyhow};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::time::sleep;

/// Judge model used for every run, fixed for consistency of scores across runs
pub const DEFAULT_JUDGE_MODEL: &str = "gpt-4o";

/// Number of samples the scoring engine is asked to grade concurrently
pub const SCORING_BATCH_SIZE: usize = 4;

/// Everything the scoring engine needs for one run
#[derive(Debug, Clone, Serialize)]
pub struct ScoringRequest {
    pub dataset: Vec<EvaluationRecord>,
    pub judge_model: String,
    pub metrics: Vec<Metric>,
    pub run_policy: RunPolicy,
    pub batch_size: usize,
    pub show_progress: bool,
}

/// Grades records with a judge model and aggregates the scores
#[async_trait]
pub trait ScoringEngine: Send + Sync {
    async fn evaluate(&self, request: ScoringRequest) -> anyhow::Result<EvaluationResult>;
}

/// Per-sample scores as returned by the scoring service. Failed samples come back as null.
#[derive(Debug, Deserialize)]
struct ScoringResponse {
    scores: Vec<HashMap<String, Option<f64>>>,
}

/// Outcome of a single failed attempt
struct AttemptError {
    retryable: bool,
    error: anyhow::Error,
}

impl AttemptError {
    fn retryable(error: anyhow::Error) -> Self {
        Self {
            retryable: true,
            error,
        }
    }

    fn fatal(error: anyhow::Error) -> Self {
        Self {
            retryable: false,
            error,
        }
    }
}

/// Scoring engine reached over HTTP at `POST {endpoint}/evaluate`.
///
/// Rate limits (429), server errors and transport failures are retried with
/// exponential backoff according to the request's run policy.
pub struct RemoteScoringEngine {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl RemoteScoringEngine {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key,
        }
    }

    fn url(&self) -> String {
        format!("{}/evaluate", self.endpoint.trim_end_matches('/'))
    }

    async fn post_with_retries(&self, request: &ScoringRequest) -> anyhow::Result<ScoringResponse> {
        let policy = &request.run_policy;
        let mut attempt = 0;

        loop {
            match self.post_once(request).await {
                Ok(response) => return Ok(response),
                Err(failure) if failure.retryable && attempt < policy.max_retries => {
                    let wait = policy.backoff(attempt);
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_retries = policy.max_retries,
                        wait_secs = wait.as_secs(),
                        "scoring request failed, retrying: {:#}",
                        failure.error
                    );
                    sleep(wait).await;
                    attempt += 1;
                }
                Err(failure) => return Err(failure.error),
            }
        }
    }

    async fn post_once(&self, request: &ScoringRequest) -> Result<ScoringResponse, AttemptError> {
        let mut builder = self
            .client
            .post(self.url())
            .timeout(request.run_policy.timeout_duration())
            .json(request);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder.send().await.map_err(|err| {
            let error = anyhow::Error::new(err).context("Failed to reach scoring service");
            AttemptError::retryable(error)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = anyhow!("scoring service returned {}: {}", status, body);
            return Err(if is_retryable(status) {
                AttemptError::retryable(error)
            } else {
                AttemptError::fatal(error)
            });
        }

        response
            .json::<ScoringResponse>()
            .await
            .context("Failed to parse scoring response")
            .map_err(AttemptError::fatal)
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

#[async_trait]
impl ScoringEngine for RemoteScoringEngine {
    async fn evaluate(&self, request: ScoringRequest) -> anyhow::Result<EvaluationResult> {
        if request.show_progress {
            tracing::info!(
                samples = request.dataset.len(),
                judge = %request.judge_model,
                batch_size = request.batch_size,
                "submitting samples for scoring"
            );
        }

        let response = self.post_with_retries(&request).await?;
        if response.scores.len() != request.dataset.len() {
            anyhow::bail!(
                "scoring service returned {} results for {} samples",
                response.scores.len(),
                request.dataset.len()
            );
        }

        let scores = response
            .scores
            .into_iter()
            .map(|sample| {
                sample
                    .into_iter()
                    .map(|(metric, score)| (metric, score.unwrap_or(f64::NAN)))
                    .collect()
            })
            .collect();

        Ok(EvaluationResult::from_scores(request.dataset, scores))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::default_metrics;
    use mockito::Matcher;
    use serde_json::json;

    fn request(policy: RunPolicy) -> ScoringRequest {
        ScoringRequest {
            dataset: vec![
                EvaluationRecord {
                    user_input: "What is 2+2?".to_string(),
                    response: "4".to_string(),
                    reference: "4".to_string(),
                },
                EvaluationRecord {
                    user_input: "Capital of France?".to_string(),
                    response: "Lyon".to_string(),
                    reference: "Paris".to_string(),
                },
            ],
            judge_model: DEFAULT_JUDGE_MODEL.to_string(),
            metrics: default_metrics(),
            run_policy: policy,
            batch_size: SCORING_BATCH_SIZE,
            show_progress: true,
        }
    }

    fn no_retries() -> RunPolicy {
        RunPolicy {
            max_retries: 0,
            max_wait: 1,
            timeout: 5,
            seed: 1337,
        }
    }

    #[tokio::test]
    async fn test_evaluate_assembles_result() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/evaluate")
            .match_header("authorization", "Bearer secret")
            .match_body(Matcher::PartialJson(json!({
                "judge_model": "gpt-4o",
                "batch_size": 4,
                "show_progress": true,
                "run_policy": {"max_retries": 0, "timeout": 5}
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({"scores": [
                    {"domain_specific_rubrics": 5.0},
                    {"domain_specific_rubrics": null}
                ]})
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;

        let engine = RemoteScoringEngine::new(server.url(), Some("secret".to_string()));
        let result = engine.evaluate(request(no_retries())).await.unwrap();

        mock.assert_async().await;
        assert_eq!(result.samples.len(), 2);
        assert_eq!(result.samples[0].scores["domain_specific_rubrics"], 5.0);
        assert!(result.samples[1].scores["domain_specific_rubrics"].is_nan());
        assert_eq!(result.summary.mean["domain_specific_rubrics"], 5.0);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/evaluate")
            .with_status(400)
            .with_body("bad metric")
            .expect(1)
            .create_async()
            .await;

        let policy = RunPolicy {
            max_retries: 3,
            ..no_retries()
        };
        let engine = RemoteScoringEngine::new(server.url(), None);
        let err = engine.evaluate(request(policy)).await.unwrap_err();

        mock.assert_async().await;
        assert!(err.to_string().contains("400"));
        assert!(err.to_string().contains("bad metric"));
    }

    #[tokio::test]
    async fn test_server_error_fails_once_budget_exhausted() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/evaluate")
            .with_status(503)
            .expect(1)
            .create_async()
            .await;

        let engine = RemoteScoringEngine::new(format!("{}/", server.url()), None);
        let err = engine.evaluate(request(no_retries())).await.unwrap_err();

        mock.assert_async().await;
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_rate_limit_then_success_is_retried() {
        let mut server = mockito::Server::new_async().await;
        let throttled = server
            .mock("POST", "/evaluate")
            .with_status(429)
            .with_body("slow down")
            .expect(1)
            .create_async()
            .await;
        let recovered = server
            .mock("POST", "/evaluate")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({"scores": [
                    {"domain_specific_rubrics": 4.0},
                    {"domain_specific_rubrics": 2.0}
                ]})
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;

        let policy = RunPolicy {
            max_retries: 2,
            ..no_retries()
        };
        let engine = RemoteScoringEngine::new(server.url(), None);
        let result = engine.evaluate(request(policy)).await.unwrap();

        throttled.assert_async().await;
        recovered.assert_async().await;
        assert_eq!(result.samples.len(), 2);
        assert_eq!(result.samples[1].scores["domain_specific_rubrics"], 2.0);
        assert_eq!(result.summary.mean["domain_specific_rubrics"], 3.0);
    }

    #[tokio::test]
    async fn test_mismatched_score_count() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/evaluate")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({"scores": [{"domain_specific_rubrics": 3.0}]}).to_string())
            .create_async()
            .await;

        let engine = RemoteScoringEngine::new(server.url(), None);
        let err = engine.evaluate(request(no_retries())).await.unwrap_err();
        assert!(err.to_string().contains("1 results for 2 samples"));
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable(StatusCode::BAD_GATEWAY));
        assert!(!is_retryable(StatusCode::UNAUTHORIZED));
    }
}
