//! Error types for evaluation runs.

use async_openai::error::OpenAIError;
use std::path::PathBuf;

/// Errors that can end an evaluation run.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error("invalid type of dataset: {found}")]
    InvalidInputType { found: String },

    #[error(
        "dataset doesn't contain the model `response`, but either `student_model` or the inference client wasn't provided"
    )]
    MissingGenerationConfig,

    #[error("`student_model` was specified but no inference client was provided")]
    MissingInferenceClient,

    #[error(transparent)]
    Inference(#[from] OpenAIError),

    #[error("completion for sample {index} contained no message content")]
    EmptyCompletion { index: usize },

    #[error("scoring engine failed: {0:#}")]
    ScoringEngine(anyhow::Error),

    #[error("failed to read dataset {}: {source}", .path.display())]
    ReadDataset {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid record on line {line}: {source}")]
    InvalidRecord {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid sample at index {index}: {source}")]
    InvalidSample {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("sample {index} has no response to score")]
    IncompleteDataset { index: usize },

    #[error("temperature must be within [0.0, 1.0], got {0}")]
    InvalidTemperature(f64),

    #[error("generation concurrency must be at least 1")]
    InvalidConcurrency,
}

pub type Result<T, E = EvalError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_type_message() {
        let err = EvalError::InvalidInputType {
            found: "string".to_string(),
        };
        assert_eq!(err.to_string(), "invalid type of dataset: string");
    }

    #[test]
    fn test_inference_error_is_not_wrapped() {
        let err: EvalError = OpenAIError::InvalidArgument("rate limited".to_string()).into();
        assert!(err.to_string().contains("rate limited"));
        assert!(matches!(err, EvalError::Inference(_)));
    }

    #[test]
    fn test_scoring_engine_message_keeps_context_chain() {
        let inner = anyhow::anyhow!("503 from judge").context("batch 2 failed");
        let err = EvalError::ScoringEngine(inner);
        assert_eq!(err.to_string(), "scoring engine failed: batch 2 failed: 503 from judge");
    }
}
