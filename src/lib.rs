//! Rubric-based evaluation of model answers against golden answers.
//!
//! A [`RubricEvaluator`] normalizes a dataset of [`Sample`]s, optionally asks a
//! candidate model to (re)generate every answer, and hands the completed
//! records to a [`ScoringEngine`] that grades them with a judge model.
//!
//! ```rust,ignore
//! use rubric_eval::*;
//! use std::sync::Arc;
//!
//! let engine = Arc::new(RemoteScoringEngine::new("http://localhost:9000", None));
//! let evaluator = RubricEvaluator::new(engine);
//! let samples = vec![Sample::new("What is 2+2?", "4").with_response("Four")];
//! let result = evaluator.run(samples, RunOptions::new()).await?;
//! ```

pub mod config;
pub mod dataset;
pub mod error;
pub mod evaluator;
pub mod generation;
pub mod metrics;
pub mod models;
pub mod output;
pub mod policy;
pub mod scoring;

pub use config::ModelConfig;
pub use dataset::{Dataset, IntoDataset};
pub use error::EvalError;
pub use evaluator::{RubricEvaluator, RunOptions};
pub use generation::{AnswerGenerator, ChatCompletionClient, DEFAULT_SYSTEM_PROMPT};
pub use metrics::{Metric, RubricsScore, default_metrics};
pub use models::{EvaluationRecord, EvaluationResult, Sample, SampleScore, Statistics};
pub use policy::RunPolicy;
pub use scoring::{DEFAULT_JUDGE_MODEL, RemoteScoringEngine, ScoringEngine, ScoringRequest};
