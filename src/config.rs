use crate::error::EvalError;
use crate::generation::DEFAULT_SYSTEM_PROMPT;
use crate::policy::{DEFAULT_SEED, RunPolicy};
use anyhow::{Context, Result};
use async_openai::{Client, config::OpenAIConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Inference settings for the candidate model that answers questions.
///
/// Construction validates the sampling temperature, so a value of this type
/// is always usable as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ModelConfigFile")]
pub struct ModelConfig {
    model_name: String,
    system_prompt: String,
    temperature: f64,
    max_tokens: u32,
    seed: u64,
}

/// Unvalidated form of [`ModelConfig`] as it appears in a run file
#[derive(Debug, Deserialize)]
struct ModelConfigFile {
    model_name: String,
    #[serde(default = "default_system_prompt")]
    system_prompt: String,
    #[serde(default)]
    temperature: f64,
    #[serde(default = "default_max_tokens")]
    max_tokens: u32,
    #[serde(default = "default_seed")]
    seed: u64,
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

fn default_max_tokens() -> u32 {
    768
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

fn default_concurrency() -> usize {
    1
}

impl TryFrom<ModelConfigFile> for ModelConfig {
    type Error = EvalError;

    fn try_from(file: ModelConfigFile) -> Result<Self, Self::Error> {
        ModelConfig::new(file.model_name)
            .with_system_prompt(file.system_prompt)
            .with_max_tokens(file.max_tokens)
            .with_seed(file.seed)
            .with_temperature(file.temperature)
    }
}

impl ModelConfig {
    /// Deterministic defaults for the given model
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            system_prompt: default_system_prompt(),
            temperature: 0.0,
            max_tokens: default_max_tokens(),
            seed: DEFAULT_SEED,
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    /// Set the sampling temperature, rejecting values outside `[0.0, 1.0]`
    pub fn with_temperature(mut self, temperature: f64) -> Result<Self, EvalError> {
        if !(0.0..=1.0).contains(&temperature) {
            return Err(EvalError::InvalidTemperature(temperature));
        }
        self.temperature = temperature;
        Ok(self)
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Not every serving runtime honors this
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

/// OpenAI-compatible endpoint serving the candidate model
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InferenceConfig {
    /// API base URL
    pub api_endpoint: String,
    /// Environment variable name containing the API key
    pub env_var_api_key: String,
}

impl InferenceConfig {
    /// Create the OpenAI client for the candidate model
    pub fn client(&self) -> Result<Client<OpenAIConfig>> {
        let api_key = std::env::var(&self.env_var_api_key)
            .with_context(|| format!("Environment variable {} not found", self.env_var_api_key))?;

        let openai_config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(&self.api_endpoint);

        Ok(Client::with_config(openai_config))
    }
}

/// External scoring service
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScoringConfig {
    /// Base URL of the scoring service
    pub endpoint: String,
    /// Environment variable name containing the service's bearer token
    #[serde(default)]
    pub env_var_api_key: Option<String>,
}

impl ScoringConfig {
    pub fn api_key(&self) -> Result<Option<String>> {
        self.env_var_api_key
            .as_ref()
            .map(|var| {
                std::env::var(var).with_context(|| format!("Environment variable {} not found", var))
            })
            .transpose()
    }
}

/// A run file describing one evaluation
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Either `{ path = "..." }` or an inline array of samples
    pub dataset: toml::Value,
    /// Candidate model used to (re)generate answers
    #[serde(default)]
    pub student_model: Option<ModelConfig>,
    /// Endpoint for the candidate model
    #[serde(default)]
    pub inference: Option<InferenceConfig>,
    /// Retry/timeout settings for scoring; permissive defaults when absent
    #[serde(default)]
    pub run_policy: Option<RunPolicy>,
    pub scoring: ScoringConfig,
    /// Maximum number of generation requests in flight
    #[serde(default = "default_concurrency")]
    pub generation_concurrency: usize,
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// A relative `dataset.path` is taken relative to the run file's directory.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", path.display()))?;
        if let Some(base) = path.parent() {
            config.resolve_dataset_path(base);
        }
        Ok(config)
    }

    fn resolve_dataset_path(&mut self, base: &Path) {
        let Some(toml::Value::String(dataset_path)) = self.dataset.get_mut("path") else {
            return;
        };
        if Path::new(dataset_path.as_str()).is_relative() {
            *dataset_path = base.join(dataset_path.as_str()).to_string_lossy().into_owned();
        }
    }

    /// The dataset entry as JSON, ready for normalization
    pub fn dataset_value(&self) -> Result<serde_json::Value> {
        serde_json::to_value(&self.dataset).context("Failed to convert dataset entry")
    }
}
