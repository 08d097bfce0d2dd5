use crate::config::ModelConfig;
use crate::dataset::Dataset;
use crate::error::{EvalError, Result};
use async_openai::{
    Client,
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
        CreateChatCompletionResponse,
    },
};
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};

/// System prompt used when the candidate model config doesn't provide one
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an advanced AI assistant designed to provide precise and accurate information.
Your primary goal is to answer queries with the most up-to-date and factual information available.
Focus on delivering clear, concise, and correct responses.
If you're uncertain about any aspect of the query, state your level of confidence and provide the most accurate information you can.
Your responses should prioritize accuracy over all other considerations.";

/// Seed sent with every generation request, independent of `ModelConfig::seed`
pub const GENERATION_SEED: i64 = 42;

/// An OpenAI-compatible chat completion endpoint
#[async_trait]
pub trait ChatCompletionClient: Send + Sync {
    async fn create(
        &self,
        request: CreateChatCompletionRequest,
    ) -> Result<CreateChatCompletionResponse, OpenAIError>;
}

#[async_trait]
impl ChatCompletionClient for Client<OpenAIConfig> {
    async fn create(
        &self,
        request: CreateChatCompletionRequest,
    ) -> Result<CreateChatCompletionResponse, OpenAIError> {
        self.chat().create(request).await
    }
}

/// Fills in missing answers by asking the candidate model each question
pub struct AnswerGenerator<'a> {
    client: &'a dyn ChatCompletionClient,
    model: &'a ModelConfig,
    concurrency: usize,
}

impl<'a> AnswerGenerator<'a> {
    /// Create a generator that issues one request at a time
    pub fn new(client: &'a dyn ChatCompletionClient, model: &'a ModelConfig) -> Self {
        Self {
            client,
            model,
            concurrency: 1,
        }
    }

    /// Allow up to `concurrency` requests in flight. Answers keep dataset order.
    pub fn with_concurrency(mut self, concurrency: usize) -> Result<Self> {
        if concurrency == 0 {
            return Err(EvalError::InvalidConcurrency);
        }
        self.concurrency = concurrency;
        Ok(self)
    }

    /// Return a copy of `dataset` whose every row carries a freshly generated response.
    ///
    /// Existing responses are overwritten. Inference errors are returned as-is.
    pub async fn generate(&self, dataset: &Dataset) -> Result<Dataset> {
        let total = dataset.len();

        let responses: Vec<String> = stream::iter(dataset.rows().iter().enumerate())
            .map(|(index, sample)| async move {
                tracing::debug!(sample = index + 1, total, "generating answer");
                self.answer(index, &sample.user_input).await
            })
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        let mut updated = dataset.clone();
        for (row, response) in updated.rows_mut().iter_mut().zip(responses) {
            row.response = Some(response);
        }
        Ok(updated)
    }

    async fn answer(&self, index: usize, question: &str) -> Result<String> {
        let request = self.build_request(question)?;
        let response = self.client.create(request).await?;
        extract_content(response).ok_or(EvalError::EmptyCompletion { index })
    }

    /// Build the two-turn chat completion request for one question
    fn build_request(&self, question: &str) -> Result<CreateChatCompletionRequest> {
        let system_message = ChatCompletionRequestSystemMessageArgs::default()
            .content(self.model.system_prompt())
            .build()?
            .into();

        let user_message = ChatCompletionRequestUserMessageArgs::default()
            .content(question)
            .build()?
            .into();

        let request = CreateChatCompletionRequestArgs::default()
            .model(self.model.model_name())
            .messages([system_message, user_message])
            .seed(GENERATION_SEED)
            .max_tokens(self.model.max_tokens())
            .temperature(self.model.temperature() as f32)
            .build()?;
        Ok(request)
    }
}

/// Text of the first returned choice, if it isn't blank
fn extract_content(response: CreateChatCompletionResponse) -> Option<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
}
