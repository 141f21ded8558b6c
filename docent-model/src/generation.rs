//! The generation client: question plus retrieved context in, answer out.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ModelConfig;
use crate::error::GenerateError;
use crate::http::{self, HttpFailure};

const SYSTEM_PROMPT: &str = "You are a helpful assistant. Answer the question using only the \
provided context passages. If the context does not contain the answer, say so plainly instead \
of guessing.";

/// A service that composes a natural-language answer from a question and
/// retrieved context passages. Injected as `Arc<dyn GenerationClient>`.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Produce an answer to `question` grounded in `context`.
    async fn generate(&self, question: &str, context: &[String])
    -> Result<String, GenerateError>;

    /// Identifier for log lines.
    fn name(&self) -> &str;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// [`GenerationClient`] over an OpenAI-compatible `/chat/completions` route.
pub struct HttpGenerationClient {
    config: ModelConfig,
    api_key: Option<String>,
    client: reqwest::Client,
    url: String,
}

impl HttpGenerationClient {
    /// Build a client from connection settings.
    pub fn new(config: ModelConfig) -> Result<Self, GenerateError> {
        let client = http::build_client(&config)?;
        let url = format!("{}/chat/completions", config.base_url());
        let api_key = config.api_key();
        Ok(Self {
            config,
            api_key,
            client,
            url,
        })
    }
}

/// Render the user message: numbered context passages followed by the
/// question.
fn user_message(question: &str, context: &[String]) -> String {
    let mut message = String::from("Context passages:\n\n");
    for (i, passage) in context.iter().enumerate() {
        message.push_str(&format!("[{}] {}\n\n", i + 1, passage));
    }
    message.push_str(&format!("Question: {question}"));
    message
}

#[async_trait]
impl GenerationClient for HttpGenerationClient {
    async fn generate(
        &self,
        question: &str,
        context: &[String],
    ) -> Result<String, GenerateError> {
        tracing::debug!(
            passages = context.len(),
            model = %self.config.generation_model,
            "generating answer"
        );
        let request = ChatRequest {
            model: &self.config.generation_model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user_message(question, context),
                },
            ],
        };
        let response: ChatResponse = http::post_json(
            &self.client,
            &self.url,
            self.api_key.as_deref(),
            &request,
            self.config.max_retries,
        )
        .await
        .map_err(|failure| match failure {
            HttpFailure::Transport(e) => GenerateError::from(e),
            HttpFailure::Malformed(m) => GenerateError::invalid_response(m),
            status => GenerateError::upstream(status.to_string()),
        })?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| GenerateError::invalid_response("response held no completion"))
    }

    fn name(&self) -> &str {
        &self.config.generation_model
    }
}
