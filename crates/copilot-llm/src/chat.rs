//! Chat completions.

use serde::{Deserialize, Serialize};
use tracing::debug;

use copilot_contracts::{
    error::{CopilotError, CopilotResult},
    message::ChatMessage,
    settings::GenerationSettings,
};
use copilot_core::traits::Generator;

use crate::http::{decode, ApiClient};

fn generation_error(reason: String) -> CopilotError {
    CopilotError::Generation { reason }
}

#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Pull `choices[0].message.content` out of a response body, trimmed.
///
/// An empty string is a valid reply. A missing choice or a null content is
/// `CopilotError::Generation`.
pub fn parse_chat_response(body: &str) -> CopilotResult<String> {
    let response: ChatResponse = decode(body, generation_error)?;
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| generation_error("response contained no choices".into()))?;
    let content = choice
        .message
        .content
        .ok_or_else(|| generation_error("first choice has no content".into()))?;
    Ok(content.trim().to_string())
}

/// `Generator` over an OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiChat {
    api: ApiClient,
    model: String,
    temperature: f32,
}

impl OpenAiChat {
    pub fn new(settings: &GenerationSettings, api_key: String) -> CopilotResult<Self> {
        Ok(Self {
            api: ApiClient::new(settings, api_key, generation_error)?,
            model: settings.model.clone(),
            temperature: settings.temperature,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl Generator for OpenAiChat {
    fn generate(&self, messages: &[ChatMessage], max_output_tokens: u32) -> CopilotResult<String> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: max_output_tokens,
        };
        let body = self.api.post_json("chat/completions", &request, generation_error)?;
        let reply = parse_chat_response(&body)?;

        debug!(model = %self.model, max_tokens = max_output_tokens, chars = reply.len(), "chat completion");
        Ok(reply)
    }
}
