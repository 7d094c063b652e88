//! Language model access.
//!
//! The pipelines only need "prompt in, text out", so the model sits behind the
//! [`LanguageModel`] trait. [`OpenAiCompatModel`] is the production
//! implementation; tests substitute scripted fakes.

use crate::credentials::CredentialPool;
use crate::error::{LecternError, Result};
use crate::openai::create_client_with_timeout;
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs, ResponseFormat,
};
use async_openai::Client;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument};

/// A single completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub system: Option<String>,
    pub user: String,
    pub temperature: f32,
    /// Ask the provider to constrain output to a JSON object.
    pub json_object: bool,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system: None,
            user: user.into(),
            temperature: 0.7,
            json_object: false,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn json_object(mut self) -> Self {
        self.json_object = true;
        self
    }
}

/// Text completion provider.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Run `request` authenticated with `api_key` and return the completion text.
    async fn complete(&self, api_key: &str, request: &CompletionRequest) -> Result<String>;
}

/// Run a completion, failing with [`LecternError::Timeout`] if it takes longer than `timeout`.
pub async fn complete_with_timeout(
    model: &dyn LanguageModel,
    api_key: &str,
    request: &CompletionRequest,
    timeout: Duration,
) -> Result<String> {
    match tokio::time::timeout(timeout, model.complete(api_key, request)).await {
        Ok(result) => result,
        Err(_) => Err(LecternError::Timeout(timeout.as_secs())),
    }
}

/// Chat completions over an OpenAI-compatible HTTP API.
pub struct OpenAiCompatModel {
    api_base: String,
    timeout: Duration,
    clients: HashMap<String, Client<OpenAIConfig>>,
}

impl OpenAiCompatModel {
    /// Build one client per pooled credential.
    pub fn new(api_base: &str, pool: &CredentialPool, timeout: Duration) -> Result<Self> {
        let mut clients = HashMap::with_capacity(pool.len());
        for key in pool.keys() {
            clients.insert(key.clone(), create_client_with_timeout(api_base, key, timeout)?);
        }

        Ok(Self {
            api_base: api_base.to_string(),
            timeout,
            clients,
        })
    }

    fn build_messages(request: &CompletionRequest) -> Result<Vec<ChatCompletionRequestMessage>> {
        let mut messages: Vec<ChatCompletionRequestMessage> = Vec::with_capacity(2);

        if let Some(system) = &request.system {
            messages.push(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system.clone())
                    .build()
                    .map_err(|e| LecternError::Model(e.to_string()))?
                    .into(),
            );
        }

        messages.push(
            ChatCompletionRequestUserMessageArgs::default()
                .content(request.user.clone())
                .build()
                .map_err(|e| LecternError::Model(e.to_string()))?
                .into(),
        );

        Ok(messages)
    }
}

#[async_trait]
impl LanguageModel for OpenAiCompatModel {
    #[instrument(skip(self, api_key, request), fields(model = %request.model, prompt_chars = request.user.len()))]
    async fn complete(&self, api_key: &str, request: &CompletionRequest) -> Result<String> {
        let adhoc;
        let client = match self.clients.get(api_key) {
            Some(client) => client,
            None => {
                adhoc = create_client_with_timeout(&self.api_base, api_key, self.timeout)?;
                &adhoc
            }
        };

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(&request.model)
            .messages(Self::build_messages(request)?)
            .temperature(request.temperature);
        if request.json_object {
            builder.response_format(ResponseFormat::JsonObject);
        }
        let chat_request = builder
            .build()
            .map_err(|e| LecternError::Model(e.to_string()))?;

        let response = client
            .chat()
            .create(chat_request)
            .await
            .map_err(|e| LecternError::Model(format!("Failed to get completion: {}", e)))?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .ok_or_else(|| LecternError::Model("Empty response from LLM".to_string()))?
            .clone();

        debug!(
            "Completion ({} chars): {}",
            content.len(),
            crate::text::head_chars(&content, 500)
        );

        Ok(content)
    }
}
