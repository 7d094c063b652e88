//! Single-call lecture helpers: page summaries and doubt clearing.

use crate::config::{Prompts, Settings};
use crate::credentials::{key_hint, CredentialPool};
use crate::error::{LecternError, Result};
use crate::extract::ResponseExtractor;
use crate::llm::{complete_with_timeout, CompletionRequest, LanguageModel};
use crate::search::{fetch_images, ImageSearch};
use crate::text;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone)]
pub struct LectureConfig {
    pub model: String,
    pub temperature: f32,
    pub call_timeout: Duration,
    pub images_per_topic: usize,
}

impl Default for LectureConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash-lite".to_string(),
            temperature: 0.7,
            call_timeout: Duration::from_secs(crate::openai::DEFAULT_TIMEOUT_SECS),
            images_per_topic: 2,
        }
    }
}

impl LectureConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            model: settings.llm.light_model.clone(),
            temperature: settings.llm.temperature,
            call_timeout: settings.llm.request_timeout(),
            images_per_topic: settings.search.images_per_topic,
        }
    }
}

/// A summary plus any illustrative images found for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LectureSummary {
    pub resp: String,
    pub images: Vec<String>,
}

pub struct LectureService {
    model: Arc<dyn LanguageModel>,
    credentials: CredentialPool,
    images: Arc<dyn ImageSearch>,
    prompts: Prompts,
    config: LectureConfig,
    extractor: ResponseExtractor,
}

impl LectureService {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        credentials: CredentialPool,
        images: Arc<dyn ImageSearch>,
    ) -> Self {
        Self {
            model,
            credentials,
            images,
            prompts: Prompts::default(),
            config: LectureConfig::default(),
            extractor: ResponseExtractor::new(),
        }
    }

    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_config(mut self, config: LectureConfig) -> Self {
        self.config = config;
        self
    }

    /// Summarize textbook pages, fetching images when the model asks for them.
    #[instrument(skip_all, fields(input_chars = raw.len()))]
    pub async fn summarize(&self, raw: &str) -> Result<LectureSummary> {
        let normalized = text::normalize(raw);
        if normalized.is_empty() {
            return Err(LecternError::Validation("text is empty".to_string()));
        }

        let mut vars = HashMap::new();
        vars.insert("text".to_string(), normalized);
        let prompt = self.prompts.render_with_custom(&self.prompts.lecture.summary, &vars);

        let payload = self.ask(prompt).await?;
        let resp = string_field(&payload, "resp");

        let wants_images = payload
            .get("image_needed")
            .and_then(Value::as_str)
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("yes"));

        let images = if wants_images {
            let descriptions = image_descriptions(payload.get("image_of"));
            debug!("Model requested images for {} descriptions", descriptions.len());
            fetch_images(self.images.as_ref(), &descriptions, self.config.images_per_topic).await
        } else {
            Vec::new()
        };

        info!("Summary of {} chars with {} images", resp.len(), images.len());
        Ok(LectureSummary { resp, images })
    }

    /// Answer a reader's question about the material they are reading.
    #[instrument(skip_all, fields(query_chars = query.len(), context_chars = context.len()))]
    pub async fn clear_doubt(&self, query: &str, context: &str) -> Result<String> {
        if query.trim().is_empty() {
            return Err(LecternError::Validation("query is empty".to_string()));
        }

        let mut vars = HashMap::new();
        vars.insert("query".to_string(), query.trim().to_string());
        vars.insert("context".to_string(), text::normalize(context));
        let prompt = self.prompts.render_with_custom(&self.prompts.lecture.doubt, &vars);

        let payload = self.ask(prompt).await?;
        Ok(string_field(&payload, "doubt_clear"))
    }

    async fn ask(&self, prompt: String) -> Result<Value> {
        let key = self.credentials.next_shared();
        debug!("Lecture call with key ...{} ({} chars)", key_hint(key), prompt.len());

        let request = CompletionRequest::new(&self.config.model, prompt)
            .with_temperature(self.config.temperature)
            .json_object();
        let raw = complete_with_timeout(self.model.as_ref(), key, &request, self.config.call_timeout)
            .await?;

        match self.extractor.extract(&raw)? {
            payload @ Value::Object(_) => Ok(payload),
            other => Err(LecternError::Parse(format!(
                "expected a JSON object, got {}",
                text::head_chars(&other.to_string(), 200)
            ))),
        }
    }
}

fn string_field(payload: &Value, name: &str) -> String {
    match payload.get(name) {
        Some(Value::String(s)) => s.clone(),
        None | Some(Value::Null) => String::new(),
        Some(other) => other.to_string(),
    }
}

/// `image_of` may come back as a list or a single string.
fn image_descriptions(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}
