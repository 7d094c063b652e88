//! Topic extraction across chunks.

use super::{ChunkOutcome, PipelineReport, PipelineStage, SkipReason, StageTracker};
use crate::config::{Prompts, Settings};
use crate::credentials::{key_hint, CredentialPool};
use crate::extract::ResponseExtractor;
use crate::llm::{complete_with_timeout, CompletionRequest, LanguageModel};
use crate::text;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone)]
pub struct TopicConfig {
    pub model: String,
    pub temperature: f32,
    pub max_chunk_chars: usize,
    pub call_timeout: Duration,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            temperature: 0.2,
            max_chunk_chars: text::DEFAULT_MAX_CHUNK_CHARS,
            call_timeout: Duration::from_secs(crate::openai::DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl TopicConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            model: settings.llm.model.clone(),
            max_chunk_chars: settings.pipeline.max_chunk_chars,
            call_timeout: settings.llm.request_timeout(),
            ..Default::default()
        }
    }
}

/// Extracts the set of academic topics covered by a text.
///
/// Unlike dialogue generation the chunks are independent: no context is
/// carried between calls and no pause is inserted.
pub struct TopicPipeline {
    model: Arc<dyn LanguageModel>,
    credentials: CredentialPool,
    prompts: Prompts,
    config: TopicConfig,
    extractor: ResponseExtractor,
}

impl TopicPipeline {
    pub fn new(model: Arc<dyn LanguageModel>, credentials: CredentialPool) -> Self {
        Self {
            model,
            credentials,
            prompts: Prompts::default(),
            config: TopicConfig::default(),
            extractor: ResponseExtractor::new(),
        }
    }

    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_config(mut self, config: TopicConfig) -> Self {
        self.config = config;
        self
    }

    /// Extract topics, sorted ascending and deduplicated.
    #[instrument(skip_all, fields(input_chars = raw.len()))]
    pub async fn run(&self, raw: &str) -> PipelineReport<Vec<String>> {
        let mut tracker = StageTracker::new("topics");

        tracker.advance(PipelineStage::Normalizing);
        let normalized = text::normalize(raw);

        tracker.advance(PipelineStage::Chunking);
        let chunks = text::chunk(&normalized, self.config.max_chunk_chars);
        let total = chunks.len();

        let mut rotator = self.credentials.rotator();
        let mut topics = BTreeSet::new();
        let mut outcomes = Vec::with_capacity(total);

        for (index, chunk) in chunks.iter().enumerate() {
            tracker.advance(PipelineStage::ProcessingChunk { index, total });
            let key = rotator.next_key();

            match self.process_chunk(key, chunk).await {
                Ok(found) => {
                    outcomes.push(ChunkOutcome::Completed {
                        index,
                        items: found.len(),
                    });
                    topics.extend(found);
                }
                Err(reason) => {
                    warn!(
                        "Skipping topic chunk {} (key ...{}): {}",
                        index + 1,
                        key_hint(key),
                        reason
                    );
                    outcomes.push(ChunkOutcome::Skipped { index, reason });
                }
            }
        }

        tracker.advance(PipelineStage::Aggregating);
        let output: Vec<String> = topics.into_iter().collect();

        tracker.advance(PipelineStage::Done);
        info!("Extracted {} topics from {} chunks", output.len(), total);

        PipelineReport { output, outcomes }
    }

    async fn process_chunk(
        &self,
        key: &str,
        chunk: &str,
    ) -> std::result::Result<Vec<String>, SkipReason> {
        let mut vars = HashMap::new();
        vars.insert("chunk".to_string(), chunk.to_string());
        let prompt = self.prompts.render_with_custom(&self.prompts.topics.user, &vars);

        let request = CompletionRequest::new(&self.config.model, prompt)
            .with_temperature(self.config.temperature)
            .json_object();

        let raw = complete_with_timeout(
            self.model.as_ref(),
            key,
            &request,
            self.config.call_timeout,
        )
        .await?;

        let Value::Object(payload) = self.extractor.extract(&raw)? else {
            return Err(SkipReason::NotASequence);
        };

        match payload.get("topics") {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => Ok(items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect()),
            Some(_) => Err(SkipReason::NotASequence),
        }
    }
}
