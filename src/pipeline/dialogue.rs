//! Text-to-dialogue generation.

use super::{ChunkOutcome, PipelineReport, PipelineStage, SkipReason, StageTracker};
use crate::config::{Prompts, Settings};
use crate::credentials::{key_hint, CredentialPool};
use crate::extract::ResponseExtractor;
use crate::llm::{complete_with_timeout, CompletionRequest, LanguageModel};
use crate::text::{self, tail_chars};
use crate::throttle::ThrottlePolicy;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Speaker label used when the model omits one.
pub const DEFAULT_SPEAKER: &str = "Speaker 1";

/// One line of the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueTurn {
    pub speaker: String,
    pub text: String,
}

impl DialogueTurn {
    pub fn new(speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            text: text.into(),
        }
    }

    /// Convert a raw model entry, filling in missing fields.
    fn from_entry(entry: &Map<String, Value>) -> Self {
        Self {
            speaker: scalar_field(entry, "speaker").unwrap_or_else(|| DEFAULT_SPEAKER.to_string()),
            text: scalar_field(entry, "text").unwrap_or_default(),
        }
    }
}

/// Ordered conversation.
pub type Dialogue = Vec<DialogueTurn>;

/// String value of `key`, with numbers and booleans stringified.
fn scalar_field(entry: &Map<String, Value>, key: &str) -> Option<String> {
    match entry.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Tunables for [`DialoguePipeline`].
#[derive(Debug, Clone)]
pub struct DialogueConfig {
    pub model: String,
    pub temperature: f32,
    pub max_chunk_chars: usize,
    /// Characters of rolling context quoted in follow-up prompts.
    pub context_chars: usize,
    /// Trailing turns of a chunk that become the rolling context.
    pub context_turns: usize,
    pub throttle: ThrottlePolicy,
    pub call_timeout: Duration,
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            temperature: 0.7,
            max_chunk_chars: text::DEFAULT_MAX_CHUNK_CHARS,
            context_chars: 500,
            context_turns: 2,
            throttle: ThrottlePolicy::default(),
            call_timeout: Duration::from_secs(crate::openai::DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl DialogueConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            model: settings.llm.model.clone(),
            temperature: settings.llm.temperature,
            max_chunk_chars: settings.pipeline.max_chunk_chars,
            context_chars: settings.pipeline.context_chars,
            context_turns: settings.pipeline.context_turns,
            throttle: ThrottlePolicy::new(
                Duration::from_millis(settings.pipeline.throttle_base_ms),
                Duration::from_millis(settings.pipeline.throttle_floor_ms),
            ),
            call_timeout: settings.llm.request_timeout(),
        }
    }
}

/// Converts long text into a two-speaker dialogue, one model call per chunk.
///
/// Each follow-up chunk is prompted with the tail of the previous successful
/// chunk's conversation so the dialogue continues instead of restarting.
pub struct DialoguePipeline {
    model: Arc<dyn LanguageModel>,
    credentials: CredentialPool,
    prompts: Prompts,
    config: DialogueConfig,
    extractor: ResponseExtractor,
}

impl DialoguePipeline {
    pub fn new(model: Arc<dyn LanguageModel>, credentials: CredentialPool) -> Self {
        Self {
            model,
            credentials,
            prompts: Prompts::default(),
            config: DialogueConfig::default(),
            extractor: ResponseExtractor::new(),
        }
    }

    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_config(mut self, config: DialogueConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_extractor(mut self, extractor: ResponseExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Generate a dialogue from raw text.
    ///
    /// Never fails as a whole: chunks that cannot be processed are logged,
    /// recorded in the report, and left out of the dialogue.
    #[instrument(skip_all, fields(input_chars = raw.len()))]
    pub async fn run(&self, raw: &str) -> PipelineReport<Dialogue> {
        let mut tracker = StageTracker::new("dialogue");

        tracker.advance(PipelineStage::Normalizing);
        let normalized = text::normalize(raw);

        tracker.advance(PipelineStage::Chunking);
        let chunks = text::chunk(&normalized, self.config.max_chunk_chars);
        let total = chunks.len();

        let mut rotator = self.credentials.rotator();
        let throttle = self.config.throttle.scheduler(rotator.pool_size());
        info!(
            "Processing {} chunks with {} API keys",
            total,
            rotator.pool_size()
        );

        let mut entries: Vec<Map<String, Value>> = Vec::new();
        let mut outcomes = Vec::with_capacity(total);
        let mut rolling_context = String::new();

        for (index, chunk) in chunks.iter().enumerate() {
            tracker.advance(PipelineStage::ProcessingChunk { index, total });
            throttle.pace(index).await;

            let key = rotator.next_key();
            let prompt = self.build_prompt(chunk, index, total, &rolling_context);
            debug!(
                "Chunk {}/{}: {} prompt chars, key ...{}",
                index + 1,
                total,
                prompt.len(),
                key_hint(key)
            );

            match self.process_chunk(key, prompt).await {
                Ok(turns) => {
                    rolling_context = self.rolling_context(&turns);
                    outcomes.push(ChunkOutcome::Completed {
                        index,
                        items: turns.len(),
                    });
                    entries.extend(turns);
                }
                Err(reason) => {
                    warn!(
                        "Error processing chunk {} with key ...{}: {}",
                        index + 1,
                        key_hint(key),
                        reason
                    );
                    outcomes.push(ChunkOutcome::Skipped { index, reason });
                }
            }
        }

        tracker.advance(PipelineStage::Aggregating);
        let dialogue: Dialogue = entries.iter().map(DialogueTurn::from_entry).collect();

        tracker.advance(PipelineStage::Done);
        info!(
            "Generated {} dialogue turns from {}/{} chunks",
            dialogue.len(),
            outcomes.iter().filter(|o| !o.is_skipped()).count(),
            total
        );

        PipelineReport {
            output: dialogue,
            outcomes,
        }
    }

    /// Prompt for chunk `index` of `total`.
    fn build_prompt(&self, chunk: &str, index: usize, total: usize, rolling_context: &str) -> String {
        let mut step = String::new();
        if total > 1 {
            step.push_str(&format!("(Part {} of {}) ", index + 1, total));
            if index > 0 {
                step.push_str(&format!(
                    "Continue the conversation based on the previous context:\n\
                     Context: {}...\n\n\
                     Do NOT re-introduce the speakers. Jump straight into discussion.\n",
                    tail_chars(rolling_context, self.config.context_chars)
                ));
            }
        }

        let mut vars = HashMap::new();
        vars.insert("step".to_string(), step);
        vars.insert("chunk".to_string(), chunk.to_string());
        self.prompts.render_with_custom(&self.prompts.dialogue.user, &vars)
    }

    async fn process_chunk(
        &self,
        key: &str,
        prompt: String,
    ) -> std::result::Result<Vec<Map<String, Value>>, SkipReason> {
        let request = CompletionRequest::new(&self.config.model, prompt)
            .with_system(self.prompts.dialogue.system.clone())
            .with_temperature(self.config.temperature);

        let raw = complete_with_timeout(
            self.model.as_ref(),
            key,
            &request,
            self.config.call_timeout,
        )
        .await?;

        let Value::Array(items) = self.extractor.extract(&raw)? else {
            return Err(SkipReason::NotASequence);
        };

        items
            .into_iter()
            .enumerate()
            .map(|(position, item)| match item {
                Value::Object(entry) => Ok(entry),
                _ => Err(SkipReason::MalformedEntry { position }),
            })
            .collect()
    }

    /// Text of the last few turns, joined by spaces.
    fn rolling_context(&self, turns: &[Map<String, Value>]) -> String {
        let start = turns.len().saturating_sub(self.config.context_turns);
        turns[start..]
            .iter()
            .map(|t| scalar_field(t, "text").unwrap_or_default())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LecternError;
    use crate::pipeline::testing::ScriptedModel;

    fn no_throttle() -> DialogueConfig {
        DialogueConfig {
            max_chunk_chars: 40,
            throttle: ThrottlePolicy::new(Duration::ZERO, Duration::ZERO),
            ..Default::default()
        }
    }

    fn pipeline(model: Arc<ScriptedModel>, keys: &str) -> DialoguePipeline {
        DialoguePipeline::new(model, CredentialPool::parse(keys).unwrap()).with_config(no_throttle())
    }

    /// Three lines that each land in their own 40-char chunk.
    const THREE_CHUNKS: &str = "Newton's first law concerns inertia.\n\
                                Gravity accelerates falling objects.\n\
                                Friction opposes relative motion.";

    #[tokio::test]
    async fn test_single_chunk_dialogue() {
        let model = Arc::new(ScriptedModel::new(vec![Ok(
            r#"[{"speaker":"Speaker 1","text":"Hi"},{"speaker":"Speaker 2","text":"Hello"}]"#
                .to_string(),
        )]));
        let report = pipeline(model.clone(), "k1").run("Short text.").await;

        assert_eq!(
            report.output,
            vec![
                DialogueTurn::new("Speaker 1", "Hi"),
                DialogueTurn::new("Speaker 2", "Hello")
            ]
        );

        let calls = model.calls();
        assert_eq!(calls.len(), 1);
        let prompt = &calls[0].1.user;
        assert!(!prompt.contains("(Part"));
        assert!(prompt.contains("---\nShort text.\n---"));
        assert!(calls[0].1.system.as_deref().unwrap().contains("dialogue writer"));
    }

    #[tokio::test]
    async fn test_failed_chunk_is_skipped_and_context_carries_over() {
        let model = Arc::new(ScriptedModel::new(vec![
            Ok(r#"[{"speaker":"Speaker 1","text":"alpha one"},{"speaker":"Speaker 2","text":"alpha two"}]"#.to_string()),
            Err(LecternError::Model("quota exceeded".to_string())),
            Ok("```json\n[{\"speaker\":\"Speaker 2\",\"text\":\"gamma\"}]\n```".to_string()),
        ]));
        let report = pipeline(model.clone(), "k1,k2").run(THREE_CHUNKS).await;

        assert_eq!(
            report.output,
            vec![
                DialogueTurn::new("Speaker 1", "alpha one"),
                DialogueTurn::new("Speaker 2", "alpha two"),
                DialogueTurn::new("Speaker 2", "gamma"),
            ]
        );
        assert_eq!(report.chunk_count(), 3);
        assert_eq!(report.completed(), 2);
        assert!(matches!(
            report.outcomes[1],
            ChunkOutcome::Skipped { index: 1, reason: SkipReason::Model(_) }
        ));

        let calls = model.calls();
        let keys: Vec<&str> = calls.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["k1", "k2", "k1"]);

        assert!(calls[0].1.user.starts_with("(Part 1 of 3) Convert"));
        assert!(!calls[0].1.user.contains("Context:"));
        assert!(calls[1].1.user.contains("Context: alpha one alpha two..."));
        assert!(calls[2].1.user.starts_with("(Part 3 of 3) Continue the conversation"));
        assert!(calls[2].1.user.contains("Context: alpha one alpha two..."));
        assert!(calls[2].1.user.contains("Do NOT re-introduce the speakers."));
        assert!(calls[2].1.user.contains("Friction opposes relative motion."));
    }

    /// Stalls on the second call, answers the others.
    struct StallOnSecond {
        calls: std::sync::Mutex<usize>,
    }

    #[async_trait::async_trait]
    impl LanguageModel for StallOnSecond {
        async fn complete(
            &self,
            _api_key: &str,
            _request: &CompletionRequest,
        ) -> crate::error::Result<String> {
            let call = {
                let mut calls = self.calls.lock().unwrap();
                *calls += 1;
                *calls
            };
            if call == 2 {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            Ok(format!(r#"[{{"speaker":"Speaker 1","text":"part {}"}}]"#, call))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_chunk_times_out_and_is_skipped() {
        let model = Arc::new(StallOnSecond {
            calls: std::sync::Mutex::new(0),
        });
        let pipeline = DialoguePipeline::new(model, CredentialPool::parse("k1,k2").unwrap())
            .with_config(DialogueConfig {
                call_timeout: Duration::from_secs(30),
                ..no_throttle()
            });

        let report = pipeline.run(THREE_CHUNKS).await;

        assert_eq!(
            report.output,
            vec![
                DialogueTurn::new("Speaker 1", "part 1"),
                DialogueTurn::new("Speaker 1", "part 3"),
            ]
        );
        assert_eq!(
            report.outcomes[1],
            ChunkOutcome::Skipped {
                index: 1,
                reason: SkipReason::Timeout(30)
            }
        );
    }

    #[tokio::test]
    async fn test_context_uses_last_two_turns_and_is_truncated() {
        let long = "z".repeat(800);
        let first = serde_json::json!([
            {"speaker": "Speaker 1", "text": "dropped"},
            {"speaker": "Speaker 2", "text": "kept"},
            {"speaker": "Speaker 1", "text": long},
        ])
        .to_string();
        let model = Arc::new(ScriptedModel::new(vec![
            Ok(first),
            Ok("[]".to_string()),
            Ok("[]".to_string()),
        ]));
        pipeline(model.clone(), "k").run(THREE_CHUNKS).await;

        let second_prompt = &model.calls()[1].1.user;
        let expected = format!("Context: {}...", "z".repeat(500));
        assert!(second_prompt.contains(&expected));
        assert!(!second_prompt.contains("dropped"));
    }

    #[tokio::test]
    async fn test_non_list_and_malformed_entries_skip_chunk() {
        let model = Arc::new(ScriptedModel::new(vec![
            Ok(r#"{"speaker":"Speaker 1","text":"object not list"}"#.to_string()),
            Ok(r#"[{"speaker":"Speaker 1","text":"ok"}, "stray string"]"#.to_string()),
            Ok("I cannot help with that.".to_string()),
        ]));
        let report = pipeline(model, "k").run(THREE_CHUNKS).await;

        assert!(report.output.is_empty());
        let reasons: Vec<SkipReason> = report.skipped().map(|(_, r)| r.clone()).collect();
        assert_eq!(reasons[0], SkipReason::NotASequence);
        assert_eq!(reasons[1], SkipReason::MalformedEntry { position: 1 });
        assert!(matches!(reasons[2], SkipReason::Parse(_)));
    }

    #[tokio::test]
    async fn test_missing_fields_get_defaults() {
        let model = Arc::new(ScriptedModel::new(vec![Ok(
            r#"[{"text":"no speaker"},{"speaker":"Speaker 2"},{"speaker":2,"text":"numeric"}]"#
                .to_string(),
        )]));
        let report = pipeline(model, "k").run("Some text").await;

        assert_eq!(
            report.output,
            vec![
                DialogueTurn::new(DEFAULT_SPEAKER, "no speaker"),
                DialogueTurn::new("Speaker 2", ""),
                DialogueTurn::new("2", "numeric"),
            ]
        );
    }

    #[tokio::test]
    async fn test_custom_extractor_limits_recovery() {
        use crate::extract::DirectParse;

        let fenced = "```json\n[{\"speaker\":\"Speaker 1\",\"text\":\"hi\"}]\n```";
        let model = Arc::new(ScriptedModel::new(vec![Ok(fenced.to_string())]));
        let report = pipeline(model, "k")
            .with_extractor(ResponseExtractor::empty().with_strategy(DirectParse))
            .run("Some text")
            .await;

        assert!(report.output.is_empty());
        assert!(matches!(report.outcomes[0], ChunkOutcome::Skipped { reason: SkipReason::Parse(_), .. }));
    }

    #[tokio::test]
    async fn test_empty_input_makes_no_calls() {
        let model = Arc::new(ScriptedModel::new(Vec::new()));
        let report = pipeline(model.clone(), "k").run(" \n\t ").await;
        assert!(report.output.is_empty());
        assert_eq!(report.chunk_count(), 0);
        assert!(model.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_chunks_are_throttled() {
        let model = Arc::new(ScriptedModel::new(vec![
            Ok("[]".to_string()),
            Ok("[]".to_string()),
            Ok("[]".to_string()),
        ]));
        let config = DialogueConfig {
            max_chunk_chars: 40,
            ..Default::default()
        };
        let pipeline = DialoguePipeline::new(model, CredentialPool::parse("a,b").unwrap())
            .with_config(config);

        let start = tokio::time::Instant::now();
        pipeline.run(THREE_CHUNKS).await;
        // Two pauses of 2s / 2 keys.
        assert!(start.elapsed() >= Duration::from_secs(2));
    }
}
