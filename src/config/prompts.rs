//! Prompt templates for Lectern.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(\w+)\}\}").expect("Invalid regex"));

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub dialogue: DialoguePrompts,
    pub topics: TopicPrompts,
    /// Prompts for the single-shot lecture endpoints.
    pub lecture: LecturePrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for dialogue generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DialoguePrompts {
    pub system: String,
    /// Rendered with `{{step}}` (part and context preamble) and `{{chunk}}`.
    pub user: String,
}

impl Default for DialoguePrompts {
    fn default() -> Self {
        Self {
            system: r#"You are an expert dialogue writer. Your job is to take the provided text and transform it into an engaging, natural-sounding conversation between two professionals discussing the topic (e.g., colleagues, experts, or industry peers).

Rules:
1. Speaker 1 and Speaker 2 are both knowledgeable but may have different perspectives or focus areas.
2. The tone should be professional yet conversational, suitable for a workplace or industry podcast.
3. Avoid "teaching" or "interviewing" styles. Instead, have them collaborate, debate, or analyze the content together.
4. Cover ALL the key points from the source text; do not invent facts.
5. Aim for 6-12 dialogue turns (depending on the length of the input).
6. Return ONLY a JSON array, no markdown fences, no extra text.

Output format (strict JSON):
[
  {"speaker": "Speaker 1", "text": "..."},
  {"speaker": "Speaker 2", "text": "..."}
]"#
            .to_string(),

            user: "{{step}}Convert the following text into a podcast dialogue:\n\n---\n{{chunk}}\n---"
                .to_string(),
        }
    }
}

/// Prompts for topic extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicPrompts {
    /// Rendered with `{{chunk}}`.
    pub user: String,
}

impl Default for TopicPrompts {
    fn default() -> Self {
        Self {
            user: r#"Extract the most important academic topics from the text below.

Rules:
- Return only short topic names
- No explanation
- Avoid duplicates
- Max 3 topics per chunk

STRICT JSON:

{ "topics": ["topic1", "topic2"] }

Text:
{{chunk}}"#
                .to_string(),
        }
    }
}

/// Prompts for lecture summaries and doubt clearing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LecturePrompts {
    /// Rendered with `{{text}}`.
    pub summary: String,
    /// Rendered with `{{context}}` and `{{query}}`.
    pub doubt: String,
}

impl Default for LecturePrompts {
    fn default() -> Self {
        Self {
            summary: r#"This text is from a textbook.

Your task:
- Create a concise summary
- Explain clearly in an interesting way
- Include real-world examples inside the explanation
- Combine everything into ONE explanation string

Additionally:
If an image would help understanding,
set image_needed="yes" and describe useful images.
Otherwise set image_needed="no" and keep image_of empty.

STRICT JSON FORMAT ONLY:

{
  "resp": "full explanation + summary + examples combined",
  "image_needed": "yes" | "no",
  "image_of": ["description if image needed"]
}

Text:
{{text}}"#
                .to_string(),

            doubt: r#"You are a patient tutor helping a student who is reading the material below.

Material the student is reading:
{{context}}

Student's question:
{{query}}

Answer the question clearly and simply, grounded in the material where possible.
If the material does not cover it, answer from general knowledge and say so.

STRICT JSON FORMAT ONLY:

{ "doubt_clear": "your answer" }"#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let dialogue_path = custom_path.join("dialogue.toml");
            if dialogue_path.exists() {
                let content = std::fs::read_to_string(&dialogue_path)?;
                prompts.dialogue = toml::from_str(&content)?;
            }

            let topics_path = custom_path.join("topics.toml");
            if topics_path.exists() {
                let content = std::fs::read_to_string(&topics_path)?;
                prompts.topics = toml::from_str(&content)?;
            }

            let lecture_path = custom_path.join("lecture.toml");
            if lecture_path.exists() {
                let content = std::fs::read_to_string(&lecture_path)?;
                prompts.lecture = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    ///
    /// Placeholders are resolved in a single pass over the template, so
    /// `{{name}}` sequences inside substituted values are left as they are.
    /// Unknown placeholders are kept verbatim.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        PLACEHOLDER
            .replace_all(template, |caps: &Captures| match vars.get(&caps[1]) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}
