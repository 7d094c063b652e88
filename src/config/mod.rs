//! Configuration module for Lectern.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{DialoguePrompts, LecturePrompts, Prompts, TopicPrompts};
pub use settings::{
    GeneralSettings, LlmSettings, PipelineSettings, PromptSettings, SearchSettings,
    ServerSettings, Settings, SpeechSettings,
};
