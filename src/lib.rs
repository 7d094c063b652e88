//! Lectern - study material to dialogues, audio, summaries and videos
//!
//! Takes arbitrary text (book pages, lecture notes) and produces learning
//! content from it with a chat model.
//!
//! # Overview
//!
//! Lectern allows you to:
//! - Turn long text into a two-speaker podcast dialogue, and render it as MP3
//! - Summarize pages with illustrative images
//! - Answer a reader's questions about what they are reading
//! - Extract the topics a text covers and recommend videos for them
//!
//! Long inputs are normalized, split into chunks and sent to the model one
//! chunk at a time, rotating across a pool of API keys with a pause between
//! calls. A chunk that fails is skipped; the job carries on.
//!
//! # Architecture
//!
//! - `text` - Normalization and chunking
//! - `extract` - Structured data recovery from model output
//! - `credentials` - API key pool and rotation
//! - `throttle` - Inter-call pacing
//! - `llm` - Language model abstraction
//! - `pipeline` - Chunked dialogue and topic pipelines
//! - `lecture` - Summaries and doubt clearing
//! - `speech` - Text-to-speech rendering
//! - `search` - Image and video lookups
//! - `server` - HTTP API
//!
//! # Example
//!
//! ```rust,no_run
//! use lectern::config::Settings;
//! use lectern::llm::OpenAiCompatModel;
//! use lectern::pipeline::DialoguePipeline;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let credentials = settings.llm.credential_pool()?;
//!     let model = Arc::new(OpenAiCompatModel::new(
//!         &settings.llm.api_base,
//!         &credentials,
//!         settings.llm.request_timeout(),
//!     )?);
//!
//!     let report = DialoguePipeline::new(model, credentials)
//!         .run("Photosynthesis turns light into chemical energy.")
//!         .await;
//!     println!("{} turns", report.output.len());
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod credentials;
pub mod error;
pub mod extract;
pub mod lecture;
pub mod llm;
pub mod openai;
pub mod pipeline;
pub mod search;
pub mod server;
pub mod speech;
pub mod text;
pub mod throttle;

pub use error::{LecternError, Result};
