//! Topics command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::{Prompts, Settings};
use crate::llm::OpenAiCompatModel;
use crate::pipeline::{TopicConfig, TopicPipeline};
use anyhow::{Context, Result};
use std::sync::Arc;

/// Run the topic pipeline over a text file and list the result.
pub async fn run_topics(input: &str, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Generate, &settings) {
        Output::error(&format!("{}", e));
        Output::info(&preflight::hint(&settings));
        return Err(e.into());
    }

    let path = Settings::expand_path(input);
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let credentials = settings.llm.credential_pool()?;
    let model = Arc::new(OpenAiCompatModel::new(
        &settings.llm.api_base,
        &credentials,
        settings.llm.request_timeout(),
    )?);
    let prompts = Prompts::load(
        settings.prompts.custom_dir.as_deref(),
        Some(&settings.prompts.variables),
    )?;

    let pipeline = TopicPipeline::new(model, credentials)
        .with_prompts(prompts)
        .with_config(TopicConfig::from_settings(&settings));

    let spinner = Output::spinner("Extracting topics...");
    let report = pipeline.run(&text).await;
    spinner.finish_and_clear();

    for (index, reason) in report.skipped() {
        Output::warning(&format!("Chunk {} skipped: {}", index + 1, reason));
    }

    if report.output.is_empty() {
        Output::info("No topics found.");
        return Ok(());
    }

    Output::header(&format!("Topics ({})", report.output.len()));
    for topic in &report.output {
        Output::list_item(topic);
    }

    Ok(())
}
