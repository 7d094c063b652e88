//! Dialogue command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::{Prompts, Settings};
use crate::llm::OpenAiCompatModel;
use crate::pipeline::{DialogueConfig, DialoguePipeline};
use anyhow::{Context, Result};
use std::sync::Arc;

/// Run the dialogue pipeline over a text file.
pub async fn run_dialogue(input: &str, output: Option<String>, settings: Settings) -> Result<()> {
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

    let pipeline = DialoguePipeline::new(model, credentials)
        .with_prompts(prompts)
        .with_config(DialogueConfig::from_settings(&settings));

    let spinner = Output::spinner("Generating dialogue...");
    let report = pipeline.run(&text).await;
    spinner.finish_and_clear();

    for (index, reason) in report.skipped() {
        Output::warning(&format!("Chunk {} skipped: {}", index + 1, reason));
    }

    let json = serde_json::to_string_pretty(&report.output)?;
    match output {
        Some(out) => {
            let out_path = Settings::expand_path(&out);
            std::fs::write(&out_path, json)?;
            Output::success(&format!(
                "Wrote {} turns ({}/{} chunks) to {}",
                report.output.len(),
                report.completed(),
                report.chunk_count(),
                out_path.display()
            ));
        }
        None => println!("{}", json),
    }

    Ok(())
}
