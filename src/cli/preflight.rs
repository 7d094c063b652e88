//! Pre-flight checks before expensive operations.
//!
//! Validates that required credentials are configured before starting
//! operations that would otherwise fail on their first model call.

use crate::config::Settings;
use crate::error::Result;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// The HTTP API needs model credentials; speech and video keys are optional.
    Serve,
    /// Running a pipeline from the CLI needs model credentials.
    Generate,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Serve | Operation::Generate => {
            let pool = settings.llm.credential_pool()?;
            tracing::debug!("{} model credentials available", pool.len());
        }
    }
    Ok(())
}

/// Optional integrations that are not configured, as human-readable notes.
pub fn missing_optional(settings: &Settings) -> Vec<String> {
    let mut notes = Vec::new();

    if !env_is_set(&settings.speech.api_key_env) {
        notes.push(format!(
            "{} is not set; /generate-audio will fail unless the speech API needs no key.",
            settings.speech.api_key_env
        ));
    }

    if settings.search.youtube_key().is_none() {
        notes.push(
            "No YouTube API key (search.youtube_api_key or YOUTUBE_API_KEY); /extract_topics returns no videos."
                .to_string(),
        );
    }

    notes
}

fn env_is_set(name: &str) -> bool {
    matches!(std::env::var(name), Ok(v) if !v.trim().is_empty())
}

/// Hint printed alongside a failed check.
pub fn hint(settings: &Settings) -> String {
    format!(
        "Set it with: export {}='key1,key2'",
        settings.llm.credentials_env
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LecternError;

    #[test]
    fn test_missing_credentials_fail() {
        let mut settings = Settings::default();
        settings.llm.credentials_env = "LECTERN_PREFLIGHT_UNSET_VAR".to_string();
        let err = check(Operation::Generate, &settings).unwrap_err();
        assert!(matches!(err, LecternError::Config(msg) if msg.contains("LECTERN_PREFLIGHT_UNSET_VAR")));
        assert!(hint(&settings).contains("LECTERN_PREFLIGHT_UNSET_VAR"));
    }

    #[test]
    fn test_unset_speech_key_is_reported() {
        let mut settings = Settings::default();
        settings.speech.api_key_env = "LECTERN_PREFLIGHT_NO_SPEECH_KEY".to_string();
        let notes = missing_optional(&settings);
        assert!(notes.iter().any(|n| n.contains("LECTERN_PREFLIGHT_NO_SPEECH_KEY")));
    }
}
