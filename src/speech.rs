//! Dialogue-to-audio synthesis.

use crate::config::SpeechSettings;
use crate::error::{LecternError, Result};
use crate::pipeline::DialogueTurn;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, instrument};
use url::Url;

/// Text-to-speech provider.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` with `voice`, returning MP3 bytes.
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>>;
}

/// Speaker-label to voice assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceMap {
    pub primary: String,
    pub secondary: String,
}

const PRIMARY_MARKERS: [&str; 4] = ["1", "First", "Teacher", "Expert 1"];
const SECONDARY_MARKERS: [&str; 4] = ["2", "Second", "Student", "Expert 2"];

impl VoiceMap {
    pub fn new(primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            secondary: secondary.into(),
        }
    }

    pub fn from_settings(settings: &SpeechSettings) -> Self {
        Self::new(&settings.primary_voice, &settings.secondary_voice)
    }

    /// Voice for a speaker label. Unrecognized labels get the primary voice.
    pub fn voice_for(&self, speaker: &str) -> &str {
        if PRIMARY_MARKERS.iter().any(|m| speaker.contains(m)) {
            &self.primary
        } else if SECONDARY_MARKERS.iter().any(|m| speaker.contains(m)) {
            &self.secondary
        } else {
            &self.primary
        }
    }
}

/// Synthesize every turn in order and concatenate the MP3 segments.
///
/// Turns with blank text are skipped. Any synthesis failure aborts the whole
/// render, since audio with missing turns would not make sense.
#[instrument(skip_all, fields(turns = dialogue.len()))]
pub async fn render_dialogue(
    synthesizer: &dyn SpeechSynthesizer,
    voices: &VoiceMap,
    dialogue: &[DialogueTurn],
) -> Result<Vec<u8>> {
    let mut audio = Vec::new();
    let mut spoken = 0usize;

    for (i, turn) in dialogue.iter().enumerate() {
        if turn.text.trim().is_empty() {
            debug!("Turn {} has no text, skipping", i + 1);
            continue;
        }

        let voice = voices.voice_for(&turn.speaker);
        let bytes = synthesizer.synthesize(&turn.text, voice).await?;
        debug!("Turn {} ({} via {}): {} bytes", i + 1, turn.speaker, voice, bytes.len());
        audio.extend_from_slice(&bytes);
        spoken += 1;
    }

    if spoken == 0 {
        return Err(LecternError::Speech(
            "dialogue has no spoken turns to synthesize".to_string(),
        ));
    }

    info!("Synthesized {} turns into {} bytes of audio", spoken, audio.len());
    Ok(audio)
}

/// Speech over an OpenAI-compatible `/audio/speech` endpoint.
pub struct OpenAiSpeech {
    http: reqwest::Client,
    endpoint: Url,
    api_key: Option<String>,
    model: String,
}

impl OpenAiSpeech {
    pub fn new(api_base: &str, api_key: Option<String>, model: &str, timeout: Duration) -> Result<Self> {
        let base = Url::parse(&format!("{}/", api_base.trim_end_matches('/')))
            .map_err(|e| LecternError::Config(format!("Invalid speech api_base {}: {}", api_base, e)))?;
        let endpoint = base
            .join("audio/speech")
            .map_err(|e| LecternError::Config(e.to_string()))?;

        Ok(Self {
            http: reqwest::Client::builder().timeout(timeout).build()?,
            endpoint,
            api_key,
            model: model.to_string(),
        })
    }

    /// Build from settings, reading the key from the configured environment variable.
    pub fn from_settings(settings: &SpeechSettings, timeout: Duration) -> Result<Self> {
        let api_key = std::env::var(&settings.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty());
        Self::new(&settings.api_base, api_key, &settings.model, timeout)
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAiSpeech {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": text,
            "voice": voice,
            "response_format": "mp3",
        });

        let mut request = self.http.post(self.endpoint.clone()).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| LecternError::Speech(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(LecternError::Speech(format!(
                "provider returned {}: {}",
                status,
                crate::text::head_chars(&detail, 200)
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| LecternError::Speech(format!("failed to read audio: {}", e)))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Returns the voice name as the "audio" so output order is visible.
    #[derive(Default)]
    struct EchoVoice {
        calls: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl SpeechSynthesizer for EchoVoice {
        async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>> {
            self.calls
                .lock()
                .unwrap()
                .push((text.to_string(), voice.to_string()));
            Ok(format!("[{}]", voice).into_bytes())
        }
    }

    fn voices() -> VoiceMap {
        VoiceMap::new("onyx", "nova")
    }

    #[test]
    fn test_voice_assignment() {
        let v = voices();
        assert_eq!(v.voice_for("Speaker 1"), "onyx");
        assert_eq!(v.voice_for("Teacher"), "onyx");
        assert_eq!(v.voice_for("Speaker 2"), "nova");
        assert_eq!(v.voice_for("Student"), "nova");
        assert_eq!(v.voice_for("Second Expert"), "nova");
        assert_eq!(v.voice_for("Narrator"), "onyx");
    }

    #[tokio::test]
    async fn test_render_concatenates_in_order() {
        let synth = EchoVoice::default();
        let dialogue = vec![
            DialogueTurn::new("Speaker 1", "Hello"),
            DialogueTurn::new("Speaker 2", "   "),
            DialogueTurn::new("Speaker 2", "Hi there"),
        ];

        let audio = render_dialogue(&synth, &voices(), &dialogue).await.unwrap();
        assert_eq!(audio, b"[onyx][nova]".to_vec());

        let calls = synth.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1], ("Hi there".to_string(), "nova".to_string()));
    }

    #[tokio::test]
    async fn test_render_empty_dialogue_fails() {
        let synth = EchoVoice::default();
        let err = render_dialogue(&synth, &voices(), &[]).await.unwrap_err();
        assert!(matches!(err, LecternError::Speech(_)));
    }

    #[test]
    fn test_endpoint_join() {
        let speech = OpenAiSpeech::new("https://api.openai.com/v1/", None, "tts-1", Duration::from_secs(5)).unwrap();
        assert_eq!(speech.endpoint().as_str(), "https://api.openai.com/v1/audio/speech");

        assert!(matches!(
            OpenAiSpeech::new("not a url", None, "tts-1", Duration::from_secs(5)),
            Err(LecternError::Config(_))
        ));
    }
}
