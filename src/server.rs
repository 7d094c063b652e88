//! HTTP API.
//!
//! Every endpoint is a thin adapter: validate the body, call one service,
//! map the result. Handlers never retry; per-chunk failures are already
//! absorbed by the pipelines.

use crate::config::{Prompts, Settings};
use crate::error::LecternError;
use crate::lecture::{LectureConfig, LectureService};
use crate::llm::OpenAiCompatModel;
use crate::pipeline::{DialogueConfig, DialoguePipeline, DialogueTurn, TopicConfig, TopicPipeline};
use crate::search::{
    recommend_videos, VideoRecommendation, VideoSearch, WikimediaImageSearch, YoutubeSearch,
};
use crate::speech::{render_dialogue, OpenAiSpeech, SpeechSynthesizer, VoiceMap};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

/// Shared application state.
pub struct AppState {
    pub dialogue: DialoguePipeline,
    pub topics: TopicPipeline,
    pub lecture: LectureService,
    pub speech: Arc<dyn SpeechSynthesizer>,
    pub voices: VoiceMap,
    pub videos: Arc<dyn VideoSearch>,
    pub videos_per_topic: usize,
}

impl AppState {
    /// Wire every service from settings. Fails when no model credentials are configured.
    pub fn from_settings(settings: &Settings) -> crate::Result<Self> {
        let credentials = settings.llm.credential_pool()?;
        let timeout = settings.llm.request_timeout();
        let model = Arc::new(OpenAiCompatModel::new(
            &settings.llm.api_base,
            &credentials,
            timeout,
        )?);

        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let videos = YoutubeSearch::new(&settings.search)?;
        if !videos.is_enabled() {
            warn!("No YouTube API key configured; /extract_topics will return no videos");
        }

        Ok(Self {
            dialogue: DialoguePipeline::new(model.clone(), credentials.clone())
                .with_prompts(prompts.clone())
                .with_config(DialogueConfig::from_settings(settings)),
            topics: TopicPipeline::new(model.clone(), credentials.clone())
                .with_prompts(prompts.clone())
                .with_config(TopicConfig::from_settings(settings)),
            lecture: LectureService::new(
                model,
                credentials,
                Arc::new(WikimediaImageSearch::new(&settings.search)?),
            )
            .with_prompts(prompts)
            .with_config(LectureConfig::from_settings(settings)),
            speech: Arc::new(OpenAiSpeech::from_settings(&settings.speech, timeout)?),
            voices: VoiceMap::from_settings(&settings.speech),
            videos: Arc::new(videos),
            videos_per_topic: settings.search.videos_per_topic,
        })
    }
}

/// Build the API router with permissive CORS.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(health))
        .route("/generate-dialogue", post(generate_dialogue))
        .route("/generate-audio", post(generate_audio))
        .route("/summarize_pages", post(summarize_pages))
        .route("/doubt_clear", post(doubt_clear))
        .route("/extract_topics", post(extract_topics))
        .layer(cors)
        .with_state(state)
}

// === Errors ===

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    status: &'static str,
}

/// A [`LecternError`] on its way out as an HTTP response.
pub struct ApiError(LecternError);

impl From<LecternError> for ApiError {
    fn from(err: LecternError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match &self.0 {
            LecternError::Validation(_) => StatusCode::BAD_REQUEST,
            e if e.is_upstream() => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status == StatusCode::BAD_REQUEST {
            warn!("Rejected request: {}", self.0);
        } else {
            error!("Request failed: {}", self.0);
        }

        let body = ErrorResponse {
            error: self.0.to_string(),
            status: "error",
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

fn require_text(field: &str, value: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(LecternError::Validation(format!("{} must not be empty", field)).into());
    }
    Ok(())
}

// === Request/Response Types ===

#[derive(Deserialize, Default)]
#[serde(default)]
struct TextRequest {
    text: String,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct DoubtRequest {
    query: String,
    context: String,
}

#[derive(Serialize)]
struct DialogueResponse {
    dialogue: Vec<DialogueTurn>,
}

#[derive(Serialize)]
struct SummaryResponse {
    resp: String,
    images: Vec<String>,
}

#[derive(Serialize)]
struct DoubtResponse {
    resp: String,
    status: u16,
}

#[derive(Serialize)]
struct TopicsResponse {
    topics: Vec<String>,
    videos: Vec<VideoRecommendation>,
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn generate_dialogue(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TextRequest>,
) -> ApiResult<Json<DialogueResponse>> {
    require_text("text", &req.text)?;

    let report = state.dialogue.run(&req.text).await;
    info!(
        "Dialogue: {} turns from {}/{} chunks",
        report.output.len(),
        report.completed(),
        report.chunk_count()
    );

    Ok(Json(DialogueResponse {
        dialogue: report.output,
    }))
}

async fn generate_audio(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TextRequest>,
) -> ApiResult<Response> {
    require_text("text", &req.text)?;

    let report = state.dialogue.run(&req.text).await;
    let audio = render_dialogue(state.speech.as_ref(), &state.voices, &report.output).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "audio/mpeg"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"dialogue.mp3\"",
            ),
        ],
        audio,
    )
        .into_response())
}

async fn summarize_pages(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TextRequest>,
) -> ApiResult<Json<SummaryResponse>> {
    require_text("text", &req.text)?;

    let summary = state.lecture.summarize(&req.text).await?;
    Ok(Json(SummaryResponse {
        resp: summary.resp,
        images: summary.images,
    }))
}

async fn doubt_clear(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DoubtRequest>,
) -> ApiResult<Json<DoubtResponse>> {
    require_text("query", &req.query)?;

    let resp = state.lecture.clear_doubt(&req.query, &req.context).await?;
    Ok(Json(DoubtResponse {
        resp,
        status: StatusCode::OK.as_u16(),
    }))
}

async fn extract_topics(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TextRequest>,
) -> ApiResult<Json<TopicsResponse>> {
    require_text("text", &req.text)?;

    let report = state.topics.run(&req.text).await;
    let videos = recommend_videos(
        state.videos.as_ref(),
        &report.output,
        state.videos_per_topic,
    )
    .await;

    info!(
        "Topics: {} topics, {} videos",
        report.output.len(),
        videos.len()
    );

    Ok(Json(TopicsResponse {
        topics: report.output,
        videos,
    }))
}
