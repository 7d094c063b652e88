//! Image and video lookups for generated content.
//!
//! Search failures are never fatal: a topic whose lookup fails simply
//! contributes no results.

use crate::config::SearchSettings;
use crate::error::{LecternError, Result};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

/// Lookups run concurrently per request, results keep topic order.
const MAX_CONCURRENT_LOOKUPS: usize = 4;

/// A recommended video for a topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRecommendation {
    pub topic: String,
    pub title: String,
    pub url: String,
    pub channel: Option<String>,
    pub thumbnail: Option<String>,
}

/// Video search provider.
#[async_trait]
pub trait VideoSearch: Send + Sync {
    async fn search(&self, topic: &str, limit: usize) -> Result<Vec<VideoRecommendation>>;
}

/// Image search provider, returning image URLs.
#[async_trait]
pub trait ImageSearch: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<String>>;
}

/// Look up videos for every topic, in topic order.
#[instrument(skip_all, fields(topics = topics.len()))]
pub async fn recommend_videos(
    search: &dyn VideoSearch,
    topics: &[String],
    per_topic: usize,
) -> Vec<VideoRecommendation> {
    let per_topic_results: Vec<Vec<VideoRecommendation>> = stream::iter(topics.iter().cloned())
        .map(|topic: String| async move {
            match search.search(&topic, per_topic).await {
                Ok(videos) => videos,
                Err(e) => {
                    warn!("Video search failed for {:?}: {}", topic, e);
                    Vec::new()
                }
            }
        })
        .buffered(MAX_CONCURRENT_LOOKUPS)
        .collect()
        .await;

    per_topic_results.into_iter().flatten().collect()
}

/// Look up images for every description, in order.
#[instrument(skip_all, fields(descriptions = descriptions.len()))]
pub async fn fetch_images(
    search: &dyn ImageSearch,
    descriptions: &[String],
    per_description: usize,
) -> Vec<String> {
    let mut images = Vec::new();
    for description in descriptions {
        let query = simplify_topic(description);
        if query.is_empty() {
            debug!("Nothing searchable in {:?}", description);
            continue;
        }
        match search.search(&query, per_description).await {
            Ok(found) => images.extend(found),
            Err(e) => warn!("Image search failed for {:?}: {}", query, e),
        }
    }
    images
}

/// Reduce an image description to a short keyword query: lowercase, words
/// longer than three characters, at most five of them.
pub fn simplify_topic(topic: &str) -> String {
    topic
        .to_lowercase()
        .split_whitespace()
        .filter(|w| w.chars().count() > 3)
        .take(5)
        .collect::<Vec<_>>()
        .join(" ")
}

fn http_client(settings: &SearchSettings) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.timeout_secs))
        .user_agent(settings.user_agent.clone())
        .build()?)
}

/// YouTube Data API v3 search.
pub struct YoutubeSearch {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct YoutubeResponse {
    #[serde(default)]
    items: Vec<YoutubeItem>,
}

#[derive(Debug, Deserialize)]
struct YoutubeItem {
    id: YoutubeId,
    #[serde(default)]
    snippet: Option<YoutubeSnippet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YoutubeId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YoutubeSnippet {
    #[serde(default)]
    title: String,
    channel_title: Option<String>,
    #[serde(default)]
    thumbnails: std::collections::HashMap<String, YoutubeThumbnail>,
}

#[derive(Debug, Deserialize)]
struct YoutubeThumbnail {
    url: String,
}

impl YoutubeSearch {
    pub const DEFAULT_ENDPOINT: &'static str = "https://www.googleapis.com/youtube/v3/search";

    pub fn new(settings: &SearchSettings) -> Result<Self> {
        Ok(Self {
            http: http_client(settings)?,
            endpoint: Self::DEFAULT_ENDPOINT.to_string(),
            api_key: settings.youtube_key(),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    fn to_recommendations(topic: &str, response: YoutubeResponse) -> Vec<VideoRecommendation> {
        response
            .items
            .into_iter()
            .filter_map(|item| {
                let video_id = item.id.video_id?;
                let snippet = item.snippet;
                let thumbnail = snippet
                    .as_ref()
                    .and_then(|s| {
                        ["high", "medium", "default"]
                            .iter()
                            .find_map(|size| s.thumbnails.get(*size))
                    })
                    .map(|t| t.url.clone())
                    .unwrap_or_else(|| format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", video_id));

                Some(VideoRecommendation {
                    topic: topic.to_string(),
                    title: snippet.as_ref().map(|s| s.title.clone()).unwrap_or_default(),
                    url: format!("https://www.youtube.com/watch?v={}", video_id),
                    channel: snippet.and_then(|s| s.channel_title),
                    thumbnail: Some(thumbnail),
                })
            })
            .collect()
    }
}

#[async_trait]
impl VideoSearch for YoutubeSearch {
    async fn search(&self, topic: &str, limit: usize) -> Result<Vec<VideoRecommendation>> {
        let Some(api_key) = &self.api_key else {
            debug!("No YouTube API key configured, skipping video search");
            return Ok(Vec::new());
        };

        let max_results = limit.to_string();
        let url = Url::parse_with_params(
            &self.endpoint,
            &[
                ("part", "snippet"),
                ("type", "video"),
                ("q", topic),
                ("maxResults", max_results.as_str()),
                ("key", api_key.as_str()),
            ],
        )
        .map_err(|e| LecternError::Search(e.to_string()))?;

        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(LecternError::Search(format!(
                "YouTube returned {}",
                response.status()
            )));
        }

        let body: YoutubeResponse = response.json().await?;
        Ok(Self::to_recommendations(topic, body))
    }
}

/// Wikimedia Commons file search.
pub struct WikimediaImageSearch {
    http: reqwest::Client,
    endpoint: String,
}

impl WikimediaImageSearch {
    pub fn new(settings: &SearchSettings) -> Result<Self> {
        Ok(Self {
            http: http_client(settings)?,
            endpoint: settings.wikimedia_api.clone(),
        })
    }

    /// Image URLs from a `generator=search&prop=imageinfo` response, in
    /// search rank order.
    fn image_urls(body: &serde_json::Value) -> Vec<String> {
        let Some(pages) = body
            .get("query")
            .and_then(|q| q.get("pages"))
            .and_then(|p| p.as_object())
        else {
            return Vec::new();
        };

        let mut ranked: Vec<(u64, String)> = pages
            .values()
            .filter_map(|page| {
                let url = page.get("imageinfo")?.get(0)?.get("url")?.as_str()?;
                let rank = page.get("index").and_then(|i| i.as_u64()).unwrap_or(u64::MAX);
                Some((rank, url.to_string()))
            })
            .collect();
        ranked.sort_by_key(|(rank, _)| *rank);
        ranked.into_iter().map(|(_, url)| url).collect()
    }
}

#[async_trait]
impl ImageSearch for WikimediaImageSearch {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<String>> {
        let gsrlimit = limit.to_string();
        let url = Url::parse_with_params(
            &self.endpoint,
            &[
                ("action", "query"),
                ("generator", "search"),
                ("gsrsearch", query),
                ("gsrnamespace", "6"),
                ("gsrlimit", gsrlimit.as_str()),
                ("prop", "imageinfo"),
                ("iiprop", "url"),
                ("format", "json"),
            ],
        )
        .map_err(|e| LecternError::Search(e.to_string()))?;

        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(LecternError::Search(format!(
                "Wikimedia returned {}",
                response.status()
            )));
        }

        let body: serde_json::Value = response.json().await?;
        Ok(Self::image_urls(&body))
    }
}
