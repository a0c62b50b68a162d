use anyhow::{Context, Result, bail, ensure};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::{
    MAX_IDS_PER_VIDEOS_REQUEST, YouTubeApi,
    structs::{ApiErrorResponse, ChannelResource, ListResponse, PlaylistItem, VideoItem},
};

pub const YOUTUBE_API_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

/// API-key authenticated client for the YouTube Data API v3
#[derive(Clone)]
pub struct YouTubeClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for YouTubeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YouTubeClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl YouTubeClient {
    /// # Errors
    /// Errors when the API key is missing or blank
    pub fn new(client: Client, api_key: Option<&str>) -> Result<Self> {
        let Some(api_key) = api_key.map(str::trim).filter(|k| !k.is_empty()) else {
            bail!("YOUTUBE_API_KEY environment variable not set.");
        };

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: YOUTUBE_API_BASE_URL.to_string(),
        })
    }

    /// Points the client at another API root, eg. a caching proxy
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn get<T: DeserializeOwned>(&self, resource: &str, query: &[(&str, &str)]) -> Result<T> {
        let res = self
            .client
            .get(format!("{}/{resource}", self.base_url))
            .query(query)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .with_context(|| format!("Sending {resource}.list request"))?;

        let res = error_for_status(resource, res).await?;
        res.json::<T>()
            .await
            .with_context(|| format!("Parsing {resource}.list response"))
    }
}

/// Turns a non-2xx response into an error carrying Google's error message
async fn error_for_status(resource: &str, res: Response) -> Result<Response> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }

    let body = res.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorResponse>(&body)
        .ok()
        .and_then(|e| e.error.message)
        .unwrap_or(body);
    bail!("{resource}.list failed with status {status}: {message}");
}

#[async_trait]
impl YouTubeApi for YouTubeClient {
    #[instrument(skip(self))]
    async fn uploads_playlist_id(&self, channel_id: &str) -> Result<Option<String>> {
        let res: ListResponse<ChannelResource> = self
            .get("channels", &[("part", "contentDetails"), ("id", channel_id)])
            .await?;
        extract_uploads_playlist_id(res)
    }

    #[instrument(skip(self))]
    async fn playlist_video_ids(&self, playlist_id: &str, max_results: u32) -> Result<Vec<String>> {
        let max_results = max_results.to_string();
        let res: ListResponse<PlaylistItem> = self
            .get(
                "playlistItems",
                &[
                    ("part", "contentDetails"),
                    ("playlistId", playlist_id),
                    ("maxResults", max_results.as_str()),
                ],
            )
            .await?;
        Ok(extract_video_ids(res))
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn videos(&self, ids: &[String]) -> Result<Vec<VideoItem>> {
        ensure!(
            ids.len() <= MAX_IDS_PER_VIDEOS_REQUEST,
            "videos.list accepts at most {MAX_IDS_PER_VIDEOS_REQUEST} IDs, got {}",
            ids.len()
        );
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let joined = ids.join(",");
        let res: ListResponse<Value> = self
            .get("videos", &[("part", "snippet,contentDetails"), ("id", joined.as_str())])
            .await?;
        Ok(extract_video_items(res))
    }
}

fn extract_uploads_playlist_id(res: ListResponse<ChannelResource>) -> Result<Option<String>> {
    let Some(channel) = res.items.into_iter().next() else {
        return Ok(None);
    };

    channel
        .content_details
        .and_then(|c| c.related_playlists)
        .and_then(|p| p.uploads)
        .map(Some)
        .context("Channel response is missing contentDetails.relatedPlaylists.uploads")
}

fn extract_video_ids(res: ListResponse<PlaylistItem>) -> Vec<String> {
    res.items
        .into_iter()
        .filter_map(|item| {
            let id = item.content_details.and_then(|c| c.video_id);
            if id.is_none() {
                debug!("Skipping playlist item without contentDetails.videoId");
            }
            id
        })
        .collect()
}

/// Decodes items one by one so a single odd video does not sink the whole batch
fn extract_video_items(res: ListResponse<Value>) -> Vec<VideoItem> {
    res.items
        .into_iter()
        .filter_map(|item| {
            let id = item["id"].as_str().unwrap_or("<unknown>").to_string();
            serde_json::from_value::<VideoItem>(item)
                .inspect_err(|e| warn!("Skipping malformed video {id}: {e}"))
                .ok()
        })
        .collect()
}
