use anyhow::Result;
use async_trait::async_trait;

pub mod client;
pub mod structs;

pub use client::YouTubeClient;
use structs::VideoItem;

/// `videos.list` accepts at most this many comma-separated IDs per request
pub const MAX_IDS_PER_VIDEOS_REQUEST: usize = 50;

/// The read-only slice of the YouTube Data API v3 used to build a snapshot
#[async_trait]
pub trait YouTubeApi {
    /// Looks up the ID of a channel's "uploads" playlist
    ///
    /// Returns `None` if the channel does not exist
    ///
    /// # Errors
    /// Errors on network / HTTP errors or when the channel has no uploads playlist in its response
    async fn uploads_playlist_id(&self, channel_id: &str) -> Result<Option<String>>;

    /// Lists the first `max_results` video IDs of a playlist, in the API's order
    ///
    /// # Errors
    /// Errors on network / HTTP errors or an undecodable response
    async fn playlist_video_ids(&self, playlist_id: &str, max_results: u32) -> Result<Vec<String>>;

    /// Fetches snippet and content details for up to [`MAX_IDS_PER_VIDEOS_REQUEST`] videos
    ///
    /// # Errors
    /// Errors on network / HTTP errors or an undecodable response
    async fn videos(&self, ids: &[String]) -> Result<Vec<VideoItem>>;
}
