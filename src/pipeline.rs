use std::collections::HashMap;

use anyhow::Result;
use chrono::Utc;
use tracing::{error, info, instrument, warn};

use crate::{
    config::{ChannelEntry, Settings, load_channels},
    snapshot::{Snapshot, VideoRecord},
    youtube::{MAX_IDS_PER_VIDEOS_REQUEST, YouTubeApi, structs::VideoItem},
};

/// What a refresh run ended up doing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The channels file had no entries; nothing was fetched or written
    NoChannels,
    /// A snapshot with this many videos was written
    Written { videos: usize },
}

/// Video IDs in first-seen order, each mapped to the last channel that listed it
#[derive(Debug, Default)]
pub struct VideoOwners {
    order: Vec<String>,
    owners: HashMap<String, String>,
}

impl VideoOwners {
    pub fn insert(&mut self, video_id: String, channel_name: &str) {
        if !self.owners.contains_key(&video_id) {
            self.order.push(video_id.clone());
        }
        self.owners.insert(video_id, channel_name.to_string());
    }

    #[must_use]
    pub fn ids(&self) -> &[String] {
        &self.order
    }

    #[must_use]
    pub fn channel_of(&self, video_id: &str) -> Option<&str> {
        self.owners.get(video_id).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Loads the channels, fetches their latest uploads and writes the snapshot
///
/// # Errors
/// Only errors when the snapshot cannot be written. Every API failure is logged and skipped.
pub async fn refresh(api: &impl YouTubeApi, settings: &Settings) -> Result<RefreshOutcome> {
    let channels = load_channels(&settings.channels_file);
    if channels.is_empty() {
        warn!(
            "No channels found in {}. Exiting.",
            settings.channels_file.display()
        );
        return Ok(RefreshOutcome::NoChannels);
    }

    let snapshot = build_snapshot(api, &channels, settings.max_videos_per_channel).await;
    let videos = snapshot.videos.len();
    snapshot.write_to(&settings.output_file)?;
    info!(
        "Successfully saved data for {videos} videos to {}",
        settings.output_file.display()
    );

    Ok(RefreshOutcome::Written { videos })
}

/// Runs every API step for `channels` and assembles the sorted snapshot
pub async fn build_snapshot(
    api: &impl YouTubeApi,
    channels: &[ChannelEntry],
    max_videos_per_channel: u32,
) -> Snapshot {
    let owners = collect_video_owners(api, channels, max_videos_per_channel).await;

    let videos = if owners.is_empty() {
        info!("No videos found across all channels. Writing empty list.");
        Vec::new()
    } else {
        info!("Found {} video IDs to fetch details for.", owners.len());
        fetch_video_details(api, owners.ids())
            .await
            .into_iter()
            .map(|item| {
                let channel = owners.channel_of(&item.id);
                VideoRecord::from_item(item, channel)
            })
            .collect()
    };

    Snapshot::new(videos, Utc::now())
}

/// Resolves each channel's uploads and maps every listed video to its channel
pub async fn collect_video_owners(
    api: &impl YouTubeApi,
    channels: &[ChannelEntry],
    max_videos_per_channel: u32,
) -> VideoOwners {
    let mut owners = VideoOwners::default();

    for entry in channels {
        info!(
            "Processing channel: {}",
            entry.name.as_deref().unwrap_or("<unnamed>")
        );
        let Some(channel) = entry.validate() else {
            warn!("Skipping channel due to missing 'channel_id' or 'name': {entry:?}");
            continue;
        };

        let Some(playlist_id) = resolve_uploads_playlist(api, &channel.channel_id).await else {
            warn!(
                "Could not find uploads playlist for {}. Skipping.",
                channel.name
            );
            continue;
        };

        for video_id in list_latest_videos(api, &playlist_id, max_videos_per_channel).await {
            owners.insert(video_id, &channel.name);
        }
    }

    owners
}

/// `None` when the channel is unknown or the lookup failed
pub async fn resolve_uploads_playlist(api: &impl YouTubeApi, channel_id: &str) -> Option<String> {
    match api.uploads_playlist_id(channel_id).await {
        Ok(Some(playlist_id)) => Some(playlist_id),
        Ok(None) => {
            warn!("Channel not found for ID: {channel_id}");
            None
        }
        Err(e) => {
            error!("Error getting uploads playlist for channel {channel_id}: {e:#}");
            None
        }
    }
}

/// Empty when the listing failed
pub async fn list_latest_videos(
    api: &impl YouTubeApi,
    playlist_id: &str,
    max_results: u32,
) -> Vec<String> {
    match api.playlist_video_ids(playlist_id, max_results).await {
        Ok(ids) => ids,
        Err(e) => {
            error!("Error getting videos from playlist {playlist_id}: {e:#}");
            Vec::new()
        }
    }
}

/// Fetches details in batches of [`MAX_IDS_PER_VIDEOS_REQUEST`], dropping failed batches
#[instrument(skip_all, fields(ids = video_ids.len()))]
pub async fn fetch_video_details(api: &impl YouTubeApi, video_ids: &[String]) -> Vec<VideoItem> {
    let mut details = Vec::with_capacity(video_ids.len());
    let batches = video_ids.len().div_ceil(MAX_IDS_PER_VIDEOS_REQUEST);

    for (idx, batch) in video_ids.chunks(MAX_IDS_PER_VIDEOS_REQUEST).enumerate() {
        match api.videos(batch).await {
            Ok(items) => details.extend(items),
            Err(e) => error!(
                "Error getting video details for batch {}/{batches} ({} IDs starting at {}): {e:#}",
                idx + 1,
                batch.len(),
                batch[0]
            ),
        }
    }

    details
}
