use std::{fs::File, io::Write, path::Path};

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;

use crate::{duration::format_iso8601_duration, youtube::structs::VideoItem};

pub const WATCH_URL_PREFIX: &str = "https://www.youtube.com/watch?v=";
pub const UNKNOWN_CHANNEL: &str = "Unknown Channel";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub title: String,
    pub url: String,
    pub thumbnail_url: Option<String>,
    pub upload_date: String,
    pub channel_name: String,
    pub duration: String,
}

impl VideoRecord {
    /// Flattens an API video into the published shape
    ///
    /// `channel_name` falls back to [`UNKNOWN_CHANNEL`] when `None`
    #[must_use]
    pub fn from_item(item: VideoItem, channel_name: Option<&str>) -> Self {
        Self {
            url: format!("{WATCH_URL_PREFIX}{}", item.id),
            title: item.snippet.title,
            thumbnail_url: item.snippet.thumbnails.high.and_then(|t| t.url),
            upload_date: item.snippet.published_at,
            channel_name: channel_name.unwrap_or(UNKNOWN_CHANNEL).to_string(),
            duration: format_iso8601_duration(item.content_details.duration.as_deref()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub last_updated_utc: String,
    pub videos: Vec<VideoRecord>,
}

impl Snapshot {
    /// Sorts `videos` newest first and stamps them with `generated_at`
    #[must_use]
    pub fn new(mut videos: Vec<VideoRecord>, generated_at: DateTime<Utc>) -> Self {
        // RFC 3339 strings from the API sort chronologically as plain strings
        videos.sort_by(|a, b| b.upload_date.cmp(&a.upload_date));
        Self {
            last_updated_utc: generated_at.to_rfc3339_opts(SecondsFormat::Micros, false),
            videos,
        }
    }

    /// Overwrites `path` with the snapshot as 4-space indented JSON
    ///
    /// # Errors
    /// Errors when the parent directory cannot be created or the file cannot be written
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Creating output directory {}", parent.display()))?;
        }

        let mut buf = Vec::new();
        let mut ser =
            serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
        self.serialize(&mut ser).context("Serializing snapshot")?;

        let mut file = File::create(path)
            .with_context(|| format!("Opening output file {}", path.display()))?;
        file.write_all(&buf)
            .and_then(|()| file.sync_all())
            .with_context(|| format!("Writing output file {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::youtube::structs::{Thumbnail, Thumbnails, VideoContentDetails, VideoSnippet};
    use chrono::TimeZone;

    fn item(id: &str, published_at: &str, thumbnail: Option<&str>) -> VideoItem {
        VideoItem {
            id: id.to_string(),
            snippet: VideoSnippet {
                title: format!("Video {id}"),
                published_at: published_at.to_string(),
                thumbnails: Thumbnails {
                    high: thumbnail.map(|url| Thumbnail {
                        url: Some(url.to_string()),
                    }),
                },
            },
            content_details: VideoContentDetails {
                duration: Some("PT4M5S".to_string()),
            },
        }
    }

    fn record(upload_date: &str) -> VideoRecord {
        VideoRecord::from_item(item(upload_date, upload_date, None), Some("Channel"))
    }

    #[test]
    fn record_from_item() {
        let record = VideoRecord::from_item(
            item("abc", "2024-01-01T00:00:00Z", Some("https://i.ytimg.com/x.jpg")),
            Some("My Channel"),
        );
        assert_eq!(record.url, "https://www.youtube.com/watch?v=abc");
        assert_eq!(record.title, "Video abc");
        assert_eq!(record.thumbnail_url.as_deref(), Some("https://i.ytimg.com/x.jpg"));
        assert_eq!(record.upload_date, "2024-01-01T00:00:00Z");
        assert_eq!(record.channel_name, "My Channel");
        assert_eq!(record.duration, "04:05");
    }

    #[test]
    fn record_defaults() {
        let mut video = item("abc", "2024-01-01T00:00:00Z", None);
        video.content_details.duration = None;
        let record = VideoRecord::from_item(video, None);
        assert_eq!(record.thumbnail_url, None);
        assert_eq!(record.channel_name, UNKNOWN_CHANNEL);
        assert_eq!(record.duration, "N/A");
    }

    #[test]
    fn sorted_newest_first() {
        let snapshot = Snapshot::new(
            vec![
                record("2024-01-02T00:00:00Z"),
                record("2024-03-01T00:00:00Z"),
                record("2023-12-31T23:59:59Z"),
            ],
            Utc::now(),
        );
        let dates = snapshot
            .videos
            .iter()
            .map(|v| v.upload_date.as_str())
            .collect::<Vec<_>>();
        assert_eq!(
            dates,
            [
                "2024-03-01T00:00:00Z",
                "2024-01-02T00:00:00Z",
                "2023-12-31T23:59:59Z"
            ]
        );
        assert!(snapshot.videos.windows(2).all(|w| w[0].upload_date >= w[1].upload_date));
    }

    #[test]
    fn timestamp_is_rfc3339_utc() {
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        let snapshot = Snapshot::new(Vec::new(), at);
        assert_eq!(snapshot.last_updated_utc, "2025-01-01T12:00:00.000000+00:00");
        assert!(DateTime::parse_from_rfc3339(&snapshot.last_updated_utc).is_ok());
    }

    #[test]
    fn writes_indented_json_and_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docs").join("videos.json");
        let snapshot = Snapshot::new(vec![record("2024-01-01T00:00:00Z")], Utc::now());

        snapshot.write_to(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("{\n    \"last_updated_utc\""));
        assert!(content.contains("\n        {\n            \"title\""));
        assert!(content.contains("\"thumbnail_url\": null"));
        let parsed: Snapshot = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed, snapshot);
    }

    #[test]
    fn overwrites_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("videos.json");
        Snapshot::new(vec![record("2024-01-01T00:00:00Z"); 3], Utc::now())
            .write_to(&path)
            .unwrap();
        Snapshot::new(Vec::new(), Utc::now()).write_to(&path).unwrap();

        let parsed: Snapshot =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(parsed.videos.is_empty());
    }

    #[test]
    fn write_failure_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let snapshot = Snapshot::new(Vec::new(), Utc::now());
        assert!(snapshot.write_to(&blocker.join("videos.json")).is_err());
    }
}
