use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, warn};

use crate::youtube::client::YOUTUBE_API_BASE_URL;

pub const DEFAULT_CHANNELS_FILE: &str = "data/channels.json";
pub const DEFAULT_OUTPUT_FILE: &str = "docs/videos.json";
pub const DEFAULT_MAX_VIDEOS_PER_CHANNEL: u32 = 5;
pub const API_KEY_ENV: &str = "YOUTUBE_API_KEY";

/// `playlistItems.list` rejects any `maxResults` outside of this range
const MAX_RESULTS_RANGE: std::ops::RangeInclusive<u32> = 1..=50;

/// Collects the latest uploads of configured YouTube channels into a JSON snapshot
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// JSON file listing the channels to fetch
    #[arg(long, default_value = DEFAULT_CHANNELS_FILE)]
    pub channels_file: PathBuf,

    /// Where the snapshot is written (overwritten every run)
    #[arg(long, default_value = DEFAULT_OUTPUT_FILE)]
    pub output_file: PathBuf,

    /// How many recent uploads to take from each channel
    #[arg(long = "max-videos", default_value_t = DEFAULT_MAX_VIDEOS_PER_CHANNEL)]
    pub max_videos_per_channel: u32,

    /// Root of the YouTube Data API, eg. to go through a caching proxy
    #[arg(long, default_value = YOUTUBE_API_BASE_URL)]
    pub api_base_url: String,
}

/// Everything a refresh run needs, resolved up-front
#[derive(Debug, Clone)]
pub struct Settings {
    pub channels_file: PathBuf,
    pub output_file: PathBuf,
    pub max_videos_per_channel: u32,
    pub api_base_url: String,
    pub api_key: Option<String>,
}

#[cfg(test)]
impl Default for Settings {
    fn default() -> Self {
        Self {
            channels_file: PathBuf::from(DEFAULT_CHANNELS_FILE),
            output_file: PathBuf::from(DEFAULT_OUTPUT_FILE),
            max_videos_per_channel: DEFAULT_MAX_VIDEOS_PER_CHANNEL,
            api_base_url: YOUTUBE_API_BASE_URL.to_string(),
            api_key: None,
        }
    }
}

impl Settings {
    /// Merges CLI arguments with the API key found in the environment
    #[must_use]
    pub fn from_args(args: Args) -> Self {
        let clamped = args
            .max_videos_per_channel
            .clamp(*MAX_RESULTS_RANGE.start(), *MAX_RESULTS_RANGE.end());
        if clamped != args.max_videos_per_channel {
            warn!(
                "--max-videos {} is outside of {:?}, using {clamped}",
                args.max_videos_per_channel, MAX_RESULTS_RANGE
            );
        }

        Self {
            channels_file: args.channels_file,
            output_file: args.output_file,
            max_videos_per_channel: clamped,
            api_base_url: args.api_base_url,
            api_key: std::env::var(API_KEY_ENV).ok(),
        }
    }
}

/// A channel as written in the channels file. Both fields are needed to process it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ChannelEntry {
    pub channel_id: Option<String>,
    pub name: Option<String>,
}

/// A channel that can actually be queried
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub channel_id: String,
    pub name: String,
}

impl ChannelEntry {
    /// Returns `None` when the ID or name is missing or empty
    #[must_use]
    pub fn validate(&self) -> Option<Channel> {
        let channel_id = self.channel_id.as_deref().filter(|s| !s.is_empty())?;
        let name = self.name.as_deref().filter(|s| !s.is_empty())?;
        Some(Channel {
            channel_id: channel_id.to_string(),
            name: name.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ChannelsFile {
    #[serde(default)]
    channels: Vec<Value>,
}

/// Decodes one entry of the `channels` array. Anything that is not an object of
/// optional strings becomes an empty entry, which `validate` then rejects.
fn decode_channel_entry(raw: Value) -> ChannelEntry {
    serde_json::from_value::<ChannelEntry>(raw.clone()).unwrap_or_else(|e| {
        warn!("Unreadable channel entry {raw}: {e}");
        ChannelEntry::default()
    })
}

/// Reads the channels file
///
/// # Errors
/// Errors when the file cannot be read or is not a valid channels document
pub fn read_channels_file(path: &Path) -> Result<Vec<ChannelEntry>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Reading channels file {}", path.display()))?;
    let parsed: ChannelsFile = serde_json::from_str(&content)
        .with_context(|| format!("Decoding JSON from {}", path.display()))?;
    Ok(parsed.channels.into_iter().map(decode_channel_entry).collect())
}

/// Loads channel entries, treating a missing or malformed file as an empty list
#[must_use]
pub fn load_channels(path: &Path) -> Vec<ChannelEntry> {
    match read_channels_file(path) {
        Ok(channels) => channels,
        Err(e) if path.exists() => {
            error!("Unable to load channels: {e:#}");
            Vec::new()
        }
        Err(_) => {
            error!("Channels file not found at: {}", path.display());
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn make_channels_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{contents}").unwrap();
        file
    }

    #[test]
    fn loads_channels_in_order() {
        let file = make_channels_file(
            r#"{"channels": [
                {"channel_id": "UC1", "name": "First"},
                {"channel_id": "UC2", "name": "Second"}
            ]}"#,
        );
        let channels = load_channels(file.path());
        assert_eq!(channels.len(), 2);
        assert_eq!(channels[0].channel_id.as_deref(), Some("UC1"));
        assert_eq!(channels[1].name.as_deref(), Some("Second"));
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_channels(&dir.path().join("nope.json")).is_empty());
    }

    #[test]
    fn malformed_json_is_empty() {
        let file = make_channels_file("{ channels: [");
        assert!(load_channels(file.path()).is_empty());
    }

    #[test]
    fn missing_channels_key_is_empty() {
        let file = make_channels_file(r#"{"something_else": 1}"#);
        assert!(load_channels(file.path()).is_empty());
    }

    #[test]
    fn entries_with_missing_fields_still_load() {
        let file = make_channels_file(
            r#"{"channels": [{"channel_id": "UC1"}, {"name": "Nameless"}, {"channel_id": null, "name": "Null"}]}"#,
        );
        let channels = load_channels(file.path());
        assert_eq!(channels.len(), 3);
        assert!(channels.iter().all(|c| c.validate().is_none()));
    }

    #[test]
    fn bad_entry_does_not_drop_the_others() {
        let file = make_channels_file(
            r#"{"channels": [
                {"channel_id": "UCgood", "name": "Good"},
                {"channel_id": 123, "name": "Typed"},
                "junk",
                {"channel_id": "UClast", "name": "Last"}
            ]}"#,
        );
        let channels = load_channels(file.path());
        assert_eq!(channels.len(), 4);

        let valid = channels
            .iter()
            .filter_map(ChannelEntry::validate)
            .map(|c| c.channel_id)
            .collect::<Vec<_>>();
        assert_eq!(valid, ["UCgood", "UClast"]);
    }

    #[test]
    fn channels_not_an_array_is_empty() {
        let file = make_channels_file(r#"{"channels": "UC1"}"#);
        assert!(load_channels(file.path()).is_empty());
    }

    #[test]
    fn validate_rejects_empty_strings() {
        let entry = ChannelEntry {
            channel_id: Some(String::new()),
            name: Some("Name".to_string()),
        };
        assert_eq!(entry.validate(), None);

        let entry = ChannelEntry {
            channel_id: Some("UC1".to_string()),
            name: Some("Name".to_string()),
        };
        assert_eq!(
            entry.validate(),
            Some(Channel {
                channel_id: "UC1".to_string(),
                name: "Name".to_string(),
            })
        );
    }

    #[test]
    fn max_videos_is_clamped() {
        let args = Args::parse_from(["uploads-snapshot", "--max-videos", "500"]);
        assert_eq!(Settings::from_args(args).max_videos_per_channel, 50);

        let args = Args::parse_from(["uploads-snapshot", "--max-videos", "0"]);
        assert_eq!(Settings::from_args(args).max_videos_per_channel, 1);
    }

    #[test]
    fn defaults_match_fixed_paths() {
        let settings = Settings::from_args(Args::parse_from(["uploads-snapshot"]));
        assert_eq!(settings.channels_file, PathBuf::from("data/channels.json"));
        assert_eq!(settings.output_file, PathBuf::from("docs/videos.json"));
        assert_eq!(settings.max_videos_per_channel, 5);
        assert_eq!(settings.api_base_url, "https://www.googleapis.com/youtube/v3");
    }
}
