//! Catalog record mapping
//!
//! The HTTP catalog client lives outside the core. These are the response
//! shapes it hands over and the pure conversions into [`Track`].
//!
//! Two shapes exist: search results (string durations, artists as one
//! string, media entries keyed by `link`) and single-song lookups (numeric
//! durations, structured artists, media entries keyed by `url`).

use crate::types::{AlbumRef, Track};
use serde::{Deserialize, Serialize};

/// Image qualities in order of preference
const IMAGE_QUALITIES: [&str; 3] = ["500x500", "150x150", "50x50"];

/// Stream bitrates in order of preference
const STREAM_QUALITIES: [&str; 5] = ["320kbps", "160kbps", "96kbps", "48kbps", "12kbps"];

/// Media entry (artwork or stream) at one quality
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiMedia {
    /// Quality label, e.g. `500x500` or `320kbps`
    pub quality: String,
    /// URL in search responses
    #[serde(default)]
    pub link: Option<String>,
    /// URL in lookup responses
    #[serde(default)]
    pub url: Option<String>,
}

impl ApiMedia {
    fn href(&self) -> &str {
        self.link
            .as_deref()
            .or(self.url.as_deref())
            .unwrap_or_default()
    }
}

/// Album as embedded in song records
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiAlbum {
    /// Album ID
    #[serde(default)]
    pub id: Option<String>,
    /// Album name
    #[serde(default)]
    pub name: Option<String>,
}

/// Artist reference
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiArtistRef {
    /// Artist ID
    pub id: String,
    /// Artist name
    pub name: String,
}

/// Structured artist credits
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiArtists {
    /// Primary artists
    #[serde(default)]
    pub primary: Vec<ApiArtistRef>,
    /// Featured artists
    #[serde(default)]
    pub featured: Vec<ApiArtistRef>,
}

/// Song item from a search response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSearchSongItem {
    /// Song ID
    pub id: String,
    /// Song title
    pub name: String,
    /// Album
    #[serde(default)]
    pub album: Option<ApiAlbum>,
    /// Duration in seconds, as a decimal string
    #[serde(default)]
    pub duration: Option<String>,
    /// Primary artists joined into one string
    #[serde(default)]
    pub primary_artists: Option<String>,
    /// Artwork at several qualities
    #[serde(default)]
    pub image: Vec<ApiMedia>,
    /// Streams at several bitrates
    #[serde(default)]
    pub download_url: Vec<ApiMedia>,
}

/// Song item from a lookup-by-id response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSongItem {
    /// Song ID
    pub id: String,
    /// Song title
    pub name: String,
    /// Duration in seconds
    #[serde(default)]
    pub duration: Option<u32>,
    /// Album
    #[serde(default)]
    pub album: Option<ApiAlbum>,
    /// Artist credits
    #[serde(default)]
    pub artists: Option<ApiArtists>,
    /// Artwork at several qualities
    #[serde(default)]
    pub image: Vec<ApiMedia>,
    /// Streams at several bitrates
    #[serde(default)]
    pub download_url: Vec<ApiMedia>,
}

/// Pick the best entry by quality preference, falling back to the first one
fn pick_media(items: &[ApiMedia], preference: &[&str]) -> String {
    preference
        .iter()
        .find_map(|quality| items.iter().find(|item| item.quality == *quality))
        .or_else(|| items.first())
        .map(|item| item.href().to_string())
        .unwrap_or_default()
}

/// Best artwork URL, or an empty string
pub fn pick_image_url(items: &[ApiMedia]) -> String {
    pick_media(items, &IMAGE_QUALITIES)
}

/// Best stream URL, or an empty string
pub fn pick_stream_url(items: &[ApiMedia]) -> String {
    pick_media(items, &STREAM_QUALITIES)
}

fn album_ref(album: Option<&ApiAlbum>) -> AlbumRef {
    AlbumRef {
        id: album.and_then(|a| a.id.clone()),
        name: album.and_then(|a| a.name.clone()),
    }
}

impl From<&ApiSearchSongItem> for Track {
    fn from(item: &ApiSearchSongItem) -> Self {
        let duration = item
            .duration
            .as_deref()
            .and_then(|d| d.trim().parse::<u32>().ok())
            .unwrap_or(0);

        Self {
            id: item.id.clone(),
            name: item.name.clone(),
            duration,
            album: album_ref(item.album.as_ref()),
            primary_artists: item.primary_artists.clone().unwrap_or_default(),
            image: pick_image_url(&item.image),
            stream_url: pick_stream_url(&item.download_url),
            local_uri: None,
        }
    }
}

impl From<&ApiSongItem> for Track {
    fn from(item: &ApiSongItem) -> Self {
        let primary_artists = item
            .artists
            .as_ref()
            .map(|artists| {
                artists
                    .primary
                    .iter()
                    .map(|a| a.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default();

        Self {
            id: item.id.clone(),
            name: item.name.clone(),
            duration: item.duration.unwrap_or(0),
            album: album_ref(item.album.as_ref()),
            primary_artists,
            image: pick_image_url(&item.image),
            stream_url: pick_stream_url(&item.download_url),
            local_uri: None,
        }
    }
}
