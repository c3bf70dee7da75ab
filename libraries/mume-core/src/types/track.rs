/// Track types for the play queue
use serde::{Deserialize, Serialize};

/// Album reference carried by a track
///
/// Both fields are nullable in catalog responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumRef {
    /// Catalog album ID
    #[serde(default)]
    pub id: Option<String>,
    /// Album display name
    #[serde(default)]
    pub name: Option<String>,
}

impl AlbumRef {
    /// Create an album reference with both fields set
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: Some(name.into()),
        }
    }
}

/// Playable catalog entry (queue item)
///
/// Identity is `id`; every other field is display data. The JSON shape is
/// camelCase so persisted queues stay readable across versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    /// Catalog track ID, unique within a queue
    pub id: String,

    /// Track title
    pub name: String,

    /// Duration in seconds (0 = unknown)
    #[serde(default)]
    pub duration: u32,

    /// Album reference
    #[serde(default)]
    pub album: AlbumRef,

    /// Comma separated primary artist names
    #[serde(default)]
    pub primary_artists: String,

    /// Artwork URL (may be empty)
    #[serde(default)]
    pub image: String,

    /// Remote stream URL
    #[serde(default)]
    pub stream_url: String,

    /// Local file path, set once the track has been downloaded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_uri: Option<String>,
}

impl Track {
    /// Create a track with the fields required for playback
    pub fn new(id: impl Into<String>, name: impl Into<String>, stream_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            duration: 0,
            album: AlbumRef::default(),
            primary_artists: String::new(),
            image: String::new(),
            stream_url: stream_url.into(),
            local_uri: None,
        }
    }

    /// Set the duration in seconds
    #[must_use]
    pub fn with_duration(mut self, seconds: u32) -> Self {
        self.duration = seconds;
        self
    }

    /// Set the primary artists string
    #[must_use]
    pub fn with_artists(mut self, artists: impl Into<String>) -> Self {
        self.primary_artists = artists.into();
        self
    }

    /// Set the album reference
    #[must_use]
    pub fn with_album(mut self, album: AlbumRef) -> Self {
        self.album = album;
        self
    }

    /// Set the artwork URL
    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    /// Set the local file path
    #[must_use]
    pub fn with_local_uri(mut self, path: impl Into<String>) -> Self {
        self.local_uri = Some(path.into());
        self
    }

    /// Resolve the URI the audio capability should load
    ///
    /// A downloaded file wins over the remote stream. Returns `None` when
    /// there is nothing to play.
    pub fn source(&self) -> Option<&str> {
        self.local_uri
            .as_deref()
            .filter(|uri| !uri.is_empty())
            .or(Some(self.stream_url.as_str()))
            .filter(|uri| !uri.is_empty())
    }

    /// Whether a local copy has been recorded for this track
    pub fn is_downloaded(&self) -> bool {
        self.local_uri.as_deref().is_some_and(|uri| !uri.is_empty())
    }
}
