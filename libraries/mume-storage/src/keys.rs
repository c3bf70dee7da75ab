//! Store keys
//!
//! Values stay compatible with snapshots written by earlier app versions.

/// Serialized queue (JSON array of tracks)
pub const QUEUE_KEY: &str = "@music_player_queue";

/// Current queue index (stringified integer)
pub const QUEUE_INDEX_KEY: &str = "@music_player_queue_index";

/// Downloaded files (JSON object, track id -> local path)
pub const DOWNLOADS_KEY: &str = "@music_player_downloads";

/// Favorite tracks (JSON array of tracks)
pub const FAVORITES_KEY: &str = "@music_player_favorites";
