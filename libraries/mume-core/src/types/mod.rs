//! Domain types shared across Mume Player crates

mod playback;
mod track;

pub use playback::RepeatMode;
pub use track::{AlbumRef, Track};
