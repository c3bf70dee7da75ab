//! Mume Player Core
//!
//! Platform-agnostic core types, collaborator traits, and error handling for
//! Mume Player.
//!
//! This crate provides the foundational building blocks shared by the storage
//! and playback crates.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `Track`, `AlbumRef`, `RepeatMode`
//! - **Collaborator Traits**: `KeyValueStore`, `AudioBackend`, `AudioHandle`, `StatusListener`
//! - **Catalog Mapping**: pure conversions from catalog API records into `Track`
//! - **Error Handling**: Unified `MumeError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use mume_core::types::{AlbumRef, Track};
//!
//! let track = Track::new("42", "Song", "https://cdn.example.com/42_320.mp4")
//!     .with_artists("Some Artist")
//!     .with_album(AlbumRef::new("7", "Some Album"))
//!     .with_duration(215);
//!
//! assert_eq!(track.source(), Some("https://cdn.example.com/42_320.mp4"));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod catalog;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{MumeError, Result};
pub use traits::{AudioBackend, AudioHandle, AudioStatus, KeyValueStore, StatusListener};
pub use types::{AlbumRef, RepeatMode, Track};
