//! Core library for Sound Cues.
//!
//! Short interface sounds (scroll, click, hover) played through a shared
//! audio context that only comes to life after a user gesture. Each module
//! owns one seam of the pipeline: asset fetching, decoding, the decoded
//! buffer cache, the platform audio context, and the scroll trigger. The
//! [`AudioCueService`] ties them together.

pub mod assets;
pub mod audio;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod decode;
pub mod error;
pub mod scroll;
pub mod service;

#[cfg(test)]
pub(crate) mod test_support;

#[cfg(feature = "http")]
pub use assets::HttpFetcher;
pub use assets::{AssetFetcher, FsFetcher};
#[cfg(feature = "rodio")]
pub use audio::RodioContext;
pub use audio::{AudioContext, ContextFactory, ContextState, NullContext};
pub use cache::BufferCache;
pub use catalog::SoundCatalog;
pub use config::{AppConfig, AssetConfig, PlaybackConfig, ScrollConfig};
pub use decode::{AudioDecoder, DecodedBuffer, SymphoniaDecoder};
pub use error::{Result, SoundCueError};
pub use scroll::ScrollGate;
pub use service::{AudioCueService, AudioCueServiceBuilder, PlaybackOutcome, PlaybackTicket};
