//! Audio companion
//!
//! Sequences the audio tracks of the current directory and drives playback
//! through a host-owned media element.

pub mod queue;
pub mod transport;

pub use queue::{related_tracks, AudioQueue, AudioTrack};
pub use transport::{
    format_time, MediaCommand, MediaEvent, PlaybackError, PlaybackState, Transport,
    TransportError, DEFAULT_VOLUME, PLAYBACK_RATES, SKIP_SECONDS,
};
