//! Playback transport as a state machine over host media events.
//!
//! The host owns the actual media element. It forwards [`MediaEvent`]s in and
//! applies the [`MediaCommand`]s each call returns.

use doc_model::DirectoryListing;

use crate::queue::{related_tracks, AudioQueue, AudioTrack};

pub const DEFAULT_VOLUME: f32 = 0.7;
pub const SKIP_SECONDS: f64 = 10.0;
pub const PLAYBACK_RATES: [f32; 7] = [0.5, 0.75, 1.0, 1.25, 1.5, 1.75, 2.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum PlaybackError {
    #[error("Loading the audio was interrupted.")]
    Aborted,
    #[error("A network problem stopped the audio from loading.")]
    Network,
    #[error("The audio file could not be decoded.")]
    Decode,
    #[error("This audio format is not supported.")]
    Unsupported,
}

impl PlaybackError {
    /// Maps a media element error code (1 to 4) to its cause.
    pub fn from_media_code(code: u16) -> Option<Self> {
        match code {
            1 => Some(Self::Aborted),
            2 => Some(Self::Network),
            3 => Some(Self::Decode),
            4 => Some(Self::Unsupported),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum TransportError {
    #[error("unsupported playback rate {0}")]
    UnsupportedRate(f32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaybackState {
    /// Nothing loaded.
    Idle,
    Loading,
    Paused,
    Playing,
    /// Held at the end of the last track.
    Ended,
    Error(PlaybackError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum MediaCommand {
    Load { path: String },
    Play,
    Pause,
    Seek { position_secs: f64 },
    SetVolume(f32),
    SetRate(f32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MediaEvent {
    Loaded { duration_secs: f64 },
    TimeUpdate { position_secs: f64 },
    Ended,
    Error(PlaybackError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transport {
    queue: AudioQueue,
    loaded: Option<AudioTrack>,
    state: PlaybackState,
    play_when_ready: bool,
    position_secs: f64,
    duration_secs: f64,
    volume: f32,
    muted: bool,
    rate: f32,
}

impl Default for Transport {
    fn default() -> Self {
        Self {
            queue: AudioQueue::default(),
            loaded: None,
            state: PlaybackState::Idle,
            play_when_ready: false,
            position_secs: 0.0,
            duration_secs: 0.0,
            volume: DEFAULT_VOLUME,
            muted: false,
            rate: 1.0,
        }
    }
}

impl Transport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue(&self) -> &AudioQueue {
        &self.queue
    }

    pub fn loaded(&self) -> Option<&AudioTrack> {
        self.loaded.as_ref()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn position_secs(&self) -> f64 {
        self.position_secs
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    /// Volume the user set, independent of mute.
    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Volume actually applied to the output.
    pub fn effective_volume(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.volume
        }
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    /// User-facing message for the current error, if any.
    pub fn error_message(&self) -> Option<String> {
        match self.state {
            PlaybackState::Error(error) => Some(error.to_string()),
            _ => None,
        }
    }

    /// Hidden entirely when nothing is loaded and the queue is empty.
    pub fn is_visible(&self) -> bool {
        self.loaded.is_some() || !self.queue.is_empty()
    }

    pub fn can_go_next(&self) -> bool {
        self.queue.has_next()
    }

    pub fn can_go_previous(&self) -> bool {
        self.queue.has_previous()
    }

    /// Rebuilds the queue for a changed directory.
    pub fn on_directory_changed(&mut self, listing: &DirectoryListing) {
        let loaded = self.loaded.as_ref().map(|track| track.path.as_str());
        self.queue = AudioQueue::from_listing(listing, loaded);
    }

    /// Loads the first track related to an opened document, paused.
    pub fn associate_document(
        &mut self,
        document_path: &str,
        listing: &DirectoryListing,
    ) -> Vec<MediaCommand> {
        match related_tracks(document_path, listing).into_iter().next() {
            Some(track) => {
                tracing::debug!(
                    document = document_path,
                    track = %track.path,
                    "related audio found"
                );
                self.load(track)
            }
            None => Vec::new(),
        }
    }

    /// Loads a track, paused.
    pub fn load(&mut self, track: AudioTrack) -> Vec<MediaCommand> {
        self.load_track(track, false)
    }

    pub fn toggle_play(&mut self) -> Vec<MediaCommand> {
        match self.state {
            PlaybackState::Idle => match self.queue.tracks().first().cloned() {
                Some(track) => self.load_track(track, true),
                None => Vec::new(),
            },
            PlaybackState::Loading => {
                self.play_when_ready = !self.play_when_ready;
                Vec::new()
            }
            PlaybackState::Playing => {
                self.state = PlaybackState::Paused;
                vec![MediaCommand::Pause]
            }
            PlaybackState::Paused => {
                self.state = PlaybackState::Playing;
                vec![MediaCommand::Play]
            }
            PlaybackState::Ended => {
                self.state = PlaybackState::Playing;
                self.position_secs = 0.0;
                vec![MediaCommand::Seek { position_secs: 0.0 }, MediaCommand::Play]
            }
            PlaybackState::Error(error) => match self.loaded.clone() {
                Some(track) => {
                    tracing::info!(path = %track.path, %error, "reloading audio after error");
                    self.load_track(track, true)
                }
                None => Vec::new(),
            },
        }
    }

    pub fn seek(&mut self, position_secs: f64) -> Vec<MediaCommand> {
        if self.loaded.is_none() {
            return Vec::new();
        }
        self.position_secs = position_secs.clamp(0.0, self.duration_secs.max(0.0));
        vec![MediaCommand::Seek { position_secs: self.position_secs }]
    }

    pub fn skip_forward(&mut self) -> Vec<MediaCommand> {
        self.seek(self.position_secs + SKIP_SECONDS)
    }

    pub fn skip_backward(&mut self) -> Vec<MediaCommand> {
        self.seek(self.position_secs - SKIP_SECONDS)
    }

    /// Sets the volume; zero mutes, anything else unmutes.
    pub fn set_volume(&mut self, volume: f32) -> Vec<MediaCommand> {
        let volume = volume.clamp(0.0, 1.0);
        if volume == 0.0 {
            self.muted = true;
        } else {
            self.volume = volume;
            self.muted = false;
        }
        vec![MediaCommand::SetVolume(self.effective_volume())]
    }

    /// Mutes, or restores the volume held before muting.
    pub fn toggle_mute(&mut self) -> Vec<MediaCommand> {
        self.muted = !self.muted;
        vec![MediaCommand::SetVolume(self.effective_volume())]
    }

    pub fn set_rate(&mut self, rate: f32) -> Result<Vec<MediaCommand>, TransportError> {
        if !PLAYBACK_RATES.contains(&rate) {
            return Err(TransportError::UnsupportedRate(rate));
        }
        self.rate = rate;
        Ok(vec![MediaCommand::SetRate(rate)])
    }

    /// Moves to the next queued track and plays it. No-op at the end.
    pub fn next(&mut self) -> Vec<MediaCommand> {
        match self.queue.peek_next().cloned() {
            Some(track) => self.load_track(track, true),
            None => Vec::new(),
        }
    }

    /// Moves to the previous queued track and plays it. No-op at the start.
    pub fn previous(&mut self) -> Vec<MediaCommand> {
        match self.queue.peek_previous().cloned() {
            Some(track) => self.load_track(track, true),
            None => Vec::new(),
        }
    }

    pub fn handle(&mut self, event: MediaEvent) -> Vec<MediaCommand> {
        match event {
            MediaEvent::Loaded { duration_secs } => {
                if self.state != PlaybackState::Loading {
                    return Vec::new();
                }
                self.duration_secs = duration_secs.max(0.0);
                if self.play_when_ready {
                    self.play_when_ready = false;
                    self.state = PlaybackState::Playing;
                    vec![MediaCommand::Play]
                } else {
                    self.state = PlaybackState::Paused;
                    Vec::new()
                }
            }
            MediaEvent::TimeUpdate { position_secs } => {
                self.position_secs = position_secs.clamp(0.0, self.duration_secs.max(0.0));
                Vec::new()
            }
            MediaEvent::Ended => {
                self.position_secs = self.duration_secs;
                if self.queue.has_next() {
                    self.next()
                } else {
                    self.state = PlaybackState::Ended;
                    Vec::new()
                }
            }
            MediaEvent::Error(error) => {
                tracing::warn!(
                    path = self.loaded.as_ref().map(|track| track.path.as_str()),
                    %error,
                    "audio playback failed"
                );
                self.play_when_ready = false;
                self.state = PlaybackState::Error(error);
                Vec::new()
            }
        }
    }

    fn load_track(&mut self, track: AudioTrack, play: bool) -> Vec<MediaCommand> {
        self.queue.select(&track.path);
        let path = track.path.clone();
        self.loaded = Some(track);
        self.state = PlaybackState::Loading;
        self.play_when_ready = play;
        self.position_secs = 0.0;
        self.duration_secs = 0.0;
        vec![MediaCommand::Load { path }]
    }
}

/// `MM:SS`, with zero and non-finite values shown as `00:00`.
pub fn format_time(secs: f64) -> String {
    if !secs.is_finite() || secs <= 0.0 {
        return "00:00".to_owned();
    }
    let whole = secs.floor() as u64;
    format!("{:02}:{:02}", whole / 60, whole % 60)
}
