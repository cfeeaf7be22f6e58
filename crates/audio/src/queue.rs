use doc_model::{base_name, parent_dir, DirectoryListing, FileEntry};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct AudioTrack {
    pub name: String,
    pub path: String,
}

impl AudioTrack {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self { name: name.into(), path: path.into() }
    }

    /// The track for an audio entry; `None` for any other kind.
    pub fn from_entry(entry: &FileEntry) -> Option<Self> {
        match entry {
            FileEntry::Audio { name, path } => Some(Self::new(name.clone(), path.clone())),
            FileEntry::Directory { .. } | FileEntry::Pdf { .. } | FileEntry::Other { .. } => None,
        }
    }
}

/// Audio entries of the current directory plus a pointer to the loaded track.
///
/// The pointer is re-derived from the loaded track's path whenever the queue
/// is rebuilt, so it never points at a track that merely inherited the index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudioQueue {
    tracks: Vec<AudioTrack>,
    current: Option<usize>,
}

impl AudioQueue {
    pub fn new(tracks: Vec<AudioTrack>, current_path: Option<&str>) -> Self {
        let current = current_path.and_then(|path| position(&tracks, path));
        Self { tracks, current }
    }

    pub fn from_listing(listing: &DirectoryListing, current_path: Option<&str>) -> Self {
        let tracks = listing.entries.iter().filter_map(AudioTrack::from_entry).collect();
        Self::new(tracks, current_path)
    }

    /// Rebuilds the queue from a refreshed listing, keeping the pointer on
    /// the same path or clearing it.
    pub fn refresh(&mut self, listing: &DirectoryListing) {
        let current_path = self.current().map(|track| track.path.clone());
        *self = Self::from_listing(listing, current_path.as_deref());
    }

    pub fn tracks(&self) -> &[AudioTrack] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current(&self) -> Option<&AudioTrack> {
        self.current.and_then(|index| self.tracks.get(index))
    }

    /// Points at `path` if it is queued.
    pub fn select(&mut self, path: &str) -> Option<usize> {
        self.current = position(&self.tracks, path);
        self.current
    }

    pub fn has_next(&self) -> bool {
        self.current.is_some_and(|index| index + 1 < self.tracks.len())
    }

    pub fn has_previous(&self) -> bool {
        self.current.is_some_and(|index| index > 0)
    }

    pub fn peek_next(&self) -> Option<&AudioTrack> {
        self.current.filter(|_| self.has_next()).and_then(|index| self.tracks.get(index + 1))
    }

    pub fn peek_previous(&self) -> Option<&AudioTrack> {
        self.current.filter(|_| self.has_previous()).and_then(|index| self.tracks.get(index - 1))
    }

    /// `"i / len"` with a 1-based position, when a queued track is loaded.
    pub fn label(&self) -> Option<String> {
        self.current.map(|index| format!("{} / {}", index + 1, self.tracks.len()))
    }
}

fn position(tracks: &[AudioTrack], path: &str) -> Option<usize> {
    tracks.iter().position(|track| track.path == path)
}

/// Audio tracks in `listing` related to the document at `document_path`, in
/// listing order.
///
/// A track is related if it sits in the document's directory, or if either
/// base name contains the other.
pub fn related_tracks(document_path: &str, listing: &DirectoryListing) -> Vec<AudioTrack> {
    let document_dir = parent_dir(document_path);
    let document_base = base_name(document_path);

    listing
        .entries
        .iter()
        .filter_map(AudioTrack::from_entry)
        .filter(|track| {
            let track_base = base_name(&track.path);
            parent_dir(&track.path) == document_dir
                || track_base.contains(document_base)
                || document_base.contains(track_base)
        })
        .collect()
}
