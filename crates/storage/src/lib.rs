use directories::ProjectDirs;
use doc_model::{
    apply_progress_action, Persistence, ProgressAction, ReadingProgress, ReadingProgressRecord,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const HISTORY_SCHEMA_VERSION: u32 = 1;
const HISTORY_FILE: &str = "reading-progress.json";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("unable to resolve local data directory")]
    NoDataDirectory,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("unsupported history schema version {0}")]
    UnsupportedVersion(u32),
}

#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct HistoryEnvelope {
    version: u32,
    readings: Vec<ReadingProgressRecord>,
}

// Older files hold the bare record list without an envelope.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredHistory {
    Envelope(HistoryEnvelope),
    Bare(Vec<ReadingProgressRecord>),
}

impl Storage {
    pub fn from_default_project() -> Result<Self, StorageError> {
        let dirs =
            ProjectDirs::from("dev", "Earmark", "Earmark").ok_or(StorageError::NoDataDirectory)?;

        Ok(Self { root: dirs.data_local_dir().to_path_buf() })
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn load_history(&self) -> Result<Vec<ReadingProgressRecord>, StorageError> {
        let path = self.history_path();
        if !path.exists() {
            return Ok(Vec::new());
        }

        let bytes = fs::read(path)?;
        match serde_json::from_slice::<StoredHistory>(&bytes)? {
            StoredHistory::Envelope(envelope) if envelope.version > HISTORY_SCHEMA_VERSION => {
                Err(StorageError::UnsupportedVersion(envelope.version))
            }
            StoredHistory::Envelope(envelope) => Ok(envelope.readings),
            StoredHistory::Bare(readings) => Ok(readings),
        }
    }

    pub fn save_history(&self, readings: &[ReadingProgressRecord]) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)?;

        let envelope =
            HistoryEnvelope { version: HISTORY_SCHEMA_VERSION, readings: readings.to_vec() };

        let bytes = serde_json::to_vec_pretty(&envelope)?;
        let path = self.history_path();
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(tmp, path)?;
        Ok(())
    }

    pub fn remove_history(&self) -> Result<(), StorageError> {
        match fs::remove_file(self.history_path()) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn history_path(&self) -> PathBuf {
        self.root.join(HISTORY_FILE)
    }
}

/// Reading history backed by [`Storage`].
///
/// Every state change goes through [`apply_progress_action`] and the
/// resulting persistence effect is carried out immediately. Persistence
/// failures are logged and returned, but the in-memory state is already
/// updated so the viewer keeps working.
#[derive(Debug)]
pub struct ProgressStore {
    storage: Storage,
    state: ReadingProgress,
}

impl ProgressStore {
    /// Loads persisted history. An unreadable file is treated as an empty history.
    pub fn open(storage: Storage) -> Self {
        let recent = match storage.load_history() {
            Ok(recent) => recent,
            Err(err) => {
                tracing::warn!(
                    root = %storage.root().display(),
                    error = %err,
                    "failed to load reading history, starting empty"
                );
                Vec::new()
            }
        };

        tracing::debug!(records = recent.len(), "reading history loaded");
        Self { storage, state: ReadingProgress::with_history(recent) }
    }

    pub fn recent(&self) -> &[ReadingProgressRecord] {
        &self.state.recent
    }

    pub fn current(&self) -> Option<&ReadingProgressRecord> {
        self.state.current.as_ref()
    }

    pub fn find(&self, file_path: &str) -> Option<&ReadingProgressRecord> {
        self.state.find(file_path)
    }

    pub fn update(&mut self, record: ReadingProgressRecord) -> Result<(), StorageError> {
        self.dispatch(ProgressAction::Update(record))
    }

    pub fn exit_reading(&mut self) {
        // Only the in-memory pointer changes; nothing to persist.
        let _ = self.dispatch(ProgressAction::ExitReading);
    }

    pub fn clear_history(&mut self) -> Result<(), StorageError> {
        self.dispatch(ProgressAction::ClearHistory)
    }

    fn dispatch(&mut self, action: ProgressAction) -> Result<(), StorageError> {
        let result = match apply_progress_action(&mut self.state, action) {
            Persistence::Save => self.storage.save_history(&self.state.recent),
            Persistence::Remove => self.storage.remove_history(),
            Persistence::Unchanged => Ok(()),
        };

        if let Err(err) = &result {
            tracing::warn!(error = %err, "failed to persist reading history");
        }
        result
    }
}
