use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of distinct documents kept in the reading history.
pub const MAX_RECENT_READINGS: usize = 10;

/// Where the reader stopped in one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingProgressRecord {
    pub file_path: String,
    pub file_name: String,
    pub current_page: u32,
    pub total_pages: u32,
    pub last_read_at: DateTime<Utc>,
    pub completion_percentage: f64,
}

impl ReadingProgressRecord {
    pub fn new(
        file_path: impl Into<String>,
        current_page: u32,
        total_pages: u32,
        last_read_at: DateTime<Utc>,
    ) -> Self {
        let file_path = file_path.into();
        let file_name = crate::file_name(&file_path).to_owned();

        Self {
            file_path,
            file_name,
            current_page,
            total_pages,
            last_read_at,
            completion_percentage: completion_percentage(current_page, total_pages),
        }
    }

    /// Percentage rounded for display.
    pub fn rounded_percentage(&self) -> u32 {
        self.completion_percentage.round().clamp(0.0, 100.0) as u32
    }
}

fn completion_percentage(current_page: u32, total_pages: u32) -> f64 {
    if total_pages == 0 {
        return 0.0;
    }

    f64::from(current_page) / f64::from(total_pages) * 100.0
}

/// Reading history, most recent first, plus the document currently open.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadingProgress {
    pub recent: Vec<ReadingProgressRecord>,
    pub current: Option<ReadingProgressRecord>,
}

impl ReadingProgress {
    pub fn with_history(recent: Vec<ReadingProgressRecord>) -> Self {
        let mut recent = recent;
        dedup_by_path(&mut recent);
        recent.truncate(MAX_RECENT_READINGS);

        Self { recent, current: None }
    }

    pub fn find(&self, file_path: &str) -> Option<&ReadingProgressRecord> {
        self.recent.iter().find(|record| record.file_path == file_path)
    }
}

// Keeps the first occurrence of each path, which is the most recent one.
fn dedup_by_path(records: &mut Vec<ReadingProgressRecord>) {
    let mut seen = std::collections::HashSet::new();
    records.retain(|record| seen.insert(record.file_path.clone()));
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressAction {
    Update(ReadingProgressRecord),
    ExitReading,
    ClearHistory,
}

/// What the caller has to do with persisted history after an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persistence {
    Save,
    Remove,
    Unchanged,
}

pub fn apply_progress_action(state: &mut ReadingProgress, action: ProgressAction) -> Persistence {
    match action {
        ProgressAction::Update(record) => {
            state.recent.retain(|existing| existing.file_path != record.file_path);
            state.recent.insert(0, record.clone());
            state.recent.truncate(MAX_RECENT_READINGS);
            state.current = Some(record);
            Persistence::Save
        }
        ProgressAction::ExitReading => {
            state.current = None;
            Persistence::Unchanged
        }
        ProgressAction::ClearHistory => {
            state.recent.clear();
            Persistence::Remove
        }
    }
}
