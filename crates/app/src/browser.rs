//! File browser over the content tree.

use content_tree::{normalize_path, ContentError, ContentProvider};
use doc_model::{file_name, DirectoryListing, FileEntry};
use std::sync::Arc;

/// One clickable segment of the current directory path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breadcrumb {
    pub name: String,
    pub path: String,
}

/// What selecting an entry asks the application to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Directory(String),
    Document(String),
    Audio { name: String, path: String },
    Unsupported(String),
}

impl Selection {
    pub fn of(entry: &FileEntry) -> Self {
        match entry {
            FileEntry::Directory { path, .. } => Self::Directory(path.clone()),
            FileEntry::Pdf { path, .. } => Self::Document(path.clone()),
            FileEntry::Audio { name, path } => {
                Self::Audio { name: name.clone(), path: path.clone() }
            }
            FileEntry::Other { name, .. } => Self::Unsupported(name.clone()),
        }
    }
}

/// Current directory, its listing, and the navigation history.
///
/// The history starts at the root. A directory is only entered once its
/// listing has been fetched, so a failed navigation leaves the browser where
/// it was.
pub struct FileBrowser {
    content: Arc<dyn ContentProvider>,
    history: Vec<String>,
    listing: Option<DirectoryListing>,
}

impl FileBrowser {
    pub fn new(content: Arc<dyn ContentProvider>) -> Self {
        Self { content, history: vec![String::new()], listing: None }
    }

    pub fn current_dir(&self) -> &str {
        self.history.last().map(String::as_str).unwrap_or("")
    }

    pub fn listing(&self) -> Option<&DirectoryListing> {
        self.listing.as_ref()
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn can_go_back(&self) -> bool {
        self.history.len() > 1
    }

    /// Enters `path`. Navigating to the current directory only reloads it.
    pub async fn navigate(&mut self, path: &str) -> Result<&DirectoryListing, ContentError> {
        let path = normalize_path(path)?;
        let listing = self.content.list_directory(&path).await?;

        if path != self.current_dir() {
            tracing::debug!(path = %path, "entering directory");
            self.history.push(path);
        }
        Ok(self.listing.insert(listing))
    }

    /// Returns to the previous directory. `Ok(false)` at the root of the
    /// history.
    pub async fn go_back(&mut self) -> Result<bool, ContentError> {
        if !self.can_go_back() {
            return Ok(false);
        }

        let previous = self.history[self.history.len() - 2].clone();
        let listing = self.content.list_directory(&previous).await?;
        self.history.pop();
        self.listing = Some(listing);
        Ok(true)
    }

    /// Reloads the current directory.
    pub async fn refresh(&mut self) -> Result<&DirectoryListing, ContentError> {
        let listing = self.content.list_directory(self.current_dir()).await?;
        Ok(self.listing.insert(listing))
    }

    /// Forgets the history and returns to the root.
    pub async fn reset(&mut self) -> Result<&DirectoryListing, ContentError> {
        let listing = self.content.list_directory("").await?;
        self.history = vec![String::new()];
        Ok(self.listing.insert(listing))
    }

    /// Cumulative path segments of the current directory, root excluded.
    pub fn breadcrumbs(&self) -> Vec<Breadcrumb> {
        let current = self.current_dir();
        current
            .match_indices('/')
            .map(|(index, _)| &current[..index])
            .chain((!current.is_empty()).then_some(current))
            .map(|path| Breadcrumb { name: file_name(path).to_owned(), path: path.to_owned() })
            .collect()
    }
}
