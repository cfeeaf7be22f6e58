//! Application root state.
//!
//! Owns one of each collaborator and routes viewer progress into the reading
//! history. Nothing here is global; callers hold an [`AppState`] and pass
//! events through it.

use crate::browser::{FileBrowser, Selection};
use crate::config::{AppConfig, ConfigError};
use annotation::{AnnotationEngine, OverlayGeometry};
use audio_companion::{related_tracks, AudioTrack, MediaCommand, MediaEvent, Transport};
use chrono::Utc;
use content_tree::{normalize_path, ContentError, ContentProvider};
use doc_model::{parent_dir, DirectoryListing, FileEntry, ReadingProgressRecord};
use earmark_cache::SharedBlobStore;
use pdf_engine::DocumentParser;
use std::sync::Arc;
use storage::{ProgressStore, StorageError};
use tokio::time::Instant;
use viewer_core::{
    DeviceTier, LoadError, LoadProfile, ScrollViewport, SessionPhase, ViewerConfig,
    ViewerController, ViewerEvent,
};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Something the host should act on or show.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    Viewer(ViewerEvent),
    Media(MediaCommand),
    Notice(String),
}

pub struct AppState {
    profile: LoadProfile,
    content: Arc<dyn ContentProvider>,
    browser: FileBrowser,
    viewer: ViewerController,
    annotations: AnnotationEngine,
    audio: Transport,
    progress: ProgressStore,
}

impl AppState {
    /// Wires the collaborators together. `profile` is computed once by the
    /// caller and kept for the life of the state.
    pub fn new(
        profile: LoadProfile,
        max_auto_retries: u32,
        content: Arc<dyn ContentProvider>,
        cache: Option<SharedBlobStore>,
        parser: Arc<dyn DocumentParser>,
        progress: ProgressStore,
    ) -> Self {
        let viewer_config = ViewerConfig { max_auto_retries, ..ViewerConfig::new(profile) };
        let mut annotations = AnnotationEngine::default();
        annotations.set_constrained(profile.tier == DeviceTier::Mobile);

        Self {
            profile,
            browser: FileBrowser::new(Arc::clone(&content)),
            viewer: ViewerController::new(Arc::clone(&content), cache, parser, viewer_config),
            content,
            annotations,
            audio: Transport::new(),
            progress,
        }
    }

    /// Builds the state described by `config` with the lopdf parser.
    pub async fn from_config(config: &AppConfig, profile: LoadProfile) -> Result<Self, AppError> {
        let content = config.content_provider()?;
        let cache = earmark_cache::open_cache(&config.cache).await;
        let progress = ProgressStore::open(config.storage());

        Ok(Self::new(
            profile,
            config.max_auto_retries,
            content,
            cache,
            Arc::new(pdf_engine::default_parser()),
            progress,
        ))
    }

    pub fn profile(&self) -> &LoadProfile {
        &self.profile
    }

    pub fn browser(&self) -> &FileBrowser {
        &self.browser
    }

    pub fn viewer(&self) -> &ViewerController {
        &self.viewer
    }

    pub fn annotations(&self) -> &AnnotationEngine {
        &self.annotations
    }

    pub fn annotations_mut(&mut self) -> &mut AnnotationEngine {
        &mut self.annotations
    }

    pub fn audio(&self) -> &Transport {
        &self.audio
    }

    pub fn audio_mut(&mut self) -> &mut Transport {
        &mut self.audio
    }

    pub fn progress(&self) -> &ProgressStore {
        &self.progress
    }

    /// Enters a directory and requeues its audio.
    pub async fn navigate(&mut self, path: &str) -> Result<(), AppError> {
        let listing = self.browser.navigate(path).await?;
        self.audio.on_directory_changed(listing);
        Ok(())
    }

    pub async fn go_back(&mut self) -> Result<bool, AppError> {
        let moved = self.browser.go_back().await?;
        if let Some(listing) = self.browser.listing() {
            self.audio.on_directory_changed(listing);
        }
        Ok(moved)
    }

    /// Acts on a clicked entry according to its kind.
    pub async fn select(&mut self, entry: &FileEntry) -> Result<Vec<AppEvent>, AppError> {
        match Selection::of(entry) {
            Selection::Directory(path) => {
                self.navigate(&path).await?;
                Ok(Vec::new())
            }
            Selection::Document(path) => self.open_document(&path).await,
            Selection::Audio { name, path } => Ok(self
                .audio
                .load(AudioTrack::new(name, path))
                .into_iter()
                .map(AppEvent::Media)
                .collect()),
            Selection::Unsupported(name) => {
                tracing::info!(name = %name, "unsupported entry selected");
                Ok(vec![AppEvent::Notice(format!("{name} cannot be opened"))])
            }
        }
    }

    /// Opens a document at its saved page and loads its related audio.
    pub async fn open_document(&mut self, path: &str) -> Result<Vec<AppEvent>, AppError> {
        let path = normalize_path(path).map_err(LoadError::from)?;
        let resume = self.progress.find(&path).map(|record| record.current_page);
        self.annotations.clear_all();

        let viewer_events = self.viewer.open(&path, resume).await?;
        self.settle(viewer_events).await
    }

    /// Retries a failed load.
    pub async fn retry(&mut self) -> Result<Vec<AppEvent>, AppError> {
        let viewer_events = self.viewer.retry().await?;
        self.settle(viewer_events).await
    }

    /// Reloads a document whose cached copy is unusable.
    pub async fn recover(&mut self) -> Result<Vec<AppEvent>, AppError> {
        let viewer_events = self.viewer.recover().await?;
        self.settle(viewer_events).await
    }

    pub fn on_scroll(&mut self, viewport: ScrollViewport) -> Vec<AppEvent> {
        let events = self.viewer.on_scroll(viewport);
        self.route(events)
    }

    pub fn jump_to_page(&mut self, page: u32) -> Result<Vec<AppEvent>, AppError> {
        let events = self.viewer.jump_to_page(page)?;
        Ok(self.route(events))
    }

    pub fn next_page(&mut self) -> Result<Vec<AppEvent>, AppError> {
        let events = self.viewer.next_page()?;
        Ok(self.route(events))
    }

    pub fn previous_page(&mut self) -> Result<Vec<AppEvent>, AppError> {
        let events = self.viewer.previous_page()?;
        Ok(self.route(events))
    }

    pub fn toggle_lazy_loading(&mut self) -> Result<Vec<AppEvent>, AppError> {
        let events = self.viewer.toggle_lazy_loading()?;
        Ok(self.route(events))
    }

    pub fn zoom_in(&mut self) -> f32 {
        let scale = self.viewer.zoom_in();
        self.sync_overlay();
        scale
    }

    pub fn zoom_out(&mut self) -> f32 {
        let scale = self.viewer.zoom_out();
        self.sync_overlay();
        scale
    }

    pub fn rotate_clockwise(&mut self) {
        self.viewer.rotate_clockwise();
        self.sync_overlay();
    }

    pub fn rotate_counter_clockwise(&mut self) {
        self.viewer.rotate_counter_clockwise();
        self.sync_overlay();
    }

    /// Leaves the open document: saves the final position, clears the
    /// "currently reading" pointer and discards annotations.
    pub fn exit_reading(&mut self) -> Vec<AppEvent> {
        let events = self.viewer.exit();
        let events = self.route(events);
        self.progress.exit_reading();
        self.annotations.clear_all();
        events
    }

    pub fn clear_history(&mut self) -> Result<(), AppError> {
        self.progress.clear_history()?;
        Ok(())
    }

    pub fn handle_media(&mut self, event: MediaEvent) -> Vec<AppEvent> {
        self.audio.handle(event).into_iter().map(AppEvent::Media).collect()
    }

    /// Background cache outcomes since the last call.
    pub fn pending_events(&mut self) -> Vec<AppEvent> {
        let events = self.viewer.pending_events();
        self.route(events)
    }

    /// Waits for in-flight cache writes, as before shutting down.
    pub async fn flush_cache_writes(&mut self, deadline: Instant) -> Vec<AppEvent> {
        let events = self.viewer.flush_cache_writes(deadline).await;
        self.route(events)
    }

    /// Every audio track related to the open document.
    pub async fn related_audio(&self) -> Result<Vec<AudioTrack>, AppError> {
        let Some(path) = self.viewer.path() else {
            return Ok(Vec::new());
        };
        let listing = self.sibling_listing(path).await?;
        Ok(related_tracks(path, &listing))
    }

    /// Routes load events and, once the document is interactive, records the
    /// starting position, fits the overlay and loads related audio.
    async fn settle(&mut self, viewer_events: Vec<ViewerEvent>) -> Result<Vec<AppEvent>, AppError> {
        let mut events = self.route(viewer_events);
        if self.viewer.phase() != SessionPhase::Interactive {
            return Ok(events);
        }

        let (Some(doc_path), Some(total)) =
            (self.viewer.path().map(str::to_owned), self.viewer.page_count())
        else {
            return Ok(events);
        };
        self.record_progress(&doc_path, self.viewer.current_page(), total, &mut events);
        self.sync_overlay();

        match self.sibling_listing(&doc_path).await {
            Ok(listing) => events.extend(
                self.audio.associate_document(&doc_path, &listing).into_iter().map(AppEvent::Media),
            ),
            Err(err) => {
                tracing::warn!(path = %doc_path, error = %err, "could not list related audio");
            }
        }
        Ok(events)
    }

    fn route(&mut self, viewer_events: Vec<ViewerEvent>) -> Vec<AppEvent> {
        let mut events = Vec::with_capacity(viewer_events.len());
        let mut page_changed = false;
        for event in viewer_events {
            match &event {
                ViewerEvent::ProgressChanged { page, total } => {
                    page_changed = true;
                    if let Some(path) = self.viewer.path().map(str::to_owned) {
                        self.record_progress(&path, *page, *total, &mut events);
                    }
                }
                ViewerEvent::CacheStoreFailed { key, .. } => {
                    events.push(AppEvent::Notice(format!("failed to cache {key}")));
                }
                _ => {}
            }
            events.push(AppEvent::Viewer(event));
        }

        // Pages may differ in size, so the overlay follows the current page.
        if page_changed {
            self.sync_overlay();
        }
        events
    }

    fn record_progress(&mut self, path: &str, page: u32, total: u32, events: &mut Vec<AppEvent>) {
        let record = ReadingProgressRecord::new(path, page, total, Utc::now());
        if self.progress.update(record).is_err() {
            events.push(AppEvent::Notice("failed to save reading progress".to_owned()));
        }
    }

    /// Keeps the annotation overlay matched to the current page's display size.
    fn sync_overlay(&mut self) {
        let Some(document) = self.viewer.document() else {
            return;
        };
        let Ok(size) = document.page_size(self.viewer.current_page()) else {
            return;
        };

        let transform = self.viewer.transform();
        let (width_px, height_px) = transform.display_size(size);
        self.annotations.resize(OverlayGeometry::new(width_px, height_px, transform.rotation()));
    }

    async fn sibling_listing(&self, doc_path: &str) -> Result<DirectoryListing, ContentError> {
        let dir = parent_dir(doc_path);
        match self.browser.listing() {
            Some(listing) if listing.path == dir => Ok(listing.clone()),
            _ => self.content.list_directory(dir).await,
        }
    }
}
