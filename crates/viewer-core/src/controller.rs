//! The lazy-load controller driving one document at a time.
//!
//! Methods return the [`ViewerEvent`]s produced by the call so a host can
//! update its surface, persist progress, and show notices.

use std::collections::HashSet;
use std::sync::Arc;

use content_tree::{normalize_path, ContentProvider};
use earmark_cache::SharedBlobStore;
use pdf_engine::{DocumentParser, ParsedDocument};
use tokio::time::Instant;

use crate::device::LoadProfile;
use crate::loader::{CacheNotice, DocumentLoader};
use crate::session::{LoadError, LoadSession, SessionPhase, Step};
use crate::transform::{Rotation, ViewTransform};
use crate::viewport::{
    current_page, layout_slots, page_offset, scroll_ratio, visible_slots, PageSlot,
    ScrollViewport, DEFAULT_PAGE_SPACING_PX,
};
use crate::window::PageWindow;

pub const DEFAULT_MAX_AUTO_RETRIES: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewerConfig {
    pub profile: LoadProfile,
    pub max_auto_retries: u32,
    pub page_spacing_px: f32,
}

impl ViewerConfig {
    pub fn new(profile: LoadProfile) -> Self {
        Self {
            profile,
            max_auto_retries: DEFAULT_MAX_AUTO_RETRIES,
            page_spacing_px: DEFAULT_PAGE_SPACING_PX,
        }
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self::new(LoadProfile::default())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewerEvent {
    PhaseChanged(SessionPhase),
    Retrying { attempt: u32, error: String },
    Failed { error: String },
    Parsed { page_count: u32, from_cache: bool },
    /// Shown once per document per controller.
    Resumed { page: u32, total: u32 },
    PagesMounted(Vec<u32>),
    LazyLoadingChanged(bool),
    ProgressChanged { page: u32, total: u32 },
    ScrollTo { page: u32, offset_px: f32 },
    CacheStored { key: String },
    CacheStoreFailed { key: String, error: String },
    CacheRemoveFailed { key: String, error: String },
}

pub struct ViewerController {
    loader: DocumentLoader,
    config: ViewerConfig,
    next_session_id: u64,
    session: Option<LoadSession>,
    window: Option<PageWindow>,
    resume_page: Option<u32>,
    current_page: u32,
    transform: ViewTransform,
    resumed_paths: HashSet<String>,
}

impl ViewerController {
    pub fn new(
        content: Arc<dyn ContentProvider>,
        cache: Option<SharedBlobStore>,
        parser: Arc<dyn DocumentParser>,
        config: ViewerConfig,
    ) -> Self {
        Self {
            loader: DocumentLoader::new(content, cache, parser),
            config,
            next_session_id: 0,
            session: None,
            window: None,
            resume_page: None,
            current_page: 1,
            transform: ViewTransform::new(config.profile.initial_scale),
            resumed_paths: HashSet::new(),
        }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn phase(&self) -> SessionPhase {
        self.session.as_ref().map_or(SessionPhase::Uninitialized, LoadSession::phase)
    }

    pub fn path(&self) -> Option<&str> {
        self.session.as_ref().map(LoadSession::path)
    }

    pub fn last_error(&self) -> Option<&str> {
        self.session.as_ref().and_then(LoadSession::last_error)
    }

    pub fn document(&self) -> Option<&ParsedDocument> {
        self.session.as_ref().and_then(LoadSession::document)
    }

    pub fn page_count(&self) -> Option<u32> {
        self.document().map(ParsedDocument::page_count)
    }

    pub fn from_cache(&self) -> bool {
        self.session.as_ref().is_some_and(LoadSession::from_cache)
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn mounted_pages(&self) -> Vec<u32> {
        self.window.as_ref().map(|window| window.mounted().collect()).unwrap_or_default()
    }

    pub fn is_lazy_loading(&self) -> bool {
        self.window.as_ref().is_some_and(PageWindow::is_lazy)
    }

    pub fn transform(&self) -> &ViewTransform {
        &self.transform
    }

    /// Opens `path`, replacing any open document, and drives the load until
    /// the session is interactive or has failed.
    pub async fn open(
        &mut self,
        path: &str,
        resume_page: Option<u32>,
    ) -> Result<Vec<ViewerEvent>, LoadError> {
        let path = normalize_path(path)?;
        self.close_session();

        self.next_session_id += 1;
        let mut session = LoadSession::new(
            self.next_session_id,
            path.clone(),
            self.config.profile.load_timeout,
            self.config.max_auto_retries,
        );
        session.begin()?;
        self.session = Some(session);
        self.resume_page = resume_page;
        self.current_page = 1;
        self.transform = ViewTransform::new(self.config.profile.initial_scale);

        tracing::info!(
            path = %path,
            session = self.next_session_id,
            tier = ?self.config.profile.tier,
            eager = self.config.profile.eager(),
            "opening document"
        );

        let mut events = vec![ViewerEvent::PhaseChanged(SessionPhase::Probing)];
        self.drive(&mut events).await?;
        Ok(events)
    }

    /// Retries a failed session from the cache probe.
    pub async fn retry(&mut self) -> Result<Vec<ViewerEvent>, LoadError> {
        self.session_mut("retry")?.retry()?;
        let mut events = vec![ViewerEvent::PhaseChanged(SessionPhase::Probing)];
        self.drive(&mut events).await?;
        Ok(events)
    }

    /// Drops the cached copy and reloads from the network.
    pub async fn recover(&mut self) -> Result<Vec<ViewerEvent>, LoadError> {
        let session = self.session_mut("recover")?;
        session.recover()?;
        let key = session.path().to_owned();

        let mut events = Vec::new();
        if let Some(cache) = self.loader.cache() {
            if let Err(err) = cache.remove(&key).await {
                tracing::warn!(key = %key, error = %err, "failed to drop cached document");
                events.push(ViewerEvent::CacheRemoveFailed { key, error: err.to_string() });
            }
        }

        events.push(ViewerEvent::PhaseChanged(SessionPhase::Probing));
        self.drive(&mut events).await?;
        Ok(events)
    }

    /// Reacts to a scroll: tracks the current page and grows a lazy window
    /// once the threshold is crossed.
    pub fn on_scroll(&mut self, viewport: ScrollViewport) -> Vec<ViewerEvent> {
        let mut events = Vec::new();
        if self.phase() != SessionPhase::Interactive {
            return events;
        }
        let Some(total) = self.page_count() else {
            return events;
        };

        let slots = self.page_slots();
        if let Some(page) = current_page(&slots, &viewport) {
            self.set_current_page(page, total, &mut events);
        }

        let ratio = scroll_ratio(&slots, &viewport);
        let last_visible = visible_slots(&slots, &viewport).last().map(|slot| slot.page);
        let (batch, threshold) = (self.config.profile.batch, self.config.profile.scroll_threshold);

        if let Some(window) = self.window.as_mut() {
            if window.is_lazy() && ratio >= threshold {
                let after = last_visible.or_else(|| window.last_mounted()).unwrap_or(0);
                let added = window.expand_after(after, batch);
                if !added.is_empty() {
                    tracing::debug!(after, added = added.len(), ratio, "expanding page window");
                    events.push(ViewerEvent::PagesMounted(added));
                }
            }
        }

        events
    }

    /// Jumps to a page, mounting its neighbourhood first if needed.
    pub fn jump_to_page(&mut self, page: u32) -> Result<Vec<ViewerEvent>, LoadError> {
        let total = self.interactive_page_count("jump to a page")?;
        let page = page.clamp(1, total);
        let mut events = Vec::new();

        if let Some(window) = self.window.as_mut() {
            let added = window.ensure_around(page, self.config.profile.jump_radius);
            if !added.is_empty() {
                events.push(ViewerEvent::PagesMounted(added));
            }
        }

        self.set_current_page(page, total, &mut events);
        self.push_scroll_to(page, &mut events);
        Ok(events)
    }

    pub fn next_page(&mut self) -> Result<Vec<ViewerEvent>, LoadError> {
        let total = self.interactive_page_count("go to the next page")?;
        if self.current_page >= total {
            return Ok(Vec::new());
        }
        self.jump_to_page(self.current_page + 1)
    }

    pub fn previous_page(&mut self) -> Result<Vec<ViewerEvent>, LoadError> {
        self.interactive_page_count("go to the previous page")?;
        if self.current_page <= 1 {
            return Ok(Vec::new());
        }
        self.jump_to_page(self.current_page - 1)
    }

    /// Switches between lazy and eager mounting.
    pub fn toggle_lazy_loading(&mut self) -> Result<Vec<ViewerEvent>, LoadError> {
        self.interactive_page_count("toggle lazy loading")?;
        let lookahead = self.config.profile.lookahead;
        let current = self.current_page;
        let mut events = Vec::new();

        if let Some(window) = self.window.as_mut() {
            if window.is_lazy() {
                let added = window.mount_all();
                events.push(ViewerEvent::LazyLoadingChanged(false));
                if !added.is_empty() {
                    events.push(ViewerEvent::PagesMounted(added));
                }
            } else {
                window.shrink_to(current, lookahead);
                events.push(ViewerEvent::LazyLoadingChanged(true));
            }
        }

        self.push_scroll_to(current, &mut events);
        Ok(events)
    }

    pub fn zoom_in(&mut self) -> f32 {
        self.transform.zoom_in()
    }

    pub fn zoom_out(&mut self) -> f32 {
        self.transform.zoom_out()
    }

    pub fn rotate_clockwise(&mut self) -> Rotation {
        self.transform.rotate_clockwise()
    }

    pub fn rotate_counter_clockwise(&mut self) -> Rotation {
        self.transform.rotate_counter_clockwise()
    }

    /// Leaves the document. An interactive session reports its final position
    /// before closing.
    pub fn exit(&mut self) -> Vec<ViewerEvent> {
        let mut events = Vec::new();
        if self.phase() == SessionPhase::Interactive {
            if let Some(total) = self.page_count() {
                events.push(ViewerEvent::ProgressChanged { page: self.current_page, total });
            }
        }
        if self.close_session() {
            events.push(ViewerEvent::PhaseChanged(SessionPhase::Closed));
        }
        events
    }

    /// Background cache writes finished since the last call.
    pub fn pending_events(&mut self) -> Vec<ViewerEvent> {
        self.loader.drain_notices().into_iter().map(notice_event).collect()
    }

    /// Waits until every background cache write started so far has reported,
    /// or `deadline` passes, and returns their outcomes.
    pub async fn flush_cache_writes(&mut self, deadline: Instant) -> Vec<ViewerEvent> {
        let mut events = self.pending_events();
        while self.loader.pending_writes() > 0 {
            match self.loader.next_notice(deadline).await {
                Some(notice) => events.push(notice_event(notice)),
                None => break,
            }
        }
        events
    }

    /// Layout of the mounted pages under the current transform.
    pub fn page_slots(&self) -> Vec<PageSlot> {
        let (Some(document), Some(window)) = (self.document(), self.window.as_ref()) else {
            return Vec::new();
        };

        let heights = window.mounted().filter_map(|page| {
            let size = document.page_size(page).ok()?;
            Some((page, self.transform.display_size(size).1))
        });
        layout_slots(heights, self.config.page_spacing_px)
    }

    async fn drive(&mut self, events: &mut Vec<ViewerEvent>) -> Result<(), LoadError> {
        let cached = {
            let session = self.session_mut("probe the cache")?;
            let (path, bypass) = (session.path().to_owned(), session.bypasses_cache());
            match self.loader.cache() {
                Some(cache) if !bypass => cache.exists(&path).await,
                _ => false,
            }
        };
        self.session_mut("probe the cache")?.probed(cached)?;

        loop {
            let session = self.session_mut("dispatch a load")?;
            let request = session.dispatch(Instant::now())?;
            events.push(ViewerEvent::PhaseChanged(SessionPhase::Loading));
            self.loader.spawn(&request);

            let step = loop {
                let report = self.loader.next_report(request.deadline).await;
                let session = self.session_mut("complete a load")?;
                let step = match report {
                    Some(report) => session.complete(report.ticket, report.result),
                    None => session.poll_timeout(Instant::now()),
                };
                if let Some(step) = step {
                    break step;
                }
            };

            match step {
                Step::Parsed => break,
                Step::Retry { error } => {
                    events.push(ViewerEvent::Retrying { attempt: request.ticket.attempt, error });
                    events.push(ViewerEvent::PhaseChanged(SessionPhase::Retrying));
                }
                Step::Failed { error } => {
                    events.push(ViewerEvent::PhaseChanged(SessionPhase::Failed));
                    events.push(ViewerEvent::Failed { error });
                    return Ok(());
                }
            }
        }

        self.mount_document(events)
    }

    fn mount_document(&mut self, events: &mut Vec<ViewerEvent>) -> Result<(), LoadError> {
        let session = self.session_mut("mount the document")?;
        let path = session.path().to_owned();
        let from_cache = session.from_cache();
        let total = session.document().map_or(0, ParsedDocument::page_count);

        events.push(ViewerEvent::PhaseChanged(SessionPhase::Parsed));
        events.push(ViewerEvent::Parsed { page_count: total, from_cache });

        let start = self.resume_page.unwrap_or(1).clamp(1, total.max(1));
        let profile = self.config.profile;
        let window = if profile.eager() {
            PageWindow::eager(total)
        } else {
            PageWindow::incremental(total, start, profile.lookahead)
        };
        events.push(ViewerEvent::PagesMounted(window.mounted().collect()));
        self.window = Some(window);
        self.current_page = start;

        if start > 1 && self.resumed_paths.insert(path.clone()) {
            events.push(ViewerEvent::Resumed { page: start, total });
        }
        if start > 1 {
            self.push_scroll_to(start, events);
        }

        self.session_mut("mount the document")?.enter_interactive()?;
        events.push(ViewerEvent::PhaseChanged(SessionPhase::Interactive));

        tracing::info!(
            path = %path,
            pages = total,
            from_cache,
            lazy = !profile.eager(),
            start,
            "document ready"
        );
        Ok(())
    }

    fn set_current_page(&mut self, page: u32, total: u32, events: &mut Vec<ViewerEvent>) {
        if page != self.current_page {
            self.current_page = page;
            events.push(ViewerEvent::ProgressChanged { page, total });
        }
    }

    fn push_scroll_to(&self, page: u32, events: &mut Vec<ViewerEvent>) {
        if let Some(offset_px) = page_offset(&self.page_slots(), page) {
            events.push(ViewerEvent::ScrollTo { page, offset_px });
        }
    }

    fn interactive_page_count(&self, action: &'static str) -> Result<u32, LoadError> {
        match (self.phase(), self.page_count()) {
            (SessionPhase::Interactive, Some(total)) => Ok(total),
            (phase, _) => Err(LoadError::InvalidTransition { action, phase }),
        }
    }

    fn session_mut(&mut self, action: &'static str) -> Result<&mut LoadSession, LoadError> {
        self.session
            .as_mut()
            .ok_or(LoadError::InvalidTransition { action, phase: SessionPhase::Uninitialized })
    }

    fn close_session(&mut self) -> bool {
        self.window = None;
        match self.session.as_mut() {
            Some(session) if session.phase() != SessionPhase::Closed => {
                tracing::debug!(path = %session.path(), "closing document");
                session.close();
                true
            }
            _ => false,
        }
    }
}

fn notice_event(notice: CacheNotice) -> ViewerEvent {
    match notice {
        CacheNotice::Stored { key, .. } => ViewerEvent::CacheStored { key },
        CacheNotice::StoreFailed { key, error } => ViewerEvent::CacheStoreFailed { key, error },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{CapabilityClass, DeviceTier, NetworkClass};
    use async_trait::async_trait;
    use bytes::Bytes;
    use content_tree::{ContentError, DeliveryRoute};
    use doc_model::DirectoryListing;
    use earmark_cache::MemoryBlobCache;
    use pdf_engine::fixtures::sample_pdf;
    use pdf_engine::LopdfParser;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Serves one document, optionally stalling or failing the primary route.
    struct StubContent {
        bytes: Bytes,
        primary_delay: Option<Duration>,
        primary_fails: bool,
        alternate_fails: bool,
        routes: Mutex<Vec<DeliveryRoute>>,
    }

    impl StubContent {
        fn serving(pages: usize) -> Self {
            Self {
                bytes: Bytes::from(sample_pdf(pages).expect("fixture")),
                primary_delay: None,
                primary_fails: false,
                alternate_fails: false,
                routes: Mutex::new(Vec::new()),
            }
        }

        fn routes(&self) -> Vec<DeliveryRoute> {
            self.routes.lock().expect("routes lock").clone()
        }
    }

    #[async_trait]
    impl ContentProvider for StubContent {
        async fn list_directory(&self, path: &str) -> Result<DirectoryListing, ContentError> {
            Err(ContentError::NotFound(path.to_owned()))
        }

        async fn fetch(&self, path: &str, route: DeliveryRoute) -> Result<Bytes, ContentError> {
            self.routes.lock().expect("routes lock").push(route);
            let fails = match route {
                DeliveryRoute::Primary => {
                    if let Some(delay) = self.primary_delay {
                        tokio::time::sleep(delay).await;
                    }
                    self.primary_fails
                }
                DeliveryRoute::Alternate => self.alternate_fails,
            };
            if fails {
                return Err(ContentError::Status { url: format!("stub://{path}"), status: 503 });
            }
            Ok(self.bytes.clone())
        }
    }

    fn profile(capability: CapabilityClass) -> LoadProfile {
        LoadProfile::new(DeviceTier::Desktop, capability, NetworkClass::Fast)
    }

    fn controller(
        content: Arc<StubContent>,
        cache: Option<SharedBlobStore>,
        capability: CapabilityClass,
    ) -> ViewerController {
        ViewerController::new(
            content,
            cache,
            Arc::new(LopdfParser::new()),
            ViewerConfig::new(profile(capability)),
        )
    }

    #[tokio::test]
    async fn standard_device_mounts_the_first_window() {
        let content = Arc::new(StubContent::serving(50));
        let mut viewer = controller(content, None, CapabilityClass::Standard);

        let events = viewer.open("book/a.pdf", None).await.expect("open");

        assert_eq!(viewer.phase(), SessionPhase::Interactive);
        assert_eq!(viewer.page_count(), Some(50));
        assert_eq!(viewer.mounted_pages(), (1..=7).collect::<Vec<_>>());
        assert!(viewer.is_lazy_loading());
        assert!(!viewer.from_cache());
        assert!(events.contains(&ViewerEvent::Parsed { page_count: 50, from_cache: false }));
        assert_eq!(events.last(), Some(&ViewerEvent::PhaseChanged(SessionPhase::Interactive)));
    }

    #[tokio::test]
    async fn high_performance_device_mounts_everything() {
        let content = Arc::new(StubContent::serving(50));
        let mut viewer = controller(content, None, CapabilityClass::HighPerformance);

        viewer.open("book/a.pdf", None).await.expect("open");

        assert_eq!(viewer.mounted_pages().len(), 50);
        assert!(!viewer.is_lazy_loading());
    }

    #[tokio::test]
    async fn cached_documents_skip_the_network() {
        let content = Arc::new(StubContent::serving(3));
        let cache: SharedBlobStore = Arc::new(MemoryBlobCache::new());
        cache.save("book/a.pdf", content.bytes.clone()).await.expect("seed cache");
        let mut viewer = controller(content.clone(), Some(cache), CapabilityClass::Standard);

        let events = viewer.open("/book/a.pdf", None).await.expect("open");

        assert!(viewer.from_cache());
        assert!(content.routes().is_empty());
        assert!(events.contains(&ViewerEvent::Parsed { page_count: 3, from_cache: true }));
    }

    #[tokio::test]
    async fn fetched_documents_are_cached_in_the_background() {
        let content = Arc::new(StubContent::serving(2));
        let cache: SharedBlobStore = Arc::new(MemoryBlobCache::new());
        let mut viewer = controller(content, Some(cache.clone()), CapabilityClass::Standard);

        viewer.open("a.pdf", None).await.expect("open");

        let notices = viewer.flush_cache_writes(Instant::now() + Duration::from_secs(5)).await;
        assert_eq!(notices, vec![ViewerEvent::CacheStored { key: "a.pdf".into() }]);
        assert!(cache.exists("a.pdf").await);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_primary_times_out_and_retries_on_alternate() {
        let mut stub = StubContent::serving(4);
        stub.primary_delay = Some(Duration::from_secs(60));
        let content = Arc::new(stub);
        let mut viewer = controller(content.clone(), None, CapabilityClass::Standard);

        let events = viewer.open("a.pdf", None).await.expect("open");

        assert_eq!(viewer.phase(), SessionPhase::Interactive);
        assert_eq!(content.routes(), vec![DeliveryRoute::Primary, DeliveryRoute::Alternate]);
        assert!(events.iter().any(|event| matches!(
            event,
            ViewerEvent::Retrying { attempt: 1, error } if error.contains("did not load")
        )));
    }

    #[tokio::test]
    async fn second_failure_is_terminal_until_retried() {
        let mut stub = StubContent::serving(4);
        stub.primary_fails = true;
        stub.alternate_fails = true;
        let content = Arc::new(stub);
        let mut viewer = controller(content.clone(), None, CapabilityClass::Standard);

        let events = viewer.open("a.pdf", None).await.expect("open");

        assert_eq!(viewer.phase(), SessionPhase::Failed);
        assert!(matches!(events.last(), Some(ViewerEvent::Failed { error }) if error.contains("503")));
        assert!(viewer.jump_to_page(2).is_err());

        let events = viewer.retry().await.expect("retry");
        assert_eq!(viewer.phase(), SessionPhase::Failed);
        assert_eq!(events.first(), Some(&ViewerEvent::PhaseChanged(SessionPhase::Probing)));
        assert_eq!(content.routes().len(), 4);
    }

    #[tokio::test]
    async fn recovery_drops_a_corrupt_cached_copy() {
        let content = Arc::new(StubContent::serving(3));
        let cache: SharedBlobStore = Arc::new(MemoryBlobCache::new());
        cache.save("a.pdf", Bytes::from_static(b"not a pdf")).await.expect("seed cache");
        let mut viewer = ViewerController::new(
            content.clone(),
            Some(cache.clone()),
            Arc::new(LopdfParser::new()),
            ViewerConfig { max_auto_retries: 0, ..ViewerConfig::new(profile(CapabilityClass::Standard)) },
        );

        viewer.open("a.pdf", None).await.expect("open");
        assert_eq!(viewer.phase(), SessionPhase::Failed);
        assert!(content.routes().is_empty());

        viewer.recover().await.expect("recover");
        assert_eq!(viewer.phase(), SessionPhase::Interactive);
        assert!(!viewer.from_cache());
        assert_eq!(content.routes(), vec![DeliveryRoute::Primary]);
    }

    #[tokio::test]
    async fn resume_starts_at_saved_page_and_notifies_once() {
        let content = Arc::new(StubContent::serving(20));
        let mut viewer = controller(content, None, CapabilityClass::Standard);

        let events = viewer.open("a.pdf", Some(12)).await.expect("open");
        assert_eq!(viewer.current_page(), 12);
        assert_eq!(viewer.mounted_pages(), (12..=18).collect::<Vec<_>>());
        assert!(events.contains(&ViewerEvent::Resumed { page: 12, total: 20 }));
        assert!(events.contains(&ViewerEvent::ScrollTo { page: 12, offset_px: 0.0 }));

        let events = viewer.open("a.pdf", Some(12)).await.expect("reopen");
        assert!(!events.iter().any(|event| matches!(event, ViewerEvent::Resumed { .. })));
    }

    #[tokio::test]
    async fn resume_page_is_clamped_to_the_document() {
        let content = Arc::new(StubContent::serving(5));
        let mut viewer = controller(content, None, CapabilityClass::Standard);

        viewer.open("a.pdf", Some(99)).await.expect("open");
        assert_eq!(viewer.current_page(), 5);
    }

    #[tokio::test]
    async fn scrolling_tracks_progress_and_grows_the_window() {
        let content = Arc::new(StubContent::serving(20));
        let mut viewer = controller(content, None, CapabilityClass::Standard);
        viewer.open("a.pdf", None).await.expect("open");

        let slots = viewer.page_slots();
        assert_eq!(slots.len(), 7);

        let page_two = ScrollViewport::new(slots[1].top_px, slots[1].height_px);
        let events = viewer.on_scroll(page_two);
        assert_eq!(events, vec![ViewerEvent::ProgressChanged { page: 2, total: 20 }]);

        let bottom = ScrollViewport::new(slots[6].top_px, slots[6].height_px);
        let events = viewer.on_scroll(bottom);
        assert!(events.contains(&ViewerEvent::ProgressChanged { page: 7, total: 20 }));
        assert!(events.contains(&ViewerEvent::PagesMounted(vec![8, 9, 10, 11, 12])));
    }

    #[tokio::test]
    async fn jumping_mounts_the_target_neighbourhood() {
        let content = Arc::new(StubContent::serving(40));
        let mut viewer = controller(content, None, CapabilityClass::Standard);
        viewer.open("a.pdf", None).await.expect("open");

        let events = viewer.jump_to_page(30).expect("jump");

        assert!(events.contains(&ViewerEvent::PagesMounted(vec![28, 29, 30, 31, 32])));
        assert!(events.contains(&ViewerEvent::ProgressChanged { page: 30, total: 40 }));
        assert_eq!(viewer.current_page(), 30);
    }

    #[tokio::test]
    async fn page_navigation_stops_at_the_bounds() {
        let content = Arc::new(StubContent::serving(2));
        let mut viewer = controller(content, None, CapabilityClass::Standard);
        viewer.open("a.pdf", None).await.expect("open");

        assert!(viewer.previous_page().expect("previous").is_empty());
        viewer.next_page().expect("next");
        assert_eq!(viewer.current_page(), 2);
        assert!(viewer.next_page().expect("next").is_empty());
    }

    #[tokio::test]
    async fn toggling_lazy_loading_switches_windows() {
        let content = Arc::new(StubContent::serving(10));
        let mut viewer = controller(content, None, CapabilityClass::Standard);
        viewer.open("a.pdf", None).await.expect("open");
        viewer.jump_to_page(4).expect("jump");

        let events = viewer.toggle_lazy_loading().expect("toggle");
        assert!(events.contains(&ViewerEvent::LazyLoadingChanged(false)));
        assert_eq!(viewer.mounted_pages().len(), 10);

        viewer.toggle_lazy_loading().expect("toggle back");
        assert!(viewer.is_lazy_loading());
        assert_eq!(viewer.mounted_pages(), (4..=10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn rotation_swaps_page_extents() {
        let content = Arc::new(StubContent::serving(1));
        let mut viewer = controller(content, None, CapabilityClass::Standard);
        viewer.open("a.pdf", None).await.expect("open");

        let upright = viewer.page_slots()[0].height_px;
        viewer.rotate_clockwise();
        let turned = viewer.page_slots()[0].height_px;

        assert!(turned < upright);
    }

    #[tokio::test]
    async fn exit_reports_final_position_and_closes() {
        let content = Arc::new(StubContent::serving(6));
        let mut viewer = controller(content, None, CapabilityClass::Standard);
        viewer.open("a.pdf", None).await.expect("open");
        viewer.jump_to_page(3).expect("jump");

        let events = viewer.exit();

        assert_eq!(
            events,
            vec![
                ViewerEvent::ProgressChanged { page: 3, total: 6 },
                ViewerEvent::PhaseChanged(SessionPhase::Closed),
            ]
        );
        assert!(viewer.mounted_pages().is_empty());
        assert!(viewer.exit().is_empty());
    }
}
