use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use content_tree::ContentProvider;
use earmark_cache::SharedBlobStore;
use pdf_engine::DocumentParser;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::Instrument;

use crate::session::{LoadError, LoadRequest, LoadTicket, LoadedDocument};

#[derive(Debug)]
pub struct LoadReport {
    pub ticket: LoadTicket,
    pub result: Result<LoadedDocument, LoadError>,
}

/// Outcome of a background cache write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheNotice {
    Stored { key: String, bytes: usize },
    StoreFailed { key: String, error: String },
}

/// Runs fetch-and-parse attempts off the caller's task.
///
/// Reports arrive in completion order, which may not be dispatch order; the
/// session's tickets sort that out.
pub struct DocumentLoader {
    content: Arc<dyn ContentProvider>,
    cache: Option<SharedBlobStore>,
    parser: Arc<dyn DocumentParser>,
    reports_tx: mpsc::UnboundedSender<LoadReport>,
    reports_rx: mpsc::UnboundedReceiver<LoadReport>,
    notices_tx: mpsc::UnboundedSender<CacheNotice>,
    notices_rx: mpsc::UnboundedReceiver<CacheNotice>,
    writes_started: Arc<AtomicUsize>,
    notices_seen: usize,
}

impl DocumentLoader {
    pub fn new(
        content: Arc<dyn ContentProvider>,
        cache: Option<SharedBlobStore>,
        parser: Arc<dyn DocumentParser>,
    ) -> Self {
        let (reports_tx, reports_rx) = mpsc::unbounded_channel();
        let (notices_tx, notices_rx) = mpsc::unbounded_channel();
        Self {
            content,
            cache,
            parser,
            reports_tx,
            reports_rx,
            notices_tx,
            notices_rx,
            writes_started: Arc::new(AtomicUsize::new(0)),
            notices_seen: 0,
        }
    }

    pub fn cache(&self) -> Option<&SharedBlobStore> {
        self.cache.as_ref()
    }

    pub fn content(&self) -> &Arc<dyn ContentProvider> {
        &self.content
    }

    /// Starts an attempt on the runtime. Must be called from within Tokio.
    pub fn spawn(&self, request: &LoadRequest) {
        let content = Arc::clone(&self.content);
        let cache = self.cache.clone();
        let parser = Arc::clone(&self.parser);
        let reports = self.reports_tx.clone();
        let notices = self.notices_tx.clone();
        let writes = Arc::clone(&self.writes_started);
        let request = request.clone();
        let span = tracing::info_span!(
            "load_document",
            path = %request.path,
            attempt = request.ticket.attempt,
            route = ?request.route,
        );

        tokio::spawn(
            async move {
                let result = load_document(content, cache, parser, notices, writes, &request).await;
                if let Err(err) = &result {
                    tracing::debug!(error = %err, "attempt finished with error");
                }
                // The receiver lives as long as the loader; a send error means it is gone.
                let _ = reports.send(LoadReport { ticket: request.ticket, result });
            }
            .instrument(span),
        );
    }

    /// Waits for the next report. Returns `None` once `deadline` passes.
    pub async fn next_report(&mut self, deadline: Instant) -> Option<LoadReport> {
        match tokio::time::timeout_at(deadline, self.reports_rx.recv()).await {
            Ok(report) => report,
            Err(_) => None,
        }
    }

    pub fn drain_notices(&mut self) -> Vec<CacheNotice> {
        let mut notices = Vec::new();
        while let Ok(notice) = self.notices_rx.try_recv() {
            notices.push(notice);
        }
        self.notices_seen += notices.len();
        notices
    }

    /// Background cache writes whose outcome has not been received yet.
    pub fn pending_writes(&self) -> usize {
        self.writes_started.load(Ordering::Acquire).saturating_sub(self.notices_seen)
    }

    /// Waits for the next cache write outcome. Returns `None` once `deadline`
    /// passes.
    pub async fn next_notice(&mut self, deadline: Instant) -> Option<CacheNotice> {
        let notice = tokio::time::timeout_at(deadline, self.notices_rx.recv()).await.ok()??;
        self.notices_seen += 1;
        Some(notice)
    }
}

async fn load_document(
    content: Arc<dyn ContentProvider>,
    cache: Option<SharedBlobStore>,
    parser: Arc<dyn DocumentParser>,
    notices: mpsc::UnboundedSender<CacheNotice>,
    writes: Arc<AtomicUsize>,
    request: &LoadRequest,
) -> Result<LoadedDocument, LoadError> {
    let cached = match (&cache, request.read_cache) {
        (Some(cache), true) => cache.get(&request.path).await,
        _ => None,
    };

    let (bytes, from_cache) = match cached {
        Some(bytes) => {
            tracing::debug!(bytes = bytes.len(), "serving document from cache");
            (bytes, true)
        }
        None => {
            let bytes = content.fetch(&request.path, request.route).await?;
            tracing::debug!(bytes = bytes.len(), "document fetched");
            if let Some(cache) = cache {
                writes.fetch_add(1, Ordering::AcqRel);
                store_in_background(cache, request.path.clone(), bytes.clone(), notices);
            }
            (bytes, false)
        }
    };

    let document = tokio::task::spawn_blocking(move || parser.parse(&bytes))
        .await
        .map_err(|err| LoadError::Task(err.to_string()))??;

    Ok(LoadedDocument { document, from_cache })
}

fn store_in_background(
    cache: SharedBlobStore,
    key: String,
    bytes: bytes::Bytes,
    notices: mpsc::UnboundedSender<CacheNotice>,
) {
    tokio::spawn(async move {
        let len = bytes.len();
        let notice = match cache.save(&key, bytes).await {
            Ok(()) => CacheNotice::Stored { key, bytes: len },
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "failed to cache document");
                CacheNotice::StoreFailed { key, error: err.to_string() }
            }
        };
        let _ = notices.send(notice);
    });
}
