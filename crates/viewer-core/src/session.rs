//! Load lifecycle of one viewing session.
//!
//! ```text
//! Uninitialized -> Probing -> Loading -> Parsed -> Interactive
//!                     ^          |
//!                     |          v
//!                     |      Retrying -> Loading
//!                     |          |
//!                     +------ Failed          (any) -> Closed
//! ```
//!
//! Each dispatched attempt carries a [`LoadTicket`]; completions whose ticket
//! is not the current attempt's are dropped.

use std::time::Duration;

use content_tree::{ContentError, DeliveryRoute};
use pdf_engine::{ParsedDocument, PdfEngineError};
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionPhase {
    Uninitialized,
    Probing,
    Loading,
    Parsed,
    Interactive,
    Retrying,
    Failed,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadTicket {
    pub session: u64,
    pub attempt: u32,
}

/// One fetch-and-parse attempt handed to the loader.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadRequest {
    pub ticket: LoadTicket,
    pub path: String,
    pub route: DeliveryRoute,
    /// Whether the cached copy may satisfy this attempt.
    pub read_cache: bool,
    pub deadline: Instant,
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("cannot {action} while {phase:?}")]
    InvalidTransition { action: &'static str, phase: SessionPhase },
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error("could not read document: {0}")]
    Parse(#[from] PdfEngineError),
    #[error("document did not load within {0:?}")]
    TimedOut(Duration),
    #[error("loader task failed: {0}")]
    Task(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedDocument {
    pub document: ParsedDocument,
    pub from_cache: bool,
}

/// Result of feeding an attempt's outcome into the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Parsed,
    /// The session is in [`SessionPhase::Retrying`] and must be dispatched again.
    Retry { error: String },
    Failed { error: String },
}

#[derive(Debug)]
pub struct LoadSession {
    id: u64,
    path: String,
    timeout: Duration,
    max_auto_retries: u32,
    phase: SessionPhase,
    attempt: u32,
    failures: u32,
    route: DeliveryRoute,
    cached: bool,
    bypass_cache: bool,
    deadline: Option<Instant>,
    loaded: Option<LoadedDocument>,
    last_error: Option<String>,
}

impl LoadSession {
    pub fn new(id: u64, path: impl Into<String>, timeout: Duration, max_auto_retries: u32) -> Self {
        Self {
            id,
            path: path.into(),
            timeout,
            max_auto_retries,
            phase: SessionPhase::Uninitialized,
            attempt: 0,
            failures: 0,
            route: DeliveryRoute::Primary,
            cached: false,
            bypass_cache: false,
            deadline: None,
            loaded: None,
            last_error: None,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn route(&self) -> DeliveryRoute {
        self.route
    }

    pub fn bypasses_cache(&self) -> bool {
        self.bypass_cache
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn document(&self) -> Option<&ParsedDocument> {
        self.loaded.as_ref().map(|loaded| &loaded.document)
    }

    pub fn from_cache(&self) -> bool {
        self.loaded.as_ref().is_some_and(|loaded| loaded.from_cache)
    }

    pub fn begin(&mut self) -> Result<(), LoadError> {
        self.expect(&[SessionPhase::Uninitialized], "begin")?;
        self.transition(SessionPhase::Probing);
        Ok(())
    }

    /// Records whether a cached copy exists.
    pub fn probed(&mut self, cached: bool) -> Result<(), LoadError> {
        self.expect(&[SessionPhase::Probing], "finish probing")?;
        self.cached = cached && !self.bypass_cache;
        Ok(())
    }

    /// Starts the next attempt. Retries always go to the network over the
    /// current route.
    pub fn dispatch(&mut self, now: Instant) -> Result<LoadRequest, LoadError> {
        self.expect(&[SessionPhase::Probing, SessionPhase::Retrying], "dispatch")?;

        self.attempt += 1;
        let deadline = now + self.timeout;
        self.deadline = Some(deadline);
        self.transition(SessionPhase::Loading);

        Ok(LoadRequest {
            ticket: self.ticket(),
            path: self.path.clone(),
            route: self.route,
            read_cache: self.cached && self.failures == 0,
            deadline,
        })
    }

    /// Applies an attempt's outcome. Returns `None` for stale tickets.
    pub fn complete(
        &mut self,
        ticket: LoadTicket,
        result: Result<LoadedDocument, LoadError>,
    ) -> Option<Step> {
        if self.phase != SessionPhase::Loading || ticket != self.ticket() {
            tracing::debug!(
                session = self.id,
                ?ticket,
                current_attempt = self.attempt,
                phase = ?self.phase,
                "ignoring stale load result"
            );
            return None;
        }

        match result {
            Ok(loaded) => {
                self.deadline = None;
                self.loaded = Some(loaded);
                self.transition(SessionPhase::Parsed);
                Some(Step::Parsed)
            }
            Err(err) => Some(self.fail(err)),
        }
    }

    /// Fails the current attempt if its deadline has passed.
    pub fn poll_timeout(&mut self, now: Instant) -> Option<Step> {
        match (self.phase, self.deadline) {
            (SessionPhase::Loading, Some(deadline)) if now >= deadline => {
                Some(self.fail(LoadError::TimedOut(self.timeout)))
            }
            _ => None,
        }
    }

    pub fn enter_interactive(&mut self) -> Result<(), LoadError> {
        self.expect(&[SessionPhase::Parsed], "become interactive")?;
        self.transition(SessionPhase::Interactive);
        Ok(())
    }

    /// Manual retry after a failure; starts over from the cache probe.
    pub fn retry(&mut self) -> Result<(), LoadError> {
        self.expect(&[SessionPhase::Failed], "retry")?;
        self.reset_for_probe();
        Ok(())
    }

    /// Like [`retry`](Self::retry) but ignores any cached copy.
    pub fn recover(&mut self) -> Result<(), LoadError> {
        self.expect(&[SessionPhase::Failed], "recover")?;
        self.reset_for_probe();
        self.bypass_cache = true;
        Ok(())
    }

    pub fn close(&mut self) {
        self.transition(SessionPhase::Closed);
        self.deadline = None;
    }

    fn transition(&mut self, phase: SessionPhase) {
        tracing::debug!(
            session = self.id,
            from = ?self.phase,
            to = ?phase,
            "load session transition"
        );
        self.phase = phase;
    }

    fn ticket(&self) -> LoadTicket {
        LoadTicket { session: self.id, attempt: self.attempt }
    }

    fn fail(&mut self, err: LoadError) -> Step {
        self.failures += 1;
        self.deadline = None;
        let error = err.to_string();
        self.last_error = Some(error.clone());

        if self.failures <= self.max_auto_retries {
            tracing::warn!(
                session = self.id,
                path = %self.path,
                attempt = self.attempt,
                error = %error,
                "load attempt failed, retrying over alternate route"
            );
            self.route = DeliveryRoute::Alternate;
            self.transition(SessionPhase::Retrying);
            Step::Retry { error }
        } else {
            tracing::error!(
                session = self.id,
                path = %self.path,
                attempts = self.attempt,
                error = %error,
                "document failed to load"
            );
            self.transition(SessionPhase::Failed);
            Step::Failed { error }
        }
    }

    fn reset_for_probe(&mut self) {
        self.transition(SessionPhase::Probing);
        self.failures = 0;
        self.route = DeliveryRoute::Primary;
        self.cached = false;
        self.last_error = None;
    }

    fn expect(&self, allowed: &[SessionPhase], action: &'static str) -> Result<(), LoadError> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(LoadError::InvalidTransition { action, phase: self.phase })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdf_engine::PageSize;

    const TIMEOUT: Duration = Duration::from_secs(10);

    fn loaded() -> LoadedDocument {
        LoadedDocument {
            document: ParsedDocument::new(vec![PageSize::default(); 3]).expect("pages"),
            from_cache: false,
        }
    }

    fn loading_session(now: Instant) -> (LoadSession, LoadRequest) {
        let mut session = LoadSession::new(7, "book/a.pdf", TIMEOUT, 1);
        session.begin().expect("begin");
        session.probed(false).expect("probe");
        let request = session.dispatch(now).expect("dispatch");
        (session, request)
    }

    fn fetch_error() -> LoadError {
        LoadError::Content(ContentError::Status { url: "http://origin/a.pdf".into(), status: 502 })
    }

    #[test]
    fn happy_path_reaches_interactive() {
        let now = Instant::now();
        let (mut session, request) = loading_session(now);

        assert_eq!(request.ticket, LoadTicket { session: 7, attempt: 1 });
        assert_eq!(request.route, DeliveryRoute::Primary);
        assert_eq!(request.deadline, now + TIMEOUT);

        assert_eq!(session.complete(request.ticket, Ok(loaded())), Some(Step::Parsed));
        session.enter_interactive().expect("interactive");
        assert_eq!(session.phase(), SessionPhase::Interactive);
        assert_eq!(session.document().map(ParsedDocument::page_count), Some(3));
    }

    #[test]
    fn first_failure_retries_over_alternate_route() {
        let now = Instant::now();
        let (mut session, request) = loading_session(now);

        let step = session.complete(request.ticket, Err(fetch_error()));
        assert!(matches!(step, Some(Step::Retry { .. })));
        assert_eq!(session.phase(), SessionPhase::Retrying);

        let retry = session.dispatch(now).expect("dispatch retry");
        assert_eq!(retry.route, DeliveryRoute::Alternate);
        assert_eq!(retry.ticket.attempt, 2);
        assert!(!retry.read_cache);
    }

    #[test]
    fn second_failure_fails_the_session() {
        let now = Instant::now();
        let (mut session, request) = loading_session(now);
        session.complete(request.ticket, Err(fetch_error()));
        let retry = session.dispatch(now).expect("dispatch retry");

        let step = session.complete(retry.ticket, Err(fetch_error()));
        assert!(matches!(step, Some(Step::Failed { .. })));
        assert_eq!(session.phase(), SessionPhase::Failed);
        assert!(session.last_error().is_some_and(|error| error.contains("502")));
    }

    #[test]
    fn results_for_superseded_attempts_are_ignored() {
        let now = Instant::now();
        let (mut session, first) = loading_session(now);

        assert!(session.poll_timeout(now + TIMEOUT).is_some());
        let second = session.dispatch(now + TIMEOUT).expect("dispatch retry");

        // The first attempt finishes late, after its replacement was issued.
        assert_eq!(session.complete(first.ticket, Ok(loaded())), None);
        assert_eq!(session.phase(), SessionPhase::Loading);

        assert_eq!(session.complete(second.ticket, Ok(loaded())), Some(Step::Parsed));
    }

    #[test]
    fn results_from_other_sessions_are_ignored() {
        let now = Instant::now();
        let (mut session, request) = loading_session(now);
        let foreign = LoadTicket { session: request.ticket.session + 1, ..request.ticket };

        assert_eq!(session.complete(foreign, Ok(loaded())), None);
    }

    #[test]
    fn timeout_only_fires_after_the_deadline() {
        let now = Instant::now();
        let (mut session, _) = loading_session(now);

        assert_eq!(session.poll_timeout(now + Duration::from_secs(9)), None);
        match session.poll_timeout(now + TIMEOUT) {
            Some(Step::Retry { error }) => assert!(error.contains("10s")),
            other => panic!("expected retry, got {other:?}"),
        }
    }

    #[test]
    fn closed_sessions_ignore_late_results() {
        let now = Instant::now();
        let (mut session, request) = loading_session(now);
        session.close();

        assert_eq!(session.complete(request.ticket, Ok(loaded())), None);
        assert_eq!(session.poll_timeout(now + TIMEOUT), None);
        assert_eq!(session.phase(), SessionPhase::Closed);
    }

    #[test]
    fn manual_retry_starts_over_on_the_primary_route() {
        let now = Instant::now();
        let mut session = LoadSession::new(1, "a.pdf", TIMEOUT, 0);
        session.begin().expect("begin");
        session.probed(true).expect("probe");
        let request = session.dispatch(now).expect("dispatch");
        assert!(request.read_cache);
        session.complete(request.ticket, Err(fetch_error()));
        assert_eq!(session.phase(), SessionPhase::Failed);

        session.retry().expect("retry");
        session.probed(true).expect("probe");
        let request = session.dispatch(now).expect("dispatch");
        assert_eq!(request.route, DeliveryRoute::Primary);
        assert!(request.read_cache);
        assert!(session.last_error().is_none());
    }

    #[test]
    fn recovery_ignores_the_cached_copy() {
        let now = Instant::now();
        let mut session = LoadSession::new(1, "a.pdf", TIMEOUT, 0);
        session.begin().expect("begin");
        session.probed(true).expect("probe");
        let request = session.dispatch(now).expect("dispatch");
        session.complete(request.ticket, Err(fetch_error()));

        session.recover().expect("recover");
        session.probed(true).expect("probe");
        let request = session.dispatch(now).expect("dispatch");
        assert!(!request.read_cache);
        assert!(session.bypasses_cache());
    }

    #[test]
    fn out_of_order_transitions_are_rejected() {
        let mut session = LoadSession::new(1, "a.pdf", TIMEOUT, 1);

        assert!(matches!(
            session.dispatch(Instant::now()),
            Err(LoadError::InvalidTransition { phase: SessionPhase::Uninitialized, .. })
        ));
        assert!(session.retry().is_err());
        assert!(session.enter_interactive().is_err());
    }
}
