//! Debounced, latest-wins query dispatch.
//!
//! Keystrokes go in through [`QueryController::input`]. A query is dispatched
//! only after input has been quiet for the quiescence window. Every dispatch is
//! tagged with a sequence number from a [`SequenceGate`]; a completion is
//! committed to the view only if its number is still the latest issued, so a
//! slow superseded query can never overwrite a newer one.
//!
//! Cancellation is result-level only: in-flight lookups run to completion and
//! their results are dropped.

use crate::error::SearchError;
use crate::search::{QueryEngine, QueryOutcome, SearchBackend};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

/// What the result area should show.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchView {
    /// Corpus (and engine) still loading; nothing typed yet.
    Loading,
    /// A query arrived before the engine was ready. It runs once ready.
    NotReady { query: String },
    /// Results for the latest dispatched query.
    Ready(QueryOutcome),
    /// The search engine could not be loaded or initialized.
    Unavailable(String),
    /// Loading the corpus, or a lookup, failed.
    Failed(String),
}

impl From<SearchError> for SearchView {
    fn from(error: SearchError) -> Self {
        match error {
            SearchError::Unavailable(reason) => Self::Unavailable(reason),
            SearchError::NotReady => Self::NotReady {
                query: String::new(),
            },
            SearchError::Engine(reason) => Self::Failed(reason),
        }
    }
}

/// A view together with the sequence number it was committed under.
#[derive(Debug, Clone, PartialEq)]
pub struct Committed {
    pub seq: u64,
    pub view: SearchView,
}

/// Issues monotonically increasing sequence numbers and admits only the
/// latest one to commit.
#[derive(Debug, Default)]
pub struct SequenceGate {
    latest: Mutex<u64>,
    discarded: AtomicU64,
}

impl SequenceGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag a new dispatch. Supersedes every earlier number.
    pub fn issue(&self) -> u64 {
        let mut latest = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        *latest += 1;
        *latest
    }

    pub fn is_current(&self, seq: u64) -> bool {
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner) == seq
    }

    /// Run `apply` if `seq` is still the latest issued. The check and the
    /// apply happen under one lock, so no newer number can slip in between.
    pub fn commit(&self, seq: u64, apply: impl FnOnce()) -> bool {
        let latest = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        if *latest != seq {
            self.discarded.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("Discarding stale result #{} (latest #{})", seq, *latest);
            return false;
        }
        apply();
        true
    }

    /// Completions dropped because a newer dispatch existed.
    pub fn discarded(&self) -> u64 {
        self.discarded.load(Ordering::Relaxed)
    }
}

/// Engine and backend a dispatched query runs against.
#[derive(Clone)]
pub struct Searcher {
    pub engine: Arc<QueryEngine>,
    pub backend: Arc<dyn SearchBackend>,
}

impl std::fmt::Debug for Searcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Searcher")
            .field("records", &self.engine.corpus().len())
            .finish_non_exhaustive()
    }
}

enum Event {
    Input(String),
    Ready(Searcher),
    Failed(SearchView),
}

enum Readiness {
    Pending,
    Ready(Searcher),
    Failed,
}

/// Cloneable sender for readiness and input events, for loader tasks.
#[derive(Clone)]
pub struct ControllerHandle {
    events: mpsc::UnboundedSender<Event>,
}

impl std::fmt::Debug for ControllerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerHandle").finish_non_exhaustive()
    }
}

impl ControllerHandle {
    /// Feed the current contents of the search box.
    pub fn input(&self, text: impl Into<String>) {
        self.send(Event::Input(text.into()));
    }

    /// The engine is ready; any waiting query is dispatched.
    pub fn ready(&self, searcher: Searcher) {
        self.send(Event::Ready(searcher));
    }

    /// Loading failed; `view` is shown until the engine becomes ready again.
    pub fn fail(&self, view: SearchView) {
        self.send(Event::Failed(view));
    }

    fn send(&self, event: Event) {
        if self.events.send(event).is_err() {
            tracing::warn!("Query controller has stopped; event dropped");
        }
    }
}

/// Handle to the background dispatch loop. Dropping it stops the loop.
pub struct QueryController {
    handle: ControllerHandle,
    view: watch::Receiver<Committed>,
    gate: Arc<SequenceGate>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for QueryController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryController")
            .field("committed_seq", &self.view.borrow().seq)
            .field("discarded", &self.gate.discarded())
            .finish_non_exhaustive()
    }
}

impl QueryController {
    /// Start the dispatch loop on the current tokio runtime.
    pub fn spawn(quiescence: Duration) -> Self {
        let (events, rx) = mpsc::unbounded_channel();
        let (view_tx, view) = watch::channel(Committed {
            seq: 0,
            view: SearchView::Loading,
        });
        let gate = Arc::new(SequenceGate::new());
        let cancel = CancellationToken::new();

        let task = tokio::spawn(
            Dispatcher {
                quiescence,
                gate: Arc::clone(&gate),
                view: Arc::new(view_tx),
                readiness: Readiness::Pending,
                last_query: String::new(),
            }
            .run(rx, cancel.clone()),
        );

        Self {
            handle: ControllerHandle { events },
            view,
            gate,
            cancel,
            task: Some(task),
        }
    }

    pub fn handle(&self) -> ControllerHandle {
        self.handle.clone()
    }

    pub fn input(&self, text: impl Into<String>) {
        self.handle.input(text);
    }

    pub fn ready(&self, searcher: Searcher) {
        self.handle.ready(searcher);
    }

    pub fn fail(&self, view: SearchView) {
        self.handle.fail(view);
    }

    /// Latest committed view.
    pub fn view(&self) -> SearchView {
        self.view.borrow().view.clone()
    }

    /// Watch committed views.
    pub fn subscribe(&self) -> watch::Receiver<Committed> {
        self.view.clone()
    }

    pub fn gate(&self) -> &SequenceGate {
        &self.gate
    }

    /// Stop the loop and wait for it to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for QueryController {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct Dispatcher {
    quiescence: Duration,
    gate: Arc<SequenceGate>,
    view: Arc<watch::Sender<Committed>>,
    readiness: Readiness,
    /// Most recent settled query; re-run when the engine becomes ready.
    last_query: String,
}

impl Dispatcher {
    async fn run(mut self, mut events: mpsc::UnboundedReceiver<Event>, cancel: CancellationToken) {
        let mut pending: Option<String> = None;
        let mut deadline: Option<Instant> = None;

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                event = events.recv() => match event {
                    None => break,
                    Some(Event::Input(text)) => {
                        if let Readiness::Ready(searcher) = &self.readiness {
                            searcher.backend.preload(&text);
                        }
                        pending = Some(text);
                        deadline = Some(Instant::now() + self.quiescence);
                    }
                    Some(Event::Ready(searcher)) => {
                        tracing::info!(
                            "Search ready: {} records",
                            searcher.engine.corpus().len()
                        );
                        self.readiness = Readiness::Ready(searcher);
                        if pending.is_none() {
                            self.dispatch();
                        }
                    }
                    Some(Event::Failed(view)) => {
                        self.readiness = Readiness::Failed;
                        pending = None;
                        deadline = None;
                        self.commit_now(view);
                    }
                },
                () = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    deadline = None;
                    if let Some(query) = pending.take() {
                        self.last_query = query;
                        self.dispatch();
                    }
                }
            }
        }

        tracing::debug!("Query controller stopped");
    }

    fn commit_now(&self, view: SearchView) {
        let seq = self.gate.issue();
        let sender = Arc::clone(&self.view);
        self.gate.commit(seq, move || {
            sender.send_replace(Committed { seq, view });
        });
    }

    fn dispatch(&self) {
        let query = self.last_query.clone();
        match &self.readiness {
            Readiness::Pending => {
                tracing::debug!("Query '{}' waiting for search to become ready", query);
                self.commit_now(SearchView::NotReady { query });
            }
            // The failure view stays in place.
            Readiness::Failed => {}
            Readiness::Ready(searcher) => {
                let seq = self.gate.issue();
                tracing::debug!("Dispatching query #{} '{}'", seq, query);

                let searcher = searcher.clone();
                let gate = Arc::clone(&self.gate);
                let sender = Arc::clone(&self.view);
                tokio::spawn(async move {
                    let view = match searcher
                        .engine
                        .resolve_with(searcher.backend.as_ref(), &query)
                        .await
                    {
                        Ok(outcome) => SearchView::Ready(outcome),
                        Err(error) => {
                            tracing::warn!("Query '{}' failed: {}", query, error);
                            SearchView::from(error)
                        }
                    };
                    gate.commit(seq, move || {
                        sender.send_replace(Committed { seq, view });
                    });
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::check;

    #[test]
    fn gate_admits_only_latest() {
        let gate = SequenceGate::new();
        let first = gate.issue();
        let second = gate.issue();
        check!(second > first);

        let mut applied = Vec::new();
        check!(gate.commit(second, || applied.push(second)));
        check!(!gate.commit(first, || applied.push(first)));
        check!(applied == vec![second]);
        check!(gate.discarded() == 1);
        check!(gate.is_current(second));
        check!(!gate.is_current(first));
    }

    #[test]
    fn search_errors_map_to_views() {
        check!(
            SearchView::from(SearchError::Unavailable("x".to_string()))
                == SearchView::Unavailable("x".to_string())
        );
        check!(SearchView::from(SearchError::Engine("y".to_string())) == SearchView::Failed("y".to_string()));
    }
}
