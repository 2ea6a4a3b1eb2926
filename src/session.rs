//! Wiring: load assets, build the index, hand it to the query controller.
//!
//! Search and the navigation tree load independently. A failure in one turns
//! into that component's error view and never affects the other.

use crate::assets::AssetSource;
use crate::config::Config;
use crate::controller::{ControllerHandle, Committed, QueryController, SearchView, Searcher};
use crate::corpus::Corpus;
use crate::error::LoadError;
use crate::search::{
    EngineOptions, ExternalBackend, ExternalEngine, IndexHandle, QueryEngine, QueryResult,
};
use crate::store::ClientState;
use crate::tree::{FileTreeData, TreeView};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Outcome of loading the navigation tree.
#[derive(Debug)]
pub enum TreeLoad {
    Ready(TreeView),
    Failed(String),
}

/// Load `filetree.json` and mount it for the page at `location`.
pub async fn load_tree(
    source: &dyn AssetSource,
    config: &Config,
    state: ClientState,
    location: &str,
) -> TreeLoad {
    match FileTreeData::load(source, &config.tree_asset).await {
        Ok(data) => TreeLoad::Ready(TreeView::mount(data, state, location)),
        Err(e) => {
            tracing::warn!("File tree unavailable: {}", e);
            TreeLoad::Failed(e.to_string())
        }
    }
}

/// The searcher most recently handed to the controller. Its index and corpus
/// always come from the same load.
#[derive(Default)]
struct Loaded {
    searcher: Option<Searcher>,
}

/// A running search: debounced input in, committed views out.
pub struct SearchSession {
    config: Config,
    source: Arc<dyn AssetSource>,
    controller: QueryController,
    loaded: Arc<Mutex<Loaded>>,
    loading: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for SearchSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchSession")
            .field("controller", &self.controller)
            .finish_non_exhaustive()
    }
}

impl SearchSession {
    /// Start a session backed by the in-memory index. Loading runs in the
    /// background; input typed meanwhile is answered once it finishes.
    pub fn start(source: Arc<dyn AssetSource>, config: Config) -> Self {
        let mut session = Self::idle(source, config);
        let task = tokio::spawn(load_local(
            Arc::clone(&session.source),
            session.config.clone(),
            Arc::clone(&session.loaded),
            session.controller.handle(),
        ));
        session.loading = Some(task);
        session
    }

    /// Start a session ranked by a hosted engine. The corpus is still loaded
    /// for titles and the recency view. If the engine fails to initialize the
    /// view becomes [`SearchView::Unavailable`].
    pub fn start_with_engine<E>(
        source: Arc<dyn AssetSource>,
        config: Config,
        engine: Arc<E>,
        options: EngineOptions,
    ) -> Self
    where
        E: ExternalEngine + 'static,
    {
        let mut session = Self::idle(source, config);
        let source = Arc::clone(&session.source);
        let config = session.config.clone();
        let loaded = Arc::clone(&session.loaded);
        let handle = session.controller.handle();

        let task = tokio::spawn(async move {
            let corpus = match Corpus::load(source.as_ref(), &config.corpus_asset).await {
                Ok(corpus) => corpus,
                Err(e) => return fail_load(&handle, &e),
            };
            let backend = match ExternalBackend::connect(engine, options).await {
                Ok(backend) => backend,
                Err(e) => {
                    tracing::warn!("{}", e);
                    return handle.fail(SearchView::from(e));
                }
            };
            let searcher = Searcher {
                engine: Arc::new(QueryEngine::new(corpus, &config)),
                backend: Arc::new(backend),
            };
            loaded.lock().unwrap_or_else(PoisonError::into_inner).searcher = Some(searcher.clone());
            handle.ready(searcher);
        });
        session.loading = Some(task);
        session
    }

    fn idle(source: Arc<dyn AssetSource>, config: Config) -> Self {
        let controller = QueryController::spawn(config.quiescence());
        Self {
            config,
            source,
            controller,
            loaded: Arc::new(Mutex::new(Loaded::default())),
            loading: None,
        }
    }

    /// Wait for the initial load to finish (successfully or not).
    pub async fn loaded(&mut self) {
        if let Some(task) = self.loading.take()
            && let Err(e) = task.await
        {
            tracing::warn!("Search loader task ended abnormally: {}", e);
        }
    }

    /// Re-fetch the corpus and publish a rebuilt index. Queries already in
    /// flight finish against the previous index and corpus.
    pub async fn reload(&self) -> Result<(), LoadError> {
        let handle = self.controller.handle();
        let corpus = match Corpus::load(self.source.as_ref(), &self.config.corpus_asset).await {
            Ok(corpus) => corpus,
            Err(e) => {
                fail_load(&handle, &e);
                return Err(e);
            }
        };
        publish(&self.loaded, &self.config, corpus, &handle);
        Ok(())
    }

    pub fn input(&self, text: impl Into<String>) {
        self.controller.input(text);
    }

    pub fn view(&self) -> SearchView {
        self.controller.view()
    }

    pub fn subscribe(&self) -> watch::Receiver<Committed> {
        self.controller.subscribe()
    }

    pub fn controller(&self) -> &QueryController {
        &self.controller
    }

    /// The searcher from the latest successful load.
    pub fn searcher(&self) -> Option<Searcher> {
        self.loaded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .searcher
            .clone()
    }

    /// Recently updated pages, once the corpus has loaded.
    pub fn history(&self, limit: Option<usize>) -> Option<Vec<QueryResult>> {
        self.searcher().map(|searcher| searcher.engine.history(limit))
    }

    /// Load and mount the navigation tree from this session's asset source.
    pub async fn load_tree(&self, state: ClientState, location: &str) -> TreeLoad {
        load_tree(self.source.as_ref(), &self.config, state, location).await
    }
}

fn fail_load(handle: &ControllerHandle, error: &LoadError) {
    tracing::warn!("Search corpus unavailable: {}", error);
    handle.fail(SearchView::Failed(error.to_string()));
}

async fn load_local(
    source: Arc<dyn AssetSource>,
    config: Config,
    loaded: Arc<Mutex<Loaded>>,
    handle: ControllerHandle,
) {
    match Corpus::load(source.as_ref(), &config.corpus_asset).await {
        Ok(corpus) => publish(&loaded, &config, corpus, &handle),
        Err(e) => fail_load(&handle, &e),
    }
}

/// Build a fresh index for `corpus` and signal readiness. The index is never
/// shared with an earlier searcher, so a query dispatched before a reload
/// sees the old index with the old corpus.
fn publish(loaded: &Mutex<Loaded>, config: &Config, corpus: Corpus, handle: &ControllerHandle) {
    let engine = Arc::new(QueryEngine::new(corpus, config));
    let index = Arc::new(IndexHandle::new(engine.corpus(), config));
    let snapshot = index.snapshot();
    tracing::info!(
        "Search index ready: {} documents, {} terms",
        snapshot.document_count(),
        snapshot.term_count()
    );
    let searcher = Searcher {
        engine,
        backend: index,
    };
    loaded.lock().unwrap_or_else(PoisonError::into_inner).searcher = Some(searcher.clone());
    handle.ready(searcher);
}
