//! Filter and search queries
//!
//! A field is in one of three query modes, fixed at construction. Filter
//! mode only writes the normalized filter text; the per-option
//! `matches_filter` cells do the rest. Search mode hands the text to a
//! [`SearchProvider`] after a debounce and applies whatever comes back,
//! provided nothing newer was asked for in the meantime.
//!
//! Staleness is decided by a generation token. Every input and every
//! dispatch bumps it, each [`SearchResponder`] carries the token it was
//! dispatched with, and an outcome is applied only if its token is still the
//! current one. In-flight provider work is never interrupted; its result is
//! just ignored.

use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use fieldkit_core::{ReactiveGraph, ReadSignal, Signal};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::error::SearchError;
use crate::option::{normalize, OptionDescriptor};

/// Produces options for a search query
///
/// The provider may resolve the responder right away or hand it to some
/// other task and resolve it later. Providers must not touch the field.
pub trait SearchProvider {
    fn search(&self, query: &str, responder: SearchResponder);
}

impl<F> SearchProvider for F
where
    F: Fn(&str, SearchResponder),
{
    fn search(&self, query: &str, responder: SearchResponder) {
        self(query, responder)
    }
}

/// Adapt a blocking lookup into a provider that resolves immediately
pub fn sync_search<F>(lookup: F) -> impl Fn(&str, SearchResponder)
where
    F: Fn(&str) -> Result<Vec<OptionDescriptor>, SearchError>,
{
    move |query: &str, responder: SearchResponder| responder.resolve(lookup(query))
}

/// A settled search, on its way back to the field
#[derive(Debug)]
pub struct SearchOutcome {
    pub token: u64,
    pub query: String,
    pub result: Result<Vec<OptionDescriptor>, SearchError>,
}

/// One-shot handle for answering a dispatched search
///
/// `Send`, so it can be moved into an async task. Dropping it without
/// resolving reports [`SearchError::Abandoned`].
#[derive(Debug)]
pub struct SearchResponder {
    token: u64,
    query: String,
    sender: Option<UnboundedSender<SearchOutcome>>,
}

impl SearchResponder {
    pub fn token(&self) -> u64 {
        self.token
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn resolve(mut self, result: Result<Vec<OptionDescriptor>, SearchError>) {
        self.send(result);
    }

    pub fn succeed(self, options: Vec<OptionDescriptor>) {
        self.resolve(Ok(options));
    }

    pub fn fail(self, message: impl Into<String>) {
        self.resolve(Err(SearchError::failed(message)));
    }

    fn send(&mut self, result: Result<Vec<OptionDescriptor>, SearchError>) {
        let Some(sender) = self.sender.take() else {
            return;
        };
        let outcome = SearchOutcome {
            token: self.token,
            query: std::mem::take(&mut self.query),
            result,
        };
        // The receiver is gone once the field is destroyed
        if sender.send(outcome).is_err() {
            tracing::trace!(token = self.token, "search resolved after the field was destroyed");
        }
    }
}

impl Drop for SearchResponder {
    fn drop(&mut self) {
        if self.sender.is_some() {
            self.send(Err(SearchError::Abandoned));
        }
    }
}

/// How a field turns typed text into visible options
#[derive(Clone, Default)]
pub enum QueryMode {
    /// No query input
    #[default]
    None,
    /// Client-side filtering of the registered options
    Filter,
    /// Options come from a provider
    Search(Rc<dyn SearchProvider>),
}

impl QueryMode {
    pub fn search(provider: impl SearchProvider + 'static) -> Self {
        QueryMode::Search(Rc::new(provider))
    }

    pub fn is_filter(&self) -> bool {
        matches!(self, QueryMode::Filter)
    }

    pub fn is_search(&self) -> bool {
        matches!(self, QueryMode::Search(_))
    }
}

impl fmt::Debug for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryMode::None => f.write_str("None"),
            QueryMode::Filter => f.write_str("Filter"),
            QueryMode::Search(_) => f.write_str("Search(..)"),
        }
    }
}

pub struct QueryController {
    mode: QueryMode,
    filter_text: Signal<String>,
    search_text: Signal<String>,
    querying: Signal<bool>,
    generation: u64,
    debounce: Duration,
    sender: UnboundedSender<SearchOutcome>,
    outcomes: UnboundedReceiver<SearchOutcome>,
    /// Outcomes taken off the channel but not yet drained
    settled: VecDeque<SearchOutcome>,
    /// Dispatched searches whose outcome has not arrived
    in_flight: usize,
}

impl QueryController {
    pub fn new(graph: &mut ReactiveGraph, mode: QueryMode, debounce: Duration) -> Self {
        let (sender, outcomes) = mpsc::unbounded_channel();
        Self {
            mode,
            filter_text: graph.create_signal(String::new()),
            search_text: graph.create_signal(String::new()),
            querying: graph.create_signal(false),
            generation: 0,
            debounce,
            sender,
            outcomes,
            settled: VecDeque::new(),
            in_flight: 0,
        }
    }

    pub fn mode(&self) -> &QueryMode {
        &self.mode
    }

    /// Normalized filter text; always empty outside filter mode
    pub fn filter_text(&self) -> ReadSignal<String> {
        self.filter_text.read_only()
    }

    /// Raw search text; always empty outside search mode
    pub fn search_text(&self) -> ReadSignal<String> {
        self.search_text.read_only()
    }

    /// Whether a search is outstanding
    pub fn querying(&self) -> ReadSignal<bool> {
        self.querying.read_only()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    pub fn is_querying(&self, graph: &ReactiveGraph) -> bool {
        graph.get(self.querying).unwrap_or(false)
    }

    /// Apply typed text
    ///
    /// Returns the debounce to arm when a search has to be dispatched.
    pub fn set_query(&mut self, graph: &mut ReactiveGraph, text: &str) -> Option<Duration> {
        match self.mode {
            QueryMode::None => {
                tracing::trace!("ignoring query input, field has no query mode");
                None
            }
            QueryMode::Filter => {
                graph.set(self.filter_text, normalize(text));
                None
            }
            QueryMode::Search(_) => {
                if !graph.set(self.search_text, text.to_string()) {
                    return None;
                }
                self.generation += 1;
                graph.set(self.querying, true);
                Some(self.debounce)
            }
        }
    }

    /// Call the provider with the current search text
    ///
    /// Runs when the debounce fires. Outcomes resolved synchronously are
    /// waiting in the channel by the time this returns.
    pub fn dispatch(&mut self, graph: &ReactiveGraph) {
        let QueryMode::Search(provider) = &self.mode else {
            return;
        };
        self.generation += 1;
        let query = graph.get(self.search_text).unwrap_or_default();
        tracing::debug!(token = self.generation, query = %query, "dispatching search");
        self.in_flight += 1;

        let responder = SearchResponder {
            token: self.generation,
            query: query.clone(),
            sender: Some(self.sender.clone()),
        };
        provider.search(&query, responder);
    }

    /// Collect settled searches
    ///
    /// Returns the options of the current search if it succeeded. Stale
    /// outcomes are dropped. A failure clears the querying flag and leaves
    /// the caller's options alone.
    pub fn drain(&mut self, graph: &mut ReactiveGraph) -> Option<Vec<OptionDescriptor>> {
        self.poll_settled();
        let mut accepted = None;
        while let Some(outcome) = self.settled.pop_front() {
            if outcome.token != self.generation {
                tracing::debug!(
                    token = outcome.token,
                    current = self.generation,
                    query = %outcome.query,
                    "dropping stale search result"
                );
                continue;
            }

            graph.set(self.querying, false);
            match outcome.result {
                Ok(options) => {
                    tracing::debug!(query = %outcome.query, count = options.len(), "search settled");
                    accepted = Some(options);
                }
                Err(error) => {
                    tracing::warn!(query = %outcome.query, %error, "search failed, keeping previous options");
                }
            }
        }
        accepted
    }

    /// Number of dispatched searches whose outcome has not arrived yet
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Whether an outcome is waiting to be drained
    pub fn poll_settled(&mut self) -> bool {
        while let Ok(outcome) = self.outcomes.try_recv() {
            self.receive(outcome);
        }
        !self.settled.is_empty()
    }

    /// Wait until an outcome is waiting to be drained
    ///
    /// Returns right away when one already is or when no search is in
    /// flight. Every responder reports exactly once (dropping it reports
    /// [`SearchError::Abandoned`]), so this only waits as long as the
    /// provider holds on to a responder.
    pub async fn wait_settled(&mut self) {
        if self.poll_settled() || self.in_flight == 0 {
            return;
        }
        if let Some(outcome) = self.outcomes.recv().await {
            self.receive(outcome);
        }
    }

    fn receive(&mut self, outcome: SearchOutcome) {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.settled.push_back(outcome);
    }

    /// Reset the query text
    ///
    /// In search mode any in-flight search is invalidated as well.
    pub fn clear(&mut self, graph: &mut ReactiveGraph) -> bool {
        match self.mode {
            QueryMode::None => false,
            QueryMode::Filter => graph.set(self.filter_text, String::new()),
            QueryMode::Search(_) => {
                self.generation += 1;
                let cleared = graph.set(self.search_text, String::new());
                let settled = graph.set(self.querying, false);
                cleared || settled
            }
        }
    }

    pub fn teardown(&mut self, graph: &mut ReactiveGraph) {
        self.generation += 1;
        self.outcomes.close();
        while self.outcomes.try_recv().is_ok() {}
        self.settled.clear();
        self.in_flight = 0;
        graph.dispose_signal(self.filter_text);
        graph.dispose_signal(self.search_text);
        graph.dispose_signal(self.querying);
    }
}
