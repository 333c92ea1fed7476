//! Search view state and its synchronization with the address bar.
//!
//! [`ElasticQuery`] owns the search term, sort order, page and facet filters.
//! Every mutator can optionally mirror the change into the URL through a
//! [`History`]; [`ElasticQuery::update_from_url`] applies the URL back onto
//! the state without rewriting it. Queries are dispatched in two steps,
//! [`ElasticQuery::begin_query`] and [`ElasticQuery::complete_query`], so
//! both blocking and promise-based transports can drive them. Each dispatch
//! is numbered and only the completion of the latest one is applied.

use crate::backend::SearchBackend;
use crate::build::{build_request, RequestInput, SearchRequest};
use crate::error::{EngineError, Result, TransportError};
use crate::history::{History, Location};
use crate::parse::{self, QueryParams};
use crate::types::{EngineConfig, Facet, Filter, Lang, SearchResponse, SearchResults, SortOrder};
use std::fmt;

const PARAM_SORT: &str = "sort";
const PARAM_PAGE: &str = "p";
const PARAM_KEYS: &str = "keys";
const PARAM_TERMS: &str = "terms";

/// Snapshot of one search session
#[derive(Debug, Clone, PartialEq)]
pub struct SearchState {
    pub search_term: String,
    pub sort_order: SortOrder,
    pub page: u32,
    pub page_size: u32,
    pub filters: Vec<Filter>,
    pub results: SearchResults,
    pub loading: bool,
}

impl SearchState {
    pub fn new(page_size: u32) -> Self {
        SearchState {
            search_term: String::new(),
            sort_order: SortOrder::Best,
            page: 1,
            page_size: page_size.max(1),
            filters: Vec::new(),
            results: SearchResults::default(),
            loading: false,
        }
    }

    /// Number of result pages for the current total
    pub fn page_count(&self) -> u64 {
        self.results.total.div_ceil(u64::from(self.page_size))
    }

    pub fn has_filter(&self, term: &str, facet: &Facet) -> bool {
        self.filters
            .iter()
            .any(|f| f.term == term && f.facet == *facet)
    }
}

/// Change notification sent to subscribers after a mutation
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    SearchChanged,
    SortChanged,
    PageChanged,
    FiltersChanged,
    LoadingStarted { seq: u64 },
    ResultsUpdated { seq: u64 },
    QueryFailed { seq: u64 },
}

/// Whether a filter toggle added or removed the filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterChange {
    Added,
    Removed,
}

/// How a query dispatch ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOutcome {
    /// Results were already present, nothing was sent
    Skipped,
    /// Results were replaced
    Updated,
    /// A newer query was dispatched meanwhile; the response was dropped
    Stale,
}

/// A dispatched query waiting for its response
#[derive(Debug, Clone, PartialEq)]
pub struct PendingQuery {
    pub seq: u64,
    pub request: SearchRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&StoreEvent, &SearchState)>;

/// Search state store
pub struct ElasticQuery {
    state: SearchState,
    search_page_path: String,
    dispatched: u64,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl fmt::Debug for ElasticQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElasticQuery")
            .field("state", &self.state)
            .field("dispatched", &self.dispatched)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for ElasticQuery {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl ElasticQuery {
    pub fn new(config: &EngineConfig) -> Self {
        ElasticQuery {
            state: SearchState::new(config.page_size),
            search_page_path: config.search_page_path.clone(),
            dispatched: 0,
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn state(&self) -> &SearchState {
        &self.state
    }

    pub fn search_term(&self) -> &str {
        &self.state.search_term
    }

    pub fn sort_order(&self) -> SortOrder {
        self.state.sort_order
    }

    pub fn page(&self) -> u32 {
        self.state.page
    }

    pub fn page_size(&self) -> u32 {
        self.state.page_size
    }

    pub fn filters(&self) -> &[Filter] {
        &self.state.filters
    }

    pub fn results(&self) -> &SearchResults {
        &self.state.results
    }

    pub fn is_loading(&self) -> bool {
        self.state.loading
    }

    /// Sequence number of the most recent dispatch, 0 before the first
    pub fn latest_seq(&self) -> u64 {
        self.dispatched
    }

    /// Path prefix of the search page
    pub fn search_page_path(&self) -> &str {
        &self.search_page_path
    }

    /// Register a listener called after every state change
    pub fn subscribe(
        &mut self,
        listener: impl FnMut(&StoreEvent, &SearchState) + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener; returns false if it was not registered
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    fn emit(&mut self, event: StoreEvent) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(&event, &self.state);
        }
    }

    /// Set the search term.
    ///
    /// With `sync_url` the path becomes the search page with the encoded term,
    /// filters and page are reset and only the `sort` parameter survives.
    pub fn update_search(&mut self, term: &str, history: &mut impl History, sync_url: bool) {
        self.state.search_term = term.to_string();

        if sync_url {
            let current = history.location().params();
            let mut params = QueryParams::new();
            if let Some(sort) = current.get_nonempty(PARAM_SORT) {
                params.set(PARAM_SORT, sort);
            }
            self.state.filters.clear();
            self.state.page = 1;

            let pathname = format!("{}{}", self.search_page_path, parse::encode_component(term));
            history.replace(Location::new(pathname, parse::to_search(&params)));
        }

        tracing::debug!(term, sync_url, "search term updated");
        self.emit(StoreEvent::SearchChanged);
    }

    /// Set the sort order; with `sync_url` also go back to the first page
    pub fn update_sorting(&mut self, sort: SortOrder, history: &mut impl History, sync_url: bool) {
        self.state.sort_order = sort;

        if sync_url {
            let mut params = history.location().params();
            params.set(PARAM_SORT, sort.as_param());
            self.state.page = 1;
            params.set(PARAM_PAGE, "1");
            history.replace_search(&params);
        }

        self.emit(StoreEvent::SortChanged);
    }

    /// Set the page number, clamped to at least 1
    pub fn update_page_num(&mut self, page: u32, history: &mut impl History, sync_url: bool) {
        self.state.page = page.max(1);

        if sync_url {
            let mut params = history.location().params();
            params.set(PARAM_PAGE, self.state.page.to_string());
            history.replace_search(&params);
        }

        self.emit(StoreEvent::PageChanged);
    }

    /// Toggle the filter `term` on the facet field `key`.
    ///
    /// Fails when `key` is not a known facet field or `term` is empty.
    pub fn update_filter(
        &mut self,
        term: &str,
        key: &str,
        history: &mut impl History,
        sync_url: bool,
    ) -> Result<FilterChange> {
        let facet = Facet::from_field(key).ok_or_else(|| EngineError::UnknownFacet(key.to_string()))?;
        self.toggle_filter(Filter::new(term, facet), history, sync_url)
    }

    /// Add the filter if it is not active, remove it otherwise.
    ///
    /// With `sync_url` the `keys`/`terms` lists are edited at the same position
    /// as the filter list and the page is reset to 1. Empty terms are
    /// rejected: they cannot be kept in the URL lists.
    pub fn toggle_filter(
        &mut self,
        filter: Filter,
        history: &mut impl History,
        sync_url: bool,
    ) -> Result<FilterChange> {
        if filter.term.is_empty() {
            return Err(EngineError::EmptyTerm(filter.key()));
        }

        let change = match self.state.filters.iter().position(|f| *f == filter) {
            Some(index) => {
                self.state.filters.remove(index);
                FilterChange::Removed
            }
            None => {
                self.state.filters.push(filter.clone());
                FilterChange::Added
            }
        };

        if sync_url {
            let mut params = history.location().params();
            let key = filter.key();
            match change {
                FilterChange::Removed => remove_url_filter(&mut params, &key, &filter.term),
                FilterChange::Added => {
                    append_url_entry(&mut params, PARAM_KEYS, &key);
                    append_url_entry(&mut params, PARAM_TERMS, &filter.term);
                }
            }
            self.state.page = 1;
            params.set(PARAM_PAGE, "1");
            history.replace_search(&params);
        }

        tracing::debug!(term = %filter.term, key = %filter.facet, ?change, "filter toggled");
        self.emit(StoreEvent::FiltersChanged);
        Ok(change)
    }

    /// Drop every filter; returns whether any was active
    pub fn clear_filters(&mut self, history: &mut impl History, sync_url: bool) -> bool {
        if self.state.filters.is_empty() {
            return false;
        }
        self.state.filters.clear();

        if sync_url {
            let mut params = history.location().params();
            params.remove(PARAM_KEYS);
            params.remove(PARAM_TERMS);
            self.state.page = 1;
            params.set(PARAM_PAGE, "1");
            history.replace_search(&params);
        }

        self.emit(StoreEvent::FiltersChanged);
        true
    }

    /// Apply the search term from the route and the URL parameters to the
    /// state without rewriting the URL.
    ///
    /// With `initial`, nothing happens if a query has already produced
    /// results. URL filters are only applied while no filter is active.
    /// Returns whether the URL was applied.
    pub fn update_from_url(
        &mut self,
        route_term: Option<&str>,
        history: &impl History,
        initial: bool,
    ) -> bool {
        if initial && self.state.results.total != 0 {
            tracing::debug!("results already loaded, skipping url sync");
            return false;
        }

        let params = history.location().params();

        if let Some(term) = route_term.filter(|t| !t.is_empty()) {
            self.state.search_term = parse::decode_component(term);
            self.emit(StoreEvent::SearchChanged);
        }

        if let Some(sort) = params.get_nonempty(PARAM_SORT) {
            match SortOrder::from_param(sort) {
                Some(sort) => {
                    self.state.sort_order = sort;
                    self.emit(StoreEvent::SortChanged);
                }
                None => tracing::warn!(sort, "ignoring unknown sort parameter"),
            }
        }

        if let (Some(keys), Some(terms)) = (
            params.get_nonempty(PARAM_KEYS),
            params.get_nonempty(PARAM_TERMS),
        ) {
            if self.state.filters.is_empty() {
                self.apply_url_filters(keys, terms);
            }
        }

        if let Some(page) = params.get_nonempty(PARAM_PAGE) {
            match page.parse::<u32>() {
                Ok(page) if page >= 1 => {
                    self.state.page = page;
                    self.emit(StoreEvent::PageChanged);
                }
                _ => tracing::warn!(page, "ignoring invalid page parameter"),
            }
        }

        true
    }

    fn apply_url_filters(&mut self, keys: &str, terms: &str) {
        let keys = parse::split_list(keys);
        let terms = parse::split_list(terms);
        if keys.len() != terms.len() {
            tracing::warn!(
                keys = keys.len(),
                terms = terms.len(),
                "filter lists differ in length, ignoring unpaired entries"
            );
        }

        let mut changed = false;
        for (key, term) in keys.iter().zip(terms.iter()) {
            let key = parse::decode_component(key);
            let Some(facet) = Facet::from_field(&key) else {
                tracing::warn!(key = %key, "ignoring filter on unknown facet");
                continue;
            };
            let term = parse::decode_component(term);
            if term.is_empty() {
                tracing::warn!(key = %key, "ignoring filter with empty term");
                continue;
            }
            let filter = Filter::new(term, facet);
            if !self.state.filters.contains(&filter) {
                self.state.filters.push(filter);
                changed = true;
            }
        }

        if changed {
            self.emit(StoreEvent::FiltersChanged);
        }
    }

    /// Request body for the current state
    pub fn request(&self, lang: Lang) -> SearchRequest {
        build_request(&RequestInput {
            search_term: &self.state.search_term,
            filters: &self.state.filters,
            sort: self.state.sort_order,
            page: self.state.page,
            page_size: self.state.page_size,
            lang,
        })
    }

    /// Start a query for the current state.
    ///
    /// Returns `None` when `initial` is set and results are already present.
    /// Otherwise marks the store as loading and returns the numbered request
    /// to send.
    pub fn begin_query(&mut self, lang: Lang, initial: bool) -> Option<PendingQuery> {
        if initial && self.state.results.total != 0 {
            tracing::debug!(total = self.state.results.total, "results present, query skipped");
            return None;
        }

        self.dispatched += 1;
        let seq = self.dispatched;
        self.state.loading = true;
        let request = self.request(lang);

        tracing::info!(
            seq,
            term = %self.state.search_term,
            filters = self.state.filters.len(),
            page = self.state.page,
            "dispatching search"
        );
        self.emit(StoreEvent::LoadingStarted { seq });
        Some(PendingQuery { seq, request })
    }

    /// Apply the response of query `seq`.
    ///
    /// Responses of superseded queries leave the state untouched. A failure
    /// keeps the previous results, clears the loading flag and is returned
    /// to the caller unchanged.
    pub fn complete_query(
        &mut self,
        seq: u64,
        response: std::result::Result<SearchResponse, TransportError>,
    ) -> Result<QueryOutcome> {
        if seq != self.dispatched {
            tracing::debug!(seq, latest = self.dispatched, "dropping stale response");
            return match response {
                Ok(_) => Ok(QueryOutcome::Stale),
                Err(err) => Err(err.into()),
            };
        }

        match response {
            Ok(response) => {
                self.state.results = response.into();
                self.state.loading = false;
                tracing::info!(seq, total = self.state.results.total, "search results updated");
                self.emit(StoreEvent::ResultsUpdated { seq });
                Ok(QueryOutcome::Updated)
            }
            Err(err) => {
                self.state.loading = false;
                tracing::warn!(seq, error = %err, "search failed");
                self.emit(StoreEvent::QueryFailed { seq });
                Err(err.into())
            }
        }
    }

    /// Build, send and apply a query through a blocking transport
    pub fn query_es<B: SearchBackend + ?Sized>(
        &mut self,
        backend: &B,
        lang: Lang,
        initial: bool,
    ) -> Result<QueryOutcome> {
        let Some(pending) = self.begin_query(lang, initial) else {
            return Ok(QueryOutcome::Skipped);
        };
        let response = backend.search(&pending.request);
        self.complete_query(pending.seq, response)
    }
}

/// Append an encoded entry to a comma-joined URL list
fn append_url_entry(params: &mut QueryParams, param: &str, value: &str) {
    let encoded = parse::encode_component(value);
    let joined = match params.get_nonempty(param) {
        Some(existing) => format!("{},{}", existing, encoded),
        None => encoded,
    };
    params.set(param, joined);
}

/// Remove the `keys`/`terms` entry pair that decodes to `(key, term)`
fn remove_url_filter(params: &mut QueryParams, key: &str, term: &str) {
    let mut keys: Vec<String> = parse::split_list(params.get(PARAM_KEYS).unwrap_or(""))
        .into_iter()
        .map(str::to_string)
        .collect();
    let mut terms: Vec<String> = parse::split_list(params.get(PARAM_TERMS).unwrap_or(""))
        .into_iter()
        .map(str::to_string)
        .collect();

    let position = keys.iter().zip(terms.iter()).position(|(k, t)| {
        parse::decode_component(k) == key && parse::decode_component(t) == term
    });
    let Some(index) = position else {
        tracing::warn!(key, term, "filter missing from url lists");
        return;
    };

    keys.remove(index);
    terms.remove(index);
    params.set(PARAM_KEYS, parse::join_list(&keys));
    params.set(PARAM_TERMS, parse::join_list(&terms));
}
