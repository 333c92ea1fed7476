use crate::error::{EngineError, TransportError};
use crate::history::{History, MemoryHistory};
use crate::locale::{LangStore, Locale};
use crate::query::{ElasticQuery, FilterChange, PendingQuery, QueryOutcome};
use crate::types::{EngineConfig, Facet, Lang, SearchResponse, SortOrder};
use serde::Serialize;
use wasm_bindgen::prelude::*;
use web_sys::console;

fn js_error(err: EngineError) -> JsError {
    JsError::new(&err.to_string())
}

/// Language persistence in `localStorage` and the `<html lang>` attribute
struct BrowserLangStore;

impl LangStore for BrowserLangStore {
    fn load(&self, key: &str) -> Option<String> {
        let storage = web_sys::window()?.local_storage().ok()??;
        storage.get_item(key).ok()?
    }

    fn save(&mut self, key: &str, value: &str) {
        let storage = web_sys::window().and_then(|w| w.local_storage().ok().flatten());
        if let Some(storage) = storage {
            if storage.set_item(key, value).is_err() {
                console::warn_1(&format!("Failed to persist {}", key).into());
            }
        }
    }

    fn set_document_lang(&mut self, lang: Lang) {
        let root = web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| d.document_element());
        if let Some(root) = root {
            if root.set_attribute("lang", lang.code()).is_err() {
                console::warn_1(&format!("Failed to set document lang to {}", lang).into());
            }
        }
    }
}

/// Request the page script has to send: `POST url` with `body`
#[derive(Serialize)]
struct DispatchJson<'a> {
    seq: u64,
    url: &'a str,
    body: &'a crate::build::SearchRequest,
}

/// Search session bound to one browser tab
#[wasm_bindgen]
pub struct SearchSession {
    config: EngineConfig,
    query: ElasticQuery,
    locale: Locale<BrowserLangStore>,
    history: MemoryHistory,
    started_at: Option<(u64, f64)>,
}

impl SearchSession {
    fn dispatch(&mut self, pending: PendingQuery) -> Result<String, JsError> {
        let url = format!("{}{}", self.config.base_url, self.config.search_path);
        let json = serde_json::to_string(&DispatchJson {
            seq: pending.seq,
            url: &url,
            body: &pending.request,
        })
        .map_err(|e| JsError::new(&format!("Failed to serialize request: {}", e)))?;
        self.started_at = Some((pending.seq, js_sys::Date::now()));
        Ok(json)
    }

    fn log_completion(&mut self, seq: u64, outcome: &str) {
        if let Some((started_seq, start)) = self.started_at {
            if started_seq == seq {
                self.started_at = None;
                console::log_1(
                    &format!(
                        "[perf] search seq={} term='{}' filters={} page={} | {} in {:.1}ms",
                        seq,
                        self.query.search_term(),
                        self.query.filters().len(),
                        self.query.page(),
                        outcome,
                        js_sys::Date::now() - start
                    )
                    .into(),
                );
            }
        }
    }
}

#[wasm_bindgen]
impl SearchSession {
    /// config_json: JSON of EngineConfig (empty for defaults)
    /// url: current `pathname + search`
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str, url: &str) -> Result<SearchSession, JsError> {
        let config = crate::parse_config(config_json).map_err(js_error)?;
        let mut locale = Locale::new(BrowserLangStore);
        locale.get_lang();
        Ok(SearchSession {
            query: ElasticQuery::new(&config),
            config,
            locale,
            history: MemoryHistory::at(url),
            started_at: None,
        })
    }

    /// Current `pathname + search`, to be written back to the address bar
    #[wasm_bindgen(getter)]
    pub fn url(&self) -> String {
        self.history.url()
    }

    /// Follow a navigation made outside the engine (back/forward)
    pub fn set_url(&mut self, url: &str) {
        let next = MemoryHistory::at(url);
        self.history.replace(next.location().clone());
    }

    pub fn update_search(&mut self, term: &str, sync_url: bool) {
        self.query.update_search(term, &mut self.history, sync_url);
    }

    pub fn update_sorting(&mut self, sort: &str, sync_url: bool) -> Result<(), JsError> {
        let sort = SortOrder::from_param(sort)
            .ok_or_else(|| js_error(EngineError::UnknownSort(sort.to_string())))?;
        self.query.update_sorting(sort, &mut self.history, sync_url);
        Ok(())
    }

    pub fn update_page_num(&mut self, page: u32, sync_url: bool) {
        self.query.update_page_num(page, &mut self.history, sync_url);
    }

    /// Returns true if the filter was added, false if it was removed
    pub fn update_filter(&mut self, term: &str, key: &str, sync_url: bool) -> Result<bool, JsError> {
        let change = self
            .query
            .update_filter(term, key, &mut self.history, sync_url)
            .map_err(js_error)?;
        Ok(change == FilterChange::Added)
    }

    /// Whether the filter `term` on facet field `key` is active
    pub fn has_filter(&self, term: &str, key: &str) -> bool {
        Facet::from_field(key).is_some_and(|facet| self.query.state().has_filter(term, &facet))
    }

    pub fn clear_filters(&mut self, sync_url: bool) -> bool {
        self.query.clear_filters(&mut self.history, sync_url)
    }

    pub fn update_from_url(&mut self, route_term: Option<String>, initial: bool) -> bool {
        self.query
            .update_from_url(route_term.as_deref(), &self.history, initial)
    }

    /// Start a query. Returns the JSON `{seq, url, body}` to POST, or
    /// undefined when results are already loaded and `initial` is set.
    pub fn prepare_query(&mut self, initial: bool) -> Result<Option<String>, JsError> {
        match self.query.begin_query(self.locale.current_lang(), initial) {
            Some(pending) => self.dispatch(pending).map(Some),
            None => Ok(None),
        }
    }

    /// Apply a successful response body; returns "updated" or "stale"
    pub fn apply_response(&mut self, seq: u32, body: &str) -> Result<String, JsError> {
        let seq = u64::from(seq);
        let response = serde_json::from_str::<SearchResponse>(body).map_err(TransportError::from);
        let outcome = self.query.complete_query(seq, response);
        match outcome {
            Ok(QueryOutcome::Stale) => Ok("stale".to_string()),
            Ok(_) => {
                self.log_completion(seq, "updated");
                Ok("updated".to_string())
            }
            Err(err) => {
                self.log_completion(seq, "failed");
                Err(js_error(err))
            }
        }
    }

    /// Record a failed request; results stay as they were
    pub fn apply_failure(&mut self, seq: u32, message: &str) {
        let seq = u64::from(seq);
        let err = TransportError::Request {
            url: self.config.search_path.clone(),
            message: message.to_string(),
        };
        let latest = seq == self.query.latest_seq();
        if self.query.complete_query(seq, Err(err)).is_err() && latest {
            console::error_1(&format!("Search failed: {}", message).into());
        }
        self.log_completion(seq, "failed");
    }

    /// Switch language; returns a query to send like `prepare_query`
    pub fn toggle_lang(&mut self) -> Result<Option<String>, JsError> {
        match self
            .locale
            .toggle_lang_deferred(&mut self.query, &mut self.history)
        {
            Some(pending) => self.dispatch(pending).map(Some),
            None => Ok(None),
        }
    }

    pub fn set_lang(&mut self, code: &str) -> Result<(), JsError> {
        let lang = Lang::from_code(code)
            .ok_or_else(|| js_error(EngineError::UnsupportedLang(code.to_string())))?;
        self.locale.set_lang(lang);
        Ok(())
    }

    #[wasm_bindgen(getter)]
    pub fn lang(&self) -> String {
        self.locale.current_lang().code().to_string()
    }

    #[wasm_bindgen(getter)]
    pub fn search_term(&self) -> String {
        self.query.search_term().to_string()
    }

    #[wasm_bindgen(getter)]
    pub fn sort(&self) -> String {
        self.query.sort_order().as_param().to_string()
    }

    #[wasm_bindgen(getter)]
    pub fn page(&self) -> u32 {
        self.query.page()
    }

    #[wasm_bindgen(getter)]
    pub fn page_count(&self) -> f64 {
        self.query.state().page_count() as f64
    }

    #[wasm_bindgen(getter)]
    pub fn loading(&self) -> bool {
        self.query.is_loading()
    }

    #[wasm_bindgen(getter)]
    pub fn total(&self) -> f64 {
        self.query.results().total as f64
    }

    /// Active filters as JSON `[{term, key}]`
    pub fn filters_json(&self) -> String {
        let filters: Vec<serde_json::Value> = self
            .query
            .filters()
            .iter()
            .map(|f| serde_json::json!({ "term": f.term, "key": f.key() }))
            .collect();
        serde_json::Value::Array(filters).to_string()
    }

    /// Current results as JSON `{hits, total, aggregations}`
    pub fn results_json(&self) -> Result<String, JsError> {
        serde_json::to_string(self.query.results())
            .map_err(|e| JsError::new(&format!("Failed to serialize results: {}", e)))
    }
}
