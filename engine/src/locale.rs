use crate::backend::SearchBackend;
use crate::error::Result;
use crate::history::History;
use crate::query::{ElasticQuery, PendingQuery, QueryOutcome};
use crate::types::Lang;

/// Storage key of the persisted language choice
pub const LANG_KEY: &str = "lang";

/// Where the language choice is persisted and displayed
pub trait LangStore {
    fn load(&self, key: &str) -> Option<String>;

    fn save(&mut self, key: &str, value: &str);

    /// Reflect the language on the rendered document
    fn set_document_lang(&mut self, _lang: Lang) {}
}

/// Language store kept in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryLangStore {
    pub stored: Option<String>,
    pub document_lang: Option<Lang>,
}

impl LangStore for MemoryLangStore {
    fn load(&self, key: &str) -> Option<String> {
        (key == LANG_KEY).then(|| self.stored.clone()).flatten()
    }

    fn save(&mut self, key: &str, value: &str) {
        if key == LANG_KEY {
            self.stored = Some(value.to_string());
        }
    }

    fn set_document_lang(&mut self, lang: Lang) {
        self.document_lang = Some(lang);
    }
}

/// Current UI language
#[derive(Debug)]
pub struct Locale<S: LangStore> {
    current: Lang,
    store: S,
}

impl<S: LangStore> Locale<S> {
    pub fn new(store: S) -> Self {
        Locale {
            current: Lang::default(),
            store,
        }
    }

    pub fn current_lang(&self) -> Lang {
        self.current
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Switch language, persist it and update the document
    pub fn set_lang(&mut self, lang: Lang) {
        self.current = lang;
        self.store.save(LANG_KEY, lang.code());
        self.store.set_document_lang(lang);
        tracing::debug!(lang = %lang, "language set");
    }

    /// Restore a previously persisted language, if any
    pub fn get_lang(&mut self) -> Option<Lang> {
        let stored = self.store.load(LANG_KEY)?;
        match Lang::from_code(&stored) {
            Some(lang) => {
                self.set_lang(lang);
                Some(lang)
            }
            None => {
                tracing::warn!(stored = %stored, "ignoring unsupported stored language");
                None
            }
        }
    }

    /// Flip the language and drop active filters.
    ///
    /// Filter options are language specific, so on the search page the URL is
    /// updated as well and, if any filter was removed, the query to re-run is
    /// returned for the caller to send.
    pub fn toggle_lang_deferred(
        &mut self,
        query: &mut ElasticQuery,
        history: &mut impl History,
    ) -> Option<PendingQuery> {
        self.set_lang(self.current.toggled());

        let on_search_page = history
            .location()
            .pathname
            .starts_with(query.search_page_path());
        if on_search_page {
            if query.clear_filters(history, true) {
                return query.begin_query(self.current, false);
            }
        } else {
            query.clear_filters(history, false);
        }
        None
    }

    /// [`Locale::toggle_lang_deferred`] with the re-query sent through `backend`
    pub fn toggle_lang<B: SearchBackend + ?Sized>(
        &mut self,
        query: &mut ElasticQuery,
        history: &mut impl History,
        backend: &B,
    ) -> Result<QueryOutcome> {
        match self.toggle_lang_deferred(query, history) {
            Some(pending) => {
                let response = backend.search(&pending.request);
                query.complete_query(pending.seq, response)
            }
            None => Ok(QueryOutcome::Skipped),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::SearchRequest;
    use crate::error::TransportError;
    use crate::history::MemoryHistory;
    use crate::types::{Facet, Filter, SearchResponse};
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingBackend {
        requests: RefCell<Vec<SearchRequest>>,
    }

    impl SearchBackend for RecordingBackend {
        fn search(
            &self,
            request: &SearchRequest,
        ) -> std::result::Result<SearchResponse, TransportError> {
            self.requests.borrow_mut().push(request.clone());
            Ok(serde_json::from_str(r#"{"hits": {"hits": [], "total": 4}}"#)?)
        }
    }

    fn filtered_store(history: &mut MemoryHistory) -> ElasticQuery {
        let mut query = ElasticQuery::default();
        query
            .toggle_filter(Filter::new("CSC", Facet::Organization), history, true)
            .unwrap();
        query
    }

    #[test]
    fn test_set_lang_persists() {
        let mut locale = Locale::new(MemoryLangStore::default());
        locale.set_lang(Lang::Fi);
        assert_eq!(locale.current_lang(), Lang::Fi);
        assert_eq!(locale.store().stored.as_deref(), Some("fi"));
        assert_eq!(locale.store().document_lang, Some(Lang::Fi));
    }

    #[test]
    fn test_get_lang_restores() {
        let store = MemoryLangStore {
            stored: Some("fi".to_string()),
            document_lang: None,
        };
        let mut locale = Locale::new(store);
        assert_eq!(locale.get_lang(), Some(Lang::Fi));
        assert_eq!(locale.current_lang(), Lang::Fi);

        let mut empty = Locale::new(MemoryLangStore::default());
        assert_eq!(empty.get_lang(), None);
        assert_eq!(empty.current_lang(), Lang::En);

        let mut bogus = Locale::new(MemoryLangStore {
            stored: Some("sv".to_string()),
            document_lang: None,
        });
        assert_eq!(bogus.get_lang(), None);
        assert_eq!(bogus.current_lang(), Lang::En);
    }

    #[test]
    fn test_toggle_on_search_page_requeries() {
        let mut history = MemoryHistory::at("/datasets/");
        let mut query = filtered_store(&mut history);
        let mut locale = Locale::new(MemoryLangStore::default());
        let backend = RecordingBackend::default();

        let outcome = locale.toggle_lang(&mut query, &mut history, &backend).unwrap();

        assert_eq!(outcome, QueryOutcome::Updated);
        assert_eq!(locale.current_lang(), Lang::Fi);
        assert!(query.filters().is_empty());
        assert_eq!(history.url(), "/datasets/?p=1");

        let requests = backend.requests.borrow();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].query["bool"].get("filter").is_none());
    }

    #[test]
    fn test_toggle_without_filters_does_not_requery() {
        let mut history = MemoryHistory::at("/datasets/");
        let mut query = ElasticQuery::default();
        let mut locale = Locale::new(MemoryLangStore::default());
        let backend = RecordingBackend::default();

        let outcome = locale.toggle_lang(&mut query, &mut history, &backend).unwrap();

        assert_eq!(outcome, QueryOutcome::Skipped);
        assert!(backend.requests.borrow().is_empty());
        assert_eq!(history.replaced(), 0);
    }

    #[test]
    fn test_toggle_elsewhere_clears_without_url() {
        let mut history = MemoryHistory::at("/datasets/");
        let mut query = filtered_store(&mut history);
        let mut elsewhere = MemoryHistory::at("/dataset/urn-123");
        let mut locale = Locale::new(MemoryLangStore::default());

        let pending = locale.toggle_lang_deferred(&mut query, &mut elsewhere);

        assert!(pending.is_none());
        assert!(query.filters().is_empty());
        assert_eq!(elsewhere.replaced(), 0);
        assert!(!query.is_loading());
    }
}
