//! Search state engine for the dataset finder.
//!
//! Holds the search view state (term, sort, page, facet filters, results),
//! keeps it in sync with the address bar and builds the requests sent to the
//! search backend. Built as a wasm module for the browser and as a plain
//! library (with a blocking HTTP transport behind the `native` feature).

pub mod auth;
pub mod backend;
pub mod build;
pub mod error;
pub mod history;
pub mod locale;
pub mod parse;
pub mod query;
pub mod rank;
pub mod types;

#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::*;

pub use auth::AuthStore;
pub use backend::{AuthBackend, SearchBackend};
pub use error::{EngineError, TransportError};
pub use history::{History, Location, MemoryHistory};
pub use locale::{LangStore, Locale, MemoryLangStore};
pub use query::{ElasticQuery, FilterChange, PendingQuery, QueryOutcome, SearchState, StoreEvent};
pub use types::{EngineConfig, Facet, Filter, Lang, SearchResults, SortOrder};

/// Parse engine configuration from JSON; an empty string gives the defaults
pub fn parse_config(config_json: &str) -> Result<EngineConfig, EngineError> {
    if config_json.trim().is_empty() {
        return Ok(EngineConfig::default());
    }
    let config: EngineConfig = serde_json::from_str(config_json)
        .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;
    if config.page_size == 0 {
        return Err(EngineError::Config("page_size must be positive".to_string()));
    }
    Ok(config)
}
