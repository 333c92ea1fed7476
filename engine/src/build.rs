use crate::rank::sort_clause;
use crate::types::{Facet, Filter, Lang, SortOrder};
use serde::Serialize;
use serde_json::{json, Map, Value};

/// Dataset metadata fields free-text queries are matched against
pub const SEARCH_FIELDS: &[&str] = &[
    "title.*",
    "description.*",
    "creator.name.*",
    "contributor.name.*",
    "publisher.name.*",
    "rights_holder.name.*",
    "curator.name.*",
    "keyword",
    "access_rights.license.title.*",
    "access_rights.type.identifier.*",
    "access_rights.type.pref_label.*",
    "theme.pref_label.*",
    "field_of_science.pref_label.*",
    "infrastructure.pref_label.*",
    "project.pref_label.*",
    "identifier",
    "preferred_identifier",
    "other_identifier.notation",
    "other_identifier.type.pref_label.*",
    "dataset_version_set",
];

/// Source fields returned per hit, enough to render a result row
pub const SOURCE_FIELDS: &[&str] = &["identifier", "title.*", "description.*", "access_rights.*"];

/// Fields the backend returns highlighted fragments for
pub const HIGHLIGHT_FIELDS: &[&str] = &["description.*", "title.*"];

/// Share of query words a document has to match
pub const MINIMUM_SHOULD_MATCH: &str = "75%";

/// Search request body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRequest {
    pub size: u32,
    pub from: u64,
    pub query: Value,
    pub sort: Vec<Value>,
    #[serde(rename = "_source")]
    pub source: Vec<String>,
    pub highlight: Value,
    pub aggregations: Value,
}

/// Search state a request is assembled from
#[derive(Debug, Clone, Copy)]
pub struct RequestInput<'a> {
    pub search_term: &'a str,
    pub filters: &'a [Filter],
    pub sort: SortOrder,
    pub page: u32,
    pub page_size: u32,
    pub lang: Lang,
}

/// Free-text part of the query: every word has to roughly match across the
/// metadata fields, or everything matches when there is no search term
pub fn text_query(search_term: &str, lang: Lang) -> Value {
    if search_term.trim().is_empty() {
        return json!({ "match_all": {} });
    }
    json!({
        "multi_match": {
            "query": search_term,
            "type": "cross_fields",
            "minimum_should_match": MINIMUM_SHOULD_MATCH,
            "operator": "and",
            "analyzer": lang.analyzer(),
            "fields": SEARCH_FIELDS,
        }
    })
}

/// One equality clause per active filter; all of them must hold
pub fn filter_clause(filters: &[Filter]) -> Vec<Value> {
    filters
        .iter()
        .map(|filter| {
            let mut term = Map::new();
            term.insert(filter.key(), Value::String(filter.term.clone()));
            json!({ "term": term })
        })
        .collect()
}

/// Full boolean query: text query plus filters
pub fn bool_query(search_term: &str, filters: &[Filter], lang: Lang) -> Value {
    let mut bool_query = Map::new();
    bool_query.insert(
        "must".to_string(),
        Value::Array(vec![text_query(search_term, lang)]),
    );

    let filters = filter_clause(filters);
    if !filters.is_empty() {
        bool_query.insert("filter".to_string(), Value::Array(filters));
    }

    json!({ "bool": bool_query })
}

/// Term aggregations for every facet that shows option counts
pub fn aggregations() -> Value {
    let aggs: Map<String, Value> = Facet::aggregated()
        .into_iter()
        .filter_map(|facet| {
            let name = facet.aggregation_name()?;
            Some((name, json!({ "terms": { "field": facet.field() } })))
        })
        .collect();
    Value::Object(aggs)
}

/// Offset of the first hit on a 1-based page
pub fn page_offset(page: u32, page_size: u32) -> u64 {
    u64::from(page.max(1) - 1) * u64::from(page_size)
}

/// Assemble the request body for the given search state
pub fn build_request(input: &RequestInput<'_>) -> SearchRequest {
    let highlight: Map<String, Value> = HIGHLIGHT_FIELDS
        .iter()
        .map(|field| (field.to_string(), json!({})))
        .collect();

    SearchRequest {
        size: input.page_size,
        from: page_offset(input.page, input.page_size),
        query: bool_query(input.search_term, input.filters, input.lang),
        sort: sort_clause(input.sort),
        source: SOURCE_FIELDS.iter().map(|f| f.to_string()).collect(),
        highlight: json!({ "fields": highlight }),
        aggregations: aggregations(),
    }
}
