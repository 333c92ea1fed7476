use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Ordering of search results, encoded in the `sort` URL parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    #[serde(rename = "best")]
    Best,
    #[serde(rename = "dateA")]
    DateAscending,
    #[serde(rename = "dateD")]
    DateDescending,
}

impl SortOrder {
    /// Options in the order the sort dropdown lists them
    pub const OPTIONS: [SortOrder; 3] = [
        SortOrder::Best,
        SortOrder::DateDescending,
        SortOrder::DateAscending,
    ];

    pub fn as_param(self) -> &'static str {
        match self {
            SortOrder::Best => "best",
            SortOrder::DateAscending => "dateA",
            SortOrder::DateDescending => "dateD",
        }
    }

    pub fn from_param(value: &str) -> Option<Self> {
        match value {
            "best" => Some(SortOrder::Best),
            "dateA" => Some(SortOrder::DateAscending),
            "dateD" => Some(SortOrder::DateDescending),
            _ => None,
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_param())
    }
}

/// Supported UI languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    #[default]
    En,
    Fi,
}

impl Lang {
    pub const ALL: [Lang; 2] = [Lang::En, Lang::Fi];

    pub fn code(self) -> &'static str {
        match self {
            Lang::En => "en",
            Lang::Fi => "fi",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_lowercase().as_str() {
            "en" => Some(Lang::En),
            "fi" => Some(Lang::Fi),
            _ => None,
        }
    }

    /// The other supported language
    pub fn toggled(self) -> Self {
        match self {
            Lang::En => Lang::Fi,
            Lang::Fi => Lang::En,
        }
    }

    /// Text analyzer the search backend applies to free-text queries
    pub fn analyzer(self) -> &'static str {
        match self {
            Lang::Fi => "finnish",
            Lang::En => "english",
        }
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Filterable facet categories of a dataset.
///
/// Language-specific categories are indexed once per language, so the
/// variant carries the language whose field it targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Facet {
    Organization,
    Creator,
    FieldOfScience(Lang),
    Keyword(Lang),
    Infrastructure(Lang),
    Project,
    FileType(Lang),
    AccessType,
}

impl Facet {
    /// Facets the backend returns bucket counts for, in request order
    pub fn aggregated() -> Vec<Facet> {
        let mut facets = vec![Facet::Organization, Facet::Creator];
        facets.extend(Lang::ALL.map(Facet::FieldOfScience));
        facets.extend(Lang::ALL.map(Facet::Keyword));
        facets.extend(Lang::ALL.map(Facet::Infrastructure));
        facets.push(Facet::Project);
        facets.extend(Lang::ALL.map(Facet::FileType));
        facets
    }

    /// Index field the facet filters on
    pub fn field(&self) -> String {
        match self {
            Facet::Organization => "organization_name.keyword".to_string(),
            Facet::Creator => "creator_name.keyword".to_string(),
            Facet::FieldOfScience(lang) => format!("field_of_science.pref_label.{}.keyword", lang),
            Facet::Keyword(lang) => format!("theme.label.{}.keyword", lang),
            Facet::Infrastructure(lang) => format!("infrastructure.pref_label.{}.keyword", lang),
            Facet::Project => "project_name.keyword".to_string(),
            Facet::FileType(lang) => format!("file_type.pref_label.{}.keyword", lang),
            Facet::AccessType => "access_rights.access_type.identifier".to_string(),
        }
    }

    /// Name of the aggregation holding this facet's bucket counts
    pub fn aggregation_name(&self) -> Option<String> {
        match self {
            Facet::Organization => Some("organization".to_string()),
            Facet::Creator => Some("creator".to_string()),
            Facet::FieldOfScience(lang) => Some(format!("field_of_science_{}", lang)),
            Facet::Keyword(lang) => Some(format!("keyword_{}", lang)),
            Facet::Infrastructure(lang) => Some(format!("infrastructure_{}", lang)),
            Facet::Project => Some("project".to_string()),
            Facet::FileType(lang) => Some(format!("file_type_{}", lang)),
            Facet::AccessType => None,
        }
    }

    /// Inverse of [`Facet::field`]
    pub fn from_field(field: &str) -> Option<Facet> {
        match field {
            "organization_name.keyword" => return Some(Facet::Organization),
            "creator_name.keyword" => return Some(Facet::Creator),
            "project_name.keyword" => return Some(Facet::Project),
            "access_rights.access_type.identifier" => return Some(Facet::AccessType),
            _ => {}
        }

        let localized: [(&str, fn(Lang) -> Facet); 4] = [
            ("field_of_science.pref_label.", Facet::FieldOfScience),
            ("theme.label.", Facet::Keyword),
            ("infrastructure.pref_label.", Facet::Infrastructure),
            ("file_type.pref_label.", Facet::FileType),
        ];
        localized.iter().find_map(|(prefix, make)| {
            let lang = field.strip_prefix(prefix)?.strip_suffix(".keyword")?;
            Lang::from_code(lang).filter(|l| l.code() == lang).map(make)
        })
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.field())
    }
}

/// One active facet filter: `term` must equal the value of the facet's field
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Filter {
    pub term: String,
    pub facet: Facet,
}

impl Filter {
    pub fn new(term: impl Into<String>, facet: Facet) -> Self {
        Filter {
            term: term.into(),
            facet,
        }
    }

    /// Field path used as the filter key in URLs
    pub fn key(&self) -> String {
        self.facet.field()
    }
}

/// A single matching dataset as returned by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(rename = "_score", default)]
    pub score: Option<f64>,
    #[serde(rename = "_source", default)]
    pub source: serde_json::Value,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub highlight: HashMap<String, Vec<String>>,
}

/// Count of results for one distinct field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub key: serde_json::Value,
    pub doc_count: u64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Aggregation {
    #[serde(default)]
    pub buckets: Vec<Bucket>,
}

/// Aggregations: aggregation name -> bucket counts
pub type Aggregations = HashMap<String, Aggregation>;

/// Results of the most recent successful query
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SearchResults {
    pub hits: Vec<Hit>,
    pub total: u64,
    pub aggregations: Aggregations,
}

impl SearchResults {
    /// Bucket counts for a facet, empty when the backend returned none
    pub fn buckets(&self, facet: &Facet) -> &[Bucket] {
        facet
            .aggregation_name()
            .and_then(|name| self.aggregations.get(&name))
            .map(|agg| agg.buckets.as_slice())
            .unwrap_or(&[])
    }
}

/// Hit total, either a bare count or the `{value, relation}` object
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TotalHits {
    Count(u64),
    Object { value: u64 },
}

impl TotalHits {
    pub fn value(self) -> u64 {
        match self {
            TotalHits::Count(n) | TotalHits::Object { value: n } => n,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HitsEnvelope {
    #[serde(default)]
    pub hits: Vec<Hit>,
    pub total: TotalHits,
}

/// Search response body
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchResponse {
    pub hits: HitsEnvelope,
    #[serde(default)]
    pub aggregations: Aggregations,
}

impl From<SearchResponse> for SearchResults {
    fn from(res: SearchResponse) -> Self {
        SearchResults {
            total: res.hits.total.value(),
            hits: res.hits.hits,
            aggregations: res.aggregations,
        }
    }
}

/// Logged-in user, both fields unset when nobody is logged in
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct User {
    pub id: Option<u64>,
    pub name: Option<String>,
}

/// Body of the user endpoint
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserResponse {
    #[serde(default)]
    pub is_authenticated: bool,
    #[serde(default)]
    pub user_id: Option<u64>,
    #[serde(default)]
    pub user_display_name: Option<String>,
}

/// Endpoint and paging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub base_url: String,
    pub search_path: String,
    pub user_path: String,
    pub session_path: String,
    /// Path prefix of the search results page
    pub search_page_path: String,
    pub page_size: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            base_url: String::new(),
            search_path: "/es/metax/dataset/_search".to_string(),
            user_path: "/api/user".to_string(),
            session_path: "/api/session".to_string(),
            search_page_path: "/datasets/".to_string(),
            page_size: 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_params() {
        for sort in SortOrder::OPTIONS {
            assert_eq!(SortOrder::from_param(sort.as_param()), Some(sort));
        }
        assert_eq!(SortOrder::from_param("dateX"), None);
        assert_eq!(SortOrder::default(), SortOrder::Best);
    }

    #[test]
    fn test_facet_fields() {
        for facet in Facet::aggregated() {
            assert_eq!(Facet::from_field(&facet.field()), Some(facet));
        }
        assert_eq!(
            Facet::from_field("access_rights.access_type.identifier"),
            Some(Facet::AccessType)
        );
        assert_eq!(
            Facet::from_field("theme.label.fi.keyword"),
            Some(Facet::Keyword(Lang::Fi))
        );
        assert_eq!(Facet::from_field("theme.label.sv.keyword"), None);
        assert_eq!(Facet::from_field("theme.label.FI.keyword"), None);
        assert_eq!(Facet::from_field("organisation_name.keyword"), None);
    }

    #[test]
    fn test_aggregated_facets() {
        let names: Vec<String> = Facet::aggregated()
            .iter()
            .filter_map(|f| f.aggregation_name())
            .collect();
        assert_eq!(names.len(), 11);
        assert_eq!(names[0], "organization");
        assert!(names.contains(&"file_type_fi".to_string()));
    }

    #[test]
    fn test_response_total_forms() {
        let bare: SearchResponse =
            serde_json::from_str(r#"{"hits": {"hits": [], "total": 7}}"#).unwrap();
        assert_eq!(SearchResults::from(bare).total, 7);

        let object: SearchResponse = serde_json::from_str(
            r#"{"hits": {"hits": [{"_id": "a", "_source": {"identifier": "a"}}],
                "total": {"value": 3, "relation": "eq"}},
                "aggregations": {"project": {"buckets": [{"key": "x", "doc_count": 2}]}}}"#,
        )
        .unwrap();
        let results = SearchResults::from(object);
        assert_eq!(results.total, 3);
        assert_eq!(results.hits[0].id, "a");
        assert_eq!(results.buckets(&Facet::Project)[0].doc_count, 2);
        assert!(results.buckets(&Facet::Creator).is_empty());
    }

    #[test]
    fn test_config_defaults_fill_missing_fields() {
        let config: EngineConfig = serde_json::from_str(r#"{"page_size": 50}"#).unwrap();
        assert_eq!(config.page_size, 50);
        assert_eq!(config.search_path, "/es/metax/dataset/_search");
    }
}
