use crate::types::SortOrder;
use serde_json::{json, Map, Value};

/// Field the date orderings compare on
pub const DATE_FIELD: &str = "date_modified";

/// Build the sort clause for a result ordering.
///
/// Relevance is always the last criterion; a date ordering is placed in
/// front of it so it takes precedence.
pub fn sort_clause(order: SortOrder) -> Vec<Value> {
    let mut sorting = vec![json!("_score")];
    let direction = match order {
        SortOrder::Best => None,
        SortOrder::DateAscending => Some("asc"),
        SortOrder::DateDescending => Some("desc"),
    };
    if let Some(direction) = direction {
        let mut comparator = Map::new();
        comparator.insert(DATE_FIELD.to_string(), json!({ "order": direction }));
        sorting.insert(0, Value::Object(comparator));
    }
    sorting
}
