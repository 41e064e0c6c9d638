//! Request and response shapes of the search endpoint, plus helpers for
//! pulling record lists out of loosely shaped payloads.

use crate::error::{ClientError, Result};
use registry_core::{CompanyId, SearchFilter, SearchFilters, SearchSort};
use serde_json::{Map, Value};

/// One search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub keyword: String,
    /// 1-based page number
    pub page: u32,
    pub page_size: u32,
    pub sort: SearchSort,
    pub filter: SearchFilter,
    pub filters: SearchFilters,
}

impl SearchQuery {
    /// First page of `keyword` with default ordering.
    pub fn new(keyword: impl Into<String>, page: u32, page_size: u32) -> Self {
        Self {
            keyword: keyword.into(),
            page,
            page_size,
            sort: SearchSort::default(),
            filter: SearchFilter::default(),
            filters: SearchFilters::default(),
        }
    }

    /// Query-string pairs, including a fresh search session id.
    pub fn to_params(&self, search_id: String) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("q", self.keyword.clone()),
            ("p", self.page.to_string()),
            ("size", self.page_size.to_string()),
            ("sort", self.sort.as_param().to_string()),
            ("filter", self.filter.as_param().to_string()),
            ("searchId", search_id),
        ];
        params.extend(self.filters.to_params());
        params
    }
}

/// Summary row of a search page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchItem {
    pub id: CompanyId,
    pub name: Option<String>,
}

/// One page of search results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPage {
    pub items: Vec<SearchItem>,
    /// Total hits reported by the platform, when present
    pub total: Option<u64>,
}

impl SearchPage {
    /// Decode the `data` of a search envelope. Rows without a usable id are skipped.
    pub fn from_data(data: &Value) -> Result<Self> {
        let object = data.as_object().ok_or_else(|| {
            ClientError::DataFetch(format!("search data is not an object: {data}"))
        })?;

        let items = match object.get("items") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(rows)) => rows.iter().filter_map(search_item).collect(),
            Some(other) => {
                return Err(ClientError::DataFetch(format!(
                    "search items is not an array: {other}"
                )))
            }
        };
        let total = object.get("total").and_then(Value::as_u64);

        Ok(Self { items, total })
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

fn search_item(row: &Value) -> Option<SearchItem> {
    let row = row.as_object()?;
    let raw_id = first_text(row, &["id", "pid"])?;
    match CompanyId::new(raw_id) {
        Ok(id) => Some(SearchItem {
            id,
            name: first_text(row, &["name", "entName"]),
        }),
        Err(e) => {
            tracing::debug!("Skipping search row with bad id: {}", e);
            None
        }
    }
}

/// First of `keys` holding a non-blank string or number, as text.
pub(crate) fn first_text(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match object.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Rows of a list payload: a bare array, or an object wrapping one under
/// `list`, `items` or `data`.
pub(crate) fn rows(data: Value) -> Vec<Map<String, Value>> {
    let array = match data {
        Value::Array(rows) => rows,
        Value::Object(mut object) => ["list", "items", "data"]
            .iter()
            .find_map(|key| match object.remove(*key) {
                Some(Value::Array(rows)) => Some(rows),
                _ => None,
            })
            .unwrap_or_default(),
        _ => Vec::new(),
    };
    array
        .into_iter()
        .filter_map(|row| match row {
            Value::Object(object) => Some(object),
            _ => None,
        })
        .collect()
}

/// Copy the first present alias into `target` when the platform used another name.
pub(crate) fn alias(object: &mut Map<String, Value>, target: &str, candidates: &[&str]) {
    if object.get(target).is_some_and(|v| !v.is_null()) {
        return;
    }
    if let Some(value) = candidates
        .iter()
        .find_map(|key| object.get(*key).filter(|v| !v.is_null()).cloned())
    {
        object.insert(target.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_search_params() {
        let mut query = SearchQuery::new("百度", 2, 20);
        query.filters.city = Some("北京".to_string());
        let params = query.to_params("1700000000000".to_string());
        assert!(params.contains(&("q", "百度".to_string())));
        assert!(params.contains(&("p", "2".to_string())));
        assert!(params.contains(&("size", "20".to_string())));
        assert!(params.contains(&("sort", "relevance".to_string())));
        assert!(params.contains(&("filter", "all".to_string())));
        assert!(params.contains(&("searchId", "1700000000000".to_string())));
        assert!(params.contains(&("city", "北京".to_string())));
        assert!(!params.iter().any(|(k, _)| *k == "province"));
    }

    #[test]
    fn test_search_page_from_data() {
        let data = json!({
            "total": 42,
            "items": [
                {"id": "111", "name": "甲公司"},
                {"pid": 222, "entName": "乙公司"},
                {"name": "no id"},
                {"id": "bad id!"}
            ]
        });
        let page = SearchPage::from_data(&data).unwrap();
        assert_eq!(page.total, Some(42));
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].id.as_str(), "111");
        assert_eq!(page.items[1].id.as_str(), "222");
        assert_eq!(page.items[1].name.as_deref(), Some("乙公司"));
    }

    #[test]
    fn test_search_page_empty_and_malformed() {
        assert!(SearchPage::from_data(&json!({})).unwrap().is_empty());
        assert!(SearchPage::from_data(&json!({"items": null})).unwrap().is_empty());
        assert!(SearchPage::from_data(&json!([])).is_err());
        assert!(SearchPage::from_data(&json!({"items": "x"})).is_err());
    }

    #[test]
    fn test_rows_shapes() {
        assert_eq!(rows(json!([{"a": 1}, 2])).len(), 1);
        assert_eq!(rows(json!({"list": [{"a": 1}, {"a": 2}]})).len(), 2);
        assert_eq!(rows(json!({"total": 0})).len(), 0);
        assert_eq!(rows(Value::Null).len(), 0);
    }

    #[test]
    fn test_alias() {
        let Value::Object(mut object) = json!({"id": "C1", "name": "x"}) else {
            unreachable!()
        };
        alias(&mut object, "case_id", &["caseId", "id"]);
        assert_eq!(object["case_id"], "C1");

        alias(&mut object, "case_id", &["name"]);
        assert_eq!(object["case_id"], "C1");
    }
}
