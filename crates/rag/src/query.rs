//! Query model of the RAG pipeline.
//!
//! At the orchestrator boundary a query is a string or a flat list of
//! strings. Inside the pipeline it is a list of retrieval units, each unit a
//! list of strings whose first element is the text sent to the search service.
//!
//! Shape coercion happens here and only here, once, at pipeline entry:
//! - a bare string becomes one unit holding that string: `"q"` -> `[["q"]]`
//! - a flat list becomes one unit holding all elements: `["a", "b"]` -> `[["a", "b"]]`
//! - a nested list is taken as-is: `[["a"], ["b"]]`
//! - a singleton wrapper around a nested list is unwrapped: `[[["a"]]]` -> `[["a"]]`
//!
//! Transformer stages only ever see [`RetrievalUnits`], so they never coerce.

use ragoon_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One group of strings retrieved as a single search request.
pub type RetrievalUnit = Vec<String>;

/// The query text of a unit: its first element.
pub fn unit_query(unit: &[String]) -> Option<&str> {
    unit.first().map(String::as_str)
}

/// Ordered list of retrieval units.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RetrievalUnits(Vec<RetrievalUnit>);

impl RetrievalUnits {
    /// `[[query]]`
    pub fn single(query: impl Into<String>) -> Self {
        Self(vec![vec![query.into()]])
    }

    /// Units from already-shaped data. Empty units are dropped.
    pub fn from_units(units: Vec<RetrievalUnit>) -> Self {
        Self(units.into_iter().filter(|u| !u.is_empty()).collect())
    }

    /// One unit per query.
    pub fn from_queries<I, S>(queries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(queries.into_iter().map(|q| vec![q.into()]).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RetrievalUnit> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[RetrievalUnit] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<RetrievalUnit> {
        self.0
    }

    /// Coerce an arbitrary JSON query value into units.
    pub fn coerce(value: &Value) -> AppResult<Self> {
        QueryInput::from_value(value)?
            .normalize()
            .map(|normalized| normalized.units)
    }

    /// Query text of every unit, in order.
    pub fn queries(&self) -> Vec<&str> {
        self.0.iter().filter_map(|u| unit_query(u)).collect()
    }
}

impl IntoIterator for RetrievalUnits {
    type Item = RetrievalUnit;
    type IntoIter = std::vec::IntoIter<RetrievalUnit>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a RetrievalUnits {
    type Item = &'a RetrievalUnit;
    type IntoIter = std::slice::Iter<'a, RetrievalUnit>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<RetrievalUnit> for RetrievalUnits {
    fn from_iter<T: IntoIterator<Item = RetrievalUnit>>(iter: T) -> Self {
        Self::from_units(iter.into_iter().collect())
    }
}

/// A query as handed to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryInput {
    Text(String),
    List(Vec<String>),
    Units(Vec<RetrievalUnit>),
}

impl From<&str> for QueryInput {
    fn from(text: &str) -> Self {
        QueryInput::Text(text.to_string())
    }
}

impl From<String> for QueryInput {
    fn from(text: String) -> Self {
        QueryInput::Text(text)
    }
}

impl From<Vec<String>> for QueryInput {
    fn from(list: Vec<String>) -> Self {
        QueryInput::List(list)
    }
}

/// Result of normalizing a [`QueryInput`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedQuery {
    /// First raw string of the input; answered verbatim
    pub original_query: String,
    pub units: RetrievalUnits,
}

impl QueryInput {
    /// Coerce arbitrary JSON into a query, unwrapping singleton nesting.
    pub fn from_value(value: &Value) -> AppResult<Self> {
        match value {
            Value::String(text) => Ok(QueryInput::Text(text.clone())),
            Value::Array(items) if items.is_empty() => {
                Err(AppError::InvalidQuery("query list is empty".to_string()))
            }
            Value::Array(items) if items.iter().all(Value::is_string) => {
                Ok(QueryInput::List(strings(items)?))
            }
            Value::Array(items) if items.len() == 1 && is_nested_list(&items[0]) => {
                Self::from_value(&items[0])
            }
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::Array(inner) => strings(inner),
                    other => Err(AppError::InvalidQuery(format!(
                        "mixed query shape near {}",
                        other
                    ))),
                })
                .collect::<AppResult<Vec<_>>>()
                .map(QueryInput::Units),
            other => Err(AppError::InvalidQuery(format!(
                "unsupported query value: {}",
                other
            ))),
        }
    }

    /// Normalize into retrieval units and record the original query.
    pub fn normalize(&self) -> AppResult<NormalizedQuery> {
        let units = match self {
            QueryInput::Text(text) => RetrievalUnits::single(text.clone()),
            QueryInput::List(list) => RetrievalUnits::from_units(vec![non_blank(list)]),
            QueryInput::Units(units) => {
                RetrievalUnits::from_units(units.iter().map(|u| non_blank(u)).collect())
            }
        };

        let original_query = units
            .queries()
            .first()
            .filter(|q| !q.trim().is_empty())
            .map(|q| q.to_string())
            .ok_or_else(|| AppError::InvalidQuery("prompt is empty".to_string()))?;

        Ok(NormalizedQuery {
            original_query,
            units,
        })
    }
}

fn non_blank(items: &[String]) -> Vec<String> {
    items
        .iter()
        .filter(|s| !s.trim().is_empty())
        .cloned()
        .collect()
}

fn is_nested_list(value: &Value) -> bool {
    matches!(value, Value::Array(items) if !items.is_empty() && items.iter().all(Value::is_array))
}

fn strings(items: &[Value]) -> AppResult<Vec<String>> {
    items
        .iter()
        .map(|item| {
            item.as_str().map(str::to_string).ok_or_else(|| {
                AppError::InvalidQuery(format!("expected a string, found {}", item))
            })
        })
        .collect()
}
