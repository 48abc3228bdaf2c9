//! Document mirror collaborator and its filter conventions.
//!
//! Records are mirrored into a document store after every primary write.
//! Mirroring is best effort: the controller never fails or rolls back a
//! primary write because the mirror failed. It flags the record as
//! sync-failed instead, for reconciliation by
//! [`crate::LifecycleController::resync_failed`].
//!
//! Search filters follow the bool-query convention: a list of clauses that
//! must all hold, plus one OR group of which at least one must hold.

use crate::store::SortKey;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Boxed future returned by [`DocumentMirror`] methods.
pub type MirrorFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, MirrorError>> + Send + 'a>>;

/// Errors that can occur while talking to the document store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MirrorError {
    /// The document store could not be reached.
    #[error("Document store unavailable: {0}")]
    Unavailable(String),

    /// The document store rejected the request.
    #[error("Document store request failed: {0}")]
    Request(String),

    /// A document could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// One filter clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum FilterClause {
    /// Exact match.
    Term {
        /// Document field
        field: String,
        /// Expected value
        value: Value,
    },
    /// Match any of `values`.
    Terms {
        /// Document field
        field: String,
        /// Accepted values
        values: Vec<Value>,
    },
    /// Inclusive range; either bound may be open.
    Range {
        /// Document field
        field: String,
        /// Lower bound
        #[serde(default, skip_serializing_if = "Option::is_none")]
        gte: Option<Value>,
        /// Upper bound
        #[serde(default, skip_serializing_if = "Option::is_none")]
        lte: Option<Value>,
    },
    /// Field present and non-null.
    Exists {
        /// Document field
        field: String,
    },
}

impl FilterClause {
    /// Field the clause applies to.
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::Term { field, .. }
            | Self::Terms { field, .. }
            | Self::Range { field, .. }
            | Self::Exists { field } => field,
        }
    }

    /// Render as a query DSL clause.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Term { field, value } => json!({ "term": { field: value } }),
            Self::Terms { field, values } => json!({ "terms": { field: values } }),
            Self::Range { field, gte, lte } => {
                let mut bounds = serde_json::Map::new();
                if let Some(gte) = gte {
                    bounds.insert("gte".to_string(), gte.clone());
                }
                if let Some(lte) = lte {
                    bounds.insert("lte".to_string(), lte.clone());
                }
                json!({ "range": { field: bounds } })
            },
            Self::Exists { field } => json!({ "exists": { "field": field } }),
        }
    }
}

/// AND-composed clauses plus one OR group.
///
/// # Examples
///
/// ```
/// use record_lifecycle_core::mirror::DocumentFilter;
/// use serde_json::json;
///
/// let filter = DocumentFilter::new()
///     .term("status", 1)
///     .any_term("categoryId", 3)
///     .any_term("categoryId", 4);
///
/// let query = filter.to_query_json();
/// assert_eq!(query["bool"]["filter"][0], json!({"term": {"status": 1}}));
/// assert_eq!(query["bool"]["minimum_should_match"], 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentFilter {
    /// Every clause must hold.
    #[serde(default)]
    pub all: Vec<FilterClause>,
    /// At least one clause must hold, when non-empty.
    #[serde(default)]
    pub any: Vec<FilterClause>,
}

impl DocumentFilter {
    /// Empty filter, matching every document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a clause to the AND list.
    #[must_use]
    pub fn and(mut self, clause: FilterClause) -> Self {
        self.all.push(clause);
        self
    }

    /// Add a clause to the OR group.
    #[must_use]
    pub fn or(mut self, clause: FilterClause) -> Self {
        self.any.push(clause);
        self
    }

    /// AND an exact match.
    #[must_use]
    pub fn term(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.and(FilterClause::Term {
            field: field.into(),
            value: value.into(),
        })
    }

    /// AND a match on any of `values`.
    #[must_use]
    pub fn terms<V: Into<Value>>(
        self,
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.and(FilterClause::Terms {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        })
    }

    /// AND an inclusive range.
    #[must_use]
    pub fn range(self, field: impl Into<String>, gte: Option<Value>, lte: Option<Value>) -> Self {
        self.and(FilterClause::Range {
            field: field.into(),
            gte,
            lte,
        })
    }

    /// AND a presence check.
    #[must_use]
    pub fn exists(self, field: impl Into<String>) -> Self {
        self.and(FilterClause::Exists { field: field.into() })
    }

    /// OR an exact match.
    #[must_use]
    pub fn any_term(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.or(FilterClause::Term {
            field: field.into(),
            value: value.into(),
        })
    }

    /// Every field referenced by the filter.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.all.iter().chain(&self.any).map(FilterClause::field)
    }

    /// Render as a bool query.
    #[must_use]
    pub fn to_query_json(&self) -> Value {
        let mut bool_query = serde_json::Map::new();
        bool_query.insert(
            "filter".to_string(),
            Value::Array(self.all.iter().map(FilterClause::to_json).collect()),
        );
        if !self.any.is_empty() {
            bool_query.insert(
                "should".to_string(),
                Value::Array(self.any.iter().map(FilterClause::to_json).collect()),
            );
            bool_query.insert("minimum_should_match".to_string(), json!(1));
        }
        json!({ "bool": bool_query })
    }
}

/// A mirror search request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchQuery {
    /// Filter.
    pub filter: DocumentFilter,
    /// 1-based page number.
    pub page: u32,
    /// Page size.
    pub per_page: u32,
    /// Sort expression, e.g. `-id,name`.
    pub sort: Option<String>,
    /// Projection; empty returns whole documents.
    pub fields: Vec<String>,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            filter: DocumentFilter::default(),
            page: 1,
            per_page: 0,
            sort: None,
            fields: Vec::new(),
        }
    }
}

impl SearchQuery {
    /// Parsed sort keys.
    #[must_use]
    pub fn sort_keys(&self) -> Vec<SortKey> {
        self.sort.as_deref().map(SortKey::parse_list).unwrap_or_default()
    }

    /// Render the full search body: query, pagination, sort and projection.
    #[must_use]
    pub fn to_request_json(&self) -> Value {
        let from = u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page);
        let mut body = json!({
            "query": self.filter.to_query_json(),
            "from": from,
            "size": self.per_page,
            "track_total_hits": true,
        });
        let sort: Vec<Value> = self
            .sort_keys()
            .into_iter()
            .map(|key| {
                let order = if key.descending { "desc" } else { "asc" };
                json!({ key.field: { "order": order } })
            })
            .collect();
        if !sort.is_empty() {
            body["sort"] = Value::Array(sort);
        }
        if !self.fields.is_empty() {
            body["_source"] = json!(self.fields);
        }
        body
    }
}

/// Search result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchHits {
    /// Matching documents across all pages.
    pub total: u64,
    /// Documents on this page.
    pub documents: Vec<Value>,
}

/// Document mirror collaborator.
///
/// Documents are keyed by their `id` field unless `key_fields` says
/// otherwise.
pub trait DocumentMirror: Send + Sync {
    /// Create or replace one document.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError`] if the document store rejects the write.
    fn upsert<'a>(&'a self, index: &'a str, document: Value) -> MirrorFuture<'a, ()>;

    /// Create or replace many documents in one bulk request.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError`] if the bulk request fails.
    fn upsert_many<'a>(
        &'a self,
        index: &'a str,
        documents: Vec<Value>,
        key_fields: &'a [&'a str],
    ) -> MirrorFuture<'a, ()>;

    /// Run a filtered, paginated search.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError`] if the search fails.
    fn search<'a>(&'a self, index: &'a str, query: SearchQuery) -> MirrorFuture<'a, SearchHits>;
}
