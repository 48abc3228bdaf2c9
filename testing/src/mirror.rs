//! Recording document mirror.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Panics only on a poisoned lock

use crate::record_store::compare_values;
use record_lifecycle_core::mirror::{
    DocumentFilter, DocumentMirror, FilterClause, MirrorError, MirrorFuture, SearchHits,
    SearchQuery,
};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Arc, RwLock};

/// In-memory [`DocumentMirror`] that keeps every upserted document.
///
/// Search evaluates filters the way the document store would, which is
/// enough to exercise the controller's search path. Switch it to failing
/// mode to exercise the sync-failed bookkeeping.
#[derive(Clone, Debug, Default)]
pub struct RecordingMirror {
    indices: Arc<RwLock<HashMap<String, BTreeMap<String, Value>>>>,
    writes: Arc<AtomicUsize>,
    bulk_writes: Arc<AtomicUsize>,
    failing: Arc<AtomicBool>,
}

impl RecordingMirror {
    /// Create an empty mirror.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, AtomicOrdering::SeqCst);
    }

    /// Stored document with the given key.
    #[must_use]
    pub fn document(&self, index: &str, key: &str) -> Option<Value> {
        self.indices
            .read()
            .unwrap()
            .get(index)
            .and_then(|documents| documents.get(key).cloned())
    }

    /// Number of documents in `index`.
    #[must_use]
    pub fn len(&self, index: &str) -> usize {
        self.indices
            .read()
            .unwrap()
            .get(index)
            .map_or(0, BTreeMap::len)
    }

    /// Whether `index` holds no documents.
    #[must_use]
    pub fn is_empty(&self, index: &str) -> bool {
        self.len(index) == 0
    }

    /// Successful single-document writes.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.writes.load(AtomicOrdering::SeqCst)
    }

    /// Successful bulk writes.
    #[must_use]
    pub fn bulk_writes(&self) -> usize {
        self.bulk_writes.load(AtomicOrdering::SeqCst)
    }

    fn check_available(&self) -> Result<(), MirrorError> {
        if self.failing.load(AtomicOrdering::SeqCst) {
            Err(MirrorError::Unavailable("injected failure".to_string()))
        } else {
            Ok(())
        }
    }

    fn store(&self, index: &str, key: String, document: Value) {
        self.indices
            .write()
            .unwrap()
            .entry(index.to_string())
            .or_default()
            .insert(key, document);
    }
}

fn document_key(document: &Value, key_fields: &[&str]) -> Result<String, MirrorError> {
    let parts = key_fields
        .iter()
        .map(|field| match document.get(field) {
            Some(Value::String(text)) => Ok(text.clone()),
            Some(value) if !value.is_null() => Ok(value.to_string()),
            _ => Err(MirrorError::Serialization(format!("document has no key field {field}"))),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(parts.join(":"))
}

fn clause_matches(document: &Value, clause: &FilterClause) -> bool {
    let value = document.get(clause.field()).unwrap_or(&Value::Null);
    match clause {
        FilterClause::Term { value: expected, .. } => value == expected,
        FilterClause::Terms { values, .. } => values.contains(value),
        FilterClause::Range { gte, lte, .. } => {
            !value.is_null()
                && gte.as_ref().is_none_or(|gte| compare_values(value, gte) != Ordering::Less)
                && lte.as_ref().is_none_or(|lte| compare_values(value, lte) != Ordering::Greater)
        },
        FilterClause::Exists { .. } => !value.is_null(),
    }
}

fn filter_matches(document: &Value, filter: &DocumentFilter) -> bool {
    filter.all.iter().all(|clause| clause_matches(document, clause))
        && (filter.any.is_empty() || filter.any.iter().any(|clause| clause_matches(document, clause)))
}

fn project(document: Value, fields: &[String]) -> Value {
    if fields.is_empty() {
        return document;
    }
    let Value::Object(object) = document else {
        return document;
    };
    Value::Object(
        object
            .into_iter()
            .filter(|(key, _)| fields.contains(key))
            .collect::<Map<String, Value>>(),
    )
}

impl DocumentMirror for RecordingMirror {
    fn upsert<'a>(&'a self, index: &'a str, document: Value) -> MirrorFuture<'a, ()> {
        Box::pin(async move {
            self.check_available()?;
            let key = document_key(&document, &["id"])?;
            self.store(index, key, document);
            self.writes.fetch_add(1, AtomicOrdering::SeqCst);
            Ok(())
        })
    }

    fn upsert_many<'a>(
        &'a self,
        index: &'a str,
        documents: Vec<Value>,
        key_fields: &'a [&'a str],
    ) -> MirrorFuture<'a, ()> {
        Box::pin(async move {
            self.check_available()?;
            for document in documents {
                let key = document_key(&document, key_fields)?;
                self.store(index, key, document);
            }
            self.bulk_writes.fetch_add(1, AtomicOrdering::SeqCst);
            Ok(())
        })
    }

    fn search<'a>(&'a self, index: &'a str, query: SearchQuery) -> MirrorFuture<'a, SearchHits> {
        Box::pin(async move {
            self.check_available()?;
            let mut matching: Vec<Value> = self
                .indices
                .read()
                .unwrap()
                .get(index)
                .map(|documents| {
                    documents
                        .values()
                        .filter(|document| filter_matches(document, &query.filter))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();

            let sort = query.sort_keys();
            matching.sort_by(|a, b| {
                sort.iter()
                    .map(|key| {
                        let ordering = compare_values(
                            a.get(&key.field).unwrap_or(&Value::Null),
                            b.get(&key.field).unwrap_or(&Value::Null),
                        );
                        if key.descending { ordering.reverse() } else { ordering }
                    })
                    .find(|ordering| ordering.is_ne())
                    .unwrap_or(Ordering::Equal)
            });

            let total = matching.len() as u64;
            let skip = query.page.saturating_sub(1) as usize * query.per_page as usize;
            let documents = matching
                .into_iter()
                .skip(skip)
                .take(query.per_page as usize)
                .map(|document| project(document, &query.fields))
                .collect();
            Ok(SearchHits { total, documents })
        })
    }
}
