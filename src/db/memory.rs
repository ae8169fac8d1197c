// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process document store used for tests and local development.
//!
//! Collections keep insertion order so query results are deterministic.
//! Each collection lives behind one map entry, which serialises writers to
//! that collection and makes unique-field checks atomic with the insert.

use crate::db::pipeline::Filter;
use crate::error::AppError;
use dashmap::DashMap;
use serde_json::{Map, Value};
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct MemoryBackend {
    collections: Arc<DashMap<String, Vec<Value>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, collection: &str, id: &str) -> Option<Value> {
        self.collections
            .get(collection)?
            .iter()
            .find(|doc| doc_id(doc) == Some(id))
            .cloned()
    }

    pub fn find(&self, collection: &str, filter: &Filter) -> Vec<Value> {
        self.collections
            .get(collection)
            .map(|docs| docs.iter().filter(|d| filter.matches(d)).cloned().collect())
            .unwrap_or_default()
    }

    /// Insert a new document, failing if its ID or any unique field is taken.
    pub fn insert(
        &self,
        collection: &str,
        id: &str,
        doc: Value,
        unique_fields: &[&str],
    ) -> Result<(), AppError> {
        let mut docs = self.collections.entry(collection.to_string()).or_default();

        if docs.iter().any(|d| doc_id(d) == Some(id)) {
            return Err(AppError::Conflict(format!(
                "Document {} already exists in {}",
                id, collection
            )));
        }

        for field in unique_fields {
            let value = doc.get(*field).cloned().unwrap_or(Value::Null);
            if docs.iter().any(|d| d.get(*field) == Some(&value)) {
                return Err(AppError::Conflict(format!("{} already taken", field)));
            }
        }

        docs.push(doc);
        Ok(())
    }

    /// Overwrite the given top-level fields and return the updated document.
    pub fn set_fields(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Option<Value> {
        let mut docs = self.collections.get_mut(collection)?;
        let doc = docs.iter_mut().find(|d| doc_id(d) == Some(id))?;

        if let Value::Object(map) = &mut *doc {
            for (key, value) in fields {
                map.insert(key, value);
            }
        }
        Some(doc.clone())
    }

    /// Insert or replace a document.
    pub fn put(&self, collection: &str, id: &str, doc: Value) {
        let mut docs = self.collections.entry(collection.to_string()).or_default();
        match docs.iter_mut().find(|d| doc_id(d) == Some(id)) {
            Some(existing) => *existing = doc,
            None => docs.push(doc),
        }
    }
}

fn doc_id(doc: &Value) -> Option<&str> {
    doc.get("_id").and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_insert_rejects_duplicate_unique_field() {
        let store = MemoryBackend::new();
        store
            .insert("users", "1", json!({"_id": "1", "username": "a"}), &["username"])
            .unwrap();

        let err = store
            .insert("users", "2", json!({"_id": "2", "username": "a"}), &["username"])
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(store.find("users", &Filter::eq("username", "a")).len(), 1);
    }

    #[test]
    fn test_set_fields_returns_updated_document() {
        let store = MemoryBackend::new();
        store.put("users", "1", json!({"_id": "1", "refreshToken": "old"}));

        let mut fields = Map::new();
        fields.insert("refreshToken".to_string(), Value::Null);
        let updated = store.set_fields("users", "1", fields).unwrap();

        assert!(updated["refreshToken"].is_null());
        assert!(store.get("users", "1").unwrap()["refreshToken"].is_null());
        assert!(store.set_fields("users", "missing", Map::new()).is_none());
    }

    #[test]
    fn test_find_preserves_insertion_order() {
        let store = MemoryBackend::new();
        for id in ["c", "a", "b"] {
            store.put("videos", id, json!({"_id": id, "owner": "u"}));
        }
        let ids: Vec<String> = store
            .find("videos", &Filter::eq("owner", "u"))
            .into_iter()
            .map(|d| d["_id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }
}
