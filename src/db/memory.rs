// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process document store with Firestore-like semantics.
//!
//! Documents are kept as JSON values grouped by collection. Single-document
//! operations hold the shard lock for that document, so a toggle or a
//! read-modify-write is atomic with respect to other callers.

use crate::error::AppError;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

type Documents = Arc<DashMap<String, Value>>;

#[derive(Clone, Default)]
pub struct MemoryStore {
    collections: Arc<DashMap<String, Documents>>,
}

fn to_value<T: Serialize>(doc: &T) -> Result<Value, AppError> {
    serde_json::to_value(doc).map_err(|e| AppError::Database(format!("Serialize failed: {}", e)))
}

fn from_value<T: DeserializeOwned>(value: Value) -> Result<T, AppError> {
    serde_json::from_value(value)
        .map_err(|e| AppError::Database(format!("Deserialize failed: {}", e)))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn collection(&self, name: &str) -> Documents {
        self.collections
            .entry(name.to_string())
            .or_default()
            .value()
            .clone()
    }

    pub fn get<T: DeserializeOwned>(&self, collection: &str, id: &str) -> Result<Option<T>, AppError> {
        let value = self.collection(collection).get(id).map(|v| v.value().clone());
        value.map(from_value).transpose()
    }

    pub fn set<T: Serialize>(&self, collection: &str, id: &str, doc: &T) -> Result<(), AppError> {
        let value = to_value(doc)?;
        self.collection(collection).insert(id.to_string(), value);
        Ok(())
    }

    /// Remove a document. Returns whether it existed.
    pub fn delete(&self, collection: &str, id: &str) -> bool {
        self.collection(collection).remove(id).is_some()
    }

    pub fn list<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<T>, AppError> {
        let values: Vec<Value> = self
            .collection(collection)
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        values.into_iter().map(from_value).collect()
    }

    /// All documents whose top-level `field` equals `value`.
    pub fn find_eq<T, V>(&self, collection: &str, field: &str, value: &V) -> Result<Vec<T>, AppError>
    where
        T: DeserializeOwned,
        V: Serialize,
    {
        let wanted = to_value(value)?;
        let values: Vec<Value> = self
            .collection(collection)
            .iter()
            .filter(|entry| entry.value().get(field) == Some(&wanted))
            .map(|entry| entry.value().clone())
            .collect();
        values.into_iter().map(from_value).collect()
    }

    /// Delete the document if present, otherwise insert `doc`.
    /// Returns true when the document exists afterwards.
    pub fn toggle<T: Serialize>(&self, collection: &str, id: &str, doc: &T) -> Result<bool, AppError> {
        let value = to_value(doc)?;
        let docs = self.collection(collection);
        let present = match docs.entry(id.to_string()) {
            Entry::Occupied(entry) => {
                entry.remove();
                false
            }
            Entry::Vacant(entry) => {
                entry.insert(value);
                true
            }
        };
        Ok(present)
    }

    /// Insert `doc` only if the ID is free. Returns whether it was inserted.
    pub fn create<T: Serialize>(&self, collection: &str, id: &str, doc: &T) -> Result<bool, AppError> {
        let value = to_value(doc)?;
        match self.collection(collection).entry(id.to_string()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(entry) => {
                entry.insert(value);
                Ok(true)
            }
        }
    }

    /// Apply `f` to a document under its lock and store the result.
    /// Returns None if the document does not exist; nothing is written when
    /// `f` fails.
    pub fn update<T, F>(&self, collection: &str, id: &str, f: F) -> Result<Option<T>, AppError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut T) -> Result<(), AppError>,
    {
        let docs = self.collection(collection);
        let Some(mut entry) = docs.get_mut(id) else {
            return Ok(None);
        };

        let mut doc: T = from_value(entry.value().clone())?;
        f(&mut doc)?;
        *entry.value_mut() = to_value(&doc)?;
        Ok(Some(doc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Doc {
        owner: String,
        n: u32,
    }

    #[test]
    fn test_set_get_delete() {
        let store = MemoryStore::new();
        let doc = Doc { owner: "a".into(), n: 1 };

        store.set("docs", "1", &doc).unwrap();
        assert_eq!(store.get::<Doc>("docs", "1").unwrap(), Some(doc));
        assert!(store.delete("docs", "1"));
        assert!(!store.delete("docs", "1"));
        assert_eq!(store.get::<Doc>("docs", "1").unwrap(), None);
    }

    #[test]
    fn test_find_eq_filters_by_field() {
        let store = MemoryStore::new();
        for (id, owner) in [("1", "a"), ("2", "b"), ("3", "a")] {
            store
                .set("docs", id, &Doc { owner: owner.into(), n: 0 })
                .unwrap();
        }

        let found: Vec<Doc> = store.find_eq("docs", "owner", &"a").unwrap();
        assert_eq!(found.len(), 2);
        assert!(store.find_eq::<Doc, _>("other", "owner", &"a").unwrap().is_empty());
    }

    #[test]
    fn test_toggle_alternates() {
        let store = MemoryStore::new();
        let doc = Doc { owner: "a".into(), n: 0 };

        assert!(store.toggle("docs", "x", &doc).unwrap());
        assert!(!store.toggle("docs", "x", &doc).unwrap());
        assert!(store.toggle("docs", "x", &doc).unwrap());
        assert_eq!(store.list::<Doc>("docs").unwrap().len(), 1);
    }

    #[test]
    fn test_create_keeps_existing_document() {
        let store = MemoryStore::new();

        assert!(store.create("docs", "1", &Doc { owner: "a".into(), n: 1 }).unwrap());
        assert!(!store.create("docs", "1", &Doc { owner: "b".into(), n: 2 }).unwrap());
        assert_eq!(
            store.get::<Doc>("docs", "1").unwrap(),
            Some(Doc { owner: "a".into(), n: 1 })
        );
    }

    #[test]
    fn test_update_is_skipped_on_error() {
        let store = MemoryStore::new();
        store.set("docs", "1", &Doc { owner: "a".into(), n: 1 }).unwrap();

        let updated = store
            .update::<Doc, _>("docs", "1", |d| {
                d.n += 1;
                Ok(())
            })
            .unwrap();
        assert_eq!(updated.unwrap().n, 2);

        let err = store.update::<Doc, _>("docs", "1", |d| {
            d.n = 100;
            Err(AppError::Conflict("nope".into()))
        });
        assert!(err.is_err());
        assert_eq!(store.get::<Doc>("docs", "1").unwrap().unwrap().n, 2);

        assert!(store
            .update::<Doc, _>("docs", "missing", |_| Ok(()))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_concurrent_updates_do_not_lose_writes() {
        let store = MemoryStore::new();
        store.set("docs", "1", &Doc { owner: "a".into(), n: 0 }).unwrap();

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..100 {
                        store
                            .update::<Doc, _>("docs", "1", |d| {
                                d.n += 1;
                                Ok(())
                            })
                            .unwrap();
                    }
                });
            }
        });

        assert_eq!(store.get::<Doc>("docs", "1").unwrap().unwrap().n, 800);
    }
}
