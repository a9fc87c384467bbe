//! Record storage.
//!
//! The catalog services only need a handful of operations from their
//! storage layer (`find`, `save`, `delete`), captured by the `RecordStore`
//! trait. `InMemoryStore` is the process-local implementation used by the
//! server binary and the tests.

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::{CatalogError, Result};
use crate::types::Record;

/// Storage capability for one kind of record.
///
/// `Send + Sync` lets a store be shared between request handlers behind an `Arc`.
pub trait RecordStore<R: Record>: Send + Sync {
    /// Every stored record, in insertion order
    fn find_all(&self) -> Vec<R>;

    fn find_by_id(&self, id: &str) -> Option<R>;

    /// Records matching a predicate, in insertion order
    fn find_where(&self, predicate: &dyn Fn(&R) -> bool) -> Vec<R>;

    /// Insert or replace a record. Records without an identifier are given
    /// a fresh one; the stored record is returned.
    fn save(&self, record: R) -> R;

    /// Replace the record stored under `id` with `apply(current)` in one step,
    /// so a concurrent `delete` cannot be undone by a stale write.
    ///
    /// Fails with `NotFound` when nothing is stored under `id`, or with
    /// whatever `apply` returns; in both cases the store is left unchanged.
    /// `apply` runs under the store's lock and must not call back into it.
    fn update_with(&self, id: &str, apply: &mut dyn FnMut(R) -> Result<R>) -> Result<R>;

    /// Remove a record. Returns `false` if nothing was stored under `id`.
    fn delete(&self, id: &str) -> bool;
}

/// `RecordStore` backed by a `HashMap`.
///
/// Each entry remembers when it was first inserted so that listings come
/// back in a stable order.
pub struct InMemoryStore<R> {
    records: RwLock<Entries<R>>,
}

struct Entries<R> {
    by_id: HashMap<String, (u64, R)>,
    next_slot: u64,
}

impl<R: Record> InMemoryStore<R> {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Entries {
                by_id: HashMap::new(),
                next_slot: 0,
            }),
        }
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.records.read().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sorted(&self, predicate: &dyn Fn(&R) -> bool) -> Vec<R> {
        let records = self.records.read();
        let mut matching: Vec<&(u64, R)> = records
            .by_id
            .values()
            .filter(|(_, record)| predicate(record))
            .collect();
        matching.sort_unstable_by_key(|(slot, _)| *slot);
        matching.into_iter().map(|(_, record)| record.clone()).collect()
    }
}

impl<R: Record> Default for InMemoryStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> RecordStore<R> for InMemoryStore<R> {
    fn find_all(&self) -> Vec<R> {
        self.sorted(&|_| true)
    }

    fn find_by_id(&self, id: &str) -> Option<R> {
        self.records
            .read()
            .by_id
            .get(id)
            .map(|(_, record)| record.clone())
    }

    fn find_where(&self, predicate: &dyn Fn(&R) -> bool) -> Vec<R> {
        self.sorted(predicate)
    }

    fn save(&self, mut record: R) -> R {
        let existing = record.id().filter(|id| !id.is_empty()).map(str::to_string);
        let id = match existing {
            Some(id) => id,
            None => {
                let id = Uuid::new_v4().simple().to_string();
                record.set_id(id.clone());
                id
            }
        };

        let mut records = self.records.write();
        let slot = match records.by_id.get(&id) {
            Some((slot, _)) => *slot,
            None => {
                let slot = records.next_slot;
                records.next_slot += 1;
                slot
            }
        };
        records.by_id.insert(id.clone(), (slot, record.clone()));
        debug!(entity = R::ENTITY, %id, "saved record");

        record
    }

    fn update_with(&self, id: &str, apply: &mut dyn FnMut(R) -> Result<R>) -> Result<R> {
        let mut records = self.records.write();
        let (slot, current) = records
            .by_id
            .get(id)
            .cloned()
            .ok_or_else(|| CatalogError::not_found(R::ENTITY, id))?;

        let mut updated = apply(current)?;
        updated.set_id(id.to_string());
        records.by_id.insert(id.to_string(), (slot, updated.clone()));
        debug!(entity = R::ENTITY, %id, "updated record");

        Ok(updated)
    }

    fn delete(&self, id: &str) -> bool {
        let removed = self.records.write().by_id.remove(id).is_some();
        debug!(entity = R::ENTITY, %id, removed, "deleted record");
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MovieInfo, Review};

    fn movie(name: &str, year: i32) -> MovieInfo {
        MovieInfo::new(name, year, vec!["Someone".to_string()], None)
    }

    #[test]
    fn test_save_assigns_id_when_missing() {
        let store = InMemoryStore::new();
        let saved = store.save(movie("Batman Begins", 2005));

        let id = saved.movie_info_id.clone().expect("id should be assigned");
        assert!(!id.is_empty());
        assert_eq!(store.find_by_id(&id), Some(saved));
    }

    #[test]
    fn test_save_keeps_given_id() {
        let store = InMemoryStore::new();
        let saved = store.save(movie("Batman Begins", 2005).with_id("abc"));
        assert_eq!(saved.movie_info_id.as_deref(), Some("abc"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_empty_id_is_replaced() {
        let store = InMemoryStore::new();
        let saved = store.save(movie("Batman Begins", 2005).with_id(""));
        assert_ne!(saved.movie_info_id.as_deref(), Some(""));
    }

    #[test]
    fn test_save_existing_id_replaces_in_place() {
        let store = InMemoryStore::new();
        store.save(movie("First", 2000).with_id("a"));
        store.save(movie("Second", 2001).with_id("b"));
        store.save(movie("First Renamed", 2000).with_id("a"));

        let names: Vec<String> = store.find_all().into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["First Renamed", "Second"]);
    }

    #[test]
    fn test_find_where_filters_in_insertion_order() {
        let store = InMemoryStore::new();
        store.save(Review::new("m1", Some("one".into()), Some(8.0)));
        store.save(Review::new("m2", Some("two".into()), Some(7.0)));
        store.save(Review::new("m1", Some("three".into()), Some(9.0)));

        let comments: Vec<Option<String>> = store
            .find_where(&|review| review.movie_info_id.as_deref() == Some("m1"))
            .into_iter()
            .map(|review| review.comment)
            .collect();
        assert_eq!(comments, vec![Some("one".into()), Some("three".into())]);
    }

    #[test]
    fn test_update_with_keeps_slot_and_id() {
        let store: InMemoryStore<MovieInfo> = InMemoryStore::new();
        store.save(movie("First", 2000).with_id("a"));
        store.save(movie("Second", 2001).with_id("b"));

        let updated = store
            .update_with("a", &mut |mut record| {
                record.name = "First Renamed".into();
                record.movie_info_id = Some("elsewhere".into());
                Ok(record)
            })
            .unwrap();

        assert_eq!(updated.movie_info_id.as_deref(), Some("a"));
        let names: Vec<String> = store.find_all().into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["First Renamed", "Second"]);
    }

    #[test]
    fn test_update_with_missing_or_rejected_leaves_store_unchanged() {
        let store: InMemoryStore<MovieInfo> = InMemoryStore::new();
        assert_eq!(
            store.update_with("gone", &mut |record| Ok(record)),
            Err(CatalogError::not_found("MovieInfo", "gone"))
        );
        assert!(store.is_empty());

        store.save(movie("First", 2000).with_id("a"));
        let err = store
            .update_with("a", &mut |_| Err(CatalogError::Validation("nope".into())))
            .unwrap_err();
        assert_eq!(err, CatalogError::Validation("nope".into()));
        assert_eq!(store.find_by_id("a").unwrap().name, "First");
    }

    #[test]
    fn test_update_after_delete_does_not_resurrect() {
        let store: InMemoryStore<MovieInfo> = InMemoryStore::new();
        store.save(movie("First", 2000).with_id("a"));
        assert!(store.delete("a"));

        assert!(store.update_with("a", &mut |record| Ok(record)).is_err());
        assert!(store.find_by_id("a").is_none());
    }

    #[test]
    fn test_delete_reports_missing() {
        let store = InMemoryStore::new();
        store.save(movie("Batman Begins", 2005).with_id("abc"));

        assert!(store.delete("abc"));
        assert!(!store.delete("abc"));
        assert!(store.is_empty());
    }
}
