//! In-process database backend.
//!
//! Stores one properties document per db in a `DashMap`. The ETag comparison
//! and the write happen while the entry's shard lock is held, which gives the
//! compare-and-set the pipeline relies on.

use std::sync::Arc;

use axum::http::StatusCode;
use dashmap::{mapref::entry::Entry, DashMap};
use futures_util::future::BoxFuture;
use serde_json::Value;
use uuid::Uuid;

use crate::db::{Database, DbError, OperationResult};
use crate::document::{Document, ETAG_FIELD, ID_FIELD};

/// Thread-safe in-memory store of db properties.
#[derive(Clone, Default)]
pub struct InMemoryDatabase {
    dbs: Arc<DashMap<String, Document>>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of dbs stored.
    pub fn count(&self) -> usize {
        self.dbs.len()
    }

    fn new_etag() -> String {
        Uuid::new_v4().simple().to_string()
    }

    fn conflict(current: &Document) -> OperationResult {
        match current.get(ETAG_FIELD).and_then(Value::as_str) {
            Some(etag) => OperationResult::with_etag(StatusCode::CONFLICT, etag),
            None => OperationResult::new(StatusCode::CONFLICT),
        }
    }
}

impl Database for InMemoryDatabase {
    fn get_db_props<'a>(&'a self, db_name: &'a str) -> BoxFuture<'a, Result<Option<Document>, DbError>> {
        Box::pin(async move { Ok(self.dbs.get(db_name).map(|r| r.value().clone())) })
    }

    fn upsert_db<'a>(
        &'a self,
        db_name: &'a str,
        content: Document,
        etag: Option<&'a str>,
        updating: bool,
        patching: bool,
        check_etag: bool,
    ) -> BoxFuture<'a, Result<OperationResult, DbError>> {
        Box::pin(async move {
            if patching && !updating {
                return Ok(OperationResult::new(StatusCode::NOT_FOUND));
            }

            let new_etag = Self::new_etag();
            let mut new_props = content;
            new_props.remove(ID_FIELD);
            new_props.insert(ETAG_FIELD.to_string(), Value::String(new_etag.clone()));

            let result = match self.dbs.entry(db_name.to_string()) {
                Entry::Vacant(entry) => {
                    if patching {
                        return Ok(OperationResult::new(StatusCode::NOT_FOUND));
                    }
                    entry.insert(new_props);
                    OperationResult::with_etag(StatusCode::CREATED, new_etag)
                }
                Entry::Occupied(mut entry) => {
                    let stored = entry.get().get(ETAG_FIELD).and_then(Value::as_str);
                    let stale = match (etag, stored) {
                        (Some(sent), Some(stored)) => sent != stored,
                        (None, Some(_)) => check_etag,
                        _ => false,
                    };

                    if stale {
                        tracing::debug!(db = %db_name, sent = ?etag, "ETag mismatch");
                        return Ok(Self::conflict(entry.get()));
                    }

                    if patching {
                        let props = entry.get_mut();
                        for (key, value) in new_props {
                            props.insert(key, value);
                        }
                    } else {
                        entry.insert(new_props);
                    }
                    OperationResult::with_etag(StatusCode::NO_CONTENT, new_etag)
                }
            };

            Ok(result)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn create_then_update_with_rolling_etag() {
        let db = InMemoryDatabase::new();

        let created = db.upsert_db("shop", doc(json!({"a": 1})), None, false, false, true).await.unwrap();
        assert_eq!(created.status, StatusCode::CREATED);
        let first = created.etag.unwrap();

        let updated = db
            .upsert_db("shop", doc(json!({"a": 2})), Some(&first), true, false, true)
            .await
            .unwrap();
        assert_eq!(updated.status, StatusCode::NO_CONTENT);
        assert_ne!(updated.etag.as_deref(), Some(first.as_str()));

        let props = db.get_db_props("shop").await.unwrap().unwrap();
        assert_eq!(props["a"], 2);
        assert_eq!(props[ETAG_FIELD], json!(updated.etag.unwrap()));
    }

    #[tokio::test]
    async fn stale_etag_conflicts_and_leaves_state() {
        let db = InMemoryDatabase::new();
        let first = db.upsert_db("shop", doc(json!({"a": 1})), None, false, false, false).await.unwrap();
        let second = db
            .upsert_db("shop", doc(json!({"a": 2})), first.etag.as_deref(), true, false, false)
            .await
            .unwrap();

        let stale = db
            .upsert_db("shop", doc(json!({"a": 3})), first.etag.as_deref(), true, false, false)
            .await
            .unwrap();
        assert!(stale.is_conflict());
        assert_eq!(stale.etag, second.etag);

        let props = db.get_db_props("shop").await.unwrap().unwrap();
        assert_eq!(props["a"], 2);
    }

    #[tokio::test]
    async fn missing_etag_conflicts_only_when_required() {
        let db = InMemoryDatabase::new();
        db.upsert_db("shop", Document::new(), None, false, false, false).await.unwrap();

        let required = db.upsert_db("shop", Document::new(), None, true, false, true).await.unwrap();
        assert!(required.is_conflict());

        let optional = db.upsert_db("shop", Document::new(), None, true, false, false).await.unwrap();
        assert_eq!(optional.status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn patch_merges_and_requires_existing_db() {
        let db = InMemoryDatabase::new();
        let missing = db.upsert_db("shop", doc(json!({"b": 1})), None, false, true, false).await.unwrap();
        assert_eq!(missing.status, StatusCode::NOT_FOUND);
        assert_eq!(db.count(), 0);

        db.upsert_db("shop", doc(json!({"a": 1})), None, false, false, false).await.unwrap();
        db.upsert_db("shop", doc(json!({"b": 2})), None, true, true, false).await.unwrap();

        let props = db.get_db_props("shop").await.unwrap().unwrap();
        assert_eq!(props["a"], 1);
        assert_eq!(props["b"], 2);
    }

    #[tokio::test]
    async fn client_id_is_not_stored() {
        let db = InMemoryDatabase::new();
        db.upsert_db("shop", doc(json!({"_id": "x", "a": 1})), None, false, false, false)
            .await
            .unwrap();
        let props = db.get_db_props("shop").await.unwrap().unwrap();
        assert!(props.get(ID_FIELD).is_none());
    }

    #[tokio::test]
    async fn concurrent_writers_with_same_etag_single_winner() {
        let db = InMemoryDatabase::new();
        let created = db.upsert_db("shop", Document::new(), None, false, false, true).await.unwrap();
        let etag = created.etag.unwrap();

        let mut tasks = Vec::new();
        for i in 0..8 {
            let db = db.clone();
            let etag = etag.clone();
            tasks.push(tokio::spawn(async move {
                db.upsert_db("shop", doc(json!({"writer": i})), Some(&etag), true, false, true)
                    .await
                    .unwrap()
            }));
        }

        let mut winners = 0;
        for task in tasks {
            if task.await.unwrap().status == StatusCode::NO_CONTENT {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
