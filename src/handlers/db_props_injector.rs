//! Loads the current db properties into the request context.

use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::cache::DbPropsCache;
use crate::db::Database;
use crate::http::exchange::Exchange;
use crate::pipeline::{forward, Next, PipedHandler, PipelineResult, RequestContext};

/// Reads through the cache: a hit skips the backend, a miss populates the
/// cache when the db exists.
pub struct DbPropsInjector {
    next: Next,
    database: Arc<dyn Database>,
    cache: DbPropsCache,
}

impl DbPropsInjector {
    pub fn new(next: Next, database: Arc<dyn Database>, cache: DbPropsCache) -> Self {
        Self { next, database, cache }
    }
}

impl PipedHandler for DbPropsInjector {
    fn handle<'a>(
        &'a self,
        exchange: &'a mut Exchange,
        context: &'a mut RequestContext,
    ) -> BoxFuture<'a, PipelineResult> {
        Box::pin(async move {
            if !context.db_name.is_empty() {
                context.db_props = match self.cache.get(&context.db_name) {
                    Some(props) => Some(props),
                    None => {
                        let generation = self.cache.generation(&context.db_name);
                        let props = self.database.get_db_props(&context.db_name).await?;
                        if let Some(props) = &props {
                            self.cache.put(&context.db_name, generation, props.clone());
                        }
                        props
                    }
                };
            }

            forward(&self.next, exchange, context).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::db::{DbError, InMemoryDatabase, OperationResult};
    use crate::document::{Content, Document};
    use crate::handlers::put_db::PutDbHandler;
    use crate::testing::{fixtures, json_request, RecordingHandler, ScriptedDatabase};
    use axum::http::StatusCode;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::Notify;

    /// Backend whose first read parks after taking its snapshot.
    #[derive(Default)]
    struct ParkedReadDatabase {
        inner: InMemoryDatabase,
        parked: AtomicBool,
        snapshot_taken: Notify,
        release: Notify,
    }

    impl Database for ParkedReadDatabase {
        fn get_db_props<'a>(&'a self, db_name: &'a str) -> BoxFuture<'a, Result<Option<Document>, DbError>> {
            Box::pin(async move {
                let props = self.inner.get_db_props(db_name).await?;
                if !self.parked.swap(true, Ordering::SeqCst) {
                    self.snapshot_taken.notify_one();
                    self.release.notified().await;
                }
                Ok(props)
            })
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
            self.inner.upsert_db(db_name, content, etag, updating, patching, check_etag)
        }
    }

    fn cache() -> DbPropsCache {
        DbPropsCache::new(&CacheConfig {
            enabled: true,
            ttl_secs: 60,
        })
    }

    #[tokio::test]
    async fn second_read_is_served_from_cache() {
        let database = Arc::new(
            ScriptedDatabase::new(OperationResult::new(StatusCode::NO_CONTENT))
                .with_props(json!({"a": 1}).as_object().cloned().unwrap()),
        );
        let next = Arc::new(RecordingHandler::default());
        let injector = DbPropsInjector::new(Some(next.clone()), database.clone(), cache());

        for _ in 0..2 {
            let (mut exchange, mut context) = fixtures(json_request("GET", "/shop", ""));
            injector.handle(&mut exchange, &mut context).await.unwrap();
            assert_eq!(context.db_props.unwrap()["a"], 1);
        }

        assert_eq!(database.reads(), 1);
        assert_eq!(next.calls(), 2);
    }

    #[tokio::test]
    async fn read_overtaken_by_write_does_not_repopulate_cache() {
        let database = Arc::new(ParkedReadDatabase::default());
        let v1 = json!({"v": 1}).as_object().cloned().unwrap();
        database.inner.upsert_db("shop", v1, None, false, false, false).await.unwrap();

        let cache = cache();
        let injector = DbPropsInjector::new(None, database.clone(), cache.clone());
        let writer = PutDbHandler::new(None, database.clone(), cache.clone());

        let read = async {
            let (mut exchange, mut context) = fixtures(json_request("GET", "/shop", ""));
            injector.handle(&mut exchange, &mut context).await.unwrap();
            context.db_props
        };
        let write = async {
            database.snapshot_taken.notified().await;
            let (mut exchange, mut context) = fixtures(json_request("PUT", "/shop", ""));
            context.content = Content::Single(json!({"v": 2}).as_object().cloned().unwrap());
            writer.handle(&mut exchange, &mut context).await.unwrap();
            database.release.notify_one();
            exchange.status()
        };
        let (stale, status) = tokio::join!(read, write);

        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(stale.unwrap()["v"], 1);
        assert!(cache.get("shop").is_none());

        let (mut exchange, mut context) = fixtures(json_request("GET", "/shop", ""));
        injector.handle(&mut exchange, &mut context).await.unwrap();
        assert_eq!(context.db_props.unwrap()["v"], 2);
        assert_eq!(cache.get("shop").unwrap()["v"], 2);
    }

    #[tokio::test]
    async fn missing_db_is_not_cached() {
        let database = Arc::new(ScriptedDatabase::new(OperationResult::new(StatusCode::NO_CONTENT)));
        let cache = cache();
        let injector = DbPropsInjector::new(None, database.clone(), cache.clone());

        let (mut exchange, mut context) = fixtures(json_request("GET", "/shop", ""));
        injector.handle(&mut exchange, &mut context).await.unwrap();

        assert!(context.db_props.is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn root_requests_skip_lookup() {
        let database = Arc::new(ScriptedDatabase::new(OperationResult::new(StatusCode::NO_CONTENT)));
        let injector = DbPropsInjector::new(None, database.clone(), cache());
        let (mut exchange, mut context) = fixtures(json_request("GET", "/", ""));
        injector.handle(&mut exchange, &mut context).await.unwrap();
        assert_eq!(database.reads(), 0);
    }
}
