//! Test doubles shared by the unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures_util::future::BoxFuture;

use crate::config::EtagPolicy;
use crate::db::{Database, DbError, OperationResult};
use crate::document::Document;
use crate::http::exchange::Exchange;
use crate::pipeline::{PipedHandler, PipelineResult, RequestContext};

/// Successor that counts how often it was reached.
#[derive(Default)]
pub struct RecordingHandler {
    calls: AtomicUsize,
}

impl RecordingHandler {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PipedHandler for RecordingHandler {
    fn handle<'a>(
        &'a self,
        _exchange: &'a mut Exchange,
        _context: &'a mut RequestContext,
    ) -> BoxFuture<'a, PipelineResult> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }
}

/// Arguments of one `upsert_db` call.
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertCall {
    pub db_name: String,
    pub content: Document,
    pub etag: Option<String>,
    pub updating: bool,
    pub patching: bool,
    pub check_etag: bool,
}

/// Backend answering every write with a scripted result.
pub struct ScriptedDatabase {
    result: OperationResult,
    props: Option<Document>,
    upserts: Mutex<Vec<UpsertCall>>,
    reads: AtomicUsize,
}

impl ScriptedDatabase {
    pub fn new(result: OperationResult) -> Self {
        Self {
            result,
            props: None,
            upserts: Mutex::new(Vec::new()),
            reads: AtomicUsize::new(0),
        }
    }

    pub fn with_props(mut self, props: Document) -> Self {
        self.props = Some(props);
        self
    }

    pub fn upserts(&self) -> Vec<UpsertCall> {
        self.upserts.lock().unwrap().clone()
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl Database for ScriptedDatabase {
    fn get_db_props<'a>(&'a self, _db_name: &'a str) -> BoxFuture<'a, Result<Option<Document>, DbError>> {
        Box::pin(async move {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(self.props.clone())
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
        Box::pin(async move {
            self.upserts.lock().unwrap().push(UpsertCall {
                db_name: db_name.to_string(),
                content,
                etag: etag.map(str::to_string),
                updating,
                patching,
                check_etag,
            });
            Ok(self.result.clone())
        })
    }
}

/// Exchange and context for a request, as the entry handler would build them.
pub fn fixtures(request: Request<Body>) -> (Exchange, RequestContext) {
    let exchange = Exchange::new(request);
    let context = RequestContext::from_exchange(&exchange, EtagPolicy::Optional);
    (exchange, context)
}

pub fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn body_text(exchange: &Exchange) -> String {
    exchange
        .response_body()
        .map(|b| String::from_utf8_lossy(b).into_owned())
        .unwrap_or_default()
}

pub fn ended_with(exchange: &Exchange, status: StatusCode, message: &str) {
    assert!(exchange.is_ended(), "exchange not ended");
    assert_eq!(exchange.status(), status);
    assert_eq!(body_text(exchange), message);
}
