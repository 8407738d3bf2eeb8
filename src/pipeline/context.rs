//! Per-request state shared by the handler chain.

use std::path::Path;

use axum::http::{header, Method};
use tempfile::TempPath;

use crate::config::EtagPolicy;
use crate::db::OperationResult;
use crate::document::{Content, Document};
use crate::http::exchange::Exchange;
use crate::security::Account;

/// Query parameter forcing ETag verification for a single request.
pub const CHECK_ETAG_QUERY_PARAM: &str = "checkEtag";

/// Suffix marking a collection as a files bucket.
pub const FILES_BUCKET_SUFFIX: &str = ".files";

/// HTTP method as seen by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMethod {
    Get,
    Put,
    Post,
    Patch,
    Delete,
    Options,
    Other,
}

impl From<&Method> for RequestMethod {
    fn from(method: &Method) -> Self {
        match *method {
            Method::GET => RequestMethod::Get,
            Method::PUT => RequestMethod::Put,
            Method::POST => RequestMethod::Post,
            Method::PATCH => RequestMethod::Patch,
            Method::DELETE => RequestMethod::Delete,
            Method::OPTIONS => RequestMethod::Options,
            _ => RequestMethod::Other,
        }
    }
}

/// Kind of resource addressed by the request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    Root,
    Db,
    Collection,
    Document,
    FilesBucket,
    File,
    Invalid,
}

/// A binary payload received in a multipart upload, kept on temp storage
/// until the request ends.
#[derive(Debug)]
pub struct UploadedFile {
    path: TempPath,
}

impl UploadedFile {
    pub fn new(path: TempPath) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Mutable state for one pipeline pass.
#[derive(Debug)]
pub struct RequestContext {
    pub method: RequestMethod,
    pub resource_type: ResourceType,
    /// Decoded path with segments joined by `/`.
    pub request_path: String,
    pub db_name: String,
    pub collection_name: Option<String>,
    pub document_id: Option<String>,

    pub content: Content,
    pub file: Option<UploadedFile>,

    /// Value of `If-Match`, if sent.
    pub etag: Option<String>,
    pub etag_check_required: bool,

    /// Current db properties, when the db exists.
    pub db_props: Option<Document>,
    pub db_operation_result: Option<OperationResult>,
    pub account: Option<Account>,

    pub warnings: Vec<String>,
}

impl RequestContext {
    /// Derive the context from the request line and headers.
    pub fn from_exchange(exchange: &Exchange, db_policy: EtagPolicy) -> Self {
        let method = RequestMethod::from(exchange.method());

        let segments: Vec<String> = exchange
            .uri()
            .path()
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| {
                urlencoding::decode(s)
                    .map(|d| d.into_owned())
                    .unwrap_or_else(|_| s.to_string())
            })
            .collect();

        let resource_type = match segments.as_slice() {
            [] => ResourceType::Root,
            [_] => ResourceType::Db,
            [_, coll] if coll.ends_with(FILES_BUCKET_SUFFIX) => ResourceType::FilesBucket,
            [_, _] => ResourceType::Collection,
            [_, coll, _] if coll.ends_with(FILES_BUCKET_SUFFIX) => ResourceType::File,
            [_, _, _] => ResourceType::Document,
            _ => ResourceType::Invalid,
        };

        let etag = exchange
            .request_headers()
            .get(header::IF_MATCH)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().trim_matches('"').to_string())
            .filter(|v| !v.is_empty());

        let etag_check_required = match db_policy {
            EtagPolicy::Required => true,
            EtagPolicy::RequiredForDelete => method == RequestMethod::Delete,
            EtagPolicy::Optional => false,
        } || exchange.has_query_param(CHECK_ETAG_QUERY_PARAM);

        Self {
            method,
            resource_type,
            request_path: format!("/{}", segments.join("/")),
            db_name: segments.first().cloned().unwrap_or_default(),
            collection_name: segments.get(1).cloned(),
            document_id: segments.get(2).cloned(),
            content: Content::Absent,
            file: None,
            etag,
            etag_check_required,
            db_props: None,
            db_operation_result: None,
            account: None,
            warnings: Vec::new(),
        }
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};

    fn context(method: &str, uri: &str, policy: EtagPolicy) -> RequestContext {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("if-match", "\"abc\"")
            .body(Body::empty())
            .unwrap();
        RequestContext::from_exchange(&Exchange::new(request), policy)
    }

    #[test]
    fn resolves_resource_types() {
        let cases = [
            ("/", ResourceType::Root),
            ("/db", ResourceType::Db),
            ("/db/", ResourceType::Db),
            ("/db/coll", ResourceType::Collection),
            ("/db/coll/1", ResourceType::Document),
            ("/db/pics.files", ResourceType::FilesBucket),
            ("/db/pics.files/1", ResourceType::File),
            ("/db/coll/1/x", ResourceType::Invalid),
        ];
        for (uri, expected) in cases {
            assert_eq!(context("GET", uri, EtagPolicy::Optional).resource_type, expected, "{}", uri);
        }
    }

    #[test]
    fn decodes_names_and_etag() {
        let ctx = context("PUT", "/my%20db/coll", EtagPolicy::Optional);
        assert_eq!(ctx.db_name, "my db");
        assert_eq!(ctx.collection_name.as_deref(), Some("coll"));
        assert_eq!(ctx.etag.as_deref(), Some("abc"));
        assert_eq!(ctx.method, RequestMethod::Put);
    }

    #[test]
    fn etag_check_follows_policy_and_query() {
        assert!(context("PUT", "/db", EtagPolicy::Required).etag_check_required);
        assert!(!context("PUT", "/db", EtagPolicy::RequiredForDelete).etag_check_required);
        assert!(context("DELETE", "/db", EtagPolicy::RequiredForDelete).etag_check_required);
        assert!(context("PUT", "/db?checkEtag", EtagPolicy::Optional).etag_check_required);
    }

    #[test]
    fn root_has_empty_db_name() {
        let ctx = context("PUT", "/", EtagPolicy::Optional);
        assert_eq!(ctx.db_name, "");
        assert_eq!(ctx.request_path, "/");
    }
}
