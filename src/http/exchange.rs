//! The HTTP exchange threaded through the handler chain.
//!
//! # Responsibilities
//! - Hold the inbound request head and its single-use body
//! - Accumulate the outbound status, headers and body
//! - Track whether a handler has ended the exchange
//!
//! # Design Decisions
//! - Once ended, status and body are frozen; late writes are dropped
//! - The body can be taken exactly once (JSON reader or form parser)

use axum::{
    body::{Body, Bytes},
    http::{header, request::Parts, HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode, Uri},
    response::{IntoResponse, Response},
};

/// One request/response pair moving through the pipeline.
#[derive(Debug)]
pub struct Exchange {
    parts: Parts,
    body: Option<Body>,
    status: StatusCode,
    response_headers: HeaderMap,
    response_body: Option<Bytes>,
    ended: bool,
}

impl Exchange {
    pub fn new(request: Request<Body>) -> Self {
        let (parts, body) = request.into_parts();
        Self {
            parts,
            body: Some(body),
            status: StatusCode::OK,
            response_headers: HeaderMap::new(),
            response_body: None,
            ended: false,
        }
    }

    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    pub fn request_headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// All values of the request `Content-Type` header.
    pub fn content_types(&self) -> Vec<&str> {
        self.parts
            .headers
            .get_all(header::CONTENT_TYPE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect()
    }

    /// True if the query string carries `name`, with or without a value.
    pub fn has_query_param(&self, name: &str) -> bool {
        self.parts
            .uri
            .query()
            .map(|q| url::form_urlencoded::parse(q.as_bytes()).any(|(k, _)| k == name))
            .unwrap_or(false)
    }

    /// Take the request body. Returns `None` if it was already consumed.
    pub fn take_body(&mut self) -> Option<Body> {
        self.body.take()
    }

    /// Rebuild a request carrying the original head and the unread body,
    /// for extractors that need the whole request.
    pub fn take_request(&mut self) -> Option<Request<Body>> {
        let body = self.body.take()?;
        let mut request = Request::new(body);
        *request.method_mut() = self.parts.method.clone();
        *request.uri_mut() = self.parts.uri.clone();
        *request.version_mut() = self.parts.version;
        *request.headers_mut() = self.parts.headers.clone();
        *request.extensions_mut() = self.parts.extensions.clone();
        Some(request)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        if !self.ended {
            self.status = status;
        }
    }

    pub fn response_headers(&self) -> &HeaderMap {
        &self.response_headers
    }

    pub fn insert_response_header(&mut self, name: HeaderName, value: HeaderValue) {
        if !self.ended {
            self.response_headers.insert(name, value);
        }
    }

    pub fn response_body(&self) -> Option<&Bytes> {
        self.response_body.as_ref()
    }

    /// Set the response body with its content type.
    pub fn send(&mut self, content_type: &'static str, body: impl Into<Bytes>) {
        if self.ended {
            return;
        }
        self.response_headers
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        self.response_body = Some(body.into());
    }

    /// Mark the exchange complete. Idempotent.
    pub fn end(&mut self) {
        self.ended = true;
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }
}

impl IntoResponse for Exchange {
    fn into_response(self) -> Response {
        let mut response = Response::new(self.response_body.map(Body::from).unwrap_or_else(Body::empty));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.response_headers;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exchange(uri: &str) -> Exchange {
        Exchange::new(
            Request::builder()
                .method("PUT")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
    }

    #[test]
    fn query_params_are_detected_without_values() {
        let ex = exchange("/db?noauthchallenge&x=1");
        assert!(ex.has_query_param("noauthchallenge"));
        assert!(ex.has_query_param("x"));
        assert!(!ex.has_query_param("y"));
    }

    #[test]
    fn body_is_taken_once() {
        let mut ex = exchange("/db");
        assert!(ex.take_request().is_some());
        assert!(ex.take_body().is_none());
        assert!(ex.take_request().is_none());
    }

    #[test]
    fn ended_exchange_ignores_later_writes() {
        let mut ex = exchange("/db");
        ex.set_status(StatusCode::NOT_ACCEPTABLE);
        ex.send("text/plain", "first");
        ex.end();
        ex.set_status(StatusCode::OK);
        ex.send("text/plain", "second");

        assert_eq!(ex.status(), StatusCode::NOT_ACCEPTABLE);
        assert_eq!(ex.response_body().unwrap().as_ref(), b"first");
    }
}
