//! Request body normalization.
//!
//! # Responsibilities
//! - Read JSON bodies into `Content::Single` / `Content::Many`
//! - Read file uploads (multipart or url-encoded forms) into a properties
//!   document plus an `UploadedFile`
//! - Check `_id` types and strip reserved top-level keys
//!
//! # Design Decisions
//! - The first failure ends the exchange; nothing is forwarded after it
//! - Reserved-key stripping only warns, it never fails a request
//! - Reserved `_id` tokens are rejected for POST only; PUT addresses the
//!   document by URL so the body id is not used for addressing

use std::path::PathBuf;

use axum::{
    body::{to_bytes, Body},
    extract::{FromRequest, Multipart},
    http::StatusCode,
};
use futures_util::future::BoxFuture;
use serde_json::Value;
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::document::{check_id_type, check_reserved_id, Content, Document, UnsupportedIdError, ID_FIELD};
use crate::http::exchange::Exchange;
use crate::http::response::{end_exchange_with_message, HAL_JSON_MEDIA_TYPE, JSON_MEDIA_TYPE};
use crate::pipeline::{
    forward, Next, PipedHandler, PipelineError, PipelineResult, RequestContext, RequestMethod, ResourceType,
    UploadedFile,
};

pub const FORM_URLENCODED_MEDIA_TYPE: &str = "application/x-www-form-urlencoded";
pub const MULTIPART_FORM_DATA_MEDIA_TYPE: &str = "multipart/form-data";

/// Form field carrying the JSON properties of an uploaded file.
pub const PROPERTIES_FIELD: &str = "properties";
pub const FILENAME_FIELD: &str = "filename";
pub const CONTENT_TYPE_FIELD: &str = "contentType";

/// Filename used when neither the properties nor the form part name one.
pub const DEFAULT_FILENAME: &str = "file";

/// Why a body was refused.
#[derive(Debug, Error)]
pub enum BodyError {
    #[error("Content-Type must be either: application/hal+json or application/json")]
    UnsupportedJsonContentType,

    #[error("Content-Type must be either: application/x-www-form-urlencoded or multipart/form-data")]
    UnsupportedFormContentType,

    #[error("There is no form parser registered for the request content type")]
    NoFormParser,

    #[error("Error parsing the multipart form: data could not be read")]
    UnreadableForm,

    #[error("Invalid data: 'properties' field is not a valid JSON")]
    InvalidProperties,

    #[error("This request does not contain any binary file")]
    MissingFile,

    #[error("request body is too large or could not be read")]
    UnreadableBody,

    #[error("Invalid JSON")]
    InvalidJson,

    #[error("the content must be either an object or an array of objects")]
    NotAnObject,

    #[error(transparent)]
    UnsupportedId(#[from] UnsupportedIdError),

    #[error("id is reserved: {0}")]
    ReservedId(String),

    #[error("failed to store uploaded file: {0}")]
    Storage(#[from] std::io::Error),
}

impl BodyError {
    pub fn status(&self) -> StatusCode {
        match self {
            BodyError::UnsupportedJsonContentType | BodyError::UnsupportedFormContentType => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            BodyError::UnreadableBody => StatusCode::PAYLOAD_TOO_LARGE,
            BodyError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::NOT_ACCEPTABLE,
        }
    }
}

/// Normalizes the request body into `RequestContext::content`.
pub struct BodyInjector {
    next: Next,
    max_body_size: usize,
}

impl BodyInjector {
    pub fn new(next: Next, max_body_size: usize) -> Self {
        Self { next, max_body_size }
    }

    async fn read_json(&self, exchange: &mut Exchange) -> Result<Content, BodyError> {
        let bytes = match exchange.take_body() {
            Some(body) => to_bytes(body, self.max_body_size)
                .await
                .map_err(|_| BodyError::UnreadableBody)?,
            None => return Ok(Content::Absent),
        };

        if bytes.is_empty() {
            return Ok(Content::Absent);
        }

        if !has_media_type(exchange, &[HAL_JSON_MEDIA_TYPE, JSON_MEDIA_TYPE]) {
            return Err(BodyError::UnsupportedJsonContentType);
        }

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Content::Absent);
        }

        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Object(doc)) => Ok(Content::Single(doc)),
            Ok(Value::Array(items)) => {
                let docs = items
                    .into_iter()
                    .map(|item| match item {
                        Value::Object(doc) => Ok(doc),
                        _ => Err(BodyError::NotAnObject),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Content::Many(docs))
            }
            Ok(other) => {
                tracing::debug!(kind = crate::document::json_type_name(&other), "JSON body is not an object or array");
                Err(BodyError::InvalidJson)
            }
            Err(e) => {
                tracing::debug!(error = %e, "Invalid JSON body");
                Err(BodyError::InvalidJson)
            }
        }
    }

    async fn read_form(&self, exchange: &mut Exchange) -> Result<(Document, UploadedFile), BodyError> {
        if has_media_type(exchange, &[MULTIPART_FORM_DATA_MEDIA_TYPE]) {
            return read_multipart(exchange).await;
        }

        if !has_media_type(exchange, &[FORM_URLENCODED_MEDIA_TYPE]) {
            return Err(BodyError::UnsupportedFormContentType);
        }

        // url-encoded forms carry no file parts
        let body = exchange.take_body().ok_or(BodyError::UnreadableForm)?;
        let bytes = to_bytes(body, self.max_body_size)
            .await
            .map_err(|_| BodyError::UnreadableForm)?;
        let properties = url::form_urlencoded::parse(&bytes)
            .find(|(k, _)| k == PROPERTIES_FIELD)
            .map(|(_, v)| v.into_owned());
        parse_properties(properties.as_deref())?;
        Err(BodyError::MissingFile)
    }

    async fn normalize(&self, exchange: &mut Exchange, context: &mut RequestContext) -> Result<Content, BodyError> {
        let content = if is_file_request(context) {
            let (doc, file) = self.read_form(exchange).await?;
            context.file = Some(file);
            Content::Single(doc)
        } else {
            self.read_json(exchange).await?
        };

        let content = match content {
            Content::Absent => Content::Absent,
            Content::Many(docs) => {
                for doc in &docs {
                    check_id_type(doc)?;
                }
                Content::Many(docs)
            }
            Content::Single(mut doc) => {
                check_id_type(&doc)?;
                filter_reserved_keys(&mut doc, context);
                Content::Single(doc)
            }
        };

        if context.method == RequestMethod::Post {
            if let Some(id) = check_reserved_id(&content) {
                return Err(BodyError::ReservedId(id.to_string()));
            }
        }

        Ok(content)
    }
}

impl PipedHandler for BodyInjector {
    fn handle<'a>(
        &'a self,
        exchange: &'a mut Exchange,
        context: &'a mut RequestContext,
    ) -> BoxFuture<'a, PipelineResult> {
        Box::pin(async move {
            if matches!(
                context.method,
                RequestMethod::Get | RequestMethod::Options | RequestMethod::Delete
            ) {
                return forward(&self.next, exchange, context).await;
            }

            match self.normalize(exchange, context).await {
                Ok(content) => {
                    context.content = content;
                    forward(&self.next, exchange, context).await
                }
                Err(BodyError::Storage(e)) => Err(PipelineError::Io(e)),
                Err(e) => {
                    end_exchange_with_message(exchange, e.status(), e.to_string());
                    Ok(())
                }
            }
        })
    }
}

fn is_file_request(context: &RequestContext) -> bool {
    matches!(
        (context.method, context.resource_type),
        (RequestMethod::Put, ResourceType::File) | (RequestMethod::Post, ResourceType::FilesBucket)
    )
}

fn has_media_type(exchange: &Exchange, allowed: &[&str]) -> bool {
    exchange
        .content_types()
        .iter()
        .any(|ct| allowed.iter().any(|a| ct.starts_with(a)))
}

async fn read_multipart(exchange: &mut Exchange) -> Result<(Document, UploadedFile), BodyError> {
    let request = exchange.take_request().ok_or(BodyError::UnreadableForm)?;
    let mut multipart = Multipart::from_request(request, &()).await.map_err(|e| {
        tracing::debug!(error = %e, "Multipart parser rejected the request");
        BodyError::NoFormParser
    })?;

    let mut properties: Option<String> = None;
    let mut upload: Option<(UploadedFile, Option<String>)> = None;

    while let Some(mut field) = multipart.next_field().await.map_err(|e| {
        tracing::debug!(error = %e, "Failed to read multipart field");
        BodyError::UnreadableForm
    })? {
        let is_file = field.file_name().is_some();

        if is_file && upload.is_none() {
            let file_name = field.file_name().map(str::to_string);
            let (file, path) = NamedTempFile::new()?.into_parts();
            let mut file = tokio::fs::File::from_std(file);
            while let Some(chunk) = field.chunk().await.map_err(|_| BodyError::UnreadableForm)? {
                file.write_all(&chunk).await?;
            }
            file.flush().await?;
            upload = Some((UploadedFile::new(path), file_name));
        } else if !is_file && field.name() == Some(PROPERTIES_FIELD) && properties.is_none() {
            properties = Some(field.text().await.map_err(|_| BodyError::UnreadableForm)?);
        }
    }

    let mut doc = parse_properties(properties.as_deref())?;
    let (file, form_filename) = upload.ok_or(BodyError::MissingFile)?;

    put_filename(form_filename.as_deref(), DEFAULT_FILENAME, &mut doc);
    inject_content_type(&mut doc, file.path().to_path_buf()).await;

    Ok((doc, file))
}

fn parse_properties(raw: Option<&str>) -> Result<Document, BodyError> {
    match raw {
        None => Ok(Document::new()),
        Some(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(doc)) => Ok(doc),
            _ => Err(BodyError::InvalidProperties),
        },
    }
}

/// A string `filename` in the properties wins over the form part's filename;
/// `default` is used when neither is a non-empty string.
pub fn put_filename(form_filename: Option<&str>, default: &str, target: &mut Document) {
    let filename = match target.get(FILENAME_FIELD) {
        Some(Value::String(name)) => Some(name.as_str()),
        _ => form_filename,
    }
    .filter(|name| !name.is_empty())
    .unwrap_or_else(|| {
        tracing::debug!("No filename in properties or multipart part, using default");
        default
    })
    .to_string();

    target.insert(FILENAME_FIELD.to_string(), Value::String(filename));
}

async fn inject_content_type(target: &mut Document, path: PathBuf) {
    if !target.get(CONTENT_TYPE_FIELD).map_or(true, Value::is_null) {
        return;
    }
    if let Some(media_type) = detect_media_type(path).await {
        target.insert(CONTENT_TYPE_FIELD.to_string(), Value::String(media_type));
    }
}

/// Sniff the media type of a stored file from its leading bytes.
pub async fn detect_media_type(path: PathBuf) -> Option<String> {
    match tokio::task::spawn_blocking(move || infer::get_from_path(&path)).await {
        Ok(Ok(kind)) => kind.map(|k| k.mime_type().to_string()),
        Ok(Err(e)) => {
            tracing::debug!(error = %e, "Could not read uploaded file for media type detection");
            None
        }
        Err(e) => {
            tracing::debug!(error = %e, "Media type detection task failed");
            None
        }
    }
}

/// Remove top-level keys starting with `_` (other than `_id`), recording one
/// warning per removed key.
pub fn filter_reserved_keys(doc: &mut Document, context: &mut RequestContext) {
    let reserved: Vec<String> = doc
        .keys()
        .filter(|k| k.starts_with('_') && k.as_str() != ID_FIELD)
        .cloned()
        .collect();

    for key in reserved {
        doc.remove(&key);
        context.add_warning(format!("Reserved field {} was filtered out from the request", key));
    }
}
