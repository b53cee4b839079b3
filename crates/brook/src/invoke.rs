//! Deferred request executors.
//!
//! An [`Invocation`] is a fully-built request target (URL + headers) that
//! performs no I/O until one of its verbs is awaited. Each await issues
//! exactly one network call; there are no retries and no timeout beyond the
//! transport default.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bon::Builder;
use brook_common::error::{ClientError, EncodeError, HttpError, Result, TransportError};
use brook_common::http_client::{FormPart, HttpClient, MultipartClient};
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, Method, StatusCode};
use serde::Serialize;
use serde_json::{Value, json};
use url::Url;

use crate::filter::Filter;
use crate::response::ResponseBody;

/// A deferred, parameter-aware request executor bound to one URL.
pub struct Invocation<C> {
    http: Arc<C>,
    url: Url,
    headers: HeaderMap,
}

impl<C> Clone for Invocation<C> {
    fn clone(&self) -> Self {
        Self {
            http: self.http.clone(),
            url: self.url.clone(),
            headers: self.headers.clone(),
        }
    }
}

impl<C> Invocation<C> {
    pub(crate) fn new(http: Arc<C>, url: Url, headers: HeaderMap) -> Self {
        Self { http, url, headers }
    }

    pub(crate) fn url(&self) -> &Url {
        &self.url
    }

    pub(crate) fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub(crate) fn http(&self) -> Arc<C> {
        self.http.clone()
    }

    /// Same client and header snapshot, different target URL.
    pub(crate) fn derive(&self, url: Url) -> Self {
        Self {
            http: self.http.clone(),
            url,
            headers: self.headers.clone(),
        }
    }
}

impl<C: HttpClient> Invocation<C> {
    /// GET this resource, optionally shaped by a filter.
    pub async fn get(&self, filter: Option<&Filter>) -> Result<ResponseBody> {
        self.read(Method::GET, filter).await
    }

    /// DELETE this resource, optionally shaped by a filter.
    pub async fn delete(&self, filter: Option<&Filter>) -> Result<ResponseBody> {
        self.read(Method::DELETE, filter).await
    }

    /// POST `body` verbatim as the JSON request body.
    pub async fn post<B: Serialize + ?Sized>(&self, body: &B) -> Result<ResponseBody> {
        self.write(Method::POST, body).await
    }

    /// PUT `body` verbatim as the JSON request body.
    pub async fn put<B: Serialize + ?Sized>(&self, body: &B) -> Result<ResponseBody> {
        self.write(Method::PUT, body).await
    }

    async fn read(&self, method: Method, filter: Option<&Filter>) -> Result<ResponseBody> {
        // Filters mutate a local copy of the URL, never the template.
        let mut url = self.url.clone();
        if let Some(filter) = filter {
            filter.apply(&mut url).map_err(ClientError::Encode)?;
        }
        self.dispatch(method, url, None).await
    }

    async fn write<B: Serialize + ?Sized>(&self, method: Method, body: &B) -> Result<ResponseBody> {
        let bytes = serde_json::to_vec(body).map_err(EncodeError::from)?;
        self.dispatch(method, self.url.clone(), Some(bytes)).await
    }

    async fn dispatch(&self, method: Method, url: Url, body: Option<Vec<u8>>) -> Result<ResponseBody> {
        #[cfg(feature = "tracing")]
        let _span = tracing::debug_span!("dispatch", method = %method, url = %url).entered();

        let mut builder = http::Request::builder().method(method).uri(url.as_str());
        for (name, value) in self.headers.iter() {
            builder = builder.header(name.clone(), value.clone());
        }
        if body.is_some() {
            builder = builder.header(CONTENT_TYPE, "application/json");
        }

        let request = builder
            .body(body.unwrap_or_default())
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

        let response = self
            .http
            .send_http(request)
            .await
            .map_err(|e| TransportError::Other(Box::new(e)))?;

        interpret(response).map(ResponseBody::parse)
    }
}

/// Map a response to its raw body, or to [`HttpError`] outside [200, 400).
fn interpret(response: http::Response<Vec<u8>>) -> Result<String> {
    let status = response.status();
    let raw = String::from_utf8_lossy(response.body()).into_owned();

    if status.as_u16() < 200 || status.as_u16() >= 400 {
        Err(ClientError::Http(HttpError::new(status, raw)))
    } else {
        Ok(raw)
    }
}

/// Notification delivery executor with an implicit target filter.
///
/// The filter is closed over when the accessor creates this value (for
/// example "all users created by X", or "one specific device"); callers
/// supply only the notification payload.
pub struct PushInvocation<C> {
    inv: Invocation<C>,
    filter: Value,
}

impl<C> PushInvocation<C> {
    pub(crate) fn new(inv: Invocation<C>, filter: Value) -> Self {
        Self { inv, filter }
    }
}

impl<C: HttpClient> PushInvocation<C> {
    /// POST `{notification, filter}` to the push endpoint.
    ///
    /// The backend reports per-platform delivery counts in the response;
    /// this layer passes them through uninterpreted.
    pub async fn send(&self, notification: &Value) -> Result<ResponseBody> {
        self.inv
            .post(&json!({
                "notification": notification,
                "filter": self.filter,
            }))
            .await
    }
}

/// A base64-encoded binary payload with optional metadata.
#[derive(Debug, Clone, Builder)]
pub struct Upload {
    /// Base64-encoded file contents.
    #[builder(into)]
    pub base64: String,
    /// Filename metadata.
    #[builder(into)]
    pub filename: Option<String>,
    /// Content-type metadata.
    #[builder(into)]
    pub content_type: Option<String>,
}

/// Binary payload executor submitting multipart form data.
pub struct UploadInvocation<C> {
    http: Arc<C>,
    url: Url,
    headers: HeaderMap,
}

impl<C> UploadInvocation<C> {
    pub(crate) fn new(http: Arc<C>, url: Url, headers: HeaderMap) -> Self {
        Self { http, url, headers }
    }
}

impl<C: MultipartClient> UploadInvocation<C> {
    /// PUT the decoded payload as the `file` form field.
    ///
    /// An absent or empty payload fails immediately with status 400 before
    /// any network call. The upload acknowledgment is presence-only, so
    /// success carries no body.
    pub async fn put(&self, upload: &Upload) -> Result<()> {
        let rejected = || ClientError::Http(HttpError::new(
            StatusCode::BAD_REQUEST,
            "Image not found in HTTP request",
        ));

        if upload.base64.is_empty() {
            return Err(rejected());
        }
        let bytes = BASE64.decode(&upload.base64).map_err(|_| rejected())?;
        if bytes.is_empty() {
            return Err(rejected());
        }

        let mut builder = http::Request::builder()
            .method(Method::PUT)
            .uri(self.url.as_str());
        for (name, value) in self.headers.iter() {
            builder = builder.header(name.clone(), value.clone());
        }

        let request = builder
            .body(FormPart {
                field: "file".to_owned(),
                bytes: Bytes::from(bytes),
                filename: upload.filename.clone(),
                content_type: upload.content_type.clone(),
            })
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

        let response = self
            .http
            .send_form(request)
            .await
            .map_err(|e| TransportError::Other(Box::new(e)))?;

        interpret(response).map(|_| ())
    }
}
