//! Minimal HTTP client abstraction shared across crates.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;

/// HTTP client trait for sending raw HTTP requests.
#[cfg_attr(not(target_arch = "wasm32"), trait_variant::make(Send))]
pub trait HttpClient {
    /// Error type returned by the HTTP client
    type Error: std::error::Error + Display + Send + Sync + 'static;

    /// Send an HTTP request and return the response.
    fn send_http(
        &self,
        request: http::Request<Vec<u8>>,
    ) -> impl Future<Output = core::result::Result<http::Response<Vec<u8>>, Self::Error>>;
}

/// A named binary field for a multipart/form-data request.
#[derive(Debug, Clone)]
pub struct FormPart {
    /// Form field name
    pub field: String,
    /// Raw file bytes
    pub bytes: Bytes,
    /// Filename metadata, if any
    pub filename: Option<String>,
    /// Content-type metadata, if any
    pub content_type: Option<String>,
}

/// Extension trait for HTTP clients that can submit multipart form data.
#[cfg_attr(not(target_arch = "wasm32"), trait_variant::make(Send))]
pub trait MultipartClient: HttpClient {
    /// Send a request whose body is a single binary form field.
    fn send_form(
        &self,
        request: http::Request<FormPart>,
    ) -> impl Future<Output = core::result::Result<http::Response<Vec<u8>>, Self::Error>>;
}

#[cfg(feature = "reqwest-client")]
async fn convert_response(
    resp: reqwest::Response,
) -> core::result::Result<http::Response<Vec<u8>>, reqwest::Error> {
    let mut builder = http::Response::builder().status(resp.status());

    for (name, value) in resp.headers().iter() {
        builder = builder.header(name.as_str(), value.as_bytes());
    }

    let body = resp.bytes().await?.to_vec();

    Ok(builder.body(body).expect("Failed to build response"))
}

#[cfg(feature = "reqwest-client")]
impl HttpClient for reqwest::Client {
    type Error = reqwest::Error;

    async fn send_http(
        &self,
        request: http::Request<Vec<u8>>,
    ) -> core::result::Result<http::Response<Vec<u8>>, Self::Error> {
        let (parts, body) = request.into_parts();

        let mut req = self.request(parts.method, parts.uri.to_string()).body(body);

        for (name, value) in parts.headers.iter() {
            req = req.header(name.as_str(), value.as_bytes());
        }

        let resp = req.send().await?;

        convert_response(resp).await
    }
}

#[cfg(feature = "reqwest-client")]
impl MultipartClient for reqwest::Client {
    async fn send_form(
        &self,
        request: http::Request<FormPart>,
    ) -> core::result::Result<http::Response<Vec<u8>>, Self::Error> {
        let (parts, form) = request.into_parts();

        let mut part = reqwest::multipart::Part::bytes(form.bytes.to_vec());
        if let Some(filename) = form.filename {
            part = part.file_name(filename);
        }
        if let Some(content_type) = form.content_type {
            part = part.mime_str(&content_type)?;
        }

        let mut req = self
            .request(parts.method, parts.uri.to_string())
            .multipart(reqwest::multipart::Form::new().part(form.field, part));

        for (name, value) in parts.headers.iter() {
            req = req.header(name.as_str(), value.as_bytes());
        }

        let resp = req.send().await?;

        convert_response(resp).await
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl<T: HttpClient + Sync> HttpClient for Arc<T> {
    type Error = T::Error;

    fn send_http(
        &self,
        request: http::Request<Vec<u8>>,
    ) -> impl Future<Output = core::result::Result<http::Response<Vec<u8>>, Self::Error>> + Send
    {
        self.as_ref().send_http(request)
    }
}

#[cfg(target_arch = "wasm32")]
impl<T: HttpClient> HttpClient for Arc<T> {
    type Error = T::Error;

    fn send_http(
        &self,
        request: http::Request<Vec<u8>>,
    ) -> impl Future<Output = core::result::Result<http::Response<Vec<u8>>, Self::Error>> {
        self.as_ref().send_http(request)
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl<T: MultipartClient + Sync> MultipartClient for Arc<T> {
    fn send_form(
        &self,
        request: http::Request<FormPart>,
    ) -> impl Future<Output = core::result::Result<http::Response<Vec<u8>>, Self::Error>> + Send
    {
        self.as_ref().send_form(request)
    }
}

#[cfg(target_arch = "wasm32")]
impl<T: MultipartClient> MultipartClient for Arc<T> {
    fn send_form(
        &self,
        request: http::Request<FormPart>,
    ) -> impl Future<Output = core::result::Result<http::Response<Vec<u8>>, Self::Error>> {
        self.as_ref().send_form(request)
    }
}
