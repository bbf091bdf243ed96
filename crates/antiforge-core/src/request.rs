//! Request types for antiforge

use crate::cookies;
use crate::error::ApiError;
use crate::multipart::{self, MultipartField};
use crate::session::Session;
use bytes::Bytes;
use http::{header, request::Parts, Extensions, HeaderMap, Method, Uri};
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// HTTP Request wrapper
///
/// The body is buffered before the request reaches middleware, so the
/// protection layer can read form fields without consuming it for the
/// handler.
pub struct Request {
    pub(crate) parts: Parts,
    pub(crate) body: Bytes,
    pub(crate) state: Arc<Extensions>,
}

impl Request {
    /// Create a new request from parts
    pub fn new(parts: Parts, body: Bytes, state: Arc<Extensions>) -> Self {
        Self { parts, body, state }
    }

    /// Build a request from a plain `http::Request` with no application state
    pub fn from_http(req: http::Request<Bytes>) -> Self {
        let (parts, body) = req.into_parts();
        Self::new(parts, body, Arc::new(Extensions::new()))
    }

    /// Get the HTTP method
    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    /// Get the URI
    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    /// Get the headers
    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// Get request extensions
    pub fn extensions(&self) -> &Extensions {
        &self.parts.extensions
    }

    /// Get mutable extensions
    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.parts.extensions
    }

    /// Get the request path
    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    /// Get the buffered body
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Get shared application state
    pub fn state(&self) -> &Arc<Extensions> {
        &self.state
    }

    /// Value of the named request cookie, if present and well formed
    pub fn cookie(&self, name: &str) -> Option<String> {
        cookies::find(self.headers(), name)
    }

    /// Decode the body as `application/x-www-form-urlencoded`
    pub fn form<T: DeserializeOwned>(&self) -> Result<T, serde_urlencoded::de::Error> {
        serde_urlencoded::from_bytes(&self.body)
    }

    /// `Content-Type` header value, if present and visible ASCII
    pub fn content_type(&self) -> Option<&str> {
        self.headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    /// Decode the body as `multipart/form-data`
    pub fn multipart(&self) -> Result<Vec<MultipartField>, ApiError> {
        let content_type = self
            .content_type()
            .ok_or_else(|| ApiError::bad_request("Missing Content-Type header"))?;
        multipart::parse(content_type, &self.body)
    }

    /// The session attached by [`SessionLayer`](crate::SessionLayer), if any
    pub fn session(&self) -> Option<&Session> {
        self.extensions().get::<Session>()
    }
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.parts.method)
            .field("uri", &self.parts.uri)
            .field("version", &self.parts.version)
            .finish()
    }
}
