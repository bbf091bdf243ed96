//! In-process test client
//!
//! Sends simulated requests through the full middleware and router pipeline
//! without binding a socket. Cookies set by responses are kept in a jar and
//! sent back on later requests, the way a browser would.
//!
//! # Example
//!
//! ```rust,ignore
//! let client = TestClient::new(app);
//!
//! client.get("/").await.assert_status(StatusCode::OK);
//! let response = client.request(TestRequest::post("/").header("X-CSRF-TOKEN", &token)).await;
//! ```

use crate::app::{App, Service};
use crate::cookies;
use crate::response::Response;
use bytes::Bytes;
use http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use http_body_util::BodyExt;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Test client for integration testing without network binding
pub struct TestClient {
    service: Service,
    jar: Mutex<BTreeMap<String, String>>,
}

impl TestClient {
    /// Create a new test client from an application
    pub fn new(app: App) -> Self {
        Self {
            service: app.into_service(),
            jar: Mutex::new(BTreeMap::new()),
        }
    }

    /// Send a GET request
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request(TestRequest::get(path)).await
    }

    /// Send a POST request without body
    pub async fn post(&self, path: &str) -> TestResponse {
        self.request(TestRequest::post(path)).await
    }

    /// Current value of a cookie in the jar
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.jar.lock().unwrap().get(name).cloned()
    }

    /// Put a cookie into the jar, replacing any previous value
    pub fn set_cookie(&self, name: &str, value: &str) {
        self.jar
            .lock()
            .unwrap()
            .insert(name.to_string(), value.to_string());
    }

    /// Drop every cookie in the jar
    pub fn clear_cookies(&self) {
        self.jar.lock().unwrap().clear();
    }

    /// Send a request with full control
    ///
    /// Jar cookies are attached unless the request carries its own `Cookie`
    /// header.
    pub async fn request(&self, req: TestRequest) -> TestResponse {
        let mut builder = http::Request::builder().method(req.method).uri(req.path);

        let mut headers = req.headers;
        if !headers.contains_key(header::COOKIE) {
            let cookie_line = self
                .jar
                .lock()
                .unwrap()
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("; ");
            if !cookie_line.is_empty() {
                headers.insert(header::COOKIE, HeaderValue::from_str(&cookie_line).unwrap());
            }
        }
        if let Some(h) = builder.headers_mut() {
            h.extend(headers);
        }

        let request = builder.body(req.body.unwrap_or_default()).unwrap();
        let response = TestResponse::from_response(self.service.call(request).await).await;

        let mut jar = self.jar.lock().unwrap();
        for (name, value) in cookies::set_cookies(response.headers()) {
            jar.insert(name, value);
        }

        response
    }
}

/// Test request builder
#[derive(Debug, Clone)]
pub struct TestRequest {
    method: Method,
    path: String,
    headers: HeaderMap,
    body: Option<Bytes>,
}

impl TestRequest {
    /// Create a new request with the given method and path
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Create a GET request
    pub fn get(path: &str) -> Self {
        Self::new(Method::GET, path)
    }

    /// Create a POST request
    pub fn post(path: &str) -> Self {
        Self::new(Method::POST, path)
    }

    /// Create a PUT request
    pub fn put(path: &str) -> Self {
        Self::new(Method::PUT, path)
    }

    /// Create a DELETE request
    pub fn delete(path: &str) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Add a header to the request
    pub fn header(mut self, key: &str, value: &str) -> Self {
        if let (Ok(name), Ok(val)) = (key.parse::<HeaderName>(), HeaderValue::from_str(value)) {
            self.headers.insert(name, val);
        }
        self
    }

    /// Set the body as `application/x-www-form-urlencoded`
    pub fn form<T: Serialize>(mut self, body: &T) -> Self {
        if let Ok(encoded) = serde_urlencoded::to_string(body) {
            self.body = Some(Bytes::from(encoded));
            self.headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/x-www-form-urlencoded"),
            );
        }
        self
    }

    /// Set the request body as raw bytes
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// Test response with assertion helpers
#[derive(Debug)]
pub struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl TestResponse {
    async fn from_response(response: Response) -> Self {
        let (parts, body) = response.into_parts();
        let body = body
            .collect()
            .await
            .map(|b| b.to_bytes())
            .unwrap_or_default();

        Self {
            status: parts.status,
            headers: parts.headers,
            body,
        }
    }

    /// Get the response status code
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Get the response headers
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get the response body as bytes
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Get the response body as a string
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    /// Parse the response body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Value of a cookie set by this response
    pub fn cookie(&self, name: &str) -> Option<String> {
        cookies::set_cookies(&self.headers)
            .into_iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Assert that the response has the expected status code
    ///
    /// # Panics
    ///
    /// Panics if the status code doesn't match.
    pub fn assert_status<S: Into<StatusCode>>(&self, expected: S) -> &Self {
        let expected = expected.into();
        assert_eq!(
            self.status,
            expected,
            "Expected status {}, got {}. Body: {}",
            expected,
            self.status,
            self.text()
        );
        self
    }
}
