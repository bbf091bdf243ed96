//! Response types for antiforge
//!
//! | Type | Status | Content-Type |
//! |------|--------|--------------|
//! | `&'static str` / `String` | 200 | text/plain |
//! | `Bytes` / `Vec<u8>` | 200 | - |
//! | `()` | 200 | - |
//! | `StatusCode` | given | - |
//! | `(StatusCode, R)` | given | from `R` |
//! | [`ApiError`] | from error | application/json |

use crate::error::{ApiError, ErrorResponse};
use bytes::Bytes;
use http::{header, HeaderValue, StatusCode};
use http_body_util::Full;

/// HTTP Response type
pub type Response = http::Response<Full<Bytes>>;

/// Trait for types that can be converted into an HTTP response
pub trait IntoResponse {
    /// Convert self into a Response
    fn into_response(self) -> Response;
}

fn with_body(body: impl Into<Bytes>, content_type: Option<&'static str>) -> Response {
    let mut response = http::Response::new(Full::new(body.into()));
    if let Some(content_type) = content_type {
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    }
    response
}

impl IntoResponse for Response {
    fn into_response(self) -> Response {
        self
    }
}

impl IntoResponse for () {
    fn into_response(self) -> Response {
        with_body(Bytes::new(), None)
    }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response {
        with_body(self, Some("text/plain; charset=utf-8"))
    }
}

impl IntoResponse for String {
    fn into_response(self) -> Response {
        with_body(self, Some("text/plain; charset=utf-8"))
    }
}

impl IntoResponse for Bytes {
    fn into_response(self) -> Response {
        with_body(self, None)
    }
}

impl IntoResponse for Vec<u8> {
    fn into_response(self) -> Response {
        with_body(self, None)
    }
}

impl IntoResponse for &'static [u8] {
    fn into_response(self) -> Response {
        with_body(self, None)
    }
}

impl IntoResponse for StatusCode {
    fn into_response(self) -> Response {
        let mut response = with_body(Bytes::new(), None);
        *response.status_mut() = self;
        response
    }
}

impl<R: IntoResponse> IntoResponse for (StatusCode, R) {
    fn into_response(self) -> Response {
        let mut response = self.1.into_response();
        *response.status_mut() = self.0;
        response
    }
}

impl<T: IntoResponse, E: IntoResponse> IntoResponse for Result<T, E> {
    fn into_response(self) -> Response {
        match self {
            Ok(v) => v.into_response(),
            Err(e) => e.into_response(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status;
        let body = serde_json::to_vec(&ErrorResponse::from(self)).unwrap_or_else(|_| {
            br#"{"error":{"type":"internal_error","message":"Failed to serialize error"}}"#.to_vec()
        });

        let mut response = with_body(body, Some("application/json"));
        *response.status_mut() = status;
        response
    }
}
