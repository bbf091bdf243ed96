//! # antiforge-core
//!
//! The host surface the antiforge protection layer runs on: request and
//! response types, the middleware chain, a method router, cookie helpers and
//! an in-memory session layer.
//!
//! This crate is not meant to be used directly. Use `antiforge` instead.

mod app;
pub mod cookies;
mod error;
mod handler;
pub mod middleware;
pub mod multipart;
mod request;
mod response;
mod router;
pub mod session;
#[cfg(any(test, feature = "test-utils"))]
mod test_client;

// Public API
pub use app::{App, Service};
pub use error::{ApiError, Result};
pub use handler::handler;
pub use middleware::{BoxedNext, LayerStack, MiddlewareLayer, ResponseFuture};
pub use multipart::MultipartField;
pub use request::Request;
pub use response::{IntoResponse, Response};
pub use router::Router;
pub use session::{MemorySessionStore, Session, SessionLayer};
#[cfg(any(test, feature = "test-utils"))]
pub use test_client::{TestClient, TestRequest, TestResponse};
