//! Middleware infrastructure for antiforge
//!
//! Middleware is added with [`App::layer`](crate::App::layer) or applied to
//! a single handler by wrapping its [`BoxedNext`].
//!
//! # Example
//!
//! ```rust,ignore
//! use antiforge_core::{App, SessionLayer, handler};
//! use http::Method;
//!
//! let app = App::new()
//!     .layer(SessionLayer::in_memory())
//!     .route(Method::GET, "/", handler(index));
//! ```

mod layer;

pub use layer::{BoxedNext, LayerStack, MiddlewareLayer, ResponseFuture};
