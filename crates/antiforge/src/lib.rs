//! # antiforge
//!
//! Cross-Site Request Forgery protection for request handlers.
//!
//! A token is issued per client and kept in a storage (a signed cookie or
//! the server-side session). State-changing requests must echo it back
//! through a policy (a header or a form field). Requests that do not are
//! denied with a rejection or a custom error renderer of your choice.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use antiforge::prelude::*;
//!
//! async fn form(req: Request) -> antiforge::csrf::Result<String> {
//!     let token = generate_token(&req)?;
//!     Ok(format!("<input type=\"hidden\" name=\"csrf_token\" value=\"{}\">", token))
//! }
//!
//! async fn submit(_req: Request) -> &'static str {
//!     "OK"
//! }
//!
//! let csrf = Csrf::new(
//!     CookieStorage::new("csrf_token").secret_phrase("change me")?,
//!     FormPolicy::default(),
//! );
//!
//! let app = App::new()
//!     .route(Method::GET, "/", csrf.protect(handler(form)))
//!     .route(
//!         Method::POST,
//!         "/",
//!         csrf.protect_with(
//!             ProtectOptions::new().error_renderer(SyncRenderer::new(|_req| "CSRF error")),
//!             handler(submit),
//!         )?,
//!     );
//! ```
//!
//! ## Optional Features
//!
//! - `config` (default) - `CsrfSettings::from_env()` with `.env` support
//! - `test-utils` - `TestClient` for in-process integration tests

// Re-export core functionality
pub use antiforge_core::*;

// The protection layer
pub use antiforge_csrf as csrf;
pub use antiforge_csrf::{
    current_token, generate_token, AsyncRenderer, ConfigError, CookieOptions, CookieStorage, Csrf,
    CsrfError, CsrfLayer, CsrfSettings, Denial, ErrorRenderer, FailureAction, FormAndHeaderPolicy,
    FormPolicy, HeaderPolicy, ProtectOptions, ProtectSettings, Rejection, SessionStorage,
    SyncRenderer, Token, TokenPolicy, TokenSigner, TokenStorage, Verdict,
};

// Re-export for user convenience
pub use http;
pub use tokio;
pub use tracing;

/// Everything a typical application needs
pub mod prelude {
    pub use antiforge_core::{
        handler, ApiError, App, BoxedNext, IntoResponse, MiddlewareLayer, Request, Response,
        Result, Router, Session, SessionLayer,
    };

    pub use antiforge_csrf::{
        current_token, generate_token, AsyncRenderer, CookieOptions, CookieStorage, Csrf,
        CsrfLayer, CsrfSettings, FormAndHeaderPolicy, FormPolicy, HeaderPolicy, ProtectOptions,
        Rejection, SessionStorage, SyncRenderer,
    };

    pub use http::{Method, StatusCode};
    pub use serde::{Deserialize, Serialize};
    pub use tracing::{debug, error, info, trace, warn};
}
