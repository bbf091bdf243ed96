//! # antiforge-csrf
//!
//! CSRF protection for antiforge applications.
//!
//! The layer issues a token per client, keeps the authoritative copy in a
//! [`TokenStorage`] and expects the client to echo it through the channel a
//! [`TokenPolicy`] describes. Unsafe requests whose echoed token does not
//! match are denied and routed to a [`FailureAction`].
//!
//! ## Building blocks
//!
//! - [`token`] - generation, HMAC signing and constant-time comparison
//! - [`storage`] - [`CookieStorage`] (optionally signed) and [`SessionStorage`]
//! - [`policy`] - [`HeaderPolicy`], [`FormPolicy`], [`FormAndHeaderPolicy`]
//! - [`renderer`] - [`Rejection`] and sync/async [`ErrorRenderer`]s
//! - [`Csrf`] - the orchestrator, per handler or as an application layer
//!
//! ## Example
//!
//! ```rust,ignore
//! use antiforge_core::{handler, App, Request};
//! use antiforge_csrf::{generate_token, CookieStorage, Csrf, HeaderPolicy};
//! use http::Method;
//!
//! async fn form(req: Request) -> antiforge_csrf::Result<String> {
//!     let token = generate_token(&req)?;
//!     Ok(format!("<input name=\"csrf_token\" value=\"{}\">", token))
//! }
//!
//! async fn submit(_req: Request) -> &'static str {
//!     "OK"
//! }
//!
//! let csrf = Csrf::new(
//!     CookieStorage::new("csrf_token").secret_phrase("change me")?,
//!     HeaderPolicy::default(),
//! );
//!
//! let app = App::new()
//!     .route(Method::GET, "/", csrf.protect(handler(form)))
//!     .route(Method::POST, "/", csrf.protect(handler(submit)));
//! ```

pub mod error;
pub mod policy;
pub mod protect;
pub mod renderer;
pub mod settings;
pub mod storage;
pub mod token;

pub use error::{ConfigError, CsrfError, Denial, Result, StorageError};
pub use policy::{FormAndHeaderPolicy, FormPolicy, HeaderPolicy, TokenPolicy};
pub use protect::{current_token, generate_token, Csrf, CsrfLayer, ProtectOptions, Verdict};
pub use renderer::{
    AsyncRenderer, ErrorRenderer, FailureAction, Rejection, RendererRegistry, SyncRenderer,
};
pub use settings::{CsrfSettings, PolicyKind, ProtectSettings, StorageKind};
pub use storage::{CookieOptions, CookieStorage, PendingToken, SessionStorage, TokenStorage};
pub use token::{
    tokens_match, HashedTokenGenerator, RandomTokenGenerator, Token, TokenGenerator, TokenSigner,
};
