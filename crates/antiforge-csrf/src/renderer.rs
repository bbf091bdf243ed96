//! What the client sees when verification fails
//!
//! A denied request ends in a [`FailureAction`]: either a [`Rejection`],
//! rendered through the host's [`ApiError`] convention, or an
//! [`ErrorRenderer`] that builds the response itself.
//!
//! Renderers are always awaited. [`SyncRenderer`] adapts a plain closure,
//! [`AsyncRenderer`] one returning a future; the protection layer cannot tell
//! them apart.

use crate::error::{ConfigError, Denial};
use antiforge_core::{ApiError, IntoResponse, Request, Response};
use async_trait::async_trait;
use http::StatusCode;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

#[async_trait]
pub trait ErrorRenderer: Send + Sync + 'static {
    async fn render(&self, req: Request) -> Response;
}

/// Renderer backed by a synchronous closure
pub struct SyncRenderer<F> {
    f: F,
}

impl<F, R> SyncRenderer<F>
where
    F: Fn(Request) -> R + Send + Sync + 'static,
    R: IntoResponse,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, R> ErrorRenderer for SyncRenderer<F>
where
    F: Fn(Request) -> R + Send + Sync + 'static,
    R: IntoResponse,
{
    async fn render(&self, req: Request) -> Response {
        (self.f)(req).into_response()
    }
}

/// Renderer backed by a closure returning a future
pub struct AsyncRenderer<F> {
    f: F,
}

impl<F, Fut, R> AsyncRenderer<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut, R> ErrorRenderer for AsyncRenderer<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse,
{
    async fn render(&self, req: Request) -> Response {
        (self.f)(req).await.into_response()
    }
}

/// Error raised on a denied request when no renderer is configured
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rejection {
    status: StatusCode,
    error_type: &'static str,
}

impl Rejection {
    /// Any client or server error status
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            error_type: "csrf_rejected",
        }
    }

    /// 403, the default
    pub fn forbidden() -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            error_type: "csrf_forbidden",
        }
    }

    /// 400
    pub fn bad_request() -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error_type: "csrf_bad_request",
        }
    }

    pub fn from_u16(status: u16) -> Result<Self, ConfigError> {
        let code = StatusCode::from_u16(status).map_err(|_| ConfigError::InvalidStatus(status))?;
        match code {
            StatusCode::FORBIDDEN => Ok(Self::forbidden()),
            StatusCode::BAD_REQUEST => Ok(Self::bad_request()),
            code if code.is_client_error() || code.is_server_error() => Ok(Self::new(code)),
            _ => Err(ConfigError::InvalidStatus(status)),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn to_api_error(&self, denial: Denial) -> ApiError {
        ApiError::new(
            self.status,
            self.error_type,
            format!("CSRF token validation failed: {}", denial),
        )
    }
}

impl Default for Rejection {
    fn default() -> Self {
        Self::forbidden()
    }
}

/// Resolved failure behaviour of a protected endpoint
#[derive(Clone)]
pub enum FailureAction {
    Reject(Rejection),
    Render(Arc<dyn ErrorRenderer>),
}

impl FailureAction {
    pub fn render(renderer: impl ErrorRenderer) -> Self {
        FailureAction::Render(Arc::new(renderer))
    }

    pub async fn respond(&self, req: Request, denial: Denial) -> Response {
        match self {
            FailureAction::Reject(rejection) => rejection.to_api_error(denial).into_response(),
            FailureAction::Render(renderer) => renderer.render(req).await,
        }
    }
}

impl Default for FailureAction {
    fn default() -> Self {
        FailureAction::Reject(Rejection::default())
    }
}

impl fmt::Debug for FailureAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureAction::Reject(rejection) => f.debug_tuple("Reject").field(rejection).finish(),
            FailureAction::Render(_) => f.write_str("Render(..)"),
        }
    }
}

/// Renderers addressable by name from settings
#[derive(Clone, Default)]
pub struct RendererRegistry {
    renderers: HashMap<String, Arc<dyn ErrorRenderer>>,
}

impl RendererRegistry {
    pub fn register(&mut self, name: impl Into<String>, renderer: Arc<dyn ErrorRenderer>) {
        self.renderers.insert(name.into(), renderer);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ErrorRenderer>> {
        self.renderers.get(name).cloned()
    }

    /// Resolve `name` or report it as not invokable
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn ErrorRenderer>, ConfigError> {
        self.get(name)
            .ok_or_else(|| ConfigError::RendererNotInvokable(name.to_string()))
    }
}

impl fmt::Debug for RendererRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.renderers.keys().collect();
        names.sort();
        f.debug_struct("RendererRegistry").field("names", &names).finish()
    }
}
