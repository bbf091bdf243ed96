//! The protection orchestrator
//!
//! [`Csrf`] binds one storage and one policy. It wraps handlers
//! ([`Csrf::protect`], [`Csrf::protect_with`]) or the whole application
//! ([`Csrf::layer`]). For every request it either passes a safe method
//! straight through or verifies the submitted token against the stored one
//! and runs the endpoint's [`FailureAction`] on denial.
//!
//! Tokens minted by the handler through [`generate_token`] are saved into the
//! response once the handler returns.

use crate::error::{ConfigError, CsrfError, Denial};
use crate::policy::TokenPolicy;
use crate::renderer::{ErrorRenderer, FailureAction, Rejection, RendererRegistry};
use crate::storage::{PendingToken, TokenStorage};
use crate::token::{tokens_match, Token};
use antiforge_core::{BoxedNext, MiddlewareLayer, Request, Response, ResponseFuture};
use http::Method;
use std::fmt;
use std::sync::Arc;

/// Outcome of verifying one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allowed,
    Denied(Denial),
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allowed)
    }
}

#[derive(Clone)]
enum RendererRef {
    Direct(Arc<dyn ErrorRenderer>),
    Named(String),
}

/// Per-endpoint override of the failure behaviour
///
/// At most one of `exception` and `error_renderer` may be set; both is
/// rejected with [`ConfigError::ConflictingFailure`] when the endpoint is
/// wrapped.
#[derive(Clone, Default)]
pub struct ProtectOptions {
    exception: Option<Rejection>,
    renderer: Option<RendererRef>,
}

impl ProtectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail with `rejection` instead of the default one
    pub fn exception(mut self, rejection: Rejection) -> Self {
        self.exception = Some(rejection);
        self
    }

    /// Build the failure response with `renderer`
    pub fn error_renderer(mut self, renderer: impl ErrorRenderer) -> Self {
        self.renderer = Some(RendererRef::Direct(Arc::new(renderer)));
        self
    }

    /// Build the failure response with a renderer registered on [`Csrf`]
    pub fn error_renderer_named(mut self, name: impl Into<String>) -> Self {
        self.renderer = Some(RendererRef::Named(name.into()));
        self
    }

    /// The failure action these options select, `None` for the default
    pub fn resolve(&self, registry: &RendererRegistry) -> Result<Option<FailureAction>, ConfigError> {
        match (&self.exception, &self.renderer) {
            (Some(_), Some(_)) => Err(ConfigError::ConflictingFailure),
            (Some(rejection), None) => Ok(Some(FailureAction::Reject(rejection.clone()))),
            (None, Some(RendererRef::Direct(renderer))) => {
                Ok(Some(FailureAction::Render(renderer.clone())))
            }
            (None, Some(RendererRef::Named(name))) => {
                Ok(Some(FailureAction::Render(registry.resolve(name)?)))
            }
            (None, None) => Ok(None),
        }
    }
}

impl fmt::Debug for ProtectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let renderer = match &self.renderer {
            Some(RendererRef::Direct(_)) => Some("<renderer>".to_string()),
            Some(RendererRef::Named(name)) => Some(name.clone()),
            None => None,
        };
        f.debug_struct("ProtectOptions")
            .field("exception", &self.exception)
            .field("error_renderer", &renderer)
            .finish()
    }
}

/// CSRF protection configuration
///
/// Built once at wiring time and shared read-only by every request.
///
/// ```rust,ignore
/// let csrf = Csrf::new(
///     CookieStorage::new("csrf_token").secret_phrase("change me")?,
///     HeaderPolicy::default(),
/// );
///
/// let app = App::new()
///     .route(Method::GET, "/", handler(form))
///     .route(Method::POST, "/", csrf.protect(handler(submit)));
/// ```
#[derive(Clone)]
pub struct Csrf {
    storage: Arc<dyn TokenStorage>,
    policy: Arc<dyn TokenPolicy>,
    safe_methods: Arc<[Method]>,
    renderers: RendererRegistry,
    failure: FailureAction,
}

impl Csrf {
    pub fn new(storage: impl TokenStorage, policy: impl TokenPolicy) -> Self {
        Self {
            storage: Arc::new(storage),
            policy: Arc::new(policy),
            safe_methods: Arc::from(vec![Method::GET, Method::HEAD, Method::OPTIONS, Method::TRACE]),
            renderers: RendererRegistry::default(),
            failure: FailureAction::default(),
        }
    }

    /// Methods that skip verification
    ///
    /// Default: GET, HEAD, OPTIONS, TRACE
    pub fn safe_methods(mut self, methods: impl IntoIterator<Item = Method>) -> Self {
        self.safe_methods = methods.into_iter().collect();
        self
    }

    /// Make `renderer` available to [`ProtectOptions::error_renderer_named`]
    pub fn renderer(mut self, name: impl Into<String>, renderer: impl ErrorRenderer) -> Self {
        self.renderers.register(name, Arc::new(renderer));
        self
    }

    /// Failure behaviour of endpoints without overrides
    pub fn default_rejection(mut self, rejection: Rejection) -> Self {
        self.failure = FailureAction::Reject(rejection);
        self
    }

    pub fn storage(&self) -> &dyn TokenStorage {
        self.storage.as_ref()
    }

    pub fn policy(&self) -> &dyn TokenPolicy {
        self.policy.as_ref()
    }

    pub fn is_safe(&self, method: &Method) -> bool {
        self.safe_methods.contains(method)
    }

    /// Compare the stored token with the submitted one
    ///
    /// Does not look at the request method.
    pub async fn verify(&self, req: &Request) -> Verdict {
        let Some(stored) = self.storage.load(req).await else {
            return Verdict::Denied(Denial::NoStoredToken);
        };
        let Some(submitted) = self.policy.get_token(req).await else {
            return Verdict::Denied(Denial::MissingSubmitted);
        };
        if submitted.is_empty() {
            return Verdict::Denied(Denial::EmptySubmitted);
        }

        if tokens_match(stored.as_str(), submitted.as_str()) {
            Verdict::Allowed
        } else {
            Verdict::Denied(Denial::Mismatch)
        }
    }

    /// Wrap `next` with the default failure behaviour
    pub fn protect(&self, next: BoxedNext) -> BoxedNext {
        self.wrap(self.failure.clone(), next)
    }

    /// Wrap `next` with per-endpoint overrides
    pub fn protect_with(&self, options: ProtectOptions, next: BoxedNext) -> Result<BoxedNext, ConfigError> {
        let failure = options
            .resolve(&self.renderers)?
            .unwrap_or_else(|| self.failure.clone());
        Ok(self.wrap(failure, next))
    }

    /// Application-wide protection as a middleware layer
    pub fn layer(&self) -> CsrfLayer {
        CsrfLayer {
            csrf: self.clone(),
            failure: self.failure.clone(),
            exempt: Vec::new(),
        }
    }

    fn wrap(&self, failure: FailureAction, next: BoxedNext) -> BoxedNext {
        let csrf = self.clone();
        Arc::new(move |req: Request| {
            Box::pin(run(csrf.clone(), failure.clone(), true, req, next.clone())) as ResponseFuture
        })
    }
}

impl fmt::Debug for Csrf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Csrf")
            .field("safe_methods", &self.safe_methods)
            .field("renderers", &self.renderers)
            .field("failure", &self.failure)
            .finish_non_exhaustive()
    }
}

async fn run(csrf: Csrf, failure: FailureAction, check: bool, mut req: Request, next: BoxedNext) -> Response {
    let pending = PendingToken::default();
    req.extensions_mut().insert(pending.clone());
    req.extensions_mut().insert(csrf.clone());

    if !check {
        tracing::debug!(path = %req.path(), "CSRF check skipped for exempt path");
    } else if csrf.is_safe(req.method()) {
        tracing::debug!(method = %req.method(), "Safe method, CSRF check skipped");
    } else {
        match csrf.verify(&req).await {
            Verdict::Allowed => {
                tracing::debug!(method = %req.method(), path = %req.path(), "CSRF token verified");
            }
            Verdict::Denied(denial) => {
                tracing::warn!(
                    method = %req.method(),
                    path = %req.path(),
                    reason = denial.as_str(),
                    "CSRF verification failed"
                );
                return failure.respond(req, denial).await;
            }
        }
    }

    let scope = req.extensions().clone();
    let mut response = next(req).await;

    if let Some(token) = pending.take() {
        if let Err(e) = csrf.storage.save(&scope, &mut response, &token).await {
            tracing::error!(error = %e, "Failed to save CSRF token");
        }
    }

    response
}

/// [`Csrf`] applied to every route
///
/// Requests under an exempt path prefix skip verification but can still
/// mint tokens.
#[derive(Clone, Debug)]
pub struct CsrfLayer {
    csrf: Csrf,
    failure: FailureAction,
    exempt: Vec<String>,
}

impl CsrfLayer {
    /// Skip verification under `path_prefix`
    ///
    /// A blank prefix is ignored.
    pub fn exempt(mut self, path_prefix: impl Into<String>) -> Self {
        let path_prefix = path_prefix.into();
        if path_prefix.trim().is_empty() {
            tracing::warn!("Ignoring empty CSRF exempt path");
            return self;
        }
        self.exempt.push(path_prefix);
        self
    }

    pub fn with_options(mut self, options: ProtectOptions) -> Result<Self, ConfigError> {
        if let Some(failure) = options.resolve(&self.csrf.renderers)? {
            self.failure = failure;
        }
        Ok(self)
    }

    fn is_exempt(&self, path: &str) -> bool {
        self.exempt.iter().any(|prefix| {
            path == prefix
                || (path.starts_with(prefix.as_str())
                    && (prefix.ends_with('/') || path[prefix.len()..].starts_with('/')))
        })
    }
}

impl MiddlewareLayer for CsrfLayer {
    fn call(&self, req: Request, next: BoxedNext) -> ResponseFuture {
        let check = !self.is_exempt(req.path());
        Box::pin(run(self.csrf.clone(), self.failure.clone(), check, req, next))
    }

    fn clone_box(&self) -> Box<dyn MiddlewareLayer> {
        Box::new(self.clone())
    }
}

/// Mint a token for this request and save it into the response
///
/// Calling it again within the same request replaces the token.
pub fn generate_token(req: &Request) -> Result<Token, CsrfError> {
    let csrf = req.extensions().get::<Csrf>().ok_or(CsrfError::NotInstalled)?;
    csrf.storage.generate_new_token(req)
}

/// The token minted during this request, else the one stored for the client
pub async fn current_token(req: &Request) -> Option<Token> {
    if let Some(token) = PendingToken::from_request(req).and_then(PendingToken::peek) {
        return Some(token);
    }
    let csrf = req.extensions().get::<Csrf>()?;
    csrf.storage.load(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::HeaderPolicy;
    use crate::renderer::SyncRenderer;
    use crate::storage::CookieStorage;
    use antiforge_core::{cookies, handler};
    use bytes::Bytes;
    use http::{header, StatusCode};
    use proptest::prelude::*;

    fn csrf() -> Csrf {
        Csrf::new(CookieStorage::new("csrf_token"), HeaderPolicy::default())
    }

    fn request(method: Method, cookie: Option<&str>, submitted: Option<&str>) -> Request {
        let mut builder = http::Request::builder().method(method).uri("/");
        if let Some(value) = cookie {
            builder = builder.header(header::COOKIE, format!("csrf_token={}", value));
        }
        if let Some(value) = submitted {
            builder = builder.header("X-CSRF-TOKEN", value);
        }
        Request::from_http(builder.body(Bytes::new()).unwrap())
    }

    fn ok() -> BoxedNext {
        handler(|_req: Request| async { "OK" })
    }

    #[tokio::test]
    async fn test_verify_denials() {
        let csrf = csrf();
        let cases = [
            (None, Some("abc"), Verdict::Denied(Denial::NoStoredToken)),
            (Some("abc"), None, Verdict::Denied(Denial::MissingSubmitted)),
            (Some("abc"), Some(""), Verdict::Denied(Denial::EmptySubmitted)),
            (Some("abc"), Some("abd"), Verdict::Denied(Denial::Mismatch)),
            (Some("abc"), Some("abc"), Verdict::Allowed),
        ];

        for (cookie, submitted, expected) in cases {
            let req = request(Method::POST, cookie, submitted);
            assert_eq!(csrf.verify(&req).await, expected);
        }
    }

    #[tokio::test]
    async fn test_protect_default_is_forbidden() {
        let next = csrf().protect(ok());
        let response = next(request(Method::POST, None, None)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_custom_default_rejection() {
        let next = csrf().default_rejection(Rejection::bad_request()).protect(ok());
        let response = next(request(Method::DELETE, Some("a"), Some("b"))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_configurable_safe_methods() {
        let next = csrf().safe_methods([Method::GET]).protect(ok());
        let response = next(request(Method::HEAD, None, None)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = next(request(Method::GET, None, None)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_conflicting_overrides_rejected() {
        let options = ProtectOptions::new()
            .exception(Rejection::bad_request())
            .error_renderer(SyncRenderer::new(|_req: Request| "CSRF error"));
        assert!(matches!(
            csrf().protect_with(options, ok()),
            Err(ConfigError::ConflictingFailure)
        ));
    }

    #[test]
    fn test_unknown_named_renderer_rejected() {
        let options = ProtectOptions::new().error_renderer_named("trololo");
        assert!(matches!(
            csrf().protect_with(options, ok()),
            Err(ConfigError::RendererNotInvokable(name)) if name == "trololo"
        ));
    }

    #[tokio::test]
    async fn test_named_renderer() {
        let csrf = csrf().renderer("plain", SyncRenderer::new(|_req: Request| "CSRF error"));
        let next = csrf
            .protect_with(ProtectOptions::new().error_renderer_named("plain"), ok())
            .unwrap();
        let response = next(request(Method::POST, None, None)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_generated_token_saved_after_handler() {
        let next = csrf().protect(handler(|req: Request| async move {
            let token = generate_token(&req)?;
            let current = current_token(&req).await;
            assert_eq!(current.as_ref(), Some(&token));
            Ok::<_, CsrfError>(token.into_inner())
        }));

        let response = next(request(Method::GET, None, None)).await;
        let set = cookies::set_cookies(response.headers());
        assert_eq!(set.len(), 1);
        assert_eq!(set[0].0, "csrf_token");
    }

    #[tokio::test]
    async fn test_denied_request_does_not_run_handler() {
        let next = csrf().protect(handler(|req: Request| async move {
            generate_token(&req).map(Token::into_inner)
        }));
        let response = next(request(Method::POST, Some("a"), Some("b"))).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(cookies::set_cookies(response.headers()).is_empty());
    }

    #[test]
    fn test_generate_outside_protection() {
        let req = request(Method::GET, None, None);
        assert!(matches!(generate_token(&req), Err(CsrfError::NotInstalled)));
    }

    #[test]
    fn test_exempt_prefix_matching() {
        let layer = csrf().layer().exempt("/webhooks").exempt("/public/");
        assert!(layer.is_exempt("/webhooks"));
        assert!(layer.is_exempt("/webhooks/github"));
        assert!(!layer.is_exempt("/webhooksx"));
        assert!(layer.is_exempt("/public/form"));
        assert!(!layer.is_exempt("/"));
    }

    #[test]
    fn test_blank_exempt_prefix_is_ignored() {
        let layer = csrf().layer().exempt("").exempt("  ");
        assert!(layer.exempt.is_empty());
        assert!(!layer.is_exempt("/"));
        assert!(!layer.is_exempt("/transfer"));
    }

    proptest! {
        #[test]
        fn prop_unsafe_mismatch_never_allowed(stored in "[A-Za-z0-9_-]{1,43}", submitted in "[A-Za-z0-9_-]{0,43}") {
            prop_assume!(stored != submitted);
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let verdict = rt.block_on(csrf().verify(&request(Method::POST, Some(&stored), Some(&submitted))));
            prop_assert!(!verdict.is_allowed());
        }
    }
}
