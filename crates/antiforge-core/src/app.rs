//! Application builder

use crate::middleware::{BoxedNext, LayerStack, MiddlewareLayer};
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;
use bytes::Bytes;
use http::{Extensions, Method};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Application: routes, middleware and shared state
///
/// # Example
///
/// ```rust,ignore
/// use antiforge_core::{App, SessionLayer, handler};
/// use http::Method;
///
/// let app = App::new()
///     .layer(SessionLayer::in_memory())
///     .route(Method::GET, "/", handler(index))
///     .route(Method::POST, "/", handler(submit));
///
/// let response = app.into_service().call(request).await;
/// ```
pub struct App {
    router: Router,
    layers: LayerStack,
    state: Extensions,
}

impl App {
    /// Create a new application
    pub fn new() -> Self {
        // Initialize tracing if not already done
        let _ = tracing_subscriber::registry()
            .with(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,antiforge_core=debug,antiforge_csrf=debug")),
            )
            .with(tracing_subscriber::fmt::layer())
            .try_init();

        Self {
            router: Router::new(),
            layers: LayerStack::new(),
            state: Extensions::new(),
        }
    }

    /// Add shared state, readable from every request through [`Request::state`]
    pub fn state<S>(mut self, state: S) -> Self
    where
        S: Clone + Send + Sync + 'static,
    {
        self.state.insert(state);
        self
    }

    /// Add a middleware layer
    ///
    /// Layers run in the order they are added, outermost first.
    pub fn layer<L: MiddlewareLayer>(mut self, layer: L) -> Self {
        self.layers.push(Box::new(layer));
        self
    }

    /// Register a handler for `method` on `path`
    pub fn route(mut self, method: Method, path: &str, handler: BoxedNext) -> Self {
        self.router = self.router.route(method, path, handler);
        self
    }

    /// Finish building and return the callable service
    pub fn into_service(self) -> Service {
        Service {
            next: self.layers.wrap(self.router.into_next()),
            state: Arc::new(self.state),
        }
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

/// A built application, callable with buffered HTTP requests
#[derive(Clone)]
pub struct Service {
    next: BoxedNext,
    state: Arc<Extensions>,
}

impl Service {
    /// Run a request through middleware and router
    pub async fn call(&self, req: http::Request<Bytes>) -> Response {
        let (parts, body) = req.into_parts();
        let request = Request::new(parts, body, self.state.clone());
        (self.next)(request).await
    }
}
