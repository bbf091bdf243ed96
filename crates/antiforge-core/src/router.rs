//! Method router
//!
//! Routes are matched on the exact request path. Path parameters are out of
//! scope here; the protection layer only needs to dispatch by method.

use crate::error::ApiError;
use crate::middleware::{BoxedNext, ResponseFuture};
use crate::request::Request;
use crate::response::IntoResponse;
use http::{header, HeaderValue, Method};
use std::collections::HashMap;
use std::sync::Arc;

/// Outcome of matching a request against the router
pub(crate) enum RouteMatch<'a> {
    Found(&'a BoxedNext),
    NotFound,
    MethodNotAllowed(Vec<Method>),
}

/// Maps `(path, method)` to a handler
#[derive(Clone, Default)]
pub struct Router {
    routes: HashMap<String, HashMap<Method, BoxedNext>>,
}

impl Router {
    /// Create an empty router
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `method` on `path`, replacing any previous one
    pub fn route(mut self, method: Method, path: impl Into<String>, handler: BoxedNext) -> Self {
        self.routes
            .entry(path.into())
            .or_default()
            .insert(method, handler);
        self
    }

    pub(crate) fn match_route(&self, path: &str, method: &Method) -> RouteMatch<'_> {
        let Some(methods) = self.routes.get(path) else {
            return RouteMatch::NotFound;
        };

        match methods.get(method) {
            Some(handler) => RouteMatch::Found(handler),
            None => {
                let mut allowed: Vec<Method> = methods.keys().cloned().collect();
                allowed.sort_by(|a, b| a.as_str().cmp(b.as_str()));
                RouteMatch::MethodNotAllowed(allowed)
            }
        }
    }

    /// The router as a single handler, answering 404/405 for unknown routes
    pub fn into_next(self) -> BoxedNext {
        let router = Arc::new(self);
        Arc::new(move |req: Request| {
            let found = match router.match_route(req.path(), req.method()) {
                RouteMatch::Found(handler) => Ok(handler.clone()),
                RouteMatch::NotFound => Err(ApiError::not_found(format!(
                    "No route found for {} {}",
                    req.method(),
                    req.path()
                ))
                .into_response()),
                RouteMatch::MethodNotAllowed(allowed) => {
                    let mut response = ApiError::method_not_allowed(format!(
                        "Method {} not allowed for {}",
                        req.method(),
                        req.path()
                    ))
                    .into_response();
                    let allow = allowed
                        .iter()
                        .map(Method::as_str)
                        .collect::<Vec<_>>()
                        .join(", ");
                    if let Ok(value) = HeaderValue::from_str(&allow) {
                        response.headers_mut().insert(header::ALLOW, value);
                    }
                    Err(response)
                }
            };

            match found {
                Ok(handler) => handler(req),
                Err(response) => Box::pin(async move { response }) as ResponseFuture,
            }
        })
    }
}
