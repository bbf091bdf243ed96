//! Middleware chain
//!
//! A middleware receives the request and the rest of the chain as an
//! explicit `next` handler, and decides whether to call it.

use crate::request::Request;
use crate::response::Response;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// The future every handler and middleware resolves to
pub type ResponseFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// A boxed next function for middleware chains
///
/// Handlers are stored in this form as well, so a wrapped handler is
/// indistinguishable from a plain one.
pub type BoxedNext = Arc<dyn Fn(Request) -> ResponseFuture + Send + Sync>;

/// Trait for middleware applied through [`App::layer`](crate::App::layer)
pub trait MiddlewareLayer: Send + Sync + 'static {
    /// Apply this middleware to a request, calling `next` to continue the chain
    fn call(&self, req: Request, next: BoxedNext) -> ResponseFuture;

    /// Clone this middleware into a boxed trait object
    fn clone_box(&self) -> Box<dyn MiddlewareLayer>;
}

impl Clone for Box<dyn MiddlewareLayer> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// A stack of middleware layers
#[derive(Clone, Default)]
pub struct LayerStack {
    layers: Vec<Box<dyn MiddlewareLayer>>,
}

impl LayerStack {
    /// Create a new empty layer stack
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// Add a middleware layer to the stack
    ///
    /// Layers are executed in the order they are added (outermost first).
    pub fn push(&mut self, layer: Box<dyn MiddlewareLayer>) {
        self.layers.push(layer);
    }

    /// Check if the stack is empty
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Get the number of layers
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Execute the middleware stack with a final handler
    pub fn execute(&self, req: Request, handler: BoxedNext) -> ResponseFuture {
        self.wrap(handler)(req)
    }

    /// Fold the stack around `handler`, innermost layer last
    pub fn wrap(&self, handler: BoxedNext) -> BoxedNext {
        self.layers.iter().rev().fold(handler, |next, layer| {
            let layer: Arc<dyn MiddlewareLayer> = Arc::from(layer.clone_box());
            let wrapped: BoxedNext = Arc::new(move |req: Request| layer.call(req, next.clone()));
            wrapped
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::IntoResponse;
    use http::{Method, StatusCode};
    use proptest::prelude::*;
    use proptest::test_runner::TestCaseError;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    fn create_test_request(method: Method, path: &str) -> Request {
        let req = http::Request::builder()
            .method(method)
            .uri(path)
            .body(bytes::Bytes::new())
            .unwrap();
        Request::from_http(req)
    }

    fn status_handler(status: StatusCode) -> BoxedNext {
        Arc::new(move |_req: Request| {
            Box::pin(async move { status.into_response() }) as ResponseFuture
        })
    }

    #[derive(Clone)]
    struct OrderTrackingMiddleware {
        id: usize,
        order: Arc<Mutex<Vec<(usize, &'static str)>>>,
    }

    impl MiddlewareLayer for OrderTrackingMiddleware {
        fn call(&self, req: Request, next: BoxedNext) -> ResponseFuture {
            let id = self.id;
            let order = self.order.clone();

            Box::pin(async move {
                order.lock().unwrap().push((id, "pre"));
                let response = next(req).await;
                order.lock().unwrap().push((id, "post"));
                response
            })
        }

        fn clone_box(&self) -> Box<dyn MiddlewareLayer> {
            Box::new(self.clone())
        }
    }

    #[derive(Clone)]
    struct ShortCircuitMiddleware {
        status: StatusCode,
    }

    impl MiddlewareLayer for ShortCircuitMiddleware {
        fn call(&self, _req: Request, _next: BoxedNext) -> ResponseFuture {
            let status = self.status;
            Box::pin(async move { status.into_response() })
        }

        fn clone_box(&self) -> Box<dyn MiddlewareLayer> {
            Box::new(self.clone())
        }
    }

    #[tokio::test]
    async fn test_empty_layer_stack_calls_handler_directly() {
        let stack = LayerStack::new();
        assert!(stack.is_empty());

        let request = create_test_request(Method::GET, "/test");
        let response = stack.execute(request, status_handler(StatusCode::OK)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_short_circuit_skips_handler() {
        let mut stack = LayerStack::new();
        stack.push(Box::new(ShortCircuitMiddleware {
            status: StatusCode::FORBIDDEN,
        }));

        let called = Arc::new(AtomicBool::new(false));
        let flag = called.clone();
        let handler: BoxedNext = Arc::new(move |_req: Request| {
            let flag = flag.clone();
            Box::pin(async move {
                flag.store(true, Ordering::SeqCst);
                StatusCode::OK.into_response()
            }) as ResponseFuture
        });

        let request = create_test_request(Method::POST, "/test");
        let response = stack.execute(request, handler).await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(!called.load(Ordering::SeqCst));
    }

    // Layers run outermost first on the way in and innermost first on the way out.
    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn prop_middleware_execution_order(num_layers in 1usize..10usize) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let result: Result<(), TestCaseError> = rt.block_on(async {
                let order = Arc::new(Mutex::new(Vec::new()));

                let mut stack = LayerStack::new();
                for id in 0..num_layers {
                    stack.push(Box::new(OrderTrackingMiddleware { id, order: order.clone() }));
                }
                prop_assert_eq!(stack.len(), num_layers);

                let request = create_test_request(Method::GET, "/test");
                let _ = stack.execute(request, status_handler(StatusCode::OK)).await;

                let execution_order = order.lock().unwrap();
                prop_assert_eq!(execution_order.len(), num_layers * 2);
                for i in 0..num_layers {
                    prop_assert_eq!(execution_order[i], (i, "pre"));
                    prop_assert_eq!(execution_order[num_layers + i], (num_layers - 1 - i, "post"));
                }
                Ok(())
            });
            result?;
        }
    }
}
