//! Handler adapters

use crate::middleware::{BoxedNext, ResponseFuture};
use crate::request::Request;
use crate::response::IntoResponse;
use std::future::Future;
use std::sync::Arc;

/// Turn an async function of the request into a [`BoxedNext`]
///
/// ```rust,ignore
/// async fn index(_req: Request) -> &'static str {
///     "OK"
/// }
///
/// let next = handler(index);
/// ```
pub fn handler<F, Fut, R>(f: F) -> BoxedNext
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse,
{
    Arc::new(move |req: Request| {
        let fut = f(req);
        Box::pin(async move { fut.await.into_response() }) as ResponseFuture
    })
}
