//! Protection overhead per request
//!
//! Runs requests through a protected handler, with and without a valid token.

use antiforge_core::{handler, BoxedNext, Request};
use antiforge_csrf::{CookieStorage, Csrf, HeaderPolicy, TokenSigner};
use bytes::Bytes;
use criterion::{criterion_group, criterion_main, Criterion};
use http::{header, Method};

const SECRET: &str = "bench secret";

fn protected() -> BoxedNext {
    let csrf = Csrf::new(
        CookieStorage::new("csrf_token").secret_phrase(SECRET).unwrap(),
        HeaderPolicy::default(),
    );
    csrf.protect(handler(|_req: Request| async { "OK" }))
}

fn request(method: Method, cookie: &str, submitted: &str) -> Request {
    let req = http::Request::builder()
        .method(method)
        .uri("/")
        .header(header::COOKIE, format!("csrf_token={}", cookie))
        .header("X-CSRF-TOKEN", submitted)
        .body(Bytes::new())
        .unwrap();
    Request::from_http(req)
}

fn bench_protect(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
    let next = protected();
    let signed = TokenSigner::new(SECRET)
        .unwrap()
        .sign(&"abcdefghijklmnopqrstuvwxyz0123456789ABCDEFG".into());
    let raw = signed.split('.').next().unwrap_or_default().to_string();

    let mut group = c.benchmark_group("protect");

    group.bench_function("safe_passthrough", |b| {
        b.iter(|| rt.block_on(next(request(Method::GET, &signed, ""))))
    });
    group.bench_function("unsafe_allowed", |b| {
        b.iter(|| rt.block_on(next(request(Method::POST, &signed, &raw))))
    });
    group.bench_function("unsafe_denied", |b| {
        b.iter(|| rt.block_on(next(request(Method::POST, &signed, "forged"))))
    });

    group.finish();
}

criterion_group!(benches, bench_protect);
criterion_main!(benches);
