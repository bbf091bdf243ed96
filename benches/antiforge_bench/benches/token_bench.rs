//! Token codec benchmarks
//!
//! Generation, HMAC signing and verification, and constant-time comparison.

use antiforge_csrf::{
    tokens_match, HashedTokenGenerator, RandomTokenGenerator, Token, TokenGenerator, TokenSigner,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn bench_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate");

    for length in [16usize, 32, 64] {
        let generator = RandomTokenGenerator::new(length);
        group.bench_with_input(BenchmarkId::new("random", length), &length, |b, _| {
            b.iter(|| generator.generate())
        });
    }

    let hashed = HashedTokenGenerator::new("bench secret");
    group.bench_function("hashed", |b| b.iter(|| hashed.generate()));

    group.finish();
}

fn bench_signing(c: &mut Criterion) {
    let mut group = c.benchmark_group("signing");
    let signer = TokenSigner::new("bench secret").unwrap();
    let token = RandomTokenGenerator::default().generate();
    let signed = signer.sign(&token);
    let tampered = format!("{}x", signed);

    group.bench_function("sign", |b| b.iter(|| signer.sign(black_box(&token))));
    group.bench_function("verify_valid", |b| {
        b.iter(|| signer.verify(black_box(&signed)))
    });
    group.bench_function("verify_tampered", |b| {
        b.iter(|| signer.verify(black_box(&tampered)))
    });
    group.bench_function("verify_malformed", |b| {
        b.iter(|| signer.verify(black_box("no-signature-here")))
    });

    group.finish();
}

fn bench_compare(c: &mut Criterion) {
    let mut group = c.benchmark_group("tokens_match");
    let a = Token::new("a".repeat(43));
    let equal = a.clone();
    let early = Token::new(format!("b{}", "a".repeat(42)));
    let late = Token::new(format!("{}b", "a".repeat(42)));

    for (name, other) in [("equal", &equal), ("differs_first", &early), ("differs_last", &late)] {
        group.bench_function(name, |b| {
            b.iter(|| tokens_match(black_box(a.as_str()), black_box(other.as_str())))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_generate, bench_signing, bench_compare);
criterion_main!(benches);
