//! Performance benchmarks for trainportal-auth.
//!
//! Run with: cargo bench -p trainportal-auth

use std::time::Duration;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use trainportal_auth::{PasswordHasher, Role, TokenIssuer};
use trainportal_core::{PasswordHashConfig, SigningSecret};

/// Benchmark password hashing at a few memory costs.
fn bench_password_hash(c: &mut Criterion) {
    let mut group = c.benchmark_group("password_hash");
    group.sample_size(10);

    for memory_kib in [4 * 1024, 19 * 1024] {
        let hasher = PasswordHasher::new(PasswordHashConfig {
            memory_kib,
            iterations: 2,
            parallelism: 1,
        })
        .unwrap();

        group.bench_with_input(BenchmarkId::new("hash", memory_kib), &hasher, |b, hasher| {
            b.iter(|| hasher.hash(black_box("correct horse battery staple")).unwrap());
        });

        let digest = hasher.hash("correct horse battery staple").unwrap();
        group.bench_with_input(BenchmarkId::new("verify", memory_kib), &hasher, |b, hasher| {
            b.iter(|| hasher.verify(black_box("correct horse battery staple"), &digest));
        });
    }

    group.finish();
}

/// Benchmark token issue and verify.
fn bench_tokens(c: &mut Criterion) {
    let issuer = TokenIssuer::new(
        &SigningSecret::new(TokenIssuer::generate_hex_secret()),
        Duration::from_secs(72 * 3600),
    )
    .unwrap();

    c.bench_function("token_issue", |b| {
        b.iter(|| issuer.issue(black_box("user_bench"), Role::Trainer).unwrap());
    });

    let token = issuer.issue("user_bench", Role::Trainer).unwrap().token;
    c.bench_function("token_verify", |b| {
        b.iter(|| issuer.verify(black_box(&token)).unwrap());
    });
}

/// Benchmark the reachability check.
fn bench_role_check(c: &mut Criterion) {
    c.bench_function("role_can_act", |b| {
        b.iter(|| {
            for actor in Role::ASSIGNABLE {
                for required in Role::ASSIGNABLE {
                    black_box(black_box(actor).can_act(black_box(required)));
                }
            }
        });
    });
}

criterion_group!(benches, bench_password_hash, bench_tokens, bench_role_check);
criterion_main!(benches);
