//! Dispatch throughput: blocking call, call with value, TLS read

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pinthread::Thread;

fn bench_call(c: &mut Criterion) {
    let th = Thread::new();
    c.bench_function("call", |b| b.iter(|| th.call(|| {})));
    th.join();
}

fn bench_call_v(c: &mut Criterion) {
    let th = Thread::new();
    c.bench_function("call_v", |b| b.iter(|| black_box(th.call_v(|| true))));
    th.join();
}

fn bench_call_non_block(c: &mut Criterion) {
    let th = Thread::new();
    c.bench_function("call_non_block", |b| b.iter(|| th.call_non_block(|| {})));
    // Drain before the next benchmark starts.
    th.call(|| {});
    th.join();
}

fn bench_tls(c: &mut Criterion) {
    let th = Thread::new();
    let inner = th.clone();
    th.call(move || inner.set_tls(1u64));

    c.bench_function("tls_get_dispatched", |b| {
        b.iter(|| {
            let inner = th.clone();
            black_box(th.call_v(move || inner.get_tls::<u64>()))
        })
    });
    th.join();
}

criterion_group!(benches, bench_call, bench_call_v, bench_call_non_block, bench_tls);
criterion_main!(benches);
