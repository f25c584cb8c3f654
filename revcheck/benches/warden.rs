use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use revcheck::warden::{CipherState, EncryptionContext, HashChainPrng};

pub fn cipher_benchmark(c: &mut Criterion) {
    let key = [0x42u8; 16];

    c.bench_function("key_schedule", |b| {
        b.iter(|| black_box(CipherState::new(black_box(&key))))
    });

    let mut group = c.benchmark_group("warden_crypt");
    for size in [64usize, 1024, 16 * 1024] {
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_function(format!("encrypt_{}", size), |b| {
            let mut ctx = EncryptionContext::new(0x1234_5678);
            let mut data = vec![0u8; size];
            b.iter(|| {
                ctx.encrypt_in_place(black_box(&mut data));
            })
        });
    }
    group.finish();
}

pub fn prng_benchmark(c: &mut Criterion) {
    c.bench_function("context_setup", |b| {
        b.iter(|| black_box(EncryptionContext::new(black_box(0xDEADBEEF))))
    });

    c.bench_function("prng_1k", |b| {
        let mut prng = HashChainPrng::new(b"benchmark seed");
        b.iter(|| black_box(prng.next_bytes(1024)))
    });
}

criterion_group!(benches, cipher_benchmark, prng_benchmark);
criterion_main!(benches);
