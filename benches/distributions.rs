use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp};
use devicesort::sort_keys_slice;

const LEN: usize = 1 << 22;

// exponential distribution, scaled to the full u64 range
fn generate_exponential(rng: &mut StdRng, length: usize) -> Vec<u64> {
    let exp = Exp::new(1.0).unwrap();
    (0..length)
        .map(|_| (exp.sample(rng) * 1e15) as u64)
        .collect()
}

// rootDup distribution.
fn generate_root_dup(n: usize) -> Vec<u64> {
    let sqrt_n = (n as f64).sqrt() as usize;
    (0..n).map(|i| (i % sqrt_n) as u64).collect()
}

// twoDup distribution.
fn generate_two_dup(n: usize) -> Vec<u64> {
    (0..n).map(|i| ((i * i + n / 2) % n) as u64).collect()
}

// 95% sorted
fn generate_almost_sorted(rng: &mut StdRng, length: usize) -> Vec<u64> {
    let mut data: Vec<u64> = (0..length as u64).collect();
    for _ in 0..(length / 20) {
        let i = rng.gen_range(0..length);
        let j = rng.gen_range(0..length);
        data.swap(i, j);
    }
    data
}

// uniform floats, negative and positive
fn generate_uniform_f64(rng: &mut StdRng, length: usize) -> Vec<f64> {
    (0..length).map(|_| rng.gen_range(-1e6..1e6)).collect()
}

fn benchmark_distributions(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(12345);
    let inputs: Vec<(&str, Vec<u64>)> = vec![
        ("exponential", generate_exponential(&mut rng, LEN)),
        ("root_dup", generate_root_dup(LEN)),
        ("two_dup", generate_two_dup(LEN)),
        ("almost_sorted", generate_almost_sorted(&mut rng, LEN)),
    ];

    let mut group = c.benchmark_group("Radix sort distributions");
    group.sample_size(10);
    for (name, data) in &inputs {
        group.bench_function(*name, |b| {
            b.iter_batched_ref(
                || data.clone(),
                |data| sort_keys_slice(black_box(data), false).unwrap(),
                BatchSize::LargeInput,
            )
        });
    }
    let floats = generate_uniform_f64(&mut rng, LEN);
    group.bench_function("uniform_f64", |b| {
        b.iter_batched_ref(
            || floats.clone(),
            |data| sort_keys_slice(black_box(data), false).unwrap(),
            BatchSize::LargeInput,
        )
    });
    group.finish();
}

criterion_group!(benches, benchmark_distributions);
criterion_main!(benches);
