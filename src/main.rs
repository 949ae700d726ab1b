use log::{error, info, LevelFilter};
use rand::prelude::SliceRandom;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::process::exit;
use std::time::Instant;

use devicesort::{
    radix_sort_keys, scratch_size, segmented_sort_pairs, DeviceBuffer, DoubleBuffer, RadixOutcome, ScratchBuffer,
    Stream,
};

fn verify_sorted<T: PartialOrd>(arr: &[T]) -> bool {
    arr.windows(2).all(|w| w[0] <= w[1])
}

fn main() {
    env_logger::builder()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(e) = run() {
        error!("{e}");
        exit(1);
    }
}

fn run() -> devicesort::Result<()> {
    let mut rng = StdRng::seed_from_u64(12345);
    let mut arr: Vec<u64> = (0..10_000_000).collect();
    arr.shuffle(&mut rng);
    let mut reference = arr.clone();

    let stream = Stream::new()?;
    let keys = DeviceBuffer::from_host(&arr);
    let keys_alt = DeviceBuffer::filled(arr.len(), 0u64);
    let pair = DoubleBuffer::new(&keys, &keys_alt);

    let start = Instant::now();
    let bytes = match radix_sort_keys(None, arr.len(), pair, &stream, false, 0, 64)? {
        RadixOutcome::ScratchSize(bytes) => bytes,
        RadixOutcome::Sorted(_) => scratch_size::<u64>(arr.len()),
    };
    let scratch = ScratchBuffer::allocate(bytes);
    let parity = match radix_sort_keys(Some(&scratch), arr.len(), pair, &stream, false, 0, 64)? {
        RadixOutcome::Sorted(parity) => parity,
        RadixOutcome::ScratchSize(_) => unreachable!("scratch was provided"),
    };
    stream.synchronize()?;
    println!("Radix sort: {:?}", start.elapsed());
    pair.select(parity).copy_to_host(&mut arr)?;

    let start = Instant::now();
    reference.sort_unstable();
    println!("Quicksort: {:?}", start.elapsed());
    assert_eq!(arr, reference);

    let n = 1_000_000;
    let seg_keys: Vec<f64> = (0..n).map(|_| rng.gen::<f64>()).collect();
    let seg_values: Vec<u32> = (0..n as u32).collect();
    let offsets: Vec<usize> = (1024..n).step_by(1024).collect();
    let keys = DeviceBuffer::from_host(&seg_keys);
    let values = DeviceBuffer::from_host(&seg_values);

    let start = Instant::now();
    segmented_sort_pairs(&stream, &keys, &values, &offsets)?;
    stream.synchronize()?;
    println!("Segmented sort ({} segments): {:?}", offsets.len() + 1, start.elapsed());

    let sorted = keys.to_vec();
    let ok = sorted.chunks(1024).all(verify_sorted);
    info!("Segments sorted: {ok}");
    if !ok {
        exit(1);
    }
    Ok(())
}
