use std::env;
use std::num::NonZeroUsize;
use std::thread;

/// Bits consumed by one radix pass.
pub const RADIX_BITS: u32 = 8;
pub const RADIX_BUCKETS: usize = 1 << RADIX_BITS;

/// Bytes of keys handled by one block of the histogram and scatter kernels.
pub const CHUNK_BYTES: usize = 1 << 16;

/// Tiles the segmented merge sort starts from; sorted by insertion sort.
pub const TILE_SIZE: usize = 32;

/// Below this many elements the kernels run on the calling thread.
pub const PARALLEL_THRESHOLD: usize = 1 << 16;

const fn is_power_of_two(x: usize) -> bool {
    (x!=0) && ((x & (x-1)) == 0)
}

const _: () = {
    assert!(is_power_of_two(RADIX_BUCKETS), "RADIX_BUCKETS must be a power of two");
    assert!(is_power_of_two(CHUNK_BYTES), "CHUNK_BYTES must be a power of two");
    assert!(is_power_of_two(TILE_SIZE), "TILE_SIZE must be a power of two");
    assert!(RADIX_BITS <= 16, "histograms are sized for at most 16 bit digits");
};

pub const THREADS_VAR: &str = "DEVICESORT_THREADS";
pub const DEVICE_VAR: &str = "DEVICESORT_DEVICE";

/// Runtime settings of the device, read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    pub num_threads: usize,
    pub enabled: bool,
}

impl DeviceConfig {
    pub fn from_env() -> DeviceConfig {
        let num_threads = env::var(THREADS_VAR)
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or_else(default_threads);

        let enabled = env::var(DEVICE_VAR)
            .map(|val| !val.eq_ignore_ascii_case("none"))
            .unwrap_or(true);

        DeviceConfig {
            num_threads,
            enabled,
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            num_threads: default_threads(),
            enabled: true,
        }
    }
}

fn default_threads() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}
