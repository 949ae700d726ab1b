pub mod config;
pub mod conversion;
pub mod device;
pub mod error;
pub mod ffi;
pub mod scratch;
pub mod segmented_sort;
pub mod sort;
pub mod stream;
mod base_case;
mod classification;
mod merge;
mod permutation;
mod sampling;
mod sorter;

pub use config::DeviceConfig;
pub use conversion::{KeyType, RadixKey};
pub use device::{is_available, Device, DeviceBuffer};
pub use error::{Result, SortError};
pub use scratch::{scratch_size, ScratchBuffer};
pub use segmented_sort::{
    segmented_sort_keys, segmented_sort_keys_slice, segmented_sort_pairs, segmented_sort_pairs_slice,
    validate_segments,
};
pub use sort::{
    radix_sort, radix_sort_keys, sort_keys, sort_keys_slice, sort_pairs, sort_pairs_slice, DoubleBuffer, Parity,
    Payload, RadixOutcome,
};
pub use stream::Stream;
