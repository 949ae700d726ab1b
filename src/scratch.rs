use std::mem::size_of;

use crate::config::{CHUNK_BYTES, RADIX_BUCKETS};
use crate::conversion::RadixKey;
use crate::device::DeviceBuffer;

/// Elements of key type `K` per histogram block.
pub(crate) const fn chunk_len<K: RadixKey>() -> usize {
    CHUNK_BYTES / size_of::<K>()
}

pub(crate) fn num_chunks<K: RadixKey>(count: usize) -> usize {
    count.div_ceil(chunk_len::<K>())
}

/// Bytes of scratch the radix sort needs for `count` keys of type `K`:
/// one digit histogram per block of keys.
pub fn scratch_size<K: RadixKey>(count: usize) -> usize {
    num_chunks::<K>(count) * RADIX_BUCKETS * size_of::<usize>()
}

/// Transient storage for the radix sort, handed out after a sizing call and
/// passed back on the sort call.
#[derive(Clone, Debug)]
pub struct ScratchBuffer {
    bytes: usize,
    pub(crate) histograms: DeviceBuffer<usize>,
}

impl ScratchBuffer {
    pub fn allocate(bytes: usize) -> ScratchBuffer {
        let words = bytes.div_ceil(size_of::<usize>());
        ScratchBuffer {
            bytes: words * size_of::<usize>(),
            histograms: DeviceBuffer::filled(words, 0),
        }
    }

    pub fn for_keys<K: RadixKey>(count: usize) -> ScratchBuffer {
        Self::allocate(scratch_size::<K>(count))
    }

    pub fn bytes(&self) -> usize {
        self.bytes
    }
}
