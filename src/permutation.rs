use rayon::prelude::*;

use crate::config::RADIX_BUCKETS;
use crate::conversion::RadixKey;
use crate::scratch::chunk_len;
use crate::sorter::{Pass, RadixSorter};

/// Raw destination shared by the scatter of all blocks. Blocks write
/// disjoint index sets, which the prefix sum guarantees.
struct ScatterTarget<T> {
    ptr: *mut T,
    len: usize,
}

unsafe impl<T: Send> Send for ScatterTarget<T> {}
unsafe impl<T: Send> Sync for ScatterTarget<T> {}

impl<T> ScatterTarget<T> {
    fn new(slice: &mut [T]) -> ScatterTarget<T> {
        ScatterTarget {
            ptr: slice.as_mut_ptr(),
            len: slice.len(),
        }
    }

    /// # Safety
    /// No other thread may write `idx` concurrently.
    #[inline(always)]
    unsafe fn write(&self, idx: usize, value: T) {
        debug_assert!(idx < self.len, "scatter index {idx} out of bounds {}", self.len);
        self.ptr.add(idx).write(value);
    }
}

impl RadixSorter<'_> {
    /// Turns the block histograms into write offsets, digit-major and block
    /// order within a digit, so equal digits keep their relative order.
    pub fn prefix_sum(&mut self, chunks: usize, pass: &Pass) {
        let histograms = &mut self.histograms[..chunks * RADIX_BUCKETS];
        let mut sum = 0;
        for digit in 0..pass.buckets() {
            for chunk in 0..chunks {
                let slot = &mut histograms[chunk * RADIX_BUCKETS + digit];
                let count = *slot;
                *slot = sum;
                sum += count;
            }
        }
    }

    /// Moves every key (and its value) of `src` to its slot in `dst`.
    pub fn permutate<K, V>(&mut self, src: &[K], dst: &mut [K], values: Option<(&[V], &mut [V])>, pass: &Pass)
    where
        K: RadixKey,
        V: Copy + Send + Sync,
    {
        assert_eq!(src.len(), dst.len());
        let len = chunk_len::<K>();
        let keys_out = ScatterTarget::new(dst);
        let values = values.map(|(values_src, values_dst)| {
            assert_eq!(values_src.len(), src.len());
            assert_eq!(values_dst.len(), src.len());
            (values_src, ScatterTarget::new(values_dst))
        });

        let scatter = |chunk_idx: usize, chunk: &[K], offsets: &mut [usize]| {
            let base = chunk_idx * len;
            for (i, key) in chunk.iter().enumerate() {
                let digit = pass.digit(*key);
                let dest = offsets[digit];
                offsets[digit] += 1;
                // SAFETY: offsets of distinct blocks and digits never overlap
                unsafe {
                    keys_out.write(dest, *key);
                    if let Some((values_src, values_out)) = &values {
                        values_out.write(dest, values_src[base + i]);
                    }
                }
            }
        };

        let chunks = src.len().div_ceil(len);
        let histograms = &mut self.histograms[..chunks * RADIX_BUCKETS];
        if self.parallel {
            histograms
                .par_chunks_mut(RADIX_BUCKETS)
                .zip(src.par_chunks(len))
                .enumerate()
                .for_each(|(chunk_idx, (offsets, chunk))| scatter(chunk_idx, chunk, offsets));
        } else {
            for (chunk_idx, (offsets, chunk)) in histograms
                .chunks_mut(RADIX_BUCKETS)
                .zip(src.chunks(len))
                .enumerate()
            {
                scatter(chunk_idx, chunk, offsets);
            }
        }
    }
}
