use std::mem;

use log::debug;

use crate::config::{PARALLEL_THRESHOLD, RADIX_BITS, RADIX_BUCKETS};
use crate::conversion::RadixKey;
use crate::scratch::num_chunks;
use crate::sort::Parity;

/// One digit pass over bits `[shift, shift + width)` of the key image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Pass {
    pub shift: u32,
    pub mask: u64,
    pub descending: bool,
}

impl Pass {
    #[inline(always)]
    pub fn digit<K: RadixKey>(&self, key: K) -> usize {
        let mut image = key.to_radix();
        if self.descending {
            image = !image;
        }
        ((image >> self.shift) & self.mask) as usize
    }

    pub fn buckets(&self) -> usize {
        self.mask as usize + 1
    }

    /// Bits of the key image this pass looks at.
    pub fn bit_mask(&self) -> u64 {
        self.mask << self.shift
    }
}

pub(crate) fn passes(begin_bit: u32, end_bit: u32, descending: bool) -> Vec<Pass> {
    let mut res = Vec::new();
    let mut shift = begin_bit;
    while shift < end_bit {
        let width = RADIX_BITS.min(end_bit - shift);
        res.push(Pass {
            shift,
            mask: (1u64 << width) - 1,
            descending,
        });
        shift += width;
    }
    res
}

pub(crate) fn parity_of(count: usize, begin_bit: u32, end_bit: u32) -> Parity {
    if count == 0 || begin_bit >= end_bit {
        return Parity::Primary;
    }
    let num_passes = (end_bit - begin_bit).div_ceil(RADIX_BITS);
    if num_passes % 2 == 0 {
        Parity::Primary
    } else {
        Parity::Alternate
    }
}

pub(crate) struct Task<'a, K, V> {
    pub keys: &'a mut [K],
    pub keys_alt: &'a mut [K],
    pub values: Option<(&'a mut [V], &'a mut [V])>,
    pub begin_bit: u32,
    pub end_bit: u32,
    pub descending: bool,
}

impl<K, V> Task<'_, K, V> {
    pub fn len(&self) -> usize {
        self.keys.len()
    }
}

/// LSD radix sorter working over a caller-provided ping-pong pair.
pub(crate) struct RadixSorter<'s> {
    pub histograms: &'s mut [usize],
    pub parallel: bool,
}

impl<'s> RadixSorter<'s> {
    pub fn new_sequential(histograms: &'s mut [usize]) -> RadixSorter<'s> {
        RadixSorter {
            histograms,
            parallel: false,
        }
    }

    pub fn new_parallel(histograms: &'s mut [usize]) -> RadixSorter<'s> {
        RadixSorter {
            histograms,
            parallel: true,
        }
    }

    /// Picks the parallel kernels once the input is large enough to pay for them.
    pub fn for_count(histograms: &'s mut [usize], count: usize) -> RadixSorter<'s> {
        if count >= PARALLEL_THRESHOLD {
            Self::new_parallel(histograms)
        } else {
            Self::new_sequential(histograms)
        }
    }

    pub fn sort<K, V>(&mut self, task: Task<'_, K, V>) -> Parity
    where
        K: RadixKey,
        V: Copy + Send + Sync,
    {
        let count = task.len();
        let passes = passes(task.begin_bit, task.end_bit, task.descending);
        if count == 0 || passes.is_empty() {
            return Parity::Primary;
        }
        let chunks = num_chunks::<K>(count);
        debug_assert!(self.histograms.len() >= chunks * RADIX_BUCKETS);

        let differing_bits = self.differing_bits(task.keys);
        debug!("Sorting {count} keys in {} passes, differing bits {:#x}", passes.len(), differing_bits);

        let mut src = task.keys;
        let mut dst = task.keys_alt;
        let mut values = task.values;

        for (i, pass) in passes.iter().enumerate() {
            if differing_bits & pass.bit_mask() == 0 {
                debug!("Pass {i} (shift {}): digit constant, copying", pass.shift);
                dst.copy_from_slice(src);
                if let Some((values_src, values_dst)) = values.as_mut() {
                    values_dst.copy_from_slice(values_src);
                }
            } else {
                self.classify(src, pass);
                self.prefix_sum(chunks, pass);
                let value_pair = values
                    .as_mut()
                    .map(|(values_src, values_dst)| (&**values_src, &mut **values_dst));
                self.permutate(src, dst, value_pair, pass);
                debug!("Pass {i} (shift {}): scattered", pass.shift);
            }

            mem::swap(&mut src, &mut dst);
            if let Some((values_src, values_dst)) = values.as_mut() {
                mem::swap(values_src, values_dst);
            }
        }

        if passes.len() % 2 == 0 {
            Parity::Primary
        } else {
            Parity::Alternate
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scratch::scratch_size;
    use std::mem::size_of;

    fn run<K: RadixKey>(keys: &mut Vec<K>, descending: bool) -> Vec<K> {
        let mut alt = keys.clone();
        let mut histograms = vec![0usize; scratch_size::<K>(keys.len()) / size_of::<usize>()];
        let mut sorter = RadixSorter::new_sequential(&mut histograms);
        let parity = sorter.sort::<K, ()>(Task {
            keys: &mut keys[..],
            keys_alt: &mut alt,
            values: None,
            begin_bit: 0,
            end_bit: K::BITS,
            descending,
        });
        match parity {
            Parity::Primary => keys.clone(),
            Parity::Alternate => alt,
        }
    }

    #[test]
    fn pass_layout() {
        let p = passes(0, 32, false);
        assert_eq!(p.len(), 4);
        assert_eq!(p[3].shift, 24);
        let p = passes(3, 20, true);
        assert_eq!(p.iter().map(|p| p.shift).collect::<Vec<_>>(), vec![3, 11, 19]);
        assert_eq!(p[2].mask, 1);
        assert!(passes(8, 8, false).is_empty());
    }

    #[test]
    fn parity_follows_pass_count() {
        assert_eq!(parity_of(10, 0, 32), Parity::Primary);
        assert_eq!(parity_of(10, 0, 8), Parity::Alternate);
        assert_eq!(parity_of(10, 0, 12), Parity::Primary);
        assert_eq!(parity_of(0, 0, 8), Parity::Primary);
        assert_eq!(parity_of(10, 9, 9), Parity::Primary);
    }

    #[test]
    fn small_unsigned() {
        let mut keys: Vec<u32> = vec![5, 3, 3, 1, 4];
        assert_eq!(run(&mut keys, false), vec![1, 3, 3, 4, 5]);
    }

    #[test]
    fn small_descending_signed() {
        let mut keys: Vec<i16> = vec![-5, 300, 3, -1, 4, i16::MIN];
        assert_eq!(run(&mut keys, true), vec![300, 4, 3, -1, -5, i16::MIN]);
    }

    #[test]
    fn constant_digits_still_flip_buffers() {
        // only the lowest byte differs; the three upper passes degenerate to copies
        let mut keys: Vec<u32> = vec![0xAB00_0003, 0xAB00_0001, 0xAB00_0002];
        assert_eq!(run(&mut keys, false), vec![0xAB00_0001, 0xAB00_0002, 0xAB00_0003]);
    }

    #[test]
    fn pairs_move_together() {
        let mut keys: Vec<u64> = vec![5, 3, 3, 1, 4];
        let mut keys_alt = keys.clone();
        let mut values: Vec<u32> = vec![50, 30, 31, 10, 40];
        let mut values_alt = values.clone();
        let mut histograms = vec![0usize; RADIX_BUCKETS];
        let parity = RadixSorter::new_sequential(&mut histograms).sort(Task {
            keys: &mut keys,
            keys_alt: &mut keys_alt,
            values: Some((&mut values[..], &mut values_alt[..])),
            begin_bit: 0,
            end_bit: 64,
            descending: false,
        });
        assert_eq!(parity, Parity::Primary);
        assert_eq!(keys, vec![1, 3, 3, 4, 5]);
        // the scatter is stable
        assert_eq!(values, vec![10, 30, 31, 40, 50]);
    }
}
