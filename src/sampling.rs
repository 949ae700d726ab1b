use rayon::prelude::*;

use crate::conversion::RadixKey;
use crate::sorter::RadixSorter;

impl RadixSorter<'_> {
    /// Bits of the key image that are not identical across all keys.
    /// A pass whose digit lies entirely outside these bits moves nothing.
    pub fn differing_bits<K: RadixKey>(&self, keys: &[K]) -> u64 {
        let reference = match keys.first() {
            None => return 0,
            Some(key) => key.to_radix(),
        };
        if self.parallel {
            keys.par_iter()
                .map(|key| key.to_radix() ^ reference)
                .reduce(|| 0, |a, b| a | b)
        } else {
            keys.iter()
                .fold(0, |acc, key| acc | (key.to_radix() ^ reference))
        }
    }
}
