use rayon::prelude::*;

use crate::config::RADIX_BUCKETS;
use crate::conversion::RadixKey;
use crate::scratch::{chunk_len, num_chunks};
use crate::sorter::{Pass, RadixSorter};

impl RadixSorter<'_> {
    /// Builds one digit histogram per block of keys.
    pub fn classify<K: RadixKey>(&mut self, keys: &[K], pass: &Pass) {
        let chunks = num_chunks::<K>(keys.len());
        let histograms = &mut self.histograms[..chunks * RADIX_BUCKETS];

        if self.parallel {
            histograms
                .par_chunks_mut(RADIX_BUCKETS)
                .zip(keys.par_chunks(chunk_len::<K>()))
                .for_each(|(histogram, chunk)| count_digits(chunk, histogram, pass));
        } else {
            for (histogram, chunk) in histograms
                .chunks_mut(RADIX_BUCKETS)
                .zip(keys.chunks(chunk_len::<K>()))
            {
                count_digits(chunk, histogram, pass);
            }
        }
    }
}

#[inline]
fn count_digits<K: RadixKey>(chunk: &[K], histogram: &mut [usize], pass: &Pass) {
    histogram.fill(0);
    for key in chunk {
        // SAFETY: digit() is masked to at most RADIX_BUCKETS - 1
        unsafe {
            *histogram.get_unchecked_mut(pass.digit(*key)) += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sorter::passes;

    #[test]
    fn histogram_of_low_byte() {
        let keys: Vec<u16> = vec![0x0101, 0x0201, 0x0002, 0xFFFF];
        let mut histograms = vec![usize::MAX; RADIX_BUCKETS];
        let pass = passes(0, 16, false)[0];
        RadixSorter::new_sequential(&mut histograms).classify(&keys, &pass);
        assert_eq!(histograms[1], 2);
        assert_eq!(histograms[2], 1);
        assert_eq!(histograms[0xFF], 1);
        assert_eq!(histograms.iter().sum::<usize>(), 4);
    }

    #[test]
    fn descending_complements_digits() {
        let keys: Vec<u8> = vec![0, 255];
        let mut histograms = vec![0; RADIX_BUCKETS];
        let pass = passes(0, 8, true)[0];
        RadixSorter::new_sequential(&mut histograms).classify(&keys, &pass);
        assert_eq!(histograms[255], 1);
        assert_eq!(histograms[0], 1);
        assert_eq!(pass.digit(0u8), 255);
    }
}
