use std::cmp::Ordering;

use crate::conversion::RadixKey;

/// Sorts a short run of keys and its parallel values in place.
pub fn insertion_sort<K: RadixKey, V: Copy>(keys: &mut [K], values: &mut [V]) {
    debug_assert_eq!(keys.len(), values.len());
    for j in 1..keys.len() {
        let key = keys[j];
        let value = values[j];
        let mut i = j;
        while i > 0 && keys[i - 1].radix_cmp(&key) == Ordering::Greater {
            keys[i] = keys[i - 1];
            values[i] = values[i - 1];
            i -= 1;
        }
        keys[i] = key;
        values[i] = value;
    }
}
