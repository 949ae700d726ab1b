use std::cmp::Ordering;

use rayon::prelude::*;

use crate::base_case::insertion_sort;
use crate::config::TILE_SIZE;
use crate::conversion::RadixKey;

/// Bottom-up merge sort of one segment. Tiles are insertion sorted, then
/// merged pairwise, ping-ponging between the segment and `keys_tmp`.
pub fn merge_sort<K, V>(
    keys: &mut [K],
    values: &mut [V],
    keys_tmp: &mut [K],
    values_tmp: &mut [V],
    parallel: bool,
) where
    K: RadixKey,
    V: Copy + Send + Sync,
{
    let n = keys.len();
    debug_assert_eq!(values.len(), n);
    debug_assert_eq!(keys_tmp.len(), n);
    debug_assert_eq!(values_tmp.len(), n);
    if n <= 1 {
        return;
    }

    if parallel {
        keys.par_chunks_mut(TILE_SIZE)
            .zip(values.par_chunks_mut(TILE_SIZE))
            .for_each(|(k, v)| insertion_sort(k, v));
    } else {
        for (k, v) in keys.chunks_mut(TILE_SIZE).zip(values.chunks_mut(TILE_SIZE)) {
            insertion_sort(k, v);
        }
    }

    let mut width = TILE_SIZE;
    let mut in_tmp = false;
    while width < n {
        if in_tmp {
            merge_level(keys_tmp, values_tmp, keys, values, width, parallel);
        } else {
            merge_level(keys, values, keys_tmp, values_tmp, width, parallel);
        }
        in_tmp = !in_tmp;
        width *= 2;
    }

    if in_tmp {
        keys.copy_from_slice(keys_tmp);
        values.copy_from_slice(values_tmp);
    }
}

/// Merges neighbouring sorted runs of length `width` from `src` into `dst`.
fn merge_level<K, V>(
    src_keys: &[K],
    src_values: &[V],
    dst_keys: &mut [K],
    dst_values: &mut [V],
    width: usize,
    parallel: bool,
) where
    K: RadixKey,
    V: Copy + Send + Sync,
{
    let span = 2 * width;
    let merge = |((sk, sv), (dk, dv)): ((&[K], &[V]), (&mut [K], &mut [V]))| {
        let mid = width.min(sk.len());
        merge_runs(sk, sv, dk, dv, mid);
    };

    if parallel {
        src_keys
            .par_chunks(span)
            .zip(src_values.par_chunks(span))
            .zip(dst_keys.par_chunks_mut(span).zip(dst_values.par_chunks_mut(span)))
            .for_each(merge);
    } else {
        src_keys
            .chunks(span)
            .zip(src_values.chunks(span))
            .zip(dst_keys.chunks_mut(span).zip(dst_values.chunks_mut(span)))
            .for_each(merge);
    }
}

/// Stable merge of `src[..mid]` and `src[mid..]`.
fn merge_runs<K: RadixKey, V: Copy>(
    src_keys: &[K],
    src_values: &[V],
    dst_keys: &mut [K],
    dst_values: &mut [V],
    mid: usize,
) {
    let n = src_keys.len();
    let (mut i, mut j, mut out) = (0, mid, 0);
    while i < mid && j < n {
        if src_keys[j].radix_cmp(&src_keys[i]) == Ordering::Less {
            dst_keys[out] = src_keys[j];
            dst_values[out] = src_values[j];
            j += 1;
        } else {
            dst_keys[out] = src_keys[i];
            dst_values[out] = src_values[i];
            i += 1;
        }
        out += 1;
    }
    let rest = mid - i;
    dst_keys[out..out + rest].copy_from_slice(&src_keys[i..mid]);
    dst_values[out..out + rest].copy_from_slice(&src_values[i..mid]);
    out += rest;
    dst_keys[out..].copy_from_slice(&src_keys[j..]);
    dst_values[out..].copy_from_slice(&src_values[j..]);
}
