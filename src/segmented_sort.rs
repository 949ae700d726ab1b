//! Segmented sort engine.
//!
//! Sorts keys (and values) independently inside each segment of a flat
//! array. Interior `segment_offsets` split `[0, count)` into segments:
//! `[0, offsets[0])`, `[offsets[0], offsets[1])`, ..., `[offsets[m-2], count)`.
//! Segments are never merged with each other.

use log::{debug, info};
use rayon::prelude::*;

use crate::config::PARALLEL_THRESHOLD;
use crate::conversion::RadixKey;
use crate::device::{lock_pair, Device, DeviceBuffer};
use crate::error::{Result, SortError};
use crate::merge::merge_sort;
use crate::sort::Payload;
use crate::stream::Stream;

/// Checks that `offsets` are non-decreasing and within `[0, count]`.
pub fn validate_segments(count: usize, offsets: &[usize]) -> Result<()> {
    let mut previous = 0;
    for (index, &offset) in offsets.iter().enumerate() {
        if offset > count {
            return Err(SortError::SegmentOutOfRange { index, offset, count });
        }
        if offset < previous {
            return Err(SortError::SegmentsNotAscending {
                index,
                previous,
                offset,
            });
        }
        previous = offset;
    }
    Ok(())
}

/// `[lo, hi)` bounds of every segment, empty ones included.
pub fn segment_bounds(count: usize, offsets: &[usize]) -> Vec<(usize, usize)> {
    let mut bounds = Vec::with_capacity(offsets.len() + 1);
    let mut lo = 0;
    for &hi in offsets.iter().chain(std::iter::once(&count)) {
        bounds.push((lo, hi));
        lo = hi;
    }
    bounds
}

pub fn segmented_sort_pairs<K: RadixKey, V: Payload>(
    stream: &Stream,
    keys: &DeviceBuffer<K>,
    values: &DeviceBuffer<V>,
    segment_offsets: &[usize],
) -> Result<()> {
    if keys.id() == values.id() {
        return Err(SortError::AliasedBuffers);
    }
    if values.len() != keys.len() {
        return Err(SortError::LengthMismatch {
            buffer: "values",
            expected: keys.len(),
            actual: values.len(),
        });
    }
    validate_segments(keys.len(), segment_offsets)?;

    let keys = keys.clone();
    let values = values.clone();
    let offsets = segment_offsets.to_vec();
    stream.enqueue(Box::new(move || {
        let (mut keys, mut values) = lock_pair(&keys, &values);
        segmented_sort_pairs_slice(&mut keys, &mut values, &offsets)
    }))
}

pub fn segmented_sort_keys<K: RadixKey>(
    stream: &Stream,
    keys: &DeviceBuffer<K>,
    segment_offsets: &[usize],
) -> Result<()> {
    validate_segments(keys.len(), segment_offsets)?;

    let keys = keys.clone();
    let offsets = segment_offsets.to_vec();
    stream.enqueue(Box::new(move || {
        let mut keys = keys.lock();
        segmented_sort_keys_slice(&mut keys, &offsets)
    }))
}

pub fn segmented_sort_keys_slice<K: RadixKey>(keys: &mut [K], segment_offsets: &[usize]) -> Result<()> {
    let mut values = vec![(); keys.len()];
    segmented_sort_pairs_slice(keys, &mut values, segment_offsets)
}

/// Synchronous segmented sort of host-visible pairs.
pub fn segmented_sort_pairs_slice<K: RadixKey, V: Payload>(
    keys: &mut [K],
    values: &mut [V],
    segment_offsets: &[usize],
) -> Result<()> {
    let count = keys.len();
    if values.len() != count {
        return Err(SortError::LengthMismatch {
            buffer: "values",
            expected: count,
            actual: values.len(),
        });
    }
    validate_segments(count, segment_offsets)?;
    if count <= 1 {
        return Ok(());
    }

    let device = Device::global()?;
    let bounds = segment_bounds(count, segment_offsets);
    info!("Segmented sort of {count} keys of type {} in {} segments", K::TYPE, bounds.len());

    // engine-owned ping-pong storage, cut along the same boundaries
    let mut keys_tmp = keys.to_vec();
    let mut values_tmp = values.to_vec();
    let segments = split_segments(keys, values, &mut keys_tmp, &mut values_tmp, &bounds);

    device.launch(move || {
        segments.into_par_iter().for_each(|segment| {
            let parallel = segment.keys.len() >= PARALLEL_THRESHOLD;
            merge_sort(segment.keys, segment.values, segment.keys_tmp, segment.values_tmp, parallel);
        });
    });
    debug!("Segmented sort done");
    Ok(())
}

struct Segment<'a, K, V> {
    keys: &'a mut [K],
    values: &'a mut [V],
    keys_tmp: &'a mut [K],
    values_tmp: &'a mut [V],
}

/// Cuts all four arrays into disjoint per-segment views. Segments with fewer
/// than two elements are dropped since they are already sorted.
fn split_segments<'a, K, V>(
    mut keys: &'a mut [K],
    mut values: &'a mut [V],
    mut keys_tmp: &'a mut [K],
    mut values_tmp: &'a mut [V],
    bounds: &[(usize, usize)],
) -> Vec<Segment<'a, K, V>> {
    let mut segments = Vec::with_capacity(bounds.len());
    for &(lo, hi) in bounds {
        let len = hi - lo;
        let (k, k_rest) = keys.split_at_mut(len);
        let (v, v_rest) = values.split_at_mut(len);
        let (kt, kt_rest) = keys_tmp.split_at_mut(len);
        let (vt, vt_rest) = values_tmp.split_at_mut(len);
        keys = k_rest;
        values = v_rest;
        keys_tmp = kt_rest;
        values_tmp = vt_rest;
        if len > 1 {
            segments.push(Segment {
                keys: k,
                values: v,
                keys_tmp: kt,
                values_tmp: vt,
            });
        }
    }
    segments
}
