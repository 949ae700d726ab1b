//! Radix sort engine.
//!
//! The two-phase entry point [`radix_sort`] mirrors the classic device API:
//! a sizing call without scratch, then the sort proper over a ping-pong pair,
//! with the caller told which buffer of the pair holds the result. The
//! single-call forms ([`sort_keys`], [`sort_pairs`] and their slice variants)
//! manage scratch and the alternate buffers themselves.

use std::mem::size_of;

use log::{debug, info};

use crate::conversion::RadixKey;
use crate::device::{lock_pair, Device, DeviceBuffer};
use crate::error::{Result, SortError};
use crate::scratch::{scratch_size, ScratchBuffer};
use crate::sorter::{parity_of, RadixSorter, Task};
use crate::stream::Stream;

/// Payload that can travel with a key.
pub trait Payload: Copy + Send + Sync + 'static {}

impl<T: Copy + Send + Sync + 'static> Payload for T {}

/// Which buffer of a ping-pong pair holds the sorted output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    Primary,
    Alternate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadixOutcome {
    /// Bytes of scratch the sort call needs.
    ScratchSize(usize),
    Sorted(Parity),
}

/// Buffers a radix job locks.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Slot {
    Scratch,
    Keys,
    KeysAlt,
    Values,
    ValuesAlt,
}

/// A buffer and the alternate it ping-pongs with.
#[derive(Debug)]
pub struct DoubleBuffer<'a, T> {
    pub current: &'a DeviceBuffer<T>,
    pub alternate: &'a DeviceBuffer<T>,
}

impl<'a, T> DoubleBuffer<'a, T> {
    pub fn new(current: &'a DeviceBuffer<T>, alternate: &'a DeviceBuffer<T>) -> DoubleBuffer<'a, T> {
        DoubleBuffer { current, alternate }
    }

    /// The buffer named by `parity`.
    pub fn select(&self, parity: Parity) -> &'a DeviceBuffer<T> {
        match parity {
            Parity::Primary => self.current,
            Parity::Alternate => self.alternate,
        }
    }
}

impl<T> Clone for DoubleBuffer<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for DoubleBuffer<'_, T> {}

/// Sorts the first `count` keys of `keys.current` over bits
/// `[begin_bit, end_bit)` of their order-preserving image.
///
/// Without `scratch` this only reports the scratch size. With `scratch` the
/// sort is enqueued on `stream` and the returned parity names the buffer that
/// will hold the result once the stream reaches this point.
#[allow(clippy::too_many_arguments)]
pub fn radix_sort<K: RadixKey, V: Payload>(
    scratch: Option<&ScratchBuffer>,
    count: usize,
    keys: DoubleBuffer<'_, K>,
    values: Option<DoubleBuffer<'_, V>>,
    stream: &Stream,
    descending: bool,
    begin_bit: u32,
    end_bit: u32,
) -> Result<RadixOutcome> {
    let scratch = match scratch {
        None => return Ok(RadixOutcome::ScratchSize(scratch_size::<K>(count))),
        Some(scratch) => scratch,
    };

    check_bit_range::<K>(begin_bit, end_bit)?;
    check_len("keys", keys.current, count)?;
    check_len("keys_alt", keys.alternate, count)?;
    let mut ids = vec![keys.current.id(), keys.alternate.id()];
    if let Some(values) = &values {
        check_len("values", values.current, count)?;
        check_len("values_alt", values.alternate, count)?;
        ids.push(values.current.id());
        ids.push(values.alternate.id());
    }
    ids.sort_unstable();
    if ids.windows(2).any(|w| w[0] == w[1]) {
        return Err(SortError::AliasedBuffers);
    }
    let required = scratch_size::<K>(count);
    if scratch.bytes() < required {
        return Err(SortError::ScratchTooSmall {
            required,
            provided: scratch.bytes(),
        });
    }

    let parity = parity_of(count, begin_bit, end_bit);
    if count == 0 || begin_bit >= end_bit {
        debug!("Nothing to sort (count {count}, bits [{begin_bit}, {end_bit}))");
        return Ok(RadixOutcome::Sorted(parity));
    }

    let scratch = scratch.clone();
    let keys_pair = (keys.current.clone(), keys.alternate.clone());
    let values_pair = values.map(|v| (v.current.clone(), v.alternate.clone()));

    stream.enqueue(Box::new(move || {
        let device = Device::global()?;

        let mut order = vec![
            (scratch.histograms.id(), Slot::Scratch),
            (keys_pair.0.id(), Slot::Keys),
            (keys_pair.1.id(), Slot::KeysAlt),
        ];
        if let Some((v, v_alt)) = &values_pair {
            order.push((v.id(), Slot::Values));
            order.push((v_alt.id(), Slot::ValuesAlt));
        }
        // ascending allocation order, shared by every job
        order.sort_unstable();

        let (mut scratch_guard, mut keys, mut keys_alt, mut values, mut values_alt) = (None, None, None, None, None);
        for (_, slot) in order {
            match slot {
                Slot::Scratch => scratch_guard = Some(scratch.histograms.lock()),
                Slot::Keys => keys = Some(keys_pair.0.lock()),
                Slot::KeysAlt => keys_alt = Some(keys_pair.1.lock()),
                Slot::Values => values = values_pair.as_ref().map(|(v, _)| v.lock()),
                Slot::ValuesAlt => values_alt = values_pair.as_ref().map(|(_, v_alt)| v_alt.lock()),
            }
        }
        let (Some(mut scratch_guard), Some(mut keys), Some(mut keys_alt)) = (scratch_guard, keys, keys_alt) else {
            return Err(SortError::Kernel("radix job left a buffer unlocked".to_string()));
        };
        let histograms: &mut [usize] = &mut scratch_guard;
        let mut values_guards = values.zip(values_alt);

        let task = Task {
            keys: &mut keys[..count],
            keys_alt: &mut keys_alt[..count],
            values: values_guards
                .as_mut()
                .map(|(v, v_alt)| (&mut v[..count], &mut v_alt[..count])),
            begin_bit,
            end_bit,
            descending,
        };
        let sorted = device.launch(move || RadixSorter::for_count(histograms, count).sort(task));
        debug_assert_eq!(sorted, parity);
        Ok(())
    }))?;

    Ok(RadixOutcome::Sorted(parity))
}

/// Two-phase sort of keys only.
#[allow(clippy::too_many_arguments)]
pub fn radix_sort_keys<K: RadixKey>(
    scratch: Option<&ScratchBuffer>,
    count: usize,
    keys: DoubleBuffer<'_, K>,
    stream: &Stream,
    descending: bool,
    begin_bit: u32,
    end_bit: u32,
) -> Result<RadixOutcome> {
    radix_sort::<K, ()>(scratch, count, keys, None, stream, descending, begin_bit, end_bit)
}

/// Sorts `keys` in place over the full key width.
pub fn sort_keys<K: RadixKey>(stream: &Stream, keys: &DeviceBuffer<K>, descending: bool) -> Result<()> {
    let keys = keys.clone();
    stream.enqueue(Box::new(move || {
        let mut keys = keys.lock();
        sort_keys_slice(&mut keys, descending)
    }))
}

/// Sorts `keys` in place, permuting `values` alongside.
pub fn sort_pairs<K: RadixKey, V: Payload>(
    stream: &Stream,
    keys: &DeviceBuffer<K>,
    values: &DeviceBuffer<V>,
    descending: bool,
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
    let keys = keys.clone();
    let values = values.clone();
    stream.enqueue(Box::new(move || {
        let (mut keys, mut values) = lock_pair(&keys, &values);
        sort_pairs_slice(&mut keys, &mut values, descending)
    }))
}

/// Synchronous in-place sort of host-visible keys.
pub fn sort_keys_slice<K: RadixKey>(keys: &mut [K], descending: bool) -> Result<()> {
    sort_slices::<K, ()>(keys, None, descending)
}

/// Synchronous in-place sort of host-visible key/value pairs.
pub fn sort_pairs_slice<K: RadixKey, V: Payload>(keys: &mut [K], values: &mut [V], descending: bool) -> Result<()> {
    if values.len() != keys.len() {
        return Err(SortError::LengthMismatch {
            buffer: "values",
            expected: keys.len(),
            actual: values.len(),
        });
    }
    sort_slices(keys, Some(values), descending)
}

fn sort_slices<K: RadixKey, V: Payload>(keys: &mut [K], mut values: Option<&mut [V]>, descending: bool) -> Result<()> {
    let count = keys.len();
    if count <= 1 {
        return Ok(());
    }
    let device = Device::global()?;
    let mut histograms = vec![0usize; scratch_size::<K>(count) / size_of::<usize>()];
    let mut keys_alt = keys.to_vec();
    let mut values_alt = values.as_deref().map(<[V]>::to_vec);
    info!("Sorting {count} keys of type {} on {} threads", K::TYPE, device.num_threads());

    let task = Task {
        keys: &mut *keys,
        keys_alt: &mut keys_alt[..],
        values: values.as_deref_mut().zip(values_alt.as_deref_mut()),
        begin_bit: 0,
        end_bit: K::BITS,
        descending,
    };
    let parity = device.launch(move || RadixSorter::for_count(&mut histograms, count).sort(task));

    if parity == Parity::Alternate {
        keys.copy_from_slice(&keys_alt);
        if let (Some(values), Some(values_alt)) = (values, values_alt) {
            values.copy_from_slice(&values_alt);
        }
    }
    Ok(())
}

fn check_bit_range<K: RadixKey>(begin_bit: u32, end_bit: u32) -> Result<()> {
    if end_bit > K::BITS && begin_bit < end_bit {
        return Err(SortError::InvalidBitRange {
            begin_bit,
            end_bit,
            key_bits: K::BITS,
        });
    }
    Ok(())
}

pub(crate) fn check_len<T: Copy + Send + 'static>(
    buffer: &'static str,
    device_buffer: &DeviceBuffer<T>,
    expected: usize,
) -> Result<()> {
    if device_buffer.len() < expected {
        return Err(SortError::LengthMismatch {
            buffer,
            expected,
            actual: device_buffer.len(),
        });
    }
    Ok(())
}
