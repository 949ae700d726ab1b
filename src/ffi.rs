//! C entry points, one per (algorithm, key type) pair.
//!
//! Pointers name caller-owned memory that must stay valid until the stream
//! the call was issued on has been synchronized. A null stream handle selects
//! the default stream, on which every call completes before returning.
//! Contract violations are logged and leave the data untouched.

use std::ffi::{c_int, c_uint, c_void};
use std::ptr::{self, NonNull};
use std::slice;

use log::error;

use crate::conversion::{KeyType, RadixKey};
use crate::device::Device;
use crate::error::{Result, SortError};
use crate::scratch::{scratch_size, ScratchBuffer};
use crate::segmented_sort::{segmented_sort_pairs_slice, validate_segments};
use crate::sort::Parity;
use crate::sorter::{RadixSorter, Task};
use crate::stream::Stream;

/// Caller memory carried into a queued job.
struct RawSlice<T> {
    ptr: *mut T,
    len: usize,
}

unsafe impl<T: Send> Send for RawSlice<T> {}

impl<T> RawSlice<T> {
    fn new(ptr: *mut T, len: usize) -> RawSlice<T> {
        RawSlice { ptr, len }
    }

    /// # Safety
    /// `ptr` must be valid for `len` elements and not aliased for `'a`.
    unsafe fn as_mut_slice<'a>(&self) -> &'a mut [T] {
        if self.len == 0 {
            return slice::from_raw_parts_mut(NonNull::dangling().as_ptr(), 0);
        }
        slice::from_raw_parts_mut(self.ptr, self.len)
    }
}

struct RadixJob<K, V> {
    scratch: ScratchBuffer,
    keys: RawSlice<K>,
    keys_alt: RawSlice<K>,
    values: Option<(RawSlice<V>, RawSlice<V>)>,
    descending: bool,
    begin_bit: u32,
    end_bit: u32,
}

impl<K: RadixKey, V: Copy + Send + Sync> RadixJob<K, V> {
    /// Sorts and leaves the result in the primary buffers.
    unsafe fn run(self) -> Result<()> {
        let device = Device::global()?;
        let count = self.keys.len;
        let keys = self.keys.as_mut_slice();
        let keys_alt = self.keys_alt.as_mut_slice();
        let values = self
            .values
            .as_ref()
            .map(|(v, v_alt)| (v.as_mut_slice(), v_alt.as_mut_slice()));

        let mut scratch_guard = self.scratch.histograms.lock();
        let histograms: &mut [usize] = &mut scratch_guard;
        let mut sorter = RadixSorter::for_count(histograms, count);

        let task = Task {
            keys,
            keys_alt,
            values,
            begin_bit: self.begin_bit,
            end_bit: self.end_bit,
            descending: self.descending,
        };
        let parity = device.launch(move || sorter.sort(task));

        if parity == Parity::Alternate {
            ptr::copy_nonoverlapping(self.keys_alt.ptr, self.keys.ptr, count);
            if let Some((v, v_alt)) = &self.values {
                ptr::copy_nonoverlapping(v_alt.ptr, v.ptr, count);
            }
        }
        Ok(())
    }
}

/// # Safety
/// `stream` must be null or a live handle from `devicesort_stream_create`.
unsafe fn stream_or_default<'a>(stream: *mut c_void, default: &'a Stream) -> &'a Stream {
    match (stream as *const Stream).as_ref() {
        Some(stream) => stream,
        None => default,
    }
}

#[allow(clippy::too_many_arguments)]
unsafe fn radixsort<K: RadixKey>(
    temp: *mut c_void,
    count: c_uint,
    d_key: *mut K,
    d_key_alt: *mut K,
    d_vals: *mut c_uint,
    d_vals_alt: *mut c_uint,
    stream: *mut c_void,
    descending: c_int,
    begin_bit: c_uint,
    end_bit: c_uint,
) -> *mut c_void {
    let count = count as usize;
    if temp.is_null() {
        let scratch = Box::new(ScratchBuffer::for_keys::<K>(count));
        return Box::into_raw(scratch).cast();
    }
    let scratch = &*(temp as *const ScratchBuffer);

    let checked = (|| {
        if count == 0 || begin_bit >= end_bit {
            return Ok(false);
        }
        if end_bit > K::BITS {
            return Err(SortError::InvalidBitRange {
                begin_bit,
                end_bit,
                key_bits: K::BITS,
            });
        }
        if d_key.is_null() || d_key_alt.is_null() || d_vals.is_null() != d_vals_alt.is_null() {
            return Err(SortError::LengthMismatch {
                buffer: "null device pointer",
                expected: count,
                actual: 0,
            });
        }
        let required = scratch_size::<K>(count);
        if scratch.bytes() < required {
            return Err(SortError::ScratchTooSmall {
                required,
                provided: scratch.bytes(),
            });
        }
        Ok(true)
    })();
    match checked {
        Ok(true) => {}
        Ok(false) => return temp,
        Err(e) => {
            error!("{}: {e}", K::TYPE.radix_symbol());
            return temp;
        }
    }

    let job = RadixJob::<K, c_uint> {
        scratch: scratch.clone(),
        keys: RawSlice::new(d_key, count),
        keys_alt: RawSlice::new(d_key_alt, count),
        values: (!d_vals.is_null()).then(|| (RawSlice::new(d_vals, count), RawSlice::new(d_vals_alt, count))),
        descending: descending != 0,
        begin_bit,
        end_bit,
    };
    let default = Stream::default();
    let stream = stream_or_default(stream, &default);
    if let Err(e) = stream.enqueue(Box::new(move || unsafe { job.run() })) {
        error!("{}: {e}", K::TYPE.radix_symbol());
    }
    temp
}

unsafe fn segsortpairs<K: RadixKey>(
    d_key: *mut K,
    d_vals: *mut c_uint,
    n: c_uint,
    segments: *const c_uint,
    nseg: c_uint,
    stream: *mut c_void,
) {
    let count = n as usize;
    let offsets: Vec<usize> = if segments.is_null() || nseg == 0 {
        Vec::new()
    } else {
        slice::from_raw_parts(segments, nseg as usize)
            .iter()
            .map(|&offset| offset as usize)
            .collect()
    };
    let checked = if count > 0 && (d_key.is_null() || d_vals.is_null()) {
        Err(SortError::LengthMismatch {
            buffer: "null device pointer",
            expected: count,
            actual: 0,
        })
    } else {
        validate_segments(count, &offsets)
    };
    if let Err(e) = checked {
        error!("{}: {e}", K::TYPE.segsort_symbol());
        return;
    }

    let keys = RawSlice::new(d_key, count);
    let values = RawSlice::new(d_vals, count);
    let default = Stream::default();
    let stream = stream_or_default(stream, &default);
    let job = Box::new(move || unsafe {
        segmented_sort_pairs_slice(keys.as_mut_slice(), values.as_mut_slice(), &offsets)
    });
    if let Err(e) = stream.enqueue(job) {
        error!("{}: {e}", K::TYPE.segsort_symbol());
    }
}

macro_rules! radixsort_entry_points {
    ($($name:ident => $t:ty),*) => {
        /// Exported radix sort symbols and the key type each one sorts.
        pub const RADIX_ENTRY_POINTS: &[(&str, KeyType)] = &[$((stringify!($name), <$t as RadixKey>::TYPE)),*];

        $(
            /// Null `temp`: returns a new scratch handle sized for `count`.
            /// Otherwise sorts `d_key` (and `d_vals` when non-null) using the
            /// alternates as ping-pong space and returns `temp`.
            ///
            /// # Safety
            /// All non-null pointers must be valid for `count` elements until
            /// the stream is synchronized; `temp` must come from this function.
            #[no_mangle]
            #[allow(clippy::too_many_arguments)]
            pub unsafe extern "C" fn $name(
                temp: *mut c_void,
                count: c_uint,
                d_key: *mut $t,
                d_key_alt: *mut $t,
                d_vals: *mut c_uint,
                d_vals_alt: *mut c_uint,
                stream: *mut c_void,
                descending: c_int,
                begin_bit: c_uint,
                end_bit: c_uint,
            ) -> *mut c_void {
                radixsort::<$t>(temp, count, d_key, d_key_alt, d_vals, d_vals_alt, stream, descending, begin_bit, end_bit)
            }
        )*
    };
}

macro_rules! segsort_entry_points {
    ($($name:ident => $t:ty),*) => {
        /// Exported segmented sort symbols and the key type each one sorts.
        pub const SEGSORT_ENTRY_POINTS: &[(&str, KeyType)] = &[$((stringify!($name), <$t as RadixKey>::TYPE)),*];

        $(
            /// Sorts each segment of `d_key` (with `d_vals`) delimited by the
            /// `nseg` interior offsets in `segments`.
            ///
            /// # Safety
            /// `d_key`/`d_vals` must be valid for `n` elements until the stream
            /// is synchronized; `segments` must be valid for `nseg` elements.
            #[no_mangle]
            pub unsafe extern "C" fn $name(
                d_key: *mut $t,
                d_vals: *mut c_uint,
                n: c_uint,
                segments: *const c_uint,
                nseg: c_uint,
                stream: *mut c_void,
            ) {
                segsortpairs::<$t>(d_key, d_vals, n, segments, nseg, stream)
            }
        )*
    };
}

radixsort_entry_points!(
    radixsort_float => f32,
    radixsort_double => f64,
    radixsort_int32 => i32,
    radixsort_uint32 => u32,
    radixsort_int64 => i64,
    radixsort_uint64 => u64
);

segsort_entry_points!(
    segsortpairs_float32 => f32,
    segsortpairs_float64 => f64,
    segsortpairs_int32 => i32,
    segsortpairs_uint32 => u32,
    segsortpairs_int64 => i64,
    segsortpairs_uint64 => u64
);

/// Releases a scratch handle returned by a `radixsort_*` sizing call.
///
/// # Safety
/// `temp` must be null or a handle not yet released.
#[no_mangle]
pub unsafe extern "C" fn radixsort_cleanup(temp: *mut c_void) {
    if !temp.is_null() {
        drop(Box::from_raw(temp as *mut ScratchBuffer));
    }
}

/// Creates a stream with its own queue; null if no worker could be started.
#[no_mangle]
pub extern "C" fn devicesort_stream_create() -> *mut c_void {
    match Stream::new() {
        Ok(stream) => Box::into_raw(Box::new(stream)).cast(),
        Err(e) => {
            error!("devicesort_stream_create: {e}");
            ptr::null_mut()
        }
    }
}

/// Waits for all work queued on `stream`. Returns 0 on success.
///
/// # Safety
/// `stream` must be null or a live handle from `devicesort_stream_create`.
#[no_mangle]
pub unsafe extern "C" fn devicesort_stream_synchronize(stream: *mut c_void) -> c_int {
    let default = Stream::default();
    match stream_or_default(stream, &default).synchronize() {
        Ok(()) => 0,
        Err(e) => {
            error!("devicesort_stream_synchronize: {e}");
            -1
        }
    }
}

/// Drains and destroys a stream.
///
/// # Safety
/// `stream` must be null or a live handle from `devicesort_stream_create`.
#[no_mangle]
pub unsafe extern "C" fn devicesort_stream_destroy(stream: *mut c_void) {
    if !stream.is_null() {
        drop(Box::from_raw(stream as *mut Stream));
    }
}
