//! Key types accepted by the engines and their order-preserving bit images.
//!
//! Every key is mapped to an unsigned integer (held in a `u64`) such that the
//! unsigned order of the images equals the natural order of the keys. Signed
//! integers get their sign bit flipped; floats get the sign bit flipped when
//! positive and all bits flipped when negative, which yields
//! `-NaN < -inf < ... < -0.0 < +0.0 < ... < +inf < +NaN`.

use std::cmp::Ordering;
use std::fmt::{self, Debug, Display};

/// A fixed-width numeric key the radix and segmented engines can sort.
pub trait RadixKey: Copy + Send + Sync + Debug + 'static {
    /// Width of the key in bits.
    const BITS: u32;
    const TYPE: KeyType;

    /// Order-preserving unsigned image of the key, in the low `BITS` bits.
    fn to_radix(self) -> u64;

    #[inline]
    fn radix_cmp(&self, other: &Self) -> Ordering {
        self.to_radix().cmp(&other.to_radix())
    }
}

macro_rules! impl_unsigned {
    ($($t:ty => $tag:ident),*) => {$(
        impl RadixKey for $t {
            const BITS: u32 = <$t>::BITS;
            const TYPE: KeyType = KeyType::$tag;

            #[inline]
            fn to_radix(self) -> u64 {
                self as u64
            }
        }
    )*};
}

macro_rules! impl_signed {
    ($($t:ty, $u:ty => $tag:ident),*) => {$(
        impl RadixKey for $t {
            const BITS: u32 = <$t>::BITS;
            const TYPE: KeyType = KeyType::$tag;

            #[inline]
            fn to_radix(self) -> u64 {
                ((self as $u) ^ (1 << (<$t>::BITS - 1))) as u64
            }
        }
    )*};
}

macro_rules! impl_float {
    ($($t:ty, $u:ty => $tag:ident),*) => {$(
        impl RadixKey for $t {
            const BITS: u32 = <$u>::BITS;
            const TYPE: KeyType = KeyType::$tag;

            #[inline]
            fn to_radix(self) -> u64 {
                let bits = self.to_bits();
                let sign: $u = 1 << (<$u>::BITS - 1);
                if bits & sign != 0 {
                    (!bits) as u64
                } else {
                    (bits | sign) as u64
                }
            }
        }
    )*};
}

impl_unsigned!(u8 => U8, u16 => U16, u32 => U32, u64 => U64);
impl_signed!(i8, u8 => I8, i16, u16 => I16, i32, u32 => I32, i64, u64 => I64);
impl_float!(f32, u32 => F32, f64, u64 => F64);

/// Closed set of key types, one per exported entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
}

impl KeyType {
    pub const ALL: [KeyType; 10] = [
        KeyType::I8,
        KeyType::U8,
        KeyType::I16,
        KeyType::U16,
        KeyType::I32,
        KeyType::U32,
        KeyType::I64,
        KeyType::U64,
        KeyType::F32,
        KeyType::F64,
    ];

    /// Types with a foreign entry point.
    pub const EXPORTED: [KeyType; 6] = [
        KeyType::F32,
        KeyType::F64,
        KeyType::I32,
        KeyType::U32,
        KeyType::I64,
        KeyType::U64,
    ];

    pub const fn of<K: RadixKey>() -> KeyType {
        K::TYPE
    }

    pub const fn bits(self) -> u32 {
        match self {
            KeyType::I8 | KeyType::U8 => 8,
            KeyType::I16 | KeyType::U16 => 16,
            KeyType::I32 | KeyType::U32 | KeyType::F32 => 32,
            KeyType::I64 | KeyType::U64 | KeyType::F64 => 64,
        }
    }

    pub const fn size_of(self) -> usize {
        (self.bits() / 8) as usize
    }

    /// Type name used by the radix sort entry points (`radixsort_<name>`).
    pub const fn radix_name(self) -> &'static str {
        match self {
            KeyType::F32 => "float",
            KeyType::F64 => "double",
            _ => self.segsort_name(),
        }
    }

    /// Type name used by the segmented sort entry points (`segsortpairs_<name>`).
    pub const fn segsort_name(self) -> &'static str {
        match self {
            KeyType::I8 => "int8",
            KeyType::U8 => "uint8",
            KeyType::I16 => "int16",
            KeyType::U16 => "uint16",
            KeyType::I32 => "int32",
            KeyType::U32 => "uint32",
            KeyType::I64 => "int64",
            KeyType::U64 => "uint64",
            KeyType::F32 => "float32",
            KeyType::F64 => "float64",
        }
    }

    pub fn radix_symbol(self) -> String {
        format!("radixsort_{}", self.radix_name())
    }

    pub fn segsort_symbol(self) -> String {
        format!("segsortpairs_{}", self.segsort_name())
    }
}

impl Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.segsort_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_order_preserved<K: RadixKey + PartialOrd>(sorted: &[K]) {
        for pair in sorted.windows(2) {
            assert!(pair[0] < pair[1], "{:?} < {:?}", pair[0], pair[1]);
            assert!(
                pair[0].to_radix() < pair[1].to_radix(),
                "image of {:?} not below image of {:?}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn signed_integers_keep_order() {
        assert_order_preserved(&[i8::MIN, -1, 0, 1, i8::MAX]);
        assert_order_preserved(&[i32::MIN, -70000, -1, 0, 1, 70000, i32::MAX]);
        assert_order_preserved(&[i64::MIN, -1, 0, 1, i64::MAX]);
    }

    #[test]
    fn unsigned_integers_keep_order() {
        assert_order_preserved(&[0u16, 1, 255, 256, u16::MAX]);
        assert_order_preserved(&[0u64, 1, 1 << 40, u64::MAX]);
    }

    #[test]
    fn floats_keep_order() {
        assert_order_preserved(&[f32::NEG_INFINITY, -1.5, -1e-30, 0.0, 1e-30, 2.5, f32::INFINITY]);
        assert_order_preserved(&[f64::NEG_INFINITY, -3.0, -0.5, 0.0, 0.5, f64::MAX, f64::INFINITY]);
    }

    #[test]
    fn negative_zero_sorts_before_positive_zero() {
        assert!((-0.0f64).to_radix() < 0.0f64.to_radix());
        assert!(f32::NAN.to_radix() > f32::INFINITY.to_radix());
    }

    #[test]
    fn images_fit_key_width() {
        assert!((-1i8).to_radix() <= u8::MAX as u64);
        assert!(f32::MIN.to_radix() <= u32::MAX as u64);
    }

    #[test]
    fn entry_point_names() {
        assert_eq!(KeyType::F64.radix_symbol(), "radixsort_double");
        assert_eq!(KeyType::F32.radix_symbol(), "radixsort_float");
        assert_eq!(KeyType::U32.radix_symbol(), "radixsort_uint32");
        assert_eq!(KeyType::F64.segsort_symbol(), "segsortpairs_float64");
        assert_eq!(KeyType::of::<i64>(), KeyType::I64);
        assert_eq!(KeyType::of::<f32>().size_of(), 4);
    }

    #[test]
    fn every_type_has_a_distinct_name() {
        let mut names: Vec<&str> = KeyType::ALL.iter().map(|t| t.segsort_name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), KeyType::ALL.len());
        for key_type in KeyType::EXPORTED {
            assert!(KeyType::ALL.contains(&key_type));
        }
        for key_type in KeyType::ALL {
            assert_eq!(key_type.size_of() * 8, key_type.bits() as usize);
        }
    }
}
