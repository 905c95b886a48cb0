//! Type-directed encoders and decoders.
//!
//! [`NvEncode`] and [`NvDecode`] map a Rust type onto the typed accessors:
//! `encode` adds one entry under a key, `decode` reads it back. The
//! registry is the set of trait impls, resolved at compile time.
//!
//! Sequences are registered per element type through [`NvArrayElement`]
//! and [`NvArrayDecode`], so any registered container of any registered
//! element encodes as the matching array entry. `Vec`, `VecDeque`,
//! `LinkedList` and `Box<[T]>` are registered here; further containers can
//! be registered with [`impl_nv_sequence!`](crate::impl_nv_sequence).

use std::collections::{LinkedList, VecDeque};

use crate::error::NvResult;
use crate::handle::{ConstNvList, NvList};

/// Encode a value as one entry of a list.
pub trait NvEncode {
    fn encode(&self, nvl: &mut NvList, key: &str) -> NvResult<()>;
}

/// Decode a value from one entry of a list. `'a` is the lifetime of the
/// viewed store, which lets borrowed types such as `&'a str` decode
/// without copying.
pub trait NvDecode<'a>: Sized {
    fn decode(nvl: ConstNvList<'a>, key: &str) -> NvResult<Self>;
}

/// Decoders that do not borrow from the store.
pub trait NvDecodeOwned: for<'a> NvDecode<'a> {}

impl<T> NvDecodeOwned for T where T: for<'a> NvDecode<'a> {}

/// Element types that can be stored as an array entry.
pub trait NvArrayElement {
    fn encode_seq<'i, I>(nvl: &mut NvList, key: &str, items: I) -> NvResult<()>
    where
        I: IntoIterator<Item = &'i Self>,
        Self: 'i;
}

/// Element types that can be read back from an array entry into any
/// collection.
pub trait NvArrayDecode<'a>: Sized {
    fn decode_seq<C: FromIterator<Self>>(nvl: ConstNvList<'a>, key: &str) -> NvResult<C>;
}

/// Encode `value` under `key`.
pub fn encode<T: NvEncode + ?Sized>(nvl: &mut NvList, key: &str, value: &T) -> NvResult<()> {
    value.encode(nvl, key)
}

/// Decode the entry under `key` as a `T`.
pub fn decode<'a, T: NvDecode<'a>>(nvl: ConstNvList<'a>, key: &str) -> NvResult<T> {
    T::decode(nvl, key)
}

// ----------------------------------------------------------------------------
// Scalars
// ----------------------------------------------------------------------------

impl<T: NvEncode + ?Sized> NvEncode for &T {
    fn encode(&self, nvl: &mut NvList, key: &str) -> NvResult<()> {
        (**self).encode(nvl, key)
    }
}

impl NvEncode for bool {
    fn encode(&self, nvl: &mut NvList, key: &str) -> NvResult<()> {
        nvl.add_bool(key, *self)
    }
}

impl<'a> NvDecode<'a> for bool {
    fn decode(nvl: ConstNvList<'a>, key: &str) -> NvResult<Self> {
        nvl.get_bool(key)
    }
}

impl NvEncode for u64 {
    fn encode(&self, nvl: &mut NvList, key: &str) -> NvResult<()> {
        nvl.add_number(key, *self)
    }
}

impl<'a> NvDecode<'a> for u64 {
    fn decode(nvl: ConstNvList<'a>, key: &str) -> NvResult<Self> {
        nvl.get_number(key)
    }
}

impl NvEncode for str {
    fn encode(&self, nvl: &mut NvList, key: &str) -> NvResult<()> {
        nvl.add_string(key, self)
    }
}

impl NvEncode for String {
    fn encode(&self, nvl: &mut NvList, key: &str) -> NvResult<()> {
        nvl.add_string(key, self)
    }
}

impl<'a> NvDecode<'a> for String {
    fn decode(nvl: ConstNvList<'a>, key: &str) -> NvResult<Self> {
        nvl.get_string(key).map(str::to_owned)
    }
}

impl<'a> NvDecode<'a> for &'a str {
    fn decode(nvl: ConstNvList<'a>, key: &str) -> NvResult<Self> {
        nvl.get_string(key)
    }
}

impl NvEncode for NvList {
    fn encode(&self, nvl: &mut NvList, key: &str) -> NvResult<()> {
        nvl.add_nvlist(key, self.as_const())
    }
}

impl<'a> NvDecode<'a> for NvList {
    fn decode(nvl: ConstNvList<'a>, key: &str) -> NvResult<Self> {
        NvList::try_from(nvl.get_nvlist(key)?)
    }
}

impl NvEncode for ConstNvList<'_> {
    fn encode(&self, nvl: &mut NvList, key: &str) -> NvResult<()> {
        nvl.add_nvlist(key, *self)
    }
}

impl<'a> NvDecode<'a> for ConstNvList<'a> {
    fn decode(nvl: ConstNvList<'a>, key: &str) -> NvResult<Self> {
        nvl.get_nvlist(key)
    }
}

// ----------------------------------------------------------------------------
// Optional values: absent <-> no entry
// ----------------------------------------------------------------------------

impl<T: NvEncode> NvEncode for Option<T> {
    fn encode(&self, nvl: &mut NvList, key: &str) -> NvResult<()> {
        match self {
            Some(value) => value.encode(nvl, key),
            None => Ok(()),
        }
    }
}

impl<'a, T: NvDecode<'a>> NvDecode<'a> for Option<T> {
    fn decode(nvl: ConstNvList<'a>, key: &str) -> NvResult<Self> {
        if nvl.exists(key)? {
            T::decode(nvl, key).map(Some)
        } else {
            Ok(None)
        }
    }
}

// ----------------------------------------------------------------------------
// Array elements
// ----------------------------------------------------------------------------

impl NvArrayElement for bool {
    fn encode_seq<'i, I>(nvl: &mut NvList, key: &str, items: I) -> NvResult<()>
    where
        I: IntoIterator<Item = &'i Self>,
    {
        nvl.add_bool_range(key, items.into_iter().copied())
    }
}

impl<'a> NvArrayDecode<'a> for bool {
    fn decode_seq<C: FromIterator<Self>>(nvl: ConstNvList<'a>, key: &str) -> NvResult<C> {
        Ok(nvl.get_bool_array(key)?.iter().copied().collect())
    }
}

impl NvArrayElement for u64 {
    fn encode_seq<'i, I>(nvl: &mut NvList, key: &str, items: I) -> NvResult<()>
    where
        I: IntoIterator<Item = &'i Self>,
    {
        nvl.add_number_range(key, items.into_iter().copied())
    }
}

impl<'a> NvArrayDecode<'a> for u64 {
    fn decode_seq<C: FromIterator<Self>>(nvl: ConstNvList<'a>, key: &str) -> NvResult<C> {
        Ok(nvl.get_number_array(key)?.iter().copied().collect())
    }
}

impl NvArrayElement for String {
    fn encode_seq<'i, I>(nvl: &mut NvList, key: &str, items: I) -> NvResult<()>
    where
        I: IntoIterator<Item = &'i Self>,
    {
        nvl.add_string_range(key, items)
    }
}

impl<'a> NvArrayDecode<'a> for String {
    fn decode_seq<C: FromIterator<Self>>(nvl: ConstNvList<'a>, key: &str) -> NvResult<C> {
        Ok(nvl
            .get_string_array(key)?
            .into_iter()
            .map(str::to_owned)
            .collect())
    }
}

impl NvArrayElement for &str {
    fn encode_seq<'i, I>(nvl: &mut NvList, key: &str, items: I) -> NvResult<()>
    where
        I: IntoIterator<Item = &'i Self>,
        Self: 'i,
    {
        nvl.add_string_range(key, items)
    }
}

impl<'a> NvArrayDecode<'a> for &'a str {
    fn decode_seq<C: FromIterator<Self>>(nvl: ConstNvList<'a>, key: &str) -> NvResult<C> {
        Ok(nvl.get_string_array(key)?.into_iter().collect())
    }
}

impl NvArrayElement for NvList {
    fn encode_seq<'i, I>(nvl: &mut NvList, key: &str, items: I) -> NvResult<()>
    where
        I: IntoIterator<Item = &'i Self>,
    {
        nvl.add_nvlist_range(key, items)
    }
}

impl<'a> NvArrayDecode<'a> for NvList {
    fn decode_seq<C: FromIterator<Self>>(nvl: ConstNvList<'a>, key: &str) -> NvResult<C> {
        nvl.get_nvlist_array(key)?
            .into_iter()
            .map(NvList::try_from)
            .collect()
    }
}

impl NvArrayElement for ConstNvList<'_> {
    fn encode_seq<'i, I>(nvl: &mut NvList, key: &str, items: I) -> NvResult<()>
    where
        I: IntoIterator<Item = &'i Self>,
        Self: 'i,
    {
        nvl.add_nvlist_range(key, items)
    }
}

impl<'a> NvArrayDecode<'a> for ConstNvList<'a> {
    fn decode_seq<C: FromIterator<Self>>(nvl: ConstNvList<'a>, key: &str) -> NvResult<C> {
        Ok(nvl.get_nvlist_array(key)?.into_iter().collect())
    }
}

// ----------------------------------------------------------------------------
// Containers
// ----------------------------------------------------------------------------

/// Register container types as array encodings of their element type.
///
/// Each container must be generic over its element, iterate by reference
/// with `.iter()` and implement `FromIterator`. Coherence rules mean the
/// container has to be defined in the invoking crate:
///
/// ```
/// use nvl::NvList;
///
/// struct Stack<T>(Vec<T>);
///
/// impl<T> Stack<T> {
///     fn iter(&self) -> std::slice::Iter<'_, T> {
///         self.0.iter()
///     }
/// }
///
/// impl<T> FromIterator<T> for Stack<T> {
///     fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
///         Stack(iter.into_iter().collect())
///     }
/// }
///
/// nvl::impl_nv_sequence!(Stack);
///
/// let mut nvl = NvList::new();
/// nvl::encode(&mut nvl, "stack", &Stack(vec![1u64, 2])).unwrap();
/// let back: Stack<u64> = nvl::decode(nvl.as_const(), "stack").unwrap();
/// assert_eq!(back.0, [1, 2]);
/// ```
#[macro_export]
macro_rules! impl_nv_sequence {
    ($($container:ident),+ $(,)?) => {$(
        impl<T: $crate::NvArrayElement> $crate::NvEncode for $container<T> {
            fn encode(&self, nvl: &mut $crate::NvList, key: &str) -> $crate::NvResult<()> {
                T::encode_seq(nvl, key, self.iter())
            }
        }

        impl<'a, T: $crate::NvArrayDecode<'a>> $crate::NvDecode<'a> for $container<T> {
            fn decode(nvl: $crate::ConstNvList<'a>, key: &str) -> $crate::NvResult<Self> {
                T::decode_seq(nvl, key)
            }
        }
    )+};
}

impl_nv_sequence!(Vec, VecDeque, LinkedList);

impl<T: NvArrayElement> NvEncode for [T] {
    fn encode(&self, nvl: &mut NvList, key: &str) -> NvResult<()> {
        T::encode_seq(nvl, key, self)
    }
}

impl<T: NvArrayElement> NvEncode for Box<[T]> {
    fn encode(&self, nvl: &mut NvList, key: &str) -> NvResult<()> {
        T::encode_seq(nvl, key, self.iter())
    }
}

impl<'a, T: NvArrayDecode<'a>> NvDecode<'a> for Box<[T]> {
    fn decode(nvl: ConstNvList<'a>, key: &str) -> NvResult<Self> {
        T::decode_seq(nvl, key)
    }
}
