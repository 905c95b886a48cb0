//! Typed, ownership-aware access to name/value lists.
//!
//! [`NvList`] owns a [`Store`] and carries every mutator; [`ConstNvList`]
//! is a cheap borrowed view with the read accessors. Both implement
//! [`NvRead`], so reads work the same on either. On top of the accessors
//! sit a heterogeneous [`Iter`], the [`NvEncode`]/[`NvDecode`] registry and
//! the declarative [`schema`] engine.

pub mod codec;
pub mod error;
pub mod handle;
pub mod iter;
pub mod read;
pub mod schema;
mod write;

pub use codec::{decode, encode, NvArrayDecode, NvArrayElement, NvDecode, NvDecodeOwned, NvEncode};
pub use error::{NvError, NvResult};
pub use handle::{ConstNvList, NvList, Ownership};
pub use iter::{Iter, NvValue};
pub use read::NvRead;
pub use schema::{deserialize, deserialize_with, serialize, serialize_with, NvSchema, Serializer};

// Re-export the store types that appear in the public API
pub use nvl_store::{Errno, NvFlags, NvType, Store, StoreError, UnpackLimits};

/// Glob-import for the common case.
pub mod prelude {
    pub use crate::codec::{NvDecode, NvEncode};
    pub use crate::handle::{ConstNvList, NvList};
    pub use crate::iter::NvValue;
    pub use crate::read::NvRead;
    pub use crate::schema::{NvSchema, Serializer};
    pub use crate::{NvError, NvFlags, NvResult, NvType};
}

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use super::*;

    #[test]
    fn pack_unpack_scenario() {
        let mut nvl = NvList::new();
        nvl.add_number("n", 42).unwrap();
        nvl.add_string("s", "x").unwrap();

        let bytes = nvl.pack().unwrap();
        let back = NvList::unpack(&bytes, NvFlags::NONE).unwrap();
        assert_eq!(back.get_number("n").unwrap(), 42);
        assert_eq!(back.get_string("s").unwrap(), "x");
        assert_eq!(back.iter().unwrap().count(), 2);
    }

    #[test]
    fn sticky_error_scenario() {
        let mut nvl = NvList::new();
        nvl.set_error(Errno::EINVAL).unwrap();

        let results = [
            nvl.add_null("a"),
            nvl.add_bool("b", true),
            nvl.add_number("c", 1),
            nvl.add_string("d", "x"),
            nvl.add_binary("e", b"x"),
            nvl.add_number_array("f", &[1]),
            nvl.add_string_array("g", &["x"]),
        ];
        for result in results {
            assert!(matches!(result, Err(NvError::ErrorState { code }) if code == Errno::EINVAL));
        }
        assert_eq!(nvl.error().unwrap(), Some(Errno::EINVAL));
    }

    #[test]
    fn view_and_owner_share_accessors() {
        fn count_numbers<R: NvRead>(nvl: &R) -> usize {
            nvl.iter()
                .map(|it| it.filter(|(_, v)| v.nv_type() == NvType::Number).count())
                .unwrap_or(0)
        }

        let mut nvl = NvList::new();
        nvl.add_number("a", 1).unwrap();
        nvl.add_string("b", "x").unwrap();
        assert_eq!(count_numbers(&nvl), 1);
        assert_eq!(count_numbers(&nvl.as_const()), 1);
    }

    #[test]
    fn registry_and_accessors_agree() {
        let mut nvl = NvList::new();
        encode(&mut nvl, "list", &vec![3u64, 4]).unwrap();
        assert_eq!(nvl.get_number_array("list").unwrap(), &[3, 4]);
        let back: Vec<u64> = decode(nvl.as_const(), "list").unwrap();
        assert_eq!(back, [3, 4]);
    }
}
