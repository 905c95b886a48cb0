use std::fmt;
use std::io;
use std::os::fd::{AsFd, OwnedFd};

use serde::{Deserialize, Serialize};

use crate::store::Store;

/// Type tag of a list entry. The numeric codes are part of the packed
/// format and never change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum NvType {
    /// Wildcard: "any type" in lookups.
    None = 0,
    Null = 1,
    Bool = 2,
    Number = 3,
    String = 4,
    NvList = 5,
    Descriptor = 6,
    Binary = 7,
    BoolArray = 8,
    NumberArray = 9,
    StringArray = 10,
    NvListArray = 11,
    DescriptorArray = 12,
}

impl NvType {
    /// Every concrete (non-wildcard) type, in code order.
    pub const ALL: [NvType; 12] = [
        NvType::Null,
        NvType::Bool,
        NvType::Number,
        NvType::String,
        NvType::NvList,
        NvType::Descriptor,
        NvType::Binary,
        NvType::BoolArray,
        NvType::NumberArray,
        NvType::StringArray,
        NvType::NvListArray,
        NvType::DescriptorArray,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(NvType::None),
            1..=12 => Some(Self::ALL[usize::from(code) - 1]),
            _ => None,
        }
    }

    /// Label used by [`Store::dump`].
    pub fn name(self) -> &'static str {
        match self {
            NvType::None => "NONE",
            NvType::Null => "NULL",
            NvType::Bool => "BOOL",
            NvType::Number => "NUMBER",
            NvType::String => "STRING",
            NvType::NvList => "NVLIST",
            NvType::Descriptor => "DESCRIPTOR",
            NvType::Binary => "BINARY",
            NvType::BoolArray => "BOOL ARRAY",
            NvType::NumberArray => "NUMBER ARRAY",
            NvType::StringArray => "STRING ARRAY",
            NvType::NvListArray => "NVLIST ARRAY",
            NvType::DescriptorArray => "DESCRIPTOR ARRAY",
        }
    }

    /// The array type holding elements of this scalar type.
    pub fn array_of(self) -> Option<NvType> {
        match self {
            NvType::Bool => Some(NvType::BoolArray),
            NvType::Number => Some(NvType::NumberArray),
            NvType::String => Some(NvType::StringArray),
            NvType::NvList => Some(NvType::NvListArray),
            NvType::Descriptor => Some(NvType::DescriptorArray),
            _ => None,
        }
    }

    pub fn is_array(self) -> bool {
        matches!(
            self,
            NvType::BoolArray
                | NvType::NumberArray
                | NvType::StringArray
                | NvType::NvListArray
                | NvType::DescriptorArray
        )
    }

    /// Does an entry of type `actual` satisfy a lookup for `self`?
    pub fn matches(self, actual: NvType) -> bool {
        self == NvType::None || self == actual
    }
}

impl fmt::Display for NvType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Payload of a list entry.
pub enum Value {
    Null,
    Bool(bool),
    Number(u64),
    String(String),
    NvList(Box<Store>),
    Descriptor(OwnedFd),
    Binary(Vec<u8>),
    BoolArray(Vec<bool>),
    NumberArray(Vec<u64>),
    StringArray(Vec<String>),
    NvListArray(Vec<Store>),
    DescriptorArray(Vec<OwnedFd>),
}

impl Value {
    pub fn nv_type(&self) -> NvType {
        match self {
            Value::Null => NvType::Null,
            Value::Bool(_) => NvType::Bool,
            Value::Number(_) => NvType::Number,
            Value::String(_) => NvType::String,
            Value::NvList(_) => NvType::NvList,
            Value::Descriptor(_) => NvType::Descriptor,
            Value::Binary(_) => NvType::Binary,
            Value::BoolArray(_) => NvType::BoolArray,
            Value::NumberArray(_) => NvType::NumberArray,
            Value::StringArray(_) => NvType::StringArray,
            Value::NvListArray(_) => NvType::NvListArray,
            Value::DescriptorArray(_) => NvType::DescriptorArray,
        }
    }

    /// Number of elements: the array length for arrays, zero otherwise.
    pub fn nitems(&self) -> usize {
        match self {
            Value::BoolArray(v) => v.len(),
            Value::NumberArray(v) => v.len(),
            Value::StringArray(v) => v.len(),
            Value::NvListArray(v) => v.len(),
            Value::DescriptorArray(v) => v.len(),
            _ => 0,
        }
    }

    /// Number of descriptors held, including those inside nested lists.
    pub fn descriptor_count(&self) -> usize {
        match self {
            Value::Descriptor(_) => 1,
            Value::DescriptorArray(v) => v.len(),
            Value::NvList(nested) => nested.descriptor_count(),
            Value::NvListArray(v) => v.iter().map(Store::descriptor_count).sum(),
            _ => 0,
        }
    }

    /// Deep copy; descriptors are duplicated.
    pub fn try_clone(&self) -> io::Result<Value> {
        Ok(match self {
            Value::Null => Value::Null,
            Value::Bool(b) => Value::Bool(*b),
            Value::Number(n) => Value::Number(*n),
            Value::String(s) => Value::String(s.clone()),
            Value::NvList(nested) => Value::NvList(Box::new(nested.try_clone_inner()?)),
            Value::Descriptor(fd) => Value::Descriptor(fd.as_fd().try_clone_to_owned()?),
            Value::Binary(b) => Value::Binary(b.clone()),
            Value::BoolArray(v) => Value::BoolArray(v.clone()),
            Value::NumberArray(v) => Value::NumberArray(v.clone()),
            Value::StringArray(v) => Value::StringArray(v.clone()),
            Value::NvListArray(v) => Value::NvListArray(
                v.iter()
                    .map(Store::try_clone_inner)
                    .collect::<io::Result<_>>()?,
            ),
            Value::DescriptorArray(v) => Value::DescriptorArray(
                v.iter()
                    .map(|fd| fd.as_fd().try_clone_to_owned())
                    .collect::<io::Result<_>>()?,
            ),
        })
    }

    /// Check the text invariants the packed format relies on.
    pub(crate) fn has_embedded_nul(&self) -> bool {
        match self {
            Value::String(s) => s.contains('\0'),
            Value::StringArray(v) => v.iter().any(|s| s.contains('\0')),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Number(n) => f.debug_tuple("Number").field(n).finish(),
            Value::String(s) => f.debug_tuple("String").field(s).finish(),
            Value::NvList(nested) => f.debug_tuple("NvList").field(nested).finish(),
            Value::Descriptor(fd) => f.debug_tuple("Descriptor").field(fd).finish(),
            Value::Binary(b) => f.debug_tuple("Binary").field(&hex::encode(b)).finish(),
            Value::BoolArray(v) => f.debug_tuple("BoolArray").field(v).finish(),
            Value::NumberArray(v) => f.debug_tuple("NumberArray").field(v).finish(),
            Value::StringArray(v) => f.debug_tuple("StringArray").field(v).finish(),
            Value::NvListArray(v) => f.debug_tuple("NvListArray").field(v).finish(),
            Value::DescriptorArray(v) => f.debug_tuple("DescriptorArray").field(v).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_roundtrip() {
        for ty in NvType::ALL {
            assert_eq!(NvType::from_code(ty.code()), Some(ty));
        }
        assert_eq!(NvType::from_code(0), Some(NvType::None));
        assert_eq!(NvType::from_code(13), None);
        assert_eq!(NvType::from_code(255), None);
    }

    #[test]
    fn array_mapping() {
        assert_eq!(NvType::Bool.array_of(), Some(NvType::BoolArray));
        assert_eq!(NvType::Descriptor.array_of(), Some(NvType::DescriptorArray));
        assert_eq!(NvType::Binary.array_of(), None);
        assert_eq!(NvType::Null.array_of(), None);
        assert!(NvType::StringArray.is_array());
        assert!(!NvType::String.is_array());
    }

    #[test]
    fn wildcard_matches_everything() {
        for ty in NvType::ALL {
            assert!(NvType::None.matches(ty));
            assert!(ty.matches(ty));
        }
        assert!(!NvType::Bool.matches(NvType::Number));
    }

    #[test]
    fn names_for_dump() {
        assert_eq!(NvType::NumberArray.to_string(), "NUMBER ARRAY");
        assert_eq!(NvType::NvList.name(), "NVLIST");
    }

    #[test]
    fn value_type_and_items() {
        assert_eq!(Value::Number(1).nv_type(), NvType::Number);
        assert_eq!(Value::NumberArray(vec![1, 2, 3]).nitems(), 3);
        assert_eq!(Value::String("x".into()).nitems(), 0);
    }

    #[test]
    fn clone_duplicates_descriptor() {
        let file = tempfile::tempfile().unwrap();
        let value = Value::Descriptor(OwnedFd::from(file));
        let copy = value.try_clone().unwrap();
        match (&value, &copy) {
            (Value::Descriptor(a), Value::Descriptor(b)) => {
                use std::os::fd::AsRawFd;
                assert_ne!(a.as_raw_fd(), b.as_raw_fd());
            }
            _ => panic!("expected descriptors"),
        }
    }

    #[test]
    fn embedded_nul_detection() {
        assert!(Value::String("a\0b".into()).has_embedded_nul());
        assert!(Value::StringArray(vec!["ok".into(), "b\0".into()]).has_embedded_nul());
        assert!(!Value::Binary(vec![0, 0]).has_embedded_nul());
    }
}
