use std::iter::FusedIterator;
use std::os::fd::{AsFd, BorrowedFd};
use std::ptr;

use nvl_store::{Cookie, NvType, Store, Value};

use crate::handle::{ConstNvList, NvList};

/// The value of one entry, borrowed from its store.
///
/// Nested lists come back as non-owning views and descriptors as borrowed
/// descriptors: nothing is copied out of the store except the small
/// vectors of views and string slices for the array cases.
#[derive(Clone, Debug)]
pub enum NvValue<'a> {
    Null,
    Bool(bool),
    Number(u64),
    String(&'a str),
    NvList(ConstNvList<'a>),
    Descriptor(BorrowedFd<'a>),
    Binary(&'a [u8]),
    BoolArray(&'a [bool]),
    NumberArray(&'a [u64]),
    StringArray(Vec<&'a str>),
    NvListArray(Vec<ConstNvList<'a>>),
    DescriptorArray(Vec<BorrowedFd<'a>>),
}

impl<'a> NvValue<'a> {
    fn from_value(value: &'a Value) -> Self {
        match value {
            Value::Null => NvValue::Null,
            Value::Bool(b) => NvValue::Bool(*b),
            Value::Number(n) => NvValue::Number(*n),
            Value::String(s) => NvValue::String(s),
            Value::NvList(nested) => NvValue::NvList(ConstNvList::from_store(nested)),
            Value::Descriptor(fd) => NvValue::Descriptor(fd.as_fd()),
            Value::Binary(b) => NvValue::Binary(b),
            Value::BoolArray(v) => NvValue::BoolArray(v),
            Value::NumberArray(v) => NvValue::NumberArray(v),
            Value::StringArray(v) => NvValue::StringArray(v.iter().map(String::as_str).collect()),
            Value::NvListArray(v) => {
                NvValue::NvListArray(v.iter().map(ConstNvList::from_store).collect())
            }
            Value::DescriptorArray(v) => {
                NvValue::DescriptorArray(v.iter().map(AsFd::as_fd).collect())
            }
        }
    }

    pub fn nv_type(&self) -> NvType {
        match self {
            NvValue::Null => NvType::Null,
            NvValue::Bool(_) => NvType::Bool,
            NvValue::Number(_) => NvType::Number,
            NvValue::String(_) => NvType::String,
            NvValue::NvList(_) => NvType::NvList,
            NvValue::Descriptor(_) => NvType::Descriptor,
            NvValue::Binary(_) => NvType::Binary,
            NvValue::BoolArray(_) => NvType::BoolArray,
            NvValue::NumberArray(_) => NvType::NumberArray,
            NvValue::StringArray(_) => NvType::StringArray,
            NvValue::NvListArray(_) => NvType::NvListArray,
            NvValue::DescriptorArray(_) => NvType::DescriptorArray,
        }
    }
}

/// Forward, single-pass iterator over a store's entries in storage order.
///
/// The iterator is positioned on its first entry when created and
/// materializes each value only when it is yielded. Two iterators compare
/// equal when they walk the same store and sit at the same position;
/// [`Iter::end`] compares equal to any exhausted iterator.
#[derive(Clone, Debug)]
pub struct Iter<'a> {
    store: Option<&'a Store>,
    cookie: Cookie,
    current: Option<&'a str>,
}

impl<'a> Iter<'a> {
    pub(crate) fn new(store: &'a Store) -> Self {
        let mut cookie = Cookie::default();
        let current = store.next(&mut cookie).map(|(name, _)| name);
        Self {
            store: Some(store),
            cookie,
            current,
        }
    }

    /// The exhausted sentinel.
    pub fn end() -> Self {
        Self {
            store: None,
            cookie: Cookie::default(),
            current: None,
        }
    }

    pub fn is_end(&self) -> bool {
        self.current.is_none()
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a str, NvValue<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        let name = self.current?;
        let store = self.store?;
        let value = store.value_at(self.cookie)?;
        self.current = store.next(&mut self.cookie).map(|(name, _)| name);
        Some((name, NvValue::from_value(value)))
    }
}

impl FusedIterator for Iter<'_> {}

impl PartialEq for Iter<'_> {
    fn eq(&self, other: &Self) -> bool {
        if self.is_end() || other.is_end() {
            return self.is_end() && other.is_end();
        }
        let same_store = match (self.store, other.store) {
            (Some(a), Some(b)) => ptr::eq(a, b),
            _ => false,
        };
        same_store && self.cookie == other.cookie
    }
}

impl Eq for Iter<'_> {}

/// Iterating a null view, or a view of a store in error state, yields
/// nothing. Use [`ConstNvList::iter`] to have those cases reported.
impl<'a> IntoIterator for ConstNvList<'a> {
    type Item = (&'a str, NvValue<'a>);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        match self.raw() {
            Some(store) => Iter::new(store),
            None => Iter::end(),
        }
    }
}

impl<'a> IntoIterator for &'a NvList {
    type Item = (&'a str, NvValue<'a>);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.as_const().into_iter()
    }
}
