//! Read access shared by views and owners.
//!
//! Every read operation is implemented once, on [`ConstNvList`], where the
//! returned data borrows the viewed store for `'a`. [`NvRead`] exposes the
//! same operations on anything that can produce a view, so an [`NvList`]
//! reads exactly like a view of itself.
//!
//! Each operation checks, in order: null handle, sticky error, embedded NUL
//! in the key. Lookups that find no entry of the requested type fail with
//! [`NvError::KeyNotFound`].

use std::io::Write;
use std::os::fd::{AsFd, BorrowedFd};

use nvl_store::{Errno, NvFlags, NvType, Store, Value};

use crate::error::{check_key, NvError, NvResult};
use crate::handle::{ConstNvList, NvList};
use crate::iter::Iter;

impl<'a> ConstNvList<'a> {
    fn value(self, key: &str, ty: NvType) -> NvResult<&'a Value> {
        let store = self.checked()?;
        check_key(key)?;
        store.get(key, ty).ok_or_else(|| NvError::not_found(key))
    }

    // ---- state ----

    /// The sticky error, if any. Defined even for a store in error state.
    pub fn error(self) -> NvResult<Option<Errno>> {
        Ok(self.as_store()?.error())
    }

    /// `true` if the view is non-null and its store carries no error.
    pub fn is_ok(self) -> bool {
        matches!(self.error(), Ok(None))
    }

    pub fn is_empty(self) -> NvResult<bool> {
        Ok(self.as_store()?.is_empty())
    }

    pub fn in_array(self) -> NvResult<bool> {
        Ok(self.as_store()?.in_array())
    }

    pub fn flags(self) -> NvResult<NvFlags> {
        Ok(self.checked()?.flags())
    }

    // ---- packing ----

    pub fn packed_size(self) -> NvResult<usize> {
        Ok(self.checked()?.packed_size()?)
    }

    pub fn pack(self) -> NvResult<Vec<u8>> {
        Ok(self.checked()?.pack()?)
    }

    /// Pack the list and write it to `channel`.
    pub fn send<W: Write + ?Sized>(self, channel: &mut W) -> NvResult<()> {
        Ok(self.checked()?.send(channel)?)
    }

    /// Write a human-readable listing of the list.
    pub fn dump<W: Write + ?Sized>(self, out: &mut W) -> NvResult<()> {
        Ok(self.as_store()?.dump(out)?)
    }

    // ---- existence ----

    /// Is `key` present with any type?
    pub fn exists(self, key: &str) -> NvResult<bool> {
        self.exists_type(key, NvType::None)
    }

    /// Is `key` present with type `ty`? [`NvType::None`] matches any type.
    pub fn exists_type(self, key: &str, ty: NvType) -> NvResult<bool> {
        let store = self.checked()?;
        check_key(key)?;
        Ok(store.exists_type(key, ty))
    }

    pub fn exists_null(self, key: &str) -> NvResult<bool> {
        self.exists_type(key, NvType::Null)
    }

    pub fn exists_bool(self, key: &str) -> NvResult<bool> {
        self.exists_type(key, NvType::Bool)
    }

    pub fn exists_number(self, key: &str) -> NvResult<bool> {
        self.exists_type(key, NvType::Number)
    }

    pub fn exists_string(self, key: &str) -> NvResult<bool> {
        self.exists_type(key, NvType::String)
    }

    pub fn exists_nvlist(self, key: &str) -> NvResult<bool> {
        self.exists_type(key, NvType::NvList)
    }

    pub fn exists_descriptor(self, key: &str) -> NvResult<bool> {
        self.exists_type(key, NvType::Descriptor)
    }

    pub fn exists_binary(self, key: &str) -> NvResult<bool> {
        self.exists_type(key, NvType::Binary)
    }

    pub fn exists_bool_array(self, key: &str) -> NvResult<bool> {
        self.exists_type(key, NvType::BoolArray)
    }

    pub fn exists_number_array(self, key: &str) -> NvResult<bool> {
        self.exists_type(key, NvType::NumberArray)
    }

    pub fn exists_string_array(self, key: &str) -> NvResult<bool> {
        self.exists_type(key, NvType::StringArray)
    }

    pub fn exists_nvlist_array(self, key: &str) -> NvResult<bool> {
        self.exists_type(key, NvType::NvListArray)
    }

    pub fn exists_descriptor_array(self, key: &str) -> NvResult<bool> {
        self.exists_type(key, NvType::DescriptorArray)
    }

    // ---- scalar getters ----

    pub fn get_bool(self, key: &str) -> NvResult<bool> {
        match self.value(key, NvType::Bool)? {
            Value::Bool(b) => Ok(*b),
            _ => Err(NvError::not_found(key)),
        }
    }

    pub fn get_number(self, key: &str) -> NvResult<u64> {
        match self.value(key, NvType::Number)? {
            Value::Number(n) => Ok(*n),
            _ => Err(NvError::not_found(key)),
        }
    }

    pub fn get_string(self, key: &str) -> NvResult<&'a str> {
        match self.value(key, NvType::String)? {
            Value::String(s) => Ok(s),
            _ => Err(NvError::not_found(key)),
        }
    }

    /// Non-owning view of a nested list.
    pub fn get_nvlist(self, key: &str) -> NvResult<ConstNvList<'a>> {
        match self.value(key, NvType::NvList)? {
            Value::NvList(nested) => Ok(ConstNvList::from_store(nested)),
            _ => Err(NvError::not_found(key)),
        }
    }

    /// The descriptor stays owned by the store.
    pub fn get_descriptor(self, key: &str) -> NvResult<BorrowedFd<'a>> {
        match self.value(key, NvType::Descriptor)? {
            Value::Descriptor(fd) => Ok(fd.as_fd()),
            _ => Err(NvError::not_found(key)),
        }
    }

    pub fn get_binary(self, key: &str) -> NvResult<&'a [u8]> {
        match self.value(key, NvType::Binary)? {
            Value::Binary(b) => Ok(b),
            _ => Err(NvError::not_found(key)),
        }
    }

    // ---- array getters ----

    pub fn get_bool_array(self, key: &str) -> NvResult<&'a [bool]> {
        match self.value(key, NvType::BoolArray)? {
            Value::BoolArray(v) => Ok(v),
            _ => Err(NvError::not_found(key)),
        }
    }

    pub fn get_number_array(self, key: &str) -> NvResult<&'a [u64]> {
        match self.value(key, NvType::NumberArray)? {
            Value::NumberArray(v) => Ok(v),
            _ => Err(NvError::not_found(key)),
        }
    }

    pub fn get_string_array(self, key: &str) -> NvResult<Vec<&'a str>> {
        match self.value(key, NvType::StringArray)? {
            Value::StringArray(v) => Ok(v.iter().map(String::as_str).collect()),
            _ => Err(NvError::not_found(key)),
        }
    }

    pub fn get_nvlist_array(self, key: &str) -> NvResult<Vec<ConstNvList<'a>>> {
        match self.value(key, NvType::NvListArray)? {
            Value::NvListArray(v) => Ok(v.iter().map(ConstNvList::from_store).collect()),
            _ => Err(NvError::not_found(key)),
        }
    }

    pub fn get_descriptor_array(self, key: &str) -> NvResult<Vec<BorrowedFd<'a>>> {
        match self.value(key, NvType::DescriptorArray)? {
            Value::DescriptorArray(v) => Ok(v.iter().map(AsFd::as_fd).collect()),
            _ => Err(NvError::not_found(key)),
        }
    }

    // ---- iteration ----

    /// Iterate over every entry in storage order.
    pub fn iter(self) -> NvResult<Iter<'a>> {
        Ok(Iter::new(self.checked()?))
    }
}

/// Read operations available on both views and owners.
///
/// Implementors only provide [`NvRead::view`]; every other method forwards
/// to the matching [`ConstNvList`] operation.
pub trait NvRead {
    fn view(&self) -> ConstNvList<'_>;

    fn error(&self) -> NvResult<Option<Errno>> {
        self.view().error()
    }

    fn is_ok(&self) -> bool {
        self.view().is_ok()
    }

    fn is_empty(&self) -> NvResult<bool> {
        self.view().is_empty()
    }

    fn in_array(&self) -> NvResult<bool> {
        self.view().in_array()
    }

    fn flags(&self) -> NvResult<NvFlags> {
        self.view().flags()
    }

    fn packed_size(&self) -> NvResult<usize> {
        self.view().packed_size()
    }

    fn pack(&self) -> NvResult<Vec<u8>> {
        self.view().pack()
    }

    fn send<W: Write + ?Sized>(&self, channel: &mut W) -> NvResult<()>
    where
        Self: Sized,
    {
        self.view().send(channel)
    }

    fn dump<W: Write + ?Sized>(&self, out: &mut W) -> NvResult<()>
    where
        Self: Sized,
    {
        self.view().dump(out)
    }

    fn exists(&self, key: &str) -> NvResult<bool> {
        self.view().exists(key)
    }

    fn exists_type(&self, key: &str, ty: NvType) -> NvResult<bool> {
        self.view().exists_type(key, ty)
    }

    fn exists_null(&self, key: &str) -> NvResult<bool> {
        self.view().exists_null(key)
    }

    fn exists_bool(&self, key: &str) -> NvResult<bool> {
        self.view().exists_bool(key)
    }

    fn exists_number(&self, key: &str) -> NvResult<bool> {
        self.view().exists_number(key)
    }

    fn exists_string(&self, key: &str) -> NvResult<bool> {
        self.view().exists_string(key)
    }

    fn exists_nvlist(&self, key: &str) -> NvResult<bool> {
        self.view().exists_nvlist(key)
    }

    fn exists_descriptor(&self, key: &str) -> NvResult<bool> {
        self.view().exists_descriptor(key)
    }

    fn exists_binary(&self, key: &str) -> NvResult<bool> {
        self.view().exists_binary(key)
    }

    fn exists_bool_array(&self, key: &str) -> NvResult<bool> {
        self.view().exists_bool_array(key)
    }

    fn exists_number_array(&self, key: &str) -> NvResult<bool> {
        self.view().exists_number_array(key)
    }

    fn exists_string_array(&self, key: &str) -> NvResult<bool> {
        self.view().exists_string_array(key)
    }

    fn exists_nvlist_array(&self, key: &str) -> NvResult<bool> {
        self.view().exists_nvlist_array(key)
    }

    fn exists_descriptor_array(&self, key: &str) -> NvResult<bool> {
        self.view().exists_descriptor_array(key)
    }

    fn get_bool(&self, key: &str) -> NvResult<bool> {
        self.view().get_bool(key)
    }

    fn get_number(&self, key: &str) -> NvResult<u64> {
        self.view().get_number(key)
    }

    fn get_string(&self, key: &str) -> NvResult<&str> {
        self.view().get_string(key)
    }

    fn get_nvlist(&self, key: &str) -> NvResult<ConstNvList<'_>> {
        self.view().get_nvlist(key)
    }

    fn get_descriptor(&self, key: &str) -> NvResult<BorrowedFd<'_>> {
        self.view().get_descriptor(key)
    }

    fn get_binary(&self, key: &str) -> NvResult<&[u8]> {
        self.view().get_binary(key)
    }

    fn get_bool_array(&self, key: &str) -> NvResult<&[bool]> {
        self.view().get_bool_array(key)
    }

    fn get_number_array(&self, key: &str) -> NvResult<&[u64]> {
        self.view().get_number_array(key)
    }

    fn get_string_array(&self, key: &str) -> NvResult<Vec<&str>> {
        self.view().get_string_array(key)
    }

    fn get_nvlist_array(&self, key: &str) -> NvResult<Vec<ConstNvList<'_>>> {
        self.view().get_nvlist_array(key)
    }

    fn get_descriptor_array(&self, key: &str) -> NvResult<Vec<BorrowedFd<'_>>> {
        self.view().get_descriptor_array(key)
    }

    fn iter(&self) -> NvResult<Iter<'_>> {
        self.view().iter()
    }

    /// The underlying store, even in error state.
    fn as_raw_store(&self) -> NvResult<&Store> {
        self.view().as_store()
    }
}

impl NvRead for ConstNvList<'_> {
    fn view(&self) -> ConstNvList<'_> {
        *self
    }
}

impl NvRead for NvList {
    fn view(&self) -> ConstNvList<'_> {
        self.as_const()
    }
}

impl<T: NvRead + ?Sized> NvRead for &T {
    fn view(&self) -> ConstNvList<'_> {
        (**self).view()
    }
}

impl<T: NvRead + ?Sized> NvRead for &mut T {
    fn view(&self) -> ConstNvList<'_> {
        (**self).view()
    }
}
