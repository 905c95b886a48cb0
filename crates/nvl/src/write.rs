//! Mutation on owners: add, move, append, take and free.
//!
//! Every mutator checks, in order: null handle, sticky error, embedded NUL
//! in the key or any string value. Adds and moves then check for an
//! existing key (unless the store allows duplicates), so a duplicate add
//! fails with [`NvError::KeyExists`] and leaves the store usable with its
//! first value intact. Whatever error the store latches during the call is
//! reported afterwards: `EEXIST` as [`NvError::KeyExists`], anything else
//! as [`NvError::System`].

use std::io;
use std::os::fd::{AsFd, BorrowedFd, OwnedFd};

use nvl_store::{Errno, NvType, Store, Value};
use tracing::debug;

use crate::error::{check_key, check_string, NvError, NvResult};
use crate::handle::{ConstNvList, NvList};
use crate::read::NvRead;

/// Map a latched store error to the caller-facing kind.
fn latched(store: &Store, key: &str) -> NvResult<()> {
    match store.error() {
        None => Ok(()),
        Some(code) if code == Errno::EEXIST => Err(NvError::exists(key)),
        Some(code) => {
            debug!(key, %code, "store rejected insertion");
            Err(NvError::System(io::Error::from(code)))
        }
    }
}

fn dup(fd: BorrowedFd<'_>) -> NvResult<OwnedFd> {
    fd.try_clone_to_owned().map_err(NvError::System)
}

fn copy_nvlist(view: ConstNvList<'_>) -> NvResult<Store> {
    Ok(view.checked()?.try_clone()?)
}

impl NvList {
    /// Writable store that has passed the null, error and key checks.
    fn prepare(&mut self, key: &str) -> NvResult<&mut Store> {
        let store = self.checked_mut()?;
        check_key(key)?;
        Ok(store)
    }

    fn insert(&mut self, key: &str, value: Value) -> NvResult<()> {
        let store = self.prepare(key)?;
        if !store.flags().no_unique() && store.exists(key) {
            return Err(NvError::exists(key));
        }
        store.add(key, value);
        latched(store, key)
    }

    fn push(&mut self, key: &str, element: Value) -> NvResult<()> {
        let store = self.prepare(key)?;
        let Some(array_type) = element.nv_type().array_of() else {
            return Err(NvError::not_found(key));
        };
        if !store.exists_type(key, array_type) {
            return Err(NvError::not_found(key));
        }
        store.append(key, element);
        latched(store, key)
    }

    fn remove(&mut self, key: &str, ty: NvType) -> NvResult<Value> {
        let store = self.prepare(key)?;
        store.take(key, ty).ok_or_else(|| NvError::not_found(key))
    }

    // ------------------------------------------------------------------
    // add: copy the value into the store
    // ------------------------------------------------------------------

    pub fn add_null(&mut self, key: &str) -> NvResult<()> {
        self.insert(key, Value::Null)
    }

    pub fn add_bool(&mut self, key: &str, value: bool) -> NvResult<()> {
        self.insert(key, Value::Bool(value))
    }

    pub fn add_number(&mut self, key: &str, value: u64) -> NvResult<()> {
        self.insert(key, Value::Number(value))
    }

    pub fn add_string(&mut self, key: &str, value: &str) -> NvResult<()> {
        self.prepare(key)?;
        check_string("value", value)?;
        self.insert(key, Value::String(value.to_owned()))
    }

    /// Add a deep copy of `value`.
    pub fn add_nvlist(&mut self, key: &str, value: ConstNvList<'_>) -> NvResult<()> {
        self.prepare(key)?;
        let copy = copy_nvlist(value)?;
        self.insert(key, Value::NvList(Box::new(copy)))
    }

    /// Add a duplicate of `fd`; the caller keeps its own descriptor.
    pub fn add_descriptor(&mut self, key: &str, fd: BorrowedFd<'_>) -> NvResult<()> {
        self.prepare(key)?;
        let owned = dup(fd)?;
        self.insert(key, Value::Descriptor(owned))
    }

    pub fn add_binary(&mut self, key: &str, value: &[u8]) -> NvResult<()> {
        self.insert(key, Value::Binary(value.to_vec()))
    }

    pub fn add_bool_array(&mut self, key: &str, values: &[bool]) -> NvResult<()> {
        self.insert(key, Value::BoolArray(values.to_vec()))
    }

    pub fn add_number_array(&mut self, key: &str, values: &[u64]) -> NvResult<()> {
        self.insert(key, Value::NumberArray(values.to_vec()))
    }

    pub fn add_string_array<S: AsRef<str>>(&mut self, key: &str, values: &[S]) -> NvResult<()> {
        self.add_string_range(key, values)
    }

    pub fn add_nvlist_array(&mut self, key: &str, values: &[ConstNvList<'_>]) -> NvResult<()> {
        self.add_nvlist_range(key, values)
    }

    pub fn add_descriptor_array(&mut self, key: &str, values: &[BorrowedFd<'_>]) -> NvResult<()> {
        self.add_descriptor_range(key, values)
    }

    // ------------------------------------------------------------------
    // Range adders: materialize any sequence, then add it as an array
    // ------------------------------------------------------------------

    pub fn add_bool_range<I>(&mut self, key: &str, values: I) -> NvResult<()>
    where
        I: IntoIterator<Item = bool>,
    {
        self.prepare(key)?;
        self.insert(key, Value::BoolArray(values.into_iter().collect()))
    }

    pub fn add_number_range<I>(&mut self, key: &str, values: I) -> NvResult<()>
    where
        I: IntoIterator<Item = u64>,
    {
        self.prepare(key)?;
        self.insert(key, Value::NumberArray(values.into_iter().collect()))
    }

    pub fn add_string_range<I>(&mut self, key: &str, values: I) -> NvResult<()>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.prepare(key)?;
        let values = values
            .into_iter()
            .map(|s| {
                let s = s.as_ref();
                check_string("value", s)?;
                Ok(s.to_owned())
            })
            .collect::<NvResult<Vec<_>>>()?;
        self.insert(key, Value::StringArray(values))
    }

    /// Add the bytes of any sequence as one binary entry.
    pub fn add_binary_range<I>(&mut self, key: &str, values: I) -> NvResult<()>
    where
        I: IntoIterator<Item = u8>,
    {
        self.prepare(key)?;
        self.insert(key, Value::Binary(values.into_iter().collect()))
    }

    pub fn add_descriptor_range<I>(&mut self, key: &str, values: I) -> NvResult<()>
    where
        I: IntoIterator,
        I::Item: AsFd,
    {
        self.prepare(key)?;
        let fds = values
            .into_iter()
            .map(|fd| dup(fd.as_fd()))
            .collect::<NvResult<Vec<_>>>()?;
        self.insert(key, Value::DescriptorArray(fds))
    }

    /// Add deep copies of every list in the sequence.
    pub fn add_nvlist_range<I>(&mut self, key: &str, values: I) -> NvResult<()>
    where
        I: IntoIterator,
        I::Item: NvRead,
    {
        self.prepare(key)?;
        let lists = values
            .into_iter()
            .map(|nvl| copy_nvlist(nvl.view()))
            .collect::<NvResult<Vec<_>>>()?;
        self.insert(key, Value::NvListArray(lists))
    }

    // ------------------------------------------------------------------
    // move: hand an owned value to the store without copying
    // ------------------------------------------------------------------

    pub fn move_string(&mut self, key: &str, value: String) -> NvResult<()> {
        self.prepare(key)?;
        check_string("value", &value)?;
        self.insert(key, Value::String(value))
    }

    pub fn move_nvlist(&mut self, key: &str, value: NvList) -> NvResult<()> {
        self.prepare(key)?;
        let store = value.into_store()?;
        if let Some(code) = store.error() {
            return Err(NvError::ErrorState { code });
        }
        self.insert(key, Value::NvList(Box::new(store)))
    }

    pub fn move_descriptor(&mut self, key: &str, fd: OwnedFd) -> NvResult<()> {
        self.insert(key, Value::Descriptor(fd))
    }

    pub fn move_binary(&mut self, key: &str, value: Vec<u8>) -> NvResult<()> {
        self.insert(key, Value::Binary(value))
    }

    pub fn move_bool_array(&mut self, key: &str, values: Vec<bool>) -> NvResult<()> {
        self.insert(key, Value::BoolArray(values))
    }

    pub fn move_number_array(&mut self, key: &str, values: Vec<u64>) -> NvResult<()> {
        self.insert(key, Value::NumberArray(values))
    }

    pub fn move_string_array(&mut self, key: &str, values: Vec<String>) -> NvResult<()> {
        self.prepare(key)?;
        values.iter().try_for_each(|s| check_string("value", s))?;
        self.insert(key, Value::StringArray(values))
    }

    pub fn move_nvlist_array(&mut self, key: &str, values: Vec<NvList>) -> NvResult<()> {
        self.prepare(key)?;
        let mut stores = Vec::with_capacity(values.len());
        for nvl in values {
            let store = nvl.into_store()?;
            if let Some(code) = store.error() {
                return Err(NvError::ErrorState { code });
            }
            stores.push(store);
        }
        self.insert(key, Value::NvListArray(stores))
    }

    pub fn move_descriptor_array(&mut self, key: &str, values: Vec<OwnedFd>) -> NvResult<()> {
        self.insert(key, Value::DescriptorArray(values))
    }

    // ------------------------------------------------------------------
    // append: extend an existing array entry by one element
    // ------------------------------------------------------------------

    pub fn append_bool_array(&mut self, key: &str, value: bool) -> NvResult<()> {
        self.push(key, Value::Bool(value))
    }

    pub fn append_number_array(&mut self, key: &str, value: u64) -> NvResult<()> {
        self.push(key, Value::Number(value))
    }

    pub fn append_string_array(&mut self, key: &str, value: &str) -> NvResult<()> {
        self.prepare(key)?;
        check_string("value", value)?;
        self.push(key, Value::String(value.to_owned()))
    }

    pub fn append_nvlist_array(&mut self, key: &str, value: ConstNvList<'_>) -> NvResult<()> {
        self.prepare(key)?;
        let copy = copy_nvlist(value)?;
        self.push(key, Value::NvList(Box::new(copy)))
    }

    pub fn append_descriptor_array(&mut self, key: &str, fd: BorrowedFd<'_>) -> NvResult<()> {
        self.prepare(key)?;
        let owned = dup(fd)?;
        self.push(key, Value::Descriptor(owned))
    }

    // ------------------------------------------------------------------
    // take: remove an entry and hand its value to the caller
    // ------------------------------------------------------------------

    pub fn take_bool(&mut self, key: &str) -> NvResult<bool> {
        match self.remove(key, NvType::Bool)? {
            Value::Bool(b) => Ok(b),
            _ => Err(NvError::not_found(key)),
        }
    }

    pub fn take_number(&mut self, key: &str) -> NvResult<u64> {
        match self.remove(key, NvType::Number)? {
            Value::Number(n) => Ok(n),
            _ => Err(NvError::not_found(key)),
        }
    }

    pub fn take_string(&mut self, key: &str) -> NvResult<String> {
        match self.remove(key, NvType::String)? {
            Value::String(s) => Ok(s),
            _ => Err(NvError::not_found(key)),
        }
    }

    pub fn take_nvlist(&mut self, key: &str) -> NvResult<NvList> {
        match self.remove(key, NvType::NvList)? {
            Value::NvList(nested) => NvList::from_store(*nested),
            _ => Err(NvError::not_found(key)),
        }
    }

    pub fn take_descriptor(&mut self, key: &str) -> NvResult<OwnedFd> {
        match self.remove(key, NvType::Descriptor)? {
            Value::Descriptor(fd) => Ok(fd),
            _ => Err(NvError::not_found(key)),
        }
    }

    pub fn take_binary(&mut self, key: &str) -> NvResult<Vec<u8>> {
        match self.remove(key, NvType::Binary)? {
            Value::Binary(b) => Ok(b),
            _ => Err(NvError::not_found(key)),
        }
    }

    pub fn take_bool_array(&mut self, key: &str) -> NvResult<Vec<bool>> {
        match self.remove(key, NvType::BoolArray)? {
            Value::BoolArray(v) => Ok(v),
            _ => Err(NvError::not_found(key)),
        }
    }

    pub fn take_number_array(&mut self, key: &str) -> NvResult<Vec<u64>> {
        match self.remove(key, NvType::NumberArray)? {
            Value::NumberArray(v) => Ok(v),
            _ => Err(NvError::not_found(key)),
        }
    }

    pub fn take_string_array(&mut self, key: &str) -> NvResult<Vec<String>> {
        match self.remove(key, NvType::StringArray)? {
            Value::StringArray(v) => Ok(v),
            _ => Err(NvError::not_found(key)),
        }
    }

    pub fn take_nvlist_array(&mut self, key: &str) -> NvResult<Vec<NvList>> {
        match self.remove(key, NvType::NvListArray)? {
            Value::NvListArray(v) => v.into_iter().map(NvList::from_store).collect(),
            _ => Err(NvError::not_found(key)),
        }
    }

    pub fn take_descriptor_array(&mut self, key: &str) -> NvResult<Vec<OwnedFd>> {
        match self.remove(key, NvType::DescriptorArray)? {
            Value::DescriptorArray(v) => Ok(v),
            _ => Err(NvError::not_found(key)),
        }
    }

    // ------------------------------------------------------------------
    // free: remove and drop
    // ------------------------------------------------------------------

    /// Remove the entry named `key`, whatever its type.
    pub fn free(&mut self, key: &str) -> NvResult<()> {
        self.free_type(key, NvType::None)
    }

    /// Remove the entry named `key` of type `ty`.
    pub fn free_type(&mut self, key: &str, ty: NvType) -> NvResult<()> {
        self.remove(key, ty).map(drop)
    }

    pub fn free_null(&mut self, key: &str) -> NvResult<()> {
        self.free_type(key, NvType::Null)
    }

    pub fn free_bool(&mut self, key: &str) -> NvResult<()> {
        self.free_type(key, NvType::Bool)
    }

    pub fn free_number(&mut self, key: &str) -> NvResult<()> {
        self.free_type(key, NvType::Number)
    }

    pub fn free_string(&mut self, key: &str) -> NvResult<()> {
        self.free_type(key, NvType::String)
    }

    pub fn free_nvlist(&mut self, key: &str) -> NvResult<()> {
        self.free_type(key, NvType::NvList)
    }

    pub fn free_descriptor(&mut self, key: &str) -> NvResult<()> {
        self.free_type(key, NvType::Descriptor)
    }

    pub fn free_binary(&mut self, key: &str) -> NvResult<()> {
        self.free_type(key, NvType::Binary)
    }

    pub fn free_bool_array(&mut self, key: &str) -> NvResult<()> {
        self.free_type(key, NvType::BoolArray)
    }

    pub fn free_number_array(&mut self, key: &str) -> NvResult<()> {
        self.free_type(key, NvType::NumberArray)
    }

    pub fn free_string_array(&mut self, key: &str) -> NvResult<()> {
        self.free_type(key, NvType::StringArray)
    }

    pub fn free_nvlist_array(&mut self, key: &str) -> NvResult<()> {
        self.free_type(key, NvType::NvListArray)
    }

    pub fn free_descriptor_array(&mut self, key: &str) -> NvResult<()> {
        self.free_type(key, NvType::DescriptorArray)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nvl_store::NvFlags;
    use proptest::prelude::*;
    use std::collections::{BTreeSet, VecDeque};
    use std::os::fd::AsRawFd;

    // ---- add / get ----

    #[test]
    fn duplicate_add_keeps_first_value() {
        let mut nvl = NvList::new();
        nvl.add_number("k", 1).unwrap();
        assert!(matches!(
            nvl.add_string("k", "other"),
            Err(NvError::KeyExists { key }) if key == "k"
        ));
        assert!(matches!(nvl.add_null("k"), Err(NvError::KeyExists { .. })));
        assert!(matches!(
            nvl.move_binary("k", vec![1]),
            Err(NvError::KeyExists { .. })
        ));
        assert!(nvl.is_ok());
        assert_eq!(nvl.get_number("k").unwrap(), 1);
    }

    #[test]
    fn duplicate_add_respects_case_folding() {
        let mut nvl = NvList::with_flags(NvFlags::IGNORE_CASE);
        nvl.add_bool("Flag", true).unwrap();
        assert!(matches!(nvl.add_bool("FLAG", false), Err(NvError::KeyExists { .. })));
    }

    #[test]
    fn no_unique_lists_accept_duplicates() {
        let mut nvl = NvList::with_flags(NvFlags::NO_UNIQUE);
        nvl.add_number("k", 1).unwrap();
        nvl.add_number("k", 2).unwrap();
        assert_eq!(nvl.iter().unwrap().count(), 2);
    }

    #[test]
    fn nul_in_strings_is_invalid() {
        let mut nvl = NvList::new();
        assert!(matches!(
            nvl.add_string("k", "a\0b"),
            Err(NvError::InvalidString { what: "value", .. })
        ));
        assert!(matches!(
            nvl.add_number("k\0", 1),
            Err(NvError::InvalidString { what: "key", .. })
        ));
        assert!(matches!(
            nvl.add_string_array("k", &["ok", "not\0ok"]),
            Err(NvError::InvalidString { .. })
        ));
        // Rejected before reaching the store.
        assert!(nvl.is_ok());
        assert!(nvl.is_empty().unwrap());
    }

    #[test]
    fn errored_list_rejects_every_add() {
        let mut nvl = NvList::new();
        nvl.set_error(Errno::EINVAL).unwrap();
        let file = tempfile::tempfile().unwrap();
        let results = [
            nvl.add_null("a"),
            nvl.add_bool("a", true),
            nvl.add_number("a", 1),
            nvl.add_string("a", "x"),
            nvl.add_nvlist("a", NvList::new().as_const()),
            nvl.add_descriptor("a", file.as_fd()),
            nvl.add_binary("a", b"x"),
            nvl.add_bool_array("a", &[true]),
            nvl.add_number_array("a", &[1]),
            nvl.add_string_array("a", &["x"]),
            nvl.add_nvlist_array("a", &[]),
            nvl.add_descriptor_array("a", &[]),
        ];
        for result in results {
            assert!(matches!(
                result,
                Err(NvError::ErrorState { code }) if code == Errno::EINVAL
            ));
        }
        assert_eq!(nvl.error().unwrap(), Some(Errno::EINVAL));
    }

    #[test]
    fn null_handle_rejects_mutation() {
        let mut nvl = NvList::default();
        assert!(matches!(nvl.add_number("n", 1), Err(NvError::NullList)));
        assert!(matches!(nvl.take_number("n"), Err(NvError::NullList)));
        assert!(matches!(nvl.free("n"), Err(NvError::NullList)));
        assert!(matches!(nvl.set_error(Errno::EIO), Err(NvError::NullList)));
    }

    #[test]
    fn store_level_failure_is_system_error() {
        let mut nvl = NvList::new();
        let mut broken = Store::default();
        broken.set_error(Errno::ENOMEM);
        // Smuggle an errored list in through raw access.
        nvl.as_store_mut()
            .unwrap()
            .add("child", Value::NvList(Box::new(broken)));
        assert_eq!(nvl.error().unwrap(), Some(Errno::ENOMEM));

        let mut fresh = NvList::new();
        let store = fresh.as_store_mut().unwrap();
        store.add("x", Value::String("bad\0".into()));
        assert!(matches!(latched(store, "x"), Err(NvError::System(_))));
    }

    #[test]
    fn nested_add_is_a_copy() {
        let mut child = NvList::new();
        child.add_number("n", 1).unwrap();
        let mut parent = NvList::new();
        parent.add_nvlist("child", child.as_const()).unwrap();
        child.add_number("m", 2).unwrap();
        assert!(!parent.get_nvlist("child").unwrap().exists("m").unwrap());
    }

    #[test]
    fn errored_nested_list_is_rejected() {
        let mut child = NvList::new();
        child.set_error(Errno::EINVAL).unwrap();
        let mut parent = NvList::new();
        assert!(matches!(
            parent.add_nvlist("child", child.as_const()),
            Err(NvError::ErrorState { .. })
        ));
        assert!(parent.is_ok());
    }

    // ---- take / free ----

    #[test]
    fn take_then_take_again() {
        let mut nvl = NvList::new();
        nvl.add_string("s", "x").unwrap();
        assert_eq!(nvl.take_string("s").unwrap(), "x");
        assert!(!nvl.exists("s").unwrap());
        assert!(matches!(nvl.take_string("s"), Err(NvError::KeyNotFound { .. })));
    }

    #[test]
    fn take_every_type() {
        let file = tempfile::tempfile().unwrap();
        let mut nvl = NvList::new();
        nvl.add_bool("b", true).unwrap();
        nvl.add_number("n", 3).unwrap();
        nvl.add_binary("raw", &[9]).unwrap();
        nvl.add_bool_array("ba", &[true]).unwrap();
        nvl.add_number_array("na", &[4, 5]).unwrap();
        nvl.add_string_array("sa", &["p"]).unwrap();
        nvl.add_nvlist("l", NvList::new().as_const()).unwrap();
        nvl.add_nvlist_array("la", &[NvList::new().as_const()]).unwrap();
        nvl.add_descriptor("fd", file.as_fd()).unwrap();
        nvl.add_descriptor_array("fda", &[file.as_fd()]).unwrap();

        assert!(nvl.take_bool("b").unwrap());
        assert_eq!(nvl.take_number("n").unwrap(), 3);
        assert_eq!(nvl.take_binary("raw").unwrap(), vec![9]);
        assert_eq!(nvl.take_bool_array("ba").unwrap(), vec![true]);
        assert_eq!(nvl.take_number_array("na").unwrap(), vec![4, 5]);
        assert_eq!(nvl.take_string_array("sa").unwrap(), vec!["p".to_owned()]);
        assert!(nvl.take_nvlist("l").unwrap().is_empty().unwrap());
        let lists = nvl.take_nvlist_array("la").unwrap();
        assert!(!lists[0].in_array().unwrap());
        let fd = nvl.take_descriptor("fd").unwrap();
        assert_ne!(fd.as_raw_fd(), file.as_raw_fd());
        assert_eq!(nvl.take_descriptor_array("fda").unwrap().len(), 1);
        assert!(nvl.is_empty().unwrap());
    }

    #[test]
    fn free_checks_type() {
        let mut nvl = NvList::new();
        nvl.add_number("n", 1).unwrap();
        assert!(matches!(nvl.free_string("n"), Err(NvError::KeyNotFound { .. })));
        nvl.free_number("n").unwrap();
        assert!(matches!(nvl.free("n"), Err(NvError::KeyNotFound { .. })));

        nvl.add_null("z").unwrap();
        nvl.free_type("z", NvType::None).unwrap();
        assert!(nvl.is_empty().unwrap());
    }

    // ---- move ----

    #[test]
    fn move_transfers_ownership() {
        let file = tempfile::tempfile().unwrap();
        let fd = OwnedFd::from(file);
        let raw = fd.as_raw_fd();

        let mut nvl = NvList::new();
        nvl.move_descriptor("fd", fd).unwrap();
        assert_eq!(nvl.get_descriptor("fd").unwrap().as_raw_fd(), raw);

        nvl.move_string("s", String::from("moved")).unwrap();
        nvl.move_number_array("na", vec![1, 2]).unwrap();
        nvl.move_bool_array("ba", vec![false]).unwrap();
        nvl.move_string_array("sa", vec!["x".into()]).unwrap();
        nvl.move_descriptor_array("fda", Vec::new()).unwrap();

        let mut child = NvList::new();
        child.add_null("inner").unwrap();
        nvl.move_nvlist("child", child).unwrap();
        nvl.move_nvlist_array("kids", vec![NvList::new(), NvList::new()]).unwrap();

        assert_eq!(nvl.get_string("s").unwrap(), "moved");
        assert!(nvl.get_nvlist("child").unwrap().exists_null("inner").unwrap());
        assert_eq!(nvl.get_nvlist_array("kids").unwrap().len(), 2);
    }

    #[test]
    fn move_of_null_list_fails() {
        let mut nvl = NvList::new();
        assert!(matches!(
            nvl.move_nvlist("child", NvList::default()),
            Err(NvError::NullList)
        ));
    }

    // ---- append ----

    #[test]
    fn append_extends_existing_arrays() {
        let file = tempfile::tempfile().unwrap();
        let mut nvl = NvList::new();
        nvl.add_number_array("na", &[1]).unwrap();
        nvl.append_number_array("na", 2).unwrap();
        nvl.add_bool_array("ba", &[]).unwrap();
        nvl.append_bool_array("ba", true).unwrap();
        nvl.add_string_array::<&str>("sa", &[]).unwrap();
        nvl.append_string_array("sa", "x").unwrap();
        nvl.add_nvlist_array("la", &[]).unwrap();
        nvl.append_nvlist_array("la", NvList::new().as_const()).unwrap();
        nvl.add_descriptor_array("fda", &[]).unwrap();
        nvl.append_descriptor_array("fda", file.as_fd()).unwrap();

        assert_eq!(nvl.get_number_array("na").unwrap(), &[1, 2]);
        assert_eq!(nvl.get_bool_array("ba").unwrap(), &[true]);
        assert_eq!(nvl.get_string_array("sa").unwrap(), vec!["x"]);
        assert!(nvl.get_nvlist_array("la").unwrap()[0].in_array().unwrap());
        assert_eq!(nvl.get_descriptor_array("fda").unwrap().len(), 1);
    }

    #[test]
    fn append_to_missing_array_is_not_found() {
        let mut nvl = NvList::new();
        assert!(matches!(
            nvl.append_number_array("na", 1),
            Err(NvError::KeyNotFound { .. })
        ));
        nvl.add_number("n", 1).unwrap();
        assert!(matches!(
            nvl.append_number_array("n", 2),
            Err(NvError::KeyNotFound { .. })
        ));
        assert!(nvl.is_ok());
    }

    // ---- ranges ----

    #[test]
    fn ranges_accept_non_contiguous_sequences() {
        let mut nvl = NvList::new();
        let numbers: VecDeque<u64> = [3, 1, 2].into_iter().collect();
        nvl.add_number_range("na", numbers).unwrap();
        let words: BTreeSet<&str> = ["b", "a"].into_iter().collect();
        nvl.add_string_range("sa", &words).unwrap();
        nvl.add_bool_range("ba", (0..3).map(|i| i % 2 == 0)).unwrap();
        nvl.add_binary_range("raw", "hi".bytes()).unwrap();

        let file = tempfile::tempfile().unwrap();
        nvl.add_descriptor_range("fds", [&file, &file]).unwrap();

        let kids = vec![NvList::new(), NvList::new()];
        nvl.add_nvlist_range("kids", &kids).unwrap();

        assert_eq!(nvl.get_number_array("na").unwrap(), &[3, 1, 2]);
        assert_eq!(nvl.get_string_array("sa").unwrap(), vec!["a", "b"]);
        assert_eq!(nvl.get_bool_array("ba").unwrap(), &[true, false, true]);
        assert_eq!(nvl.get_binary("raw").unwrap(), b"hi");
        assert_eq!(nvl.get_descriptor_array("fds").unwrap().len(), 2);
        assert_eq!(nvl.get_nvlist_array("kids").unwrap().len(), 2);
    }

    #[test]
    fn empty_arrays_are_allowed() {
        let mut nvl = NvList::new();
        nvl.add_number_array("empty", &[]).unwrap();
        assert!(nvl.get_number_array("empty").unwrap().is_empty());
    }

    proptest! {
        #[test]
        fn scalar_add_then_get(key in "[a-zA-Z0-9_]{1,16}", n in any::<u64>(), b in any::<bool>(), s in r"[^\x00]{0,24}") {
            let (n_key, b_key, s_key) = (format!("{key}.n"), format!("{key}.b"), format!("{key}.s"));
            let mut nvl = NvList::new();
            nvl.add_number(&n_key, n).unwrap();
            nvl.add_bool(&b_key, b).unwrap();
            nvl.add_string(&s_key, &s).unwrap();
            prop_assert_eq!(nvl.get_number(&n_key).unwrap(), n);
            prop_assert_eq!(nvl.get_bool(&b_key).unwrap(), b);
            prop_assert_eq!(nvl.get_string(&s_key).unwrap(), s.as_str());
            prop_assert!(nvl.exists_number(&n_key).unwrap());
        }

        #[test]
        fn pack_unpack_preserves_entries(numbers in prop::collection::btree_map("[a-z]{1,6}", any::<u64>(), 0..12)) {
            let mut nvl = NvList::new();
            for (key, value) in &numbers {
                nvl.add_number(key, *value).unwrap();
            }
            let back = NvList::unpack(&nvl.pack().unwrap(), NvFlags::NONE).unwrap();
            for (key, value) in &numbers {
                prop_assert_eq!(back.get_number(key).unwrap(), *value);
            }
            prop_assert_eq!(back.iter().unwrap().count(), numbers.len());
        }
    }
}
