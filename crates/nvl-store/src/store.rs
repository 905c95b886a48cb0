use std::fmt;
use std::io;

use tracing::debug;

use crate::error::{Errno, StoreError, StoreResult};
use crate::flags::NvFlags;
use crate::value::{NvType, Value};

/// Longest key accepted by [`Store::add`], in bytes (terminating NUL excluded).
pub const NAME_MAX: usize = 2047;

/// Enumeration cursor for [`Store::next`].
///
/// The default cookie sits before the first entry. Once enumeration runs
/// past the last entry the cookie returns to that state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Cookie(Option<usize>);

struct Entry {
    name: String,
    value: Value,
}

/// Ordered list of named, type-tagged entries.
///
/// Entries are kept in insertion order. A store carries a sticky error:
/// once an insertion fails, the first error code is latched and every
/// later lookup or insertion is ignored.
pub struct Store {
    entries: Vec<Entry>,
    flags: NvFlags,
    error: Option<Errno>,
    in_array: bool,
}

impl Store {
    /// Create an empty store with the given creation flags.
    pub fn new(flags: NvFlags) -> Self {
        Self {
            entries: Vec::new(),
            flags,
            error: None,
            in_array: false,
        }
    }

    /// Deep copy. Descriptors are duplicated. The copy stands on its own,
    /// so it is never marked as an array element.
    pub fn try_clone(&self) -> StoreResult<Store> {
        if let Some(errno) = self.error {
            return Err(StoreError::ErrorState(errno));
        }
        let mut copy = self.try_clone_inner()?;
        copy.in_array = false;
        Ok(copy)
    }

    pub(crate) fn try_clone_inner(&self) -> io::Result<Store> {
        let entries = self
            .entries
            .iter()
            .map(|entry| {
                Ok(Entry {
                    name: entry.name.clone(),
                    value: entry.value.try_clone()?,
                })
            })
            .collect::<io::Result<_>>()?;
        Ok(Store {
            entries,
            flags: self.flags,
            error: self.error,
            in_array: self.in_array,
        })
    }

    // ------------------------------------------------------------------
    // State queries
    // ------------------------------------------------------------------

    /// The sticky error, if one has been latched.
    pub fn error(&self) -> Option<Errno> {
        self.error
    }

    /// Latch `errno` unless an error is already latched.
    pub fn set_error(&mut self, errno: Errno) {
        if self.error.is_none() {
            debug!(%errno, "store error latched");
            self.error = Some(errno);
        }
    }

    pub fn flags(&self) -> NvFlags {
        self.flags
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Is this store an element of an nvlist array?
    pub fn in_array(&self) -> bool {
        self.in_array
    }

    pub(crate) fn set_in_array(&mut self) {
        self.in_array = true;
    }

    /// Number of descriptors held, nested lists included.
    pub fn descriptor_count(&self) -> usize {
        self.entries
            .iter()
            .map(|entry| entry.value.descriptor_count())
            .sum()
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    fn names_equal(&self, a: &str, b: &str) -> bool {
        if self.flags.ignore_case() {
            a.eq_ignore_ascii_case(b)
        } else {
            a == b
        }
    }

    /// Index of the first entry named `name` whose type matches `ty`.
    /// A store in error state finds nothing.
    fn find(&self, name: &str, ty: NvType) -> Option<usize> {
        if self.error.is_some() {
            return None;
        }
        self.entries
            .iter()
            .position(|entry| ty.matches(entry.value.nv_type()) && self.names_equal(&entry.name, name))
    }

    /// Is there an entry named `name` of any type?
    pub fn exists(&self, name: &str) -> bool {
        self.exists_type(name, NvType::None)
    }

    /// Is there an entry named `name` of type `ty`? `NvType::None` matches any type.
    pub fn exists_type(&self, name: &str, ty: NvType) -> bool {
        self.find(name, ty).is_some()
    }

    pub fn get(&self, name: &str, ty: NvType) -> Option<&Value> {
        self.find(name, ty).map(|idx| &self.entries[idx].value)
    }

    pub fn get_mut(&mut self, name: &str, ty: NvType) -> Option<&mut Value> {
        let idx = self.find(name, ty)?;
        Some(&mut self.entries[idx].value)
    }

    /// Remove an entry and hand its value to the caller. Lists taken out
    /// of a list array are no longer array elements.
    pub fn take(&mut self, name: &str, ty: NvType) -> Option<Value> {
        let idx = self.find(name, ty)?;
        let mut value = self.entries.remove(idx).value;
        if let Value::NvListArray(items) = &mut value {
            items.iter_mut().for_each(|item| item.in_array = false);
        }
        Some(value)
    }

    /// Remove and drop an entry. Returns whether one was found.
    pub fn free_type(&mut self, name: &str, ty: NvType) -> bool {
        self.take(name, ty).is_some()
    }

    // ------------------------------------------------------------------
    // Insertion
    // ------------------------------------------------------------------

    fn valid_name(name: &str) -> bool {
        name.len() <= NAME_MAX && !name.contains('\0')
    }

    /// Insert an entry at the end of the store.
    ///
    /// Failures are not returned: they latch the sticky error. A duplicate
    /// key (without [`NvFlags::NO_UNIQUE`]) latches `EEXIST`; an invalid key
    /// or value latches `EINVAL`; a nested store already in error passes its
    /// error on. A store that already failed ignores the call.
    pub fn add(&mut self, name: &str, mut value: Value) {
        if self.error.is_some() {
            return;
        }
        if !Self::valid_name(name) || value.has_embedded_nul() {
            self.set_error(Errno::EINVAL);
            return;
        }
        match &mut value {
            Value::NvList(nested) => {
                if let Some(errno) = nested.error() {
                    self.set_error(errno);
                    return;
                }
                nested.in_array = false;
            }
            Value::NvListArray(items) => {
                if items.iter().any(|item| item.error().is_some()) {
                    self.set_error(Errno::EINVAL);
                    return;
                }
                items.iter_mut().for_each(Store::set_in_array);
            }
            _ => {}
        }
        if !self.flags.no_unique() && self.exists(name) {
            self.set_error(Errno::EEXIST);
            return;
        }
        self.entries.push(Entry {
            name: name.to_owned(),
            value,
        });
    }

    /// Append one element to the array entry named `name` whose element
    /// type matches `element`, creating the array if it does not exist.
    pub fn append(&mut self, name: &str, element: Value) {
        if self.error.is_some() {
            return;
        }
        let Some(array_type) = element.nv_type().array_of() else {
            self.set_error(Errno::EINVAL);
            return;
        };
        if !Self::valid_name(name) || element.has_embedded_nul() {
            self.set_error(Errno::EINVAL);
            return;
        }
        if let Value::NvList(nested) = &element {
            if nested.error().is_some() {
                self.set_error(Errno::EINVAL);
                return;
            }
        }
        let Some(array) = self.get_mut(name, array_type) else {
            let value = match element {
                Value::Bool(b) => Value::BoolArray(vec![b]),
                Value::Number(n) => Value::NumberArray(vec![n]),
                Value::String(s) => Value::StringArray(vec![s]),
                Value::NvList(nested) => Value::NvListArray(vec![*nested]),
                Value::Descriptor(fd) => Value::DescriptorArray(vec![fd]),
                _ => return,
            };
            self.add(name, value);
            return;
        };
        match (array, element) {
            (Value::BoolArray(items), Value::Bool(b)) => items.push(b),
            (Value::NumberArray(items), Value::Number(n)) => items.push(n),
            (Value::StringArray(items), Value::String(s)) => items.push(s),
            (Value::NvListArray(items), Value::NvList(mut nested)) => {
                nested.set_in_array();
                items.push(*nested);
            }
            (Value::DescriptorArray(items), Value::Descriptor(fd)) => items.push(fd),
            _ => self.set_error(Errno::EINVAL),
        }
    }

    // ------------------------------------------------------------------
    // Enumeration
    // ------------------------------------------------------------------

    /// Advance `cookie` to the next entry and report its name and type.
    /// Returns `None`, resetting the cookie, after the last entry.
    pub fn next(&self, cookie: &mut Cookie) -> Option<(&str, NvType)> {
        if self.error.is_some() {
            *cookie = Cookie::default();
            return None;
        }
        let idx = cookie.0.map_or(0, |i| i + 1);
        match self.entries.get(idx) {
            Some(entry) => {
                *cookie = Cookie(Some(idx));
                Some((entry.name.as_str(), entry.value.nv_type()))
            }
            None => {
                *cookie = Cookie::default();
                None
            }
        }
    }

    /// The value of the entry `cookie` is positioned on.
    pub fn value_at(&self, cookie: Cookie) -> Option<&Value> {
        cookie
            .0
            .and_then(|idx| self.entries.get(idx))
            .map(|entry| &entry.value)
    }

    /// All entries in storage order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries
            .iter()
            .map(|entry| (entry.name.as_str(), &entry.value))
    }

    /// Insert an entry that has already been validated.
    pub(crate) fn push_unchecked(&mut self, name: String, value: Value) {
        self.entries.push(Entry { name, value });
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new(NvFlags::NONE)
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        struct Entries<'a>(&'a [Entry]);

        impl fmt::Debug for Entries<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_map()
                    .entries(self.0.iter().map(|entry| (&entry.name, &entry.value)))
                    .finish()
            }
        }

        f.debug_struct("Store")
            .field("flags", &self.flags)
            .field("error", &self.error)
            .field("in_array", &self.in_array)
            .field("entries", &Entries(&self.entries))
            .finish()
    }
}
